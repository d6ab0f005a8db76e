//! Editor configuration.
//!
//! Hosts pass this as a plain object; every field is optional and falls back to the
//! defaults below.

use serde::{Deserialize, Serialize};

use crate::grammar::{EXAMPLE_SCRIPT, MarkerToken, default_markers};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Vertical distance between a popup's anchor and the popup itself.
    pub popup_gap_px: f64,
    /// Grace period before a hover popup closes once the pointer leaves.
    pub hover_grace_ms: u32,
    /// Delay between pointer-up and reading the selection, so the surface has
    /// settled it.
    pub selection_settle_ms: u32,
    /// Padding around the spotlight rectangle in focus mode.
    pub focus_padding_px: f64,
    /// Markers offered in the palette.
    pub markers: Vec<MarkerToken>,
    /// Script loaded at startup. `None` starts empty.
    pub initial_script: Option<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            popup_gap_px: 50.0,
            hover_grace_ms: 150,
            selection_settle_ms: 10,
            focus_padding_px: 8.0,
            markers: default_markers(),
            initial_script: Some(EXAMPLE_SCRIPT.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: EditorConfig =
            serde_json::from_str(r#"{"hoverGraceMs": 300, "initialScript": null}"#).unwrap();
        assert_eq!(config.hover_grace_ms, 300);
        assert_eq!(config.popup_gap_px, 50.0);
        assert_eq!(config.markers.len(), 8);
        assert_eq!(config.initial_script, None);
    }

    #[test]
    fn test_default_loads_example_script() {
        let config = EditorConfig::default();
        assert_eq!(config.initial_script.as_deref(), Some(EXAMPLE_SCRIPT));
    }
}
