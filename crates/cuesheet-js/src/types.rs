//! Types exposed to JavaScript via wasm-bindgen.

use cuesheet_core::color::Rgba;
use cuesheet_core::{Emotion, MarkerToken};
use serde::{Deserialize, Serialize};
use tsify_next::Tsify;
use wasm_bindgen::prelude::*;

/// Catalog entry for host-side legends and pickers.
#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct JsEmotion {
    pub id: String,
    pub display_name: String,
    /// Text color, CSS `rgba()`.
    pub color: String,
    /// Tinted background, CSS `rgba()`.
    pub background: String,
}

impl From<&Emotion> for JsEmotion {
    fn from(emotion: &Emotion) -> Self {
        Self {
            id: emotion.id.as_str().to_string(),
            display_name: emotion.display_name.to_string(),
            color: Rgba(emotion.stroke).css(),
            background: Rgba(emotion.fill).css(),
        }
    }
}

/// Draggable marker as configured.
#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct JsMarker {
    pub label: String,
    pub tag: String,
    /// `"effect"` or `"silence"`.
    pub kind: String,
}

impl From<&MarkerToken> for JsMarker {
    fn from(marker: &MarkerToken) -> Self {
        Self {
            label: marker.label.to_string(),
            tag: marker.tag.to_string(),
            kind: marker.kind.as_str().to_string(),
        }
    }
}
