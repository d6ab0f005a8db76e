//! View models for popups, the focus overlay and the palette.
//!
//! Pure projections of editor state. Hosts render these however they like; the only
//! state that lives outside the editor is [`SubmenuState`].

use serde::Serialize;

use crate::color::Rgba;
use crate::config::EditorConfig;
use crate::editor::EditorMode;
use crate::grammar::{EMOTIONS, EmotionId, MarkerKind, MarkerToken};
use crate::types::{Point, Rect};

/// Hint shown at the bottom of the focus overlay.
pub const FOCUS_HINT: &str = "Click anywhere or press ESC to exit";

/// Everything a host needs to draw the editor chrome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorView {
    pub popup: Option<PopupView>,
    pub overlay: Option<FocusOverlayView>,
    pub drag_over: bool,
    /// Canonical text length, for the "N chars" badge.
    pub char_count: usize,
}

impl EditorView {
    pub fn build(mode: &EditorMode, config: &EditorConfig, drag_over: bool, char_count: usize) -> Self {
        let placement = |anchor: Point| Point::new(anchor.x, anchor.y - config.popup_gap_px);
        let (popup, overlay) = match mode {
            EditorMode::Idle => (None, None),
            EditorMode::SelectionPopup(snapshot) => (
                Some(PopupView::Selection {
                    placement: placement(snapshot.anchor),
                }),
                None,
            ),
            EditorMode::HoverPopup(state) => (
                Some(PopupView::Hover {
                    placement: placement(state.snapshot.anchor),
                    current: state.snapshot.emotion,
                }),
                None,
            ),
            EditorMode::Focus(rect) => (
                None,
                Some(FocusOverlayView {
                    spotlight: rect.padded(config.focus_padding_px),
                    hint: FOCUS_HINT,
                }),
            ),
        };
        Self {
            popup,
            overlay,
            drag_over,
            char_count,
        }
    }
}

/// A floating popup. `placement` is where the popup's top-center sits, a fixed gap above
/// the text it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PopupView {
    /// Copy / Cut / Emotion submenu / Focus.
    Selection { placement: Point },
    /// Current emotion, change submenu, Remove.
    Hover { placement: Point, current: EmotionId },
}

impl PopupView {
    pub fn placement(&self) -> Point {
        match self {
            PopupView::Selection { placement } | PopupView::Hover { placement, .. } => *placement,
        }
    }

    /// Entries of the emotion submenu, with the current emotion marked.
    pub fn emotion_choices(&self) -> Vec<EmotionChoice> {
        let current = match self {
            PopupView::Selection { .. } => None,
            PopupView::Hover { current, .. } => Some(*current),
        };
        EMOTIONS
            .iter()
            .map(|emotion| EmotionChoice {
                id: emotion.id,
                display_name: emotion.display_name,
                swatch: Rgba(emotion.stroke).css(),
                is_current: current == Some(emotion.id),
            })
            .collect()
    }
}

/// One row of the emotion submenu.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionChoice {
    pub id: EmotionId,
    pub display_name: &'static str,
    pub swatch: String,
    pub is_current: bool,
}

/// Dims everything except `spotlight`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FocusOverlayView {
    pub spotlight: Rect,
    pub hint: &'static str,
}

/// Open/closed flag of a popup's emotion submenu.
///
/// Resets whenever the popup it belongs to changes or goes away.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmenuState {
    owner: Option<PopupView>,
    open: bool,
}

impl SubmenuState {
    /// Track the currently shown popup, closing the submenu if it changed.
    pub fn sync(&mut self, popup: Option<&PopupView>) {
        if self.owner.as_ref() != popup {
            self.owner = popup.cloned();
            self.open = false;
        }
    }

    pub fn toggle(&mut self) {
        self.open = self.owner.is_some() && !self.open;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

/// Legend entry in the palette.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendEntry {
    pub id: EmotionId,
    pub display_name: &'static str,
    pub background: String,
    pub color: String,
}

/// Emotion legend for the palette.
pub fn emotion_legend() -> Vec<LegendEntry> {
    EMOTIONS
        .iter()
        .map(|emotion| LegendEntry {
            id: emotion.id,
            display_name: emotion.display_name,
            background: Rgba(emotion.fill).css(),
            color: Rgba(emotion.stroke).css(),
        })
        .collect()
}

/// Draggable marker chip in the palette.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerChip<'a> {
    pub label: &'a str,
    pub tag: &'a str,
    pub kind: MarkerKind,
    pub background: String,
    pub border: String,
}

/// Effect and silence groups, in configured order.
pub fn marker_chips(markers: &[MarkerToken]) -> (Vec<MarkerChip<'_>>, Vec<MarkerChip<'_>>) {
    // Blue for effects, orange for silences.
    const EFFECT: Rgba = Rgba(0x3b82f6ff);
    const SILENCE: Rgba = Rgba(0xf97316ff);

    markers
        .iter()
        .map(|marker| {
            let kind = MarkerKind::classify(&marker.tag).unwrap_or(marker.kind);
            let base = match kind {
                MarkerKind::Effect => EFFECT,
                MarkerKind::Silence => SILENCE,
            };
            MarkerChip {
                label: &marker.label,
                tag: &marker.tag,
                kind,
                background: base.css_with_alpha(0.1),
                border: base.css_with_alpha(0.3),
            }
        })
        .partition(|chip| chip.kind == MarkerKind::Effect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{HoverSnapshot, HoverState, SelectionSnapshot};
    use crate::actions::Range;
    use crate::grammar::default_markers;

    fn config() -> EditorConfig {
        EditorConfig::default()
    }

    #[test]
    fn test_selection_popup_floats_above_anchor() {
        let mode = EditorMode::SelectionPopup(SelectionSnapshot {
            range: Range::new(0, 5),
            text: "Hello".into(),
            rect: Rect::new(200.0, 40.0, 60.0, 20.0),
            anchor: Point::new(70.0, 200.0),
        });
        let view = EditorView::build(&mode, &config(), false, 11);
        assert_eq!(
            view.popup,
            Some(PopupView::Selection {
                placement: Point::new(70.0, 150.0)
            })
        );
        assert_eq!(view.overlay, None);
        assert_eq!(view.char_count, 11);
    }

    #[test]
    fn test_focus_overlay_is_padded() {
        let mode = EditorMode::Focus(Rect::new(100.0, 40.0, 60.0, 20.0));
        let view = EditorView::build(&mode, &config(), false, 0);
        assert_eq!(view.popup, None);
        let overlay = view.overlay.unwrap();
        assert_eq!(overlay.spotlight, Rect::new(92.0, 32.0, 76.0, 36.0));
        assert_eq!(overlay.hint, FOCUS_HINT);
    }

    #[test]
    fn test_hover_choices_mark_current() {
        let popup = PopupView::Hover {
            placement: Point::default(),
            current: EmotionId::Tired,
        };
        let current: Vec<_> = popup
            .emotion_choices()
            .into_iter()
            .filter(|c| c.is_current)
            .map(|c| c.id)
            .collect();
        assert_eq!(current, vec![EmotionId::Tired]);

        let selection = PopupView::Selection {
            placement: Point::default(),
        };
        assert!(selection.emotion_choices().iter().all(|c| !c.is_current));
    }

    #[test]
    fn test_submenu_resets_with_popup() {
        let hover = |emotion| {
            EditorView::build(
                &EditorMode::HoverPopup(HoverState {
                    snapshot: HoverSnapshot {
                        emotion,
                        text: "a".into(),
                        anchor: Point::new(10.0, 60.0),
                    },
                    pointer_over_popup: false,
                    pending: None,
                }),
                &config(),
                false,
                0,
            )
            .popup
        };

        let mut submenu = SubmenuState::default();
        submenu.toggle();
        assert!(!submenu.is_open());

        let first = hover(EmotionId::Happy);
        submenu.sync(first.as_ref());
        submenu.toggle();
        assert!(submenu.is_open());

        // Same popup: stays open.
        submenu.sync(first.as_ref());
        assert!(submenu.is_open());

        // Popup changed: closed again.
        submenu.sync(hover(EmotionId::Sad).as_ref());
        assert!(!submenu.is_open());

        submenu.toggle();
        submenu.sync(None);
        assert!(!submenu.is_open());
    }

    #[test]
    fn test_marker_chips_grouping() {
        let markers = default_markers();
        let (effects, silences) = marker_chips(&markers);
        assert_eq!(effects.len(), 6);
        assert_eq!(silences.len(), 2);
        assert_eq!(silences[0].tag, "<s=5>");
        assert_eq!(effects[0].background, "rgba(59, 130, 246, 0.1)");
    }

    #[test]
    fn test_legend_colors() {
        let legend = emotion_legend();
        assert_eq!(legend.len(), 6);
        assert_eq!(legend[2].display_name, "Angry");
        assert_eq!(legend[2].color, "rgba(239, 68, 68, 1)");
    }

    #[test]
    fn test_view_serializes_camel_case() {
        let view = EditorView::build(&EditorMode::Idle, &config(), true, 3);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["dragOver"], true);
        assert_eq!(json["charCount"], 3);
    }
}
