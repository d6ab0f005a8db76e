//! Editor actions, effects and input types.
//!
//! Platform-agnostic definitions for editor operations. `EditorAction` is what the
//! host feeds into the state machine (already resolved against the surface, so
//! geometry and run positions are plain data). `Effect` is what the state machine
//! asks the host to do in return.

use smol_str::SmolStr;

use crate::grammar::EmotionId;
use crate::runs::{RunPosition, RunTree};
use crate::types::Rect;

/// A range in the document, measured in rendered character offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Normalize range so start <= end.
    pub fn normalize(self) -> Self {
        if self.start <= self.end {
            self
        } else {
            Self {
                start: self.end,
                end: self.start,
            }
        }
    }
}

impl From<std::ops::Range<usize>> for Range {
    fn from(r: std::ops::Range<usize>) -> Self {
        Self::new(r.start, r.end)
    }
}

impl From<Range> for std::ops::Range<usize> {
    fn from(r: Range) -> Self {
        r.start..r.end
    }
}

/// A non-collapsed selection read from the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionProbe {
    pub anchor: RunPosition,
    pub head: RunPosition,
    /// Selection text as the surface reports it.
    pub text: String,
    /// Bounding rectangle of the selected range, viewport coordinates.
    pub rect: Rect,
}

/// The pointer entered an emotion run.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverProbe {
    pub emotion: EmotionId,
    /// The run's visible text.
    pub text: String,
    /// Bounding rectangle of the run's element, viewport coordinates.
    pub rect: Rect,
}

/// Identifies one scheduled hover dismissal.
///
/// Every schedule gets a fresh token; an elapsed timer whose token is not the one
/// currently pending is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DismissToken(pub u64);

/// Keys the editor cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    /// A character key.
    Character(SmolStr),
    Escape,
    Enter,
    Backspace,
    Delete,
    Tab,
    /// Unknown/unidentified key.
    Unidentified,
}

impl Key {
    /// Create a character key.
    pub fn character(s: impl Into<SmolStr>) -> Self {
        Self::Character(s.into())
    }

    /// Map a DOM `KeyboardEvent.key` value.
    pub fn from_key_name(name: &str) -> Self {
        match name {
            "Escape" | "Esc" => Self::Escape,
            "Enter" => Self::Enter,
            "Backspace" => Self::Backspace,
            "Delete" => Self::Delete,
            "Tab" => Self::Tab,
            "" | "Unidentified" => Self::Unidentified,
            s if s.chars().count() == 1 => Self::character(s),
            _ => Self::Unidentified,
        }
    }
}

/// All operations the editor state machine understands.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorAction {
    // === Selection & hover tracking ===
    /// Pointer released over the surface. `None` when the selection is collapsed
    /// or lies outside the surface.
    PointerUp(Option<SelectionProbe>),
    EmotionEnter(HoverProbe),
    EmotionLeave,
    PopupEnter,
    PopupLeave,
    /// A scheduled hover dismissal fired.
    DismissElapsed(DismissToken),

    // === Selection popup ===
    Copy,
    Cut,
    ApplyEmotion(EmotionId),
    Focus,
    DismissSelection,

    // === Hover popup ===
    ChangeEmotion(EmotionId),
    RemoveEmotion,

    // === Focus mode ===
    CloseFocus,
    KeyDown(Key),

    // === Drag and drop ===
    DragOver(bool),
    /// A marker was dropped. `at` is the caret resolved under the pointer, or
    /// `None` if nothing in the surface resolved.
    DropMarker {
        tag: SmolStr,
        at: Option<RunPosition>,
    },

    // === Content ===
    /// Runs read back after native typing, with the caret's rendered offset.
    SurfaceInput {
        runs: RunTree,
        caret: Option<usize>,
    },
    /// Replace the whole script from canonical text.
    ReplaceScript(String),
    /// Copy the canonical text.
    CopyAll,
}

/// Work the host has to perform after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    WriteClipboard(String),
    ClearNativeSelection,
    /// Re-project the run tree into the surface, then restore the caret one tick
    /// later. `None` keeps whatever rendered offset the caret had before.
    Render { caret: Option<usize> },
    FocusSurface,
    ScheduleDismiss { token: DismissToken, after_ms: u32 },
    CancelDismiss,
    /// Canonical text changed.
    ContentChanged,
}
