//! Platform abstraction traits for editor operations.
//!
//! These traits define the interface between the editor logic and the surface that
//! displays the script (browser DOM, tests, other UIs). The state machine itself
//! never calls them; hosts use them to build actions and to carry out effects.

use crate::actions::SelectionProbe;
use crate::runs::{RunPosition, RunTree};
use crate::types::Point;

/// Error type for platform operations.
#[derive(Debug, Clone)]
pub struct PlatformError(pub String);

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for PlatformError {}

impl From<&str> for PlatformError {
    fn from(s: &str) -> Self {
        PlatformError(s.to_string())
    }
}

impl From<String> for PlatformError {
    fn from(s: String) -> Self {
        PlatformError(s)
    }
}

/// Caret and selection access on the editing surface.
pub trait CursorPlatform {
    /// Rendered offset of the caret, or None if the caret is outside the surface.
    fn caret_offset(&self) -> Option<usize>;

    /// Place a collapsed caret at a rendered offset, clamped to the content.
    fn restore_caret(&self, offset: usize, runs: &RunTree) -> Result<(), PlatformError>;

    /// Resolve viewport coordinates to a caret position inside the surface.
    ///
    /// None when nothing resolves under the point or it falls outside the surface.
    fn caret_from_point(&self, point: Point, runs: &RunTree) -> Option<RunPosition>;

    /// The current non-collapsed selection, if it lies within the surface.
    fn selection_probe(&self, runs: &RunTree) -> Option<SelectionProbe>;

    /// Drop the native selection.
    fn clear_selection(&self) -> Result<(), PlatformError>;
}

/// System clipboard.
///
/// Writes are fire-and-forget: failures are logged by the implementation and never
/// reach the editor.
pub trait ClipboardPlatform {
    fn write_text(&self, text: &str);
}
