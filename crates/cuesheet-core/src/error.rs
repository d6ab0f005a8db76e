//! Error types for script mutations.
//!
//! None of these are fatal. The editor state machine logs them and leaves the
//! document in its last valid state.

use smol_str::SmolStr;
use thiserror::Error;

use crate::grammar::EmotionId;

/// Errors raised by run-tree and document operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScriptError {
    /// The requested range intersects an existing emotion run.
    #[error("range {start}..{end} overlaps an existing {emotion} run")]
    OverlapsEmotion {
        start: usize,
        end: usize,
        emotion: EmotionId,
    },

    /// The wrapped result would not re-parse to the same runs, usually because the
    /// selection contains `</emotion>` or an earlier dangling `<emotion>` would
    /// capture the new closing tag.
    #[error("wrapping with `{}` would not re-parse cleanly", .0.open_tag())]
    UnbalancedWrap(EmotionId),

    /// The requested range is empty.
    #[error("empty range at {0}")]
    EmptyRange(usize),

    /// The requested range extends past the end of the script.
    #[error("range {start}..{end} out of bounds (len {len})")]
    OutOfBounds { start: usize, end: usize, len: usize },

    /// A textual tag rewrite could not find the tagged text it expected.
    #[error("`{0}` not found in script")]
    ReplaceNotFound(String),

    /// Tag name outside the emotion catalog.
    #[error("unknown emotion `{0}`")]
    UnknownEmotion(SmolStr),
}
