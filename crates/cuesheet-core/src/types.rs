//! Core editor types: cursor, geometry and edit tracking.
//!
//! These types are framework-agnostic. Offsets are rendered character offsets:
//! Unicode scalar values of the visible text, not counting tag delimiters.

use std::ops::Range;

use serde::Serialize;
use web_time::Instant;

/// Cursor state including position and affinity.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub struct CursorState {
    /// Rendered character offset (NOT byte offset, NOT canonical offset!)
    pub offset: usize,

    /// Which run wins when the offset sits on a run boundary.
    pub affinity: Affinity,
}

impl Default for CursorState {
    fn default() -> Self {
        Self {
            offset: 0,
            affinity: Affinity::Before,
        }
    }
}

impl CursorState {
    /// Create a new cursor at the given offset.
    pub fn new(offset: usize) -> Self {
        Self {
            offset,
            affinity: Affinity::Before,
        }
    }
}

/// Boundary affinity.
///
/// A rendered offset on the seam between two runs belongs to both. `Before`
/// means stick to the end of the earlier run, `After` means stick to the start
/// of the later one.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub enum Affinity {
    #[default]
    Before,
    After,
}

/// A point in viewport (client) coordinates.
#[derive(Clone, Debug, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle in viewport (client) coordinates.
#[derive(Clone, Debug, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    /// Horizontal midpoint of the top edge. Popups hang above this point.
    pub fn top_center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top)
    }

    /// Grow the rectangle by `pad` on every side.
    pub fn padded(&self, pad: f64) -> Self {
        Self {
            top: self.top - pad,
            left: self.left - pad,
            width: self.width + pad * 2.0,
            height: self.height + pad * 2.0,
        }
    }
}

/// What kind of mutation an `EditInfo` describes.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// Emotion run created around a selection.
    Wrap,
    /// Selected text removed (cut).
    Delete,
    /// Marker token spliced in.
    InsertMarker,
    /// Emotion tag rewritten in place.
    Retag,
    /// Emotion tag removed, text kept.
    Untag,
    /// Whole script replaced from canonical text.
    Replace,
    /// Text typed natively into the surface and read back.
    Surface,
}

/// Information about the most recent edit.
#[derive(Clone, Debug)]
pub struct EditInfo {
    pub kind: EditKind,
    /// Rendered character offset where the edit occurred
    pub edit_char_pos: usize,
    /// Number of rendered characters inserted
    pub inserted_len: usize,
    /// Number of rendered characters deleted
    pub deleted_len: usize,
    /// Rendered length after this edit was applied.
    /// Used to detect stale edit info - if current doc length doesn't match,
    /// the edit info is from a previous render cycle.
    pub doc_len_after: usize,
    /// When this edit occurred.
    pub timestamp: Instant,
}

impl PartialEq for EditInfo {
    fn eq(&self, other: &Self) -> bool {
        // Compare all fields except timestamp (not meaningful for equality)
        self.kind == other.kind
            && self.edit_char_pos == other.edit_char_pos
            && self.inserted_len == other.inserted_len
            && self.deleted_len == other.deleted_len
            && self.doc_len_after == other.doc_len_after
    }
}

impl EditInfo {
    pub fn new(
        kind: EditKind,
        edit_char_pos: usize,
        inserted_len: usize,
        deleted_len: usize,
        doc_len_after: usize,
    ) -> Self {
        Self {
            kind,
            edit_char_pos,
            inserted_len,
            deleted_len,
            doc_len_after,
            timestamp: Instant::now(),
        }
    }

    /// Check if this edit info is stale (doc has changed since this edit).
    pub fn is_stale(&self, current_doc_len: usize) -> bool {
        self.doc_len_after != current_doc_len
    }

    /// Get the range that was affected by this edit.
    ///
    /// For insertions: the range of inserted text.
    /// For deletions and retags: an empty range at the edit point.
    pub fn affected_range(&self) -> Range<usize> {
        self.edit_char_pos..self.edit_char_pos + self.inserted_len
    }
}
