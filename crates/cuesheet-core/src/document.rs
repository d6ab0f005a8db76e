//! Script document trait and implementations.
//!
//! Defines the `ScriptDocument` trait so the editor state machine can work over
//! different storage strategies (plain fields, host-owned state) while sharing the
//! mutation logic. The run tree is the single source of truth; canonical text is
//! always derived from it.

use std::ops::Range;

use crate::error::ScriptError;
use crate::grammar::EmotionId;
use crate::runs::{RunPosition, RunTree};
use crate::types::{CursorState, EditInfo, EditKind};

/// Outcome of adopting runs read back from the editing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceSync {
    /// The surface already shows what the document holds.
    InSync,
    /// Re-parsing changed the structure (e.g. a complete tag was typed), so the
    /// surface has to be re-rendered.
    Restructured,
}

/// Core trait for script documents.
///
/// Implementors provide run tree, cursor and edit-tracking storage. All mutations
/// are provided methods built on top of those accessors.
pub trait ScriptDocument {
    // === Required: Run tree access ===

    /// Get the run tree.
    fn runs(&self) -> &RunTree;

    /// Get the run tree mutably.
    fn runs_mut(&mut self) -> &mut RunTree;

    // === Required: Cursor state ===

    fn cursor(&self) -> CursorState;

    fn set_cursor(&mut self, cursor: CursorState);

    // === Required: Edit tracking ===

    fn last_edit(&self) -> Option<EditInfo>;

    fn set_last_edit(&mut self, edit: Option<EditInfo>);

    // === Provided: Convenience accessors ===

    /// Canonical tagged text.
    fn canonical(&self) -> String {
        self.runs().to_canonical()
    }

    /// Rendered length in characters (tags excluded).
    fn len_chars(&self) -> usize {
        self.runs().len_chars()
    }

    /// Length of the canonical text in characters, tags included.
    fn char_count(&self) -> usize {
        self.canonical().chars().count()
    }

    fn is_empty(&self) -> bool {
        self.runs().is_empty()
    }

    /// Visible text in a rendered range.
    fn slice(&self, range: Range<usize>) -> Option<String> {
        self.runs().slice(range)
    }

    fn cursor_offset(&self) -> usize {
        self.cursor().offset
    }

    /// Set the cursor offset, clamped to the rendered length.
    fn set_cursor_offset(&mut self, offset: usize) {
        let mut cursor = self.cursor();
        cursor.offset = offset.min(self.len_chars());
        self.set_cursor(cursor);
    }

    // === Provided: Mutations ===

    /// Replace the whole script from canonical text. The cursor is clamped.
    fn replace_canonical(&mut self, text: &str) -> EditInfo {
        let old_len = self.len_chars();
        *self.runs_mut() = RunTree::parse(text);
        let new_len = self.len_chars();
        self.set_cursor_offset(self.cursor_offset());
        self.record(EditInfo::new(EditKind::Replace, 0, new_len, old_len, new_len))
    }

    /// Wrap a plain rendered range in an emotion run.
    ///
    /// See [`RunTree::wrap_range`] for the preconditions. On error the document is
    /// unchanged.
    fn wrap_selection(
        &mut self,
        range: Range<usize>,
        emotion: EmotionId,
    ) -> Result<EditInfo, ScriptError> {
        self.runs_mut().wrap_range(range.clone(), emotion)?;
        tracing::debug!(target: "cuesheet::editor", %emotion, ?range, "wrapped selection");
        let len = self.len_chars();
        Ok(self.record(EditInfo::new(EditKind::Wrap, range.start, 0, 0, len)))
    }

    /// Delete a rendered range and return the deleted visible text.
    ///
    /// The script is re-parsed afterwards, since joining the text on either side of
    /// the cut can complete a tag. The cursor lands at the start of the range.
    fn delete_range(&mut self, range: Range<usize>) -> Result<String, ScriptError> {
        let deleted = self.runs_mut().delete_range(range.clone())?;
        self.reparse();
        let len = self.len_chars();
        self.set_cursor_offset(range.start);
        self.record(EditInfo::new(
            EditKind::Delete,
            range.start,
            0,
            deleted.chars().count(),
            len,
        ));
        Ok(deleted)
    }

    /// Splice a marker token into the run that owns `pos`, as plain text.
    ///
    /// The cursor moves immediately after the token.
    fn insert_marker(&mut self, pos: RunPosition, tag: &str) -> EditInfo {
        let after = self.runs_mut().insert_at(pos, tag);
        self.reparse();
        self.set_cursor_offset(after);

        let inserted = tag.chars().count();
        let len = self.len_chars();
        tracing::debug!(target: "cuesheet::editor", tag, at = after - inserted, "inserted marker");
        self.record(EditInfo::new(
            EditKind::InsertMarker,
            after - inserted,
            inserted,
            0,
            len,
        ))
    }

    /// Rewrite the first `<old>text</old>` in the canonical text to `<new>text</new>`.
    ///
    /// The cursor offset is preserved (clamped). If the tagged text no longer occurs,
    /// returns `ReplaceNotFound` and leaves the document alone.
    fn change_emotion(
        &mut self,
        old: EmotionId,
        text: &str,
        new: EmotionId,
    ) -> Result<EditInfo, ScriptError> {
        self.replace_tagged(old, text, &new.wrap(text), EditKind::Retag)
    }

    /// Replace the first `<emotion>text</emotion>` in the canonical text with bare `text`.
    fn remove_emotion(&mut self, emotion: EmotionId, text: &str) -> Result<EditInfo, ScriptError> {
        self.replace_tagged(emotion, text, text, EditKind::Untag)
    }

    /// Adopt runs read back from the editing surface after native typing.
    ///
    /// The surface runs are serialized and re-parsed so the document never holds a
    /// tree its own canonical text would not produce.
    fn sync_from_surface(&mut self, surface: RunTree, caret: Option<usize>) -> SurfaceSync {
        let mut surface = surface;
        surface.normalize();
        let reparsed = RunTree::parse(&surface.to_canonical());
        let sync = if reparsed == surface {
            SurfaceSync::InSync
        } else {
            SurfaceSync::Restructured
        };

        let old_len = self.len_chars();
        *self.runs_mut() = reparsed;
        let len = self.len_chars();
        let caret = caret.unwrap_or(self.cursor_offset());
        self.set_cursor_offset(caret);

        let (inserted, deleted) = if len >= old_len {
            (len - old_len, 0)
        } else {
            (0, old_len - len)
        };
        let pos = self.cursor_offset().saturating_sub(inserted);
        self.record(EditInfo::new(EditKind::Surface, pos, inserted, deleted, len));
        tracing::trace!(target: "cuesheet::editor", ?sync, len, "synced from surface");
        sync
    }

    // === Provided: Internals ===

    /// Re-derive the run tree from its own canonical text.
    fn reparse(&mut self) {
        let canonical = self.canonical();
        *self.runs_mut() = RunTree::parse(&canonical);
    }

    #[doc(hidden)]
    fn record(&mut self, edit: EditInfo) -> EditInfo {
        self.set_last_edit(Some(edit.clone()));
        edit
    }

    #[doc(hidden)]
    fn replace_tagged(
        &mut self,
        emotion: EmotionId,
        text: &str,
        replacement: &str,
        kind: EditKind,
    ) -> Result<EditInfo, ScriptError> {
        let needle = emotion.wrap(text);
        let canonical = self.canonical();
        if !canonical.contains(&needle) {
            return Err(ScriptError::ReplaceNotFound(needle));
        }

        let pos = self
            .runs()
            .emotion_spans()
            .find(|span| span.emotion == emotion && span.text == text)
            .map(|span| span.range.start)
            .unwrap_or(0);
        let caret = self.cursor_offset();
        *self.runs_mut() = RunTree::parse(&canonical.replacen(&needle, replacement, 1));
        self.set_cursor_offset(caret);

        let len = self.len_chars();
        Ok(self.record(EditInfo::new(kind, pos, 0, 0, len)))
    }
}

/// Simple field-based implementation of ScriptDocument.
#[derive(Debug, Clone, Default)]
pub struct PlainScript {
    runs: RunTree,
    cursor: CursorState,
    last_edit: Option<EditInfo>,
}

impl PlainScript {
    /// Create a document from canonical text.
    pub fn new(canonical: &str) -> Self {
        Self::from_runs(RunTree::parse(canonical))
    }

    pub fn from_runs(runs: RunTree) -> Self {
        Self {
            runs,
            cursor: CursorState::default(),
            last_edit: None,
        }
    }
}

impl ScriptDocument for PlainScript {
    fn runs(&self) -> &RunTree {
        &self.runs
    }

    fn runs_mut(&mut self) -> &mut RunTree {
        &mut self.runs
    }

    fn cursor(&self) -> CursorState {
        self.cursor
    }

    fn set_cursor(&mut self, cursor: CursorState) {
        self.cursor = cursor;
    }

    fn last_edit(&self) -> Option<EditInfo> {
        self.last_edit.clone()
    }

    fn set_last_edit(&mut self, edit: Option<EditInfo>) {
        self.last_edit = edit;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runs::Run;

    #[test]
    fn test_wrap_selection() {
        let mut doc = PlainScript::new("Hello world");
        let edit = doc.wrap_selection(0..5, EmotionId::Sad).unwrap();
        assert_eq!(doc.canonical(), "<sad>Hello</sad> world");
        assert_eq!(edit.kind, EditKind::Wrap);
        assert_eq!(doc.last_edit(), Some(edit));
    }

    #[test]
    fn test_wrap_rejected_leaves_document() {
        let mut doc = PlainScript::new("ab<happy>cd</happy>ef");
        assert!(doc.wrap_selection(1..3, EmotionId::Sad).is_err());
        assert_eq!(doc.canonical(), "ab<happy>cd</happy>ef");
        assert_eq!(doc.last_edit(), None);
    }

    #[test]
    fn test_cut_reparses_joined_text() {
        let mut doc = PlainScript::new("<hap--py>a</happy>");
        assert_eq!(doc.runs().run_count(), 1);

        let deleted = doc.delete_range(4..6).unwrap();
        assert_eq!(deleted, "--");
        assert_eq!(doc.canonical(), "<happy>a</happy>");
        assert_eq!(doc.runs().outline(), r#"happy "a""#);
        assert_eq!(doc.cursor_offset(), 1);
    }

    #[test]
    fn test_insert_marker_moves_cursor_after_token() {
        let mut doc = PlainScript::new("Hello <happy>world</happy>");
        let edit = doc.insert_marker(RunPosition::new(0, 6), "<effect=1001>");
        assert_eq!(doc.canonical(), "Hello <effect=1001><happy>world</happy>");
        assert_eq!(doc.cursor_offset(), 19);
        assert_eq!(edit.affected_range(), 6..19);
    }

    #[test]
    fn test_change_emotion() {
        let mut doc = PlainScript::new("Hello <happy>world</happy>!");
        doc.set_cursor_offset(3);
        doc.change_emotion(EmotionId::Happy, "world", EmotionId::Angry)
            .unwrap();
        assert_eq!(doc.canonical(), "Hello <angry>world</angry>!");
        assert_eq!(doc.cursor_offset(), 3);
    }

    #[test]
    fn test_change_emotion_replaces_first_occurrence_only() {
        let mut doc = PlainScript::new("<sad>a</sad> <sad>a</sad>");
        doc.change_emotion(EmotionId::Sad, "a", EmotionId::Tired)
            .unwrap();
        assert_eq!(doc.canonical(), "<tired>a</tired> <sad>a</sad>");
    }

    #[test]
    fn test_remove_emotion() {
        let mut doc = PlainScript::new("Hello <happy>world</happy>!");
        doc.remove_emotion(EmotionId::Happy, "world").unwrap();
        assert_eq!(doc.canonical(), "Hello world!");
        assert_eq!(doc.runs().run_count(), 1);
    }

    #[test]
    fn test_replace_not_found_is_noop() {
        let mut doc = PlainScript::new("Hello <happy>world</happy>!");
        let err = doc
            .change_emotion(EmotionId::Sad, "world", EmotionId::Angry)
            .unwrap_err();
        assert_eq!(err, ScriptError::ReplaceNotFound("<sad>world</sad>".into()));
        assert_eq!(doc.canonical(), "Hello <happy>world</happy>!");
    }

    #[test]
    fn test_replace_canonical_clamps_cursor() {
        let mut doc = PlainScript::new("a long line of text");
        doc.set_cursor_offset(15);
        doc.replace_canonical("<sad>short</sad>");
        assert_eq!(doc.cursor_offset(), 5);
        assert_eq!(doc.len_chars(), 5);
        assert_eq!(doc.char_count(), 16);
    }

    #[test]
    fn test_sync_from_surface() {
        let mut doc = PlainScript::new("Hello <happy>world</happy>");

        // Plain typing inside a run.
        let typed = RunTree::from_runs(vec![
            Run::plain("Hello, "),
            Run::emotion(EmotionId::Happy, "world"),
        ]);
        assert_eq!(doc.sync_from_surface(typed, Some(6)), SurfaceSync::InSync);
        assert_eq!(doc.canonical(), "Hello, <happy>world</happy>");
        assert_eq!(doc.cursor_offset(), 6);

        // Typing a complete tag turns it into a run.
        let typed = RunTree::from_runs(vec![Run::plain("<sad>hi</sad> "), Run::plain("x")]);
        assert_eq!(
            doc.sync_from_surface(typed, Some(14)),
            SurfaceSync::Restructured
        );
        assert_eq!(doc.runs().outline(), "sad \"hi\"\nplain \" x\"");
        assert_eq!(doc.cursor_offset(), 4);
    }

    #[derive(Debug)]
    enum Step {
        Wrap(Range<usize>, EmotionId),
        Cut(Range<usize>),
        Drop(RunPosition, &'static str),
        Change(EmotionId, &'static str, EmotionId),
        Remove(EmotionId, &'static str),
        /// Native typing that leaves the surface as one plain run.
        Type(&'static str),
    }

    fn apply(doc: &mut PlainScript, step: &Step) -> Result<(), ScriptError> {
        match step {
            Step::Wrap(range, emotion) => doc.wrap_selection(range.clone(), *emotion).map(drop),
            Step::Cut(range) => doc.delete_range(range.clone()).map(drop),
            Step::Drop(pos, tag) => {
                doc.insert_marker(*pos, tag);
                Ok(())
            }
            Step::Change(old, text, new) => doc.change_emotion(*old, text, *new).map(drop),
            Step::Remove(emotion, text) => doc.remove_emotion(*emotion, text).map(drop),
            Step::Type(text) => {
                doc.sync_from_surface(RunTree::from_runs(vec![Run::plain(*text)]), None);
                Ok(())
            }
        }
    }

    #[test]
    fn test_mixed_edits_keep_tree_well_formed() {
        let cases = vec![
            (
                "Hello brave new world",
                vec![
                    (Step::Wrap(6..11, EmotionId::Happy), "Hello <happy>brave</happy> new world"),
                    // Overlaps the happy run: rejected.
                    (Step::Wrap(8..14, EmotionId::Sad), "Hello <happy>brave</happy> new world"),
                    (Step::Cut(9..13), "Hello <happy>bra</happy>ew world"),
                    (
                        Step::Drop(RunPosition::new(1, 1), "<effect=1001>"),
                        "Hello <happy>b<effect=1001>ra</happy>ew world",
                    ),
                    (
                        Step::Change(EmotionId::Happy, "b<effect=1001>ra", EmotionId::Sad),
                        "Hello <sad>b<effect=1001>ra</sad>ew world",
                    ),
                    (
                        Step::Remove(EmotionId::Sad, "b<effect=1001>ra"),
                        "Hello b<effect=1001>raew world",
                    ),
                ],
            ),
            (
                "<happy>abc</happy> tail",
                vec![
                    // The dropped closing tag ends the run early.
                    (
                        Step::Drop(RunPosition::new(0, 1), "x</happy>y"),
                        "<happy>ax</happy>ybc</happy> tail",
                    ),
                    (
                        Step::Wrap(2..5, EmotionId::Sad),
                        "<happy>ax</happy><sad>ybc</sad></happy> tail",
                    ),
                    // Wrapping a bare closing tag in its own emotion cannot round-trip.
                    (
                        Step::Wrap(5..13, EmotionId::Happy),
                        "<happy>ax</happy><sad>ybc</sad></happy> tail",
                    ),
                    (
                        Step::Change(EmotionId::Happy, "ax", EmotionId::Excited),
                        "<excited>ax</excited><sad>ybc</sad></happy> tail",
                    ),
                ],
            ),
            (
                "",
                vec![
                    (Step::Type("say <sad>no</sad> now"), "say <sad>no</sad> now"),
                    (Step::Cut(0..4), "<sad>no</sad> now"),
                    (Step::Cut(1..4), "<sad>n</sad>ow"),
                    (
                        Step::Drop(RunPosition::new(1, 0), "<s=5>"),
                        "<sad>n</sad><s=5>ow",
                    ),
                    (Step::Remove(EmotionId::Sad, "n"), "n<s=5>ow"),
                ],
            ),
        ];

        for (start, steps) in cases {
            let mut doc = PlainScript::new(start);
            for (step, expected) in &steps {
                let before = doc.canonical();
                if apply(&mut doc, step).is_err() {
                    assert_eq!(doc.canonical(), before, "rejected {:?} changed the script", step);
                }
                assert_eq!(doc.canonical(), *expected, "after {:?}", step);

                assert_eq!(
                    RunTree::parse(&doc.canonical()),
                    *doc.runs(),
                    "canonical text does not reparse after {:?}",
                    step
                );
                let spans: Vec<_> = doc.runs().emotion_spans().collect();
                for pair in spans.windows(2) {
                    assert!(
                        pair[0].range.end <= pair[1].range.start,
                        "overlapping runs after {:?}",
                        step
                    );
                }
                for span in &spans {
                    assert!(
                        !span.text.contains(span.emotion.close_tag().as_str()),
                        "{} run holds its own closing tag after {:?}",
                        span.emotion,
                        step
                    );
                }
            }
        }
    }
}
