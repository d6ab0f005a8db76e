//! The run tree: the structured form of a script.
//!
//! A script is a flat sequence of runs. Each run is either plain text (which may
//! contain marker tokens as ordinary characters) or an emotion run carrying one
//! emotion id. Being flat, the tree cannot express nesting or overlap: every
//! character belongs to at most one emotion run.
//!
//! All offsets here are rendered character offsets. Tag delimiters are not
//! counted; marker tokens are, since they are shown verbatim.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::ScriptError;
use crate::grammar::EmotionId;
use crate::parse::{parse_to_runs, serialize_runs};
use crate::types::Affinity;

/// A single run of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Run {
    Plain(String),
    Emotion { emotion: EmotionId, text: String },
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Run::Plain(text.into())
    }

    pub fn emotion(emotion: EmotionId, text: impl Into<String>) -> Self {
        Run::Emotion {
            emotion,
            text: text.into(),
        }
    }

    /// Visible text of this run.
    pub fn text(&self) -> &str {
        match self {
            Run::Plain(text) => text,
            Run::Emotion { text, .. } => text,
        }
    }

    fn text_mut(&mut self) -> &mut String {
        match self {
            Run::Plain(text) => text,
            Run::Emotion { text, .. } => text,
        }
    }

    pub fn emotion_id(&self) -> Option<EmotionId> {
        match self {
            Run::Plain(_) => None,
            Run::Emotion { emotion, .. } => Some(*emotion),
        }
    }

    pub fn is_emotion(&self) -> bool {
        matches!(self, Run::Emotion { .. })
    }

    /// Length in rendered characters.
    pub fn char_len(&self) -> usize {
        self.text().chars().count()
    }

    /// Append this run's canonical form.
    pub fn write_canonical(&self, out: &mut String) {
        match self {
            Run::Plain(text) => out.push_str(text),
            Run::Emotion { emotion, text } => out.push_str(&emotion.wrap(text)),
        }
    }

    /// Same kind of run with different text.
    fn with_text(&self, text: String) -> Self {
        match self {
            Run::Plain(_) => Run::Plain(text),
            Run::Emotion { emotion, .. } => Run::Emotion {
                emotion: *emotion,
                text,
            },
        }
    }
}

/// A location inside the run tree: run index plus character offset within it.
///
/// Positions are what the surface reports (a caret sits inside a particular
/// run's element), so they disambiguate run boundaries that a bare rendered
/// offset cannot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunPosition {
    pub run: usize,
    pub offset: usize,
}

impl RunPosition {
    pub fn new(run: usize, offset: usize) -> Self {
        Self { run, offset }
    }
}

/// An emotion run together with where it sits in the rendered text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmotionSpan<'a> {
    pub index: usize,
    pub range: Range<usize>,
    pub emotion: EmotionId,
    pub text: &'a str,
}

/// Ordered sequence of runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunTree {
    runs: Vec<Run>,
}

impl RunTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap runs as given, without normalizing.
    pub fn from_runs(runs: Vec<Run>) -> Self {
        Self { runs }
    }

    /// Parse canonical text.
    pub fn parse(text: &str) -> Self {
        parse_to_runs(text)
    }

    /// Serialize back to canonical text.
    pub fn to_canonical(&self) -> String {
        serialize_runs(&self.runs)
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn get(&self, index: usize) -> Option<&Run> {
        self.runs.get(index)
    }

    /// Number of runs.
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Total rendered length in characters.
    pub fn len_chars(&self) -> usize {
        self.runs.iter().map(Run::char_len).sum()
    }

    /// Whether there is no visible text.
    pub fn is_empty(&self) -> bool {
        self.runs.iter().all(|run| run.text().is_empty())
    }

    /// Visible text with all emotion tags stripped.
    pub fn plain_text(&self) -> String {
        self.runs.iter().map(Run::text).collect()
    }

    /// Rendered offset where the given run starts.
    pub fn run_start(&self, index: usize) -> usize {
        self.runs.iter().take(index).map(Run::char_len).sum()
    }

    /// Resolve a rendered offset to a run position, clamping past-the-end offsets.
    ///
    /// An offset on a run boundary resolves to the end of the earlier run with
    /// `Affinity::Before`, or the start of the later run with `Affinity::After`.
    pub fn position_of(&self, offset: usize, affinity: Affinity) -> RunPosition {
        let mut start = 0;
        let last = self.runs.len().saturating_sub(1);
        for (index, run) in self.runs.iter().enumerate() {
            let len = run.char_len();
            let end = start + len;
            if offset < end {
                return RunPosition::new(index, offset.saturating_sub(start));
            }
            if offset == end && (affinity == Affinity::Before || index == last) {
                return RunPosition::new(index, len);
            }
            start = end;
        }
        match self.runs.last() {
            Some(run) => RunPosition::new(last, run.char_len()),
            None => RunPosition::default(),
        }
    }

    /// Rendered offset of a run position. Offsets inside a run are clamped to its length.
    pub fn offset_of(&self, pos: RunPosition) -> usize {
        match self.runs.get(pos.run) {
            Some(run) => self.run_start(pos.run) + pos.offset.min(run.char_len()),
            None => self.len_chars(),
        }
    }

    /// Visible text in a rendered range. Returns None if the range is invalid.
    pub fn slice(&self, range: Range<usize>) -> Option<String> {
        if range.start > range.end || range.end > self.len_chars() {
            return None;
        }
        Some(
            self.plain_text()
                .chars()
                .skip(range.start)
                .take(range.len())
                .collect(),
        )
    }

    /// Emotion of the run a position lies in, if it is an emotion run.
    pub fn emotion_at(&self, pos: RunPosition) -> Option<EmotionId> {
        self.runs.get(pos.run).and_then(Run::emotion_id)
    }

    /// All emotion runs with their rendered ranges.
    pub fn emotion_spans(&self) -> impl Iterator<Item = EmotionSpan<'_>> {
        let mut start = 0;
        self.runs.iter().enumerate().filter_map(move |(index, run)| {
            let len = run.char_len();
            let range = start..start + len;
            start += len;
            run.emotion_id().map(|emotion| EmotionSpan {
                index,
                range,
                emotion,
                text: run.text(),
            })
        })
    }

    /// Delete a rendered range, returning the deleted visible text.
    ///
    /// Emotion runs wholly inside the range disappear; partially covered ones keep
    /// their remaining text.
    pub fn delete_range(&mut self, range: Range<usize>) -> Result<String, ScriptError> {
        self.check_bounds(&range)?;
        if range.is_empty() {
            return Ok(String::new());
        }

        let first = self.split_at(range.start, Affinity::After);
        let last = self.split_at(range.end, Affinity::Before);
        let deleted: String = self
            .runs
            .drain(first..last.max(first))
            .map(|run| match run {
                Run::Plain(text) | Run::Emotion { text, .. } => text,
            })
            .collect();
        self.normalize();
        Ok(deleted)
    }

    /// Splice text into the run at `pos`. Returns the rendered offset just past it.
    ///
    /// A position past the last run appends a plain run.
    pub fn insert_at(&mut self, pos: RunPosition, text: &str) -> usize {
        let inserted = text.chars().count();
        match self.runs.get_mut(pos.run) {
            Some(run) => {
                let offset = pos.offset.min(run.char_len());
                let at = byte_index(run.text(), offset);
                run.text_mut().insert_str(at, text);
                self.run_start(pos.run) + offset + inserted
            }
            None => {
                let end = self.len_chars();
                self.runs.push(Run::plain(text));
                self.normalize();
                end + inserted
            }
        }
    }

    /// Turn a plain rendered range into an emotion run.
    ///
    /// The range must be non-empty, in bounds, and must not touch the inside of any
    /// existing emotion run. The result must also re-parse to the same tree, which
    /// rules out text containing the emotion's own closing tag and plain text that
    /// holds a dangling opening tag the new closing tag would capture. On error the
    /// tree is unchanged.
    pub fn wrap_range(&mut self, range: Range<usize>, emotion: EmotionId) -> Result<(), ScriptError> {
        self.check_bounds(&range)?;
        if range.is_empty() {
            return Err(ScriptError::EmptyRange(range.start));
        }

        let mut candidate = self.clone();
        let first = candidate.split_at(range.start, Affinity::After);
        let last = candidate.split_at(range.end, Affinity::Before);
        if let Some(existing) = candidate.runs[first..last].iter().find_map(Run::emotion_id) {
            return Err(ScriptError::OverlapsEmotion {
                start: range.start,
                end: range.end,
                emotion: existing,
            });
        }

        let text: String = candidate
            .runs
            .drain(first..last)
            .map(|run| match run {
                Run::Plain(text) | Run::Emotion { text, .. } => text,
            })
            .collect();
        candidate.runs.insert(first, Run::Emotion { emotion, text });
        candidate.normalize();

        if RunTree::parse(&candidate.to_canonical()) != candidate {
            return Err(ScriptError::UnbalancedWrap(emotion));
        }

        *self = candidate;
        Ok(())
    }

    /// Merge adjacent plain runs and drop empty plain runs.
    ///
    /// Emotion runs are left alone, including empty ones, since `<happy></happy>`
    /// is a legitimate parse result.
    pub fn normalize(&mut self) {
        let mut out: Vec<Run> = Vec::with_capacity(self.runs.len());
        for run in self.runs.drain(..) {
            match run {
                Run::Plain(text) if text.is_empty() => {}
                Run::Plain(text) => match out.last_mut() {
                    Some(Run::Plain(prev)) => prev.push_str(&text),
                    _ => out.push(Run::Plain(text)),
                },
                other => out.push(other),
            }
        }
        self.runs = out;
    }

    /// One line per run: `plain "Hello "`, `happy "world"`.
    pub fn outline(&self) -> String {
        self.runs
            .iter()
            .map(|run| match run {
                Run::Plain(text) => format!("plain {:?}", text),
                Run::Emotion { emotion, text } => format!("{} {:?}", emotion, text),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn check_bounds(&self, range: &Range<usize>) -> Result<(), ScriptError> {
        let len = self.len_chars();
        if range.start > range.end || range.end > len {
            return Err(ScriptError::OutOfBounds {
                start: range.start,
                end: range.end,
                len,
            });
        }
        Ok(())
    }

    /// Make sure a run boundary exists at `offset`, splitting a run if needed.
    ///
    /// Returns the index of the first run at or after the boundary. Empty runs on
    /// the boundary stay before the returned index with `After` and at or after it
    /// with `Before`, so a range split with (After, Before) never captures them.
    fn split_at(&mut self, offset: usize, affinity: Affinity) -> usize {
        if self.runs.is_empty() {
            return 0;
        }
        let pos = self.position_of(offset, affinity);
        let len = self.runs[pos.run].char_len();
        if pos.offset == 0 && affinity == Affinity::After {
            return pos.run;
        }
        if pos.offset >= len {
            return pos.run + 1;
        }
        if pos.offset == 0 {
            return pos.run;
        }

        let run = &self.runs[pos.run];
        let at = byte_index(run.text(), pos.offset);
        let head = run.with_text(run.text()[..at].to_string());
        let tail = run.with_text(run.text()[at..].to_string());
        self.runs[pos.run] = head;
        self.runs.insert(pos.run + 1, tail);
        pos.run + 1
    }
}

impl From<Vec<Run>> for RunTree {
    fn from(runs: Vec<Run>) -> Self {
        Self::from_runs(runs)
    }
}

/// Byte index of the `char_offset`-th character, or the string length past the end.
pub(crate) fn byte_index(s: &str, char_offset: usize) -> usize {
    s.char_indices()
        .nth(char_offset)
        .map(|(idx, _)| idx)
        .unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(text: &str) -> RunTree {
        RunTree::parse(text)
    }

    #[test]
    fn test_lengths_exclude_tags() {
        let runs = tree("Hello <happy>world</happy>!");
        assert_eq!(runs.len_chars(), 12);
        assert_eq!(runs.plain_text(), "Hello world!");
        assert_eq!(runs.run_start(1), 6);
        assert_eq!(runs.run_start(2), 11);
    }

    #[test]
    fn test_position_of_boundary_affinity() {
        let runs = tree("Hello <happy>world</happy>!");
        assert_eq!(runs.position_of(6, Affinity::Before), RunPosition::new(0, 6));
        assert_eq!(runs.position_of(6, Affinity::After), RunPosition::new(1, 0));
        assert_eq!(runs.position_of(8, Affinity::Before), RunPosition::new(1, 2));
        assert_eq!(runs.position_of(12, Affinity::After), RunPosition::new(2, 1));
        // Clamped past the end.
        assert_eq!(runs.position_of(99, Affinity::Before), RunPosition::new(2, 1));
        assert_eq!(RunTree::new().position_of(3, Affinity::After), RunPosition::new(0, 0));
    }

    #[test]
    fn test_offset_of_inverts_position_of() {
        let runs = tree("a<sad>bc</sad>d<tired>e</tired>");
        for offset in 0..=runs.len_chars() {
            for affinity in [Affinity::Before, Affinity::After] {
                let pos = runs.position_of(offset, affinity);
                assert_eq!(runs.offset_of(pos), offset);
            }
        }
    }

    #[test]
    fn test_offsets_are_chars_not_bytes() {
        let runs = tree("國王<angry>非常生氣</angry>。");
        assert_eq!(runs.len_chars(), 7);
        assert_eq!(runs.position_of(3, Affinity::Before), RunPosition::new(1, 1));
        assert_eq!(runs.slice(2..6).as_deref(), Some("非常生氣"));
    }

    #[test]
    fn test_emotion_spans() {
        let runs = tree("a<sad>bc</sad>d<tired>e</tired>");
        let spans: Vec<_> = runs
            .emotion_spans()
            .map(|s| (s.index, s.range, s.emotion, s.text))
            .collect();
        assert_eq!(
            spans,
            vec![
                (1, 1..3, EmotionId::Sad, "bc"),
                (3, 4..5, EmotionId::Tired, "e"),
            ]
        );
    }

    #[test]
    fn test_wrap_plain_range() {
        let mut runs = tree("Hello world");
        runs.wrap_range(0..5, EmotionId::Sad).unwrap();
        assert_eq!(runs.to_canonical(), "<sad>Hello</sad> world");
    }

    #[test]
    fn test_wrap_keeps_markers_literal() {
        let mut runs = tree("go <effect=1001>now");
        runs.wrap_range(3..19, EmotionId::Excited).unwrap();
        assert_eq!(runs.to_canonical(), "go <excited><effect=1001>now</excited>");
    }

    #[test]
    fn test_wrap_adjacent_to_emotion_is_allowed() {
        let mut runs = tree("<happy>ab</happy>cd");
        runs.wrap_range(2..4, EmotionId::Sad).unwrap();
        assert_eq!(runs.to_canonical(), "<happy>ab</happy><sad>cd</sad>");
    }

    #[test]
    fn test_wrap_rejects_overlap() {
        let mut runs = tree("ab<happy>cd</happy>ef");
        let before = runs.clone();

        let err = runs.wrap_range(1..3, EmotionId::Sad).unwrap_err();
        assert!(matches!(err, ScriptError::OverlapsEmotion { emotion: EmotionId::Happy, .. }));
        // Containing the whole run would nest it.
        assert!(runs.wrap_range(0..6, EmotionId::Sad).is_err());
        // Empty emotion runs inside the range count too.
        let mut with_empty = tree("ab<happy></happy>cd");
        assert!(with_empty.wrap_range(1..3, EmotionId::Sad).is_err());
        assert_eq!(runs, before);
    }

    #[test]
    fn test_wrap_rejects_unbalanced_result() {
        let mut runs = tree("x</sad>y");
        assert_eq!(
            runs.wrap_range(0..8, EmotionId::Sad),
            Err(ScriptError::UnbalancedWrap(EmotionId::Sad))
        );

        // A dangling opening tag earlier in the text would capture the new close tag.
        let mut dangling = tree("<sad> hi");
        assert_eq!(
            dangling.wrap_range(6..8, EmotionId::Sad),
            Err(ScriptError::UnbalancedWrap(EmotionId::Sad))
        );
        // A different emotion is fine.
        dangling.wrap_range(6..8, EmotionId::Happy).unwrap();
        assert_eq!(dangling.to_canonical(), "<sad> <happy>hi</happy>");
    }

    #[test]
    fn test_wrap_rejects_empty_and_out_of_bounds() {
        let mut runs = tree("abc");
        assert_eq!(runs.wrap_range(1..1, EmotionId::Sad), Err(ScriptError::EmptyRange(1)));
        assert!(matches!(
            runs.wrap_range(1..9, EmotionId::Sad),
            Err(ScriptError::OutOfBounds { len: 3, .. })
        ));
    }

    #[test]
    fn test_delete_range_across_runs() {
        let mut runs = tree("ab<happy>cd</happy>ef");
        let deleted = runs.delete_range(1..3).unwrap();
        assert_eq!(deleted, "bc");
        assert_eq!(runs.to_canonical(), "a<happy>d</happy>ef");

        let mut runs = tree("ab<happy>cd</happy>ef");
        assert_eq!(runs.delete_range(1..5).unwrap(), "bcde");
        assert_eq!(runs.to_canonical(), "af");
        assert_eq!(runs.run_count(), 1);
    }

    #[test]
    fn test_delete_range_keeps_neighbouring_empty_runs() {
        let mut runs = tree("a<happy></happy>bc");
        runs.delete_range(1..2).unwrap();
        assert_eq!(runs.to_canonical(), "a<happy></happy>c");
    }

    #[test]
    fn test_insert_at_positions() {
        let mut runs = tree("Hello <happy>world</happy>");
        let after = runs.insert_at(RunPosition::new(0, 6), "<effect=1001>");
        assert_eq!(after, 19);
        assert_eq!(runs.to_canonical(), "Hello <effect=1001><happy>world</happy>");

        let mut runs = tree("Hello <happy>world</happy>");
        runs.insert_at(RunPosition::new(1, 0), "<s=5>");
        assert_eq!(runs.to_canonical(), "Hello <happy><s=5>world</happy>");

        let mut empty = RunTree::new();
        assert_eq!(empty.insert_at(RunPosition::default(), "<s=10>"), 6);
        assert_eq!(empty.to_canonical(), "<s=10>");
    }

    #[test]
    fn test_normalize_merges_plain_runs() {
        let mut runs = RunTree::from_runs(vec![
            Run::plain("a"),
            Run::plain(""),
            Run::plain("b"),
            Run::emotion(EmotionId::Sad, ""),
            Run::plain("c"),
        ]);
        runs.normalize();
        insta::assert_snapshot!(runs.outline(), @r#"
        plain "ab"
        sad ""
        plain "c"
        "#);
    }
}
