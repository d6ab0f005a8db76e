//! DOM synchronization for the editing surface.
//!
//! The surface is rebuilt from the run tree whenever the structure changes, and read
//! back after native edits. Offsets here are rendered char offsets; the DOM speaks
//! UTF-16, so conversions happen at this boundary and nowhere else.

use cuesheet_core::render::render_html;
use cuesheet_core::{Affinity, EMOTION_ATTR, EmotionId, RUN_INDEX_ATTR, Run, RunPosition, RunTree};
use wasm_bindgen::JsCast;
use web_sys::{Element, Node};

/// Replace the surface content with the rendered run tree.
pub fn render_script(surface: &Element, runs: &RunTree) {
    let html = render_html(runs);
    tracing::trace!(
        target: "cuesheet::dom",
        runs = runs.run_count(),
        chars = runs.len_chars(),
        "rendering surface"
    );
    surface.set_inner_html(&html);
}

/// Read the surface back into a normalized run tree.
///
/// Text nodes contribute their text, `<br>` and block elements contribute line
/// breaks, and an element carrying `data-emotion` becomes an emotion run. Nested
/// emotion elements are read as text of the outer run.
pub fn read_runs(surface: &Element) -> RunTree {
    let mut walk = SurfaceWalk::new(None);
    walk.visit_children(surface, false);
    let mut runs = walk.finish();
    runs.normalize();
    runs
}

/// Rendered offset of a DOM position inside the surface.
pub fn dom_offset(surface: &Element, node: &Node, offset: u32) -> Option<usize> {
    if !surface.contains(Some(node)) {
        return None;
    }
    let mut walk = SurfaceWalk::new(Some((node, offset)));
    walk.visit_children(surface, false);
    walk.found
}

/// Map a DOM position to a run position.
///
/// Positions inside a rendered `[data-run]` span resolve to that run, so a caret at
/// the very end of an emotion span stays in the emotion run. Anything else falls back
/// to the rendered offset.
pub fn dom_position_to_run_position(
    surface: &Element,
    runs: &RunTree,
    node: &Node,
    offset: u32,
) -> Option<RunPosition> {
    if !surface.contains(Some(node)) {
        return None;
    }

    if let Some((span, index)) = enclosing_run_span(surface, node) {
        if let Some(run) = runs.get(index) {
            let mut walk = SurfaceWalk::new(Some((node, offset)));
            walk.visit_children(&span, true);
            if let Some(local) = walk.found {
                return Some(RunPosition::new(index, local.min(run.char_len())));
            }
        }
    }

    let global = dom_offset(surface, node, offset)?;
    Some(runs.position_of(global, Affinity::Before))
}

/// Walk up from `node` to the closest rendered run span below the surface.
fn enclosing_run_span(surface: &Element, node: &Node) -> Option<(Element, usize)> {
    let mut current = node.clone();
    loop {
        if current.is_same_node(Some(surface.as_ref())) {
            return None;
        }
        if let Some(element) = current.dyn_ref::<Element>() {
            if let Some(index) = element
                .get_attribute(RUN_INDEX_ATTR)
                .and_then(|attr| attr.parse::<usize>().ok())
            {
                return Some((element.clone(), index));
            }
        }
        current = current.parent_node()?;
    }
}

/// Pick the run position a caret at `offset` should land in.
///
/// A boundary after an emotion run resolves into the following run, so typing at
/// the caret does not extend the emotion.
pub fn caret_position(runs: &RunTree, offset: usize) -> RunPosition {
    let before = runs.position_of(offset, Affinity::Before);
    match runs.get(before.run) {
        Some(run) if run.is_emotion() && before.offset == run.char_len() => {
            runs.position_of(offset, Affinity::After)
        }
        _ => before,
    }
}

/// DOM position (node, UTF-16 offset) for a rendered char offset.
///
/// Expects the surface to match `runs`; see [`surface_matches`].
pub fn dom_position_for_offset(
    surface: &Element,
    runs: &RunTree,
    offset: usize,
) -> Option<(Node, u32)> {
    if runs.run_count() == 0 {
        return Some((surface.clone().into(), 0));
    }

    let pos = caret_position(runs, offset);
    let selector = format!("[{}=\"{}\"]", RUN_INDEX_ATTR, pos.run);
    let span = surface.query_selector(&selector).ok()??;

    let document = span.owner_document()?;
    // NodeFilter.SHOW_TEXT
    let walker = document.create_tree_walker_with_what_to_show(&span, 0x4).ok()?;

    let mut remaining = pos.offset;
    let mut last: Option<(Node, u32)> = None;
    while let Ok(Some(node)) = walker.next_node() {
        let text = node.node_value().unwrap_or_default();
        let chars = text.chars().count();
        if remaining <= chars {
            let utf16 = char_to_utf16_offset(&text, remaining);
            return Some((node, utf16 as u32));
        }
        remaining -= chars;
        let end = text.encode_utf16().count() as u32;
        last = Some((node, end));
    }

    Some(last.unwrap_or_else(|| (span.into(), 0)))
}

/// Whether the surface is exactly the rendering of `runs`: one `[data-run]` span per
/// run, in order, with the same text.
pub fn surface_matches(surface: &Element, runs: &RunTree) -> bool {
    let children = surface.children();
    if children.length() as usize != runs.run_count() {
        return false;
    }
    runs.runs().iter().enumerate().all(|(index, run)| {
        let Some(child) = children.item(index as u32) else {
            return false;
        };
        let index_matches = child
            .get_attribute(RUN_INDEX_ATTR)
            .and_then(|attr| attr.parse::<usize>().ok())
            == Some(index);
        let emotion_matches = child
            .get_attribute(EMOTION_ATTR)
            .and_then(|attr| attr.parse::<EmotionId>().ok())
            == run.emotion_id();
        index_matches
            && emotion_matches
            && child.child_element_count() == 0
            && child.text_content().unwrap_or_default() == run.text()
    })
}

/// Depth-first walk over surface content, accumulating runs and locating one target
/// DOM position along the way.
struct SurfaceWalk<'a> {
    target: Option<(&'a Node, u32)>,
    runs: Vec<Run>,
    text: String,
    chars: usize,
    found: Option<usize>,
}

impl<'a> SurfaceWalk<'a> {
    fn new(target: Option<(&'a Node, u32)>) -> Self {
        Self {
            target,
            runs: Vec::new(),
            text: String::new(),
            chars: 0,
            found: None,
        }
    }

    fn is_target(&self, node: &Node) -> Option<u32> {
        match self.target {
            Some((target, offset)) if target.is_same_node(Some(node)) => Some(offset),
            _ => None,
        }
    }

    fn push_str(&mut self, s: &str) {
        self.text.push_str(s);
        self.chars += s.chars().count();
    }

    fn visit_children(&mut self, parent: &Node, in_emotion: bool) {
        let target_index = self.is_target(parent);
        let children = parent.child_nodes();
        let count = children.length();
        for i in 0..count {
            if target_index == Some(i) && self.found.is_none() {
                self.found = Some(self.chars);
            }
            if let Some(child) = children.item(i) {
                self.visit(&child, in_emotion, i + 1 == count);
            }
        }
        if target_index.is_some_and(|i| i >= count) && self.found.is_none() {
            self.found = Some(self.chars);
        }
    }

    fn visit(&mut self, node: &Node, in_emotion: bool, last_child: bool) {
        match node.node_type() {
            Node::TEXT_NODE => {
                let text = node.node_value().unwrap_or_default();
                if let Some(offset) = self.is_target(node) {
                    self.found = Some(self.chars + utf16_to_char_offset(&text, offset as usize));
                }
                self.push_str(&text);
            }
            Node::ELEMENT_NODE => {
                let Some(element) = node.dyn_ref::<Element>() else {
                    return;
                };
                match element.tag_name().as_str() {
                    // A trailing <br> only keeps an empty block open.
                    "BR" => {
                        let in_block = node
                            .parent_element()
                            .is_some_and(|p| matches!(p.tag_name().as_str(), "DIV" | "P"));
                        if !(last_child && in_block) {
                            self.push_str("\n");
                        }
                    }
                    "DIV" | "P" => {
                        if self.chars > 0 {
                            self.push_str("\n");
                        }
                        self.visit_children(node, in_emotion);
                    }
                    _ => {
                        let emotion = element
                            .get_attribute(EMOTION_ATTR)
                            .and_then(|attr| attr.parse::<EmotionId>().ok());
                        match emotion {
                            Some(emotion) if !in_emotion => {
                                let before = std::mem::take(&mut self.text);
                                if !before.is_empty() {
                                    self.runs.push(Run::plain(before));
                                }
                                self.visit_children(node, true);
                                let body = std::mem::take(&mut self.text);
                                self.runs.push(Run::emotion(emotion, body));
                            }
                            _ => self.visit_children(node, in_emotion),
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn finish(mut self) -> RunTree {
        if !self.text.is_empty() {
            let rest = std::mem::take(&mut self.text);
            self.runs.push(Run::plain(rest));
        }
        RunTree::from_runs(self.runs)
    }
}

/// Convert a UTF-16 offset within `text` to a char offset. Offsets inside a surrogate
/// pair round down; offsets past the end clamp.
pub fn utf16_to_char_offset(text: &str, utf16: usize) -> usize {
    let mut units = 0;
    for (chars, c) in text.chars().enumerate() {
        let next = units + c.len_utf16();
        if next > utf16 {
            return chars;
        }
        units = next;
    }
    text.chars().count()
}

/// Convert a char offset within `text` to a UTF-16 offset, clamped to the end.
pub fn char_to_utf16_offset(text: &str, chars: usize) -> usize {
    text.chars().take(chars).map(char::len_utf16).sum()
}
