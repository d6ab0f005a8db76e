//! Browser implementation of cursor platform operations.
//!
//! Uses the DOM Selection API to read and place the caret, and the
//! caret-from-point APIs to resolve drop locations.

use cuesheet_core::{
    CursorPlatform, PlatformError, Point, RunPosition, RunTree, SelectionProbe,
};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::dom_sync::{dom_offset, dom_position_for_offset, dom_position_to_run_position};
use crate::events::rect_from_dom;

// === Caret-from-point bindings ===
//
// web-sys exposes neither the WebKit/Blink `caretRangeFromPoint` nor a stable
// `caretPositionFromPoint`, so both are bound here. Either may be missing at
// runtime; check with `Reflect::has` before calling.

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(extends = web_sys::Document)]
    type CaretDocument;

    #[wasm_bindgen(method, js_name = caretRangeFromPoint)]
    fn caret_range_from_point(this: &CaretDocument, x: f64, y: f64) -> Option<web_sys::Range>;

    #[wasm_bindgen(method, js_name = caretPositionFromPoint)]
    fn caret_position_from_point(this: &CaretDocument, x: f64, y: f64) -> Option<CaretPosition>;

    /// Result of `caretPositionFromPoint`.
    type CaretPosition;

    #[wasm_bindgen(method, getter, structural, js_name = offsetNode)]
    fn offset_node(this: &CaretPosition) -> Option<web_sys::Node>;

    #[wasm_bindgen(method, getter, structural)]
    fn offset(this: &CaretPosition) -> u32;
}

fn has_method(document: &web_sys::Document, name: &str) -> bool {
    js_sys::Reflect::has(document, &JsValue::from_str(name)).unwrap_or(false)
}

/// DOM position under viewport coordinates, if the browser can tell.
///
/// `caretRangeFromPoint` is tried first; when it is missing or resolves nothing,
/// `caretPositionFromPoint` gets a go.
pub fn caret_at_point(document: &web_sys::Document, point: Point) -> Option<(web_sys::Node, u32)> {
    let caret_document = document.unchecked_ref::<CaretDocument>();
    let from_range = has_method(document, "caretRangeFromPoint")
        .then(|| caret_document.caret_range_from_point(point.x, point.y))
        .flatten()
        .and_then(|range| Some((range.start_container().ok()?, range.start_offset().ok()?)));
    if from_range.is_some() {
        return from_range;
    }
    if has_method(document, "caretPositionFromPoint") {
        let pos = caret_document.caret_position_from_point(point.x, point.y)?;
        return Some((pos.offset_node()?, pos.offset()));
    }
    tracing::debug!(target: "cuesheet::cursor", x = point.x, y = point.y, "no caret under point");
    None
}

/// Browser-based cursor platform implementation, bound to one surface element.
pub struct BrowserCursor {
    surface: web_sys::Element,
}

impl BrowserCursor {
    pub fn new(surface: web_sys::Element) -> Self {
        Self { surface }
    }

    pub fn surface(&self) -> &web_sys::Element {
        &self.surface
    }

    fn selection(&self) -> Option<web_sys::Selection> {
        web_sys::window()?.get_selection().ok()?
    }
}

impl CursorPlatform for BrowserCursor {
    fn caret_offset(&self) -> Option<usize> {
        let selection = self.selection()?;
        let node = selection.focus_node()?;
        dom_offset(&self.surface, &node, selection.focus_offset())
    }

    fn restore_caret(&self, offset: usize, runs: &RunTree) -> Result<(), PlatformError> {
        let offset = offset.min(runs.len_chars());
        let (node, node_offset) = dom_position_for_offset(&self.surface, runs, offset)
            .ok_or("no DOM position for caret offset")?;

        tracing::trace!(
            target: "cuesheet::cursor",
            offset,
            node_name = %node.node_name(),
            node_offset,
            "restoring caret"
        );

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;
        let selection = window
            .get_selection()
            .map_err(|e| format!("get_selection failed: {:?}", e))?
            .ok_or("no selection object")?;
        let range = document
            .create_range()
            .map_err(|e| format!("create_range failed: {:?}", e))?;
        range
            .set_start(&node, node_offset)
            .map_err(|e| format!("set_start failed: {:?}", e))?;
        range.collapse_with_to_start(true);

        selection
            .remove_all_ranges()
            .map_err(|e| format!("remove_all_ranges failed: {:?}", e))?;
        selection
            .add_range(&range)
            .map_err(|e| format!("add_range failed: {:?}", e))?;
        Ok(())
    }

    fn caret_from_point(&self, point: Point, runs: &RunTree) -> Option<RunPosition> {
        let document = self.surface.owner_document()?;
        let (node, offset) = caret_at_point(&document, point)?;
        dom_position_to_run_position(&self.surface, runs, &node, offset)
    }

    fn selection_probe(&self, runs: &RunTree) -> Option<SelectionProbe> {
        let selection = self.selection()?;
        if selection.is_collapsed() || selection.range_count() == 0 {
            return None;
        }

        let anchor_node = selection.anchor_node()?;
        let focus_node = selection.focus_node()?;
        let anchor = dom_position_to_run_position(
            &self.surface,
            runs,
            &anchor_node,
            selection.anchor_offset(),
        )?;
        let head = dom_position_to_run_position(
            &self.surface,
            runs,
            &focus_node,
            selection.focus_offset(),
        )?;

        let range = selection.get_range_at(0).ok()?;
        let rect = rect_from_dom(&range.get_bounding_client_rect());
        let text: String = selection.to_string().into();

        tracing::trace!(
            target: "cuesheet::cursor",
            ?anchor,
            ?head,
            len = text.chars().count(),
            "selection probe"
        );

        Some(SelectionProbe {
            anchor,
            head,
            text,
            rect,
        })
    }

    fn clear_selection(&self) -> Result<(), PlatformError> {
        let selection = self.selection().ok_or("no selection object")?;
        selection
            .remove_all_ranges()
            .map_err(|e| format!("remove_all_ranges failed: {:?}", e))?;
        Ok(())
    }
}
