//! WASM browser tests for cuesheet-browser.
//!
//! Run with: `wasm-pack test --headless --firefox` or `--chrome`

#![cfg(target_arch = "wasm32")]

use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

use cuesheet_browser::dom_sync::{dom_offset, dom_position_for_offset, dom_position_to_run_position};
use cuesheet_browser::cursor::caret_at_point;
use cuesheet_browser::{
    BrowserCursor, CursorPlatform, DeferredTask, DismissTimer, DismissToken, EmotionId, Point, Run,
    RunPosition, RunTree, read_runs, render_script, surface_matches,
};

fn make_surface(html: &str) -> web_sys::Element {
    let document = web_sys::window().unwrap().document().unwrap();
    let surface = document.create_element("div").unwrap();
    surface.set_attribute("contenteditable", "true").unwrap();
    surface.set_inner_html(html);
    document.body().unwrap().append_child(&surface).unwrap();
    surface
}

fn first_text(element: &web_sys::Element) -> web_sys::Node {
    let mut node: web_sys::Node = element.clone().into();
    while node.node_type() != web_sys::Node::TEXT_NODE {
        node = node.first_child().unwrap();
    }
    node
}

// === Render / read-back ===

#[wasm_bindgen_test]
fn test_render_then_read_back() {
    let runs = RunTree::parse("Hello <happy>world</happy>!\n<effect=1001>");
    let surface = make_surface("");
    render_script(&surface, &runs);

    assert!(surface_matches(&surface, &runs));
    assert_eq!(read_runs(&surface), runs);
}

#[wasm_bindgen_test]
fn test_read_back_after_native_typing() {
    let runs = RunTree::parse("ab<sad>cd</sad>");
    let surface = make_surface("");
    render_script(&surface, &runs);

    // Simulate typing "X" into the emotion span.
    let span = surface.query_selector("[data-emotion]").unwrap().unwrap();
    let text = first_text(&span);
    text.set_node_value(Some("cXd"));

    let read = read_runs(&surface);
    assert_eq!(read.to_canonical(), "ab<sad>cXd</sad>");
    assert!(!surface_matches(&surface, &runs));
    // Same structure as the new tree, so no re-render is needed.
    assert!(surface_matches(&surface, &read));
}

#[wasm_bindgen_test]
fn test_read_block_elements_as_newlines() {
    let surface = make_surface("<span>one</span><div>two</div><div><br></div><div>three</div>");
    assert_eq!(read_runs(&surface).plain_text(), "one\ntwo\n\nthree");
}

#[wasm_bindgen_test]
fn test_structural_change_detected() {
    let runs = RunTree::parse("<happy>a</happy>b");
    let surface = make_surface("");
    render_script(&surface, &runs);
    assert!(surface_matches(&surface, &runs));

    // The browser deleted the emotion span entirely.
    let span = surface.query_selector("[data-emotion]").unwrap().unwrap();
    span.remove();
    let read = read_runs(&surface);
    assert_eq!(read.runs(), &[Run::plain("b")]);
    assert!(!surface_matches(&surface, &read));
}

// === Offsets ===

#[wasm_bindgen_test]
fn test_dom_offset_counts_chars() {
    let runs = RunTree::parse("歡迎<angry>\u{1F600}!</angry>x");
    let surface = make_surface("");
    render_script(&surface, &runs);

    let span = surface.query_selector("[data-emotion]").unwrap().unwrap();
    let text = first_text(&span);
    // UTF-16 offset 2 is after the astral char.
    assert_eq!(dom_offset(&surface, &text, 2), Some(3));
    // Surface-level child index.
    assert_eq!(dom_offset(&surface, &surface.clone().into(), 2), Some(4));
}

#[wasm_bindgen_test]
fn test_position_in_emotion_span_stays_in_run() {
    let runs = RunTree::parse("ab<sad>cd</sad>ef");
    let surface = make_surface("");
    render_script(&surface, &runs);

    let span = surface.query_selector("[data-emotion]").unwrap().unwrap();
    let text = first_text(&span);
    let pos = dom_position_to_run_position(&surface, &runs, &text, 2).unwrap();
    assert_eq!(pos, RunPosition::new(1, 2));
    assert_eq!(runs.emotion_at(pos), Some(EmotionId::Sad));

    let outside = make_surface("elsewhere");
    let stray = first_text(&outside);
    assert_eq!(dom_position_to_run_position(&surface, &runs, &stray, 0), None);
}

#[wasm_bindgen_test]
fn test_dom_position_for_offset_skips_emotion_end() {
    let runs = RunTree::parse("ab<sad>cd</sad>ef");
    let surface = make_surface("");
    render_script(&surface, &runs);

    let (node, offset) = dom_position_for_offset(&surface, &runs, 4).unwrap();
    assert_eq!(node.node_value().as_deref(), Some("ef"));
    assert_eq!(offset, 0);
}

#[wasm_bindgen_test]
fn test_restore_and_read_caret() {
    let runs = RunTree::parse("hello <happy>world</happy>");
    let surface = make_surface("");
    render_script(&surface, &runs);

    let cursor = BrowserCursor::new(surface.clone());
    cursor.restore_caret(3, &runs).unwrap();
    assert_eq!(cursor.caret_offset(), Some(3));

    cursor.clear_selection().unwrap();
    assert_eq!(cursor.caret_offset(), None);
}

#[wasm_bindgen_test]
fn test_selection_probe_reads_selection() {
    let runs = RunTree::parse("hello world");
    let surface = make_surface("");
    render_script(&surface, &runs);

    let window = web_sys::window().unwrap();
    let document = window.document().unwrap();
    let text = first_text(&surface);
    let range = document.create_range().unwrap();
    range.set_start(&text, 0).unwrap();
    range.set_end(&text, 5).unwrap();
    let selection = window.get_selection().unwrap().unwrap();
    selection.remove_all_ranges().unwrap();
    selection.add_range(&range).unwrap();

    let cursor = BrowserCursor::new(surface.clone());
    let probe = cursor.selection_probe(&runs).unwrap();
    assert_eq!(probe.text, "hello");
    assert_eq!(probe.anchor, RunPosition::new(0, 0));
    assert_eq!(probe.head, RunPosition::new(0, 5));
}

// === Caret from point ===

#[wasm_bindgen_test]
fn test_caret_from_point_inside_surface() {
    let runs = RunTree::parse("hello <sad>world</sad>");
    let surface = make_surface("");
    surface
        .set_attribute(
            "style",
            "position:fixed;top:0;left:0;z-index:1000;font-size:24px;background:white",
        )
        .unwrap();
    render_script(&surface, &runs);

    let document = web_sys::window().unwrap().document().unwrap();
    let text = first_text(&surface);
    let range = document.create_range().unwrap();
    range.set_start(&text, 1).unwrap();
    range.set_end(&text, 2).unwrap();
    let rect = range.get_bounding_client_rect();
    let point = Point::new(rect.left() + 1.0, rect.top() + rect.height() / 2.0);

    let (node, offset) = caret_at_point(&document, point).unwrap();
    assert_eq!(node.node_value().as_deref(), Some("hello "));
    assert!((1..=2).contains(&offset), "offset {}", offset);

    let cursor = BrowserCursor::new(surface.clone());
    let position = cursor.caret_from_point(point, &runs).unwrap();
    assert_eq!(position.run, 0);
    assert!((1..=2).contains(&position.offset));

    // Off-screen points resolve nothing.
    assert_eq!(cursor.caret_from_point(Point::new(-50.0, -50.0), &runs), None);

    surface.remove();
}

// === Timers ===

#[wasm_bindgen_test]
fn test_fired_dismiss_timeout_is_released() {
    let mut timer = DismissTimer::new();
    timer.schedule(DismissToken(1), 60_000, |_| {});
    timer.schedule(DismissToken(2), 60_000, |_| {});
    assert_eq!(timer.pending(), Some(DismissToken(2)));

    // A superseded token releases nothing.
    assert!(timer.fired(DismissToken(1)).is_none());
    assert_eq!(timer.pending(), Some(DismissToken(2)));

    assert!(timer.fired(DismissToken(2)).is_some());
    assert_eq!(timer.pending(), None);
}

#[wasm_bindgen_test]
fn test_deferred_task_replaces_and_cancels() {
    let mut task = DeferredTask::new();
    assert!(!task.is_scheduled());
    task.after(60_000, || {});
    task.next_tick(|| {});
    assert!(task.is_scheduled());
    task.cancel();
    assert!(!task.is_scheduled());
}
