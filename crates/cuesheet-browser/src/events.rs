//! Browser event extraction for the editor.
//!
//! Turns raw DOM events into the values the editor's actions carry: keys,
//! drag payloads, hovered emotion runs and viewport geometry.

use cuesheet_core::{EMOTION_ATTR, EmotionId, HoverProbe, Key, Point, Rect};
use wasm_bindgen::JsCast;
use web_sys::{DragEvent, Element, EventTarget, KeyboardEvent, MouseEvent, Node};

/// Drag payload type for marker tags.
pub const MARKER_MIME: &str = "text/plain";

/// Selector for rendered emotion runs.
pub fn emotion_selector() -> String {
    format!("[{}]", EMOTION_ATTR)
}

pub fn key_from_event(event: &KeyboardEvent) -> Key {
    Key::from_key_name(&event.key())
}

pub fn point_from_mouse(event: &MouseEvent) -> Point {
    Point::new(event.client_x() as f64, event.client_y() as f64)
}

pub fn rect_from_dom(rect: &web_sys::DomRect) -> Rect {
    Rect::new(rect.top(), rect.left(), rect.width(), rect.height())
}

/// Put a marker tag on a drag, allowing copy only.
pub fn set_drag_payload(event: &DragEvent, tag: &str) {
    let Some(dt) = event.data_transfer() else {
        return;
    };
    if let Err(e) = dt.set_data(MARKER_MIME, tag) {
        tracing::warn!("set drag data failed: {:?}", e);
    }
    dt.set_effect_allowed("copy");
}

/// Mark a dragover as a copy.
pub fn accept_drag(event: &DragEvent) {
    event.prevent_default();
    if let Some(dt) = event.data_transfer() {
        dt.set_drop_effect("copy");
    }
}

/// Marker tag carried by a drop, if any.
pub fn drag_payload(event: &DragEvent) -> Option<String> {
    let dt = event.data_transfer()?;
    dt.get_data(MARKER_MIME).ok().filter(|tag| !tag.is_empty())
}

/// Element an event target refers to, lifting text nodes to their parent.
pub fn target_element(target: &EventTarget) -> Option<Element> {
    if let Some(element) = target.dyn_ref::<Element>() {
        return Some(element.clone());
    }
    target.dyn_ref::<Node>()?.parent_element()
}

/// Rendered emotion run containing `target`, if it is inside the surface.
pub fn emotion_element(target: &EventTarget, surface: &Element) -> Option<Element> {
    let element = target_element(target)?
        .closest(&emotion_selector())
        .ok()??;
    surface.contains(Some(&element)).then_some(element)
}

/// Whether the pointer moved from inside `element` to somewhere outside it.
pub fn left_element(event: &MouseEvent, element: &Element) -> bool {
    match event.related_target() {
        Some(related) => related
            .dyn_ref::<Node>()
            .is_none_or(|node| !element.contains(Some(node))),
        None => true,
    }
}

/// Describe a rendered emotion run for the editor.
pub fn hover_probe(element: &Element) -> Option<HoverProbe> {
    let emotion = element.get_attribute(EMOTION_ATTR)?.parse::<EmotionId>().ok()?;
    Some(HoverProbe {
        emotion,
        text: element.text_content().unwrap_or_default(),
        rect: rect_from_dom(&element.get_bounding_client_rect()),
    })
}
