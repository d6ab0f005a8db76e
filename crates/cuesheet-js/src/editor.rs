//! JsScriptEditor - the editor wrapper for JavaScript.
//!
//! Holds the core state machine and the mounted DOM. DOM events become
//! `EditorAction`s; the returned effects are carried out here.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use gloo_events::{EventListener, EventListenerOptions};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{DragEvent, Element, HtmlElement, InputEvent, KeyboardEvent, MouseEvent};

use cuesheet_browser::events::{
    accept_drag, drag_payload, emotion_element, hover_probe, key_from_event, left_element,
    point_from_mouse, set_drag_payload, target_element,
};
use cuesheet_browser::overlay::{POPUP_ATTR, marker_from_event};
use cuesheet_browser::{
    BrowserClipboard, BrowserCursor, ClipboardPlatform, CursorPlatform, DeferredTask, DismissTimer,
    EMOTIONS, EditorAction, EditorConfig, EditorView, Effect, OverlayCommand, PlainScript,
    ScriptDocument, ScriptEditor, SmolStr, SubmenuState, command_from_event, read_runs,
    render_overlay, render_palette, render_script, surface_matches,
};

use crate::types::{JsEmotion, JsMarker};

/// Class toggled on the surface while a marker is dragged over it.
const DRAG_OVER_CLASS: &str = "cuesheet-drag-over";

/// The editor instance exposed to JavaScript.
#[wasm_bindgen]
pub struct JsScriptEditor {
    inner: Rc<Inner>,
}

struct Inner {
    editor: RefCell<ScriptEditor<PlainScript>>,
    mounted: RefCell<Option<Mounted>>,
    palette: RefCell<Option<(Element, EventListener)>>,
    raw_output: RefCell<Option<Element>>,
    timer: RefCell<DismissTimer>,
    caret_task: RefCell<DeferredTask>,
    settle_task: RefCell<DeferredTask>,
    submenu: RefCell<SubmenuState>,
    /// Chrome as last drawn, to skip redundant overlay rebuilds.
    drawn: RefCell<Option<(EditorView, bool)>>,
    on_change: RefCell<Option<js_sys::Function>>,
    clipboard: BrowserClipboard,
}

struct Mounted {
    surface: Element,
    overlay: Element,
    cursor: BrowserCursor,
    // Dropped on unmount, which removes the listeners.
    _listeners: Vec<EventListener>,
}

#[wasm_bindgen]
impl JsScriptEditor {
    /// Create an editor. `config` is a plain object; missing fields take defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<JsScriptEditor, JsError> {
        let config: EditorConfig = if config.is_undefined() || config.is_null() {
            EditorConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)
                .map_err(|e| JsError::new(&format!("Invalid config: {}", e)))?
        };
        let script = config.initial_script.clone().unwrap_or_default();
        let editor = ScriptEditor::new(PlainScript::new(&script), config);

        Ok(Self {
            inner: Rc::new(Inner {
                editor: RefCell::new(editor),
                mounted: RefCell::new(None),
                palette: RefCell::new(None),
                raw_output: RefCell::new(None),
                timer: RefCell::new(DismissTimer::new()),
                caret_task: RefCell::new(DeferredTask::new()),
                settle_task: RefCell::new(DeferredTask::new()),
                submenu: RefCell::new(SubmenuState::default()),
                drawn: RefCell::new(None),
                on_change: RefCell::new(None),
                clipboard: BrowserClipboard::new(),
            }),
        })
    }

    // === Mounting ===

    /// Mount on two host elements: the editing surface and an overlay host for
    /// popups and the focus spotlight.
    #[wasm_bindgen]
    pub fn mount(&self, editor_id: &str, overlay_id: &str) -> Result<(), JsError> {
        self.unmount();

        let surface = element_by_id(editor_id)?;
        let overlay = element_by_id(overlay_id)?;

        surface
            .set_attribute("contenteditable", "true")
            .map_err(|e| JsError::new(&format!("Failed to set contenteditable: {:?}", e)))?;
        surface
            .set_attribute("spellcheck", "false")
            .map_err(|e| JsError::new(&format!("Failed to set spellcheck: {:?}", e)))?;
        if let Some(html) = surface.dyn_ref::<HtmlElement>() {
            if let Err(e) = html.style().set_property("white-space", "pre-wrap") {
                tracing::warn!("failed to set white-space on surface: {:?}", e);
            }
        }

        let listeners = attach_listeners(&self.inner, &surface, &overlay)?;
        *self.inner.mounted.borrow_mut() = Some(Mounted {
            cursor: BrowserCursor::new(surface.clone()),
            surface,
            overlay,
            _listeners: listeners,
        });

        tracing::debug!(target: "cuesheet::editor", editor_id, overlay_id, "mounted");
        render_surface(&self.inner, None);
        refresh_chrome(&self.inner);
        update_raw_output(&self.inner);
        Ok(())
    }

    /// Render the legend and draggable markers into a host element.
    #[wasm_bindgen(js_name = mountPalette)]
    pub fn mount_palette(&self, id: &str) -> Result<(), JsError> {
        let host = element_by_id(id)?;
        render_palette(&host, &self.inner.editor.borrow().config().markers);
        let listener = EventListener::new(&host, "dragstart", |event| {
            let Some(event) = event.dyn_ref::<DragEvent>() else {
                return;
            };
            if let Some(tag) = marker_from_event(event) {
                tracing::trace!(target: "cuesheet::dom", %tag, "marker drag started");
                set_drag_payload(event, &tag);
            }
        });
        *self.inner.palette.borrow_mut() = Some((host, listener));
        Ok(())
    }

    /// Show the canonical text, read-only, in a host element.
    #[wasm_bindgen(js_name = mountRawOutput)]
    pub fn mount_raw_output(&self, id: &str) -> Result<(), JsError> {
        let host = element_by_id(id)?;
        *self.inner.raw_output.borrow_mut() = Some(host);
        update_raw_output(&self.inner);
        Ok(())
    }

    /// Check if the editor is mounted.
    #[wasm_bindgen(js_name = isMounted)]
    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.borrow().is_some()
    }

    /// Detach from all host elements and remove listeners.
    #[wasm_bindgen]
    pub fn unmount(&self) {
        self.inner.timer.borrow_mut().cancel();
        self.inner.caret_task.borrow_mut().cancel();
        self.inner.settle_task.borrow_mut().cancel();
        if let Some(mounted) = self.inner.mounted.borrow_mut().take() {
            if let Err(e) = mounted.surface.remove_attribute("contenteditable") {
                tracing::warn!("failed to remove contenteditable: {:?}", e);
            }
            mounted.overlay.set_inner_html("");
            tracing::debug!(target: "cuesheet::editor", "unmounted");
        }
        if let Some((host, _listener)) = self.inner.palette.borrow_mut().take() {
            host.set_inner_html("");
        }
        *self.inner.raw_output.borrow_mut() = None;
        *self.inner.drawn.borrow_mut() = None;
    }

    // === Content ===

    /// Current canonical text.
    #[wasm_bindgen(js_name = getCanonical)]
    pub fn get_canonical(&self) -> String {
        self.inner.editor.borrow().canonical()
    }

    /// Replace the whole script with canonical text.
    #[wasm_bindgen(js_name = setCanonical)]
    pub fn set_canonical(&self, text: &str) {
        dispatch(&self.inner, EditorAction::ReplaceScript(text.to_string()));
    }

    /// Length of the canonical text in characters.
    #[wasm_bindgen(js_name = charCount)]
    pub fn char_count(&self) -> usize {
        self.inner.editor.borrow().document().char_count()
    }

    /// Copy the canonical text to the clipboard.
    #[wasm_bindgen(js_name = copyAll)]
    pub fn copy_all(&self) {
        dispatch(&self.inner, EditorAction::CopyAll);
    }

    /// Called with the canonical text after every content change.
    #[wasm_bindgen(js_name = onChange)]
    pub fn on_change(&self, callback: Option<js_sys::Function>) {
        *self.inner.on_change.borrow_mut() = callback;
    }

    // === Catalogs and view ===

    /// The emotion catalog.
    #[wasm_bindgen]
    pub fn emotions(&self) -> Result<JsValue, JsError> {
        let emotions: Vec<JsEmotion> = EMOTIONS.iter().map(JsEmotion::from).collect();
        serde_wasm_bindgen::to_value(&emotions)
            .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
    }

    /// The configured markers.
    #[wasm_bindgen]
    pub fn markers(&self) -> Result<JsValue, JsError> {
        let editor = self.inner.editor.borrow();
        let markers: Vec<JsMarker> = editor.config().markers.iter().map(JsMarker::from).collect();
        serde_wasm_bindgen::to_value(&markers)
            .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
    }

    /// Current popup/overlay view model.
    #[wasm_bindgen]
    pub fn view(&self) -> Result<JsValue, JsError> {
        serde_wasm_bindgen::to_value(&self.inner.editor.borrow().view())
            .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
    }

    /// Name of the current editor mode.
    #[wasm_bindgen]
    pub fn mode(&self) -> String {
        self.inner.editor.borrow().mode().name().to_string()
    }
}

impl Drop for JsScriptEditor {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn element_by_id(id: &str) -> Result<Element, JsError> {
    let window = web_sys::window().ok_or_else(|| JsError::new("No window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsError::new("No document"))?;
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsError::new(&format!("Element not found: #{}", id)))
}

// === Dispatch and effects ===

fn dispatch(inner: &Rc<Inner>, action: EditorAction) {
    let effects = inner.editor.borrow_mut().execute(action);
    for effect in effects {
        perform(inner, effect);
    }
    refresh_chrome(inner);
}

fn perform(inner: &Rc<Inner>, effect: Effect) {
    match effect {
        Effect::WriteClipboard(text) => inner.clipboard.write_text(&text),
        Effect::ClearNativeSelection => {
            if let Some(mounted) = inner.mounted.borrow().as_ref() {
                if let Err(e) = mounted.cursor.clear_selection() {
                    tracing::warn!("clear selection failed: {}", e);
                }
            }
        }
        Effect::Render { caret } => render_surface(inner, caret),
        Effect::FocusSurface => {
            if let Some(mounted) = inner.mounted.borrow().as_ref() {
                if let Some(html) = mounted.surface.dyn_ref::<HtmlElement>() {
                    if let Err(e) = html.focus() {
                        tracing::warn!("failed to focus surface: {:?}", e);
                    }
                }
            }
        }
        Effect::ScheduleDismiss { token, after_ms } => {
            let weak = Rc::downgrade(inner);
            inner.timer.borrow_mut().schedule(token, after_ms, move |token| {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let released = inner.timer.borrow_mut().fired(token);
                dispatch(&inner, EditorAction::DismissElapsed(token));
                drop(released);
            });
        }
        Effect::CancelDismiss => inner.timer.borrow_mut().cancel(),
        Effect::ContentChanged => {
            update_raw_output(inner);
            notify_change(inner);
        }
    }
}

/// Re-project the runs into the surface and put the caret back one tick later.
///
/// With no explicit caret, the live caret offset is carried over if the caret was
/// in the surface.
fn render_surface(inner: &Rc<Inner>, caret: Option<usize>) {
    let mounted = inner.mounted.borrow();
    let Some(mounted) = mounted.as_ref() else {
        return;
    };
    let caret = caret.or_else(|| mounted.cursor.caret_offset());
    render_script(&mounted.surface, inner.editor.borrow().document().runs());

    let Some(offset) = caret else {
        return;
    };
    let weak = Rc::downgrade(inner);
    inner
        .caret_task
        .borrow_mut()
        .next_tick(move || restore_caret(&weak, offset));
}

fn restore_caret(weak: &Weak<Inner>, offset: usize) {
    let Some(inner) = weak.upgrade() else {
        return;
    };
    let mounted = inner.mounted.borrow();
    let Some(mounted) = mounted.as_ref() else {
        return;
    };
    let editor = inner.editor.borrow();
    if let Err(e) = mounted.cursor.restore_caret(offset, editor.document().runs()) {
        tracing::warn!("caret restore failed: {}", e);
    }
}

/// Redraw popups and the focus overlay if the view changed.
fn refresh_chrome(inner: &Rc<Inner>) {
    let mounted = inner.mounted.borrow();
    let Some(mounted) = mounted.as_ref() else {
        return;
    };
    let view = inner.editor.borrow().view();
    let open = {
        let mut submenu = inner.submenu.borrow_mut();
        submenu.sync(view.popup.as_ref());
        submenu.is_open()
    };

    let mut drawn = inner.drawn.borrow_mut();
    if drawn.as_ref() == Some(&(view.clone(), open)) {
        return;
    }
    render_overlay(&mounted.overlay, &view, open);
    if let Err(e) = mounted
        .surface
        .class_list()
        .toggle_with_force(DRAG_OVER_CLASS, view.drag_over)
    {
        tracing::warn!("failed to toggle drag-over class: {:?}", e);
    }
    *drawn = Some((view, open));
}

fn update_raw_output(inner: &Rc<Inner>) {
    let raw = inner.raw_output.borrow();
    let Some(host) = raw.as_ref() else {
        return;
    };
    let editor = inner.editor.borrow();
    host.set_text_content(Some(&editor.canonical()));
    if let Err(e) = host.set_attribute("data-chars", &editor.document().char_count().to_string()) {
        tracing::warn!("failed to set data-chars: {:?}", e);
    }
}

fn notify_change(inner: &Rc<Inner>) {
    // Clone out so the callback may call back into the editor.
    let callback = inner.on_change.borrow().clone();
    if let Some(callback) = callback {
        let canonical = JsValue::from_str(&inner.editor.borrow().canonical());
        if let Err(e) = callback.call1(&JsValue::null(), &canonical) {
            tracing::warn!("onChange callback threw: {:?}", e);
        }
    }
}

// === Listeners ===

fn attach_listeners(
    inner: &Rc<Inner>,
    surface: &Element,
    overlay: &Element,
) -> Result<Vec<EventListener>, JsError> {
    let window = web_sys::window().ok_or_else(|| JsError::new("No window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsError::new("No document"))?;
    let mut listeners = Vec::new();

    // Selection popup: read the selection once the browser has settled it.
    {
        let weak = Rc::downgrade(inner);
        listeners.push(EventListener::new(surface, "mouseup", move |_| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let settle = inner.editor.borrow().config().selection_settle_ms;
            let weak = weak.clone();
            inner.settle_task.borrow_mut().after(settle, move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let probe = {
                    let mounted = inner.mounted.borrow();
                    let Some(mounted) = mounted.as_ref() else {
                        return;
                    };
                    let editor = inner.editor.borrow();
                    mounted.cursor.selection_probe(editor.document().runs())
                };
                dispatch(&inner, EditorAction::PointerUp(probe));
            });
        }));
    }

    // Hover over emotion runs.
    {
        let weak = Rc::downgrade(inner);
        let surface_el = surface.clone();
        listeners.push(EventListener::new(surface, "mouseover", move |event| {
            let (Some(inner), Some(event)) = (weak.upgrade(), event.dyn_ref::<MouseEvent>()) else {
                return;
            };
            let Some(target) = event.target() else {
                return;
            };
            let Some(element) = emotion_element(&target, &surface_el) else {
                return;
            };
            // Moving between children of the same run is not an enter.
            if !left_element(event, &element) {
                return;
            }
            if let Some(probe) = hover_probe(&element) {
                dispatch(&inner, EditorAction::EmotionEnter(probe));
            }
        }));
    }
    {
        let weak = Rc::downgrade(inner);
        let surface_el = surface.clone();
        listeners.push(EventListener::new(surface, "mouseout", move |event| {
            let (Some(inner), Some(event)) = (weak.upgrade(), event.dyn_ref::<MouseEvent>()) else {
                return;
            };
            let Some(target) = event.target() else {
                return;
            };
            let Some(element) = emotion_element(&target, &surface_el) else {
                return;
            };
            if left_element(event, &element) {
                dispatch(&inner, EditorAction::EmotionLeave);
            }
        }));
    }

    // Pointer over the popup keeps it alive.
    {
        let weak = Rc::downgrade(inner);
        listeners.push(EventListener::new(overlay, "mouseover", move |event| {
            let (Some(inner), Some(event)) = (weak.upgrade(), event.dyn_ref::<MouseEvent>()) else {
                return;
            };
            if let Some(popup) = event_popup(event) {
                if left_element(event, &popup) {
                    dispatch(&inner, EditorAction::PopupEnter);
                }
            }
        }));
    }
    {
        let weak = Rc::downgrade(inner);
        listeners.push(EventListener::new(overlay, "mouseout", move |event| {
            let (Some(inner), Some(event)) = (weak.upgrade(), event.dyn_ref::<MouseEvent>()) else {
                return;
            };
            if let Some(popup) = event_popup(event) {
                if left_element(event, &popup) {
                    dispatch(&inner, EditorAction::PopupLeave);
                }
            }
        }));
    }

    // Keep the native selection when pressing popup buttons.
    listeners.push(EventListener::new_with_options(
        overlay,
        "mousedown",
        EventListenerOptions::enable_prevent_default(),
        |event| {
            if let Some(event) = event.dyn_ref::<MouseEvent>() {
                if event_popup(event).is_some() {
                    event.prevent_default();
                }
            }
        },
    ));

    // Popup and overlay controls.
    {
        let weak = Rc::downgrade(inner);
        listeners.push(EventListener::new(overlay, "click", move |event| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            match command_from_event(event) {
                Some(OverlayCommand::Action(action)) => dispatch(&inner, action),
                Some(OverlayCommand::ToggleSubmenu) => {
                    inner.submenu.borrow_mut().toggle();
                    refresh_chrome(&inner);
                }
                None => {}
            }
        }));
    }

    // Native typing.
    for event_type in ["input", "compositionend"] {
        let weak = Rc::downgrade(inner);
        listeners.push(EventListener::new(surface, event_type, move |event| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if event
                .dyn_ref::<InputEvent>()
                .is_some_and(InputEvent::is_composing)
            {
                return;
            }
            surface_input(&inner);
        }));
    }

    // Click-away closes the selection popup.
    {
        let weak = Rc::downgrade(inner);
        let surface_el = surface.clone();
        let overlay_el = overlay.clone();
        listeners.push(EventListener::new(&document, "mousedown", move |event| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let inside = event
                .target()
                .and_then(|t| target_element(&t))
                .is_some_and(|el| surface_el.contains(Some(&el)) || overlay_el.contains(Some(&el)));
            if !inside {
                dispatch(&inner, EditorAction::DismissSelection);
            }
        }));
    }

    // Escape exits focus mode or closes the selection popup, wherever focus is.
    {
        let weak = Rc::downgrade(inner);
        listeners.push(EventListener::new(&document, "keydown", move |event| {
            let (Some(inner), Some(event)) = (weak.upgrade(), event.dyn_ref::<KeyboardEvent>())
            else {
                return;
            };
            dispatch(&inner, EditorAction::KeyDown(key_from_event(event)));
        }));
    }

    // Marker drag and drop.
    {
        let weak = Rc::downgrade(inner);
        listeners.push(EventListener::new_with_options(
            surface,
            "dragover",
            EventListenerOptions::enable_prevent_default(),
            move |event| {
                let (Some(inner), Some(event)) = (weak.upgrade(), event.dyn_ref::<DragEvent>())
                else {
                    return;
                };
                accept_drag(event);
                let already = inner.editor.borrow().is_drag_over();
                if !already {
                    dispatch(&inner, EditorAction::DragOver(true));
                }
            },
        ));
    }
    {
        let weak = Rc::downgrade(inner);
        let surface_el = surface.clone();
        listeners.push(EventListener::new(surface, "dragleave", move |event| {
            let (Some(inner), Some(event)) = (weak.upgrade(), event.dyn_ref::<DragEvent>()) else {
                return;
            };
            if left_element(event, &surface_el) {
                dispatch(&inner, EditorAction::DragOver(false));
            }
        }));
    }
    {
        let weak = Rc::downgrade(inner);
        listeners.push(EventListener::new_with_options(
            surface,
            "drop",
            EventListenerOptions::enable_prevent_default(),
            move |event| {
                let (Some(inner), Some(event)) = (weak.upgrade(), event.dyn_ref::<DragEvent>())
                else {
                    return;
                };
                event.prevent_default();
                let tag = drag_payload(event).unwrap_or_default();
                let at = {
                    let mounted = inner.mounted.borrow();
                    let editor = inner.editor.borrow();
                    mounted.as_ref().and_then(|m| {
                        m.cursor
                            .caret_from_point(point_from_mouse(event), editor.document().runs())
                    })
                };
                dispatch(
                    &inner,
                    EditorAction::DropMarker {
                        tag: SmolStr::from(tag),
                        at,
                    },
                );
            },
        ));
    }

    // Stray drops outside the surface must not navigate the page.
    for event_type in ["dragover", "drop"] {
        let surface_el = surface.clone();
        listeners.push(EventListener::new_with_options(
            &window,
            event_type,
            EventListenerOptions::enable_prevent_default(),
            move |event| {
                let inside = event
                    .target()
                    .and_then(|t| target_element(&t))
                    .is_some_and(|el| surface_el.contains(Some(&el)));
                if !inside {
                    event.prevent_default();
                }
            },
        ));
    }

    Ok(listeners)
}

/// Popup element an event happened in, if any.
fn event_popup(event: &MouseEvent) -> Option<Element> {
    let target = event.target()?;
    target_element(&target)?
        .closest(&format!("[{}]", POPUP_ATTR))
        .ok()?
}

/// Read native edits back from the surface.
fn surface_input(inner: &Rc<Inner>) {
    let (runs, caret) = {
        let mounted = inner.mounted.borrow();
        let Some(mounted) = mounted.as_ref() else {
            return;
        };
        (read_runs(&mounted.surface), mounted.cursor.caret_offset())
    };
    dispatch(inner, EditorAction::SurfaceInput { runs, caret });

    // The browser may leave stray nodes even when the text reparses identically.
    let in_sync = {
        let mounted = inner.mounted.borrow();
        let editor = inner.editor.borrow();
        mounted
            .as_ref()
            .is_none_or(|m| surface_matches(&m.surface, editor.document().runs()))
    };
    if !in_sync {
        tracing::trace!(target: "cuesheet::dom", "surface drifted, re-rendering");
        render_surface(inner, caret);
    }
}
