//! The editor state machine.
//!
//! `ScriptEditor` owns a document and the editor-level mode. Every input goes through
//! [`ScriptEditor::execute`], which mutates the document and mode and returns the
//! effects the host has to carry out (clipboard writes, re-rendering, timers).
//!
//! The four modes are mutually exclusive: at most one popup is visible, and focus
//! mode suppresses both.

use smol_str::SmolStr;

use crate::actions::{DismissToken, EditorAction, Effect, HoverProbe, Key, Range, SelectionProbe};
use crate::config::EditorConfig;
use crate::document::{ScriptDocument, SurfaceSync};
use crate::grammar::EmotionId;
use crate::runs::{RunPosition, RunTree};
use crate::types::{Point, Rect};
use crate::view::EditorView;

/// A qualifying selection, captured when the selection popup opened.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionSnapshot {
    pub range: Range,
    pub text: String,
    pub rect: Rect,
    /// Top-center of the selection's bounding box.
    pub anchor: Point,
}

/// The emotion run the hover popup is about.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverSnapshot {
    pub emotion: EmotionId,
    pub text: String,
    pub anchor: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HoverState {
    pub snapshot: HoverSnapshot,
    pub pointer_over_popup: bool,
    /// Dismissal currently scheduled, if any.
    pub pending: Option<DismissToken>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum EditorMode {
    #[default]
    Idle,
    SelectionPopup(SelectionSnapshot),
    HoverPopup(HoverState),
    /// Spotlight around the given rectangle.
    Focus(Rect),
}

impl EditorMode {
    pub fn name(&self) -> &'static str {
        match self {
            EditorMode::Idle => "idle",
            EditorMode::SelectionPopup(_) => "selection-popup",
            EditorMode::HoverPopup(_) => "hover-popup",
            EditorMode::Focus(_) => "focus",
        }
    }
}

/// Script editor: document plus mode.
pub struct ScriptEditor<D: ScriptDocument> {
    doc: D,
    mode: EditorMode,
    config: EditorConfig,
    drag_over: bool,
    next_token: u64,
}

impl<D: ScriptDocument> ScriptEditor<D> {
    pub fn new(doc: D, config: EditorConfig) -> Self {
        Self {
            doc,
            mode: EditorMode::Idle,
            config,
            drag_over: false,
            next_token: 0,
        }
    }

    pub fn document(&self) -> &D {
        &self.doc
    }

    pub fn mode(&self) -> &EditorMode {
        &self.mode
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn is_drag_over(&self) -> bool {
        self.drag_over
    }

    /// Canonical text of the document.
    pub fn canonical(&self) -> String {
        self.doc.canonical()
    }

    /// View model for the current state.
    pub fn view(&self) -> EditorView {
        EditorView::build(&self.mode, &self.config, self.drag_over, self.doc.char_count())
    }

    /// Apply an action. This is the only way the mode changes.
    pub fn execute(&mut self, action: EditorAction) -> Vec<Effect> {
        let before = self.mode.name();
        let effects = match action {
            EditorAction::PointerUp(probe) => self.pointer_up(probe),
            EditorAction::EmotionEnter(probe) => self.emotion_enter(probe),
            EditorAction::EmotionLeave => self.emotion_leave(),
            EditorAction::PopupEnter => self.popup_enter(),
            EditorAction::PopupLeave => self.popup_leave(),
            EditorAction::DismissElapsed(token) => self.dismiss_elapsed(token),
            EditorAction::Copy => self.copy_selection(),
            EditorAction::Cut => self.cut_selection(),
            EditorAction::ApplyEmotion(emotion) => self.apply_emotion(emotion),
            EditorAction::Focus => self.focus_selection(),
            EditorAction::DismissSelection => self.dismiss_selection(),
            EditorAction::ChangeEmotion(emotion) => self.change_emotion(emotion),
            EditorAction::RemoveEmotion => self.remove_emotion(),
            EditorAction::CloseFocus => self.close_focus(),
            EditorAction::KeyDown(key) => self.key_down(key),
            EditorAction::DragOver(over) => {
                self.drag_over = over;
                Vec::new()
            }
            EditorAction::DropMarker { tag, at } => self.drop_marker(tag, at),
            EditorAction::SurfaceInput { runs, caret } => self.surface_input(runs, caret),
            EditorAction::ReplaceScript(text) => self.replace_script(&text),
            EditorAction::CopyAll => vec![Effect::WriteClipboard(self.doc.canonical())],
        };
        let after = self.mode.name();
        if before != after {
            tracing::debug!(target: "cuesheet::editor", from = before, to = after, "mode changed");
        }
        effects
    }

    // === Mode helpers ===

    /// Switch modes, cancelling a pending hover dismissal when leaving the hover popup.
    fn set_mode(&mut self, mode: EditorMode, effects: &mut Vec<Effect>) {
        if let EditorMode::HoverPopup(HoverState {
            pending: Some(_), ..
        }) = self.mode
        {
            effects.push(Effect::CancelDismiss);
        }
        self.mode = mode;
    }

    fn next_token(&mut self) -> DismissToken {
        self.next_token += 1;
        DismissToken(self.next_token)
    }

    /// Close the selection popup if it is open.
    fn drop_selection_popup(&mut self) -> Vec<Effect> {
        if matches!(self.mode, EditorMode::SelectionPopup(_)) {
            self.mode = EditorMode::Idle;
        }
        Vec::new()
    }

    fn take_selection(&mut self) -> Option<SelectionSnapshot> {
        match std::mem::take(&mut self.mode) {
            EditorMode::SelectionPopup(snapshot) => Some(snapshot),
            other => {
                self.mode = other;
                None
            }
        }
    }

    // === Selection & hover tracking ===

    fn pointer_up(&mut self, probe: Option<SelectionProbe>) -> Vec<Effect> {
        if matches!(self.mode, EditorMode::Focus(_)) {
            return Vec::new();
        }
        let Some(probe) = probe else {
            return self.drop_selection_popup();
        };
        if probe.text.trim().is_empty() {
            return self.drop_selection_popup();
        }

        let runs = self.doc.runs();
        if runs.emotion_at(probe.anchor).is_some() || runs.emotion_at(probe.head).is_some() {
            tracing::trace!(target: "cuesheet::editor", "selection touches an emotion run");
            return self.drop_selection_popup();
        }

        let range = Range::new(runs.offset_of(probe.anchor), runs.offset_of(probe.head)).normalize();
        if range.is_empty() {
            return self.drop_selection_popup();
        }

        let text = runs.slice(range.into()).unwrap_or(probe.text);
        let snapshot = SelectionSnapshot {
            range,
            text,
            rect: probe.rect,
            anchor: probe.rect.top_center(),
        };
        let mut effects = Vec::new();
        self.set_mode(EditorMode::SelectionPopup(snapshot), &mut effects);
        effects
    }

    fn emotion_enter(&mut self, probe: HoverProbe) -> Vec<Effect> {
        let mut effects = Vec::new();
        match &self.mode {
            EditorMode::Focus(_) | EditorMode::SelectionPopup(_) => return effects,
            EditorMode::HoverPopup(HoverState {
                pending: Some(_), ..
            }) => effects.push(Effect::CancelDismiss),
            _ => {}
        }
        self.mode = EditorMode::HoverPopup(HoverState {
            snapshot: HoverSnapshot {
                emotion: probe.emotion,
                text: probe.text,
                anchor: probe.rect.top_center(),
            },
            pointer_over_popup: false,
            pending: None,
        });
        effects
    }

    fn schedule_dismiss(&mut self) -> Vec<Effect> {
        let token = self.next_token();
        let after_ms = self.config.hover_grace_ms;
        match &mut self.mode {
            EditorMode::HoverPopup(state) => {
                state.pending = Some(token);
                vec![Effect::ScheduleDismiss { token, after_ms }]
            }
            _ => Vec::new(),
        }
    }

    fn emotion_leave(&mut self) -> Vec<Effect> {
        let schedule = matches!(&self.mode, EditorMode::HoverPopup(state) if !state.pointer_over_popup);
        if schedule {
            self.schedule_dismiss()
        } else {
            Vec::new()
        }
    }

    fn popup_enter(&mut self) -> Vec<Effect> {
        match &mut self.mode {
            EditorMode::HoverPopup(state) => {
                state.pointer_over_popup = true;
                match state.pending.take() {
                    Some(_) => vec![Effect::CancelDismiss],
                    None => Vec::new(),
                }
            }
            _ => Vec::new(),
        }
    }

    fn popup_leave(&mut self) -> Vec<Effect> {
        match &mut self.mode {
            EditorMode::HoverPopup(state) => {
                state.pointer_over_popup = false;
                self.schedule_dismiss()
            }
            _ => Vec::new(),
        }
    }

    fn dismiss_elapsed(&mut self, token: DismissToken) -> Vec<Effect> {
        let (pending, over_popup) = match &self.mode {
            EditorMode::HoverPopup(state) => (state.pending, state.pointer_over_popup),
            _ => (None, false),
        };
        if pending != Some(token) {
            tracing::trace!(target: "cuesheet::editor", ?token, "stale dismiss token");
            return Vec::new();
        }

        if over_popup {
            if let EditorMode::HoverPopup(state) = &mut self.mode {
                state.pending = None;
            }
        } else {
            self.mode = EditorMode::Idle;
        }
        Vec::new()
    }

    // === Selection popup ===

    fn copy_selection(&mut self) -> Vec<Effect> {
        match self.take_selection() {
            Some(snapshot) => vec![Effect::WriteClipboard(snapshot.text)],
            None => Vec::new(),
        }
    }

    fn cut_selection(&mut self) -> Vec<Effect> {
        let Some(snapshot) = self.take_selection() else {
            return Vec::new();
        };
        let mut effects = vec![Effect::WriteClipboard(snapshot.text)];
        match self.doc.delete_range(snapshot.range.into()) {
            Ok(_) => {
                effects.push(Effect::Render {
                    caret: Some(self.doc.cursor_offset()),
                });
                effects.push(Effect::ContentChanged);
            }
            Err(e) => {
                tracing::warn!(target: "cuesheet::editor", "cut failed: {}", e);
            }
        }
        effects
    }

    fn apply_emotion(&mut self, emotion: EmotionId) -> Vec<Effect> {
        let Some(snapshot) = self.take_selection() else {
            return Vec::new();
        };
        let mut effects = vec![Effect::ClearNativeSelection];
        match self.doc.wrap_selection(snapshot.range.into(), emotion) {
            Ok(_) => {
                effects.push(Effect::Render {
                    caret: Some(snapshot.range.end),
                });
                effects.push(Effect::ContentChanged);
            }
            Err(e) => {
                tracing::warn!(target: "cuesheet::editor", %emotion, "wrap rejected: {}", e);
            }
        }
        effects
    }

    fn focus_selection(&mut self) -> Vec<Effect> {
        match self.take_selection() {
            Some(snapshot) => {
                self.mode = EditorMode::Focus(snapshot.rect);
                vec![Effect::ClearNativeSelection]
            }
            None => Vec::new(),
        }
    }

    fn dismiss_selection(&mut self) -> Vec<Effect> {
        self.drop_selection_popup()
    }

    // === Hover popup ===

    fn change_emotion(&mut self, new: EmotionId) -> Vec<Effect> {
        let EditorMode::HoverPopup(state) = &self.mode else {
            return Vec::new();
        };
        let old = state.snapshot.emotion;
        if old == new {
            return Vec::new();
        }
        let text = state.snapshot.text.clone();

        match self.doc.change_emotion(old, &text, new) {
            Ok(_) => {
                if let EditorMode::HoverPopup(state) = &mut self.mode {
                    state.snapshot.emotion = new;
                }
                vec![Effect::Render { caret: None }, Effect::ContentChanged]
            }
            Err(e) => {
                tracing::warn!(target: "cuesheet::editor", %old, %new, "emotion change skipped: {}", e);
                let mut effects = Vec::new();
                self.set_mode(EditorMode::Idle, &mut effects);
                effects
            }
        }
    }

    fn remove_emotion(&mut self) -> Vec<Effect> {
        let EditorMode::HoverPopup(state) = &self.mode else {
            return Vec::new();
        };
        let emotion = state.snapshot.emotion;
        let text = state.snapshot.text.clone();

        let mut effects = Vec::new();
        self.set_mode(EditorMode::Idle, &mut effects);
        match self.doc.remove_emotion(emotion, &text) {
            Ok(_) => {
                effects.push(Effect::Render { caret: None });
                effects.push(Effect::ContentChanged);
            }
            Err(e) => {
                tracing::warn!(target: "cuesheet::editor", %emotion, "emotion removal skipped: {}", e);
            }
        }
        effects
    }

    // === Focus mode ===

    fn close_focus(&mut self) -> Vec<Effect> {
        if matches!(self.mode, EditorMode::Focus(_)) {
            self.mode = EditorMode::Idle;
        }
        Vec::new()
    }

    fn key_down(&mut self, key: Key) -> Vec<Effect> {
        if key != Key::Escape {
            return Vec::new();
        }
        match self.mode {
            EditorMode::Focus(_) => self.close_focus(),
            EditorMode::SelectionPopup(_) => self.dismiss_selection(),
            _ => Vec::new(),
        }
    }

    // === Drag and drop ===

    fn drop_marker(&mut self, tag: SmolStr, at: Option<RunPosition>) -> Vec<Effect> {
        self.drag_over = false;
        if matches!(self.mode, EditorMode::Focus(_)) || tag.is_empty() {
            return Vec::new();
        }
        let Some(pos) = at else {
            tracing::debug!(target: "cuesheet::editor", %tag, "drop outside surface ignored");
            return Vec::new();
        };

        let mut effects = Vec::new();
        self.set_mode(EditorMode::Idle, &mut effects);
        self.doc.insert_marker(pos, &tag);
        effects.push(Effect::Render {
            caret: Some(self.doc.cursor_offset()),
        });
        effects.push(Effect::FocusSurface);
        effects.push(Effect::ContentChanged);
        effects
    }

    // === Content ===

    fn surface_input(&mut self, runs: RunTree, caret: Option<usize>) -> Vec<Effect> {
        let before = self.doc.canonical();
        let sync = self.doc.sync_from_surface(runs, caret);
        let mut effects = self.drop_selection_popup();
        if sync == SurfaceSync::Restructured {
            effects.push(Effect::Render {
                caret: Some(self.doc.cursor_offset()),
            });
        }
        if self.doc.canonical() != before {
            effects.push(Effect::ContentChanged);
        }
        effects
    }

    fn replace_script(&mut self, text: &str) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.set_mode(EditorMode::Idle, &mut effects);
        self.doc.replace_canonical(text);
        effects.push(Effect::Render { caret: None });
        effects.push(Effect::ContentChanged);
        effects
    }
}
