//! cuesheet-core: annotation engine for audio-drama scripts, without framework dependencies.
//!
//! This crate provides:
//! - The tag grammar: emotion catalog and marker tokens
//! - `RunTree` with the single-pass tokenizer and serializer (round-trip safe)
//! - `ScriptDocument` trait with all mutation operations, and `PlainScript`
//! - `ScriptEditor`, the explicit state machine driving popups and focus mode
//! - HTML projection and view models for hosts to render

pub mod actions;
pub mod color;
pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod grammar;
pub mod parse;
pub mod platform;
pub mod render;
pub mod runs;
pub mod types;
pub mod view;

pub use actions::{DismissToken, EditorAction, Effect, HoverProbe, Key, Range, SelectionProbe};
pub use config::EditorConfig;
pub use document::{PlainScript, ScriptDocument, SurfaceSync};
pub use editor::{EditorMode, HoverSnapshot, HoverState, ScriptEditor, SelectionSnapshot};
pub use error::ScriptError;
pub use grammar::{
    EMOTIONS, EXAMPLE_SCRIPT, Emotion, EmotionId, MarkerKind, MarkerToken, default_markers, emotion,
};
pub use parse::{parse_to_runs, serialize_runs};
pub use platform::{ClipboardPlatform, CursorPlatform, PlatformError};
pub use render::{EMOTION_ATTR, EMOTION_CLASS, RUN_INDEX_ATTR, emotion_style, render_html};
pub use runs::{EmotionSpan, Run, RunPosition, RunTree};
pub use smol_str::SmolStr;
pub use types::{Affinity, CursorState, EditInfo, EditKind, Point, Rect};
pub use view::{EditorView, FocusOverlayView, PopupView, SubmenuState};
