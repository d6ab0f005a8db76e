//! Browser DOM layer for the cuesheet script editor.
//!
//! This crate provides DOM manipulation and browser event plumbing for the
//! editor in `cuesheet-core`. It assumes a `wasm32-unknown-unknown` target
//! environment; the pure helpers (offset conversion, overlay markup) also run
//! natively.
//!
//! # Architecture
//!
//! - `dom_sync`: rendering the run tree into the surface and reading it back
//! - `cursor`: Selection API handling, caret restore, caret-from-point
//! - `clipboard`: async Clipboard API writes
//! - `timer`: dismiss-grace timers and deferred callbacks
//! - `events`: event extraction (keys, drag payloads, hovered emotion runs)
//! - `overlay`: popup, focus overlay and palette markup
//!
//! # Re-exports
//!
//! This crate re-exports `cuesheet-core` for convenience, so consumers
//! only need to depend on `cuesheet-browser`.

pub use cuesheet_core;
pub use cuesheet_core::*;

pub mod clipboard;
pub mod cursor;
pub mod dom_sync;
pub mod events;
pub mod overlay;
pub mod timer;

pub use clipboard::BrowserClipboard;
pub use cursor::BrowserCursor;
pub use dom_sync::{read_runs, render_script, surface_matches};
pub use overlay::{OverlayCommand, command_from_event, render_overlay, render_palette};
pub use timer::{DeferredTask, DismissTimer};
