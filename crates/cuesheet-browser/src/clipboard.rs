//! Browser clipboard implementation.
//!
//! Writes go through the async Clipboard API. The editor never waits on them;
//! failures (no permission, insecure context) are logged and dropped.

use cuesheet_core::ClipboardPlatform;
use wasm_bindgen::JsValue;

/// Clipboard access through `navigator.clipboard`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserClipboard;

impl BrowserClipboard {
    pub fn new() -> Self {
        Self
    }
}

impl ClipboardPlatform for BrowserClipboard {
    fn write_text(&self, text: &str) {
        let text = text.to_string();
        wasm_bindgen_futures::spawn_local(async move {
            match write_clipboard_text(&text).await {
                Ok(()) => tracing::debug!(
                    target: "cuesheet::clipboard",
                    chars = text.chars().count(),
                    "copied to clipboard"
                ),
                Err(e) => tracing::warn!("Clipboard write failed: {:?}", e),
            }
        });
    }
}

/// Write plain text to the system clipboard.
pub async fn write_clipboard_text(text: &str) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let clipboard = window.navigator().clipboard();
    let promise = clipboard.write_text(text);
    wasm_bindgen_futures::JsFuture::from(promise).await?;
    Ok(())
}
