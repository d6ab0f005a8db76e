//! WASM bindings for the cuesheet script editor.
//!
//! Provides `JsScriptEditor`, an embeddable annotation editor for
//! JavaScript/TypeScript pages. Hosts supply the elements; the editor owns the
//! event listeners and everything rendered into them.

mod editor;
mod types;

pub use editor::*;
pub use types::*;

use wasm_bindgen::prelude::*;

/// Initialize the panic hook and console logging.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();

    use tracing::Level;
    use tracing::subscriber::set_global_default;
    use tracing_subscriber::Registry;
    use tracing_subscriber::layer::SubscriberExt;

    let console_level = if cfg!(debug_assertions) {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let wasm_layer = tracing_wasm::WASMLayer::new(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(console_level)
            .build(),
    );

    // A host may have installed its own subscriber already.
    if let Err(e) = set_global_default(Registry::default().with(wasm_layer)) {
        tracing::warn!("keeping existing tracing subscriber: {}", e);
    }
}
