//! Barbershop Score Engine WASM Module
//!
//! Loads lead sheets, transposes them with sane key choices, arranges them for four
//! barbershop voices and keeps an undoable, freezable session around the result.

pub mod api;
pub mod arranger;
pub mod config;
pub mod converters;
pub mod engine;
pub mod error;
pub mod models;
pub mod transposition;
pub mod undo;

// Re-export commonly used types
pub use config::EngineConfig;
pub use converters::{ExportFormat, FormatCodec, MusicXmlCodec};
pub use engine::{freeze, thaw, thaw_or_default, MusicEngine};
pub use error::{CodecError, EngineError, EngineResult, ErrorClass};
pub use models::*;

use wasm_bindgen::prelude::*;

// This is like the `main` function, but for WASM modules.
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    init_logging();
    log::info!("Barbershop score engine WASM module initialized");
}

#[cfg(feature = "console_log")]
fn init_logging() {
    if console_log::init_with_level(log::Level::Info).is_err() {
        log::warn!("Logger was already initialized");
    }
}

#[cfg(not(feature = "console_log"))]
fn init_logging() {}
