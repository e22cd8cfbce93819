//! Shared helpers for the WASM API
//!
//! Serialization to JavaScript values and error conversion.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::error::EngineError;

/// Serialize a value to JavaScript with automatic error handling
pub fn serialize<T: Serialize>(value: &T, error_context: &str) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| {
        let msg = format!("{}: {}", error_context, e);
        log::error!("{}", msg);
        js_error(&msg)
    })
}

/// JavaScript `Error` carrying `msg`
pub fn js_error(msg: &str) -> JsValue {
    js_sys::Error::new(msg).into()
}

/// Convert an engine error to a JavaScript `Error`, logging it first
pub fn engine_error(context: &str, err: &EngineError) -> JsValue {
    let msg = format!("{}: {}", context, err);
    log::warn!("{}", msg);
    js_error(&msg)
}
