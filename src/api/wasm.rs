//! JavaScript-facing session object
//!
//! A `ShopSession` owns one engine. The host persists it between page loads with
//! `freeze()` / `thaw()`.

use wasm_bindgen::prelude::*;

use crate::api::commands::{CommandRequest, CommandResponse};
use crate::api::helpers::{engine_error, serialize};
use crate::converters::{ExportFormat, MusicXmlCodec};
use crate::engine::{freeze, thaw, MusicEngine};

#[wasm_bindgen]
pub struct ShopSession {
    engine: MusicEngine,
    codec: MusicXmlCodec,
}

impl Default for ShopSession {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl ShopSession {
    #[wasm_bindgen(constructor)]
    pub fn new() -> ShopSession {
        ShopSession {
            engine: MusicEngine::new(),
            codec: MusicXmlCodec::new(),
        }
    }

    /// Load a score file; returns a `CommandResponse`
    #[wasm_bindgen(js_name = loadScore)]
    pub fn load_score(&mut self, bytes: &[u8], filename: &str) -> Result<JsValue, JsValue> {
        let response = match MusicEngine::load_from_source(bytes, filename, &self.codec) {
            Ok(engine) => {
                self.engine = engine;
                CommandResponse::from_engine(&self.engine, &self.codec)
                    .unwrap_or_else(|err| CommandResponse::failure("Export failed", &err))
            }
            Err(err) => CommandResponse::failure("Could not load score", &err),
        };
        serialize(&response, "loadScore")
    }

    /// Run a JSON command such as `{"command":"transpose","semitones":2}`
    pub fn command(&mut self, json: &str) -> Result<JsValue, JsValue> {
        let response = CommandRequest::from_json(json)
            .and_then(|request| request.apply(&mut self.engine))
            .and_then(|_| CommandResponse::from_engine(&self.engine, &self.codec))
            .unwrap_or_else(|err| CommandResponse::failure("Command failed", &err));
        serialize(&response, "command")
    }

    pub fn freeze(&self) -> Result<Vec<u8>, JsValue> {
        freeze(&self.engine).map_err(|err| engine_error("freeze", &err))
    }

    pub fn thaw(&mut self, bytes: &[u8]) -> Result<(), JsValue> {
        self.engine = thaw(bytes).map_err(|err| engine_error("thaw", &err))?;
        Ok(())
    }

    #[wasm_bindgen(js_name = exportMusicXml)]
    pub fn export_musicxml(&self) -> Result<String, JsValue> {
        self.engine
            .export(ExportFormat::MusicXml, &self.codec)
            .map_err(|err| engine_error("exportMusicXml", &err))
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.engine.history().can_undo()
    }

    #[wasm_bindgen(js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.engine.history().can_redo()
    }
}
