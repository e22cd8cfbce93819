//! Command requests and responses
//!
//! Requests arrive either as form fields (`command=transpose&semitones=2`) or as JSON
//! (`{"command":"transpose","semitones":2}`). Each one runs against a thawed engine and
//! answers with the current MusicXML plus the chord options on offer.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

use crate::api::session::SessionStore;
use crate::config::EngineConfig;
use crate::converters::{ExportFormat, FormatCodec};
use crate::engine::{freeze, thaw_or_default, MusicEngine};
use crate::error::{EngineError, EngineResult, ErrorClass};
use crate::models::{ArrangementType, ChordOptionSet};

#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrString {
    Int(i32),
    Str(String),
}

fn semitones_field<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    match IntOrString::deserialize(deserializer)? {
        IntOrString::Int(n) => Ok(n),
        IntOrString::Str(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid semitones: \"{}\"", s))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum CommandRequest {
    Transpose {
        #[serde(deserialize_with = "semitones_field")]
        semitones: i32,
    },
    ShopIt {
        #[serde(rename = "arrangementType")]
        arrangement_type: String,
    },
    ChooseChordOption {
        #[serde(rename = "chordOptionId")]
        chord_option_id: String,
    },
    HideChordOptions,
    ShowChordOptions,
    Undo,
    Redo,
}

impl CommandRequest {
    /// Build a request from submitted form fields
    pub fn from_form(fields: &HashMap<String, String>) -> EngineResult<Self> {
        let field = |name: &str| {
            fields
                .get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };
        let command = field("command").unwrap_or_default();
        match command {
            "transpose" => {
                let text = field("semitones").ok_or_else(|| {
                    EngineError::InvalidCommand("transpose needs semitones".to_string())
                })?;
                let semitones = text.parse().map_err(|_| {
                    EngineError::InvalidCommand(format!("invalid semitones: \"{}\"", text))
                })?;
                Ok(CommandRequest::Transpose { semitones })
            }
            "shopIt" => Ok(CommandRequest::ShopIt {
                arrangement_type: field("arrangementType")
                    .ok_or_else(|| {
                        EngineError::InvalidCommand("shopIt needs arrangementType".to_string())
                    })?
                    .to_string(),
            }),
            "chooseChordOption" => Ok(CommandRequest::ChooseChordOption {
                chord_option_id: field("chordOptionId")
                    .ok_or_else(|| {
                        EngineError::InvalidCommand(
                            "chooseChordOption needs chordOptionId".to_string(),
                        )
                    })?
                    .to_string(),
            }),
            "hideChordOptions" => Ok(CommandRequest::HideChordOptions),
            "showChordOptions" => Ok(CommandRequest::ShowChordOptions),
            "undo" => Ok(CommandRequest::Undo),
            "redo" => Ok(CommandRequest::Redo),
            other => Err(EngineError::InvalidCommand(format!(
                "unknown command \"{}\"",
                other
            ))),
        }
    }

    pub fn from_json(json: &str) -> EngineResult<Self> {
        serde_json::from_str(json).map_err(|e| EngineError::InvalidCommand(e.to_string()))
    }

    /// Run against `engine`; nothing changes on error
    pub fn apply(&self, engine: &mut MusicEngine) -> EngineResult<()> {
        if engine.score().is_none() {
            return Err(EngineError::NoScore);
        }
        match self {
            CommandRequest::Transpose { semitones } => engine.transpose(*semitones).map(|_| ()),
            CommandRequest::ShopIt { arrangement_type } => {
                let target = ArrangementType::parse(arrangement_type).ok_or_else(|| {
                    EngineError::InvalidCommand(format!(
                        "invalid arrangementType: \"{}\"",
                        arrangement_type
                    ))
                })?;
                engine.arrange(target)
            }
            CommandRequest::ChooseChordOption { chord_option_id } => {
                engine.choose_chord_option(chord_option_id).map(|_| ())
            }
            CommandRequest::HideChordOptions => engine.hide_chord_options(),
            CommandRequest::ShowChordOptions => engine.show_chord_options(),
            CommandRequest::Undo => engine.undo().map(|_| ()),
            CommandRequest::Redo => engine.redo().map(|_| ()),
        }
    }
}

/// One selectable chord in an option set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChordChoiceView {
    pub id: String,
    pub figure: String,
    pub chosen: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChordOptionView {
    pub id: String,
    pub melody: String,
    /// The original chord first, then the alternatives
    pub choices: Vec<ChordChoiceView>,
}

impl From<&ChordOptionSet> for ChordOptionView {
    fn from(set: &ChordOptionSet) -> Self {
        let mut choices = vec![ChordChoiceView {
            id: set.original_id(),
            figure: set.original.figure(),
            chosen: set.chosen.is_none(),
        }];
        choices.extend(set.options.iter().enumerate().map(|(index, chord)| ChordChoiceView {
            id: set.option_id(index + 1),
            figure: chord.figure(),
            chosen: set.chosen == Some(index),
        }));
        Self {
            id: set.id.clone(),
            melody: set.melody.to_string(),
            choices,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub musicxml: Option<String>,
    #[serde(default)]
    pub chord_options: Vec<ChordOptionView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_class: Option<ErrorClass>,
}

impl CommandResponse {
    /// Current score and options of `engine`
    pub fn from_engine(engine: &MusicEngine, codec: &dyn FormatCodec) -> EngineResult<Self> {
        let musicxml = match engine.score() {
            Some(_) => Some(engine.export(ExportFormat::MusicXml, codec)?),
            None => None,
        };
        Ok(Self {
            success: true,
            musicxml,
            chord_options: engine
                .chord_option_sets()
                .iter()
                .map(ChordOptionView::from)
                .collect(),
            error: None,
            error_class: None,
        })
    }

    pub fn failure(context: &str, err: &EngineError) -> Self {
        match err.class() {
            ErrorClass::Internal => log::error!("{}: {}", context, err),
            ErrorClass::User => log::warn!("{}: {}", context, err),
        }
        Self {
            success: false,
            musicxml: None,
            chord_options: Vec::new(),
            error: Some(format!("{}: {}", context, err)),
            error_class: Some(err.class()),
        }
    }
}

fn thaw_session(
    store: &dyn SessionStore,
    session_id: &str,
    config: &EngineConfig,
) -> EngineResult<MusicEngine> {
    let blob = store.get(session_id).unwrap_or_default();
    let mut engine = thaw_or_default(&blob);
    engine.configure(config)?;
    Ok(engine)
}

fn commit(
    store: &mut dyn SessionStore,
    codec: &dyn FormatCodec,
    session_id: &str,
    engine: &MusicEngine,
) -> EngineResult<CommandResponse> {
    let response = CommandResponse::from_engine(engine, codec)?;
    store.set(session_id, freeze(engine)?);
    Ok(response)
}

/// Thaw the session, run `request`, store the result
pub fn handle_command(
    store: &mut dyn SessionStore,
    codec: &dyn FormatCodec,
    session_id: &str,
    request: &CommandRequest,
) -> CommandResponse {
    handle_command_with_config(store, codec, session_id, request, &EngineConfig::default())
}

pub fn handle_command_with_config(
    store: &mut dyn SessionStore,
    codec: &dyn FormatCodec,
    session_id: &str,
    request: &CommandRequest,
    config: &EngineConfig,
) -> CommandResponse {
    log::info!("{}: {:?}", session_id, request);
    let result = thaw_session(store, session_id, config).and_then(|mut engine| {
        request.apply(&mut engine)?;
        commit(store, codec, session_id, &engine)
    });
    result.unwrap_or_else(|err| CommandResponse::failure("Command failed", &err))
}

/// Replace the session's engine with a freshly loaded score
pub fn handle_upload(
    store: &mut dyn SessionStore,
    codec: &dyn FormatCodec,
    session_id: &str,
    raw: &[u8],
    filename: &str,
) -> CommandResponse {
    log::info!("{}: loading {} ({} bytes)", session_id, filename, raw.len());
    let result = MusicEngine::load_from_source(raw, filename, codec)
        .and_then(|engine| commit(store, codec, session_id, &engine));
    result.unwrap_or_else(|err| CommandResponse::failure("Could not load score", &err))
}
