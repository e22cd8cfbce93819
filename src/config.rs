//! Engine configuration
//!
//! Loaded from YAML or JSON; every field has a default so partial files are fine.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::arranger::ArrangerSettings;
use crate::error::{EngineError, EngineResult};
use crate::models::Pitch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of undo entries kept
    pub history_limit: usize,
    /// Lowest lead pitch that still gets a root-position bass an octave below (e.g. "F3")
    pub bass_octave_threshold: String,
    /// One of off, error, warn, info, debug, trace; applied by `MusicEngine::configure`
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_limit: 100,
            bass_octave_threshold: "F3".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml(text: &str) -> EngineResult<Self> {
        let config: EngineConfig =
            serde_yaml::from_str(text).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(text: &str) -> EngineResult<Self> {
        let config: EngineConfig =
            serde_json::from_str(text).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.json`, `.yaml` or `.yml` file
    pub fn from_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&text),
            Some("yaml") | Some("yml") => Self::from_yaml(&text),
            other => Err(EngineError::Config(format!(
                "unknown config file type: {}",
                other.unwrap_or("(none)")
            ))),
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.history_limit == 0 {
            return Err(EngineError::Config(
                "history_limit must be at least 1".to_string(),
            ));
        }
        self.threshold_pitch()?;
        self.level_filter()?;
        Ok(())
    }

    pub fn threshold_pitch(&self) -> EngineResult<Pitch> {
        Pitch::parse(&self.bass_octave_threshold).ok_or_else(|| {
            EngineError::Config(format!(
                "bass_octave_threshold '{}' is not a pitch",
                self.bass_octave_threshold
            ))
        })
    }

    pub fn level_filter(&self) -> EngineResult<log::LevelFilter> {
        self.log_level
            .parse::<log::LevelFilter>()
            .map_err(|_| EngineError::Config(format!("unknown log_level '{}'", self.log_level)))
    }

    pub fn arranger_settings(&self) -> EngineResult<ArrangerSettings> {
        Ok(ArrangerSettings {
            bass_octave_threshold: self.threshold_pitch()?,
        })
    }
}
