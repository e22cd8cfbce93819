//! The score engine: one score, its arrangement metadata and its undo history
//!
//! Every public operation is all-or-nothing. Work happens on copies inside
//! `Command::execute` / the arranger, and the engine only commits on success.

pub mod freeze;

pub use freeze::{freeze, thaw, thaw_or_default, FORMAT_VERSION};

use std::path::Path;

use crate::arranger::{arrange_from_lead_sheet, ArrangerSettings};
use crate::config::EngineConfig;
use crate::converters::{ExportFormat, FormatCodec};
use crate::error::{EngineError, EngineResult};
use crate::models::{ArrangementInfo, ArrangementType, ChordOptionSet, Score};
use crate::undo::{Command, CommandHistory};

#[derive(Debug, Clone, Default)]
pub struct MusicEngine {
    score: Option<Score>,
    arrangement: Option<ArrangementInfo>,
    history: CommandHistory,
    settings: ArrangerSettings,
}

impl PartialEq for MusicEngine {
    fn eq(&self, other: &Self) -> bool {
        // settings are configuration, not state
        self.score == other.score
            && self.arrangement == other.arrangement
            && self.history == other.history
    }
}

impl MusicEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_score(score: Score) -> Self {
        Self {
            score: Some(score),
            ..Self::default()
        }
    }

    /// Apply history limit, arranger tunables and the log level
    pub fn configure(&mut self, config: &EngineConfig) -> EngineResult<()> {
        config.validate()?;
        self.settings = config.arranger_settings()?;
        self.history.set_max_size(config.history_limit);
        log::set_max_level(config.level_filter()?);
        Ok(())
    }

    /// Decode raw file content into a fresh engine
    pub fn load_from_source(
        raw: &[u8],
        filename_hint: &str,
        codec: &dyn FormatCodec,
    ) -> EngineResult<Self> {
        let score = codec.decode(raw, filename_hint)?;
        log::info!(
            "Loaded '{}' ({} part(s))",
            filename_hint,
            score.parts.len()
        );
        Ok(Self::with_score(score))
    }

    pub fn from_file(path: impl AsRef<Path>, codec: &dyn FormatCodec) -> EngineResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path)?;
        let hint = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        Self::load_from_source(&raw, hint, codec)
    }

    pub fn score(&self) -> Option<&Score> {
        self.score.as_ref()
    }

    pub fn arrangement(&self) -> Option<&ArrangementInfo> {
        self.arrangement.as_ref()
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    /// Run a fresh user action and record its inverse
    fn run(&mut self, command: Command) -> EngineResult<Command> {
        let score = self.score.as_mut().ok_or(EngineError::NoScore)?;
        let inverse = command.execute(score, &mut self.arrangement)?;
        self.history.record(inverse.clone());
        Ok(inverse)
    }

    /// Transpose by `semitones`; returns the chromatic size applied
    pub fn transpose(&mut self, semitones: i32) -> EngineResult<i32> {
        match self.run(Command::Transpose { semitones })? {
            Command::Transpose { semitones } => Ok(-semitones),
            _ => Ok(semitones),
        }
    }

    /// Replace the score with a four-part arrangement of it.
    ///
    /// Clears both undo and redo history.
    pub fn arrange(&mut self, target: ArrangementType) -> EngineResult<()> {
        let score = self.score.as_ref().ok_or(EngineError::NoScore)?;
        let arranged = arrange_from_lead_sheet(score, target, &self.settings)?;
        self.score = Some(arranged.score);
        self.arrangement = Some(ArrangementInfo::new(
            target,
            arranged.part_ranges,
            arranged.chord_options,
        ));
        self.history.clear();
        Ok(())
    }

    /// Select a chord option; returns the id that undoes the selection
    pub fn choose_chord_option(&mut self, option_id: &str) -> EngineResult<String> {
        match self.run(Command::ChooseChordOption {
            option_id: option_id.to_string(),
        })? {
            Command::ChooseChordOption { option_id } => Ok(option_id),
            other => {
                log::error!("Chord option choice produced {:?} as its inverse", other);
                Err(EngineError::UnknownChordOption(option_id.to_string()))
            }
        }
    }

    pub fn hide_chord_options(&mut self) -> EngineResult<()> {
        self.run(Command::HideChordOptions).map(|_| ())
    }

    pub fn show_chord_options(&mut self) -> EngineResult<()> {
        self.run(Command::ShowChordOptions).map(|_| ())
    }

    /// Undo the last action; `Ok(false)` when there is nothing to undo
    pub fn undo(&mut self) -> EngineResult<bool> {
        let command = match self.history.peek_undo() {
            Some(command) => command.clone(),
            None => return Ok(false),
        };
        let score = self.score.as_mut().ok_or(EngineError::NoScore)?;
        let inverse = command.execute(score, &mut self.arrangement)?;
        log::debug!("Undid {:?}", command);
        self.history.complete_undo(inverse);
        Ok(true)
    }

    /// Redo the last undone action; `Ok(false)` when there is nothing to redo
    pub fn redo(&mut self) -> EngineResult<bool> {
        let command = match self.history.peek_redo() {
            Some(command) => command.clone(),
            None => return Ok(false),
        };
        let score = self.score.as_mut().ok_or(EngineError::NoScore)?;
        let inverse = command.execute(score, &mut self.arrangement)?;
        log::debug!("Redid {:?}", command);
        self.history.complete_redo(inverse);
        Ok(true)
    }

    /// Encode the current score; empty without one
    pub fn export(&self, format: ExportFormat, codec: &dyn FormatCodec) -> EngineResult<String> {
        match &self.score {
            Some(score) => Ok(codec.encode(score, format)?),
            None => Ok(String::new()),
        }
    }

    /// Option sets to offer the user; empty when hidden or not arranged
    pub fn chord_option_sets(&self) -> &[ChordOptionSet] {
        match &self.arrangement {
            Some(info) if info.options_visible => &info.chord_options,
            _ => &[],
        }
    }
}
