use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::arranger::{apply_choice, parse_option_id};
use crate::error::{EngineError, EngineResult};
use crate::models::{ArrangementInfo, Score};
use crate::transposition::TranspositionPlan;

/// A reversible engine action.
///
/// History entries are always the action that *reverses* something already done; applying
/// one yields the entry that reverses it in turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    Transpose {
        semitones: i32,
    },
    ChooseChordOption {
        #[serde(rename = "optionId")]
        option_id: String,
    },
    HideChordOptions,
    ShowChordOptions,
}

impl Command {
    /// Apply this command and return its inverse.
    ///
    /// Either everything changes or nothing does.
    pub fn execute(
        &self,
        score: &mut Score,
        arrangement: &mut Option<ArrangementInfo>,
    ) -> EngineResult<Command> {
        match self {
            Command::Transpose { semitones } => {
                let plan = TranspositionPlan::new(score, *semitones)?;
                let transposed = plan.apply(score)?;
                if let Some(info) = arrangement.as_mut() {
                    plan.apply_to_arrangement(info, score, &transposed);
                }
                log::info!(
                    "Transposed by {} semitones across {} key region(s)",
                    plan.applied_semitones(),
                    plan.region_count()
                );
                *score = transposed;
                Ok(Command::Transpose {
                    semitones: -plan.applied_semitones(),
                })
            }
            Command::ChooseChordOption { option_id } => {
                let info = arrangement.as_mut().ok_or(EngineError::NotArranged)?;
                let (set_id, choice) = parse_option_id(option_id)?;
                let index = info
                    .chord_options
                    .iter()
                    .position(|set| set.id == set_id)
                    .ok_or_else(|| EngineError::UnknownChordOption(option_id.clone()))?;

                let mut next_score = score.clone();
                let mut set = info.chord_options[index].clone();
                let undo_id = apply_choice(&mut next_score, &mut set, &choice)?;
                log::info!("Chose chord option {} ({})", option_id, set.current_chord());

                *score = next_score;
                info.chord_options[index] = set;
                Ok(Command::ChooseChordOption { option_id: undo_id })
            }
            Command::HideChordOptions | Command::ShowChordOptions => {
                let info = arrangement.as_mut().ok_or(EngineError::NotArranged)?;
                let visible = matches!(self, Command::ShowChordOptions);
                info.options_visible = visible;
                Ok(if visible {
                    Command::HideChordOptions
                } else {
                    Command::ShowChordOptions
                })
            }
        }
    }
}

/// Undo/redo stacks of inverse commands
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommandHistory {
    /// Most recent last
    undo: VecDeque<Command>,
    redo: Vec<Command>,
    /// Maximum number of undo entries; configuration, not state
    #[serde(skip, default = "default_limit")]
    max_size: usize,
}

fn default_limit() -> usize {
    100
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(default_limit())
    }
}

impl PartialEq for CommandHistory {
    fn eq(&self, other: &Self) -> bool {
        // Only compare serialized fields
        self.undo == other.undo && self.redo == other.redo
    }
}

impl Eq for CommandHistory {}

impl CommandHistory {
    pub fn new(max_size: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            max_size: max_size.max(1),
        }
    }

    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size.max(1);
        self.enforce_limit();
    }

    fn enforce_limit(&mut self) {
        while self.undo.len() > self.max_size {
            self.undo.pop_front();
        }
    }

    /// Record the inverse of a fresh user action; invalidates redo
    pub fn record(&mut self, inverse: Command) {
        self.redo.clear();
        self.undo.push_back(inverse);
        self.enforce_limit();
    }

    pub fn peek_undo(&self) -> Option<&Command> {
        self.undo.back()
    }

    pub fn peek_redo(&self) -> Option<&Command> {
        self.redo.last()
    }

    /// Move the top undo entry over to redo as `inverse`
    pub fn complete_undo(&mut self, inverse: Command) {
        if self.undo.pop_back().is_some() {
            self.redo.push(inverse);
        }
    }

    /// Move the top redo entry over to undo as `inverse`
    pub fn complete_redo(&mut self, inverse: Command) {
        if self.redo.pop().is_some() {
            self.undo.push_back(inverse);
            self.enforce_limit();
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo.len()
    }

    /// Clear all undo history
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ArrangementType, ChordSymbol, Event, Harmony, KeySignature, Measure, Part, Pitch,
        Rational,
    };

    fn q(n: i32) -> Rational {
        Rational::from_integer(n)
    }

    fn create_test_score() -> Score {
        let mut part = Part::new("P1", "Melody");
        let mut m = Measure::new(1);
        m.key_signature = Some(KeySignature::new(-1).unwrap());
        m.events.push(Event::harmony(
            q(0),
            Harmony::Chord(ChordSymbol::from_figure("F").unwrap()),
        ));
        m.events.push(Event::note(q(0), q(4), Pitch::parse("A4").unwrap()));
        part.measures.push(m);
        let mut score = Score::new(Some("Test".to_string()));
        score.parts.push(part);
        score
    }

    fn info() -> ArrangementInfo {
        ArrangementInfo::new(ArrangementType::LowerVoices, Default::default(), Vec::new())
    }

    #[test]
    fn test_transpose_execute_returns_inverse() {
        let mut score = create_test_score();
        let mut arrangement = None;
        let inverse = Command::Transpose { semitones: 3 }
            .execute(&mut score, &mut arrangement)
            .unwrap();
        assert_eq!(inverse, Command::Transpose { semitones: -3 });
        assert_eq!(
            score.parts[0].measures[0].key_signature,
            KeySignature::new(-4).ok()
        );

        let again = inverse.execute(&mut score, &mut arrangement).unwrap();
        assert_eq!(again, Command::Transpose { semitones: 3 });
        assert_eq!(score, create_test_score());
    }

    #[test]
    fn test_show_hide_need_arrangement() {
        let mut score = create_test_score();
        let mut arrangement = None;
        assert_eq!(
            Command::HideChordOptions.execute(&mut score, &mut arrangement),
            Err(EngineError::NotArranged)
        );

        let mut arrangement = Some(info());
        let inverse = Command::HideChordOptions
            .execute(&mut score, &mut arrangement)
            .unwrap();
        assert_eq!(inverse, Command::ShowChordOptions);
        assert!(!arrangement.as_ref().unwrap().options_visible);
    }

    #[test]
    fn test_unknown_option_changes_nothing() {
        let mut score = create_test_score();
        let mut arrangement = Some(info());
        let before = (score.clone(), arrangement.clone());
        let err = Command::ChooseChordOption {
            option_id: "m1.1:1".to_string(),
        }
        .execute(&mut score, &mut arrangement)
        .unwrap_err();
        assert_eq!(err, EngineError::UnknownChordOption("m1.1:1".to_string()));
        assert_eq!((score, arrangement), before);
    }

    #[test]
    fn test_record_clears_redo() {
        let mut history = CommandHistory::new(100);
        history.record(Command::Transpose { semitones: -1 });
        history.complete_undo(Command::Transpose { semitones: 1 });
        assert!(history.can_redo());
        history.record(Command::ShowChordOptions);
        assert!(!history.can_redo());
        assert_eq!(history.undo_count(), 1);
    }

    #[test]
    fn test_max_size_drops_oldest() {
        let mut history = CommandHistory::new(3);
        for n in 1..=5 {
            history.record(Command::Transpose { semitones: n });
        }
        assert_eq!(history.undo_count(), 3);
        assert_eq!(history.peek_undo(), Some(&Command::Transpose { semitones: 5 }));
        history.complete_undo(Command::Transpose { semitones: -5 });
        history.complete_undo(Command::Transpose { semitones: -4 });
        history.complete_undo(Command::Transpose { semitones: -3 });
        assert!(!history.can_undo());
        assert_eq!(history.redo_count(), 3);
    }

    #[test]
    fn test_command_wire_form() {
        let json = serde_json::to_string(&Command::ChooseChordOption {
            option_id: "m2.1:original".to_string(),
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"command":"chooseChordOption","optionId":"m2.1:original"}"#
        );
        let back: Command = serde_json::from_str(r#"{"command":"transpose","semitones":-2}"#).unwrap();
        assert_eq!(back, Command::Transpose { semitones: -2 });
    }

    #[test]
    fn test_history_equality_ignores_limit() {
        let mut a = CommandHistory::new(10);
        let mut b = CommandHistory::new(50);
        a.record(Command::HideChordOptions);
        b.record(Command::HideChordOptions);
        assert_eq!(a, b);
    }
}
