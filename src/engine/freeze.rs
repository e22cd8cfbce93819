//! Freeze/thaw of engine state
//!
//! The frozen form is a versioned JSON document holding the score, the arrangement
//! metadata and both history stacks. Configuration (history limit, arranger settings)
//! is not part of it.

use serde::{Deserialize, Serialize};

use super::MusicEngine;
use crate::error::{EngineError, EngineResult};
use crate::models::{ArrangementInfo, Score};
use crate::undo::CommandHistory;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct FrozenRef<'a> {
    version: u32,
    score: &'a Option<Score>,
    arrangement: &'a Option<ArrangementInfo>,
    history: &'a CommandHistory,
}

#[derive(Deserialize)]
struct Frozen {
    version: u32,
    #[serde(default)]
    score: Option<Score>,
    #[serde(default)]
    arrangement: Option<ArrangementInfo>,
    #[serde(default)]
    history: CommandHistory,
}

/// Serialise the engine's state
pub fn freeze(engine: &MusicEngine) -> EngineResult<Vec<u8>> {
    let frozen = FrozenRef {
        version: FORMAT_VERSION,
        score: &engine.score,
        arrangement: &engine.arrangement,
        history: &engine.history,
    };
    serde_json::to_vec(&frozen).map_err(|e| {
        log::error!("Failed to freeze engine: {}", e);
        EngineError::CorruptState(e.to_string())
    })
}

/// Rebuild an engine from `freeze` output; empty input gives a fresh engine
pub fn thaw(bytes: &[u8]) -> EngineResult<MusicEngine> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(MusicEngine::new());
    }
    let frozen: Frozen =
        serde_json::from_slice(bytes).map_err(|e| EngineError::CorruptState(e.to_string()))?;
    if frozen.version != FORMAT_VERSION {
        return Err(EngineError::CorruptState(format!(
            "unsupported state version {} (expected {})",
            frozen.version, FORMAT_VERSION
        )));
    }
    Ok(MusicEngine {
        score: frozen.score,
        arrangement: frozen.arrangement,
        history: frozen.history,
        ..MusicEngine::default()
    })
}

/// Like `thaw`, but a corrupt blob yields a fresh engine
pub fn thaw_or_default(bytes: &[u8]) -> MusicEngine {
    thaw(bytes).unwrap_or_else(|e| {
        log::warn!("Discarding unreadable engine state: {}", e);
        MusicEngine::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ArrangementType, ChordSymbol, Event, Harmony, Measure, Part, Pitch, Rational,
    };

    fn engine() -> MusicEngine {
        let mut part = Part::new("P1", "Melody");
        let mut m = Measure::new(1);
        m.events.push(Event::harmony(
            Rational::from_integer(0),
            Harmony::Chord(ChordSymbol::from_figure("C").unwrap()),
        ));
        m.events.push(Event::note(
            Rational::from_integer(0),
            Rational::new(3, 2),
            Pitch::parse("C4").unwrap(),
        ));
        m.events.push(Event::note(
            Rational::new(3, 2),
            Rational::new(1, 2),
            Pitch::parse("D4").unwrap(),
        ));
        part.measures.push(m);
        let mut score = Score::new(Some("Frozen".to_string()));
        score.parts.push(part);
        MusicEngine::with_score(score)
    }

    #[test]
    fn test_round_trip_fresh_and_loaded() {
        let empty = MusicEngine::new();
        assert_eq!(thaw(&freeze(&empty).unwrap()).unwrap(), empty);
        let loaded = engine();
        assert_eq!(thaw(&freeze(&loaded).unwrap()).unwrap(), loaded);
    }

    #[test]
    fn test_round_trip_with_history_and_arrangement() {
        let mut e = engine();
        e.arrange(ArrangementType::UpperVoices).unwrap();
        e.choose_chord_option("m1.1:1").unwrap();
        e.transpose(3).unwrap();
        e.undo().unwrap();
        let back = thaw(&freeze(&e).unwrap()).unwrap();
        assert_eq!(back, e);
        assert!(back.history().can_undo() && back.history().can_redo());
    }

    #[test]
    fn test_empty_bytes_give_fresh_engine() {
        assert_eq!(thaw(&[]).unwrap(), MusicEngine::new());
    }

    #[test]
    fn test_corrupt_and_unknown_version() {
        assert!(matches!(thaw(b"{not json"), Err(EngineError::CorruptState(_))));
        assert!(matches!(
            thaw(br#"{"version":99}"#),
            Err(EngineError::CorruptState(_))
        ));
        assert_eq!(thaw_or_default(b"\x00\x01garbage"), MusicEngine::new());
    }

    #[test]
    fn test_out_of_range_key_is_corrupt() {
        let mut e = engine();
        if let Some(score) = e.score.as_mut() {
            score.parts[0].measures[0].key_signature = Some(crate::models::KeySignature::c_major());
        }
        let text = String::from_utf8(freeze(&e).unwrap()).unwrap();
        assert!(text.contains(r#""key_signature":0"#));

        let tampered = text.replace(r#""key_signature":0"#, r#""key_signature":20"#);
        assert!(matches!(
            thaw(tampered.as_bytes()),
            Err(EngineError::CorruptState(_))
        ));
        assert_eq!(thaw_or_default(tampered.as_bytes()), MusicEngine::new());
    }
}
