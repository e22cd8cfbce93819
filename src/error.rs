//! Error types for the score engine
//!
//! User-actionable failures (bad input, unmet preconditions) and internal failures
//! (invariant violations) share one enum; `EngineError::class` tells them apart so the
//! request layer can report them differently.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ArrangementType;

/// Top-level engine error type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Operation needs a score and the engine holds none
    #[error("There is no score")]
    NoScore,

    /// Arrangement preconditions not met (part shape, missing harmony)
    #[error("Unuseable lead sheet: {0}")]
    InvalidLeadSheet(String),

    /// A notated chord was found in the melody
    #[error("Melody contains a chord in measure {measure}; only single-note melodies can be arranged")]
    ChordInMelody { measure: String },

    /// No canonical key could be reached (a transposition invariant was broken)
    #[error("Unexpected failure to find a key to transpose {from} by {semitones} semitones into")]
    UnreachableKey { from: String, semitones: i32 },

    /// Transposition would carry notes outside the notated octaves
    #[error("Transposing by {semitones} semitones moves notes outside the notated range")]
    TranspositionOutOfRange { semitones: i32 },

    /// Chord-option resolution attempted before any arrangement
    #[error("The score has not been arranged")]
    NotArranged,

    /// The chord has a shape the pillar-chord voicer does not handle (e.g. a seventh)
    #[error("Unsupported chord shape for pillar voicing: {chord}")]
    UnsupportedChordShape { chord: String },

    /// Only upper and lower voice arrangements can be produced
    #[error("Unsupported arrangement type: {0:?}")]
    UnsupportedArrangementType(ArrangementType),

    /// No chord option matches the given id
    #[error("Unknown chord option: {0}")]
    UnknownChordOption(String),

    /// Key signature outside -7..=7 sharps
    #[error("Invalid key signature: {0} sharps (must be -7 to 7)")]
    InvalidKeySignature(i8),

    /// Frozen engine state could not be decoded
    #[error("Corrupt engine state: {0}")]
    CorruptState(String),

    /// Format codec failure
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A request named no known command or lacked a required field
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// File could not be read
    #[error("I/O error: {0}")]
    Io(String),
}

/// Errors raised at the format codec boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// File type or export format the codec cannot handle
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Input is not well-formed for its format
    #[error("Malformed input: {0}")]
    MalformedInput(String),
}

/// Whether a failure is the caller's to fix or a bug in the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorClass {
    User,
    Internal,
}

impl EngineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            EngineError::UnreachableKey { .. } => ErrorClass::Internal,
            _ => ErrorClass::User,
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io(err.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
