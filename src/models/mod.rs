//! Core music data model
//!
//! Pitches and intervals, keys, chord symbols, the score hierarchy and the
//! barbershop arrangement metadata that accompanies an arranged score.

pub mod arrangement;
pub mod harmony;
pub mod key;
pub mod pitch;
pub mod score;

pub use arrangement::{
    standard_ranges, ArrangementInfo, ArrangementType, ChordOptionSet, PartRanges, VocalRange,
    VoicePart,
};
pub use harmony::{ChordKind, ChordSymbol, Harmony};
pub use key::KeySignature;
pub use pitch::{Interval, Pitch, PitchName, Spelling, Step};
pub use score::{
    Clef, Event, EventKind, Measure, Note, Part, Rational, Rest, Score, StemDirection, Tie,
    TimeSignature, Voice,
};
