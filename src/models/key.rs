/// Key signatures and the canonical major-key table
///
/// A key signature is stored as a count of sharps (negative = flats). Each count maps to
/// exactly one major tonic spelling:
///
///   -7 Cb  -6 Gb  -5 Db  -4 Ab  -3 Eb  -2 Bb  -1 F
///    0 C
///    1 G    2 D    3 A    4 E    5 B    6 F#   7 C#

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EngineError, EngineResult};
use crate::models::pitch::{Interval, PitchName, Step};

/// (sharps, tonic step, tonic alteration)
const CANONICAL_TONICS: [(i8, Step, i8); 15] = [
    (-7, Step::C, -1),
    (-6, Step::G, -1),
    (-5, Step::D, -1),
    (-4, Step::A, -1),
    (-3, Step::E, -1),
    (-2, Step::B, -1),
    (-1, Step::F, 0),
    (0, Step::C, 0),
    (1, Step::G, 0),
    (2, Step::D, 0),
    (3, Step::A, 0),
    (4, Step::E, 0),
    (5, Step::B, 0),
    (6, Step::F, 1),
    (7, Step::C, 1),
];

/// Serialized as the bare sharps count; deserializing goes through `KeySignature::new`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub struct KeySignature {
    sharps: i8,
}

impl KeySignature {
    pub fn new(sharps: i8) -> EngineResult<Self> {
        if !(-7..=7).contains(&sharps) {
            return Err(EngineError::InvalidKeySignature(sharps));
        }
        Ok(Self { sharps })
    }

    pub fn c_major() -> Self {
        Self { sharps: 0 }
    }

    pub fn sharps(&self) -> i8 {
        self.sharps
    }

    /// Major tonic of this signature
    pub fn tonic(&self) -> PitchName {
        let (_, step, alter) = CANONICAL_TONICS[(self.sharps + 7) as usize];
        PitchName::new(step, alter)
    }

    /// Signature whose canonical tonic is spelled exactly `tonic`
    pub fn from_tonic(tonic: &PitchName) -> Option<Self> {
        CANONICAL_TONICS
            .iter()
            .find(|(_, step, alter)| *step == tonic.step && *alter == tonic.alter)
            .map(|(sharps, _, _)| Self { sharps: *sharps })
    }

    /// Move the signature by a spelled interval.
    ///
    /// Fails when the transposed tonic has no signature (e.g. D# major).
    pub fn transposed(&self, interval: &Interval) -> Option<Self> {
        Self::from_tonic(&interval.transpose_name(&self.tonic()))
    }
}

impl TryFrom<i8> for KeySignature {
    type Error = EngineError;

    fn try_from(sharps: i8) -> EngineResult<Self> {
        Self::new(sharps)
    }
}

impl From<KeySignature> for i8 {
    fn from(key: KeySignature) -> i8 {
        key.sharps
    }
}

impl Default for KeySignature {
    fn default() -> Self {
        Self::c_major()
    }
}

impl fmt::Display for KeySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} major", self.tonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_out_of_range() {
        assert_eq!(KeySignature::new(8), Err(EngineError::InvalidKeySignature(8)));
        assert_eq!(KeySignature::new(-8), Err(EngineError::InvalidKeySignature(-8)));
        assert!(KeySignature::new(7).is_ok());
    }

    #[test]
    fn test_tonic_table() {
        let names: Vec<String> = (-7..=7)
            .map(|s| KeySignature::new(s).unwrap().tonic().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["Cb", "Gb", "Db", "Ab", "Eb", "Bb", "F", "C", "G", "D", "A", "E", "B", "F#", "C#"]
        );
    }

    #[test]
    fn test_from_tonic_is_spelling_exact() {
        let d_flat = PitchName::parse("Db").unwrap();
        assert_eq!(KeySignature::from_tonic(&d_flat).unwrap().sharps(), -5);
        let c_sharp = PitchName::parse("C#").unwrap();
        assert_eq!(KeySignature::from_tonic(&c_sharp).unwrap().sharps(), 7);
        assert!(KeySignature::from_tonic(&PitchName::parse("D#").unwrap()).is_none());
    }

    #[test]
    fn test_serde_checks_range() {
        let key = KeySignature::new(-3).unwrap();
        assert_eq!(serde_json::to_string(&key).unwrap(), "-3");
        assert_eq!(serde_json::from_str::<KeySignature>("-3").unwrap(), key);
        assert!(serde_json::from_str::<KeySignature>("9").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(KeySignature::new(-3).unwrap().to_string(), "Eb major");
    }
}
