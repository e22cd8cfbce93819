/// Destination key selection for chromatic transposition
///
/// Moving a key by N semitones lands on a pitch class; this picks the spelling of that
/// pitch class that is a real major key with a sane signature:
///
///   0 C   1 Db  2 D   3 Eb  4 E   5 F   6 F#  7 G   8 Ab  9 A   10 Bb  11 B
///
/// (five flats beat seven sharps, five sharps beat seven flats). The spelled interval
/// between the old and new tonics is then used for every pitch in the key region.

use crate::error::{EngineError, EngineResult};
use crate::models::{Interval, KeySignature, PitchName, Spelling};

/// Tonics never chosen as a destination when an enharmonic twin exists
fn is_avoided(key: &KeySignature) -> bool {
    key.sharps().abs() == 7
}

fn destination_tonic(candidate: PitchName) -> Option<PitchName> {
    if let Some(key) = KeySignature::from_tonic(&candidate) {
        if !is_avoided(&key) {
            return Some(candidate);
        }
    }
    candidate
        .enharmonics()
        .into_iter()
        .find(|name| KeySignature::from_tonic(name).is_some())
}

/// Spelled interval that moves `key` by `semitones`.
///
/// Whole octaves are split off first (truncating toward zero) and added back at the end,
/// so the interval's chromatic size always equals `semitones`.
pub fn best_interval_for_key(key: &KeySignature, semitones: i32) -> EngineResult<Interval> {
    let octaves = semitones / 12;
    let remainder = semitones % 12;

    if remainder == 0 {
        return Ok(Interval::new(octaves * 12, octaves * 7));
    }

    let tonic = key.tonic();
    let candidate = PitchName::from_pitch_class(tonic.pitch_class() + remainder, Spelling::Default);
    let dest_name = destination_tonic(candidate).ok_or_else(|| {
        log::error!(
            "No canonical key reachable from {} by {} semitones (candidate {})",
            tonic,
            semitones,
            candidate
        );
        EngineError::UnreachableKey {
            from: tonic.to_string(),
            semitones,
        }
    })?;

    let source = tonic.at_octave(4);
    let mut dest = dest_name.at_octave(4);
    if remainder > 0 && dest.is_below(&source) {
        dest = dest.shifted_octaves(1);
    } else if remainder < 0 && dest.is_above(&source) {
        dest = dest.shifted_octaves(-1);
    }

    let interval = Interval::between(&source, &dest);
    Ok(Interval::new(
        interval.semitones + octaves * 12,
        interval.steps + octaves * 7,
    ))
}
