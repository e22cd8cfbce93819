//! Key-aware chromatic transposition
//!
//! The score is split into key regions (one per key signature change). Each region gets
//! its own spelled interval from `key_choice`, and every pitched element inside the region
//! moves by that interval.

pub mod key_choice;

pub use key_choice::best_interval_for_key;

use crate::arranger::scan_part_ranges;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    ArrangementInfo, EventKind, Interval, KeySignature, Pitch, Rational, Score,
};

/// Octaves MusicXML can notate
const NOTATED_OCTAVES: std::ops::RangeInclusive<i8> = 0..=9;

/// Largest shift that can keep any pitch inside `NOTATED_OCTAVES`
const MAX_SEMITONES: i32 = 120;

/// Span of the score governed by one key signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRegion {
    pub start: Rational,
    pub key: KeySignature,
}

/// Key regions in score order.
///
/// The first region always starts at offset 0; it uses the key signature found there, or
/// C major when the score opens without one.
pub fn key_regions(score: &Score) -> Vec<KeyRegion> {
    let zero = Rational::from_integer(0);
    let keys = score.key_signatures();
    let mut regions = Vec::with_capacity(keys.len() + 1);

    match keys.first() {
        Some((offset, key)) if *offset == zero => regions.push(KeyRegion {
            start: zero,
            key: *key,
        }),
        _ => regions.push(KeyRegion {
            start: zero,
            key: KeySignature::c_major(),
        }),
    }
    for (offset, key) in keys {
        if offset > zero {
            regions.push(KeyRegion { start: offset, key });
        }
    }
    regions
}

/// Per-region intervals for one transposition request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranspositionPlan {
    regions: Vec<(KeyRegion, Interval)>,
    semitones: i32,
}

impl TranspositionPlan {
    pub fn new(score: &Score, semitones: i32) -> EngineResult<Self> {
        if semitones.unsigned_abs() > MAX_SEMITONES as u32 {
            return Err(EngineError::TranspositionOutOfRange { semitones });
        }
        let regions = key_regions(score)
            .into_iter()
            .map(|region| Ok((region, best_interval_for_key(&region.key, semitones)?)))
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(Self { regions, semitones })
    }

    /// Interval governing a score offset
    pub fn interval_at(&self, offset: Rational) -> Interval {
        self.regions
            .iter()
            .rev()
            .find(|(region, _)| region.start <= offset)
            .or_else(|| self.regions.first())
            .map(|(_, interval)| *interval)
            .unwrap_or_else(Interval::unison)
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Chromatic size applied by this plan
    pub fn applied_semitones(&self) -> i32 {
        self.regions
            .first()
            .map(|(_, interval)| interval.semitones)
            .unwrap_or(self.semitones)
    }

    fn move_pitch(&self, interval: &Interval, pitch: &Pitch) -> EngineResult<Pitch> {
        interval
            .checked_transpose_pitch(pitch)
            .filter(|moved| NOTATED_OCTAVES.contains(&moved.octave))
            .ok_or_else(|| {
                log::warn!("{} leaves the notated range when moved by {:?}", pitch, interval);
                EngineError::TranspositionOutOfRange {
                    semitones: self.semitones,
                }
            })
    }

    /// Transposed copy of `score`
    pub fn apply(&self, score: &Score) -> EngineResult<Score> {
        let mut transposed = score.clone();
        for part in &mut transposed.parts {
            let offsets = part.measure_offsets();
            for (measure, measure_offset) in part.measures.iter_mut().zip(offsets) {
                let measure_interval = self.interval_at(measure_offset);

                if let Some(key) = measure.key_signature {
                    let moved = key.transposed(&measure_interval).ok_or_else(|| {
                        log::error!(
                            "Key {} has no signature after moving by {:?}",
                            key,
                            measure_interval
                        );
                        EngineError::UnreachableKey {
                            from: key.tonic().to_string(),
                            semitones: self.semitones,
                        }
                    })?;
                    measure.key_signature = Some(moved);
                }

                for event in measure.all_events_mut() {
                    let interval = self.interval_at(measure_offset + event.offset);
                    match &mut event.kind {
                        EventKind::Note(note) => {
                            note.pitch = self.move_pitch(&interval, &note.pitch)?
                        }
                        EventKind::Chord(notes) => {
                            for note in notes.iter_mut() {
                                note.pitch = self.move_pitch(&interval, &note.pitch)?;
                            }
                        }
                        EventKind::Harmony(harmony) => *harmony = harmony.transposed(&interval),
                        EventKind::Rest(_) => {}
                    }
                }
            }
        }
        Ok(transposed)
    }

    /// Move chord option sets along with the arranged score they annotate.
    ///
    /// `score` is the arranged score *before* transposition; part ranges are rescanned
    /// from `transposed`.
    pub fn apply_to_arrangement(
        &self,
        info: &mut ArrangementInfo,
        score: &Score,
        transposed: &Score,
    ) {
        let offsets = score
            .parts
            .first()
            .map(|part| part.measure_offsets())
            .unwrap_or_default();
        for set in &mut info.chord_options {
            let measure_offset = offsets
                .get(set.measure_index)
                .copied()
                .unwrap_or_else(|| Rational::from_integer(0));
            let interval = self.interval_at(measure_offset + set.offset);
            set.melody = interval.transpose_pitch(&set.melody);
            set.original = set.original.transposed(&interval);
            for option in &mut set.options {
                *option = option.transposed(&interval);
            }
        }
        info.part_ranges = scan_part_ranges(&transposed.parts);
    }
}

/// Transpose the score in place by `semitones`, choosing a sane key in every region.
///
/// Returns the chromatic size actually applied. On error the score is left untouched.
pub fn transpose_in_place(score: &mut Score, semitones: i32) -> EngineResult<i32> {
    let plan = TranspositionPlan::new(score, semitones)?;
    log::info!(
        "Transposing by {} semitones across {} key region(s)",
        semitones,
        plan.region_count()
    );
    *score = plan.apply(score)?;
    Ok(plan.applied_semitones())
}
