//! Chord symbol duration realisation
//!
//! Chord symbols arrive as zero-length markers. Each one is active from its position up
//! to the next symbol (or the end of the piece), sliced at barlines so every melody
//! measure knows which harmony governs which part of it.

use crate::models::{Harmony, Part, Rational};

/// One measure's slice of an active chord symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarmonySpan {
    /// Measure-relative start
    pub offset: Rational,
    pub duration: Rational,
    pub harmony: Harmony,
    /// Slice of a symbol that started in an earlier measure
    pub continued: bool,
}

impl HarmonySpan {
    pub fn end(&self) -> Rational {
        self.offset + self.duration
    }

    pub fn contains(&self, offset: Rational) -> bool {
        self.offset <= offset && offset < self.end()
    }
}

/// Active harmony spans for each melody measure.
///
/// Chord-part measures are positioned on the melody's measure grid; harmony in chord
/// measures past the end of the melody is dropped.
pub fn realize(melody: &Part, chords: &Part) -> Vec<Vec<HarmonySpan>> {
    let starts = melody.measure_offsets();
    let lengths = melody.measure_lengths();
    let piece_end = starts
        .last()
        .zip(lengths.last())
        .map(|(start, length)| *start + *length)
        .unwrap_or_else(|| Rational::from_integer(0));

    let mut symbols: Vec<(Rational, Harmony)> = Vec::new();
    for (measure, start) in chords.measures.iter().zip(starts.iter()) {
        for event in measure.all_events() {
            if let Some(harmony) = event.as_harmony() {
                let at = *start + event.offset;
                // of several symbols at one position, the first wins
                if !symbols.iter().any(|(o, _)| *o == at) {
                    symbols.push((at, harmony.clone()));
                }
            }
        }
    }
    symbols.sort_by(|a, b| a.0.cmp(&b.0));

    let mut per_measure: Vec<Vec<HarmonySpan>> = vec![Vec::new(); starts.len()];
    for (i, (start, harmony)) in symbols.iter().enumerate() {
        let end = symbols.get(i + 1).map(|(o, _)| *o).unwrap_or(piece_end);
        for (m, (measure_start, length)) in starts.iter().zip(lengths.iter()).enumerate() {
            let measure_end = *measure_start + *length;
            let from = (*start).max(*measure_start);
            let to = end.min(measure_end);
            if from < to {
                per_measure[m].push(HarmonySpan {
                    offset: from - *measure_start,
                    duration: to - from,
                    harmony: harmony.clone(),
                    continued: from > *start,
                });
            }
        }
    }
    per_measure
}

/// The span governing a measure-relative position
pub fn active_at(spans: &[HarmonySpan], offset: Rational) -> Option<&HarmonySpan> {
    spans.iter().find(|span| span.contains(offset))
}
