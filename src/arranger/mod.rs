//! Barbershop arranging ("shopping") from a lead sheet
//!
//! The melody becomes the lead; tenor, bari and bass are synthesised note by note from the
//! chord symbols using pillar-chord rules. The output is a new two-staff score:
//! "Tenor/Lead" above "Bari/Bass".

pub mod chord_durations;
pub mod chord_options;
pub mod lead_sheet;
pub mod pillar;
pub mod range;
pub mod ties;

pub use chord_options::{apply_choice, non_pillar_options, parse_option_id, OptionChoice};
pub use pillar::{compute_pillar_chord, FourNotes, PillarRole};
pub use range::{scan_part_ranges, warn_out_of_range};
pub use ties::carry_lead_ties;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    ArrangementType, ChordOptionSet, Clef, Event, EventKind, Harmony, Measure, Part,
    PartRanges, Pitch, Rational, Score, Step, Voice, VoicePart,
};
use chord_durations::{active_at, HarmonySpan};

/// Tunables for the voicer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrangerSettings {
    /// Lowest lead pitch that still gets a root-position bass an octave below it
    pub bass_octave_threshold: Pitch,
}

impl Default for ArrangerSettings {
    fn default() -> Self {
        Self {
            bass_octave_threshold: Pitch::new(Step::F, 0, 3),
        }
    }
}

/// Output of a successful arrangement
#[derive(Debug, Clone, PartialEq)]
pub struct Arrangement {
    pub score: Score,
    pub part_ranges: PartRanges,
    pub chord_options: Vec<ChordOptionSet>,
}

fn staff_clefs(target: ArrangementType) -> (Clef, Clef) {
    match target {
        ArrangementType::UpperVoices => (Clef::Treble, Clef::Treble8vb),
        _ => (Clef::Treble8vb, Clef::Bass),
    }
}

fn empty_measure(melody: &Measure, clef: Option<Clef>, voices: [VoicePart; 2]) -> Measure {
    let mut measure = Measure::new(melody.number);
    measure.suffix = melody.suffix.clone();
    measure.key_signature = melody.key_signature;
    measure.time_signature = melody.time_signature;
    measure.clefs = clef.into_iter().collect();
    measure.voices = voices
        .iter()
        .map(|part| Voice::new(part.voice_id(), 1))
        .collect();
    measure
}

/// Tenor/Lead and Bari/Bass measures being filled in parallel
struct MeasurePair {
    top: Measure,
    bottom: Measure,
}

impl MeasurePair {
    fn voice(&mut self, part: VoicePart) -> Option<&mut Voice> {
        let measure = match part.staff() {
            1 => &mut self.top,
            _ => &mut self.bottom,
        };
        measure.voice_mut(part.voice_id())
    }

    fn push(&mut self, part: VoicePart, event: Event) {
        if let Some(voice) = self.voice(part) {
            voice.events.push(event);
        }
    }

    fn push_all(&mut self, offset: Rational, duration: Rational, four: &FourNotes) {
        for part in VoicePart::ALL {
            self.push(part, Event::new(offset, duration, four.get(part).clone()));
        }
    }
}

/// Arrange a lead sheet for four voices.
///
/// The input is never modified; on any error nothing is produced.
pub fn arrange_from_lead_sheet(
    score: &Score,
    target: ArrangementType,
    settings: &ArrangerSettings,
) -> EngineResult<Arrangement> {
    if target == ArrangementType::MixedVoices {
        return Err(EngineError::UnsupportedArrangementType(target));
    }
    let sheet = lead_sheet::recognize(score)?;
    let spans = chord_durations::realize(sheet.melody, sheet.chords);
    let lengths = sheet.melody.measure_lengths();
    let (top_clef, bottom_clef) = staff_clefs(target);

    let mut top = Part::new("P1", "Tenor/Lead");
    let mut bottom = Part::new("P2", "Bari/Bass");
    let mut chord_options: Vec<ChordOptionSet> = Vec::new();
    let no_spans: Vec<HarmonySpan> = Vec::new();

    for (index, melody_measure) in sheet.melody.measures.iter().enumerate() {
        let first = index == 0;
        let mut pair = MeasurePair {
            top: empty_measure(
                melody_measure,
                first.then_some(top_clef),
                [VoicePart::Tenor, VoicePart::Lead],
            ),
            bottom: empty_measure(
                melody_measure,
                first.then_some(bottom_clef),
                [VoicePart::Bari, VoicePart::Bass],
            ),
        };
        let measure_spans = spans.get(index).unwrap_or(&no_spans);

        // chord symbols display above the lead, once per symbol
        for span in measure_spans.iter().filter(|span| !span.continued) {
            pair.push(
                VoicePart::Lead,
                Event::new(
                    span.offset,
                    span.duration,
                    EventKind::Harmony(span.harmony.clone()),
                ),
            );
        }

        let mut sounded = false;
        for event in melody_measure.all_events() {
            match &event.kind {
                EventKind::Harmony(_) => continue,
                EventKind::Rest(_) => {
                    for part in VoicePart::ALL {
                        pair.push(part, event.clone());
                    }
                }
                EventKind::Chord(_) => {
                    return Err(EngineError::ChordInMelody {
                        measure: melody_measure.label(),
                    })
                }
                EventKind::Note(note) => {
                    let span = active_at(measure_spans, event.offset);
                    let harmony = span.map(|s| &s.harmony);
                    let four = pillar::compute_pillar_chord(
                        note,
                        harmony,
                        &settings.bass_octave_threshold,
                    )?;
                    pair.push_all(event.offset, event.duration, &four);

                    if let (PillarRole::OffChord, Some(span), Some(Harmony::Chord(chord))) =
                        (four.role, span, harmony)
                    {
                        let options = non_pillar_options(&note.pitch.name(), chord);
                        if !options.is_empty() {
                            let in_measure = chord_options
                                .iter()
                                .filter(|set| set.measure_index == index)
                                .count();
                            chord_options.push(ChordOptionSet {
                                id: format!("m{}.{}", melody_measure.label(), in_measure + 1),
                                measure_index: index,
                                offset: event.offset,
                                duration: event.duration,
                                melody: note.pitch,
                                original: chord.clone(),
                                options,
                                chosen: None,
                                original_starts_at_note: !span.continued
                                    && span.offset == event.offset,
                                inserted_at_start: false,
                                inserted_at_end: false,
                                replaced_at_start: None,
                            });
                        }
                    }
                }
            }
            sounded = true;
        }

        if !sounded {
            // keep the bar's length in every voice
            let length = lengths
                .get(index)
                .copied()
                .unwrap_or_else(|| Rational::from_integer(0));
            if length > Rational::from_integer(0) {
                for part in VoicePart::ALL {
                    pair.push(part, Event::rest(Rational::from_integer(0), length));
                }
            }
        }

        if let Some(lead) = pair.voice(VoicePart::Lead) {
            lead.events.sort_by(|a, b| {
                a.offset
                    .cmp(&b.offset)
                    .then(b.is_harmony().cmp(&a.is_harmony()))
            });
        }
        top.measures.push(pair.top);
        bottom.measures.push(pair.bottom);
    }

    let mut arranged = Score::new(Some(
        format!(
            "{}{}",
            score.title.as_deref().unwrap_or_default(),
            target.title_suffix()
        )
        .trim()
        .to_string(),
    ));
    arranged.parts = vec![top, bottom];
    carry_lead_ties(&mut arranged.parts);

    let part_ranges = scan_part_ranges(&arranged.parts);
    warn_out_of_range(&part_ranges, target);

    log::info!(
        "Arranged {} measures for {} ({} chord option set(s))",
        sheet.melody.measures.len(),
        target,
        chord_options.len()
    );

    Ok(Arrangement {
        score: arranged,
        part_ranges,
        chord_options,
    })
}
