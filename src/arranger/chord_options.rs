//! Alternative chords for non-pillar melody notes
//!
//! When the lead sings a note outside the chord, the arranger offers chords that do contain
//! it. Choosing one only changes the chord symbol shown above the lead; the voicing is not
//! recomputed.

use crate::error::{EngineError, EngineResult};
use crate::models::{
    ChordKind, ChordOptionSet, ChordSymbol, Event, EventKind, Harmony, Interval, PitchName,
    Rational, Score, VoicePart,
};

/// Root movements tried for dominant-seventh alternatives, in preference order
const DOMINANT_ROOT_MOVES: [Interval; 5] = [
    // a fifth above
    Interval { semitones: 7, steps: 4 },
    // a fifth below
    Interval { semitones: -7, steps: -4 },
    // a semitone below
    Interval { semitones: -1, steps: -1 },
    // a semitone above
    Interval { semitones: 1, steps: 1 },
    // a tritone away
    Interval { semitones: 6, steps: 3 },
];

fn simple_spelling(name: PitchName) -> PitchName {
    if name.alter.abs() > 1 {
        name.enharmonics().into_iter().next().unwrap_or(name)
    } else {
        name
    }
}

fn moved(chord: &ChordSymbol, interval: &Interval, kind: ChordKind) -> ChordSymbol {
    ChordSymbol::new(simple_spelling(interval.transpose_name(&chord.root)), kind)
}

/// Chords containing `melody` offered in place of `original`, best first.
///
/// Options repeating the original or an earlier option are dropped.
pub fn non_pillar_options(melody: &PitchName, original: &ChordSymbol) -> Vec<ChordSymbol> {
    let mut candidates: Vec<ChordSymbol> = Vec::new();

    // extend the chord with the minor seventh the lead is singing
    let minor_seventh = Interval::new(10, 6).transpose_name(&original.root);
    if minor_seventh.pitch_class() == melody.pitch_class() {
        let extended = match original.kind {
            ChordKind::Major => Some(ChordKind::DominantSeventh),
            ChordKind::Minor => Some(ChordKind::MinorSeventh),
            ChordKind::Augmented => Some(ChordKind::AugmentedSeventh),
            ChordKind::Diminished => Some(ChordKind::HalfDiminishedSeventh),
            _ => None,
        };
        if let Some(kind) = extended {
            candidates.push(ChordSymbol::new(original.root, kind));
        }
    }

    for interval in DOMINANT_ROOT_MOVES.iter() {
        candidates.push(moved(original, interval, ChordKind::DominantSeventh));
    }
    candidates.push(ChordSymbol::new(original.root, ChordKind::DiminishedSeventh));
    candidates.push(moved(original, &DOMINANT_ROOT_MOVES[0], ChordKind::MinorSeventh));

    let mut options: Vec<ChordSymbol> = Vec::new();
    for candidate in candidates {
        if !candidate.contains_pitch_class(melody.pitch_class()) {
            continue;
        }
        let figure = candidate.figure();
        if figure == original.figure() || options.iter().any(|o| o.figure() == figure) {
            continue;
        }
        options.push(candidate);
    }
    options
}

/// A parsed chord option id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionChoice {
    Original,
    /// 1-based option number
    Numbered(usize),
}

/// Split `m{measure}.{index}:{n}` into its set id and choice
pub fn parse_option_id(option_id: &str) -> EngineResult<(&str, OptionChoice)> {
    let unknown = || EngineError::UnknownChordOption(option_id.to_string());
    let (set_id, choice) = option_id.rsplit_once(':').ok_or_else(unknown)?;
    if !set_id.starts_with('m') {
        return Err(unknown());
    }
    let choice = match choice {
        "original" => OptionChoice::Original,
        n => match n.parse::<usize>() {
            Ok(n) if n >= 1 => OptionChoice::Numbered(n),
            _ => return Err(unknown()),
        },
    };
    Ok((set_id, choice))
}

fn is_harmony_at(event: &Event, offset: Rational) -> bool {
    event.is_harmony() && event.offset == offset
}

/// Insert a chord symbol ahead of any non-harmony event at the same position
fn insert_harmony(events: &mut Vec<Event>, event: Event) {
    let at = events
        .iter()
        .position(|e| e.offset > event.offset || (e.offset == event.offset && !e.is_harmony()))
        .unwrap_or(events.len());
    events.insert(at, event);
}

/// Remove the chord symbol at `offset` showing `chord`
fn remove_harmony_at(events: &mut Vec<Event>, offset: Rational, chord: &ChordSymbol) {
    let index = events.iter().rposition(|e| {
        is_harmony_at(e, offset) && e.as_harmony().and_then(Harmony::chord) == Some(chord)
    });
    if let Some(index) = index {
        events.remove(index);
    }
}

/// Select a choice on `set` and rewrite the lead voice's chord symbols to show it.
///
/// Returns the option id that restores the previous choice.
pub fn apply_choice(
    score: &mut Score,
    set: &mut ChordOptionSet,
    choice: &OptionChoice,
) -> EngineResult<String> {
    let chosen = match choice {
        OptionChoice::Original => None,
        OptionChoice::Numbered(n) => {
            if *n > set.options.len() {
                return Err(EngineError::UnknownChordOption(set.option_id(*n)));
            }
            Some(n - 1)
        }
    };

    let measure_length = score
        .parts
        .first()
        .and_then(|part| part.measure_lengths().get(set.measure_index).copied());
    let lead = score
        .parts
        .first_mut()
        .and_then(|part| part.measures.get_mut(set.measure_index))
        .and_then(|measure| measure.voice_mut(VoicePart::Lead.voice_id()))
        .ok_or_else(|| {
            log::error!("Chord option {} points at a missing lead voice", set.id);
            EngineError::UnknownChordOption(set.id.clone())
        })?;
    let undo_id = set.current_id();
    let events = &mut lead.events;

    // clear whatever the previous choice added
    if set.inserted_at_start {
        let previous = set.current_chord().clone();
        remove_harmony_at(events, set.offset, &previous);
        set.inserted_at_start = false;
    }
    if let Some(replaced) = set.replaced_at_start.take() {
        let previous = set.current_chord().clone();
        if let Some(event) = events.iter_mut().rev().find(|e| {
            is_harmony_at(e, set.offset) && e.as_harmony().and_then(Harmony::chord) == Some(&previous)
        }) {
            event.kind = EventKind::Harmony(replaced);
        }
    }
    if set.inserted_at_end {
        let original = set.original.clone();
        remove_harmony_at(events, set.end(), &original);
        set.inserted_at_end = false;
    }

    let shown = match chosen {
        Some(index) => set.options[index].clone(),
        None => set.original.clone(),
    };

    if set.original_starts_at_note {
        if let Some(event) = events.iter_mut().find(|e| is_harmony_at(e, set.offset)) {
            event.kind = EventKind::Harmony(Harmony::Chord(shown));
        }
    } else if let (Some(_), Some(at)) = (
        chosen,
        events.iter().position(|e| is_harmony_at(e, set.offset)),
    ) {
        // a neighbouring choice already resumed a chord here
        let event = &mut events[at];
        if let EventKind::Harmony(previous) = &event.kind {
            set.replaced_at_start = Some(previous.clone());
        }
        event.kind = EventKind::Harmony(Harmony::Chord(shown));
    } else if chosen.is_some() {
        insert_harmony(
            events,
            Event::new(set.offset, set.duration, EventKind::Harmony(Harmony::Chord(shown))),
        );
        set.inserted_at_start = true;
    }

    // resume the original chord after the note if nothing else takes over there
    let end = set.end();
    let resumes_in_measure = measure_length.map_or(false, |length| end < length);
    if chosen.is_some() && resumes_in_measure && !events.iter().any(|e| is_harmony_at(e, end)) {
        insert_harmony(
            events,
            Event::harmony(end, Harmony::Chord(set.original.clone())),
        );
        set.inserted_at_end = true;
    }

    set.chosen = chosen;
    Ok(undo_id)
}
