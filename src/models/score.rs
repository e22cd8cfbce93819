//! Score hierarchy: Score → Part → Measure → Voice → Event
//!
//! Event offsets are measure-relative; durations and offsets are exact quarter-note
//! rationals. Score-level offsets are computed from measure lengths on demand.

use num_rational::Rational32;
use serde::{Deserialize, Serialize};

use crate::models::harmony::Harmony;
use crate::models::key::KeySignature;
use crate::models::pitch::Pitch;

/// Quarter-note time values
pub type Rational = Rational32;

// ============================================================================
// ATTRIBUTES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Clef {
    Treble,
    /// Treble clef sounding an octave lower (tenor voice)
    Treble8vb,
    Bass,
    /// Bass clef sounding an octave higher
    Bass8va,
    Alto,
    Tenor,
}

impl Clef {
    /// (sign, line, octave-change) as written in MusicXML
    pub fn musicxml_parts(self) -> (&'static str, u8, i8) {
        match self {
            Clef::Treble => ("G", 2, 0),
            Clef::Treble8vb => ("G", 2, -1),
            Clef::Bass => ("F", 4, 0),
            Clef::Bass8va => ("F", 4, 1),
            Clef::Alto => ("C", 3, 0),
            Clef::Tenor => ("C", 4, 0),
        }
    }

    pub fn from_musicxml(sign: &str, line: Option<u8>, octave_change: i8) -> Option<Clef> {
        match (sign, line, octave_change) {
            ("G", _, -1) => Some(Clef::Treble8vb),
            ("G", _, _) => Some(Clef::Treble),
            ("F", _, 1) => Some(Clef::Bass8va),
            ("F", _, _) => Some(Clef::Bass),
            ("C", Some(4), _) => Some(Clef::Tenor),
            ("C", _, _) => Some(Clef::Alto),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSignature {
    pub beats: u8,
    pub beat_type: u8,
}

impl TimeSignature {
    pub fn new(beats: u8, beat_type: u8) -> Self {
        Self { beats, beat_type }
    }

    /// Length of a full bar in quarter notes
    pub fn bar_length(&self) -> Rational {
        if self.beat_type == 0 {
            return Rational::from_integer(0);
        }
        Rational::new(self.beats as i32 * 4, self.beat_type as i32)
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

// ============================================================================
// EVENTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StemDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tie {
    Start,
    Stop,
    Continue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub pitch: Pitch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stem: Option<StemDirection>,
    /// Explicit accidental display request; `None` leaves it to the renderer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_accidental: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tie: Option<Tie>,
}

impl Note {
    pub fn new(pitch: Pitch) -> Self {
        Self {
            pitch,
            stem: None,
            show_accidental: None,
            tie: None,
        }
    }

    pub fn with_stem(mut self, stem: StemDirection) -> Self {
        self.stem = Some(stem);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rest {
    /// Occupies time but is not printed
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Note(Note),
    /// Notated simultaneous notes in one voice
    Chord(Vec<Note>),
    Rest(Rest),
    /// Chord symbol; zero-length in the source, given a span by the arranger
    Harmony(Harmony),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub offset: Rational,
    pub duration: Rational,
    pub kind: EventKind,
}

impl Event {
    pub fn new(offset: Rational, duration: Rational, kind: EventKind) -> Self {
        Self {
            offset,
            duration,
            kind,
        }
    }

    pub fn note(offset: Rational, duration: Rational, pitch: Pitch) -> Self {
        Self::new(offset, duration, EventKind::Note(Note::new(pitch)))
    }

    pub fn rest(offset: Rational, duration: Rational) -> Self {
        Self::new(offset, duration, EventKind::Rest(Rest { hidden: false }))
    }

    pub fn hidden_rest(offset: Rational, duration: Rational) -> Self {
        Self::new(offset, duration, EventKind::Rest(Rest { hidden: true }))
    }

    pub fn harmony(offset: Rational, harmony: Harmony) -> Self {
        Self::new(offset, Rational::from_integer(0), EventKind::Harmony(harmony))
    }

    pub fn end(&self) -> Rational {
        self.offset + self.duration
    }

    pub fn as_harmony(&self) -> Option<&Harmony> {
        match &self.kind {
            EventKind::Harmony(harmony) => Some(harmony),
            _ => None,
        }
    }

    pub fn as_note(&self) -> Option<&Note> {
        match &self.kind {
            EventKind::Note(note) => Some(note),
            _ => None,
        }
    }

    pub fn is_harmony(&self) -> bool {
        matches!(self.kind, EventKind::Harmony(_))
    }

    /// Pitches sounded by this event (empty for rests and chord symbols)
    pub fn pitches(&self) -> Vec<Pitch> {
        match &self.kind {
            EventKind::Note(note) => vec![note.pitch],
            EventKind::Chord(notes) => notes.iter().map(|n| n.pitch).collect(),
            EventKind::Rest(_) | EventKind::Harmony(_) => Vec::new(),
        }
    }
}

// ============================================================================
// CONTAINERS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub id: String,
    /// 1-based staff within a multi-staff part
    #[serde(default = "default_staff")]
    pub staff: u8,
    pub events: Vec<Event>,
}

fn default_staff() -> u8 {
    1
}

impl Voice {
    pub fn new(id: impl Into<String>, staff: u8) -> Self {
        Self {
            id: id.into(),
            staff,
            events: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Measure {
    pub number: u32,
    /// Non-numeric tail of the measure number ("12a" → "a")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_signature: Option<KeySignature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_signature: Option<TimeSignature>,
    /// One clef per staff, top staff first; empty when unchanged
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clefs: Vec<Clef>,
    /// Implicit single voice, used when `voices` is empty
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub voices: Vec<Voice>,
}

impl Measure {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            ..Default::default()
        }
    }

    /// Printed measure number including any suffix
    pub fn label(&self) -> String {
        match &self.suffix {
            Some(suffix) => format!("{}{}", self.number, suffix),
            None => self.number.to_string(),
        }
    }

    /// Number of distinct voices holding events
    pub fn voice_count(&self) -> usize {
        let implicit = usize::from(!self.events.is_empty());
        let explicit = self.voices.iter().filter(|v| !v.events.is_empty()).count();
        (implicit + explicit).max(1)
    }

    /// Events of the measure, implicit voice first
    pub fn all_events(&self) -> impl Iterator<Item = &Event> {
        self.events
            .iter()
            .chain(self.voices.iter().flat_map(|v| v.events.iter()))
    }

    pub fn all_events_mut(&mut self) -> impl Iterator<Item = &mut Event> {
        self.events
            .iter_mut()
            .chain(self.voices.iter_mut().flat_map(|v| v.events.iter_mut()))
    }

    pub fn voice(&self, id: &str) -> Option<&Voice> {
        self.voices.iter().find(|v| v.id == id)
    }

    pub fn voice_mut(&mut self, id: &str) -> Option<&mut Voice> {
        self.voices.iter_mut().find(|v| v.id == id)
    }

    /// Latest event end, else the bar length of the governing time signature
    pub fn length(&self, time: Option<&TimeSignature>) -> Rational {
        let content = self
            .all_events()
            .map(Event::end)
            .max()
            .unwrap_or_else(|| Rational::from_integer(0));
        if content > Rational::from_integer(0) {
            return content;
        }
        self.time_signature
            .as_ref()
            .or(time)
            .map(TimeSignature::bar_length)
            .unwrap_or(content)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub id: String,
    pub name: String,
    #[serde(default = "default_staff")]
    pub staves: u8,
    pub measures: Vec<Measure>,
}

impl Part {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            staves: 1,
            measures: Vec::new(),
        }
    }

    pub fn is_multi_staff(&self) -> bool {
        self.staves > 1
    }

    /// Length of each measure, honoring inherited time signatures
    pub fn measure_lengths(&self) -> Vec<Rational> {
        let mut time: Option<TimeSignature> = None;
        self.measures
            .iter()
            .map(|measure| {
                if let Some(ts) = measure.time_signature {
                    time = Some(ts);
                }
                measure.length(time.as_ref())
            })
            .collect()
    }

    /// Score offset of each measure
    pub fn measure_offsets(&self) -> Vec<Rational> {
        let mut offset = Rational::from_integer(0);
        self.measure_lengths()
            .into_iter()
            .map(|length| {
                let start = offset;
                offset += length;
                start
            })
            .collect()
    }

    pub fn duration(&self) -> Rational {
        self.measure_lengths()
            .into_iter()
            .fold(Rational::from_integer(0), |acc, l| acc + l)
    }

    pub fn has_harmony(&self) -> bool {
        self.measures
            .iter()
            .any(|m| m.all_events().any(Event::is_harmony))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Score {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub parts: Vec<Part>,
}

impl Score {
    pub fn new(title: Option<String>) -> Self {
        Self {
            title,
            parts: Vec::new(),
        }
    }

    /// Key signatures with their score offsets, earliest first.
    ///
    /// When several parts carry a key at the same offset the first part wins.
    pub fn key_signatures(&self) -> Vec<(Rational, KeySignature)> {
        let mut found: Vec<(Rational, KeySignature)> = Vec::new();
        for part in &self.parts {
            let offsets = part.measure_offsets();
            for (measure, offset) in part.measures.iter().zip(offsets) {
                if let Some(key) = measure.key_signature {
                    if !found.iter().any(|(o, _)| *o == offset) {
                        found.push((offset, key));
                    }
                }
            }
        }
        // stable: first-found wins among equal offsets
        found.sort_by(|a, b| a.0.cmp(&b.0));
        found
    }

    pub fn first_key_signature(&self) -> Option<KeySignature> {
        self.key_signatures().first().map(|(_, key)| *key)
    }

    pub fn duration(&self) -> Rational {
        self.parts
            .iter()
            .map(Part::duration)
            .max()
            .unwrap_or_else(|| Rational::from_integer(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(n: i32) -> Rational {
        Rational::from_integer(n)
    }

    fn c4() -> Pitch {
        Pitch::parse("C4").unwrap()
    }

    #[test]
    fn test_measure_length_prefers_content() {
        let mut m = Measure::new(1);
        m.time_signature = Some(TimeSignature::new(4, 4));
        assert_eq!(m.length(None), q(4));
        m.events.push(Event::note(q(0), q(3), c4()));
        assert_eq!(m.length(None), q(3));
    }

    #[test]
    fn test_measure_offsets_inherit_time() {
        let mut part = Part::new("P1", "Melody");
        let mut first = Measure::new(1);
        first.time_signature = Some(TimeSignature::new(3, 4));
        part.measures.push(first);
        part.measures.push(Measure::new(2));
        part.measures.push(Measure::new(3));
        assert_eq!(part.measure_offsets(), vec![q(0), q(3), q(6)]);
        assert_eq!(part.duration(), q(9));
    }

    #[test]
    fn test_voice_count() {
        let mut m = Measure::new(1);
        assert_eq!(m.voice_count(), 1);
        let mut v1 = Voice::new("1", 1);
        v1.events.push(Event::rest(q(0), q(4)));
        let mut v2 = Voice::new("2", 1);
        v2.events.push(Event::rest(q(0), q(4)));
        m.voices = vec![v1, v2];
        assert_eq!(m.voice_count(), 2);
    }

    #[test]
    fn test_key_signatures_ordered_first_wins() {
        let mut score = Score::new(None);
        for (id, sharps) in [("P1", 2), ("P2", -1)] {
            let mut part = Part::new(id, id);
            let mut m1 = Measure::new(1);
            m1.key_signature = Some(KeySignature::new(sharps).unwrap());
            m1.events.push(Event::rest(q(0), q(4)));
            let mut m2 = Measure::new(2);
            m2.events.push(Event::rest(q(0), q(4)));
            if id == "P1" {
                m2.key_signature = Some(KeySignature::new(-3).unwrap());
            }
            part.measures = vec![m1, m2];
            score.parts.push(part);
        }
        let keys = score.key_signatures();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0], (q(0), KeySignature::new(2).unwrap()));
        assert_eq!(keys[1], (q(4), KeySignature::new(-3).unwrap()));
        assert_eq!(score.first_key_signature(), KeySignature::new(2).ok());
    }

    #[test]
    fn test_clef_musicxml_mapping() {
        assert_eq!(Clef::from_musicxml("G", Some(2), -1), Some(Clef::Treble8vb));
        assert_eq!(Clef::Bass.musicxml_parts(), ("F", 4, 0));
        assert_eq!(Clef::from_musicxml("percussion", None, 0), None);
    }
}
