//! Chord symbols
//!
//! A `ChordSymbol` is a spelled root plus a chord kind (and optional slash bass). Chord tones
//! are derived by spelled intervals so that e.g. the third of Ab is C, not B#.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::pitch::{Interval, PitchName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChordKind {
    Major,
    Minor,
    Augmented,
    Diminished,
    SuspendedSecond,
    SuspendedFourth,
    Power,
    DominantSeventh,
    MajorSeventh,
    MinorSeventh,
    DiminishedSeventh,
    HalfDiminishedSeventh,
    MinorMajorSeventh,
    AugmentedSeventh,
}

impl ChordKind {
    /// Interval from root to third, `None` for chords without one
    pub fn third(self) -> Option<Interval> {
        match self {
            ChordKind::Major
            | ChordKind::Augmented
            | ChordKind::DominantSeventh
            | ChordKind::MajorSeventh
            | ChordKind::AugmentedSeventh => Some(Interval::new(4, 2)),
            ChordKind::Minor
            | ChordKind::Diminished
            | ChordKind::MinorSeventh
            | ChordKind::DiminishedSeventh
            | ChordKind::HalfDiminishedSeventh
            | ChordKind::MinorMajorSeventh => Some(Interval::new(3, 2)),
            ChordKind::SuspendedSecond | ChordKind::SuspendedFourth | ChordKind::Power => None,
        }
    }

    pub fn fifth(self) -> Option<Interval> {
        match self {
            ChordKind::Augmented | ChordKind::AugmentedSeventh => Some(Interval::new(8, 4)),
            ChordKind::Diminished
            | ChordKind::DiminishedSeventh
            | ChordKind::HalfDiminishedSeventh => Some(Interval::new(6, 4)),
            _ => Some(Interval::new(7, 4)),
        }
    }

    pub fn seventh(self) -> Option<Interval> {
        match self {
            ChordKind::DominantSeventh
            | ChordKind::MinorSeventh
            | ChordKind::HalfDiminishedSeventh
            | ChordKind::AugmentedSeventh => Some(Interval::new(10, 6)),
            ChordKind::MajorSeventh | ChordKind::MinorMajorSeventh => Some(Interval::new(11, 6)),
            ChordKind::DiminishedSeventh => Some(Interval::new(9, 6)),
            _ => None,
        }
    }

    /// Sus chords still sound their second/fourth
    fn suspension(self) -> Option<Interval> {
        match self {
            ChordKind::SuspendedSecond => Some(Interval::new(2, 1)),
            ChordKind::SuspendedFourth => Some(Interval::new(5, 3)),
            _ => None,
        }
    }

    /// The triad a seventh chord is built on (the chord itself for triads)
    pub fn triad(self) -> ChordKind {
        match self {
            ChordKind::DominantSeventh | ChordKind::MajorSeventh => ChordKind::Major,
            ChordKind::MinorSeventh | ChordKind::MinorMajorSeventh => ChordKind::Minor,
            ChordKind::DiminishedSeventh | ChordKind::HalfDiminishedSeventh => {
                ChordKind::Diminished
            }
            ChordKind::AugmentedSeventh => ChordKind::Augmented,
            other => other,
        }
    }

    /// Suffix used in chord figures ("m7", "dim", ...)
    pub fn suffix(self) -> &'static str {
        match self {
            ChordKind::Major => "",
            ChordKind::Minor => "m",
            ChordKind::Augmented => "+",
            ChordKind::Diminished => "dim",
            ChordKind::SuspendedSecond => "sus2",
            ChordKind::SuspendedFourth => "sus4",
            ChordKind::Power => "5",
            ChordKind::DominantSeventh => "7",
            ChordKind::MajorSeventh => "maj7",
            ChordKind::MinorSeventh => "m7",
            ChordKind::DiminishedSeventh => "dim7",
            ChordKind::HalfDiminishedSeventh => "m7b5",
            ChordKind::MinorMajorSeventh => "mM7",
            ChordKind::AugmentedSeventh => "+7",
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<ChordKind> {
        let kind = match suffix {
            "" | "maj" | "M" => ChordKind::Major,
            "m" | "min" => ChordKind::Minor,
            "+" | "aug" => ChordKind::Augmented,
            "dim" | "o" | "°" => ChordKind::Diminished,
            "sus2" => ChordKind::SuspendedSecond,
            "sus" | "sus4" => ChordKind::SuspendedFourth,
            "5" => ChordKind::Power,
            "7" | "dom7" => ChordKind::DominantSeventh,
            "maj7" | "M7" => ChordKind::MajorSeventh,
            "m7" | "min7" => ChordKind::MinorSeventh,
            "dim7" | "o7" | "°7" => ChordKind::DiminishedSeventh,
            "m7b5" | "ø" | "ø7" => ChordKind::HalfDiminishedSeventh,
            "mM7" | "mmaj7" => ChordKind::MinorMajorSeventh,
            "+7" | "aug7" => ChordKind::AugmentedSeventh,
            _ => return None,
        };
        Some(kind)
    }

    /// MusicXML `<kind>` text
    pub fn musicxml_kind(self) -> &'static str {
        match self {
            ChordKind::Major => "major",
            ChordKind::Minor => "minor",
            ChordKind::Augmented => "augmented",
            ChordKind::Diminished => "diminished",
            ChordKind::SuspendedSecond => "suspended-second",
            ChordKind::SuspendedFourth => "suspended-fourth",
            ChordKind::Power => "power",
            ChordKind::DominantSeventh => "dominant",
            ChordKind::MajorSeventh => "major-seventh",
            ChordKind::MinorSeventh => "minor-seventh",
            ChordKind::DiminishedSeventh => "diminished-seventh",
            ChordKind::HalfDiminishedSeventh => "half-diminished",
            ChordKind::MinorMajorSeventh => "major-minor",
            ChordKind::AugmentedSeventh => "augmented-seventh",
        }
    }

    /// Parse a MusicXML `<kind>`, reducing extended chords to their seventh/triad core.
    ///
    /// Returns `None` for unrecognised kinds (and for `none`, which is not a chord).
    pub fn from_musicxml_kind(kind: &str) -> Option<ChordKind> {
        let kind = match kind.trim() {
            "major" | "major-sixth" => ChordKind::Major,
            "minor" | "minor-sixth" => ChordKind::Minor,
            "augmented" => ChordKind::Augmented,
            "diminished" => ChordKind::Diminished,
            "suspended-second" => ChordKind::SuspendedSecond,
            "suspended-fourth" => ChordKind::SuspendedFourth,
            "power" => ChordKind::Power,
            "dominant" | "dominant-seventh" | "dominant-ninth" | "dominant-11th"
            | "dominant-13th" => ChordKind::DominantSeventh,
            "major-seventh" | "major-ninth" | "major-11th" | "major-13th" => {
                ChordKind::MajorSeventh
            }
            "minor-seventh" | "minor-ninth" | "minor-11th" | "minor-13th" => {
                ChordKind::MinorSeventh
            }
            "diminished-seventh" => ChordKind::DiminishedSeventh,
            "half-diminished" => ChordKind::HalfDiminishedSeventh,
            "major-minor" => ChordKind::MinorMajorSeventh,
            "augmented-seventh" => ChordKind::AugmentedSeventh,
            _ => return None,
        };
        Some(kind)
    }
}

static FIGURE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Ga-g][#b\-]*)([^/]*)(?:/([A-Ga-g][#b\-]*))?$").unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChordSymbol {
    pub root: PitchName,
    pub kind: ChordKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bass: Option<PitchName>,
}

impl ChordSymbol {
    pub fn new(root: PitchName, kind: ChordKind) -> Self {
        Self {
            root,
            kind,
            bass: None,
        }
    }

    pub fn with_bass(mut self, bass: PitchName) -> Self {
        self.bass = Some(bass);
        self
    }

    pub fn third(&self) -> Option<PitchName> {
        self.kind.third().map(|i| i.transpose_name(&self.root))
    }

    pub fn fifth(&self) -> Option<PitchName> {
        self.kind.fifth().map(|i| i.transpose_name(&self.root))
    }

    pub fn seventh(&self) -> Option<PitchName> {
        self.kind.seventh().map(|i| i.transpose_name(&self.root))
    }

    pub fn has_seventh(&self) -> bool {
        self.kind.seventh().is_some()
    }

    /// Pitch classes sounding in the chord (root first, no duplicates)
    pub fn pitch_classes(&self) -> Vec<i32> {
        let mut pcs = vec![self.root.pitch_class()];
        let tones = [
            self.kind.suspension(),
            self.kind.third(),
            self.kind.fifth(),
            self.kind.seventh(),
        ];
        for interval in tones.iter().flatten() {
            let pc = interval.transpose_name(&self.root).pitch_class();
            if !pcs.contains(&pc) {
                pcs.push(pc);
            }
        }
        pcs
    }

    pub fn contains_pitch_class(&self, pc: i32) -> bool {
        self.pitch_classes().contains(&pc.rem_euclid(12))
    }

    /// Figure text, e.g. "Bbm7" or "C/E"
    pub fn figure(&self) -> String {
        match &self.bass {
            Some(bass) => format!("{}{}/{}", self.root, self.kind.suffix(), bass),
            None => format!("{}{}", self.root, self.kind.suffix()),
        }
    }

    pub fn from_figure(figure: &str) -> Option<Self> {
        let caps = FIGURE_RE.captures(figure.trim())?;
        let root = PitchName::parse(caps.get(1)?.as_str())?;
        let kind = ChordKind::from_suffix(caps.get(2).map_or("", |m| m.as_str()))?;
        let bass = match caps.get(3) {
            Some(m) => Some(PitchName::parse(m.as_str())?),
            None => None,
        };
        Some(Self { root, kind, bass })
    }

    pub fn transposed(&self, interval: &Interval) -> Self {
        Self {
            root: interval.transpose_name(&self.root),
            kind: self.kind,
            bass: self.bass.map(|b| interval.transpose_name(&b)),
        }
    }
}

impl fmt::Display for ChordSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.figure())
    }
}

/// Payload of a harmony event: a chord, or an explicit "no chord"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Harmony {
    Chord(ChordSymbol),
    NoChord,
}

impl Harmony {
    pub fn chord(&self) -> Option<&ChordSymbol> {
        match self {
            Harmony::Chord(symbol) => Some(symbol),
            Harmony::NoChord => None,
        }
    }

    pub fn figure(&self) -> String {
        match self {
            Harmony::Chord(symbol) => symbol.figure(),
            Harmony::NoChord => "N.C.".to_string(),
        }
    }

    pub fn transposed(&self, interval: &Interval) -> Self {
        match self {
            Harmony::Chord(symbol) => Harmony::Chord(symbol.transposed(interval)),
            Harmony::NoChord => Harmony::NoChord,
        }
    }
}
