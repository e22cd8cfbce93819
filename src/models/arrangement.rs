//! Barbershop arrangement metadata: arrangement type, voice parts, ranges, chord options

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use std::collections::BTreeMap;
use std::fmt;

use crate::models::harmony::{ChordSymbol, Harmony};
use crate::models::pitch::{Pitch, Step};
use crate::models::score::Rational;

/// Which voicing family to arrange for (integer tag on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum ArrangementType {
    UpperVoices = 1,
    LowerVoices = 2,
    /// No standard ranges exist for mixed groups; never produced
    MixedVoices = 3,
}

impl ArrangementType {
    pub fn title_suffix(self) -> &'static str {
        match self {
            ArrangementType::UpperVoices => " (Upper Voices)",
            ArrangementType::LowerVoices => " (Lower Voices)",
            ArrangementType::MixedVoices => " (Mixed Voices)",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "UpperVoices" => Some(ArrangementType::UpperVoices),
            "LowerVoices" => Some(ArrangementType::LowerVoices),
            "MixedVoices" => Some(ArrangementType::MixedVoices),
            _ => None,
        }
    }
}

impl fmt::Display for ArrangementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArrangementType::UpperVoices => "UpperVoices",
            ArrangementType::LowerVoices => "LowerVoices",
            ArrangementType::MixedVoices => "MixedVoices",
        };
        f.write_str(name)
    }
}

/// The four barbershop parts, top-staff voices first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VoicePart {
    Tenor,
    Lead,
    Bari,
    Bass,
}

impl VoicePart {
    pub const ALL: [VoicePart; 4] = [
        VoicePart::Tenor,
        VoicePart::Lead,
        VoicePart::Bari,
        VoicePart::Bass,
    ];

    /// Voice id used in the arranged score
    pub fn voice_id(self) -> &'static str {
        match self {
            VoicePart::Tenor => "tenor",
            VoicePart::Lead => "lead",
            VoicePart::Bari => "bari",
            VoicePart::Bass => "bass",
        }
    }

    /// 1 = "Tenor/Lead" staff, 2 = "Bari/Bass" staff
    pub fn staff(self) -> u8 {
        match self {
            VoicePart::Tenor | VoicePart::Lead => 1,
            VoicePart::Bari | VoicePart::Bass => 2,
        }
    }
}

impl fmt::Display for VoicePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VoicePart::Tenor => "Tenor",
            VoicePart::Lead => "Lead",
            VoicePart::Bari => "Bari",
            VoicePart::Bass => "Bass",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocalRange {
    pub lowest: Pitch,
    pub highest: Pitch,
}

impl VocalRange {
    pub fn new(lowest: Pitch, highest: Pitch) -> Self {
        Self { lowest, highest }
    }

    pub fn is_too_low(&self, pitch: &Pitch) -> bool {
        pitch.is_below(&self.lowest)
    }

    pub fn is_too_high(&self, pitch: &Pitch) -> bool {
        pitch.is_above(&self.highest)
    }

    pub fn contains(&self, pitch: &Pitch) -> bool {
        !self.is_too_low(pitch) && !self.is_too_high(pitch)
    }

    /// Widen the range to include `pitch`
    pub fn include(&mut self, pitch: Pitch) {
        if pitch.is_below(&self.lowest) {
            self.lowest = pitch;
        }
        if pitch.is_above(&self.highest) {
            self.highest = pitch;
        }
    }
}

pub type PartRanges = BTreeMap<VoicePart, VocalRange>;

fn range(lowest: (Step, i8, i8), highest: (Step, i8, i8)) -> VocalRange {
    VocalRange::new(
        Pitch::new(lowest.0, lowest.1, lowest.2),
        Pitch::new(highest.0, highest.1, highest.2),
    )
}

/// Typical barbershop ranges; there are none for mixed voices
pub fn standard_ranges(arrangement: ArrangementType) -> Option<PartRanges> {
    let table = match arrangement {
        ArrangementType::LowerVoices => [
            (VoicePart::Tenor, range((Step::B, -1, 3), (Step::B, -1, 4))),
            (VoicePart::Lead, range((Step::D, 0, 3), (Step::F, 0, 4))),
            (VoicePart::Bari, range((Step::B, 0, 2), (Step::F, 0, 4))),
            (VoicePart::Bass, range((Step::F, 0, 2), (Step::B, -1, 3))),
        ],
        ArrangementType::UpperVoices => [
            (VoicePart::Tenor, range((Step::F, 1, 4), (Step::F, 0, 5))),
            (VoicePart::Lead, range((Step::A, 0, 3), (Step::C, 0, 5))),
            (VoicePart::Bari, range((Step::A, 0, 3), (Step::C, 0, 5))),
            (VoicePart::Bass, range((Step::E, -1, 3), (Step::D, 0, 4))),
        ],
        ArrangementType::MixedVoices => return None,
    };
    Some(table.into_iter().collect())
}

/// Alternative chords offered for one non-pillar melody note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordOptionSet {
    /// `m{measure}.{index}`
    pub id: String,
    /// Index of the measure in the arranged part
    pub measure_index: usize,
    /// Note position within the measure
    pub offset: Rational,
    pub duration: Rational,
    pub melody: Pitch,
    pub original: ChordSymbol,
    pub options: Vec<ChordSymbol>,
    /// Index into `options`; `None` shows the original chord
    #[serde(default)]
    pub chosen: Option<usize>,
    /// The original chord symbol starts exactly at the note
    pub original_starts_at_note: bool,
    /// Chord symbols added to the lead voice to display the current choice
    #[serde(default)]
    pub inserted_at_start: bool,
    #[serde(default)]
    pub inserted_at_end: bool,
    /// Symbol that already stood at the note and was overwritten by the current choice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaced_at_start: Option<Harmony>,
}

impl ChordOptionSet {
    pub fn option_id(&self, n: usize) -> String {
        format!("{}:{}", self.id, n)
    }

    pub fn original_id(&self) -> String {
        format!("{}:original", self.id)
    }

    /// Id that reselects the current choice
    pub fn current_id(&self) -> String {
        match self.chosen {
            Some(index) => self.option_id(index + 1),
            None => self.original_id(),
        }
    }

    pub fn current_chord(&self) -> &ChordSymbol {
        self.chosen
            .and_then(|index| self.options.get(index))
            .unwrap_or(&self.original)
    }

    pub fn end(&self) -> Rational {
        self.offset + self.duration
    }
}

/// Metadata kept alongside an arranged score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrangementInfo {
    pub arrangement_type: ArrangementType,
    pub part_ranges: PartRanges,
    pub chord_options: Vec<ChordOptionSet>,
    pub options_visible: bool,
}

impl ArrangementInfo {
    pub fn new(
        arrangement_type: ArrangementType,
        part_ranges: PartRanges,
        chord_options: Vec<ChordOptionSet>,
    ) -> Self {
        Self {
            arrangement_type,
            part_ranges,
            chord_options,
            options_visible: true,
        }
    }

    pub fn option_set(&self, set_id: &str) -> Option<&ChordOptionSet> {
        self.chord_options.iter().find(|set| set.id == set_id)
    }
}
