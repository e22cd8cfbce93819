//! Pillar chord voicing
//!
//! Given a melody (lead) note and the chord sounding under it, place tenor, bari and bass
//! around the lead. Only notes on the root, third or fifth of a triad are voiced; anything
//! else is left for the chord-option machinery.

use crate::error::{EngineError, EngineResult};
use crate::models::{
    ChordSymbol, EventKind, Harmony, Note, Pitch, PitchName, Rest, StemDirection, VoicePart,
};

/// What the melody note is, relative to the chord
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PillarRole {
    Root,
    Third,
    Fifth,
    /// Not a chord tone; the harmony voices rest (hidden)
    OffChord,
    /// No usable harmony; the harmony voices rest (visible)
    Unharmonized,
}

/// One simultaneous slice of the four voices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FourNotes {
    pub tenor: EventKind,
    pub lead: EventKind,
    pub bari: EventKind,
    pub bass: EventKind,
    pub role: PillarRole,
}

impl FourNotes {
    pub fn get(&self, part: VoicePart) -> &EventKind {
        match part {
            VoicePart::Tenor => &self.tenor,
            VoicePart::Lead => &self.lead,
            VoicePart::Bari => &self.bari,
            VoicePart::Bass => &self.bass,
        }
    }

    fn resting(lead: Note, hidden: bool, role: PillarRole) -> Self {
        let rest = EventKind::Rest(Rest { hidden });
        Self {
            tenor: rest.clone(),
            lead: EventKind::Note(lead),
            bari: rest.clone(),
            bass: rest,
            role,
        }
    }
}

pub fn stem_direction(part: VoicePart) -> StemDirection {
    match part {
        VoicePart::Tenor | VoicePart::Bari => StemDirection::Up,
        VoicePart::Lead | VoicePart::Bass => StemDirection::Down,
    }
}

fn voiced(part: VoicePart, pitch: Pitch) -> EventKind {
    EventKind::Note(Note::new(pitch).with_stem(stem_direction(part)))
}

/// Same name, moved up an octave while it is below `floor`
fn raise_above(name: &PitchName, octave: i8, floor: &Pitch) -> Pitch {
    let pitch = name.at_octave(octave);
    if pitch.is_below(floor) {
        pitch.shifted_octaves(1)
    } else {
        pitch
    }
}

fn lower_below(name: &PitchName, octave: i8, ceiling: &Pitch) -> Pitch {
    let pitch = name.at_octave(octave);
    if pitch.is_above(ceiling) {
        pitch.shifted_octaves(-1)
    } else {
        pitch
    }
}

/// Voice one melody note.
///
/// `bass_threshold` is the lowest lead pitch for which a root-position bass is dropped an
/// octave below the lead.
pub fn compute_pillar_chord(
    melody: &Note,
    harmony: Option<&Harmony>,
    bass_threshold: &Pitch,
) -> EngineResult<FourNotes> {
    let mut lead = melody.clone();
    lead.stem = Some(stem_direction(VoicePart::Lead));

    let chord: &ChordSymbol = match harmony {
        Some(Harmony::Chord(chord)) => chord,
        Some(Harmony::NoChord) | None => {
            return Ok(FourNotes::resting(lead, false, PillarRole::Unharmonized))
        }
    };

    if chord.has_seventh() {
        return Err(EngineError::UnsupportedChordShape {
            chord: chord.figure(),
        });
    }

    let (third, fifth) = match (chord.third(), chord.fifth()) {
        (Some(third), Some(fifth)) => (third, fifth),
        _ => return Ok(FourNotes::resting(lead, false, PillarRole::Unharmonized)),
    };
    let root = chord.root;
    let lead_pitch = lead.pitch;
    let octave = lead_pitch.octave;
    let pc = lead_pitch.pitch_class();

    let (role, tenor, bari, bass) = if pc == root.pitch_class() {
        let bass = if lead_pitch.is_below(bass_threshold) {
            root.at_octave(octave)
        } else {
            root.at_octave(octave - 1)
        };
        let tenor = raise_above(&third, octave, &lead_pitch);
        let bari = lower_below(&fifth, octave, &lead_pitch);
        (PillarRole::Root, tenor, bari, bass)
    } else if pc == fifth.pitch_class() {
        let mut bass = root.at_octave(octave);
        while !bass.is_below(&lead_pitch) {
            bass = bass.shifted_octaves(-1);
        }
        let bari = root.at_octave(bass.octave + 1);
        let tenor = raise_above(&third, bari.octave, &bari);
        (PillarRole::Fifth, tenor, bari, bass)
    } else if pc == third.pitch_class() {
        (
            PillarRole::Third,
            root.at_octave(octave),
            fifth.at_octave(octave),
            root.at_octave(octave),
        )
    } else {
        return Ok(FourNotes::resting(lead, true, PillarRole::OffChord));
    };

    Ok(FourNotes {
        tenor: voiced(VoicePart::Tenor, tenor),
        lead: EventKind::Note(lead),
        bari: voiced(VoicePart::Bari, bari),
        bass: voiced(VoicePart::Bass, bass),
        role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(p: &str) -> Note {
        Note::new(Pitch::parse(p).unwrap())
    }

    fn chord(figure: &str) -> Harmony {
        Harmony::Chord(ChordSymbol::from_figure(figure).unwrap())
    }

    fn f3() -> Pitch {
        Pitch::parse("F3").unwrap()
    }

    fn pitch_of(kind: &EventKind) -> String {
        match kind {
            EventKind::Note(n) => n.pitch.to_string(),
            other => format!("{:?}", other),
        }
    }

    #[test]
    fn test_melody_on_root() {
        let four = compute_pillar_chord(&note("C4"), Some(&chord("C")), &f3()).unwrap();
        assert_eq!(four.role, PillarRole::Root);
        assert_eq!(pitch_of(&four.lead), "C4");
        assert_eq!(pitch_of(&four.tenor), "E4");
        assert_eq!(pitch_of(&four.bari), "G3");
        assert_eq!(pitch_of(&four.bass), "C3");
    }

    #[test]
    fn test_low_root_keeps_bass_in_lead_octave() {
        let four = compute_pillar_chord(&note("D3"), Some(&chord("D")), &f3()).unwrap();
        assert_eq!(pitch_of(&four.bass), "D3");
    }

    #[test]
    fn test_melody_on_fifth() {
        let four = compute_pillar_chord(&note("G4"), Some(&chord("C")), &f3()).unwrap();
        assert_eq!(four.role, PillarRole::Fifth);
        assert_eq!(pitch_of(&four.bass), "C4");
        assert_eq!(pitch_of(&four.bari), "C5");
        assert_eq!(pitch_of(&four.tenor), "E5");
    }

    #[test]
    fn test_melody_on_third_uses_lead_octave() {
        let four = compute_pillar_chord(&note("E4"), Some(&chord("C")), &f3()).unwrap();
        assert_eq!(four.role, PillarRole::Third);
        assert_eq!(pitch_of(&four.bass), "C4");
        assert_eq!(pitch_of(&four.tenor), "C4");
        assert_eq!(pitch_of(&four.bari), "G4");
    }

    #[test]
    fn test_off_chord_gets_hidden_rests() {
        let four = compute_pillar_chord(&note("D4"), Some(&chord("C")), &f3()).unwrap();
        assert_eq!(four.role, PillarRole::OffChord);
        assert_eq!(four.tenor, EventKind::Rest(Rest { hidden: true }));
        assert_eq!(four.bass, EventKind::Rest(Rest { hidden: true }));
    }

    #[test]
    fn test_no_chord_and_sus_get_visible_rests() {
        for harmony in [None, Some(Harmony::NoChord), Some(chord("Csus4"))] {
            let four = compute_pillar_chord(&note("C4"), harmony.as_ref(), &f3()).unwrap();
            assert_eq!(four.role, PillarRole::Unharmonized);
            assert_eq!(four.bari, EventKind::Rest(Rest { hidden: false }));
        }
    }

    #[test]
    fn test_seventh_chord_fails_loudly() {
        let err = compute_pillar_chord(&note("C4"), Some(&chord("C7")), &f3()).unwrap_err();
        assert_eq!(
            err,
            EngineError::UnsupportedChordShape {
                chord: "C7".to_string()
            }
        );
    }

    #[test]
    fn test_stems() {
        let four = compute_pillar_chord(&note("C4"), Some(&chord("C")), &f3()).unwrap();
        let stem = |k: &EventKind| match k {
            EventKind::Note(n) => n.stem,
            _ => None,
        };
        assert_eq!(stem(&four.tenor), Some(StemDirection::Up));
        assert_eq!(stem(&four.lead), Some(StemDirection::Down));
        assert_eq!(stem(&four.bari), Some(StemDirection::Up));
        assert_eq!(stem(&four.bass), Some(StemDirection::Down));
    }
}
