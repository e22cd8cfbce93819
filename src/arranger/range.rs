//! Vocal range scan over an arranged part

use crate::models::{
    standard_ranges, ArrangementType, Event, Part, PartRanges, VocalRange, VoicePart,
};

/// Lowest and highest pitch sung by each voice. Voices with no notes are absent.
pub fn scan_part_ranges(parts: &[Part]) -> PartRanges {
    let mut ranges = PartRanges::new();
    for voice_part in VoicePart::ALL {
        let pitches = parts
            .iter()
            .flat_map(|part| part.measures.iter())
            .filter_map(|m| m.voice(voice_part.voice_id()))
            .flat_map(|v| v.events.iter())
            .flat_map(Event::pitches);
        for pitch in pitches {
            ranges
                .entry(voice_part)
                .and_modify(|range: &mut VocalRange| range.include(pitch))
                .or_insert_with(|| VocalRange::new(pitch, pitch));
        }
    }
    ranges
}

/// Log every voice that leaves its standard range. Returns the offending voices.
pub fn warn_out_of_range(ranges: &PartRanges, arrangement: ArrangementType) -> Vec<VoicePart> {
    let Some(standard) = standard_ranges(arrangement) else {
        return Vec::new();
    };
    let mut offenders = Vec::new();
    for (voice_part, sung) in ranges {
        let Some(limit) = standard.get(voice_part) else {
            continue;
        };
        if limit.is_too_low(&sung.lowest) || limit.is_too_high(&sung.highest) {
            log::warn!(
                "{} sings {}..{}, outside the usual {}..{}",
                voice_part,
                sung.lowest,
                sung.highest,
                limit.lowest,
                limit.highest
            );
            offenders.push(*voice_part);
        }
    }
    offenders
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Measure, Pitch, Rational, Voice};

    fn q(n: i32) -> Rational {
        Rational::from_integer(n)
    }

    fn measure_with(voice: &str, pitches: &[&str]) -> Measure {
        let mut m = Measure::new(1);
        let mut v = Voice::new(voice, 1);
        for (i, p) in pitches.iter().enumerate() {
            v.events.push(Event::note(q(i as i32), q(1), Pitch::parse(p).unwrap()));
        }
        m.voices.push(v);
        m
    }

    #[test]
    fn test_scan_uses_absolute_pitch() {
        let mut part = Part::new("P1", "Tenor/Lead");
        part.measures.push(measure_with("lead", &["C4", "B#3", "Cb4", "G4"]));
        let ranges = scan_part_ranges(std::slice::from_ref(&part));
        let lead = ranges[&VoicePart::Lead];
        assert_eq!(lead.lowest.to_string(), "Cb4");
        assert_eq!(lead.highest.to_string(), "G4");
        assert!(!ranges.contains_key(&VoicePart::Tenor));
    }

    #[test]
    fn test_out_of_range_reported() {
        let mut part = Part::new("P1", "Bari/Bass");
        part.measures.push(measure_with("bass", &["C2", "G2"]));
        let ranges = scan_part_ranges(std::slice::from_ref(&part));
        assert_eq!(
            warn_out_of_range(&ranges, ArrangementType::LowerVoices),
            vec![VoicePart::Bass]
        );
        assert!(warn_out_of_range(&ranges, ArrangementType::MixedVoices).is_empty());
    }
}
