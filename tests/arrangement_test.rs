// Pillar-chord arranging of a MusicXML lead sheet

use shopit_engine::arranger::{arrange_from_lead_sheet, ArrangerSettings};
use shopit_engine::converters::{FormatCodec, MusicXmlCodec};
use shopit_engine::models::{
    ArrangementType, Clef, Event, EventKind, Harmony, Measure, Note, Part, Pitch, Rational, Rest,
    Score, StemDirection, TimeSignature, Voice, VoicePart,
};
use shopit_engine::EngineError;

const LEAD_SHEET: &str = include_str!("fixtures/lead_sheet.musicxml");

fn load() -> Score {
    MusicXmlCodec::new()
        .decode(LEAD_SHEET.as_bytes(), "lead_sheet.musicxml")
        .expect("fixture should parse")
}

fn arrange(score: &Score, target: ArrangementType) -> shopit_engine::arranger::Arrangement {
    arrange_from_lead_sheet(score, target, &ArrangerSettings::default())
        .expect("arrangement should succeed")
}

fn voice<'a>(score: &'a Score, measure: usize, part: VoicePart) -> &'a Voice {
    let staff = (part.staff() - 1) as usize;
    score.parts[staff].measures[measure]
        .voice(part.voice_id())
        .expect("voice should exist")
}

fn sounding(voice: &Voice) -> Vec<&Event> {
    voice.events.iter().filter(|e| !e.is_harmony()).collect()
}

fn pitch_at(score: &Score, measure: usize, part: VoicePart, index: usize) -> Option<String> {
    sounding(voice(score, measure, part))[index]
        .as_note()
        .map(|note| note.pitch.to_string())
}

#[test]
fn test_root_position_pillar() {
    let arranged = arrange(&load(), ArrangementType::LowerVoices);
    let score = &arranged.score;
    assert_eq!(pitch_at(score, 0, VoicePart::Lead, 0).as_deref(), Some("C4"));
    assert_eq!(pitch_at(score, 0, VoicePart::Tenor, 0).as_deref(), Some("E4"));
    assert_eq!(pitch_at(score, 0, VoicePart::Bari, 0).as_deref(), Some("G3"));
    assert_eq!(pitch_at(score, 0, VoicePart::Bass, 0).as_deref(), Some("C3"));
}

#[test]
fn test_melody_on_third_and_fifth() {
    let arranged = arrange(&load(), ArrangementType::LowerVoices);
    let score = &arranged.score;

    // E4 over C: everything in the lead's octave
    assert_eq!(pitch_at(score, 0, VoicePart::Tenor, 1).as_deref(), Some("C4"));
    assert_eq!(pitch_at(score, 0, VoicePart::Bari, 1).as_deref(), Some("G4"));
    assert_eq!(pitch_at(score, 0, VoicePart::Bass, 1).as_deref(), Some("C4"));

    // G4 over C: bass below the lead, bari an octave above the bass
    assert_eq!(pitch_at(score, 0, VoicePart::Bass, 2).as_deref(), Some("C4"));
    assert_eq!(pitch_at(score, 0, VoicePart::Bari, 2).as_deref(), Some("C5"));
    assert_eq!(pitch_at(score, 0, VoicePart::Tenor, 2).as_deref(), Some("E5"));
}

#[test]
fn test_off_chord_note_gets_hidden_rests() {
    let arranged = arrange(&load(), ArrangementType::LowerVoices);
    let score = &arranged.score;
    let lead_d = sounding(voice(score, 0, VoicePart::Lead))[3];
    assert_eq!(lead_d.as_note().unwrap().pitch, Pitch::parse("D4").unwrap());

    for part in [VoicePart::Tenor, VoicePart::Bari, VoicePart::Bass] {
        let event = sounding(voice(score, 0, part))[3];
        assert_eq!(event.kind, EventKind::Rest(Rest { hidden: true }));
        assert_eq!(event.duration, lead_d.duration);
        assert_eq!(event.offset, lead_d.offset);
    }
}

#[test]
fn test_chord_option_sets() {
    let arranged = arrange(&load(), ArrangementType::LowerVoices);
    let ids: Vec<&str> = arranged.chord_options.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["m1.1", "m2.1"]);

    let first: Vec<String> = arranged.chord_options[0]
        .options
        .iter()
        .map(|c| c.figure())
        .collect();
    assert_eq!(first, vec!["G7", "Gm7"]);
    assert_eq!(arranged.chord_options[1].options[0].figure(), "G7");
    assert_eq!(arranged.chord_options[1].offset, Rational::new(7, 2));
}

#[test]
fn test_stems_and_clefs() {
    let arranged = arrange(&load(), ArrangementType::UpperVoices);
    let score = &arranged.score;
    assert_eq!(score.parts[0].measures[0].clefs, vec![Clef::Treble]);
    assert_eq!(score.parts[1].measures[0].clefs, vec![Clef::Treble8vb]);
    assert_eq!(score.title.as_deref(), Some("Down Our Way (Upper Voices)"));

    let stem = |part: VoicePart| {
        sounding(voice(score, 0, part))[0]
            .as_note()
            .and_then(|n| n.stem)
    };
    assert_eq!(stem(VoicePart::Tenor), Some(StemDirection::Up));
    assert_eq!(stem(VoicePart::Lead), Some(StemDirection::Down));
    assert_eq!(stem(VoicePart::Bari), Some(StemDirection::Up));
    assert_eq!(stem(VoicePart::Bass), Some(StemDirection::Down));
}

#[test]
fn test_every_voice_fills_every_measure() {
    let source = load();
    let arranged = arrange(&source, ArrangementType::LowerVoices);
    let lengths = source.parts[0].measure_lengths();
    for (index, length) in lengths.iter().enumerate() {
        for part in VoicePart::ALL {
            let total = sounding(voice(&arranged.score, index, part))
                .iter()
                .fold(Rational::from_integer(0), |acc, e| acc + e.duration);
            assert_eq!(&total, length, "measure {} {}", index + 1, part);
        }
    }
}

#[test]
fn test_input_is_not_modified() {
    let source = load();
    let copy = source.clone();
    arrange(&source, ArrangementType::LowerVoices);
    assert_eq!(source, copy);
}

#[test]
fn test_part_ranges_scanned() {
    let arranged = arrange(&load(), ArrangementType::LowerVoices);
    let bass = arranged.part_ranges[&VoicePart::Bass];
    assert_eq!(bass.lowest, Pitch::parse("C3").unwrap());
    let lead = arranged.part_ranges[&VoicePart::Lead];
    assert_eq!(lead.highest, Pitch::parse("A4").unwrap());
}

fn rest_only_sheet() -> Score {
    let mut part = Part::new("P1", "Melody");
    for number in 1..=2 {
        let mut m = Measure::new(number);
        m.time_signature = Some(TimeSignature::new(3, 4));
        m.events.push(Event::harmony(
            Rational::from_integer(0),
            Harmony::NoChord,
        ));
        m.events
            .push(Event::rest(Rational::from_integer(0), Rational::from_integer(3)));
        part.measures.push(m);
    }
    let mut score = Score::new(None);
    score.parts.push(part);
    score
}

#[test]
fn test_all_rest_melody() {
    let source = rest_only_sheet();
    let arranged = arrange(&source, ArrangementType::LowerVoices);
    assert!(arranged.part_ranges.is_empty());
    assert!(arranged.chord_options.is_empty());
    for part in VoicePart::ALL {
        let total = (0..2)
            .flat_map(|m| sounding(voice(&arranged.score, m, part)))
            .fold(Rational::from_integer(0), |acc, e| {
                assert!(matches!(e.kind, EventKind::Rest(_)));
                acc + e.duration
            });
        assert_eq!(total, source.duration());
    }
}

#[test]
fn test_two_voice_melody_rejected() {
    let mut score = load();
    let measure = &mut score.parts[0].measures[0];
    let events = std::mem::take(&mut measure.events);
    let mut second = Voice::new("2", 1);
    second
        .events
        .push(Event::rest(Rational::from_integer(0), Rational::from_integer(4)));
    measure.voices = vec![
        Voice {
            id: "1".to_string(),
            staff: 1,
            events,
        },
        second,
    ];
    assert!(matches!(
        arrange_from_lead_sheet(&score, ArrangementType::LowerVoices, &ArrangerSettings::default()),
        Err(EngineError::InvalidLeadSheet(_))
    ));
}

#[test]
fn test_lead_sheet_without_chords_rejected() {
    let mut part = Part::new("P1", "Melody");
    let mut m = Measure::new(1);
    m.events.push(Event::new(
        Rational::from_integer(0),
        Rational::from_integer(4),
        EventKind::Note(Note::new(Pitch::parse("C4").unwrap())),
    ));
    part.measures.push(m);
    let mut score = Score::new(None);
    score.parts.push(part);
    assert!(matches!(
        arrange_from_lead_sheet(&score, ArrangementType::UpperVoices, &ArrangerSettings::default()),
        Err(EngineError::InvalidLeadSheet(_))
    ));
}
