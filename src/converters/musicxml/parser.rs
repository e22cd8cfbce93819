//! MusicXML reader
//!
//! Converts `<score-partwise>` documents into the score model using roxmltree.

use roxmltree::{Document as XmlDocument, Node, ParsingOptions};
use std::collections::HashMap;

use crate::error::CodecError;
use crate::models::{
    ChordKind, ChordSymbol, Clef, Event, EventKind, Harmony, KeySignature, Measure, Note, Part,
    Pitch, PitchName, Rational, Rest, Score, StemDirection, Step, Tie, TimeSignature, Voice,
};

type ParseResult<T> = Result<T, CodecError>;

fn malformed(msg: impl Into<String>) -> CodecError {
    CodecError::MalformedInput(msg.into())
}

fn child<'a, 'input>(node: &Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.tag_name().name() == name)
}

fn child_text<'a>(node: &Node<'a, '_>, name: &str) -> Option<&'a str> {
    child(node, name).and_then(|n| n.text()).map(str::trim)
}

fn parse_number<T: std::str::FromStr>(node: &Node, name: &str) -> ParseResult<Option<T>> {
    match child_text(node, name) {
        None => Ok(None),
        Some(text) => text
            .parse::<T>()
            .map(Some)
            .map_err(|_| malformed(format!("invalid <{}> value '{}'", name, text))),
    }
}

/// Parse a MusicXML string into a score
pub fn parse_musicxml(xml: &str) -> ParseResult<Score> {
    let mut options = ParsingOptions::default();
    options.allow_dtd = true;
    let doc = XmlDocument::parse_with_options(xml, options)
        .map_err(|e| malformed(format!("XML parse error: {}", e)))?;

    let root = doc.root_element();
    match root.tag_name().name() {
        "score-partwise" => parse_score_partwise(&root),
        "score-timewise" => Err(malformed(
            "score-timewise format is not supported (use score-partwise)",
        )),
        other => Err(malformed(format!(
            "expected <score-partwise>, found <{}>",
            other
        ))),
    }
}

fn parse_score_partwise(root: &Node) -> ParseResult<Score> {
    let title = child(root, "work")
        .and_then(|work| child_text(&work, "work-title"))
        .or_else(|| child_text(root, "movement-title"))
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    let part_list = child(root, "part-list").ok_or_else(|| malformed("missing <part-list>"))?;
    let names = parse_part_list(&part_list);

    let mut score = Score::new(title);
    for (index, part_node) in root
        .children()
        .filter(|n| n.tag_name().name() == "part")
        .enumerate()
    {
        let id = part_node
            .attribute("id")
            .ok_or_else(|| malformed("<part> without id attribute"))?;
        let name = names
            .get(id)
            .cloned()
            .unwrap_or_else(|| format!("Part {}", index + 1));
        score.parts.push(parse_part(&part_node, id, &name)?);
    }

    if score.parts.is_empty() {
        return Err(malformed("score has no parts"));
    }
    Ok(score)
}

/// Map score-part ids to part names
fn parse_part_list(part_list: &Node) -> HashMap<String, String> {
    part_list
        .children()
        .filter(|n| n.tag_name().name() == "score-part")
        .filter_map(|score_part| {
            let id = score_part.attribute("id")?;
            let name = child_text(&score_part, "part-name").unwrap_or("");
            Some((id.to_string(), name.to_string()))
        })
        .collect()
}

/// State carried from one measure to the next
struct PartState {
    divisions: i32,
    staves: u8,
}

fn parse_part(part_node: &Node, id: &str, name: &str) -> ParseResult<Part> {
    let mut part = Part::new(id, name);
    let mut state = PartState {
        divisions: 1,
        staves: 1,
    };

    for (index, measure_node) in part_node
        .children()
        .filter(|n| n.tag_name().name() == "measure")
        .enumerate()
    {
        let measure = parse_measure(&measure_node, index, &mut state)?;
        part.measures.push(measure);
    }
    part.staves = state.staves;
    Ok(part)
}

/// Split "12a" into (12, Some("a"))
fn parse_measure_number(text: &str, index: usize) -> (u32, Option<String>) {
    let digits: String = text.chars().take_while(|c| c.is_ascii_digit()).collect();
    let rest = &text[digits.len()..];
    let number = digits.parse().unwrap_or(index as u32 + 1);
    let suffix = if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    };
    (number, suffix)
}

/// Events of one voice while a measure is being read
#[derive(Default)]
struct VoiceBuilder {
    staff: u8,
    events: Vec<Event>,
}

fn parse_measure(measure_node: &Node, index: usize, state: &mut PartState) -> ParseResult<Measure> {
    let (number, suffix) =
        parse_measure_number(measure_node.attribute("number").unwrap_or(""), index);
    let mut measure = Measure::new(number);
    measure.suffix = suffix;

    let mut cursor = Rational::from_integer(0);
    // voice id -> events, in first-seen order
    let mut voice_order: Vec<String> = Vec::new();
    let mut voices: HashMap<String, VoiceBuilder> = HashMap::new();
    let mut harmonies: Vec<Event> = Vec::new();
    let mut last_voice: Option<String> = None;

    for node in measure_node.children().filter(|n| n.is_element()) {
        match node.tag_name().name() {
            "attributes" => parse_attributes(&node, &mut measure, state)?,
            "harmony" => {
                let offset = parse_number::<i32>(&node, "offset")?.unwrap_or(0);
                let at = cursor + Rational::new(offset, state.divisions.max(1));
                harmonies.push(Event::harmony(at, parse_harmony(&node)?));
            }
            "backup" | "forward" => {
                let duration = parse_number::<i32>(&node, "duration")?.unwrap_or(0);
                let amount = Rational::new(duration, state.divisions.max(1));
                if node.tag_name().name() == "backup" {
                    cursor -= amount;
                } else {
                    cursor += amount;
                }
            }
            "note" => {
                if child(&node, "grace").is_some() {
                    continue;
                }
                let voice_id = child_text(&node, "voice").unwrap_or("1").to_string();
                let staff = parse_number::<u8>(&node, "staff")?.unwrap_or(1);
                let duration = parse_number::<i32>(&node, "duration")?
                    .ok_or_else(|| malformed("<note> without <duration>"))?;
                let duration = Rational::new(duration, state.divisions.max(1));
                let is_chord_tone = child(&node, "chord").is_some();

                if !voices.contains_key(&voice_id) {
                    voice_order.push(voice_id.clone());
                }
                let voice = voices.entry(voice_id.clone()).or_insert_with(|| VoiceBuilder {
                    staff,
                    events: Vec::new(),
                });

                if child(&node, "rest").is_some() {
                    let hidden = node.attribute("print-object") == Some("no");
                    voice.events.push(Event::new(
                        cursor,
                        duration,
                        EventKind::Rest(Rest { hidden }),
                    ));
                    cursor += duration;
                } else {
                    let note = parse_note(&node)?;
                    let joined = is_chord_tone && last_voice.as_deref() == Some(voice_id.as_str());
                    let leftover = match voice.events.last_mut() {
                        Some(previous) if joined => add_chord_tone(previous, note),
                        _ => Some(note),
                    };
                    if let Some(note) = leftover {
                        voice.events.push(Event::new(cursor, duration, EventKind::Note(note)));
                        cursor += duration;
                    }
                }
                last_voice = Some(voice_id);
            }
            _ => {}
        }
    }

    let mut ordered: Vec<(String, VoiceBuilder)> = voice_order
        .into_iter()
        .filter_map(|id| voices.remove(&id).map(|v| (id, v)))
        .collect();

    // chord symbols belong with the first voice
    if ordered.is_empty() && !harmonies.is_empty() {
        ordered.push((
            "1".to_string(),
            VoiceBuilder {
                staff: 1,
                events: Vec::new(),
            },
        ));
    }
    if let Some((_, first)) = ordered.first_mut() {
        for harmony in harmonies {
            let at = first
                .events
                .iter()
                .position(|e| e.offset > harmony.offset || (e.offset == harmony.offset && !e.is_harmony()))
                .unwrap_or(first.events.len());
            first.events.insert(at, harmony);
        }
    }

    if ordered.len() == 1 && state.staves <= 1 {
        if let Some((_, only)) = ordered.pop() {
            measure.events = only.events;
        }
    } else {
        measure.voices = ordered
            .into_iter()
            .map(|(id, builder)| Voice {
                id,
                staff: builder.staff,
                events: builder.events,
            })
            .collect();
    }
    Ok(measure)
}

/// Merge a `<chord/>` note into the event before it; hands the note back if that
/// event is not pitched
fn add_chord_tone(event: &mut Event, note: Note) -> Option<Note> {
    match &mut event.kind {
        EventKind::Chord(notes) => {
            notes.push(note);
            None
        }
        EventKind::Note(first) => {
            let first = first.clone();
            event.kind = EventKind::Chord(vec![first, note]);
            None
        }
        _ => Some(note),
    }
}

fn parse_attributes(node: &Node, measure: &mut Measure, state: &mut PartState) -> ParseResult<()> {
    if let Some(divisions) = parse_number::<i32>(node, "divisions")? {
        if divisions <= 0 {
            return Err(malformed(format!("invalid <divisions> value '{}'", divisions)));
        }
        state.divisions = divisions;
    }
    if let Some(staves) = parse_number::<u8>(node, "staves")? {
        state.staves = staves.max(1);
    }
    if let Some(key) = child(node, "key") {
        if let Some(fifths) = parse_number::<i8>(&key, "fifths")? {
            let key = KeySignature::new(fifths)
                .map_err(|_| malformed(format!("key signature with {} fifths", fifths)))?;
            measure.key_signature = Some(key);
        }
    }
    if let Some(time) = child(node, "time") {
        let beats = child_text(&time, "beats").and_then(|t| t.parse::<u8>().ok());
        let beat_type = child_text(&time, "beat-type").and_then(|t| t.parse::<u8>().ok());
        match (beats, beat_type) {
            (Some(beats), Some(beat_type)) => {
                measure.time_signature = Some(TimeSignature::new(beats, beat_type))
            }
            _ => log::warn!("Skipping unsupported time signature"),
        }
    }

    let mut clefs: Vec<(u8, Clef)> = Vec::new();
    for clef_node in node.children().filter(|n| n.tag_name().name() == "clef") {
        let staff: u8 = clef_node
            .attribute("number")
            .and_then(|n| n.parse().ok())
            .unwrap_or(1);
        let sign = child_text(&clef_node, "sign").unwrap_or("G");
        let line = child_text(&clef_node, "line").and_then(|t| t.parse().ok());
        let octave_change = child_text(&clef_node, "clef-octave-change")
            .and_then(|t| t.parse().ok())
            .unwrap_or(0);
        match Clef::from_musicxml(sign, line, octave_change) {
            Some(clef) => clefs.push((staff, clef)),
            None => log::warn!("Skipping unsupported clef sign '{}'", sign),
        }
    }
    if !clefs.is_empty() {
        clefs.sort_by_key(|(staff, _)| *staff);
        measure.clefs = clefs.into_iter().map(|(_, clef)| clef).collect();
    }
    Ok(())
}

fn parse_step(text: &str, element: &str) -> ParseResult<Step> {
    text.chars()
        .next()
        .filter(|_| text.len() == 1)
        .and_then(Step::from_char)
        .ok_or_else(|| malformed(format!("invalid <{}> value '{}'", element, text)))
}

/// MusicXML allows fractional alters (microtones); only whole semitones are kept.
/// Anything beyond a double sharp or flat is rejected.
fn parse_alter(node: &Node, name: &str) -> ParseResult<i8> {
    let Some(text) = child_text(node, name) else {
        return Ok(0);
    };
    let invalid = || malformed(format!("invalid <{}> value '{}'", name, text));
    let alter = text.parse::<f32>().map_err(|_| invalid())?.round();
    if !(-2.0..=2.0).contains(&alter) {
        return Err(invalid());
    }
    Ok(alter as i8)
}

fn parse_note(node: &Node) -> ParseResult<Note> {
    let pitch_node = child(node, "pitch").ok_or_else(|| malformed("<note> without <pitch>"))?;
    let step = parse_step(child_text(&pitch_node, "step").unwrap_or(""), "step")?;
    let alter = parse_alter(&pitch_node, "alter")?;
    let octave = parse_number::<i8>(&pitch_node, "octave")?
        .ok_or_else(|| malformed("<pitch> without <octave>"))?;

    let stem = match child_text(node, "stem") {
        Some("up") => Some(StemDirection::Up),
        Some("down") => Some(StemDirection::Down),
        _ => None,
    };

    let show_accidental = child(node, "accidental").map(|_| true);

    let tie_types: Vec<&str> = node
        .children()
        .filter(|n| n.tag_name().name() == "tie")
        .filter_map(|n| n.attribute("type"))
        .collect();
    let tie = match (tie_types.contains(&"start"), tie_types.contains(&"stop")) {
        (true, true) => Some(Tie::Continue),
        (true, false) => Some(Tie::Start),
        (false, true) => Some(Tie::Stop),
        (false, false) => None,
    };

    Ok(Note {
        pitch: Pitch::new(step, alter, octave),
        stem,
        show_accidental,
        tie,
    })
}

fn parse_pitch_name(node: &Node, step_name: &str, alter_name: &str) -> ParseResult<PitchName> {
    let step = parse_step(child_text(node, step_name).unwrap_or(""), step_name)?;
    Ok(PitchName::new(step, parse_alter(node, alter_name)?))
}

fn parse_harmony(node: &Node) -> ParseResult<Harmony> {
    let kind_text = child_text(node, "kind").unwrap_or("major");
    if kind_text == "none" {
        return Ok(Harmony::NoChord);
    }
    let root_node = child(node, "root").ok_or_else(|| malformed("<harmony> without <root>"))?;
    let root = parse_pitch_name(&root_node, "root-step", "root-alter")?;
    let kind = ChordKind::from_musicxml_kind(kind_text).unwrap_or_else(|| {
        log::warn!("Unsupported chord kind '{}', reading it as major", kind_text);
        ChordKind::Major
    });
    let mut symbol = ChordSymbol::new(root, kind);
    if let Some(bass_node) = child(node, "bass") {
        symbol = symbol.with_bass(parse_pitch_name(&bass_node, "bass-step", "bass-alter")?);
    }
    Ok(Harmony::Chord(symbol))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(n: i32) -> Rational {
        Rational::from_integer(n)
    }

    const LEAD_SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE score-partwise PUBLIC "-//Recordare//DTD MusicXML 3.1 Partwise//EN" "http://www.musicxml.org/dtds/partwise.dtd">
<score-partwise version="3.1">
  <work><work-title>Test Song</work-title></work>
  <part-list>
    <score-part id="P1"><part-name>Melody</part-name></score-part>
  </part-list>
  <part id="P1">
    <measure number="1">
      <attributes>
        <divisions>2</divisions>
        <key><fifths>-1</fifths></key>
        <time><beats>4</beats><beat-type>4</beat-type></time>
        <clef><sign>G</sign><line>2</line></clef>
      </attributes>
      <harmony><root><root-step>F</root-step></root><kind>major</kind></harmony>
      <note><pitch><step>A</step><octave>4</octave></pitch><duration>4</duration><voice>1</voice><type>half</type></note>
      <harmony><root><root-step>B</root-step><root-alter>-1</root-alter></root><kind>dominant</kind></harmony>
      <note><pitch><step>B</step><alter>-1</alter><octave>4</octave></pitch><duration>2</duration><voice>1</voice><type>quarter</type><accidental>flat</accidental><stem>down</stem></note>
      <note print-object="no"><rest/><duration>2</duration><voice>1</voice></note>
    </measure>
    <measure number="2a">
      <harmony><root><root-step>C</root-step></root><kind>none</kind></harmony>
      <note><grace/><pitch><step>D</step><octave>5</octave></pitch><voice>1</voice></note>
      <note><pitch><step>C</step><octave>5</octave></pitch><duration>8</duration><tie type="start"/><voice>1</voice></note>
    </measure>
  </part>
</score-partwise>"#;

    #[test]
    fn test_parse_lead_sheet() {
        let score = parse_musicxml(LEAD_SHEET).unwrap();
        assert_eq!(score.title.as_deref(), Some("Test Song"));
        assert_eq!(score.parts.len(), 1);
        let part = &score.parts[0];
        assert_eq!(part.name, "Melody");

        let m1 = &part.measures[0];
        assert_eq!(m1.key_signature, KeySignature::new(-1).ok());
        assert_eq!(m1.time_signature, Some(TimeSignature::new(4, 4)));
        assert_eq!(m1.clefs, vec![Clef::Treble]);
        assert_eq!(m1.events.len(), 5);
        assert_eq!(m1.events[0].as_harmony().unwrap().figure(), "F");
        assert_eq!(m1.events[1].duration, q(2));
        assert_eq!(m1.events[2].offset, q(2));
        assert_eq!(m1.events[2].as_harmony().unwrap().figure(), "Bb7");

        let bb = m1.events[3].as_note().unwrap();
        assert_eq!(bb.pitch, Pitch::parse("Bb4").unwrap());
        assert_eq!(bb.show_accidental, Some(true));
        assert_eq!(bb.stem, Some(StemDirection::Down));
        assert_eq!(m1.events[4].kind, EventKind::Rest(Rest { hidden: true }));
    }

    #[test]
    fn test_measure_suffix_grace_and_no_chord() {
        let score = parse_musicxml(LEAD_SHEET).unwrap();
        let m2 = &score.parts[0].measures[1];
        assert_eq!(m2.number, 2);
        assert_eq!(m2.suffix.as_deref(), Some("a"));
        assert_eq!(m2.events.len(), 2);
        assert_eq!(m2.events[0].as_harmony(), Some(&Harmony::NoChord));
        let c5 = m2.events[1].as_note().unwrap();
        assert_eq!(c5.tie, Some(Tie::Start));
        // divisions carry over from measure 1
        assert_eq!(m2.events[1].duration, q(4));
    }

    #[test]
    fn test_chord_notes_and_backup_voices() {
        let xml = r#"<score-partwise version="3.1">
  <part-list><score-part id="P1"><part-name>Piano</part-name></score-part></part-list>
  <part id="P1">
    <measure number="1">
      <attributes><divisions>1</divisions></attributes>
      <note><pitch><step>C</step><octave>4</octave></pitch><duration>4</duration><voice>1</voice></note>
      <note><chord/><pitch><step>E</step><octave>4</octave></pitch><duration>4</duration><voice>1</voice></note>
      <backup><duration>4</duration></backup>
      <note><pitch><step>C</step><octave>3</octave></pitch><duration>4</duration><voice>2</voice></note>
    </measure>
  </part>
</score-partwise>"#;
        let score = parse_musicxml(xml).unwrap();
        let m = &score.parts[0].measures[0];
        assert_eq!(m.voice_count(), 2);
        assert!(matches!(&m.voices[0].events[0].kind, EventKind::Chord(notes) if notes.len() == 2));
        assert_eq!(m.voices[1].events[0].offset, q(0));
    }

    #[test]
    fn test_alter_limits() {
        let with_alter = |alter: &str| {
            format!(
                r#"<score-partwise version="3.1">
  <part-list><score-part id="P1"><part-name>Melody</part-name></score-part></part-list>
  <part id="P1"><measure number="1">
    <attributes><divisions>1</divisions></attributes>
    <note><pitch><step>C</step><alter>{}</alter><octave>4</octave></pitch><duration>4</duration></note>
  </measure></part>
</score-partwise>"#,
                alter
            )
        };
        let score = parse_musicxml(&with_alter("-1.5")).unwrap();
        let note = score.parts[0].measures[0].events[0].as_note().unwrap();
        assert_eq!(note.pitch, Pitch::parse("Cbb4").unwrap());
        for bad in ["-200", "3", "NaN"] {
            assert!(matches!(
                parse_musicxml(&with_alter(bad)),
                Err(CodecError::MalformedInput(_))
            ));
        }
    }

    #[test]
    fn test_rejects_non_musicxml() {
        assert!(matches!(
            parse_musicxml("<html></html>"),
            Err(CodecError::MalformedInput(_))
        ));
        assert!(matches!(
            parse_musicxml("not xml at all"),
            Err(CodecError::MalformedInput(_))
        ));
    }
}
