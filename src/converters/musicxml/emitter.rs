//! MusicXML writer
//!
//! String-buffer builder that serialises the score model as `score-partwise` 3.1.

use quick_xml::escape::escape;

use crate::models::{
    Event, EventKind, Harmony, Measure, Note, Part, Rational, Score, StemDirection, Tie,
};

/// Map a quarter-note duration to a MusicXML note type and dot count
pub fn duration_to_note_type(duration: Rational) -> Option<(&'static str, usize)> {
    // in 32nd-note units
    let scaled = duration * Rational::from_integer(8);
    if !scaled.is_integer() {
        return None;
    }
    match scaled.to_integer() {
        32 => Some(("whole", 0)),
        24 => Some(("half", 1)),
        16 => Some(("half", 0)),
        12 => Some(("quarter", 1)),
        8 => Some(("quarter", 0)),
        6 => Some(("eighth", 1)),
        4 => Some(("eighth", 0)),
        3 => Some(("16th", 1)),
        2 => Some(("16th", 0)),
        1 => Some(("32nd", 0)),
        48 => Some(("whole", 1)),
        _ => None,
    }
}

fn gcd(a: i32, b: i32) -> i32 {
    if b == 0 {
        a.abs()
    } else {
        gcd(b, a % b)
    }
}

fn lcm(a: i32, b: i32) -> i32 {
    if a == 0 || b == 0 {
        a.max(b)
    } else {
        (a / gcd(a, b) * b).abs()
    }
}

/// Smallest divisions-per-quarter that expresses every time value in the part
pub fn divisions_for(part: &Part) -> i32 {
    part.measures
        .iter()
        .flat_map(|m| m.all_events())
        .flat_map(|e| [*e.offset.denom(), *e.duration.denom()])
        .fold(1, lcm)
}

/// Serialise a score as MusicXML text
pub fn write_musicxml(score: &Score) -> String {
    let mut writer = MusicXmlWriter::new(score.title.clone());
    for part in &score.parts {
        writer.write_part(part);
    }
    writer.finalize()
}

pub struct MusicXmlWriter {
    title: Option<String>,
    part_list: String,
    buffer: String,
    divisions: i32,
}

impl MusicXmlWriter {
    pub fn new(title: Option<String>) -> Self {
        Self {
            title,
            part_list: String::new(),
            buffer: String::new(),
            divisions: 1,
        }
    }

    fn to_divisions(&self, value: Rational) -> i32 {
        (value * Rational::from_integer(self.divisions)).to_integer()
    }

    pub fn write_part(&mut self, part: &Part) {
        self.part_list.push_str(&format!(
            "    <score-part id=\"{}\">\n      <part-name>{}</part-name>\n    </score-part>\n",
            escape(&part.id),
            escape(&part.name)
        ));

        self.divisions = divisions_for(part);
        self.buffer
            .push_str(&format!("  <part id=\"{}\">\n", escape(&part.id)));
        for (index, measure) in part.measures.iter().enumerate() {
            self.write_measure(part, measure, index == 0);
        }
        self.buffer.push_str("  </part>\n");
    }

    fn write_measure(&mut self, part: &Part, measure: &Measure, first: bool) {
        self.buffer.push_str(&format!(
            "    <measure number=\"{}\">\n",
            escape(&measure.label())
        ));
        self.write_attributes(part, measure, first);

        let multi_staff = part.staves > 1;
        if measure.voices.is_empty() {
            self.write_events(&measure.events, 1, multi_staff.then_some(1));
        } else {
            let count = measure.voices.len();
            for (index, voice) in measure.voices.iter().enumerate() {
                let staff = multi_staff.then_some(voice.staff);
                let end = self.write_events(&voice.events, index + 1, staff);
                if index + 1 < count && end > 0 {
                    self.buffer.push_str(&format!(
                        "      <backup><duration>{}</duration></backup>\n",
                        end
                    ));
                }
            }
        }
        self.buffer.push_str("    </measure>\n");
    }

    fn write_attributes(&mut self, part: &Part, measure: &Measure, first: bool) {
        let has_changes = first
            || measure.key_signature.is_some()
            || measure.time_signature.is_some()
            || !measure.clefs.is_empty();
        if !has_changes {
            return;
        }
        self.buffer.push_str("      <attributes>\n");
        if first {
            self.buffer
                .push_str(&format!("        <divisions>{}</divisions>\n", self.divisions));
        }
        if let Some(key) = measure.key_signature {
            self.buffer.push_str(&format!(
                "        <key><fifths>{}</fifths></key>\n",
                key.sharps()
            ));
        }
        if let Some(time) = measure.time_signature {
            self.buffer.push_str(&format!(
                "        <time><beats>{}</beats><beat-type>{}</beat-type></time>\n",
                time.beats, time.beat_type
            ));
        }
        if first && part.staves > 1 {
            self.buffer
                .push_str(&format!("        <staves>{}</staves>\n", part.staves));
        }
        for (index, clef) in measure.clefs.iter().enumerate() {
            let (sign, line, octave_change) = clef.musicxml_parts();
            let number = if part.staves > 1 {
                format!(" number=\"{}\"", index + 1)
            } else {
                String::new()
            };
            self.buffer.push_str(&format!(
                "        <clef{}><sign>{}</sign><line>{}</line>",
                number, sign, line
            ));
            if octave_change != 0 {
                self.buffer.push_str(&format!(
                    "<clef-octave-change>{}</clef-octave-change>",
                    octave_change
                ));
            }
            self.buffer.push_str("</clef>\n");
        }
        self.buffer.push_str("      </attributes>\n");
    }

    /// Write one voice's events; returns the cursor position in divisions
    fn write_events(&mut self, events: &[Event], voice: usize, staff: Option<u8>) -> i32 {
        let mut cursor = 0;
        for event in events {
            let at = self.to_divisions(event.offset);
            match &event.kind {
                EventKind::Harmony(harmony) => self.write_harmony(harmony, at - cursor),
                kind => {
                    if at > cursor {
                        self.buffer.push_str(&format!(
                            "      <forward><duration>{}</duration></forward>\n",
                            at - cursor
                        ));
                        cursor = at;
                    }
                    let duration = self.to_divisions(event.duration);
                    match kind {
                        EventKind::Note(note) => {
                            self.write_note(note, event.duration, voice, staff, false)
                        }
                        EventKind::Chord(notes) => {
                            for (i, note) in notes.iter().enumerate() {
                                self.write_note(note, event.duration, voice, staff, i > 0);
                            }
                        }
                        EventKind::Rest(rest) => {
                            self.write_rest(event.duration, rest.hidden, voice, staff)
                        }
                        EventKind::Harmony(_) => {}
                    }
                    cursor += duration;
                }
            }
        }
        cursor
    }

    fn write_duration_and_type(&mut self, duration: Rational, voice: usize) {
        self.buffer.push_str(&format!(
            "        <duration>{}</duration>\n        <voice>{}</voice>\n",
            self.to_divisions(duration),
            voice
        ));
        if let Some((note_type, dots)) = duration_to_note_type(duration) {
            self.buffer
                .push_str(&format!("        <type>{}</type>\n", note_type));
            for _ in 0..dots {
                self.buffer.push_str("        <dot/>\n");
            }
        }
    }

    fn write_note(
        &mut self,
        note: &Note,
        duration: Rational,
        voice: usize,
        staff: Option<u8>,
        chord_tone: bool,
    ) {
        self.buffer.push_str("      <note>\n");
        if chord_tone {
            self.buffer.push_str("        <chord/>\n");
        }
        let pitch = &note.pitch;
        self.buffer.push_str("        <pitch>\n");
        self.buffer
            .push_str(&format!("          <step>{}</step>\n", pitch.step.as_str()));
        if pitch.alter != 0 {
            self.buffer
                .push_str(&format!("          <alter>{}</alter>\n", pitch.alter));
        }
        self.buffer
            .push_str(&format!("          <octave>{}</octave>\n", pitch.octave));
        self.buffer.push_str("        </pitch>\n");

        let tie_types: &[&str] = match note.tie {
            Some(Tie::Start) => &["start"],
            Some(Tie::Stop) => &["stop"],
            Some(Tie::Continue) => &["stop", "start"],
            None => &[],
        };
        self.buffer.push_str(&format!(
            "        <duration>{}</duration>\n",
            self.to_divisions(duration)
        ));
        for tie in tie_types {
            self.buffer
                .push_str(&format!("        <tie type=\"{}\"/>\n", tie));
        }
        self.buffer
            .push_str(&format!("        <voice>{}</voice>\n", voice));
        if let Some((note_type, dots)) = duration_to_note_type(duration) {
            self.buffer
                .push_str(&format!("        <type>{}</type>\n", note_type));
            for _ in 0..dots {
                self.buffer.push_str("        <dot/>\n");
            }
        }
        if note.show_accidental == Some(true) {
            self.buffer.push_str(&format!(
                "        <accidental>{}</accidental>\n",
                accidental_name(pitch.alter)
            ));
        }
        if let Some(stem) = note.stem {
            let direction = match stem {
                StemDirection::Up => "up",
                StemDirection::Down => "down",
            };
            self.buffer
                .push_str(&format!("        <stem>{}</stem>\n", direction));
        }
        if let Some(staff) = staff {
            self.buffer
                .push_str(&format!("        <staff>{}</staff>\n", staff));
        }
        if !tie_types.is_empty() {
            self.buffer.push_str("        <notations>\n");
            for tie in tie_types {
                self.buffer
                    .push_str(&format!("          <tied type=\"{}\"/>\n", tie));
            }
            self.buffer.push_str("        </notations>\n");
        }
        self.buffer.push_str("      </note>\n");
    }

    fn write_rest(&mut self, duration: Rational, hidden: bool, voice: usize, staff: Option<u8>) {
        if hidden {
            self.buffer.push_str("      <note print-object=\"no\">\n");
        } else {
            self.buffer.push_str("      <note>\n");
        }
        self.buffer.push_str("        <rest/>\n");
        self.write_duration_and_type(duration, voice);
        if let Some(staff) = staff {
            self.buffer
                .push_str(&format!("        <staff>{}</staff>\n", staff));
        }
        self.buffer.push_str("      </note>\n");
    }

    fn write_harmony(&mut self, harmony: &Harmony, offset: i32) {
        self.buffer.push_str("      <harmony>\n");
        match harmony {
            Harmony::NoChord => {
                self.buffer.push_str(
                    "        <root><root-step>C</root-step></root>\n        <kind text=\"N.C.\">none</kind>\n",
                );
            }
            Harmony::Chord(chord) => {
                self.buffer.push_str(&format!(
                    "        <root><root-step>{}</root-step>",
                    chord.root.step.as_str()
                ));
                if chord.root.alter != 0 {
                    self.buffer
                        .push_str(&format!("<root-alter>{}</root-alter>", chord.root.alter));
                }
                self.buffer.push_str("</root>\n");
                self.buffer.push_str(&format!(
                    "        <kind text=\"{}\">{}</kind>\n",
                    escape(chord.kind.suffix()),
                    chord.kind.musicxml_kind()
                ));
                if let Some(bass) = &chord.bass {
                    self.buffer.push_str(&format!(
                        "        <bass><bass-step>{}</bass-step>",
                        bass.step.as_str()
                    ));
                    if bass.alter != 0 {
                        self.buffer
                            .push_str(&format!("<bass-alter>{}</bass-alter>", bass.alter));
                    }
                    self.buffer.push_str("</bass>\n");
                }
            }
        }
        if offset != 0 {
            self.buffer
                .push_str(&format!("        <offset>{}</offset>\n", offset));
        }
        self.buffer.push_str("      </harmony>\n");
    }

    /// Finalize and return the complete MusicXML document
    pub fn finalize(self) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str("<!DOCTYPE score-partwise PUBLIC \"-//Recordare//DTD MusicXML 3.1 Partwise//EN\" \"http://www.musicxml.org/dtds/partwise.dtd\">\n");
        xml.push_str("<score-partwise version=\"3.1\">\n");

        if let Some(title) = self.title.as_deref().filter(|t| !t.is_empty()) {
            xml.push_str("  <work>\n    <work-title>");
            xml.push_str(&escape(title));
            xml.push_str("</work-title>\n  </work>\n");
        }

        xml.push_str("  <part-list>\n");
        xml.push_str(&self.part_list);
        xml.push_str("  </part-list>\n");
        xml.push_str(&self.buffer);
        xml.push_str("</score-partwise>\n");
        xml
    }
}

fn accidental_name(alter: i8) -> &'static str {
    match alter {
        -2 => "flat-flat",
        -1 => "flat",
        1 => "sharp",
        2 => "double-sharp",
        _ => "natural",
    }
}
