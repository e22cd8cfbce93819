//! Pitch and interval representation
//!
//! A `Pitch` is a spelled pitch (letter step, alteration, octave). Absolute semitone
//! arithmetic and enharmonic equality live here; choosing *which* spelling to use after a
//! chromatic move is the caller's decision (see `Spelling` and `Interval`).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Diatonic letter step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Step {
    pub const ALL: [Step; 7] = [Step::C, Step::D, Step::E, Step::F, Step::G, Step::A, Step::B];

    /// Position in the diatonic scale (C = 0 ... B = 6)
    pub fn index(self) -> i32 {
        match self {
            Step::C => 0,
            Step::D => 1,
            Step::E => 2,
            Step::F => 3,
            Step::G => 4,
            Step::A => 5,
            Step::B => 6,
        }
    }

    /// Semitones above C of the natural step
    pub fn semitones(self) -> i32 {
        match self {
            Step::C => 0,
            Step::D => 2,
            Step::E => 4,
            Step::F => 5,
            Step::G => 7,
            Step::A => 9,
            Step::B => 11,
        }
    }

    pub fn from_index(index: i32) -> Step {
        Step::ALL[index.rem_euclid(7) as usize]
    }

    pub fn from_char(c: char) -> Option<Step> {
        match c.to_ascii_uppercase() {
            'C' => Some(Step::C),
            'D' => Some(Step::D),
            'E' => Some(Step::E),
            'F' => Some(Step::F),
            'G' => Some(Step::G),
            'A' => Some(Step::A),
            'B' => Some(Step::B),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Step::C => "C",
            Step::D => "D",
            Step::E => "E",
            Step::F => "F",
            Step::G => "G",
            Step::A => "A",
            Step::B => "B",
        }
    }
}

/// Accidental preference when a pitch is built from a bare semitone value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Spelling {
    /// C C# D Eb E F F# G G# A Bb B
    #[default]
    Default,
    Sharps,
    Flats,
}

fn spell_pitch_class(pc: i32, spelling: Spelling) -> (Step, i8) {
    let pc = pc.rem_euclid(12);
    match (pc, spelling) {
        (0, _) => (Step::C, 0),
        (1, Spelling::Flats) => (Step::D, -1),
        (1, _) => (Step::C, 1),
        (2, _) => (Step::D, 0),
        (3, Spelling::Sharps) => (Step::D, 1),
        (3, _) => (Step::E, -1),
        (4, _) => (Step::E, 0),
        (5, _) => (Step::F, 0),
        (6, Spelling::Flats) => (Step::G, -1),
        (6, _) => (Step::F, 1),
        (7, _) => (Step::G, 0),
        (8, Spelling::Flats) => (Step::A, -1),
        (8, _) => (Step::G, 1),
        (9, _) => (Step::A, 0),
        (10, Spelling::Sharps) => (Step::A, 1),
        (10, _) => (Step::B, -1),
        _ => (Step::B, 0),
    }
}

fn accidental_text(alter: i8) -> String {
    match alter {
        0 => String::new(),
        a if a > 0 => "#".repeat(a.unsigned_abs() as usize),
        a => "b".repeat(a.unsigned_abs() as usize),
    }
}

/// Parse "C", "C#", "Bb", "B-", "F##", "Ebb" into (step, alter, rest)
fn parse_name_prefix(s: &str) -> Option<(Step, i8, &str)> {
    let mut chars = s.char_indices();
    let (_, first) = chars.next()?;
    let step = Step::from_char(first)?;
    let mut alter: i8 = 0;
    let mut end = first.len_utf8();
    for (i, c) in chars {
        match c {
            '#' | '♯' => alter += 1,
            'b' | '-' | '♭' => alter -= 1,
            _ => return Some((step, alter, &s[i..])),
        }
        end = i + c.len_utf8();
    }
    Some((step, alter, &s[end..]))
}

/// Spelled pitch without an octave (a key tonic, a chord tone)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PitchName {
    pub step: Step,
    pub alter: i8,
}

impl PitchName {
    pub fn new(step: Step, alter: i8) -> Self {
        Self { step, alter }
    }

    /// Pitch class 0..12 (C = 0)
    pub fn pitch_class(&self) -> i32 {
        (self.step.semitones() + self.alter as i32).rem_euclid(12)
    }

    pub fn is_enharmonic(&self, other: &PitchName) -> bool {
        self.pitch_class() == other.pitch_class()
    }

    pub fn from_pitch_class(pc: i32, spelling: Spelling) -> Self {
        let (step, alter) = spell_pitch_class(pc, spelling);
        Self { step, alter }
    }

    /// Place this name in an octave.
    ///
    /// The octave is the *written* octave, so `B#` at octave 3 sounds like C4.
    pub fn at_octave(&self, octave: i8) -> Pitch {
        Pitch::new(self.step, self.alter, octave)
    }

    /// Other spellings of the same pitch class, at most a double accidental,
    /// single accidentals first.
    pub fn enharmonics(&self) -> Vec<PitchName> {
        let pc = self.pitch_class();
        let mut out: Vec<PitchName> = Step::ALL
            .iter()
            .filter(|step| **step != self.step)
            .filter_map(|step| {
                let mut diff = pc - step.semitones();
                if diff > 6 {
                    diff -= 12;
                } else if diff < -6 {
                    diff += 12;
                }
                if diff.abs() <= 2 {
                    Some(PitchName::new(*step, diff as i8))
                } else {
                    None
                }
            })
            .collect();
        out.sort_by_key(|name| name.alter.abs());
        out
    }

    pub fn parse(s: &str) -> Option<Self> {
        let (step, alter, rest) = parse_name_prefix(s.trim())?;
        if !rest.is_empty() {
            return None;
        }
        Some(Self { step, alter })
    }
}

impl fmt::Display for PitchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.step.as_str(), accidental_text(self.alter))
    }
}

/// Spelled pitch with octave (scientific pitch notation, C4 = middle C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pitch {
    pub step: Step,
    /// Semitone offset from the natural step (-1 = flat, +1 = sharp)
    pub alter: i8,
    pub octave: i8,
}

impl Pitch {
    pub fn new(step: Step, alter: i8, octave: i8) -> Self {
        Self { step, alter, octave }
    }

    pub fn name(&self) -> PitchName {
        PitchName::new(self.step, self.alter)
    }

    /// Absolute semitone value (MIDI numbering, C4 = 60)
    pub fn ps(&self) -> i32 {
        (self.octave as i32 + 1) * 12 + self.step.semitones() + self.alter as i32
    }

    pub fn pitch_class(&self) -> i32 {
        self.ps().rem_euclid(12)
    }

    /// Total order by sounding pitch; enharmonic spellings compare equal
    pub fn compare_absolute(&self, other: &Pitch) -> Ordering {
        self.ps().cmp(&other.ps())
    }

    pub fn is_enharmonic(&self, other: &Pitch) -> bool {
        self.ps() == other.ps()
    }

    pub fn is_below(&self, other: &Pitch) -> bool {
        self.compare_absolute(other) == Ordering::Less
    }

    pub fn is_above(&self, other: &Pitch) -> bool {
        self.compare_absolute(other) == Ordering::Greater
    }

    pub fn from_ps(ps: i32, spelling: Spelling) -> Pitch {
        let (step, alter) = spell_pitch_class(ps, spelling);
        let octave = ps.div_euclid(12) - 1;
        Pitch::new(step, alter, octave as i8)
    }

    /// The pitch `n` semitones away, spelled according to `spelling`
    pub fn transpose_by_semitones(&self, n: i32, spelling: Spelling) -> Pitch {
        Pitch::from_ps(self.ps() + n, spelling)
    }

    /// Same spelling, octaves moved
    pub fn shifted_octaves(&self, octaves: i8) -> Pitch {
        Pitch::new(self.step, self.alter, self.octave + octaves)
    }

    pub fn parse(s: &str) -> Option<Self> {
        let (step, alter, rest) = parse_name_prefix(s.trim())?;
        let octave: i8 = rest.parse().ok()?;
        Some(Self { step, alter, octave })
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name(), self.octave)
    }
}

/// Directed interval: chromatic size plus diatonic step count (the spelling)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub semitones: i32,
    pub steps: i32,
}

impl Interval {
    pub fn new(semitones: i32, steps: i32) -> Self {
        Self { semitones, steps }
    }

    pub fn unison() -> Self {
        Self::new(0, 0)
    }

    pub fn between(from: &Pitch, to: &Pitch) -> Self {
        let from_steps = from.octave as i32 * 7 + from.step.index();
        let to_steps = to.octave as i32 * 7 + to.step.index();
        Self {
            semitones: to.ps() - from.ps(),
            steps: to_steps - from_steps,
        }
    }

    pub fn inverse(&self) -> Self {
        Self::new(-self.semitones, -self.steps)
    }

    /// `pitch` moved by this interval, or `None` when the result has no `Pitch` form
    pub fn checked_transpose_pitch(&self, pitch: &Pitch) -> Option<Pitch> {
        let abs_steps = (pitch.octave as i32 * 7 + pitch.step.index()).checked_add(self.steps)?;
        let octave = abs_steps.div_euclid(7);
        let step = Step::from_index(abs_steps);
        let natural_ps = octave
            .checked_add(1)?
            .checked_mul(12)?
            .checked_add(step.semitones())?;
        let alter = pitch
            .ps()
            .checked_add(self.semitones)?
            .checked_sub(natural_ps)?;
        Some(Pitch::new(
            step,
            i8::try_from(alter).ok()?,
            i8::try_from(octave).ok()?,
        ))
    }

    /// Out-of-range results leave the pitch as it was
    pub fn transpose_pitch(&self, pitch: &Pitch) -> Pitch {
        self.checked_transpose_pitch(pitch).unwrap_or(*pitch)
    }

    pub fn transpose_name(&self, name: &PitchName) -> PitchName {
        self.transpose_pitch(&name.at_octave(4)).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Pitch {
        Pitch::parse(s).unwrap()
    }

    #[test]
    fn test_checked_transpose_rejects_unrepresentable() {
        let far = Interval::new(2000, 1166);
        assert_eq!(far.checked_transpose_pitch(&p("C4")), None);
        assert_eq!(far.transpose_pitch(&p("C4")), p("C4"));
        let huge = Interval::new(i32::MAX, 7);
        assert_eq!(huge.checked_transpose_pitch(&p("C4")), None);
        assert_eq!(
            Interval::new(12, 7).checked_transpose_pitch(&p("C4")),
            Some(p("C5"))
        );
    }

    #[test]
    fn test_ps_middle_c() {
        assert_eq!(p("C4").ps(), 60);
        assert_eq!(p("A4").ps(), 69);
        assert_eq!(p("B#3").ps(), 60);
        assert_eq!(p("Cb4").ps(), 59);
    }

    #[test]
    fn test_parse_flat_forms() {
        assert_eq!(p("Bb3"), p("B-3"));
        assert_eq!(PitchName::parse("Ebb").unwrap().alter, -2);
        assert_eq!(PitchName::parse("F##").unwrap().alter, 2);
        assert!(Pitch::parse("H4").is_none());
        assert!(PitchName::parse("C4").is_none());
    }

    #[test]
    fn test_enharmonic_equality_and_order() {
        assert!(p("C#4").is_enharmonic(&p("Db4")));
        assert_ne!(p("C#4"), p("Db4"));
        assert_eq!(p("C#4").compare_absolute(&p("Db4")), Ordering::Equal);
        assert_eq!(p("B3").compare_absolute(&p("C4")), Ordering::Less);
        assert!(!p("E4").is_above(&p("Fb4")));
    }

    #[test]
    fn test_transpose_by_semitones_uses_caller_spelling() {
        assert_eq!(p("C4").transpose_by_semitones(1, Spelling::Sharps), p("C#4"));
        assert_eq!(p("C4").transpose_by_semitones(1, Spelling::Flats), p("Db4"));
        assert_eq!(p("C4").transpose_by_semitones(-1, Spelling::Default), p("B3"));
        assert_eq!(p("C4").transpose_by_semitones(15, Spelling::Default), p("Eb5"));
    }

    #[test]
    fn test_interval_keeps_spelling() {
        // major third up from C
        let third = Interval::between(&p("C4"), &p("E4"));
        assert_eq!(third, Interval::new(4, 2));
        assert_eq!(third.transpose_pitch(&p("Ab3")), p("C4"));
        assert_eq!(third.transpose_pitch(&p("B4")), p("D#5"));

        // minor second up gives the flat spelling, not the sharp
        let m2 = Interval::between(&p("C4"), &p("Db4"));
        assert_eq!(m2.transpose_pitch(&p("F#4")), p("G4"));
        assert_eq!(m2.transpose_pitch(&p("B3")), p("C4"));
    }

    #[test]
    fn test_interval_inverse_round_trip() {
        let interval = Interval::between(&p("Eb4"), &p("G3"));
        for s in ["C4", "F#2", "Bbb5", "E#3"] {
            let original = p(s);
            let there = interval.transpose_pitch(&original);
            assert_eq!(interval.inverse().transpose_pitch(&there), original);
        }
    }

    #[test]
    fn test_enharmonics_prefer_single_accidentals() {
        let g_sharp = PitchName::parse("G#").unwrap();
        let names: Vec<String> = g_sharp.enharmonics().iter().map(|n| n.to_string()).collect();
        assert_eq!(names.first().map(String::as_str), Some("Ab"));

        let b = PitchName::parse("B").unwrap();
        let names: Vec<String> = b.enharmonics().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["Cb", "A##"]);
    }

    #[test]
    fn test_display() {
        assert_eq!(p("F#3").to_string(), "F#3");
        assert_eq!(p("B-2").to_string(), "Bb2");
    }
}
