//! Lead sheet recognition
//!
//! A lead sheet is a single-staff, single-voice melody (the first part) plus chord symbols
//! in the first part that has any. Nothing here repairs a score; it only refuses it.

use crate::error::{EngineError, EngineResult};
use crate::models::{Part, Score};

#[derive(Debug, Clone, Copy)]
pub struct LeadSheet<'a> {
    pub melody: &'a Part,
    pub chords: &'a Part,
}

pub fn recognize(score: &Score) -> EngineResult<LeadSheet<'_>> {
    let melody = score
        .parts
        .first()
        .ok_or_else(|| EngineError::InvalidLeadSheet("the score has no parts".to_string()))?;

    if melody.is_multi_staff() {
        return Err(EngineError::InvalidLeadSheet(format!(
            "melody part '{}' has {} staves",
            melody.name, melody.staves
        )));
    }

    if let Some(measure) = melody.measures.iter().find(|m| m.voice_count() > 1) {
        return Err(EngineError::InvalidLeadSheet(format!(
            "melody measure {} has {} voices",
            measure.label(),
            measure.voice_count()
        )));
    }

    let chords = score
        .parts
        .iter()
        .find(|part| part.has_harmony())
        .ok_or_else(|| EngineError::InvalidLeadSheet("no chord symbols found".to_string()))?;

    log::debug!(
        "Lead sheet: melody '{}' ({} measures), chords from '{}'",
        melody.name,
        melody.measures.len(),
        chords.name
    );
    Ok(LeadSheet { melody, chords })
}
