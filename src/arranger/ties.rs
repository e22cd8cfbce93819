//! Ties in the harmony voices
//!
//! When the lead ties two notes and a harmony voice holds the same pitch under both, that
//! voice gets the lead's tie too, so it sustains instead of re-attacking.

use crate::models::{Event, EventKind, Part, Tie, VoicePart};

/// (measure index, event index) of a sounding event in one voice
type Slot = (usize, usize);

const HARMONY_PARTS: [VoicePart; 3] = [VoicePart::Tenor, VoicePart::Bari, VoicePart::Bass];

fn part_index(part: VoicePart) -> usize {
    usize::from(part.staff()).saturating_sub(1)
}

fn sounding_slots(parts: &[Part], part: VoicePart) -> Vec<Slot> {
    let Some(staff) = parts.get(part_index(part)) else {
        return Vec::new();
    };
    let mut slots = Vec::new();
    for (m, measure) in staff.measures.iter().enumerate() {
        if let Some(voice) = measure.voice(part.voice_id()) {
            slots.extend(
                voice
                    .events
                    .iter()
                    .enumerate()
                    .filter(|(_, event)| !event.is_harmony())
                    .map(|(e, _)| (m, e)),
            );
        }
    }
    slots
}

fn event_at(parts: &[Part], part: VoicePart, (m, e): Slot) -> Option<&Event> {
    parts
        .get(part_index(part))?
        .measures
        .get(m)?
        .voice(part.voice_id())?
        .events
        .get(e)
}

fn event_at_mut(parts: &mut [Part], part: VoicePart, (m, e): Slot) -> Option<&mut Event> {
    parts
        .get_mut(part_index(part))?
        .measures
        .get_mut(m)?
        .voice_mut(part.voice_id())?
        .events
        .get_mut(e)
}

/// Same slot position and same place in the bar
fn aligned(slot: Slot, event: &Event, lead_slot: Slot, lead: &Event) -> bool {
    slot.0 == lead_slot.0 && event.offset == lead.offset
}

/// Ties each harmony voice would need, in score order
fn planned_ties(parts: &[Part]) -> Vec<(VoicePart, Slot, Tie)> {
    let lead_slots = sounding_slots(parts, VoicePart::Lead);
    let mut planned = Vec::new();

    for part in HARMONY_PARTS {
        let slots = sounding_slots(parts, part);
        for (i, pair) in lead_slots.windows(2).enumerate() {
            let (Some(lead_now), Some(lead_next)) = (
                event_at(parts, VoicePart::Lead, pair[0]),
                event_at(parts, VoicePart::Lead, pair[1]),
            ) else {
                continue;
            };
            let (Some(now), Some(next)) = (lead_now.as_note(), lead_next.as_note()) else {
                continue;
            };
            let tie = match now.tie {
                Some(tie @ (Tie::Start | Tie::Continue)) => tie,
                _ => continue,
            };
            if !now.pitch.is_enharmonic(&next.pitch) {
                continue;
            }

            let (Some(&slot), Some(&next_slot)) = (slots.get(i), slots.get(i + 1)) else {
                continue;
            };
            let (Some(held), Some(held_next)) =
                (event_at(parts, part, slot), event_at(parts, part, next_slot))
            else {
                continue;
            };
            if !aligned(slot, held, pair[0], lead_now)
                || !aligned(next_slot, held_next, pair[1], lead_next)
            {
                continue;
            }
            let same_pitch = match (held.as_note(), held_next.as_note()) {
                (Some(a), Some(b)) => a.pitch.is_enharmonic(&b.pitch),
                _ => false,
            };
            if !same_pitch {
                continue;
            }

            planned.push((part, slot, tie));
            if let Some(next_tie) = next.tie {
                planned.push((part, next_slot, next_tie));
            }
        }
    }
    planned
}

/// Copy lead ties into the harmony voices wherever they hold their pitch across the tie
pub fn carry_lead_ties(parts: &mut [Part]) {
    let planned = planned_ties(parts);
    if !planned.is_empty() {
        log::debug!("Carrying {} tie(s) into the harmony voices", planned.len());
    }
    for (part, slot, tie) in planned {
        if let Some(EventKind::Note(note)) = event_at_mut(parts, part, slot).map(|e| &mut e.kind) {
            note.tie = Some(tie);
        }
    }
}
