use super::foot::Foot;
use super::overrides::BeatOverrides;
use super::rows::Row;
use crate::chart::{NoteEvent, clear_parities};

/// Write the chosen feet back onto the notes.
///
/// `parities` has one column array per row; notes outside every row, or on a
/// column left at `Foot::None`, end up without a label.
pub fn set_note_parity(
    notes: &mut [NoteEvent],
    rows: &[Row],
    parities: &[Vec<Foot>],
    overrides: Option<&BeatOverrides>,
) {
    clear_parities(notes);
    for (row, feet) in rows.iter().zip(parities) {
        let overridden = overrides.is_some_and(|o| o.has_beat_override(row.beat));
        for (&note, &foot) in row.notes.iter().zip(feet) {
            let Some(note) = note.and_then(|idx| notes.get_mut(idx)) else {
                continue;
            };
            note.parity = foot.label();
            note.parity_override = overridden;
        }
    }
}
