use crate::chart::NoteEvent;
use crate::constants::HOLD_TAIL_EPSILON;
use log::warn;
use std::collections::BTreeSet;
use std::mem;

/// A hold or roll that is still down
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldSpan {
    pub beat: f64,
    pub second: f64,
    pub length: f64,
}

impl HoldSpan {
    fn from_note(note: &NoteEvent) -> Self {
        Self {
            beat: note.beat,
            second: note.second,
            length: note.hold_length.unwrap_or(0.0),
        }
    }

    #[inline]
    pub fn end_beat(&self) -> f64 {
        self.beat + self.length
    }
}

/// All notes that share one timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Index into the note slice per column
    pub notes: Vec<Option<usize>>,
    /// Holds started on an earlier row and still held here
    pub holds: Vec<Option<HoldSpan>>,
    /// Columns whose hold releases on this row
    pub hold_tails: BTreeSet<usize>,
    /// Mine time per column
    pub mines: Vec<Option<f64>>,
    pub fake_mines: Vec<Option<f64>>,
    pub second: f64,
    pub beat: f64,
}

impl Row {
    /// Column has a note or a continuing hold
    #[inline]
    pub fn is_active(&self, column: usize) -> bool {
        self.notes[column].is_some() || self.holds[column].is_some()
    }

    /// Bit per active column; permutations depend on nothing else
    pub fn active_mask(&self) -> u32 {
        (0..self.notes.len())
            .filter(|&c| self.is_active(c))
            .fold(0, |mask, c| mask | (1 << c))
    }

    pub fn note_count(&self) -> usize {
        self.notes.iter().flatten().count()
    }

    /// Any real or fake mine attached to this row
    pub fn has_mines(&self) -> bool {
        self.mines.iter().chain(&self.fake_mines).any(Option::is_some)
    }
}

/// Group notes into rows.
///
/// `notes` must be sorted by time. Fake notes and out-of-range columns are
/// skipped; mines attach to the row after them.
pub fn build_rows(notes: &[NoteEvent], column_count: usize) -> Vec<Row> {
    let mut builder = RowBuilder::new(column_count);
    for (idx, note) in notes.iter().enumerate() {
        builder.push(idx, note);
    }
    builder.finish()
}

struct RowBuilder {
    column_count: usize,
    rows: Vec<Row>,
    // (second, beat) of the row being collected
    current: Option<(f64, f64)>,
    notes: Vec<Option<usize>>,
    active_holds: Vec<Option<HoldSpan>>,
    mines: Vec<Option<f64>>,
    fake_mines: Vec<Option<f64>>,
    next_mines: Vec<Option<f64>>,
    next_fake_mines: Vec<Option<f64>>,
}

impl RowBuilder {
    fn new(column_count: usize) -> Self {
        Self {
            column_count,
            rows: Vec::new(),
            current: None,
            notes: vec![None; column_count],
            active_holds: vec![None; column_count],
            mines: vec![None; column_count],
            fake_mines: vec![None; column_count],
            next_mines: vec![None; column_count],
            next_fake_mines: vec![None; column_count],
        }
    }

    fn empty(&self) -> Vec<Option<f64>> {
        vec![None; self.column_count]
    }

    fn push(&mut self, idx: usize, note: &NoteEvent) {
        if note.column >= self.column_count {
            warn!(
                "Skipping note at beat {:.3}: column {} is outside the {}-column layout",
                note.beat, note.column, self.column_count
            );
            return;
        }

        if note.is_mine() {
            // a mine sharing the row's timestamp lands in the bucket the row is flushed with
            let same_instant = !self.rows.is_empty()
                && self.current.is_some_and(|(second, _)| second == note.second);
            let bucket = match (same_instant, note.is_fake()) {
                (true, false) => &mut self.next_mines,
                (true, true) => &mut self.next_fake_mines,
                (false, false) => &mut self.mines,
                (false, true) => &mut self.fake_mines,
            };
            bucket[note.column] = Some(note.second);
            return;
        }

        if note.is_fake() {
            return;
        }

        if self.current.map(|(second, _)| second) != Some(note.second) {
            if let Some((second, beat)) = self.current {
                let row = self.flush(second, beat);
                self.rows.push(row);
            }
            self.current = Some((note.second, note.beat));
            self.notes = vec![None; self.column_count];

            let fresh = self.empty();
            self.next_mines = mem::replace(&mut self.mines, fresh);
            let fresh = self.empty();
            self.next_fake_mines = mem::replace(&mut self.fake_mines, fresh);

            for hold in self.active_holds.iter_mut() {
                if hold.is_some_and(|h| note.beat > h.end_beat()) {
                    *hold = None;
                }
            }
        }

        self.notes[note.column] = Some(idx);
        if note.is_hold() {
            self.active_holds[note.column] = Some(HoldSpan::from_note(note));
        }
    }

    fn flush(&mut self, second: f64, beat: f64) -> Row {
        let holds = self
            .active_holds
            .iter()
            .map(|hold| hold.filter(|h| h.second < second))
            .collect();
        let hold_tails = self
            .active_holds
            .iter()
            .enumerate()
            .filter(|(_, hold)| {
                hold.is_some_and(|h| (h.end_beat() - beat).abs() <= HOLD_TAIL_EPSILON)
            })
            .map(|(c, _)| c)
            .collect();
        let fresh = self.empty();
        let mines = mem::replace(&mut self.next_mines, fresh);
        let fresh = self.empty();
        let fake_mines = mem::replace(&mut self.next_fake_mines, fresh);

        Row {
            notes: mem::take(&mut self.notes),
            holds,
            hold_tails,
            mines,
            fake_mines,
            second,
            beat,
        }
    }

    fn finish(mut self) -> Vec<Row> {
        if let Some((second, beat)) = self.current {
            let row = self.flush(second, beat);
            self.rows.push(row);
        }
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert!(build_rows(&[], 4).is_empty());
    }

    #[test]
    fn test_builder_starts_with_empty_columns() {
        let builder = RowBuilder::new(8);
        assert_eq!(builder.notes, vec![None; 8]);
        assert!(builder.active_holds.iter().all(Option::is_none));
        assert_eq!(builder.mines.len(), 8);
        assert_eq!(builder.next_fake_mines.len(), 8);
        assert!(builder.finish().is_empty());
    }

    #[test]
    fn test_groups_by_second() {
        let notes = vec![
            NoteEvent::tap(0.0, 0.0, 0),
            NoteEvent::tap(0.0, 0.0, 3),
            NoteEvent::tap(1.0, 0.5, 1),
        ];
        let rows = build_rows(&notes, 4);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].notes, vec![Some(0), None, None, Some(1)]);
        assert_eq!(rows[0].note_count(), 2);
        assert_eq!(rows[0].active_mask(), 0b1001);
        assert_eq!(rows[1].notes, vec![None, Some(2), None, None]);
        assert_eq!(rows[1].second, 0.5);
        assert_eq!(rows[1].beat, 1.0);
    }

    #[test]
    fn test_skips_fakes_and_bad_columns() {
        let notes = vec![
            NoteEvent::tap(0.0, 0.0, 0).with_fake(true),
            NoteEvent::tap(0.0, 0.0, 9),
            NoteEvent::tap(1.0, 0.5, 2),
        ];
        let rows = build_rows(&notes, 4);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].notes, vec![None, None, Some(2), None]);
    }

    #[test]
    fn test_hold_continues_into_later_rows() {
        let notes = vec![
            NoteEvent::hold(0.0, 0.0, 0, 2.0),
            NoteEvent::tap(1.0, 0.5, 3),
            NoteEvent::tap(2.0, 1.0, 1),
            NoteEvent::tap(3.0, 1.5, 2),
        ];
        let rows = build_rows(&notes, 4);
        assert_eq!(rows.len(), 4);

        // not a continuing hold on its own row
        assert!(rows[0].holds[0].is_none());
        assert!(rows[1].holds[0].is_some());
        assert_eq!(rows[1].active_mask(), 0b1001);

        // released exactly on row 2
        assert!(rows[2].holds[0].is_some());
        assert!(rows[2].hold_tails.contains(&0));
        assert!(rows[3].holds[0].is_none());
        assert!(rows[3].hold_tails.is_empty());
    }

    #[test]
    fn test_mines_attach_to_next_row() {
        let notes = vec![
            NoteEvent::mine(0.0, 0.0, 1),
            NoteEvent::tap(1.0, 0.5, 0),
            NoteEvent::mine(1.5, 0.75, 2),
            NoteEvent::tap(2.0, 1.0, 3),
        ];
        let rows = build_rows(&notes, 4);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].mines, vec![None, Some(0.0), None, None]);
        assert!(rows[0].has_mines());
        assert_eq!(rows[1].mines, vec![None, None, Some(0.75), None]);
    }

    #[test]
    fn test_mine_sharing_timestamp() {
        // on the first row the mine waits for the following row
        let notes = vec![
            NoteEvent::tap(0.0, 0.0, 0),
            NoteEvent::mine(0.0, 0.0, 2),
            NoteEvent::tap(1.0, 0.5, 1),
            NoteEvent::mine(1.0, 0.5, 3),
        ];
        let rows = build_rows(&notes, 4);
        assert_eq!(rows.len(), 2);
        assert!(!rows[0].has_mines());
        assert_eq!(rows[1].mines, vec![None, None, Some(0.0), Some(0.5)]);
    }

    #[test]
    fn test_trailing_mines_are_dropped() {
        let notes = vec![NoteEvent::tap(0.0, 0.0, 0), NoteEvent::mine(1.0, 0.5, 1)];
        let rows = build_rows(&notes, 4);
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].has_mines());
    }

    #[test]
    fn test_fake_mines_tracked_separately() {
        let notes = vec![
            NoteEvent::mine(0.0, 0.0, 1).with_fake(true),
            NoteEvent::tap(1.0, 0.5, 0),
        ];
        let rows = build_rows(&notes, 4);
        assert!(rows[0].mines.iter().all(Option::is_none));
        assert_eq!(rows[0].fake_mines[1], Some(0.0));
        assert!(rows[0].has_mines());
    }
}
