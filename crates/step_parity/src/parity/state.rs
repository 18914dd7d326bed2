use super::foot::{Foot, FootSet};
use super::rows::Row;

/// Where each foot stands after one row is stepped.
///
/// `columns` is the assignment for the row's own notes and continuing holds,
/// `combined_columns` also carries feet still resting from earlier rows and is
/// filled in by the cost calculator.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    /// -1 for the synthetic start state
    pub row_index: isize,
    pub second: f64,
    pub beat: f64,
    pub columns: Vec<Foot>,
    pub combined_columns: Vec<Foot>,
    pub moved_feet: FootSet,
    pub hold_feet: FootSet,
}

/// Identity of a state inside one row layer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateKey {
    row_index: isize,
    second_bits: u64,
    columns: Vec<Foot>,
    combined_columns: Vec<Foot>,
    moved_feet: FootSet,
    hold_feet: FootSet,
}

impl State {
    /// Synthetic state one second before the first row, nothing on the pad
    pub fn start(first_second: f64, column_count: usize) -> Self {
        Self {
            row_index: -1,
            second: first_second - 1.0,
            beat: -1.0,
            columns: vec![Foot::None; column_count],
            combined_columns: vec![Foot::None; column_count],
            moved_feet: FootSet::new(),
            hold_feet: FootSet::new(),
        }
    }

    /// Synthetic state after the last row
    pub fn end(row_count: usize, last_second: f64, last_beat: f64, column_count: usize) -> Self {
        Self {
            row_index: row_count as isize,
            second: last_second + 1.0,
            beat: last_beat + 1.0,
            ..Self::start(0.0, column_count)
        }
    }

    /// Result of stepping `row` from `initial` with the given assignment.
    ///
    /// A foot counts as moved unless it keeps holding the same column;
    /// any foot on a continuing hold counts as holding.
    pub fn after(initial: &State, row: &Row, row_index: usize, columns: Vec<Foot>) -> Self {
        let mut moved_feet = FootSet::new();
        let mut hold_feet = FootSet::new();
        for (i, &foot) in columns.iter().enumerate() {
            if foot == Foot::None {
                continue;
            }
            match row.holds[i] {
                None => moved_feet.insert(foot),
                Some(_) => {
                    if initial.combined_columns[i] != foot {
                        moved_feet.insert(foot);
                    }
                    hold_feet.insert(foot);
                }
            }
        }
        Self {
            row_index: row_index as isize,
            second: row.second,
            beat: row.beat,
            combined_columns: vec![Foot::None; columns.len()],
            columns,
            moved_feet,
            hold_feet,
        }
    }

    pub fn key(&self) -> StateKey {
        StateKey {
            row_index: self.row_index,
            second_bits: self.second.to_bits(),
            columns: self.columns.clone(),
            combined_columns: self.combined_columns.clone(),
            moved_feet: self.moved_feet,
            hold_feet: self.hold_feet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parity::rows::HoldSpan;
    use std::collections::BTreeSet;

    fn row_with_hold(hold_column: Option<usize>) -> Row {
        let mut holds = vec![None; 4];
        if let Some(col) = hold_column {
            holds[col] = Some(HoldSpan {
                beat: 0.0,
                second: 0.0,
                length: 4.0,
            });
        }
        Row {
            notes: vec![None, Some(1), None, None],
            holds,
            hold_tails: BTreeSet::new(),
            mines: vec![None; 4],
            fake_mines: vec![None; 4],
            second: 1.0,
            beat: 2.0,
        }
    }

    #[test]
    fn test_start_and_end() {
        let start = State::start(3.0, 4);
        assert_eq!(start.row_index, -1);
        assert_eq!(start.second, 2.0);
        assert_eq!(start.beat, -1.0);
        assert!(start.columns.iter().all(|&f| f == Foot::None));

        let end = State::end(5, 10.0, 20.0, 4);
        assert_eq!(end.row_index, 5);
        assert_eq!(end.second, 11.0);
        assert_eq!(end.beat, 21.0);
    }

    #[test]
    fn test_after_tracks_moved_and_held_feet() {
        use Foot::*;
        let mut initial = State::start(0.0, 4);
        initial.combined_columns = vec![LeftHeel, None, None, None];

        // left heel keeps its hold, right heel steps
        let row = row_with_hold(Some(0));
        let state = State::after(&initial, &row, 1, vec![LeftHeel, RightHeel, None, None]);
        assert!(!state.moved_feet.contains(LeftHeel));
        assert!(state.moved_feet.contains(RightHeel));
        assert!(state.hold_feet.contains(LeftHeel));
        assert_eq!(state.row_index, 1);
        assert_eq!(state.second, 1.0);

        // the hold was taken over by the other foot
        let state = State::after(&initial, &row, 1, vec![RightHeel, LeftHeel, None, None]);
        assert!(state.moved_feet.contains(RightHeel));
        assert!(state.hold_feet.contains(RightHeel));
    }

    #[test]
    fn test_key_distinguishes_assignments() {
        use Foot::*;
        let initial = State::start(0.0, 4);
        let row = row_with_hold(Option::None);
        let a = State::after(&initial, &row, 0, vec![None, LeftHeel, None, None]);
        let b = State::after(&initial, &row, 0, vec![None, LeftHeel, None, None]);
        let c = State::after(&initial, &row, 0, vec![None, RightHeel, None, None]);
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
    }
}
