use super::foot::{Foot, FootPlacement, Side, position_of};
use super::rows::Row;
use super::state::State;
use super::weights::{CostCategory, CostVector, Weights};
use crate::constants::{
    FACING_EXPONENT, FACING_SCALE, FAST_JACK_THRESHOLD_S, FOOTSWITCH_THRESHOLD_S,
    LONE_FOOT_PENALTY, MIN_ELAPSED_S,
};
use crate::geometry::StageLayout;
use itertools::Itertools;

/// Feet still resting on the pad after `result` is stepped from `initial`.
///
/// A heel stays until it moves; a toe stays only while neither part of its
/// foot moves.
pub fn combine_columns(initial: &State, result: &State) -> Vec<Foot> {
    result
        .columns
        .iter()
        .zip(&initial.combined_columns)
        .map(|(&now, &before)| {
            if now != Foot::None {
                return now;
            }
            let Some(side) = before.side() else {
                return Foot::None;
            };
            let kept = if before.is_toe() {
                !result.moved_feet.contains_side(side)
            } else {
                !result.moved_feet.contains(before)
            };
            if kept { before } else { Foot::None }
        })
        .collect()
}

/// Did this foot take a fresh step (not just keep holding)?
fn stepped(state: &State, side: Side) -> bool {
    [side.heel(), side.toe()]
        .into_iter()
        .any(|foot| state.moved_feet.contains(foot) && !state.hold_feet.contains(foot))
}

/// Everything one transition's penalties look at
struct Transition<'a> {
    initial: &'a State,
    result: &'a State,
    row: &'a Row,
    previous_row: Option<&'a Row>,
    combined: &'a [Foot],
    initial_placement: FootPlacement,
    result_placement: FootPlacement,
    combined_placement: FootPlacement,
    elapsed: f64,
    moved_left: bool,
    moved_right: bool,
    did_jump: bool,
    jacked_left: bool,
    jacked_right: bool,
}

impl Transition<'_> {
    fn moved(&self, side: Side) -> bool {
        match side {
            Side::Left => self.moved_left,
            Side::Right => self.moved_right,
        }
    }

    fn jacked(&self, side: Side) -> bool {
        match side {
            Side::Left => self.jacked_left,
            Side::Right => self.jacked_right,
        }
    }
}

/// Scores transitions between states
#[derive(Debug, Clone)]
pub struct CostCalculator {
    layout: StageLayout,
    weights: Weights,
}

impl CostCalculator {
    pub fn new(layout: StageLayout) -> Self {
        Self::with_weights(layout, Weights::default())
    }

    pub fn with_weights(layout: StageLayout, weights: Weights) -> Self {
        Self { layout, weights }
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    pub fn weights_mut(&mut self) -> &mut Weights {
        &mut self.weights
    }

    #[inline]
    fn weight(&self, category: CostCategory) -> f64 {
        self.weights.get(category)
    }

    /// Cost of stepping `rows[row_index]` from `initial` into `result`.
    ///
    /// Also fills `result.combined_columns`.
    pub fn action_cost(
        &self,
        initial: &State,
        result: &mut State,
        rows: &[Row],
        row_index: usize,
    ) -> CostVector {
        let combined = combine_columns(initial, result);
        let mut cost = CostVector::zero();
        {
            let row = &rows[row_index];
            let previous_row = row_index.checked_sub(1).map(|i| &rows[i]);
            let mut transition = Transition {
                initial,
                result: &*result,
                row,
                previous_row,
                combined: &combined,
                initial_placement: FootPlacement::from_columns(&initial.combined_columns),
                result_placement: FootPlacement::from_columns(&result.columns),
                combined_placement: FootPlacement::from_columns(&combined),
                elapsed: (result.second - initial.second).max(MIN_ELAPSED_S),
                moved_left: result.moved_feet.contains_side(Side::Left),
                moved_right: result.moved_feet.contains_side(Side::Right),
                did_jump: stepped(initial, Side::Left) && stepped(initial, Side::Right),
                jacked_left: false,
                jacked_right: false,
            };
            transition.jacked_left = self.is_jack(&transition, Side::Left);
            transition.jacked_right = self.is_jack(&transition, Side::Right);

            self.mine_cost(&transition, &mut cost);
            self.hold_switch_cost(&transition, &mut cost);
            self.bracket_tap_cost(&transition, &mut cost);
            self.lone_foot_cost(&transition, &mut cost);
            self.doublestep_cost(&transition, &mut cost);
            self.jump_cost(&transition, &mut cost);
            self.facing_cost(&transition, &mut cost);
            self.spin_cost(&transition, &mut cost);
            self.footswitch_cost(&transition, &mut cost);
            self.sideswitch_cost(&transition, &mut cost);
            self.missed_footswitch_cost(&transition, &mut cost);
            self.fast_jack_cost(&transition, &mut cost);
            self.distance_cost(&transition, &mut cost);
            self.bad_bracket_cost(&transition, &mut cost);
        }
        result.combined_columns = combined;
        cost.finalize();
        cost
    }

    /// Same foot hitting again one of the panels it just stepped
    fn is_jack(&self, t: &Transition, side: Side) -> bool {
        if t.did_jump || !t.moved(side) {
            return false;
        }
        let Some(heel) = t.result_placement.heel(side) else {
            return false;
        };
        let fresh = stepped(t.initial, side);
        let heel_jack = t.initial.combined_columns[heel] == side.heel()
            && !t.result.hold_feet.contains(side.heel())
            && fresh;
        let toe_jack = t.result_placement.toe(side).is_some_and(|toe| {
            t.initial.combined_columns[toe] == side.toe()
                && !t.result.hold_feet.contains(side.toe())
                && fresh
        });
        heel_jack || toe_jack
    }

    fn mine_cost(&self, t: &Transition, cost: &mut CostVector) {
        let on_mine = t
            .combined
            .iter()
            .zip(&t.row.mines)
            .any(|(&foot, mine)| foot != Foot::None && mine.is_some());
        if on_mine {
            cost.add(CostCategory::Mine, self.weight(CostCategory::Mine));
        }
    }

    fn hold_switch_cost(&self, t: &Transition, cost: &mut CostVector) {
        for (c, hold) in t.row.holds.iter().enumerate() {
            if hold.is_none() {
                continue;
            }
            let foot = t.combined[c];
            let before = t.initial.combined_columns[c];
            let switched = (foot.is_left() && !before.is_left())
                || (foot.is_right() && !before.is_right());
            if !switched {
                continue;
            }
            let scale = match position_of(&t.initial.combined_columns, foot) {
                None => 1.0,
                Some(previous) => self.layout.distance_sq(c, previous).sqrt(),
            };
            cost.add(
                CostCategory::HoldSwitch,
                self.weight(CostCategory::HoldSwitch) * scale,
            );
        }
    }

    fn bracket_tap_cost(&self, t: &Transition, cost: &mut CostVector) {
        for side in Side::BOTH {
            let (Some(heel), Some(toe)) =
                (t.result_placement.heel(side), t.result_placement.toe(side))
            else {
                continue;
            };
            let jack_penalty = if t.initial.moved_feet.contains_side(side) {
                1.0 / t.elapsed
            } else {
                1.0
            };
            let heel_held = t.row.holds[heel].is_some();
            let toe_held = t.row.holds[toe].is_some();
            // one half holds while the other taps
            if heel_held != toe_held {
                cost.add(
                    CostCategory::BracketTap,
                    self.weight(CostCategory::BracketTap) * jack_penalty,
                );
            }
        }
    }

    /// Moving while the other foot has never been on the pad
    fn lone_foot_cost(&self, t: &Transition, cost: &mut CostVector) {
        let columns = &t.initial.combined_columns;
        if columns.iter().all(|&f| f == Foot::None) {
            return;
        }
        for foot in t.result.moved_feet.iter() {
            let Some(side) = foot.side() else { continue };
            let other = side.other();
            if !columns.iter().any(|f| f.side() == Some(other)) {
                cost.other += LONE_FOOT_PENALTY;
            }
        }
    }

    fn doublestep_cost(&self, t: &Transition, cost: &mut CostVector) {
        if t.moved_left == t.moved_right || !t.result.hold_feet.is_empty() || t.did_jump {
            return;
        }
        let mut doublestepped = Side::BOTH
            .iter()
            .any(|&side| t.moved(side) && !t.jacked(side) && stepped(t.initial, side));

        // a hold that ends between the rows or is still going frees the other foot
        if let Some(previous) = t.previous_row {
            for hold in previous.holds.iter().flatten() {
                let end = hold.end_beat();
                if (end > previous.beat && end < t.row.beat) || end >= t.row.beat {
                    doublestepped = false;
                }
            }
        }
        if doublestepped {
            cost.add(
                CostCategory::Doublestep,
                self.weight(CostCategory::Doublestep),
            );
        }

        for side in Side::BOTH {
            if t.jacked(side)
                && t.result.moved_feet.contains(side.heel())
                && t.result.moved_feet.contains(side.toe())
            {
                cost.add(
                    CostCategory::BracketJack,
                    self.weight(CostCategory::BracketJack),
                );
            }
        }
    }

    fn jump_cost(&self, t: &Transition, cost: &mut CostVector) {
        if t.moved_left && t.moved_right && t.row.note_count() >= 2 {
            cost.add(
                CostCategory::Jump,
                self.weight(CostCategory::Jump) / t.elapsed,
            );
        }
    }

    fn facing_cost(&self, t: &Transition, cost: &mut CostVector) {
        let p = &t.combined_placement;
        let left_heel = p.left_heel;
        let right_heel = p.right_heel;
        let left_toe = p.left_toe.or(left_heel);
        let right_toe = p.right_toe.or(right_heel);

        let pair = |a: Option<usize>, b: Option<usize>, f: fn(&StageLayout, usize, usize) -> f64| {
            match (a, b) {
                (Some(a), Some(b)) => f(&self.layout, a, b),
                _ => 0.0,
            }
        };
        let facing = [
            pair(left_heel, right_heel, StageLayout::x_difference),
            pair(left_toe, right_toe, StageLayout::x_difference),
            pair(left_heel, left_toe, StageLayout::y_difference),
            pair(right_heel, right_toe, StageLayout::y_difference),
        ];
        for value in facing {
            let penalty = (-value.min(0.0)).powf(FACING_EXPONENT) * FACING_SCALE;
            if penalty > 0.0 {
                cost.add(
                    CostCategory::Facing,
                    penalty * self.weight(CostCategory::Facing),
                );
            }
        }
    }

    /// Feet crossed in both rows while swapping front and back
    fn spin_cost(&self, t: &Transition, cost: &mut CostVector) {
        let p = &t.combined_placement;
        let before = &t.initial_placement;
        let left = self
            .layout
            .average_point(p.left_heel, p.left_toe.or(p.left_heel));
        let right = self
            .layout
            .average_point(p.right_heel, p.right_toe.or(p.right_heel));
        let prev_left = self
            .layout
            .average_point(before.left_heel, before.left_toe);
        let prev_right = self
            .layout
            .average_point(before.right_heel, before.right_toe);

        if right.x < left.x && prev_right.x < prev_left.x {
            let flipped = (right.y < left.y && prev_right.y > prev_left.y)
                || (right.y > left.y && prev_right.y < prev_left.y);
            if flipped {
                cost.add(CostCategory::Spin, self.weight(CostCategory::Spin));
            }
        }
    }

    fn footswitch_cost(&self, t: &Transition, cost: &mut CostVector) {
        if t.elapsed < FOOTSWITCH_THRESHOLD_S || t.row.has_mines() {
            return;
        }
        let time_scaled = t.elapsed - FOOTSWITCH_THRESHOLD_S;
        let switched = t
            .initial
            .combined_columns
            .iter()
            .zip(&t.result.columns)
            .any(|(&before, &now)| {
                before != Foot::None
                    && now != Foot::None
                    && before != now
                    && !t.result.moved_feet.contains(before)
            });
        if switched {
            cost.add(
                CostCategory::Footswitch,
                (time_scaled / 2.0).powi(2) * self.weight(CostCategory::Footswitch),
            );
        }
    }

    /// Footswitch on the outermost panels
    fn sideswitch_cost(&self, t: &Transition, cost: &mut CostVector) {
        for c in self.layout.side_columns().into_iter().dedup() {
            let before = t.initial.combined_columns[c];
            let now = t.result.columns[c];
            if before != now
                && before != Foot::None
                && now != Foot::None
                && !t.result.moved_feet.contains(before)
            {
                cost.add(
                    CostCategory::Sideswitch,
                    self.weight(CostCategory::Sideswitch),
                );
            }
        }
    }

    /// Jacking where mines suggest a footswitch
    fn missed_footswitch_cost(&self, t: &Transition, cost: &mut CostVector) {
        if (t.jacked_left || t.jacked_right) && t.row.has_mines() {
            cost.add(
                CostCategory::MissedFootswitch,
                self.weight(CostCategory::MissedFootswitch),
            );
        }
    }

    fn fast_jack_cost(&self, t: &Transition, cost: &mut CostVector) {
        if t.elapsed < FAST_JACK_THRESHOLD_S
            && t.moved_left != t.moved_right
            && (t.jacked_left || t.jacked_right)
        {
            let penalty = 1.0 / (FAST_JACK_THRESHOLD_S - t.elapsed) - 1.0 / FAST_JACK_THRESHOLD_S;
            cost.add(
                CostCategory::Jack,
                penalty * self.weight(CostCategory::Jack),
            );
        }
    }

    fn distance_cost(&self, t: &Transition, cost: &mut CostVector) {
        for foot in t.result.moved_feet.iter() {
            let Some(from) = position_of(&t.initial.combined_columns, foot) else {
                continue;
            };
            let Some(to) = position_of(&t.result.columns, foot) else {
                continue;
            };
            cost.add(
                CostCategory::Distance,
                self.layout.distance_sq(from, to).sqrt() * self.weight(CostCategory::Distance)
                    / t.elapsed,
            );
        }
    }

    /// Bracketing onto panels the other foot was just on
    fn bad_bracket_cost(&self, t: &Transition, cost: &mut CostVector) {
        for side in Side::BOTH {
            if t.result_placement.is_bracket(side)
                && t.result_placement
                    .overlaps_other_foot(&t.initial_placement, side)
            {
                cost.add(
                    CostCategory::BadBracket,
                    self.weight(CostCategory::BadBracket) / t.elapsed,
                );
            }
        }
    }
}
