use super::foot::{FEET, Foot, FootPlacement, Side};
use super::overrides::has_duplicate_feet;
use super::rows::Row;
use crate::geometry::StageLayout;
use itertools::Itertools;
use std::collections::HashMap;

/// Enumerates foot assignments for a row, memoized by active-column mask
#[derive(Debug, Clone)]
pub struct PermutationGenerator {
    layout: StageLayout,
    cache: HashMap<u32, Vec<Vec<Foot>>>,
}

impl PermutationGenerator {
    pub fn new(layout: StageLayout) -> Self {
        Self {
            layout,
            cache: HashMap::new(),
        }
    }

    pub fn permutations(&mut self, row: &Row) -> &[Vec<Foot>] {
        let layout = &self.layout;
        self.cache
            .entry(row.active_mask())
            .or_insert_with(|| permute_mask(layout, row.active_mask()))
    }
}

fn permute_mask(layout: &StageLayout, mask: u32) -> Vec<Vec<Foot>> {
    let mut out = Vec::new();
    let mut columns = vec![Foot::None; layout.column_count()];
    permute_column(layout, mask, 0, &mut columns, &mut out);
    out
}

fn permute_column(
    layout: &StageLayout,
    mask: u32,
    column: usize,
    columns: &mut Vec<Foot>,
    out: &mut Vec<Vec<Foot>>,
) {
    if column >= columns.len() {
        if is_valid_assignment(layout, columns) {
            out.push(columns.clone());
        }
        return;
    }
    if mask & (1 << column) == 0 {
        permute_column(layout, mask, column + 1, columns, out);
        return;
    }
    for foot in FEET {
        if columns.contains(&foot) {
            continue;
        }
        columns[column] = foot;
        permute_column(layout, mask, column + 1, columns, out);
        columns[column] = Foot::None;
    }
}

/// Toe only with its heel, and heel/toe within bracket reach
pub fn is_valid_assignment(layout: &StageLayout, columns: &[Foot]) -> bool {
    let placement = FootPlacement::from_columns(columns);
    Side::BOTH.iter().all(|&side| {
        match (placement.heel(side), placement.toe(side)) {
            (None, Some(_)) => false,
            (Some(heel), Some(toe)) => layout.bracket_check(heel, toe),
            _ => true,
        }
    })
}

/// Force pinned feet into every permutation.
///
/// Only rewrites that would put one foot on two columns are dropped; a pinned
/// toe may lean on a heel standing from an earlier row, see
/// [`fits_standing_feet`]. Returns `None` when nothing survives.
pub fn apply_row_override(permutations: &[Vec<Foot>], pins: &[Foot]) -> Option<Vec<Vec<Foot>>> {
    let rewritten: Vec<Vec<Foot>> = permutations
        .iter()
        .map(|perm| {
            perm.iter()
                .zip(pins)
                .map(|(&foot, &pin)| if pin != Foot::None { pin } else { foot })
                .collect::<Vec<_>>()
        })
        .filter(|perm| !has_duplicate_feet(perm))
        .unique()
        .collect();
    (!rewritten.is_empty()).then_some(rewritten)
}

/// Every toe in `columns` has its heel in `columns` or among the feet still
/// standing in `standing`, within bracket reach.
pub fn fits_standing_feet(layout: &StageLayout, columns: &[Foot], standing: &[Foot]) -> bool {
    let placement = FootPlacement::from_columns(columns);
    let before = FootPlacement::from_columns(standing);
    Side::BOTH.iter().all(|&side| {
        let Some(toe) = placement.toe(side) else {
            return true;
        };
        placement
            .heel(side)
            .or(before.heel(side))
            .is_some_and(|heel| layout.bracket_check(heel, toe))
    })
}
