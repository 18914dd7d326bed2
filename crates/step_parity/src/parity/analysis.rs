use super::annotate::set_note_parity;
use super::cost::CostCalculator;
use super::foot::Foot;
use super::graph::{NodeId, StepParityGraph};
use super::overrides::{BeatKey, BeatOverrides};
use super::permute::{PermutationGenerator, apply_row_override, fits_standing_feet};
use super::rows::{Row, build_rows};
use super::state::State;
use super::weights::{CostVector, Weights};
use crate::chart::NoteEvent;
use crate::error::Result;
use crate::geometry::StageLayout;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

/// Everything produced by one analysis pass
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub rows: Vec<Row>,
    pub graph: StepParityGraph,
    /// Chosen node per row
    pub selected: Vec<Option<NodeId>>,
    /// Chosen feet per row (`Foot::None` everywhere when no node was chosen)
    pub parities: Vec<Vec<Foot>>,
}

impl Analysis {
    pub fn selected_state(&self, row: usize) -> Option<&State> {
        self.selected
            .get(row)
            .copied()
            .flatten()
            .and_then(|id| self.graph.state_of(id))
    }

    /// Row whose beat rounds to the same key
    pub fn row_for_beat(&self, beat: f64) -> Option<usize> {
        let key = BeatKey::from_beat(beat);
        self.rows
            .iter()
            .position(|row| BeatKey::from_beat(row.beat) == key)
    }

    /// Costs of the chosen edges, in row order
    pub fn path_costs(&self) -> Vec<CostVector> {
        let mut previous = Some(self.graph.start_node);
        let mut costs = Vec::new();
        for &selected in &self.selected {
            let edge = previous
                .zip(selected)
                .and_then(|(from, to)| self.graph.edge_cost(from, to));
            if let Some(cost) = edge {
                costs.push(*cost);
            }
            previous = selected;
        }
        costs
    }

    pub fn total_cost(&self) -> f64 {
        self.path_costs().iter().map(|cost| cost.total).sum()
    }
}

/// Rows whose feet differ, keyed by row index.
///
/// Each entry holds the `second` feet on the differing columns and
/// `Foot::None` elsewhere.
pub fn parity_differences(first: &[Vec<Foot>], second: &[Vec<Foot>]) -> BTreeMap<usize, Vec<Foot>> {
    first
        .iter()
        .zip(second)
        .enumerate()
        .filter(|(_, (a, b))| a != b)
        .map(|(i, (a, b))| {
            let diff = a
                .iter()
                .zip(b)
                .map(|(&x, &y)| if x != y { y } else { Foot::None })
                .collect();
            (i, diff)
        })
        .collect()
}

/// Builds the state graph for a chart and picks the cheapest foot sequence
#[derive(Debug, Clone)]
pub struct ParityAnalyzer {
    layout: StageLayout,
    permuter: PermutationGenerator,
    costs: CostCalculator,
}

impl ParityAnalyzer {
    pub fn new(layout: StageLayout) -> Self {
        Self::with_weights(layout, Weights::default())
    }

    pub fn with_weights(layout: StageLayout, weights: Weights) -> Self {
        Self {
            permuter: PermutationGenerator::new(layout.clone()),
            costs: CostCalculator::with_weights(layout.clone(), weights),
            layout,
        }
    }

    /// Analyzer for a stepstype name such as "dance-single"
    pub fn from_name(name: &str) -> Result<Self> {
        Ok(Self::new(StageLayout::from_name(name)?))
    }

    pub fn layout(&self) -> &StageLayout {
        &self.layout
    }

    pub fn weights(&self) -> &Weights {
        self.costs.weights()
    }

    pub fn weights_mut(&mut self) -> &mut Weights {
        self.costs.weights_mut()
    }

    /// Run the full pipeline and label `notes`.
    ///
    /// Overrides that leave a row without any valid permutation are removed
    /// from `overrides` along the way.
    pub fn analyze(
        &mut self,
        notes: &mut [NoteEvent],
        mut overrides: Option<&mut BeatOverrides>,
    ) -> Analysis {
        let started = Instant::now();
        let rows = build_rows(notes, self.layout.column_count());
        let graph = self.build_state_graph(&rows, overrides.as_deref_mut());
        let selected = select_states(&graph, rows.len());
        let parities = self.parities_for(&graph, &selected);
        set_note_parity(notes, &rows, &parities, overrides.as_deref());

        info!(
            "Analyzed {} rows: {} nodes, {} edges in {:.2?}",
            rows.len(),
            graph.nodes.len(),
            graph.edge_count(),
            started.elapsed()
        );
        Analysis {
            rows,
            graph,
            selected,
            parities,
        }
    }

    fn parities_for(&self, graph: &StepParityGraph, selected: &[Option<NodeId>]) -> Vec<Vec<Foot>> {
        let empty = vec![Foot::None; self.layout.column_count()];
        selected
            .iter()
            .map(|id| {
                id.and_then(|id| graph.state_of(id))
                    .map(|state| state.columns.clone())
                    .unwrap_or_else(|| empty.clone())
            })
            .collect()
    }

    /// Permutations for one row with any overrides applied, and whether the
    /// overrides took effect
    fn row_permutations(&mut self, row: &Row, overrides: Option<&BeatOverrides>) -> (Vec<Vec<Foot>>, bool) {
        let permutations = self.permuter.permutations(row).to_vec();
        let Some(overrides) = overrides.filter(|o| o.has_beat_override(row.beat)) else {
            return (permutations, false);
        };
        let pins = overrides.beat_override(row.beat);
        match apply_row_override(&permutations, &pins) {
            Some(forced) => (forced, true),
            None => (permutations, false),
        }
    }

    /// Connect every frontier state to every permutation of `rows[i]`.
    ///
    /// Forced permutations only attach where their toes find a heel.
    fn expand_row(
        &mut self,
        graph: &mut StepParityGraph,
        frontier: &[NodeId],
        rows: &[Row],
        i: usize,
        permutations: &[Vec<Foot>],
        forced: bool,
    ) -> Vec<NodeId> {
        let row = &rows[i];
        let mut next = Vec::with_capacity(frontier.len() * permutations.len());
        let mut seen = HashSet::new();
        for &initial_id in frontier {
            let Some(initial) = graph.state_of(initial_id).cloned() else {
                continue;
            };
            for columns in permutations {
                if forced && !fits_standing_feet(&self.layout, columns, &initial.combined_columns) {
                    continue;
                }
                let mut result = State::after(&initial, row, i, columns.clone());
                let cost = self.costs.action_cost(&initial, &mut result, rows, i);
                let result_id = graph.add_or_get_node(result);
                graph.add_edge(initial_id, result_id, cost);
                if seen.insert(result_id) {
                    next.push(result_id);
                }
            }
        }
        next
    }

    /// Layered graph over every row, from a synthetic start to a synthetic end
    pub fn build_state_graph(
        &mut self,
        rows: &[Row],
        mut overrides: Option<&mut BeatOverrides>,
    ) -> StepParityGraph {
        let mut graph = StepParityGraph::new();
        let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
            return graph;
        };
        let column_count = self.layout.column_count();

        let start = graph.add_or_get_node(State::start(first.second, column_count));
        graph.start_node = start;
        let mut frontier = vec![start];

        for (i, row) in rows.iter().enumerate() {
            let (mut permutations, forced) = self.row_permutations(row, overrides.as_deref());
            let mut next = self.expand_row(&mut graph, &frontier, rows, i, &permutations, forced);
            let dropped = overrides
                .as_deref()
                .is_some_and(|o| o.has_beat_override(row.beat))
                && (!forced || next.is_empty());
            if dropped {
                warn!(
                    "No valid permutation fits the overrides at beat {:.3}, clearing them",
                    row.beat
                );
                if let Some(overrides) = overrides.as_deref_mut() {
                    overrides.remove_beat_override(row.beat);
                }
                if forced {
                    permutations = self.permuter.permutations(row).to_vec();
                    next = self.expand_row(&mut graph, &frontier, rows, i, &permutations, false);
                }
            }
            debug!(
                "Row {} at beat {:.3}: {} permutations, {} states",
                i,
                row.beat,
                permutations.len(),
                next.len()
            );
            frontier = next;
        }

        let end_state = State::end(rows.len(), last.second, last.beat, column_count);
        let end = graph.add_or_get_node(end_state);
        graph.end_node = end;
        for &id in &frontier {
            graph.add_edge(id, end, CostVector::zero());
        }
        graph
    }
}

/// Chosen node per row, from the cheapest path through `graph`
pub fn select_states(graph: &StepParityGraph, row_count: usize) -> Vec<Option<NodeId>> {
    let mut selected = vec![None; row_count];
    for id in graph.compute_cheapest_path() {
        let Some(state) = graph.state_of(id) else {
            continue;
        };
        if let Some(slot) = usize::try_from(state.row_index)
            .ok()
            .and_then(|row| selected.get_mut(row))
        {
            *slot = Some(id);
        }
    }
    selected
}
