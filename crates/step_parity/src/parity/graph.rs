use super::state::{State, StateKey};
use super::weights::CostVector;
use log::warn;
use std::collections::{BTreeMap, HashMap};

pub type NodeId = usize;

/// One state in the layered graph with its weighted edges
#[derive(Debug, Clone, PartialEq)]
pub struct StepParityNode {
    pub id: NodeId,
    /// Index into `StepParityGraph::states`
    pub state: usize,
    pub neighbors: BTreeMap<NodeId, CostVector>,
    pub ancestors: BTreeMap<NodeId, CostVector>,
}

/// Layered DAG of foot states, one layer per row.
///
/// Node ids grow with insertion order, so every edge points to a larger id.
#[derive(Debug, Clone, Default)]
pub struct StepParityGraph {
    pub nodes: Vec<StepParityNode>,
    pub states: Vec<State>,
    pub start_node: NodeId,
    pub end_node: NodeId,
    index: HashMap<StateKey, NodeId>,
}

impl StepParityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node for `state`, created if no identical state exists yet
    pub fn add_or_get_node(&mut self, state: State) -> NodeId {
        let key = state.key();
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(StepParityNode {
            id,
            state: self.states.len(),
            neighbors: BTreeMap::new(),
            ancestors: BTreeMap::new(),
        });
        self.states.push(state);
        self.index.insert(key, id);
        id
    }

    /// Add or replace the edge `from -> to`
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, cost: CostVector) {
        self.nodes[from].neighbors.insert(to, cost);
        self.nodes[to].ancestors.insert(from, cost);
    }

    pub fn node(&self, id: NodeId) -> Option<&StepParityNode> {
        self.nodes.get(id)
    }

    pub fn state_of(&self, id: NodeId) -> Option<&State> {
        self.nodes.get(id).and_then(|node| self.states.get(node.state))
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|node| node.neighbors.len()).sum()
    }

    /// Cost of the edge `from -> to`, if present
    pub fn edge_cost(&self, from: NodeId, to: NodeId) -> Option<&CostVector> {
        self.nodes.get(from).and_then(|node| node.neighbors.get(&to))
    }

    /// All nodes whose state belongs to the given row
    pub fn nodes_for_row(&self, row_index: isize) -> Vec<&StepParityNode> {
        self.nodes
            .iter()
            .filter(|node| self.states[node.state].row_index == row_index)
            .collect()
    }

    /// Cheapest path from the start node to the end node, both excluded
    pub fn compute_cheapest_path(&self) -> Vec<NodeId> {
        if self.is_empty() {
            return Vec::new();
        }
        self.cheapest_path_between(self.start_node, self.end_node)
    }

    /// Single forward relaxation in id order.
    ///
    /// On a broken predecessor chain the partial path found so far is returned.
    pub fn cheapest_path_between(&self, start: NodeId, end: NodeId) -> Vec<NodeId> {
        let mut cost = vec![f64::INFINITY; self.nodes.len()];
        let mut predecessor: Vec<Option<NodeId>> = vec![None; self.nodes.len()];
        cost[start] = 0.0;

        for i in start..=end.min(self.nodes.len().saturating_sub(1)) {
            if cost[i].is_infinite() {
                continue;
            }
            for (&to, edge) in &self.nodes[i].neighbors {
                let candidate = cost[i] + edge.total;
                if candidate < cost[to] {
                    cost[to] = candidate;
                    predecessor[to] = Some(i);
                }
            }
        }

        let mut path = Vec::new();
        let mut current = end;
        while current != start {
            if current != end {
                path.push(current);
            }
            match predecessor[current] {
                Some(previous) => current = previous,
                None => {
                    warn!("Node {} has no predecessor, returning a partial path", current);
                    break;
                }
            }
        }
        path.reverse();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parity::foot::Foot;
    use crate::parity::weights::CostCategory;

    fn state(row_index: isize, first: Foot) -> State {
        let mut state = State::start(0.0, 4);
        state.row_index = row_index;
        state.second = row_index as f64;
        state.columns[0] = first;
        state
    }

    fn cost(total: f64) -> CostVector {
        let mut cost = CostVector::zero();
        cost.add(CostCategory::Distance, total);
        cost.finalize();
        cost
    }

    #[test]
    fn test_add_or_get_node_dedupes() {
        let mut graph = StepParityGraph::new();
        let a = graph.add_or_get_node(state(0, Foot::LeftHeel));
        let b = graph.add_or_get_node(state(0, Foot::LeftHeel));
        let c = graph.add_or_get_node(state(0, Foot::RightHeel));
        let d = graph.add_or_get_node(state(1, Foot::LeftHeel));
        assert_eq!(a, b);
        assert_eq!((a, c, d), (0, 1, 2));
        assert_eq!(graph.states.len(), 3);
        assert_eq!(graph.nodes_for_row(0).len(), 2);
    }

    #[test]
    fn test_cheapest_path() {
        // start -> {a, b} -> end
        let mut graph = StepParityGraph::new();
        let start = graph.add_or_get_node(state(-1, Foot::None));
        let a = graph.add_or_get_node(state(0, Foot::LeftHeel));
        let b = graph.add_or_get_node(state(0, Foot::RightHeel));
        let end = graph.add_or_get_node(state(1, Foot::None));
        graph.start_node = start;
        graph.end_node = end;
        graph.add_edge(start, a, cost(10.0));
        graph.add_edge(start, b, cost(3.0));
        graph.add_edge(a, end, cost(0.0));
        graph.add_edge(b, end, cost(0.0));

        assert_eq!(graph.compute_cheapest_path(), vec![b]);
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.edge_cost(start, a).map(|c| c.total), Some(10.0));
        assert!(graph.nodes[end].ancestors.contains_key(&a));

        // re-adding an edge replaces it
        graph.add_edge(start, a, cost(1.0));
        assert_eq!(graph.compute_cheapest_path(), vec![a]);
    }

    #[test]
    fn test_unreachable_end_gives_partial_path() {
        let mut graph = StepParityGraph::new();
        let start = graph.add_or_get_node(state(-1, Foot::None));
        let end = graph.add_or_get_node(state(0, Foot::None));
        graph.start_node = start;
        graph.end_node = end;
        assert!(graph.compute_cheapest_path().is_empty());
        assert!(StepParityGraph::new().compute_cheapest_path().is_empty());
    }
}
