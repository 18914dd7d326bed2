use super::foot::{Foot, FootSet};
use super::graph::{NodeId, StepParityGraph};
use super::weights::CostVector;
use crate::error::{ParityError, Result};
use chrono::Local;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

fn to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

/// Per-row foot codes, `[[1,0,0,3], ...]`
pub fn serialize_parities(parities: &[Vec<Foot>], pretty: bool) -> Result<String> {
    to_json(parities, pretty)
}

pub fn deserialize_parities(json: &str) -> Result<Vec<Vec<Foot>>> {
    Ok(serde_json::from_str(json)?)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StateDoc<'a> {
    idx: usize,
    row_index: isize,
    second: f64,
    beat: f64,
    columns: &'a [Foot],
    combined_columns: &'a [Foot],
    moved_feet: FootSet,
    hold_feet: FootSet,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeDoc<'a> {
    id: NodeId,
    state_idx: usize,
    neighbors: Vec<(NodeId, &'a CostVector)>,
    ancestors: Vec<(NodeId, &'a CostVector)>,
}

#[derive(Serialize)]
struct GraphDoc<'a> {
    states: Vec<StateDoc<'a>>,
    nodes: Vec<NodeDoc<'a>>,
}

/// `{states, nodes}` document; edges are `[targetId, costs]` pairs
pub fn serialize_graph(graph: &StepParityGraph, pretty: bool) -> Result<String> {
    let states = graph
        .states
        .iter()
        .enumerate()
        .map(|(idx, state)| StateDoc {
            idx,
            row_index: state.row_index,
            second: state.second,
            beat: state.beat,
            columns: &state.columns,
            combined_columns: &state.combined_columns,
            moved_feet: state.moved_feet,
            hold_feet: state.hold_feet,
        })
        .collect();
    let nodes = graph
        .nodes
        .iter()
        .map(|node| NodeDoc {
            id: node.id,
            state_idx: node.state,
            neighbors: node.neighbors.iter().map(|(&id, cost)| (id, cost)).collect(),
            ancestors: node.ancestors.iter().map(|(&id, cost)| (id, cost)).collect(),
        })
        .collect();
    to_json(&GraphDoc { states, nodes }, pretty)
}

/// Write `content` to `<dir>/<prefix>_<timestamp>.json`
pub fn write_timestamped(dir: &Path, prefix: &str, content: &str) -> Result<PathBuf> {
    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let filename = format!("{prefix}_{timestamp}.json");

    fs::create_dir_all(dir).map_err(|e| ParityError::CreateDir {
        path: dir.to_path_buf(),
        source: e,
    })?;
    let file_path = dir.join(filename);
    fs::write(&file_path, content).map_err(|e| ParityError::WriteFile {
        path: file_path.clone(),
        source: e,
    })?;
    Ok(file_path)
}
