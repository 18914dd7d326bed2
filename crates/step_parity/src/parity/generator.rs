use super::analysis::{Analysis, ParityAnalyzer, parity_differences};
use super::export::{deserialize_parities, serialize_graph, serialize_parities};
use super::foot::Foot;
use super::graph::StepParityNode;
use super::overrides::BeatOverrides;
use super::state::State;
use super::weights::{CostCategory, Weights};
use crate::chart::{NoteEvent, clear_parities};
use crate::error::Result;
use crate::geometry::StageLayout;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, MutexGuard};

/// Sent after every completed analysis pass
#[derive(Debug, Clone, PartialEq)]
pub struct ParityUpdated {
    pub rows: usize,
    pub total_cost: f64,
}

/// Short report of one analysis pass
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSummary {
    pub rows: usize,
    pub nodes: usize,
    pub edges: usize,
    pub total_cost: f64,
    pub overridden_rows: usize,
}

impl AnalysisSummary {
    fn from_analysis(analysis: &Analysis, overrides: &BeatOverrides) -> Self {
        Self {
            rows: analysis.rows.len(),
            nodes: analysis.graph.nodes.len(),
            edges: analysis.graph.edge_count(),
            total_cost: analysis.total_cost(),
            overridden_rows: analysis
                .rows
                .iter()
                .filter(|row| overrides.has_beat_override(row.beat))
                .count(),
        }
    }
}

struct Session {
    analyzer: ParityAnalyzer,
    overrides: BeatOverrides,
    last: Option<Analysis>,
}

/// Clears the in-flight flag when dropped
struct AnalyzingGuard<'a>(&'a AtomicBool);

impl<'a> AnalyzingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for AnalyzingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Long-lived entry point: owns weights, overrides and the permutation cache
/// for one stage layout, and remembers the last analysis for inspection.
pub struct ParityGenerator {
    layout: StageLayout,
    analyzing: AtomicBool,
    session: Mutex<Session>,
    listeners: Mutex<Vec<Sender<ParityUpdated>>>,
}

impl ParityGenerator {
    /// Fails on an unknown layout name
    pub fn new(layout_name: &str) -> Result<Self> {
        Ok(Self::with_layout(StageLayout::from_name(layout_name)?))
    }

    pub fn with_layout(layout: StageLayout) -> Self {
        let column_count = layout.column_count();
        Self {
            session: Mutex::new(Session {
                analyzer: ParityAnalyzer::new(layout.clone()),
                overrides: BeatOverrides::new(column_count),
                last: None,
            }),
            layout,
            analyzing: AtomicBool::new(false),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn layout(&self) -> &StageLayout {
        &self.layout
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn is_analyzing(&self) -> bool {
        self.analyzing.load(Ordering::Acquire)
    }

    /// Receive an event after each analysis pass
    pub fn subscribe(&self) -> Receiver<ParityUpdated> {
        let (tx, rx) = mpsc::channel();
        self.listeners
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(tx);
        rx
    }

    fn notify(&self, summary: &AnalysisSummary) {
        let event = ParityUpdated {
            rows: summary.rows,
            total_cost: summary.total_cost,
        };
        let mut listeners = self.listeners.lock().unwrap_or_else(|p| p.into_inner());
        listeners.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Analyze with overrides applied and label `notes`.
    ///
    /// Returns `None` without doing anything when another analysis is running.
    pub fn analyze(&self, notes: &mut [NoteEvent]) -> Option<AnalysisSummary> {
        self.analyze_with(notes, true)
    }

    pub fn analyze_with(&self, notes: &mut [NoteEvent], use_overrides: bool) -> Option<AnalysisSummary> {
        let Some(_guard) = AnalyzingGuard::acquire(&self.analyzing) else {
            debug!("Analysis already running, dropping request");
            return None;
        };
        let summary = {
            let mut session = self.lock();
            let Session {
                analyzer,
                overrides,
                last,
            } = &mut *session;
            let analysis = analyzer.analyze(notes, use_overrides.then_some(&mut *overrides));
            let summary = AnalysisSummary::from_analysis(&analysis, overrides);
            *last = Some(analysis);
            summary
        };
        self.notify(&summary);
        Some(summary)
    }

    /// Run the pipeline without keeping the result.
    ///
    /// Empty while another analysis is running.
    pub fn generate_parities(&self, use_overrides: bool, notes: &mut [NoteEvent]) -> Vec<Vec<Foot>> {
        let Some(_guard) = AnalyzingGuard::acquire(&self.analyzing) else {
            debug!("Analysis already running, skipping parity generation");
            return Vec::new();
        };
        let mut session = self.lock();
        let Session {
            analyzer,
            overrides,
            ..
        } = &mut *session;
        analyzer
            .analyze(notes, use_overrides.then_some(&mut *overrides))
            .parities
    }

    /// Strip labels from `notes` and forget the last analysis; overrides stay
    pub fn clear(&self, notes: &mut [NoteEvent]) {
        clear_parities(notes);
        self.lock().last = None;
    }

    /// Read access to the last analysis
    pub fn with_last<R>(&self, f: impl FnOnce(&Analysis) -> R) -> Option<R> {
        self.lock().last.as_ref().map(f)
    }

    pub fn last_parities(&self) -> Option<Vec<Vec<Foot>>> {
        self.with_last(|analysis| analysis.parities.clone())
    }

    pub fn parity_for_beat(&self, beat: f64) -> Option<Vec<Foot>> {
        self.with_last(|analysis| {
            analysis
                .row_for_beat(beat)
                .map(|row| analysis.parities[row].clone())
        })
        .flatten()
    }

    /// Node chosen for the row at `beat`
    pub fn node_for_beat(&self, beat: f64) -> Option<StepParityNode> {
        self.with_last(|analysis| {
            analysis
                .row_for_beat(beat)
                .and_then(|row| analysis.selected[row])
                .and_then(|id| analysis.graph.node(id).cloned())
        })
        .flatten()
    }

    /// Every candidate node for the row at `beat`
    pub fn nodes_for_beat(&self, beat: f64) -> Vec<StepParityNode> {
        self.with_last(|analysis| match analysis.row_for_beat(beat) {
            Some(row) => collect_row_nodes(analysis, row as isize),
            None => Vec::new(),
        })
        .unwrap_or_default()
    }

    pub fn nodes_for_row(&self, row_index: isize) -> Vec<StepParityNode> {
        self.with_last(|analysis| collect_row_nodes(analysis, row_index))
            .unwrap_or_default()
    }

    pub fn selected_states(&self) -> Vec<State> {
        self.with_last(|analysis| {
            (0..analysis.rows.len())
                .filter_map(|row| analysis.selected_state(row).cloned())
                .collect()
        })
        .unwrap_or_default()
    }

    // overrides

    pub fn has_beat_override(&self, beat: f64) -> bool {
        self.lock().overrides.has_beat_override(beat)
    }

    pub fn beat_override(&self, beat: f64) -> Vec<Foot> {
        self.lock().overrides.beat_override(beat)
    }

    pub fn note_override(&self, beat: f64, column: usize) -> Foot {
        self.lock().overrides.note_override(beat, column)
    }

    pub fn add_note_override(&self, beat: f64, column: usize, foot: Foot) -> bool {
        self.lock().overrides.add_note_override(beat, column, foot)
    }

    pub fn add_row_override(&self, beat: f64, feet: &[Foot]) -> bool {
        self.lock().overrides.add_row_override(beat, feet)
    }

    pub fn remove_note_override(&self, beat: f64, column: usize) -> bool {
        self.lock().overrides.remove_note_override(beat, column)
    }

    pub fn remove_beat_override(&self, beat: f64) -> bool {
        self.lock().overrides.remove_beat_override(beat)
    }

    pub fn reset_beat_overrides(&self) {
        self.lock().overrides.reset();
    }

    pub fn beat_overrides(&self) -> BeatOverrides {
        self.lock().overrides.clone()
    }

    /// Replace all overrides from a JSON document; keeps the old ones on failure
    pub fn set_beat_overrides_json(&self, json: &str) -> bool {
        match BeatOverrides::from_json(self.layout.column_count(), json) {
            Ok(overrides) => {
                self.lock().overrides = overrides;
                true
            }
            Err(e) => {
                warn!("Could not read beat overrides: {}", e);
                false
            }
        }
    }

    pub fn beat_overrides_json(&self, pretty: bool) -> Result<String> {
        self.lock().overrides.to_json(pretty)
    }

    // weights

    pub fn weights(&self) -> Weights {
        self.lock().analyzer.weights().clone()
    }

    pub fn default_weights() -> Weights {
        Weights::default()
    }

    /// Returns how many weights were applied
    pub fn update_weights(&self, updates: &HashMap<String, f64>) -> usize {
        self.lock().analyzer.weights_mut().update_from_map(updates)
    }

    pub fn set_weight(&self, category: CostCategory, value: f64) -> bool {
        self.lock().analyzer.weights_mut().set(category, value)
    }

    pub fn reset_weights(&self) {
        self.lock().analyzer.weights_mut().reset();
    }

    // documents

    pub fn serialize_parity_data(&self, pretty: bool) -> Result<String> {
        let parities = self.last_parities().unwrap_or_default();
        serialize_parities(&parities, pretty)
    }

    pub fn serialize_step_graph(&self, pretty: bool) -> Result<String> {
        let session = self.lock();
        match &session.last {
            Some(analysis) => serialize_graph(&analysis.graph, pretty),
            None => serialize_graph(&Default::default(), pretty),
        }
    }

    /// Rebuild overrides so the analysis reproduces an exported parity document.
    ///
    /// Returns true when the final analysis matches the document.
    pub fn load_parity_data(&self, json: &str, notes: &mut [NoteEvent]) -> bool {
        let target = match deserialize_parities(json) {
            Ok(target) => target,
            Err(e) => {
                warn!("Could not read parity data: {}", e);
                return false;
            }
        };
        let Some(_guard) = AnalyzingGuard::acquire(&self.analyzing) else {
            debug!("Analysis already running, dropping parity import");
            return false;
        };

        let (matched, summary) = {
            let mut session = self.lock();
            let Session {
                analyzer,
                overrides,
                last,
            } = &mut *session;
            overrides.reset();

            let mut analysis = analyzer.analyze(notes, Some(&mut *overrides));
            let matched = if analysis.rows.len() != target.len() {
                warn!(
                    "Parity data has {} rows but the chart has {}",
                    target.len(),
                    analysis.rows.len()
                );
                false
            } else {
                let mut matched = false;
                for _ in 0..=analysis.rows.len() {
                    let differences = parity_differences(&analysis.parities, &target);
                    if differences.is_empty() {
                        matched = true;
                        break;
                    }
                    let mut added = false;
                    for &row in differences.keys() {
                        let beat = analysis.rows[row].beat;
                        if overrides.beat_override(beat) != target[row]
                            && overrides.add_row_override(beat, &target[row])
                        {
                            added = true;
                        }
                    }
                    if !added {
                        break;
                    }
                    analysis = analyzer.analyze(notes, Some(&mut *overrides));
                }
                matched
            };
            info!(
                "Imported parity data: {} overrides, {}",
                overrides.len(),
                if matched { "matched" } else { "partially matched" }
            );
            let summary = AnalysisSummary::from_analysis(&analysis, overrides);
            *last = Some(analysis);
            (matched, summary)
        };
        self.notify(&summary);
        matched
    }
}

fn collect_row_nodes(analysis: &Analysis, row_index: isize) -> Vec<StepParityNode> {
    analysis
        .graph
        .nodes_for_row(row_index)
        .into_iter()
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parity::foot::{FootPlacement, Side};
    use crate::parity::overrides::has_duplicate_feet;
    use Foot::*;

    fn single_generator() -> ParityGenerator {
        ParityGenerator::new("dance-single").unwrap()
    }

    /// Jump on left/right, then a down arrow
    fn jump_then_step() -> Vec<NoteEvent> {
        vec![
            NoteEvent::tap(0.0, 0.0, 0),
            NoteEvent::tap(0.0, 0.0, 3),
            NoteEvent::tap(1.0, 0.5, 1),
        ]
    }

    #[test]
    fn test_unknown_layout_is_fatal() {
        assert!(ParityGenerator::new("pump-single").is_err());
    }

    #[test]
    fn test_empty_chart() {
        let parity = single_generator();
        let mut notes: Vec<NoteEvent> = Vec::new();
        let summary = parity.analyze(&mut notes).unwrap();
        assert_eq!(summary.rows, 0);
        assert_eq!(summary.total_cost, 0.0);
        assert_eq!(parity.last_parities(), Some(Vec::new()));
        assert_eq!(parity.serialize_parity_data(false).unwrap(), "[]");
    }

    #[test]
    fn test_jump_then_single_step() {
        let parity = single_generator();
        let mut notes = jump_then_step();
        let summary = parity.analyze(&mut notes).unwrap();
        assert_eq!(summary.rows, 2);

        // both feet on the jump, uncrossed
        assert_eq!(notes[0].parity, Some('L'));
        assert_eq!(notes[1].parity, Some('R'));
        assert!(matches!(notes[2].parity, Some('L') | Some('R')));
        assert!(notes.iter().all(|n| !n.parity_override));

        let costs = parity.with_last(|a| a.path_costs()).unwrap();
        assert_eq!(costs.len(), 2);
        assert!(costs.iter().all(|c| c.get(CostCategory::Doublestep) == 0.0));
        assert!((summary.total_cost - costs.iter().map(|c| c.total).sum::<f64>()).abs() < 1e-9);
    }

    #[test]
    fn test_fast_jack_keeps_foot() {
        let parity = single_generator();
        let mut notes = vec![
            NoteEvent::tap(0.0, 0.0, 0),
            NoteEvent::tap(0.0, 0.0, 3),
            NoteEvent::tap(1.0, 0.5, 0),
            NoteEvent::tap(1.06, 0.53, 0),
        ];
        parity.analyze(&mut notes).unwrap();
        assert_eq!(notes[2].parity, Some('L'));
        assert_eq!(notes[3].parity, Some('L'));
    }

    #[test]
    fn test_override_forces_crossed_jump() {
        let parity = single_generator();
        let mut notes = jump_then_step();
        parity.analyze(&mut notes).unwrap();
        assert_eq!(notes[0].parity, Some('L'));

        assert!(parity.add_note_override(0.0, 0, RightHeel));
        let summary = parity.analyze(&mut notes).unwrap();
        assert_eq!(summary.overridden_rows, 1);
        assert_eq!(notes[0].parity, Some('R'));
        assert_eq!(notes[1].parity, Some('L'));
        assert!(notes[0].parity_override && notes[1].parity_override);
        assert!(notes[2].parity.is_some());
        assert!(!notes[2].parity_override);
        assert_eq!(parity.parity_for_beat(0.0), Some(vec![RightHeel, None, None, LeftHeel]));

        // without overrides the natural assignment comes back
        let parities = parity.generate_parities(false, &mut notes);
        assert_eq!(parities[0], vec![LeftHeel, None, None, RightHeel]);
        assert!(parity.has_beat_override(0.0));

        parity.reset_beat_overrides();
        parity.analyze(&mut notes).unwrap();
        assert_eq!(notes[0].parity, Some('L'));
    }

    #[test]
    fn test_impossible_override_is_dropped() {
        let parity = single_generator();
        let mut notes = jump_then_step();
        // nothing stands yet for a toe to lean on
        assert!(parity.add_note_override(0.0, 0, RightToe));
        parity.analyze(&mut notes).unwrap();
        assert!(!parity.has_beat_override(0.0));
        assert!(notes[0].parity.is_some());
        assert!(!notes[0].parity_override);
    }

    #[test]
    fn test_toe_override_after_jump() {
        let parity = single_generator();
        let mut notes = jump_then_step();
        assert!(parity.add_note_override(1.0, 1, LeftToe));
        parity.analyze(&mut notes).unwrap();
        assert!(parity.has_beat_override(1.0));
        assert_eq!(notes[2].parity, Some('l'));
        assert!(notes[2].parity_override);
    }

    #[test]
    fn test_parity_document_round_trip() {
        let parity = single_generator();
        let mut notes = jump_then_step();
        parity.analyze(&mut notes).unwrap();
        let json = parity.serialize_parity_data(false).unwrap();

        let fresh = single_generator();
        let mut copy = jump_then_step();
        assert!(fresh.load_parity_data(&json, &mut copy));
        assert_eq!(fresh.last_parities(), parity.last_parities());
        assert_eq!(fresh.beat_overrides().len(), 0);
    }

    #[test]
    fn test_import_turns_differences_into_overrides() {
        let parity = single_generator();
        let mut notes = jump_then_step();
        parity.analyze(&mut notes).unwrap();
        let mut parities = parity.last_parities().unwrap();
        let other = if parities[1][1] == LeftHeel { RightHeel } else { LeftHeel };
        parities[1] = vec![None, other, None, None];
        let json = serialize_parities(&parities, false).unwrap();

        assert!(parity.load_parity_data(&json, &mut notes));
        assert!(parity.has_beat_override(1.0));
        assert!(!parity.has_beat_override(0.0));
        assert_eq!(parity.last_parities(), Some(parities));
        assert_eq!(notes[2].parity, other.label());
        assert!(notes[2].parity_override);
    }

    #[test]
    fn test_import_rejects_bad_documents() {
        let parity = single_generator();
        let mut notes = jump_then_step();
        assert!(!parity.load_parity_data("{not json", &mut notes));
        assert!(!parity.load_parity_data("[[1,0,0,3]]", &mut notes));
    }

    #[test]
    fn test_override_json_keeps_old_on_failure() {
        let parity = single_generator();
        assert!(parity.add_note_override(2.0, 1, LeftHeel));
        assert!(!parity.set_beat_overrides_json("[broken"));
        assert!(parity.has_beat_override(2.0));

        assert!(parity.set_beat_overrides_json(r#"{"4.000":[0,0,3,0]}"#));
        assert!(!parity.has_beat_override(2.0));
        assert_eq!(parity.note_override(4.0, 2), RightHeel);
        assert_eq!(parity.beat_overrides_json(false).unwrap(), r#"{"4.000":[0,0,3,0]}"#);
    }

    #[test]
    fn test_weights_facade() {
        let parity = single_generator();
        assert_eq!(parity.weights(), ParityGenerator::default_weights());
        let updates = HashMap::from([("JUMP".to_string(), 90.0), ("BOGUS".to_string(), 1.0)]);
        assert_eq!(parity.update_weights(&updates), 1);
        assert!(!parity.set_weight(CostCategory::Spin, 0.0));

        let mut notes = vec![NoteEvent::tap(0.0, 0.0, 0), NoteEvent::tap(0.0, 0.0, 3)];
        let summary = parity.analyze(&mut notes).unwrap();
        assert!((summary.total_cost - 90.0).abs() < 1e-9);

        parity.reset_weights();
        assert_eq!(parity.weights().get(CostCategory::Jump), 30.0);
    }

    #[test]
    fn test_subscribers_are_notified() {
        let parity = single_generator();
        let rx = parity.subscribe();
        let dropped = parity.subscribe();
        drop(dropped);

        let mut notes = jump_then_step();
        parity.analyze(&mut notes).unwrap();
        let event = rx.try_recv().unwrap();
        assert_eq!(event.rows, 2);
        assert!(rx.try_recv().is_err());
        assert_eq!(parity.listeners.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_second_analysis_is_dropped_while_running() {
        let parity = single_generator();
        let guard = AnalyzingGuard::acquire(&parity.analyzing).unwrap();
        assert!(parity.is_analyzing());

        let mut notes = jump_then_step();
        assert!(parity.analyze(&mut notes).is_none());
        assert!(notes[0].parity.is_none());

        drop(guard);
        assert!(!parity.is_analyzing());
        assert!(parity.analyze(&mut notes).is_some());
    }

    #[test]
    fn test_generation_is_skipped_while_running() {
        let parity = single_generator();
        let mut notes = jump_then_step();
        {
            let _guard = AnalyzingGuard::acquire(&parity.analyzing).unwrap();
            assert!(parity.generate_parities(true, &mut notes).is_empty());
            assert!(notes.iter().all(|n| n.parity.is_none()));
        }
        assert_eq!(parity.generate_parities(true, &mut notes).len(), 2);
        assert!(!parity.is_analyzing());
    }

    #[test]
    fn test_clear_keeps_overrides() {
        let parity = single_generator();
        let mut notes = jump_then_step();
        assert!(parity.add_note_override(1.0, 1, LeftHeel));
        parity.analyze(&mut notes).unwrap();
        assert!(parity.last_parities().is_some());

        parity.clear(&mut notes);
        assert!(parity.last_parities().is_none());
        assert!(notes.iter().all(|n| n.parity.is_none() && !n.parity_override));
        assert!(parity.has_beat_override(1.0));
    }

    #[test]
    fn test_inspection_queries() {
        let parity = single_generator();
        assert!(parity.node_for_beat(0.0).is_none());
        let mut notes = jump_then_step();
        parity.analyze(&mut notes).unwrap();

        let node = parity.node_for_beat(0.0).unwrap();
        assert!(parity.nodes_for_beat(0.0).contains(&node));
        assert_eq!(parity.nodes_for_row(0).len(), 2);
        assert!(parity.nodes_for_beat(7.0).is_empty());
        assert_eq!(parity.selected_states().len(), 2);

        let graph: serde_json::Value =
            serde_json::from_str(&parity.serialize_step_graph(false).unwrap()).unwrap();
        assert!(!graph["nodes"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_selected_states_are_consistent() {
        let parity = single_generator();
        let mut notes = vec![
            NoteEvent::tap(0.0, 0.0, 0),
            NoteEvent::tap(1.0, 0.25, 1),
            NoteEvent::hold(2.0, 0.5, 2, 2.0),
            NoteEvent::tap(3.0, 0.75, 0),
            NoteEvent::mine(3.5, 0.875, 3),
            NoteEvent::tap(4.0, 1.0, 3),
            NoteEvent::tap(4.0, 1.0, 1),
            NoteEvent::tap(5.0, 1.25, 2),
            NoteEvent::roll(6.0, 1.5, 0, 1.0),
            NoteEvent::tap(6.5, 1.625, 3),
            NoteEvent::tap(7.0, 1.75, 1),
        ];
        let summary = parity.analyze(&mut notes).unwrap();
        let rows = parity.with_last(|a| a.rows.clone()).unwrap();
        let states = parity.selected_states();
        assert_eq!(states.len(), summary.rows);

        for (i, (row, state)) in rows.iter().zip(&states).enumerate() {
            for c in 0..4 {
                assert_eq!(row.is_active(c), state.columns[c] != None);
            }
            assert!(!has_duplicate_feet(&state.columns));
            assert!(!has_duplicate_feet(&state.combined_columns));
            let placement = FootPlacement::from_columns(&state.columns);
            let combined = FootPlacement::from_columns(&state.combined_columns);
            for side in Side::BOTH {
                if placement.toe(side).is_some() {
                    assert!(placement.heel(side).is_some());
                }
                if combined.toe(side).is_some() {
                    // heel resting now or placed with the toe on an earlier row
                    assert!(
                        combined.heel(side).is_some()
                            || states[..=i]
                                .iter()
                                .any(|s| s.columns.contains(&side.heel()))
                    );
                }
            }
        }
        for note in &notes {
            if !note.is_mine() {
                assert!(note.parity.is_some());
            }
        }
    }
}
