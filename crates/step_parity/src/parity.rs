pub mod analysis;
pub mod annotate;
pub mod cost;
pub mod export;
pub mod foot;
pub mod generator;
pub mod graph;
pub mod overrides;
pub mod permute;
pub mod rows;
pub mod state;
pub mod weights;

pub use analysis::{Analysis, ParityAnalyzer};
pub use cost::CostCalculator;
pub use foot::{FEET, FEET_LABEL, Foot, FootPlacement, FootSet, Side};
pub use generator::{AnalysisSummary, ParityGenerator, ParityUpdated};
pub use graph::{NodeId, StepParityGraph, StepParityNode};
pub use overrides::{BeatKey, BeatOverrides};
pub use permute::PermutationGenerator;
pub use rows::{HoldSpan, Row, build_rows};
pub use state::State;
pub use weights::{CostCategory, CostVector, Weights};
