pub mod chart;
pub mod chart_reader;
pub mod config;
pub mod constants;
pub mod error;
pub mod geometry;
pub mod parity;

pub use chart::{NoteEvent, NoteKind};
pub use chart_reader::{read_chart_csv, read_chart_from_reader};
pub use config::Config;
pub use constants::{BEAT_KEY_SCALE, DANCE_DOUBLE, DANCE_SINGLE};
pub use error::{ParityError, Result};
pub use geometry::{LayoutName, StageLayout, StagePoint};
pub use parity::{
    AnalysisSummary, BeatOverrides, CostCategory, CostVector, Foot, ParityAnalyzer,
    ParityGenerator, ParityUpdated, Weights,
};
