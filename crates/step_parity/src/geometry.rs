pub mod build;
pub mod metrics;
pub mod types;

pub use types::{LayoutName, StageLayout, StagePoint};
