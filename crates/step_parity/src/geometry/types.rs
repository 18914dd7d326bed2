use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Pad layout type
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum LayoutName {
    DanceSingle,
    DanceDouble,
}

/// Panel center in stage coordinates (x grows to the right, y grows towards the back)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct StagePoint {
    pub x: f64,
    pub y: f64,
}

impl StagePoint {
    pub const ORIGIN: StagePoint = StagePoint { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Overall stage geometry: one point per playable column
#[derive(Debug, Clone, PartialEq)]
pub struct StageLayout {
    pub name: LayoutName,
    pub points: Vec<StagePoint>, // points[column]
}

impl StageLayout {
    #[inline]
    pub fn column_count(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn point(&self, column: usize) -> StagePoint {
        self.points[column]
    }

    /// Outermost columns, used for side-switch detection
    pub fn side_columns(&self) -> [usize; 2] {
        [0, self.column_count().saturating_sub(1)]
    }
}
