use super::types::*;
use crate::error::{ParityError, Result};
use std::str::FromStr;

// Left, Down, Up, Right
const DANCE_SINGLE_POINTS: [(f64, f64); 4] = [(-1.0, 0.0), (0.0, -1.0), (0.0, 1.0), (1.0, 0.0)];

// Two single pads side by side, pulled together towards the middle
const DANCE_DOUBLE_POINTS: [(f64, f64); 8] = [
    (-1.0, 0.0),
    (-0.7, -1.0),
    (-0.7, 1.0),
    (-0.2, 0.0),
    (0.2, 0.0),
    (0.7, -1.0),
    (0.7, 1.0),
    (1.0, 0.0),
];

/// Layout construction from the static point tables
impl StageLayout {
    pub fn build(name: LayoutName) -> Self {
        let table: &[(f64, f64)] = match name {
            LayoutName::DanceSingle => &DANCE_SINGLE_POINTS,
            LayoutName::DanceDouble => &DANCE_DOUBLE_POINTS,
        };
        Self {
            name,
            points: table.iter().map(|&(x, y)| StagePoint::new(x, y)).collect(),
        }
    }

    /// Build a layout from its stepstype name (e.g. "dance-single")
    pub fn from_name(name: &str) -> Result<Self> {
        let layout_name =
            LayoutName::from_str(name).map_err(|_| ParityError::UnknownLayout(name.to_string()))?;
        Ok(Self::build(layout_name))
    }
}
