use log::warn;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use strum::{EnumCount, IntoEnumIterator};
use strum_macros::{AsRefStr, Display, EnumCount as EnumCountMacro, EnumIter, EnumString};

/// Weighted cost categories
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    EnumCountMacro,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum CostCategory {
    #[strum(serialize = "DOUBLESTEP")]
    Doublestep,
    #[strum(serialize = "BRACKETJACK")]
    BracketJack,
    #[strum(serialize = "JACK")]
    Jack,
    #[strum(serialize = "JUMP")]
    Jump,
    #[strum(serialize = "BRACKETTAP")]
    BracketTap,
    #[strum(serialize = "HOLDSWITCH")]
    HoldSwitch,
    #[strum(serialize = "MINE")]
    Mine,
    #[strum(serialize = "FOOTSWITCH")]
    Footswitch,
    #[strum(serialize = "MISSED_FOOTSWITCH")]
    MissedFootswitch,
    #[strum(serialize = "FACING")]
    Facing,
    #[strum(serialize = "DISTANCE")]
    Distance,
    #[strum(serialize = "SPIN")]
    Spin,
    #[strum(serialize = "SIDESWITCH")]
    Sideswitch,
    #[strum(serialize = "BADBRACKET")]
    BadBracket,
}

const CATEGORY_COUNT: usize = CostCategory::COUNT;

/// Unweighted penalties are reported under this key
pub const OTHER_KEY: &str = "OTHER";
pub const TOTAL_KEY: &str = "TOTAL";

impl CostCategory {
    pub fn default_weight(self) -> f64 {
        match self {
            CostCategory::Doublestep => 850.0,
            CostCategory::BracketJack => 20.0,
            CostCategory::Jack => 30.0,
            CostCategory::Jump => 30.0,
            CostCategory::BracketTap => 400.0,
            CostCategory::HoldSwitch => 55.0,
            CostCategory::Mine => 10000.0,
            CostCategory::Footswitch => 5000.0,
            CostCategory::MissedFootswitch => 500.0,
            CostCategory::Facing => 2.0,
            CostCategory::Distance => 6.0,
            CostCategory::Spin => 1000.0,
            CostCategory::Sideswitch => 130.0,
            CostCategory::BadBracket => 40.0,
        }
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

/// Multiplier per cost category
#[derive(Debug, Clone, PartialEq)]
pub struct Weights {
    values: [f64; CATEGORY_COUNT],
}

impl Default for Weights {
    fn default() -> Self {
        let mut values = [0.0; CATEGORY_COUNT];
        for category in CostCategory::iter() {
            values[category.index()] = category.default_weight();
        }
        Self { values }
    }
}

impl Weights {
    #[inline]
    pub fn get(&self, category: CostCategory) -> f64 {
        self.values[category.index()]
    }

    /// Weights must stay finite and positive
    pub fn set(&mut self, category: CostCategory, value: f64) -> bool {
        if !value.is_finite() || value <= 0.0 {
            return false;
        }
        self.values[category.index()] = value;
        true
    }

    /// Apply `{"NAME": value}` pairs, skipping unknown names and bad values.
    /// Returns how many weights changed.
    pub fn update_from_map(&mut self, updates: &HashMap<String, f64>) -> usize {
        let mut applied = 0;
        for (name, &value) in updates {
            let Ok(category) = CostCategory::from_str(name) else {
                warn!("Ignoring unknown cost weight {:?}", name);
                continue;
            };
            if self.set(category, value) {
                applied += 1;
            } else {
                warn!("Ignoring invalid value {} for weight {}", value, category);
            }
        }
        applied
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn to_map(&self) -> BTreeMap<String, f64> {
        CostCategory::iter()
            .map(|c| (c.to_string(), self.get(c)))
            .collect()
    }
}

/// Cost of one edge, split by category
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CostVector {
    values: [f64; CATEGORY_COUNT],
    pub other: f64,
    pub total: f64,
}

impl CostVector {
    pub fn zero() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add(&mut self, category: CostCategory, amount: f64) {
        self.values[category.index()] += amount;
    }

    #[inline]
    pub fn get(&self, category: CostCategory) -> f64 {
        self.values[category.index()]
    }

    /// Recompute `total` from the categories and `other`
    pub fn finalize(&mut self) {
        self.total = self.values.iter().sum::<f64>() + self.other;
    }

    pub fn iter(&self) -> impl Iterator<Item = (CostCategory, f64)> + '_ {
        CostCategory::iter().map(|c| (c, self.get(c)))
    }
}

impl Serialize for CostVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(CATEGORY_COUNT + 2))?;
        for (category, value) in self.iter() {
            map.serialize_entry(category.as_ref(), &value)?;
        }
        map.serialize_entry(OTHER_KEY, &self.other)?;
        map.serialize_entry(TOTAL_KEY, &self.total)?;
        map.end()
    }
}
