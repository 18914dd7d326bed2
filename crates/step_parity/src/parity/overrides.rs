use super::foot::Foot;
use crate::constants::BEAT_KEY_SCALE;
use crate::error::Result;
use itertools::Itertools;
use log::warn;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Beat rounded to thousandths, stable enough for map lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BeatKey(i64);

impl BeatKey {
    pub fn from_beat(beat: f64) -> Self {
        Self((beat * BEAT_KEY_SCALE).round() as i64)
    }

    pub fn beat(self) -> f64 {
        self.0 as f64 / BEAT_KEY_SCALE
    }
}

impl fmt::Display for BeatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.beat())
    }
}

impl FromStr for BeatKey {
    type Err = std::num::ParseFloatError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim().parse::<f64>().map(BeatKey::from_beat)
    }
}

/// Does any foot appear twice in the row?
pub fn has_duplicate_feet(feet: &[Foot]) -> bool {
    feet.iter()
        .filter(|&&f| f != Foot::None)
        .duplicates()
        .next()
        .is_some()
}

/// User-pinned feet, keyed by beat.
///
/// Every stored row has one entry per column and at least one real foot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BeatOverrides {
    column_count: usize,
    overrides: BTreeMap<BeatKey, Vec<Foot>>,
}

impl BeatOverrides {
    pub fn new(column_count: usize) -> Self {
        Self {
            column_count,
            overrides: BTreeMap::new(),
        }
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BeatKey, &[Foot])> {
        self.overrides.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    pub fn has_beat_override(&self, beat: f64) -> bool {
        self.overrides
            .get(&BeatKey::from_beat(beat))
            .is_some_and(|row| row.iter().any(|&f| f != Foot::None))
    }

    /// Pinned feet for the beat; all `None` when nothing is pinned
    pub fn beat_override(&self, beat: f64) -> Vec<Foot> {
        self.overrides
            .get(&BeatKey::from_beat(beat))
            .cloned()
            .unwrap_or_else(|| vec![Foot::None; self.column_count])
    }

    pub fn note_override(&self, beat: f64, column: usize) -> Foot {
        self.overrides
            .get(&BeatKey::from_beat(beat))
            .and_then(|row| row.get(column).copied())
            .unwrap_or(Foot::None)
    }

    /// Pin one note. Fails when another column of the beat already has `foot`.
    pub fn add_note_override(&mut self, beat: f64, column: usize, foot: Foot) -> bool {
        if column >= self.column_count {
            return false;
        }
        let key = BeatKey::from_beat(beat);
        if let Some(row) = self.overrides.get(&key) {
            let taken = row
                .iter()
                .enumerate()
                .any(|(c, &f)| c != column && f != Foot::None && f == foot);
            if taken {
                return false;
            }
        }
        if foot == Foot::None {
            return self.remove_note_override(beat, column);
        }
        let column_count = self.column_count;
        self.overrides
            .entry(key)
            .or_insert_with(|| vec![Foot::None; column_count])[column] = foot;
        true
    }

    /// Pin a whole row at once
    pub fn add_row_override(&mut self, beat: f64, feet: &[Foot]) -> bool {
        if feet.len() != self.column_count || has_duplicate_feet(feet) {
            return false;
        }
        let key = BeatKey::from_beat(beat);
        if feet.iter().all(|&f| f == Foot::None) {
            self.overrides.remove(&key);
        } else {
            self.overrides.insert(key, feet.to_vec());
        }
        true
    }

    pub fn remove_note_override(&mut self, beat: f64, column: usize) -> bool {
        let key = BeatKey::from_beat(beat);
        if let Some(row) = self.overrides.get_mut(&key) {
            if let Some(slot) = row.get_mut(column) {
                *slot = Foot::None;
            }
            if row.iter().all(|&f| f == Foot::None) {
                self.overrides.remove(&key);
            }
        }
        true
    }

    pub fn remove_beat_override(&mut self, beat: f64) -> bool {
        self.overrides.remove(&BeatKey::from_beat(beat));
        true
    }

    pub fn reset(&mut self) {
        self.overrides.clear();
    }

    /// Parse a `{"beat": [foot codes]}` document.
    ///
    /// Rows of the wrong width or with a repeated foot are skipped.
    pub fn from_json(column_count: usize, json: &str) -> Result<Self> {
        let raw: BTreeMap<String, Vec<Foot>> = serde_json::from_str(json)?;
        let mut overrides = Self::new(column_count);
        for (beat, feet) in raw {
            let Ok(key) = beat.parse::<BeatKey>() else {
                warn!("Skipping override with unreadable beat {:?}", beat);
                continue;
            };
            if !overrides.add_row_override(key.beat(), &feet) {
                warn!("Skipping invalid override row at beat {}", key);
            }
        }
        Ok(overrides)
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}

impl Serialize for BeatOverrides {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.overrides.len()))?;
        for (key, feet) in &self.overrides {
            map.serialize_entry(&key.to_string(), feet)?;
        }
        map.end()
    }
}
