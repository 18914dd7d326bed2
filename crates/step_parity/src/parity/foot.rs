use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Foot part occupying a column
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum Foot {
    #[default]
    None = 0,
    LeftHeel = 1,
    LeftToe = 2,
    RightHeel = 3,
    RightToe = 4,
}

/// Every real foot part, in the order permutations try them
pub const FEET: [Foot; 4] = [Foot::LeftHeel, Foot::LeftToe, Foot::RightHeel, Foot::RightToe];
/// Note labels, parallel to FEET
pub const FEET_LABEL: [char; 4] = ['L', 'l', 'R', 'r'];

/// Body side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    #[inline]
    pub fn heel(self) -> Foot {
        match self {
            Side::Left => Foot::LeftHeel,
            Side::Right => Foot::RightHeel,
        }
    }

    #[inline]
    pub fn toe(self) -> Foot {
        match self {
            Side::Left => Foot::LeftToe,
            Side::Right => Foot::RightToe,
        }
    }

    #[inline]
    pub fn other(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

impl Foot {
    #[inline]
    pub fn side(self) -> Option<Side> {
        match self {
            Foot::None => None,
            Foot::LeftHeel | Foot::LeftToe => Some(Side::Left),
            Foot::RightHeel | Foot::RightToe => Some(Side::Right),
        }
    }

    #[inline]
    pub fn is_left(self) -> bool {
        self.side() == Some(Side::Left)
    }

    #[inline]
    pub fn is_right(self) -> bool {
        self.side() == Some(Side::Right)
    }

    #[inline]
    pub fn is_toe(self) -> bool {
        matches!(self, Foot::LeftToe | Foot::RightToe)
    }

    /// Single-character note label ('L', 'l', 'R', 'r')
    pub fn label(self) -> Option<char> {
        FEET.iter()
            .position(|&f| f == self)
            .map(|idx| FEET_LABEL[idx])
    }
}

impl From<Foot> for u8 {
    fn from(foot: Foot) -> u8 {
        foot as u8
    }
}

impl TryFrom<u8> for Foot {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Foot::None),
            1 => Ok(Foot::LeftHeel),
            2 => Ok(Foot::LeftToe),
            3 => Ok(Foot::RightHeel),
            4 => Ok(Foot::RightToe),
            _ => Err(format!("invalid foot code: {}", code)),
        }
    }
}

impl fmt::Display for Foot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Foot::None => "None",
            Foot::LeftHeel => "LeftHeel",
            Foot::LeftToe => "LeftToe",
            Foot::RightHeel => "RightHeel",
            Foot::RightToe => "RightToe",
        };
        f.write_str(name)
    }
}

/// Column of the given foot part, if it is placed
#[inline]
pub fn position_of(columns: &[Foot], foot: Foot) -> Option<usize> {
    columns.iter().position(|&f| f == foot)
}

/// Small set of foot parts (`Foot::None` is never stored)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FootSet(u8);

impl FootSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, foot: Foot) {
        if foot != Foot::None {
            self.0 |= 1 << (foot as u8);
        }
    }

    #[inline]
    pub fn contains(self, foot: Foot) -> bool {
        foot != Foot::None && self.0 & (1 << (foot as u8)) != 0
    }

    /// Either part of the given foot
    #[inline]
    pub fn contains_side(self, side: Side) -> bool {
        self.contains(side.heel()) || self.contains(side.toe())
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Foot> {
        FEET.into_iter().filter(move |&f| self.contains(f))
    }
}

impl FromIterator<Foot> for FootSet {
    fn from_iter<I: IntoIterator<Item = Foot>>(iter: I) -> Self {
        let mut set = FootSet::new();
        for foot in iter {
            set.insert(foot);
        }
        set
    }
}

impl Serialize for FootSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for foot in self.iter() {
            seq.serialize_element(&foot)?;
        }
        seq.end()
    }
}

/// Column index of every foot part within one column array
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FootPlacement {
    pub left_heel: Option<usize>,
    pub left_toe: Option<usize>,
    pub right_heel: Option<usize>,
    pub right_toe: Option<usize>,
}

impl FootPlacement {
    pub fn from_columns(columns: &[Foot]) -> Self {
        let mut placement = Self::default();
        for (i, foot) in columns.iter().enumerate() {
            match foot {
                Foot::None => {}
                Foot::LeftHeel => placement.left_heel = Some(i),
                Foot::LeftToe => placement.left_toe = Some(i),
                Foot::RightHeel => placement.right_heel = Some(i),
                Foot::RightToe => placement.right_toe = Some(i),
            }
        }
        placement
    }

    #[inline]
    pub fn heel(&self, side: Side) -> Option<usize> {
        match side {
            Side::Left => self.left_heel,
            Side::Right => self.right_heel,
        }
    }

    #[inline]
    pub fn toe(&self, side: Side) -> Option<usize> {
        match side {
            Side::Left => self.left_toe,
            Side::Right => self.right_toe,
        }
    }

    /// Heel and toe of one foot on two panels
    #[inline]
    pub fn is_bracket(&self, side: Side) -> bool {
        self.heel(side).is_some() && self.toe(side).is_some()
    }

    /// Does `side` in `self` land on a panel the other foot held in `before`?
    pub fn overlaps_other_foot(&self, before: &FootPlacement, side: Side) -> bool {
        let other = side.other();
        let landed = [self.heel(side), self.toe(side)];
        [before.heel(other), before.toe(other)]
            .into_iter()
            .flatten()
            .any(|col| landed.contains(&Some(col)))
    }
}
