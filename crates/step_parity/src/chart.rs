use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Note type as delivered by the chart provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(ascii_case_insensitive)]
pub enum NoteKind {
    Tap,
    Hold,
    Roll,
    Mine,
    Lift,
    Fake,
}

/// One timed note event.
///
/// The analysis only reads the timing fields and writes back `parity` and
/// `parity_override`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub beat: f64,
    pub second: f64,
    pub column: usize,
    pub kind: NoteKind,
    /// Length in beats (holds and rolls only)
    #[serde(default)]
    pub hold_length: Option<f64>,
    /// Note lies inside a fake segment
    #[serde(default)]
    pub fake: bool,
    #[serde(default)]
    pub parity: Option<char>,
    #[serde(default)]
    pub parity_override: bool,
}

impl NoteEvent {
    pub fn new(beat: f64, second: f64, column: usize, kind: NoteKind) -> Self {
        Self {
            beat,
            second,
            column,
            kind,
            hold_length: None,
            fake: false,
            parity: None,
            parity_override: false,
        }
    }

    pub fn tap(beat: f64, second: f64, column: usize) -> Self {
        Self::new(beat, second, column, NoteKind::Tap)
    }

    pub fn hold(beat: f64, second: f64, column: usize, length: f64) -> Self {
        Self {
            hold_length: Some(length),
            ..Self::new(beat, second, column, NoteKind::Hold)
        }
    }

    pub fn roll(beat: f64, second: f64, column: usize, length: f64) -> Self {
        Self {
            hold_length: Some(length),
            ..Self::new(beat, second, column, NoteKind::Roll)
        }
    }

    pub fn mine(beat: f64, second: f64, column: usize) -> Self {
        Self::new(beat, second, column, NoteKind::Mine)
    }

    pub fn with_fake(mut self, fake: bool) -> Self {
        self.fake = fake;
        self
    }

    /// Excluded from cost consideration
    #[inline]
    pub fn is_fake(&self) -> bool {
        self.fake || self.kind == NoteKind::Fake
    }

    #[inline]
    pub fn is_mine(&self) -> bool {
        self.kind == NoteKind::Mine
    }

    #[inline]
    pub fn is_hold(&self) -> bool {
        matches!(self.kind, NoteKind::Hold | NoteKind::Roll)
    }

    /// Beat where the hold releases (the note's own beat for everything else)
    #[inline]
    pub fn end_beat(&self) -> f64 {
        self.beat + self.hold_length.unwrap_or(0.0)
    }
}

/// Drop every parity label written by a previous analysis
pub fn clear_parities(notes: &mut [NoteEvent]) {
    for note in notes.iter_mut() {
        note.parity = None;
        note.parity_override = false;
    }
}
