//! Discrete primitives of the tactile search task.
//!
//! The arm visits 8 positions arranged as two mirrored arcs (position `p`
//! and `8 - p` share a physical zone). A single binary touch channel is
//! observed, and two motor primitives move the arm.

use serde::{Deserialize, Serialize};

/// Number of values of the context factor (0 = no zone identified, 1..3 = zone).
pub const NUM_CONTEXTS: usize = 4;
/// Number of arm positions.
pub const NUM_POSITIONS: usize = 8;
/// Number of observation outcomes on the touch channel.
pub const NUM_OBSERVATIONS: usize = 2;
/// Number of motor actions (one-step policies).
pub const NUM_ACTIONS: usize = 2;

/// Binary touch observation, indexed the way the likelihood model expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Observation {
    /// Contact registered since the last read (wire flag `0.0`).
    Touched = 0,
    /// No contact (wire flag `1.0`).
    NotTouched = 1,
}

impl Observation {
    /// All outcomes in index order.
    pub const ALL: [Observation; NUM_OBSERVATIONS] =
        [Observation::Touched, Observation::NotTouched];

    /// Convert from likelihood-row index.
    pub fn from_index(idx: usize) -> Option<Observation> {
        match idx {
            0 => Some(Observation::Touched),
            1 => Some(Observation::NotTouched),
            _ => None,
        }
    }

    /// Likelihood-row index.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Value of the shared touch flag that encodes this observation.
    pub fn flag(self) -> f64 {
        match self {
            Observation::Touched => 0.0,
            Observation::NotTouched => 1.0,
        }
    }

    /// Inverted encoding used in run history (1 = touched).
    pub fn logged_value(self) -> u8 {
        match self {
            Observation::Touched => 1,
            Observation::NotTouched => 0,
        }
    }

    pub fn is_touched(self) -> bool {
        self == Observation::Touched
    }
}

impl std::fmt::Display for Observation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Observation::Touched => write!(f, "touched"),
            Observation::NotTouched => write!(f, "not_touched"),
        }
    }
}

/// Motor primitive. Each action is a complete one-step policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Cyclic forward shift over the 8 positions.
    LargeAmplitude = 0,
    /// Short hop at the start of the arc, reflective jump elsewhere.
    SmallAmplitude = 1,
}

impl Action {
    /// All actions in index order.
    pub const ALL: [Action; NUM_ACTIONS] = [Action::LargeAmplitude, Action::SmallAmplitude];

    pub fn from_index(idx: usize) -> Option<Action> {
        match idx {
            0 => Some(Action::LargeAmplitude),
            1 => Some(Action::SmallAmplitude),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Action::LargeAmplitude => "large_amplitude",
            Action::SmallAmplitude => "small_amplitude",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Arm position index in `0..NUM_POSITIONS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Position(u8);

impl Position {
    /// Create a position, rejecting indices outside `0..8`.
    pub fn new(idx: usize) -> Option<Position> {
        if idx < NUM_POSITIONS {
            Some(Position(idx as u8))
        } else {
            None
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The position sharing this one's physical zone (`8 - p`, with 0 and 4 self-mirrored).
    pub fn mirror(self) -> Position {
        Position(((NUM_POSITIONS - self.index()) % NUM_POSITIONS) as u8)
    }

    /// Folded zone used for plotting.
    pub fn zone(self) -> ArmZone {
        let p = self.index();
        ArmZone((p.min(NUM_POSITIONS - p) + 1) as u8)
    }

    /// Label used by joint maps (`S1`..`S8`).
    pub fn label(self) -> String {
        format!("S{}", self.0 + 1)
    }

    /// All positions in index order.
    pub fn all() -> impl Iterator<Item = Position> {
        (0..NUM_POSITIONS as u8).map(Position)
    }
}

impl TryFrom<u8> for Position {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        Position::new(value as usize)
            .ok_or_else(|| format!("position {} out of range 0..{}", value, NUM_POSITIONS))
    }
}

impl From<Position> for u8 {
    fn from(p: Position) -> u8 {
        p.0
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Folded arm zone (1..=5): positions `p` and `8 - p` map to the same zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArmZone(u8);

impl ArmZone {
    pub fn value(self) -> u8 {
        self.0
    }
}
