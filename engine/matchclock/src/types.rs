use serde::{Deserialize, Serialize};

/// Identifier for a clock, stable for the clock's lifetime and unique
/// within its kind. Play and game clock ids may overlap numerically.
pub type ClockId = u32;

/// Which family a clock belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClockKind {
    /// Short countdown constraining time between plays.
    Play,
    /// The overall period/quarter clock of a match.
    Game,
}

impl ClockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClockKind::Play => "playclock",
            ClockKind::Game => "gameclock",
        }
    }
}

/// Whether elapsed time decreases or increases the effective value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockDirection {
    Down,
    Up,
}

/// Lifecycle status of a clock.
///
/// `Stopping` is a grace-period marker written by collaborators that manage
/// a clock's persisted row; the state machine itself only moves between
/// `Stopped`, `Running` and `Paused`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockStatus {
    Stopped,
    Running,
    Paused,
    Stopping,
}
