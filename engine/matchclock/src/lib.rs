// Matchclock - per-match game/play clock state machines

mod state;
mod time;
mod types;

pub use state::{ClockStateMachine, RunningClock};
pub use time::{ManualTimeSource, SystemTimeSource, TimeSource};
pub use types::{ClockDirection, ClockId, ClockKind, ClockStatus};

/// Clock values are whole seconds.
pub type Seconds = u32;
