use std::sync::Arc;

use parking_lot::RwLock;

use crate::time::TimeSource;
use crate::types::{ClockDirection, ClockId, ClockStatus};
use crate::Seconds;

/// Capability surface a scheduler needs from a registered clock.
///
/// Anything that can report when it started and what it reads right now can
/// be polled; `ClockStateMachine` is the canonical implementation.
pub trait RunningClock: Send + Sync {
    /// Epoch milliseconds captured at the last `start()`; `None` unless the
    /// clock is running.
    fn started_at_ms(&self) -> Option<i64>;

    /// The clock's value right now, in whole seconds.
    fn current_value(&self) -> Seconds;
}

struct ClockState {
    /// Reading frozen at the last pause/stop, or the baseline while running.
    value: Seconds,
    status: ClockStatus,
    started_at_ms: Option<i64>,
}

/// Per-clock value/status holder.
///
/// Answers "what does this clock read right now" without being ticked: the
/// current value is projected on demand from the anchor timestamp captured
/// at `start()` and the elapsed wall time since. `started_at_ms` is `Some`
/// exactly while the clock is running.
pub struct ClockStateMachine {
    clock_id: ClockId,
    direction: ClockDirection,
    max_value: Seconds,
    time: Arc<dyn TimeSource>,
    state: RwLock<ClockState>,
}

impl ClockStateMachine {
    /// Create a clock frozen at `initial_value`. Callers are responsible for
    /// handing in a sensible pair of `initial_value` and `max_value`.
    pub fn new(
        clock_id: ClockId,
        initial_value: Seconds,
        direction: ClockDirection,
        max_value: Seconds,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            clock_id,
            direction,
            max_value,
            time,
            state: RwLock::new(ClockState {
                value: initial_value,
                status: ClockStatus::Stopped,
                started_at_ms: None,
            }),
        }
    }

    pub fn clock_id(&self) -> ClockId {
        self.clock_id
    }

    pub fn direction(&self) -> ClockDirection {
        self.direction
    }

    pub fn max_value(&self) -> Seconds {
        self.max_value
    }

    pub fn status(&self) -> ClockStatus {
        self.state.read().status
    }

    /// The frozen baseline value, untouched by elapsed time.
    pub fn value(&self) -> Seconds {
        self.state.read().value
    }

    /// Anchor the clock at the current time and mark it running.
    ///
    /// Starting an already-running clock re-bases the anchor to now. Paired
    /// with `set_value` this is the resume path for callers that recompute
    /// the baseline externally.
    pub fn start(&self) {
        let now = self.time.now_ms();
        let mut state = self.state.write();
        state.started_at_ms = Some(now);
        state.status = ClockStatus::Running;
        tracing::debug!(clock_id = self.clock_id, value = state.value, "clock started");
    }

    /// Freeze the live reading into the baseline and mark the clock paused.
    pub fn pause(&self) {
        self.freeze(ClockStatus::Paused);
    }

    /// Freeze the live reading into the baseline and mark the clock stopped.
    ///
    /// A stopped clock keeps its last reading; it does not reset to zero.
    pub fn stop(&self) {
        self.freeze(ClockStatus::Stopped);
    }

    /// Replace the frozen baseline without touching the anchor. Callers
    /// adjusting a running clock follow up with `start()` to re-base.
    pub fn set_value(&self, value: Seconds) {
        self.state.write().value = value;
    }

    /// The clock's value right now. Pure projection, no side effects: the
    /// baseline plus/minus whole elapsed seconds, clamped to `[0, max_value]`.
    pub fn current_value(&self) -> Seconds {
        let state = self.state.read();
        self.project(&state, self.time.now_ms())
    }

    /// Epoch milliseconds of the last `start()`, `None` unless running.
    pub fn started_at_ms(&self) -> Option<i64> {
        self.state.read().started_at_ms
    }

    fn freeze(&self, status: ClockStatus) {
        let now = self.time.now_ms();
        let mut state = self.state.write();
        state.value = self.project(&state, now);
        state.status = status;
        state.started_at_ms = None;
        tracing::debug!(
            clock_id = self.clock_id,
            value = state.value,
            status = ?status,
            "clock frozen"
        );
    }

    fn project(&self, state: &ClockState, now_ms: i64) -> Seconds {
        let Some(started_at_ms) = state.started_at_ms else {
            return state.value;
        };
        // Whole seconds, truncated: 1999ms elapsed reads as 1. A wall clock
        // moved backwards reads as 0 elapsed rather than inflating anything.
        let elapsed = ((now_ms - started_at_ms).max(0) / 1000).min(i64::from(u32::MAX)) as Seconds;
        match self.direction {
            ClockDirection::Down => state.value.saturating_sub(elapsed),
            ClockDirection::Up => state.value.saturating_add(elapsed).min(self.max_value),
        }
    }
}

impl RunningClock for ClockStateMachine {
    fn started_at_ms(&self) -> Option<i64> {
        ClockStateMachine::started_at_ms(self)
    }

    fn current_value(&self) -> Seconds {
        ClockStateMachine::current_value(self)
    }
}
