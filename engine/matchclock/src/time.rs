use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Source of current epoch milliseconds.
///
/// Every state machine and the orchestrator that polls them must share one
/// source, so that `start()` anchors and due-second checks agree. This is
/// wall-clock time, not a monotonic reading: a persisted anchor has to stay
/// comparable across process restarts.
pub trait TimeSource: Send + Sync {
    /// Current epoch time in milliseconds.
    fn now_ms(&self) -> i64;

    /// Name of this source for debugging.
    fn name(&self) -> &str {
        "TimeSource"
    }
}

/// Real wall-clock time for production use.
#[derive(Debug, Default)]
pub struct SystemTimeSource;

impl SystemTimeSource {
    pub fn new() -> Self {
        Self
    }
}

impl TimeSource for SystemTimeSource {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn name(&self) -> &str {
        "SystemTimeSource"
    }
}

/// Manually driven time for deterministic tests.
///
/// Only advances when explicitly moved.
#[derive(Debug)]
pub struct ManualTimeSource {
    now_ms: AtomicI64,
}

impl ManualTimeSource {
    pub fn new(start_ms: i64) -> Self {
        Self { now_ms: AtomicI64::new(start_ms) }
    }

    /// Set the current time to an absolute value.
    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    /// Move the current time forward (or backward, with a negative delta).
    pub fn advance(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "ManualTimeSource"
    }
}
