//! Metrics collection for the ClockOrchestrator

use matchclock::ClockKind;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Snapshot of the orchestrator's runtime metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorMetrics {
    /// Number of the most recent scan pass
    pub current_pass: u64,

    /// Duration of the last scan pass in nanoseconds
    pub pass_duration_ns: u64,

    /// Current scan rate in Hz
    pub pass_rate_hz: f64,

    /// Number of registered play clocks
    pub active_playclocks: u32,

    /// Number of registered game clocks
    pub active_gameclocks: u32,

    /// Average scan pass duration in nanoseconds
    pub avg_pass_duration_ns: u64,

    /// Maximum scan pass duration in nanoseconds
    pub max_pass_duration_ns: u64,

    /// 95th percentile scan pass duration in nanoseconds
    pub p95_pass_duration_ns: u64,

    /// 99th percentile scan pass duration in nanoseconds
    pub p99_pass_duration_ns: u64,

    /// Orchestrator uptime in seconds
    pub uptime_seconds: u64,

    /// Total scan passes completed
    pub total_passes: u64,

    /// Total update callbacks dispatched
    pub total_updates_dispatched: u64,

    /// Total stop callbacks dispatched
    pub total_stops_dispatched: u64,

    /// Total callback failures observed
    pub total_callback_failures: u64,
}

/// Metrics collector for the ClockOrchestrator
pub struct MetricsCollector {
    // Pass metrics
    current_pass: AtomicU64,
    pass_durations: Vec<AtomicU64>,
    max_pass_duration: AtomicU64,
    total_passes: AtomicU64,

    // Clock metrics
    active_playclocks: AtomicU64,
    active_gameclocks: AtomicU64,

    // Dispatch metrics
    total_updates_dispatched: AtomicU64,
    total_stops_dispatched: AtomicU64,
    total_callback_failures: AtomicU64,

    // Timing
    start_time: Instant,

    // Configuration
    history_size: usize,
}

impl MetricsCollector {
    /// Create a new metrics collector keeping `history_size` pass durations
    pub fn new(history_size: usize) -> Self {
        let mut durations = Vec::with_capacity(history_size);
        for _ in 0..history_size {
            durations.push(AtomicU64::new(0));
        }

        Self {
            current_pass: AtomicU64::new(0),
            pass_durations: durations,
            max_pass_duration: AtomicU64::new(0),
            total_passes: AtomicU64::new(0),
            active_playclocks: AtomicU64::new(0),
            active_gameclocks: AtomicU64::new(0),
            total_updates_dispatched: AtomicU64::new(0),
            total_stops_dispatched: AtomicU64::new(0),
            total_callback_failures: AtomicU64::new(0),
            start_time: Instant::now(),
            history_size,
        }
    }

    /// Record a completed scan pass
    pub fn record_pass(&self, pass: u64, duration: Duration) {
        let duration_ns = duration.as_nanos() as u64;
        let index = (pass as usize) % self.history_size;

        self.current_pass.store(pass, Ordering::Relaxed);
        self.pass_durations[index].store(duration_ns, Ordering::Relaxed);
        self.total_passes.fetch_add(1, Ordering::Relaxed);

        // Update max duration
        let mut max_duration = self.max_pass_duration.load(Ordering::Relaxed);
        while duration_ns > max_duration {
            match self.max_pass_duration.compare_exchange_weak(
                max_duration,
                duration_ns,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => max_duration = current,
            }
        }
    }

    /// Update the registered clock count for one kind
    pub fn update_active_clocks(&self, kind: ClockKind, count: usize) {
        let gauge = match kind {
            ClockKind::Play => &self.active_playclocks,
            ClockKind::Game => &self.active_gameclocks,
        };
        gauge.store(count as u64, Ordering::Relaxed);
    }

    /// Record an update callback dispatch
    pub fn record_update_dispatched(&self) {
        self.total_updates_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a stop callback dispatch
    pub fn record_stop_dispatched(&self) {
        self.total_stops_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a callback failure
    pub fn record_callback_failure(&self) {
        self.total_callback_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics
    pub fn get_metrics(&self) -> OrchestratorMetrics {
        let current_pass = self.current_pass.load(Ordering::Relaxed);
        let uptime = self.start_time.elapsed().as_secs();

        // Scan rate (passes per second)
        let pass_rate_hz = if uptime > 0 {
            self.total_passes.load(Ordering::Relaxed) as f64 / uptime as f64
        } else {
            0.0
        };

        // Last pass duration
        let last_index = (current_pass as usize) % self.history_size;
        let pass_duration_ns = self.pass_durations[last_index].load(Ordering::Relaxed);

        // Statistics over recent history
        let mut durations: Vec<u64> = self
            .pass_durations
            .iter()
            .map(|d| d.load(Ordering::Relaxed))
            .filter(|&d| d > 0)
            .collect();

        durations.sort_unstable();

        let avg_pass_duration_ns = if !durations.is_empty() {
            durations.iter().sum::<u64>() / durations.len() as u64
        } else {
            0
        };

        let p95_pass_duration_ns = percentile(&durations, 0.95);
        let p99_pass_duration_ns = percentile(&durations, 0.99);

        OrchestratorMetrics {
            current_pass,
            pass_duration_ns,
            pass_rate_hz,
            active_playclocks: self.active_playclocks.load(Ordering::Relaxed) as u32,
            active_gameclocks: self.active_gameclocks.load(Ordering::Relaxed) as u32,
            avg_pass_duration_ns,
            max_pass_duration_ns: self.max_pass_duration.load(Ordering::Relaxed),
            p95_pass_duration_ns,
            p99_pass_duration_ns,
            uptime_seconds: uptime,
            total_passes: self.total_passes.load(Ordering::Relaxed),
            total_updates_dispatched: self.total_updates_dispatched.load(Ordering::Relaxed),
            total_stops_dispatched: self.total_stops_dispatched.load(Ordering::Relaxed),
            total_callback_failures: self.total_callback_failures.load(Ordering::Relaxed),
        }
    }

    /// Reset all metrics
    pub fn reset(&self) {
        self.current_pass.store(0, Ordering::Relaxed);
        self.max_pass_duration.store(0, Ordering::Relaxed);
        self.total_passes.store(0, Ordering::Relaxed);
        self.active_playclocks.store(0, Ordering::Relaxed);
        self.active_gameclocks.store(0, Ordering::Relaxed);
        self.total_updates_dispatched.store(0, Ordering::Relaxed);
        self.total_stops_dispatched.store(0, Ordering::Relaxed);
        self.total_callback_failures.store(0, Ordering::Relaxed);

        for duration in self.pass_durations.iter() {
            duration.store(0, Ordering::Relaxed);
        }
    }
}

fn percentile(sorted: &[u64], q: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let index = (sorted.len() as f64 * q) as usize;
    sorted[index.min(sorted.len() - 1)]
}
