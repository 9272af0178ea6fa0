//! # ClockOrchestrator
//!
//! The shared heartbeat that advances game clocks and play clocks for every
//! match in the process.
//!
//! A single cooperative loop scans all registered clocks on a fixed interval,
//! dispatches at most one update per clock per elapsed second, and retires
//! clocks the moment they read zero. Persistence and notification side
//! effects live entirely in caller-supplied callbacks; the orchestrator owns
//! nothing beyond its in-memory bookkeeping.

pub mod config;
pub mod error;
pub mod metrics;
pub mod orchestrator;

#[cfg(test)]
mod tests;


pub use config::{ErrorRecovery, MonitoringConfig, OrchestratorConfig};
pub use error::OrchestratorError;
pub use metrics::{MetricsCollector, OrchestratorMetrics};
pub use orchestrator::{ClockCallback, ClockOrchestrator};

/// Re-export commonly used types
pub use matchclock::{ClockId, ClockKind, RunningClock, Seconds, TimeSource};

/// Current version of the orchestrator
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default scan interval (10Hz = 100ms between passes)
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

/// Default metrics emission interval
pub const DEFAULT_METRICS_INTERVAL_MS: u64 = 1000;

/// Default health check interval
pub const DEFAULT_HEALTH_CHECK_INTERVAL_MS: u64 = 5000;
