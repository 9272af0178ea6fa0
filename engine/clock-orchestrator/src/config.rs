//! Configuration for the ClockOrchestrator

use crate::error::OrchestratorError;
use crate::{
    DEFAULT_HEALTH_CHECK_INTERVAL_MS, DEFAULT_METRICS_INTERVAL_MS, DEFAULT_TICK_INTERVAL_MS,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the ClockOrchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Scan pass interval in milliseconds (default: 100ms = 10Hz)
    pub tick_interval_ms: u64,

    /// What to do when a clock's callback fails
    pub error_recovery: ErrorRecovery,

    /// Metrics emission interval in milliseconds
    pub metrics_interval_ms: u64,

    /// Monitoring configuration
    pub monitoring: MonitoringConfig,
}

/// What happens to the shared loop when one clock's callback fails
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ErrorRecovery {
    /// Log the failure and keep scanning the remaining clocks
    Continue,
    /// Record the failure and shut the loop down
    Halt,
}

/// Monitoring and observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Enable periodic metrics emission from the loop
    pub emit_metrics: bool,

    /// Health check interval in milliseconds
    pub health_check_interval_ms: u64,

    /// Scan pass duration above which the health check warns, in milliseconds
    pub max_pass_duration_ms: u64,

    /// Warn on accumulated callback failures during health checks
    pub alert_on_failures: bool,

    /// Log level for the orchestrator
    pub log_level: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            error_recovery: ErrorRecovery::Continue,
            metrics_interval_ms: DEFAULT_METRICS_INTERVAL_MS,
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            emit_metrics: true,
            health_check_interval_ms: DEFAULT_HEALTH_CHECK_INTERVAL_MS,
            max_pass_duration_ms: 50,
            alert_on_failures: true,
            log_level: "info".to_string(),
        }
    }
}

impl OrchestratorConfig {
    /// Get scan interval as Duration
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Get metrics interval as Duration
    pub fn metrics_interval(&self) -> Duration {
        Duration::from_millis(self.metrics_interval_ms)
    }

    /// Get health check interval as Duration
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.monitoring.health_check_interval_ms)
    }

    /// Get max pass duration as Duration
    pub fn max_pass_duration(&self) -> Duration {
        Duration::from_millis(self.monitoring.max_pass_duration_ms)
    }

    /// Reject configurations the loop cannot run with.
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if self.tick_interval_ms == 0 {
            return Err(OrchestratorError::Config(
                "tick_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.tick_interval_ms > 1000 {
            // A pass gap longer than a second would skip due seconds outright.
            return Err(OrchestratorError::Config(format!(
                "tick_interval_ms {} would miss whole seconds",
                self.tick_interval_ms
            )));
        }
        Ok(())
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: OrchestratorConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
