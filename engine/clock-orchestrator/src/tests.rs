//! Unit tests for the ClockOrchestrator's config, metrics and error types

use std::time::Duration;

use crate::config::{ErrorRecovery, MonitoringConfig};
use crate::{
    OrchestratorConfig, OrchestratorError, DEFAULT_METRICS_INTERVAL_MS, DEFAULT_TICK_INTERVAL_MS,
};

fn create_test_config() -> OrchestratorConfig {
    OrchestratorConfig {
        tick_interval_ms: 10, // 10ms for faster testing
        error_recovery: ErrorRecovery::Continue,
        metrics_interval_ms: 100,
        monitoring: MonitoringConfig {
            emit_metrics: true,
            health_check_interval_ms: 200,
            max_pass_duration_ms: 100,
            alert_on_failures: true,
            log_level: "debug".to_string(),
        },
    }
}

mod config_tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.tick_interval_ms, DEFAULT_TICK_INTERVAL_MS);
        assert_eq!(config.metrics_interval_ms, DEFAULT_METRICS_INTERVAL_MS);
        assert!(matches!(config.error_recovery, ErrorRecovery::Continue));
    }

    #[test]
    fn test_config_duration_conversion() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.tick_interval(), Duration::from_millis(100));
        assert_eq!(config.metrics_interval(), Duration::from_millis(1000));
        assert_eq!(config.health_check_interval(), Duration::from_millis(5000));
        assert_eq!(config.max_pass_duration(), Duration::from_millis(50));
    }

    #[test]
    fn test_config_validation() {
        assert!(OrchestratorConfig::default().validate().is_ok());

        let config = OrchestratorConfig { tick_interval_ms: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(OrchestratorError::Config(_))));

        // A pass gap above one second would skip due seconds
        let config = OrchestratorConfig { tick_interval_ms: 1500, ..Default::default() };
        assert!(config.validate().is_err());

        let config = OrchestratorConfig { tick_interval_ms: 1000, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_error_recovery() {
        let config =
            OrchestratorConfig { error_recovery: ErrorRecovery::Continue, ..Default::default() };
        assert!(matches!(config.error_recovery, ErrorRecovery::Continue));

        let config =
            OrchestratorConfig { error_recovery: ErrorRecovery::Halt, ..Default::default() };
        assert!(matches!(config.error_recovery, ErrorRecovery::Halt));
    }

    #[test]
    fn test_config_serialization() {
        let config = create_test_config();

        let serialized = serde_json::to_string(&config).unwrap();
        let deserialized: OrchestratorConfig = serde_json::from_str(&serialized).unwrap();

        assert_eq!(config.tick_interval_ms, deserialized.tick_interval_ms);
        assert_eq!(config.metrics_interval_ms, deserialized.metrics_interval_ms);
    }

    #[test]
    fn test_config_file_operations() {
        let config = create_test_config();
        let temp_file = std::env::temp_dir().join("clock_orchestrator_test_config.toml");

        assert!(config.to_file(temp_file.to_str().unwrap()).is_ok());

        let loaded_config = OrchestratorConfig::from_file(temp_file.to_str().unwrap()).unwrap();
        assert_eq!(config.tick_interval_ms, loaded_config.tick_interval_ms);
        assert_eq!(
            config.monitoring.max_pass_duration_ms,
            loaded_config.monitoring.max_pass_duration_ms
        );

        let _ = std::fs::remove_file(&temp_file);
    }
}

mod metrics_tests {
    use crate::metrics::MetricsCollector;
    use matchclock::ClockKind;
    use std::time::Duration;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new(100);
        let metrics = collector.get_metrics();

        assert_eq!(metrics.current_pass, 0);
        assert_eq!(metrics.active_playclocks, 0);
        assert_eq!(metrics.active_gameclocks, 0);
        assert_eq!(metrics.total_passes, 0);
    }

    #[test]
    fn test_metrics_recording() {
        let collector = MetricsCollector::new(100);

        collector.record_pass(1, Duration::from_millis(5));
        collector.update_active_clocks(ClockKind::Play, 3);
        collector.update_active_clocks(ClockKind::Game, 2);
        collector.record_update_dispatched();
        collector.record_update_dispatched();
        collector.record_stop_dispatched();

        let metrics = collector.get_metrics();
        assert_eq!(metrics.current_pass, 1);
        assert_eq!(metrics.total_passes, 1);
        assert_eq!(metrics.active_playclocks, 3);
        assert_eq!(metrics.active_gameclocks, 2);
        assert_eq!(metrics.total_updates_dispatched, 2);
        assert_eq!(metrics.total_stops_dispatched, 1);
        assert_eq!(metrics.total_callback_failures, 0);
    }

    #[test]
    fn test_metrics_max_duration() {
        let collector = MetricsCollector::new(100);

        collector.record_pass(1, Duration::from_millis(2));
        collector.record_pass(2, Duration::from_millis(9));
        collector.record_pass(3, Duration::from_millis(4));

        let metrics = collector.get_metrics();
        assert_eq!(metrics.max_pass_duration_ns, Duration::from_millis(9).as_nanos() as u64);
    }

    #[test]
    fn test_metrics_reset() {
        let collector = MetricsCollector::new(100);

        collector.record_pass(5, Duration::from_millis(10));
        collector.update_active_clocks(ClockKind::Play, 5);
        collector.record_callback_failure();

        collector.reset();

        let metrics = collector.get_metrics();
        assert_eq!(metrics.current_pass, 0);
        assert_eq!(metrics.active_playclocks, 0);
        assert_eq!(metrics.total_passes, 0);
        assert_eq!(metrics.total_callback_failures, 0);
    }
}

mod error_handling_tests {
    use super::*;
    use matchclock::ClockKind;

    #[test]
    fn test_orchestrator_error_display() {
        let error = OrchestratorError::Config("bad interval".to_string());
        assert!(error.to_string().contains("bad interval"));

        let error = OrchestratorError::CallbackFailed {
            kind: ClockKind::Play,
            clock_id: 123,
            source: anyhow::anyhow!("database unavailable"),
        };
        let rendered = error.to_string();
        assert!(rendered.contains("playclock"));
        assert!(rendered.contains("123"));
        assert!(rendered.contains("database unavailable"));

        let error = OrchestratorError::LoopHalted("callback policy".to_string());
        assert!(error.to_string().contains("halted"));
    }

    #[test]
    fn test_callback_error_source_chain() {
        let error = OrchestratorError::CallbackFailed {
            kind: ClockKind::Game,
            clock_id: 7,
            source: anyhow::anyhow!("timeout"),
        };
        let source = std::error::Error::source(&error);
        assert!(source.is_some());
        assert!(source.unwrap().to_string().contains("timeout"));
    }
}
