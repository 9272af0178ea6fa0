//! Error types for the ClockOrchestrator

use matchclock::{ClockId, ClockKind};
use thiserror::Error;

/// Errors surfaced by the orchestrator.
///
/// Registration and unregistration never fail; these cover configuration
/// problems and the loop's own failure reporting.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{} {clock_id} callback failed: {source}", .kind.as_str())]
    CallbackFailed {
        kind: ClockKind,
        clock_id: ClockId,
        #[source]
        source: anyhow::Error,
    },

    #[error("Scheduling loop halted: {0}")]
    LoopHalted(String),
}
