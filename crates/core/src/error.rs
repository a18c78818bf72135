use thiserror::Error;

/// Unified error type for the matching engine and its dependent crates.
///
/// Per-persona and per-pair failures are contained by the orchestrator and
/// never reach callers as an `Err`; only structural invariant violations and
/// malformed input propagate out of `run_engine_tick`.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("transient dependency failure: {0}")]
    TransientDependency(String),

    #[error("skipped: {reason}")]
    Skipped { reason: String },

    #[error("partial run: {completed} of {planned} sweeps completed before budget exceeded")]
    PartialRun { completed: usize, planned: usize },

    #[error("fatal: {0}")]
    Fatal(String),
}

impl EngineError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        EngineError::InvalidInput(msg.into())
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        EngineError::TransientDependency(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        EngineError::Fatal(msg.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::TransientDependency(_))
    }
}
