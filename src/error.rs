use std::time::Duration;

use thiserror::Error;

/// Failure classes shared by the predicates, the poller and the sequencer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvergenceError {
    /// The target cannot be observed yet; polling should continue.
    #[error("target not yet observable: {0}")]
    TransientUnavailable(String),

    /// The target was observed in a failed state.
    #[error("target reported failure: {0}")]
    DefinitiveFailure(String),

    /// The underlying command or request could not complete.
    #[error("adapter call failed: {0}")]
    AdapterError(String),

    #[error("invalid configuration: {0}")]
    ConfigurationError(String),

    #[error("deadline of {}s exceeded", .0.as_secs_f64())]
    TimeoutExceeded(Duration),
}

impl ConvergenceError {
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::TransientUnavailable(reason.into())
    }

    pub fn definitive(reason: impl Into<String>) -> Self {
        Self::DefinitiveFailure(reason.into())
    }

    pub fn adapter(reason: impl Into<String>) -> Self {
        Self::AdapterError(reason.into())
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::ConfigurationError(reason.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, ConvergenceError>;
