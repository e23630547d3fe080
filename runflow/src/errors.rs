//! Error types for runflow.
//!
//! The taxonomy is deliberately small: a run is either cancelled, timed out
//! inside a `timeout` combinator, or failed with whatever the caller's task
//! produced.

use std::time::Duration;
use thiserror::Error;

/// The error type produced by combinators and task functions.
#[derive(Debug, Error)]
pub enum FlowError {
    /// The cancellation token of the current run has fired.
    #[error("Flow cancelled")]
    Cancelled,

    /// A `timeout` combinator's deadline elapsed before its task settled.
    #[error("Timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// A failure raised by a caller-supplied task, passed through unmodified.
    #[error(transparent)]
    Task(#[from] anyhow::Error),
}

impl FlowError {
    /// Wraps an arbitrary task failure.
    pub fn task<E>(error: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Self::Task(error.into())
    }

    /// Builds a task failure from a plain message.
    pub fn msg(message: impl std::fmt::Display + std::fmt::Debug + Send + Sync + 'static) -> Self {
        Self::Task(anyhow::Error::msg(message))
    }

    /// Returns true for the cancellation marker.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns true if a `timeout` deadline elapsed.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Returns the underlying task error, if this is one.
    #[must_use]
    pub fn as_task(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Task(err) => Some(err),
            _ => None,
        }
    }
}

/// Result alias used throughout the crate.
pub type FlowResult<T> = Result<T, FlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("disk full")]
    struct DiskFull;

    #[test]
    fn test_cancelled_display() {
        assert_eq!(FlowError::Cancelled.to_string(), "Flow cancelled");
        assert!(FlowError::Cancelled.is_cancelled());
    }

    #[test]
    fn test_timeout_display() {
        let err = FlowError::Timeout(Duration::from_millis(50));
        assert_eq!(err.to_string(), "Timed out after 50ms");
        assert!(err.is_timeout());
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_task_error_is_transparent() {
        let err = FlowError::task(DiskFull);
        assert_eq!(err.to_string(), "disk full");
        assert!(err.as_task().unwrap().downcast_ref::<DiskFull>().is_some());
    }

    #[test]
    fn test_task_error_with_cancel_text_is_not_cancelled() {
        let err = FlowError::msg("Flow cancelled");
        assert!(!err.is_cancelled());
        assert_eq!(err.to_string(), FlowError::Cancelled.to_string());
    }

    #[test]
    fn test_from_anyhow() {
        let err: FlowError = anyhow::anyhow!("boom").into();
        assert_eq!(err.to_string(), "boom");
    }
}
