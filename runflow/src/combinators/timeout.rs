//! Deadline for a single task.

use crate::errors::{FlowError, FlowResult};
use std::future::Future;
use std::time::Duration;

/// Runs `task` against a deadline.
///
/// If the deadline passes first the combinator fails with
/// [`FlowError::Timeout`] and the task is abandoned, not stopped; a task that
/// needs to stop its own work should watch the run's token. Whichever side
/// loses is dropped, so no timer outlives the call.
pub async fn timeout<F, Fut, T>(duration: Duration, task: F) -> FlowResult<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = FlowResult<T>>,
{
    match tokio::time::timeout(duration, task()).await {
        Ok(outcome) => outcome,
        Err(_) => Err(FlowError::Timeout(duration)),
    }
}
