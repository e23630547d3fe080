//! First-to-settle selection.

use crate::errors::FlowResult;
use futures::future;
use std::future::Future;

/// Starts every task and returns the outcome of whichever settles first,
/// success or failure.
///
/// There is no cancellation check before dispatch: once the batch is
/// running, the first settler decides the outcome and a pre-check would add
/// nothing. The losing tasks are dropped. An empty batch never settles; wrap
/// it in [`timeout`](super::timeout) if that matters.
pub async fn race<I, F, Fut, T>(tasks: I) -> FlowResult<T>
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = FlowResult<T>>,
{
    let running: Vec<_> = tasks.into_iter().map(|task| Box::pin(task())).collect();

    if running.is_empty() {
        return future::pending().await;
    }

    let (outcome, _index, _losers) = future::select_all(running).await;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinators::{task, BoxTask};
    use crate::errors::FlowError;
    use std::time::Duration;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn test_race_fastest_success_wins() {
        let tasks: Vec<BoxTask<'_, &str>> = vec![
            task(|| async {
                sleep(Duration::from_millis(50)).await;
                Ok("slow")
            }),
            task(|| async {
                sleep(Duration::from_millis(10)).await;
                Ok("fast")
            }),
        ];

        assert_eq!(race(tasks).await.unwrap(), "fast");
    }

    #[tokio::test(start_paused = true)]
    async fn test_race_fastest_failure_wins() {
        let tasks: Vec<BoxTask<'_, &str>> = vec![
            task(|| async {
                sleep(Duration::from_millis(50)).await;
                Ok("slow")
            }),
            task(|| async {
                sleep(Duration::from_millis(10)).await;
                Err(FlowError::msg("fast failure"))
            }),
        ];

        assert_eq!(race(tasks).await.unwrap_err().to_string(), "fast failure");
    }

    #[tokio::test(start_paused = true)]
    async fn test_race_empty_never_settles() {
        let tasks: Vec<BoxTask<'_, i32>> = Vec::new();
        let outcome = tokio::time::timeout(Duration::from_secs(5), race(tasks)).await;
        assert!(outcome.is_err());
    }
}
