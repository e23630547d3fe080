//! Strictly ordered, one-at-a-time execution.

use crate::cancellation::CancellationToken;
use crate::errors::FlowResult;
use std::future::Future;

/// Runs tasks one after another, in input order.
///
/// Before each task the token is checked; once it has fired the combinator
/// fails with [`FlowError::Cancelled`](crate::errors::FlowError::Cancelled)
/// and the remaining tasks are never started. The first task failure aborts
/// the sequence the same way.
pub async fn sequence<I, F, Fut, T>(token: &CancellationToken, tasks: I) -> FlowResult<Vec<T>>
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = FlowResult<T>>,
{
    let tasks = tasks.into_iter();
    let mut results = Vec::with_capacity(tasks.size_hint().0);

    for task in tasks {
        token.check()?;
        results.push(task().await?);
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::FireReason;
    use crate::errors::FlowError;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_sequence_runs_in_order_without_overlap() {
        let token = CancellationToken::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        // Earlier tasks are slower, so any overlap would interleave the log.
        let tasks = (0..3u64).map(|i| {
            let log = log.clone();
            move || async move {
                log.lock().push(format!("start {i}"));
                tokio::time::sleep(Duration::from_millis(30 - i * 10)).await;
                log.lock().push(format!("end {i}"));
                Ok::<_, FlowError>(i)
            }
        });

        let results = sequence(&token, tasks).await.unwrap();

        assert_eq!(results, vec![0, 1, 2]);
        assert_eq!(
            *log.lock(),
            vec!["start 0", "end 0", "start 1", "end 1", "start 2", "end 2"]
        );
    }

    #[tokio::test]
    async fn test_sequence_pre_fired_starts_nothing() {
        let token = CancellationToken::new();
        token.fire(FireReason::Cancelled);
        let started = Arc::new(Mutex::new(0));

        let tasks = (0..3).map(|_| {
            let started = started.clone();
            move || async move {
                *started.lock() += 1;
                Ok::<_, FlowError>(())
            }
        });

        assert!(sequence(&token, tasks).await.unwrap_err().is_cancelled());
        assert_eq!(*started.lock(), 0);
    }

    #[tokio::test]
    async fn test_sequence_stops_after_fire_mid_way() {
        let token = Arc::new(CancellationToken::new());
        let started = Arc::new(Mutex::new(Vec::new()));

        let tasks = (0..4).map(|i| {
            let started = started.clone();
            let token = token.clone();
            move || async move {
                started.lock().push(i);
                if i == 1 {
                    token.fire(FireReason::Cancelled);
                }
                Ok::<_, FlowError>(i)
            }
        });

        let err = sequence(&token, tasks).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(*started.lock(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_sequence_first_error_aborts() {
        let token = CancellationToken::new();
        let started = Arc::new(Mutex::new(Vec::new()));

        let tasks = (0..3).map(|i| {
            let started = started.clone();
            move || async move {
                started.lock().push(i);
                if i == 1 {
                    Err(FlowError::msg("second failed"))
                } else {
                    Ok(i)
                }
            }
        });

        let err = sequence(&token, tasks).await.unwrap_err();
        assert_eq!(err.to_string(), "second failed");
        assert_eq!(*started.lock(), vec![0, 1]);
    }
}
