//! Cancellation-aware task combinators.
//!
//! Every combinator takes zero-argument closures that start one unit of work
//! when invoked. The token is consulted only at dispatch boundaries: before
//! each task of a [`sequence`], before each slot of a [`parallel`] batch and
//! before every [`retry`] attempt. A running task is never interrupted by the
//! combinators themselves; tasks that want to stop early must watch the token.
//!
//! [`race`] and [`timeout`] do not consult the token at all.

mod parallel;
mod race;
mod retry;
mod sequence;
mod timeout;

pub use parallel::parallel;
pub use race::race;
pub use retry::retry;
pub use sequence::sequence;
pub use timeout::timeout;

use crate::errors::FlowResult;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;

/// A type-erased task, for mixing different closures in one batch.
pub type BoxTask<'a, T> = Box<dyn FnOnce() -> BoxFuture<'a, FlowResult<T>> + Send + 'a>;

/// Boxes a task closure into a [`BoxTask`].
pub fn task<'a, F, Fut, T>(f: F) -> BoxTask<'a, T>
where
    F: FnOnce() -> Fut + Send + 'a,
    Fut: Future<Output = FlowResult<T>> + Send + 'a,
{
    Box::new(move || f().boxed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancellationToken;

    #[tokio::test]
    async fn test_boxed_tasks_mix_closures() {
        let token = CancellationToken::new();
        let offset = 10;
        let tasks: Vec<BoxTask<'_, i32>> = vec![
            task(|| async { Ok(1) }),
            task(move || async move { Ok(offset + 1) }),
        ];

        let results = parallel(&token, tasks).await.unwrap();
        assert_eq!(results, vec![1, 11]);
    }
}
