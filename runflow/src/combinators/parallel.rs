//! Concurrent fan-out with ordered results.

use crate::cancellation::CancellationToken;
use crate::errors::{FlowError, FlowResult};
use futures::future::{self, Either};
use std::future::Future;

/// Runs all tasks concurrently and collects their results in input order.
///
/// The token is checked before each task is started; if it has fired, that
/// slot fails with [`FlowError::Cancelled`] and its closure is never invoked.
/// The first failure to be observed wins and the remaining tasks are
/// abandoned. Failures are not aggregated.
pub async fn parallel<I, F, Fut, T>(token: &CancellationToken, tasks: I) -> FlowResult<Vec<T>>
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = FlowResult<T>>,
{
    let slots: Vec<_> = tasks
        .into_iter()
        .map(|task| {
            if token.is_fired() {
                Either::Left(future::ready(Err(FlowError::Cancelled)))
            } else {
                Either::Right(task())
            }
        })
        .collect();

    future::try_join_all(slots).await
}
