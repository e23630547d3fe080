//! Fixed-delay retry.

use crate::cancellation::CancellationToken;
use crate::config::RetryPolicy;
use crate::errors::{FlowError, FlowResult};
use std::future::Future;
use tracing::debug;

/// Invokes `task` until it succeeds or the policy's attempts are exhausted.
///
/// The token is checked before every attempt, including the first. Between
/// attempts the combinator waits the policy's fixed delay; if the token fires
/// during that wait the delay is abandoned and [`FlowError::Cancelled`] is
/// returned. When all attempts fail, the last error is returned.
pub async fn retry<F, Fut, T>(
    token: &CancellationToken,
    policy: RetryPolicy,
    mut task: F,
) -> FlowResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = FlowResult<T>>,
{
    let max_attempts = policy.attempts();
    let mut attempt = 0;

    loop {
        token.check()?;
        attempt += 1;

        let error = match task().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if attempt >= max_attempts {
            debug!(attempt, error = %error, "Retry attempts exhausted");
            return Err(error);
        }

        debug!(
            attempt,
            max_attempts,
            delay_ms = policy.delay_ms,
            error = %error,
            "Retrying after error"
        );

        tokio::select! {
            () = tokio::time::sleep(policy.delay()) => {}
            () = token.fired() => return Err(FlowError::Cancelled),
        }
    }
}
