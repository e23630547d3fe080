//! The per-run orchestration context.

use crate::cancellation::{CancellationToken, FireReason};
use crate::combinators;
use crate::config::RetryPolicy;
use crate::errors::FlowResult;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Combinators bound to one run's cancellation token.
///
/// The context only reads the token. Firing it is reserved to whoever owns
/// the run, normally a [`FlowRunner`](crate::runner::FlowRunner). Clones
/// share the same token.
#[derive(Debug, Clone)]
pub struct FlowContext {
    token: Arc<CancellationToken>,
    run_id: Uuid,
    run_number: u64,
    started_at: DateTime<Utc>,
    retry_policy: RetryPolicy,
}

impl FlowContext {
    /// Creates a context over an existing token.
    #[must_use]
    pub fn new(token: Arc<CancellationToken>) -> Self {
        Self {
            token,
            run_id: Uuid::new_v4(),
            run_number: 0,
            started_at: Utc::now(),
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Sets the run number.
    #[must_use]
    pub fn with_run_number(mut self, run_number: u64) -> Self {
        self.run_number = run_number;
        self
    }

    /// Sets the policy used by [`FlowContext::retry`].
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Returns the unique id of this run.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the 1-based run number within its runner (0 if standalone).
    #[must_use]
    pub fn run_number(&self) -> u64 {
        self.run_number
    }

    /// Returns when the run started.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns the default retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    /// Returns whether the run's token has fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_fired()
    }

    /// Returns why the token fired, if it has.
    #[must_use]
    pub fn cancel_reason(&self) -> Option<FireReason> {
        self.token.reason()
    }

    /// Fails with `Cancelled` once the token has fired. Use inside long tasks.
    pub fn check(&self) -> FlowResult<()> {
        self.token.check()
    }

    /// Resolves once the token fires.
    pub async fn cancelled(&self) {
        self.token.fired().await;
    }

    /// Registers an observer for the token fire.
    pub fn on_cancel<F>(&self, callback: F)
    where
        F: FnOnce(FireReason) + Send + 'static,
    {
        self.token.on_fire(callback);
    }

    /// See [`combinators::parallel`].
    pub async fn parallel<I, F, Fut, T>(&self, tasks: I) -> FlowResult<Vec<T>>
    where
        I: IntoIterator<Item = F>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = FlowResult<T>>,
    {
        combinators::parallel(&self.token, tasks).await
    }

    /// See [`combinators::sequence`].
    pub async fn sequence<I, F, Fut, T>(&self, tasks: I) -> FlowResult<Vec<T>>
    where
        I: IntoIterator<Item = F>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = FlowResult<T>>,
    {
        combinators::sequence(&self.token, tasks).await
    }

    /// See [`combinators::race`]. The token is not consulted.
    pub async fn race<I, F, Fut, T>(&self, tasks: I) -> FlowResult<T>
    where
        I: IntoIterator<Item = F>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = FlowResult<T>>,
    {
        combinators::race(tasks).await
    }

    /// Retries `task` with the context's default policy.
    pub async fn retry<F, Fut, T>(&self, task: F) -> FlowResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = FlowResult<T>>,
    {
        combinators::retry(&self.token, self.retry_policy, task).await
    }

    /// Retries `task` with an explicit policy.
    pub async fn retry_with<F, Fut, T>(&self, policy: RetryPolicy, task: F) -> FlowResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = FlowResult<T>>,
    {
        combinators::retry(&self.token, policy, task).await
    }

    /// See [`combinators::timeout`].
    pub async fn timeout<F, Fut, T>(&self, duration: Duration, task: F) -> FlowResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FlowResult<T>>,
    {
        combinators::timeout(duration, task).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FlowError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn context() -> (Arc<CancellationToken>, FlowContext) {
        let token = Arc::new(CancellationToken::new());
        let ctx = FlowContext::new(token.clone())
            .with_run_number(1)
            .with_retry_policy(RetryPolicy::new(2, Duration::from_millis(1)));
        (token, ctx)
    }

    #[tokio::test]
    async fn test_context_reflects_token() {
        let (token, ctx) = context();
        assert!(!ctx.is_cancelled());
        assert!(ctx.check().is_ok());

        token.fire(FireReason::Superseded);

        assert!(ctx.is_cancelled());
        assert_eq!(ctx.cancel_reason(), Some(FireReason::Superseded));
        assert!(ctx.check().unwrap_err().is_cancelled());
        ctx.cancelled().await;
    }

    #[tokio::test]
    async fn test_clones_share_token() {
        let (token, ctx) = context();
        let clone = ctx.clone();
        token.fire(FireReason::Cancelled);
        assert!(clone.is_cancelled());
        assert_eq!(clone.run_id(), ctx.run_id());
    }

    #[tokio::test]
    async fn test_nested_combinators() {
        let (_token, ctx) = context();

        let results = ctx
            .sequence((1..=2).map(|i| move || async move { Ok::<_, FlowError>(i) }))
            .await
            .unwrap();
        assert_eq!(results, vec![1, 2]);

        let calls = AtomicUsize::new(0);
        let value = ctx
            .timeout(Duration::from_secs(1), || {
                ctx.retry(|| {
                    let attempt = calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if attempt == 0 {
                            Err(FlowError::msg("transient"))
                        } else {
                            Ok("recovered")
                        }
                    }
                })
            })
            .await
            .unwrap();

        assert_eq!(value, "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_uses_context_policy() {
        let (_token, ctx) = context();
        let calls = AtomicUsize::new(0);

        let result: FlowResult<()> = ctx
            .retry(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(FlowError::msg("always")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_on_cancel_observer() {
        let (token, ctx) = context();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();
        ctx.on_cancel(move |_| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
        });

        token.fire(FireReason::Teardown);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
