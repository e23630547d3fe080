//! The run lifecycle state machine.

use super::{DependencySnapshot, FlowStatus};
use crate::cancellation::{CancellationToken, FireReason};
use crate::config::FlowConfig;
use crate::context::FlowContext;
use crate::errors::{FlowError, FlowResult};
use crate::events::{
    EventSink, LoggingEventSink, NoOpEventSink, FLOW_CANCELLED, FLOW_FAILED, FLOW_STARTED,
    FLOW_SUCCEEDED,
};
use chrono::Utc;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// The type-erased task function a runner invokes once per run.
pub type TaskFn<T> = Arc<dyn Fn(FlowContext) -> BoxFuture<'static, FlowResult<T>> + Send + Sync>;

/// Called with the error of every run that ends in `error`.
pub type ErrorCallback = Arc<dyn Fn(&FlowError) + Send + Sync>;

/// Called once after every run, whatever its outcome.
pub type FinallyCallback = Arc<dyn Fn() + Send + Sync>;

/// Mutable state of a runner, guarded by one lock.
struct RunState<T> {
    status: FlowStatus,
    result: Option<T>,
    error: Option<Arc<FlowError>>,
    /// Token of the most recent run.
    token: Option<Arc<CancellationToken>>,
    /// Number of the most recent run.
    run_number: u64,
    live: bool,
    deps: DependencySnapshot,
}

impl<T> Default for RunState<T> {
    fn default() -> Self {
        Self {
            status: FlowStatus::Idle,
            result: None,
            error: None,
            token: None,
            run_number: 0,
            live: true,
            deps: DependencySnapshot::new(),
        }
    }
}

struct Shared<T> {
    task: TaskFn<T>,
    config: FlowConfig,
    on_error: Option<ErrorCallback>,
    on_finally: Option<FinallyCallback>,
    sink: Arc<dyn EventSink>,
    state: Mutex<RunState<T>>,
}

/// How a run settled.
enum Settled<T> {
    Succeeded(T),
    Failed(Arc<FlowError>),
    Cancelled(FireReason),
}

/// Runs a task function with a fresh [`FlowContext`] per invocation.
///
/// Starting a run supersedes the one in flight: its token fires and its late
/// settlement is classified as cancelled without touching `result` or
/// `error`. Handles are cheap to clone and share one state, so a clone can
/// [`cancel`](FlowRunner::cancel) while another awaits [`run`](FlowRunner::run).
pub struct FlowRunner<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for FlowRunner<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> FlowRunner<T>
where
    T: Clone + Send + 'static,
{
    /// Creates a runner with the default configuration.
    pub fn new<F, Fut>(task: F) -> Self
    where
        F: Fn(FlowContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FlowResult<T>> + Send + 'static,
    {
        Self::builder(task).build()
    }

    /// Starts building a runner around `task`.
    pub fn builder<F, Fut>(task: F) -> FlowRunnerBuilder<T>
    where
        F: Fn(FlowContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FlowResult<T>> + Send + 'static,
    {
        FlowRunnerBuilder::new(Arc::new(move |ctx| task(ctx).boxed()))
    }

    /// Starts a new run and waits for it to settle.
    ///
    /// Returns the value on success and `None` when the run failed, was
    /// cancelled or superseded, or the scope has been torn down.
    ///
    /// Dropping the returned future before it completes cancels the run: its
    /// token fires, a still-current run becomes `cancelled` and the finally
    /// callback runs.
    pub async fn run(&self) -> Option<T> {
        let (token, ctx) = self.begin()?;
        let guard = SettleGuard {
            runner: self,
            token: Some(token),
            ctx,
        };
        let outcome = (self.shared.task)(guard.ctx.clone()).await;
        guard.finish(outcome)
    }

    /// Cancels the run in flight.
    ///
    /// The status becomes `cancelled` immediately, before the task settles.
    /// Returns false if no run was in flight.
    pub fn cancel(&self) -> bool {
        let token = {
            let mut state = self.shared.state.lock();
            if !state.status.is_running() {
                return false;
            }
            state.status = FlowStatus::Cancelled;
            state.token.clone()
        };

        if let Some(token) = token {
            token.fire(FireReason::Cancelled);
        }
        true
    }

    /// Signals that the owning scope is going away.
    ///
    /// Fires the current token without forcing a status change. Settlements
    /// arriving afterwards no longer touch the state and new runs are refused.
    pub fn teardown(&self) {
        let token = {
            let mut state = self.shared.state.lock();
            state.live = false;
            state.token.clone()
        };

        if let Some(token) = token {
            token.fire(FireReason::Teardown);
        }
    }

    /// Records the host's current dependency values.
    ///
    /// Returns true when the values differ from the previous snapshot and
    /// auto-run is enabled; the host is then expected to call [`run`](Self::run).
    pub fn track_dependencies(&self, deps: Vec<serde_json::Value>) -> bool {
        let changed = self.shared.state.lock().deps.update(deps);
        changed && self.shared.config.auto_run
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> FlowStatus {
        self.shared.state.lock().status
    }

    /// Returns the value of the last successful run.
    #[must_use]
    pub fn result(&self) -> Option<T> {
        self.shared.state.lock().result.clone()
    }

    /// Returns the error of the last failed run.
    #[must_use]
    pub fn error(&self) -> Option<Arc<FlowError>> {
        self.shared.state.lock().error.clone()
    }

    /// Returns true while a run is in flight.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status().is_running()
    }

    /// Returns false once [`teardown`](Self::teardown) was called.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.shared.state.lock().live
    }

    /// Returns how many runs have been started.
    #[must_use]
    pub fn run_count(&self) -> u64 {
        self.shared.state.lock().run_number
    }

    /// Returns the runner's configuration.
    #[must_use]
    pub fn config(&self) -> &FlowConfig {
        &self.shared.config
    }

    fn begin(&self) -> Option<(Arc<CancellationToken>, FlowContext)> {
        let token = Arc::new(CancellationToken::new());

        let (previous, ctx) = {
            let mut state = self.shared.state.lock();
            if !state.live {
                debug!("Run requested after teardown, ignoring");
                return None;
            }
            let previous = state.token.replace(token.clone());
            state.run_number += 1;
            state.status = FlowStatus::Running;
            state.result = None;
            state.error = None;

            let ctx = FlowContext::new(token.clone())
                .with_run_number(state.run_number)
                .with_retry_policy(self.shared.config.retry);
            (previous, ctx)
        };

        if let Some(previous) = previous {
            if previous.fire(FireReason::Superseded) {
                debug!(run = ctx.run_number(), "Superseded previous run");
            }
        }

        self.emit(FLOW_STARTED, &ctx, None);
        Some((token, ctx))
    }

    fn settle(
        &self,
        token: &CancellationToken,
        ctx: &FlowContext,
        outcome: FlowResult<T>,
    ) -> Option<T> {
        let settled = {
            let mut state = self.shared.state.lock();
            let latest = state.run_number == ctx.run_number();
            let current = latest && state.live && state.status.is_running();

            if token.is_fired() || !current {
                if current {
                    state.status = FlowStatus::Cancelled;
                }
                // The fire may still be in progress on another handle.
                let reason = token.reason().unwrap_or(if !latest {
                    FireReason::Superseded
                } else if !state.live {
                    FireReason::Teardown
                } else {
                    FireReason::Cancelled
                });
                Settled::Cancelled(reason)
            } else {
                match outcome {
                    Ok(value) => {
                        state.status = FlowStatus::Success;
                        state.result = Some(value.clone());
                        Settled::Succeeded(value)
                    }
                    Err(error) => {
                        let error = Arc::new(error);
                        state.status = FlowStatus::Error;
                        state.error = Some(error.clone());
                        Settled::Failed(error)
                    }
                }
            }
        };

        let value = match settled {
            Settled::Succeeded(value) => {
                self.emit(FLOW_SUCCEEDED, ctx, None);
                Some(value)
            }
            Settled::Failed(error) => {
                self.emit(FLOW_FAILED, ctx, Some(("error", json!(error.to_string()))));
                if let Some(on_error) = &self.shared.on_error {
                    guarded("error", || on_error(error.as_ref()));
                }
                None
            }
            Settled::Cancelled(reason) => {
                self.emit(FLOW_CANCELLED, ctx, Some(("reason", json!(reason))));
                None
            }
        };

        if let Some(on_finally) = &self.shared.on_finally {
            guarded("finally", || on_finally());
        }
        value
    }

    fn emit(&self, event_type: &str, ctx: &FlowContext, extra: Option<(&str, serde_json::Value)>) {
        let mut data = json!({
            "run_id": ctx.run_id(),
            "run": ctx.run_number(),
            "started_at": ctx.started_at().to_rfc3339(),
            "timestamp": Utc::now().to_rfc3339(),
        });
        if let (Some((key, value)), Some(map)) = (extra, data.as_object_mut()) {
            map.insert(key.to_string(), value);
        }
        self.shared.sink.try_emit(event_type, Some(data));
    }
}

/// Settles a run exactly once, even when the `run()` future is dropped early.
struct SettleGuard<'a, T>
where
    T: Clone + Send + 'static,
{
    runner: &'a FlowRunner<T>,
    /// Taken on settlement; `None` means the guard is disarmed.
    token: Option<Arc<CancellationToken>>,
    ctx: FlowContext,
}

impl<T> SettleGuard<'_, T>
where
    T: Clone + Send + 'static,
{
    fn finish(mut self, outcome: FlowResult<T>) -> Option<T> {
        let token = self.token.take()?;
        self.runner.settle(&token, &self.ctx, outcome)
    }
}

impl<T> Drop for SettleGuard<'_, T>
where
    T: Clone + Send + 'static,
{
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            debug!(run = self.ctx.run_number(), "Run dropped before settling");
            token.fire(FireReason::Cancelled);
            self.runner.settle(&token, &self.ctx, Err(FlowError::Cancelled));
        }
    }
}

/// Runs a user callback, logging a panic instead of unwinding into the runner.
fn guarded(name: &str, callback: impl FnOnce()) {
    if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(callback)) {
        warn!("Flow {} callback panicked: {:?}", name, e);
    }
}

impl<T> std::fmt::Debug for FlowRunner<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("FlowRunner")
            .field("status", &state.status)
            .field("run_number", &state.run_number)
            .field("live", &state.live)
            .field("config", &self.shared.config)
            .finish()
    }
}

/// Builder for [`FlowRunner`].
pub struct FlowRunnerBuilder<T> {
    task: TaskFn<T>,
    config: FlowConfig,
    on_error: Option<ErrorCallback>,
    on_finally: Option<FinallyCallback>,
    sink: Option<Arc<dyn EventSink>>,
}

impl<T> FlowRunnerBuilder<T>
where
    T: Clone + Send + 'static,
{
    /// Creates a builder around an already type-erased task.
    #[must_use]
    pub fn new(task: TaskFn<T>) -> Self {
        Self {
            task,
            config: FlowConfig::default(),
            on_error: None,
            on_finally: None,
            sink: None,
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: FlowConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the callback invoked for runs ending in `error`.
    #[must_use]
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&FlowError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }

    /// Sets the callback invoked once after every run.
    #[must_use]
    pub fn on_finally<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_finally = Some(Arc::new(callback));
        self
    }

    /// Sets the lifecycle event sink. Overrides the `dev` logging sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Builds the runner.
    #[must_use]
    pub fn build(self) -> FlowRunner<T> {
        let sink = self.sink.unwrap_or_else(|| {
            if self.config.dev {
                Arc::new(LoggingEventSink::default())
            } else {
                Arc::new(NoOpEventSink)
            }
        });

        FlowRunner {
            shared: Arc::new(Shared {
                task: self.task,
                config: self.config,
                on_error: self.on_error,
                on_finally: self.on_finally,
                sink,
                state: Mutex::new(RunState::default()),
            }),
        }
    }
}
