//! # Runflow
//!
//! Cancellation-aware async task orchestration scoped to a single "flow" run.
//!
//! Runflow provides:
//!
//! - **Cancellation tokens**: one-shot, level-triggered signals with observers
//! - **Combinators**: `parallel`, `sequence`, `race`, `retry` and `timeout`,
//!   all checking the run's token at dispatch boundaries
//! - **Flow runners**: a run lifecycle state machine that supersedes in-flight
//!   runs and classifies outcomes as success, error or cancelled
//!
//! Cancellation is cooperative. Combinators never interrupt a task that has
//! already started; a task that ignores its token runs to completion and its
//! result is discarded.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use runflow::prelude::*;
//!
//! let runner = FlowRunner::new(|ctx: FlowContext| async move {
//!     let [user, feed] = ctx
//!         .parallel([fetch_user, fetch_feed])
//!         .await?
//!         .try_into()
//!         .unwrap();
//!     ctx.timeout(Duration::from_secs(2), || render(user, feed)).await
//! });
//!
//! let page = runner.run().await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod combinators;
pub mod config;
pub mod context;
pub mod errors;
pub mod events;
pub mod observability;
pub mod runner;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::{CancellationToken, FireReason};
    pub use crate::combinators::{task, BoxTask};
    pub use crate::config::{FlowConfig, RetryPolicy};
    pub use crate::context::FlowContext;
    pub use crate::errors::{FlowError, FlowResult};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::runner::{FlowRunner, FlowRunnerBuilder, FlowStatus};
}
