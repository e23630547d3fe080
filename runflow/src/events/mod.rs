//! Lifecycle event emission.
//!
//! The runner reports `flow.started`, `flow.succeeded`, `flow.failed` and
//! `flow.cancelled` to an [`EventSink`]. Sinks are side channels only.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Event type emitted when a run starts.
pub const FLOW_STARTED: &str = "flow.started";
/// Event type emitted when a run succeeds.
pub const FLOW_SUCCEEDED: &str = "flow.succeeded";
/// Event type emitted when a run fails.
pub const FLOW_FAILED: &str = "flow.failed";
/// Event type emitted when a run is cancelled.
pub const FLOW_CANCELLED: &str = "flow.cancelled";
