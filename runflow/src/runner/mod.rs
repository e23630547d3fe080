//! Flow runner: the run lifecycle state machine.
//!
//! A runner moves through `idle → running → {success | error | cancelled}`.
//! Every run gets its own token and context; starting a run supersedes the
//! previous one, and classification of the outcome is driven by the token,
//! never by the error value.

mod deps;
mod flow_runner;
mod status;

pub use deps::DependencySnapshot;
pub use flow_runner::{ErrorCallback, FinallyCallback, FlowRunner, FlowRunnerBuilder, TaskFn};
pub use status::FlowStatus;
