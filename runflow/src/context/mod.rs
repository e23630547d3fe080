//! Orchestration context handed to task functions.

mod flow;

pub use flow::FlowContext;
