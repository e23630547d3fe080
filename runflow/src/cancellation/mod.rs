//! Cooperative cancellation.
//!
//! A [`CancellationToken`] is created for every flow run and fired when the
//! run is cancelled, superseded, or its scope is torn down.

mod token;

pub use token::{CancellationToken, FireCallback, FireReason};
