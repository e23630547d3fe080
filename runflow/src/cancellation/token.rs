//! One-shot cancellation token for cooperative cancellation.

use crate::errors::{FlowError, FlowResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tracing::warn;

/// A callback type for fire notifications.
pub type FireCallback = Box<dyn FnOnce(FireReason) + Send>;

/// Why a token was fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FireReason {
    /// The run was explicitly cancelled.
    Cancelled,
    /// A newer run started before this one settled.
    Superseded,
    /// The owning scope went away.
    Teardown,
}

impl fmt::Display for FireReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "cancelled"),
            Self::Superseded => write!(f, "superseded"),
            Self::Teardown => write!(f, "teardown"),
        }
    }
}

/// A one-shot, level-triggered cancellation signal.
///
/// Firing is idempotent: only the first reason is kept and observers run
/// exactly once, in registration order. Observers registered after the
/// token fired are invoked immediately.
#[derive(Default)]
pub struct CancellationToken {
    /// Whether the token has fired.
    fired: AtomicBool,
    /// The reason of the first fire.
    reason: Mutex<Option<FireReason>>,
    /// Observers waiting for the fire.
    callbacks: Mutex<Vec<FireCallback>>,
    /// Wakes tasks parked in [`CancellationToken::fired`].
    notify: Notify,
}

impl CancellationToken {
    /// Creates a new, unfired token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the token.
    ///
    /// Returns `true` if this call performed the fire. Observers are invoked
    /// synchronously on the calling thread; a panicking observer is logged
    /// and suppressed.
    pub fn fire(&self, reason: FireReason) -> bool {
        let callbacks = {
            let mut callbacks = self.callbacks.lock();
            if self.fired.swap(true, Ordering::SeqCst) {
                return false;
            }
            *self.reason.lock() = Some(reason);
            std::mem::take(&mut *callbacks)
        };

        self.notify.notify_waiters();

        for callback in callbacks {
            invoke(callback, reason);
        }
        true
    }

    /// Registers an observer to run when the token fires.
    ///
    /// If already fired, the observer runs immediately.
    pub fn on_fire<F>(&self, callback: F)
    where
        F: FnOnce(FireReason) + Send + 'static,
    {
        {
            let mut callbacks = self.callbacks.lock();
            if !self.is_fired() {
                callbacks.push(Box::new(callback));
                return;
            }
        }
        let reason = self.reason().unwrap_or(FireReason::Cancelled);
        invoke(Box::new(callback), reason);
    }

    /// Returns whether the token has fired.
    #[must_use]
    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Returns the reason of the first fire, if any.
    #[must_use]
    pub fn reason(&self) -> Option<FireReason> {
        *self.reason.lock()
    }

    /// Fails with [`FlowError::Cancelled`] once the token has fired.
    pub fn check(&self) -> FlowResult<()> {
        if self.is_fired() {
            Err(FlowError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves once the token has fired. Resolves immediately if it already has.
    pub async fn fired(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_fired() {
                return;
            }
            notified.await;
        }
    }

    /// Returns the number of observers still waiting for the fire.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.callbacks.lock().len()
    }
}

fn invoke(callback: FireCallback, reason: FireReason) {
    if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        callback(reason);
    })) {
        warn!("Cancellation observer panicked: {:?}", e);
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("fired", &self.is_fired())
            .field("reason", &self.reason())
            .field("observers", &self.observer_count())
            .finish()
    }
}
