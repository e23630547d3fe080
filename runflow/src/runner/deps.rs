//! Dependency snapshots for re-run triggering.

use serde_json::Value;

/// The dependency values seen by the last run trigger.
///
/// The host hands over the current values; [`DependencySnapshot::update`]
/// compares them element-wise against the stored snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencySnapshot {
    values: Option<Vec<Value>>,
}

impl DependencySnapshot {
    /// Creates an empty snapshot. The first update always counts as a change.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `next` and returns true if it differs from the previous snapshot.
    pub fn update(&mut self, next: Vec<Value>) -> bool {
        let changed = self.values.as_ref() != Some(&next);
        if changed {
            self.values = Some(next);
        }
        changed
    }

    /// Returns the stored values, if any snapshot was taken.
    #[must_use]
    pub fn values(&self) -> Option<&[Value]> {
        self.values.as_deref()
    }
}
