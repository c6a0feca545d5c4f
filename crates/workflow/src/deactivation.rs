//! Best-effort inventory deactivation reporting.

use common::UnitId;

/// Outcome of a best-effort batch of unit deactivations.
///
/// The batch never aborts the operation that triggered it; individual
/// failures are collected here so callers can surface counts instead of
/// burying them in a log line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeactivationReport {
    /// Units the batch attempted to deactivate.
    pub attempted: usize,
    /// Units successfully deactivated.
    pub deactivated: usize,
    /// Units that failed, with the failure message.
    pub failures: Vec<(UnitId, String)>,
}

impl DeactivationReport {
    /// Returns true if every attempted deactivation succeeded.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
