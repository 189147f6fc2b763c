//! Best-effort batch stage results.
//!
//! Pipeline stages that tolerate partial failure return a `BatchOutcome`
//! instead of erroring out, so downstream stages and the verifier can make
//! their own policy decisions about failure tolerance.

use serde::{Deserialize, Serialize};

/// A single failed item within a batch stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure {
    /// The offending URL or path.
    pub item: String,
    /// Human-readable failure reason.
    pub reason: String,
}

/// Outcome of a batch stage: successes plus per-item failures.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<BatchFailure>,
}

impl<T> BatchOutcome<T> {
    pub fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn push_ok(&mut self, item: T) {
        self.succeeded.push(item);
    }

    pub fn push_failure(&mut self, item: impl Into<String>, reason: impl Into<String>) {
        self.failed.push(BatchFailure {
            item: item.into(),
            reason: reason.into(),
        });
    }

    /// One-line summary for end-of-stage reporting.
    pub fn summary(&self) -> String {
        format!("{} ok, {} failed", self.succeeded.len(), self.failed.len())
    }
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_counts() {
        let mut outcome: BatchOutcome<u32> = BatchOutcome::new();
        outcome.push_ok(1);
        outcome.push_ok(2);
        outcome.push_failure("/bad", "fetch timed out");
        assert_eq!(outcome.summary(), "2 ok, 1 failed");
        assert_eq!(outcome.failed[0].item, "/bad");
    }
}
