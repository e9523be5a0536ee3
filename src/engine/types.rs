//! Engine types
//!
//! Cycle outcomes, statistics and listener types for the fetch orchestrator.

use crate::error::{Error, ErrorCategory};
use crate::page::Page;
use crate::state::ChangeOutcome;
use std::collections::BTreeSet;

/// Callback invoked after a detected change with the new page list and the
/// property names seen so far
pub type PageChangeListener = Box<dyn Fn(&[Page], &BTreeSet<String>) + Send + Sync>;

/// Outcome of one orchestrator command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleStatus {
    /// Fetched; the page list was replaced
    Changed,
    /// Fetched; the content hash matched the cached one
    Unchanged,
    /// Fetched; the hash was not comparable and the cache was left alone
    Ignored,
    /// Navigation was not possible; nothing was fetched
    NoOp,
    /// The cycle failed; cached state is unchanged
    Failed {
        category: ErrorCategory,
        message: String,
    },
}

impl CycleStatus {
    /// Build a failure status from an error
    pub fn failed(error: &Error) -> Self {
        Self::Failed {
            category: error.category(),
            message: error.to_string(),
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Category of a failed cycle
    pub fn failure_category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Failed { category, .. } => Some(*category),
            _ => None,
        }
    }
}

impl From<ChangeOutcome> for CycleStatus {
    fn from(outcome: ChangeOutcome) -> Self {
        match outcome {
            ChangeOutcome::Changed => Self::Changed,
            ChangeOutcome::Unchanged => Self::Unchanged,
            ChangeOutcome::Ignored => Self::Ignored,
        }
    }
}

impl std::fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Changed => write!(f, "changed"),
            Self::Unchanged => write!(f, "unchanged"),
            Self::Ignored => write!(f, "ignored"),
            Self::NoOp => write!(f, "no-op"),
            Self::Failed { category, message } => write!(f, "failed ({category}): {message}"),
        }
    }
}

/// Statistics accumulated across fetch cycles
#[derive(Debug, Clone, Default)]
pub struct FetchStats {
    /// Cycles attempted, failures included
    pub cycles: usize,
    /// Requests that returned a body
    pub fetches: usize,
    /// Cycles that replaced the page list
    pub changes: usize,
    /// Cycles that failed
    pub failures: usize,
    /// Parses that ran with an undersized buffer
    pub undersized_parses: usize,
    /// Body bytes decoded
    pub bytes_read: usize,
    /// Duration of the last cycle in milliseconds
    pub last_duration_ms: u64,
}

impl FetchStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }
}
