//! Transition history tracking.
//!
//! The interpreter records every committed change of state name so that
//! callers can inspect the path a service took. History is bounded: once
//! the limit is reached the oldest records are dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Record of a single committed transition.
///
/// # Example
///
/// ```rust
/// use waypoint::TransitionRecord;
/// use chrono::Utc;
/// use std::time::Duration;
///
/// let record = TransitionRecord {
///     from: "idle".to_string(),
///     to: "running".to_string(),
///     event: "START".to_string(),
///     at: Duration::from_millis(250),
///     timestamp: Utc::now(),
/// };
/// assert_eq!(record.to, "running");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// The state being left
    pub from: String,
    /// The state being entered
    pub to: String,
    /// Type of the event that caused the transition
    pub event: String,
    /// Service clock reading when the transition was committed
    pub at: Duration,
    /// Wall-clock time when the transition was committed
    pub timestamp: DateTime<Utc>,
}

/// Ordered, bounded history of transitions.
///
/// # Example
///
/// ```rust
/// use waypoint::{TransitionHistory, TransitionRecord};
/// use chrono::Utc;
/// use std::time::Duration;
///
/// let mut history = TransitionHistory::with_limit(8);
/// for (from, to) in [("A", "B"), ("B", "C")] {
///     history.push(TransitionRecord {
///         from: from.to_string(),
///         to: to.to_string(),
///         event: "NEXT".to_string(),
///         at: Duration::ZERO,
///         timestamp: Utc::now(),
///     });
/// }
///
/// assert_eq!(history.get_path(), vec!["A", "B", "C"]);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionHistory {
    limit: usize,
    transitions: VecDeque<TransitionRecord>,
}

impl Default for TransitionHistory {
    fn default() -> Self {
        Self::with_limit(crate::service::DEFAULT_HISTORY_LIMIT)
    }
}

impl TransitionHistory {
    /// Create an empty history that keeps at most `limit` records.
    ///
    /// A limit of zero disables recording.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            transitions: VecDeque::with_capacity(limit.min(64)),
        }
    }

    /// Append a record, dropping the oldest when full.
    pub fn push(&mut self, record: TransitionRecord) {
        if self.limit == 0 {
            return;
        }
        while self.transitions.len() >= self.limit {
            self.transitions.pop_front();
        }
        self.transitions.push_back(record);
    }

    /// State names traversed: the first recorded origin, then each target.
    pub fn get_path(&self) -> Vec<&str> {
        let mut path = Vec::new();
        if let Some(first) = self.transitions.front() {
            path.push(first.from.as_str());
        }
        for transition in &self.transitions {
            path.push(transition.to.as_str());
        }
        path
    }

    /// Wall-clock span between the first and last retained records.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.front(), self.transitions.back()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    pub fn transitions(&self) -> impl Iterator<Item = &TransitionRecord> {
        self.transitions.iter()
    }

    pub fn last(&self) -> Option<&TransitionRecord> {
        self.transitions.back()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}
