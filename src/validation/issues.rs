//! Problems found while linting a machine configuration.

use std::time::Duration;
use thiserror::Error;

/// A configuration problem.
///
/// None of these stop a machine from being built or run: the engine
/// treats every one of them as "no transition" or "no-op action". They
/// are reported so that callers can catch typos early.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigIssue {
    #[error("No states declared")]
    NoStates,

    #[error("Initial state '{initial}' is not declared")]
    UnknownInitial { initial: String },

    #[error("Event '{event}' in state '{state}' targets undeclared state '{target}'")]
    UnknownTarget {
        state: String,
        event: String,
        target: String,
    },

    #[error("Delayed transition after {delay:?} in state '{state}' targets undeclared state '{target}'")]
    UnknownAfterTarget {
        state: String,
        delay: Duration,
        target: String,
    },

    #[error("Eventless transition in state '{state}' targets undeclared state '{target}'")]
    UnknownAlwaysTarget { state: String, target: String },

    #[error("Action '{action}' used in state '{state}' has no implementation")]
    UnresolvedAction { state: String, action: String },
}

impl ConfigIssue {
    /// The state the issue was found in, if it is tied to one.
    pub fn state(&self) -> Option<&str> {
        match self {
            ConfigIssue::NoStates | ConfigIssue::UnknownInitial { .. } => None,
            ConfigIssue::UnknownTarget { state, .. }
            | ConfigIssue::UnknownAfterTarget { state, .. }
            | ConfigIssue::UnknownAlwaysTarget { state, .. }
            | ConfigIssue::UnresolvedAction { state, .. } => Some(state),
        }
    }
}
