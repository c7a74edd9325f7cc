//! State snapshots.
//!
//! A [`State`] is an immutable value describing where a machine is: the
//! state name, the context, the actions pending from the transition that
//! produced it, and whether it differs from the snapshot it replaced.

use crate::core::action::Actions;
use regex::Regex;
use serde::Serialize;
use std::fmt;

/// Immutable snapshot of a machine's position.
///
/// # Example
///
/// ```rust
/// use waypoint::State;
/// use regex::Regex;
///
/// let state: State<()> = State::new("loading.user");
/// assert!(state.matches("loading.user"));
/// assert!(!state.matches("loading"));
/// assert!(state.matches_pattern(&Regex::new("^loading").unwrap()));
/// assert!(!state.changed());
/// ```
#[derive(Serialize)]
pub struct State<C> {
    value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<C>,
    #[serde(skip)]
    actions: Actions<C>,
    changed: bool,
}

impl<C> State<C> {
    /// A snapshot with no context and no pending actions.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            context: None,
            actions: Actions::new(),
            changed: false,
        }
    }

    /// A snapshot carrying a context.
    pub fn with_context(value: impl Into<String>, context: C) -> Self {
        Self {
            context: Some(context),
            ..Self::new(value)
        }
    }

    pub(crate) fn from_parts(
        value: impl Into<String>,
        context: Option<C>,
        actions: Actions<C>,
        changed: bool,
    ) -> Self {
        Self {
            value: value.into(),
            context,
            actions,
            changed,
        }
    }

    /// The state name.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn context(&self) -> Option<&C> {
        self.context.as_ref()
    }

    /// Actions declared on the transition that produced this snapshot.
    pub fn actions(&self) -> &Actions<C> {
        &self.actions
    }

    /// Whether this snapshot differs from the one it replaced.
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Exact name match.
    pub fn matches(&self, value: &str) -> bool {
        self.value == value
    }

    /// Pattern match against the state name.
    pub fn matches_pattern(&self, pattern: &Regex) -> bool {
        pattern.is_match(&self.value)
    }

    pub(crate) fn into_parts(self) -> (String, Option<C>, Actions<C>, bool) {
        (self.value, self.context, self.actions, self.changed)
    }
}

impl<C: Clone> Clone for State<C> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            context: self.context.clone(),
            actions: self.actions.clone(),
            changed: self.changed,
        }
    }
}

impl<C: fmt::Debug> fmt::Debug for State<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("value", &self.value)
            .field("context", &self.context)
            .field("actions", &self.actions)
            .field("changed", &self.changed)
            .finish()
    }
}
