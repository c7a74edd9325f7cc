//! Guard predicates for controlling transitions.
//!
//! Guards are pure boolean functions that decide whether a transition
//! is taken. Event transitions use a [`Guard`], which sees the
//! pre-transition snapshot and the event. Eventless transitions have no
//! event, so they use a [`Condition`] over the snapshot alone.

use crate::core::event::Event;
use crate::core::state::State;
use std::fmt;
use std::sync::Arc;

/// Predicate gating an event transition.
///
/// # Example
///
/// ```rust
/// use waypoint::{Event, Guard, State};
///
/// let only_when_counted = Guard::new(|state: &State<u32>, _event: &Event| {
///     state.context().is_some_and(|count| *count > 3)
/// });
///
/// assert!(only_when_counted.check(&State::with_context("idle", 5), &"GO".into()));
/// assert!(!only_when_counted.check(&State::with_context("idle", 1), &"GO".into()));
/// assert!(!only_when_counted.check(&State::new("idle"), &"GO".into()));
/// ```
pub struct Guard<C> {
    predicate: Arc<dyn Fn(&State<C>, &Event) -> bool + Send + Sync>,
}

impl<C> Guard<C> {
    /// Create a guard from a pure predicate function.
    ///
    /// The predicate must be deterministic and thread-safe.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&State<C>, &Event) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Arc::new(predicate),
        }
    }

    pub fn check(&self, state: &State<C>, event: &Event) -> bool {
        (self.predicate)(state, event)
    }
}

impl<C> Clone for Guard<C> {
    fn clone(&self) -> Self {
        Guard {
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<C> fmt::Debug for Guard<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard(<fn>)")
    }
}

/// Predicate gating an eventless transition.
pub struct Condition<C> {
    predicate: Arc<dyn Fn(&State<C>) -> bool + Send + Sync>,
}

impl<C> Condition<C> {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&State<C>) -> bool + Send + Sync + 'static,
    {
        Condition {
            predicate: Arc::new(predicate),
        }
    }

    pub fn check(&self, state: &State<C>) -> bool {
        (self.predicate)(state)
    }
}

impl<C> Clone for Condition<C> {
    fn clone(&self) -> Self {
        Condition {
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<C> fmt::Debug for Condition<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Condition(<fn>)")
    }
}
