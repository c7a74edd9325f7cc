//! Runtime options for a [`Service`](crate::Service).

use crate::core::{action_fn, ActionFn, ActionResult, Event};
use std::collections::HashMap;
use std::fmt;

/// Default number of transitions kept in a service's history.
pub const DEFAULT_HISTORY_LIMIT: usize = 64;

/// Options a service is created with.
///
/// The action table maps names used in a configuration to functions.
/// Names with no entry are skipped at execution time.
///
/// # Example
///
/// ```rust
/// use waypoint::{assign, ServiceOptions};
///
/// let options = ServiceOptions::<u32>::new()
///     .action("log", |count, event| println!("{event}: {count:?}"))
///     .action("bump", |_, _| assign(|count: &u32| count + 1))
///     .history_limit(16);
///
/// assert!(options.has_action("bump"));
/// assert!(!options.has_action("missing"));
/// assert_eq!(options.max_history(), 16);
/// ```
pub struct ServiceOptions<C> {
    actions: HashMap<String, ActionFn<C>>,
    history_limit: usize,
}

impl<C> ServiceOptions<C> {
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Register a named action. A later registration replaces an earlier
    /// one with the same name.
    pub fn action<F, R>(mut self, name: impl Into<String>, f: F) -> Self
    where
        C: 'static,
        F: Fn(Option<&C>, &Event) -> R + Send + Sync + 'static,
        R: Into<ActionResult<C>>,
    {
        self.actions.insert(name.into(), action_fn(f));
        self
    }

    /// Maximum number of history records. Zero disables recording.
    pub fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn max_history(&self) -> usize {
        self.history_limit
    }

    pub fn has_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Registered action names, in no particular order.
    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    pub(crate) fn resolve(&self, name: &str) -> Option<&ActionFn<C>> {
        self.actions.get(name)
    }
}

impl<C> Default for ServiceOptions<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for ServiceOptions<C> {
    fn clone(&self) -> Self {
        Self {
            actions: self.actions.clone(),
            history_limit: self.history_limit,
        }
    }
}

impl<C> fmt::Debug for ServiceOptions<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.action_names().collect();
        names.sort_unstable();
        f.debug_struct("ServiceOptions")
            .field("actions", &names)
            .field("history_limit", &self.history_limit)
            .finish()
    }
}
