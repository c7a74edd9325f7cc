//! Keyed store of services.

use crate::service::service::Service;
use indexmap::IndexMap;
use std::fmt;
use tracing::debug;

/// Explicit registry holding at most one service per key.
///
/// The registry is an ordinary value: whoever owns it decides its
/// lifetime. A service is created the first time its key is requested
/// and lives until [`remove`](ServiceRegistry::remove) is called.
///
/// # Example
///
/// ```rust
/// use waypoint::{create_machine, interpret, MachineConfig, ServiceOptions, ServiceRegistry, StateNode};
/// use std::sync::Arc;
///
/// let machine = Arc::new(create_machine(
///     MachineConfig::<()>::new().state("idle", StateNode::new().on("GO", "busy"))
///         .state("busy", StateNode::new()),
/// ));
///
/// let mut registry = ServiceRegistry::new();
/// registry
///     .get_or_insert_with("checkout", || interpret(Arc::clone(&machine), ServiceOptions::new()))
///     .start();
///
/// // The second request returns the running service.
/// let service = registry.get_or_insert_with("checkout", || unreachable!());
/// service.send("GO");
/// assert!(service.state().matches("busy"));
/// assert_eq!(registry.len(), 1);
/// ```
pub struct ServiceRegistry<C> {
    services: IndexMap<String, Service<C>>,
}

impl<C> ServiceRegistry<C>
where
    C: Clone + PartialEq + 'static,
{
    pub fn new() -> Self {
        Self {
            services: IndexMap::new(),
        }
    }

    /// The service stored under `key`, created with `make` if absent.
    pub fn get_or_insert_with<F>(&mut self, key: impl Into<String>, make: F) -> &mut Service<C>
    where
        F: FnOnce() -> Service<C>,
    {
        self.services.entry(key.into()).or_insert_with_key(|key| {
            debug!(key = key.as_str(), "service registered");
            make()
        })
    }

    pub fn get(&self, key: &str) -> Option<&Service<C>> {
        self.services.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Service<C>> {
        self.services.get_mut(key)
    }

    /// Remove the service under `key`, stopping it first.
    pub fn remove(&mut self, key: &str) -> Option<Service<C>> {
        let mut service = self.services.shift_remove(key)?;
        service.stop();
        debug!(key, "service removed");
        Some(service)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.services.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }
}

impl<C> Default for ServiceRegistry<C>
where
    C: Clone + PartialEq + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for ServiceRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("keys", &self.services.keys().collect::<Vec<_>>())
            .finish()
    }
}
