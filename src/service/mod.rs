//! The interpreter and the pieces around it.

mod options;
mod registry;
#[allow(clippy::module_inception)]
mod service;
mod timers;

pub use options::{ServiceOptions, DEFAULT_HISTORY_LIMIT};
pub use registry::ServiceRegistry;
pub use service::{create_service, interpret, Service, ServiceStatus, Subscription};
