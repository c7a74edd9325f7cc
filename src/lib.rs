//! Waypoint: a finite-state-machine engine and timed interpreter
//!
//! Waypoint follows a "pure core, imperative shell" split. The
//! [`Machine`] is pure: given a configuration it answers what the next
//! state would be for a state and an event, and nothing more. The
//! [`Service`] is the shell: it owns the current state and runs the
//! protocol around every transition.
//!
//! # Core Concepts
//!
//! - **State**: an immutable snapshot of a state name plus an optional context
//! - **Guards**: pure predicates gating event and eventless transitions
//! - **Actions**: named or direct callbacks that may request a context
//!   assignment or a deferred send
//! - **Delayed transitions**: armed on entry, fired by the service clock
//! - **Eventless transitions**: followed eagerly after every state change,
//!   stopping when a state name repeats within one pass
//!
//! # Example
//!
//! ```rust
//! use waypoint::{assign, create_machine, interpret, AlwaysTransition};
//! use waypoint::{MachineConfig, ServiceOptions, StateNode};
//!
//! #[derive(Clone, PartialEq, Debug)]
//! struct Form {
//!     count: u32,
//! }
//!
//! let machine = create_machine(
//!     MachineConfig::new()
//!         .initial("idle")
//!         .context(Form { count: 5 })
//!         .state("idle", StateNode::new().on("SUBMIT", "checking"))
//!         .state(
//!             "checking",
//!             StateNode::new()
//!                 .always(
//!                     AlwaysTransition::<Form>::to("valid")
//!                         .when(|s| s.context().is_some_and(|f| f.count > 3)),
//!                 )
//!                 .always("invalid"),
//!         )
//!         .state("valid", StateNode::new().entry("celebrate"))
//!         .state("invalid", StateNode::new()),
//! );
//!
//! let options = ServiceOptions::<Form>::new().action("celebrate", |_, _| {
//!     assign(|f: &Form| Form { count: f.count * 2 })
//! });
//!
//! let mut service = interpret(machine, options);
//! service.start();
//! service.send("SUBMIT");
//!
//! assert!(service.state().matches("valid"));
//! assert_eq!(service.state().context(), Some(&Form { count: 10 }));
//! ```

pub mod core;
pub mod machine;
pub mod service;
pub mod validation;

// Re-export commonly used types
pub use core::{
    action, assign, merge, send, Action, ActionFn, ActionResult, Actions, Assignment, Condition,
    Event, Guard, SendRequest, State, TransitionHistory, TransitionRecord, START_EVENT,
};
pub use machine::{
    create_machine, AfterTransition, AlwaysTransition, Machine, MachineConfig, StateNode,
    StateRef, TransitionConfig, TransitionDescriptor,
};
pub use service::{
    create_service, interpret, Service, ServiceOptions, ServiceRegistry, ServiceStatus,
    Subscription,
};
pub use validation::{validate, validate_with, ConfigIssue};
