//! Configuration and pure transition resolution.
//!
//! A [`MachineConfig`] is built fluently and handed to [`create_machine`].
//! The resulting [`Machine`] answers lookups and resolves transitions
//! without running anything.

mod config;
#[allow(clippy::module_inception)]
mod machine;

pub use config::{
    AfterTransition, AlwaysTransition, MachineConfig, StateNode, TransitionConfig,
    TransitionDescriptor,
};
pub use machine::{create_machine, Machine, StateRef};
