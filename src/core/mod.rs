//! Core value types.
//!
//! Everything in this module is plain data or pure functions:
//! - Events and state snapshots
//! - Guard predicates
//! - Action references and the requests actions can return
//! - Bounded transition history
//!
//! Side effects only happen when the interpreter in [`crate::service`]
//! runs these values.

mod action;
mod event;
mod guard;
mod history;
mod state;

pub use action::{
    action, assign, merge, send, Action, ActionFn, ActionResult, Actions, Assignment, SendRequest,
};
pub(crate) use action::action_fn;
pub use event::{Event, START_EVENT};
pub use guard::{Condition, Guard};
pub use history::{TransitionHistory, TransitionRecord};
pub use state::State;
