//! Actions: the side effects attached to entry, exit and transitions.
//!
//! An action is either a name, resolved at execution time against the
//! service's action table, or a function. Action functions may return a
//! plain `()`, or one of two requests the interpreter acts upon:
//! an [`Assignment`] (replace the context) or a [`SendRequest`] (schedule
//! an event).

use crate::core::event::Event;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Function form of an action.
pub type ActionFn<C> = Arc<dyn Fn(Option<&C>, &Event) -> ActionResult<C> + Send + Sync>;

/// Wrap a closure as an [`ActionFn`], converting its return value.
pub(crate) fn action_fn<C, F, R>(f: F) -> ActionFn<C>
where
    C: 'static,
    F: Fn(Option<&C>, &Event) -> R + Send + Sync + 'static,
    R: Into<ActionResult<C>>,
{
    Arc::new(move |context, event| f(context, event).into())
}

/// A single action reference.
pub enum Action<C> {
    /// Looked up by name in the service's action table.
    Named(String),
    /// Called directly.
    Direct(ActionFn<C>),
}

impl<C: 'static> Action<C> {
    pub fn named(name: impl Into<String>) -> Self {
        Action::Named(name.into())
    }

    /// Build an action from a closure.
    ///
    /// The closure receives the current context (if the machine has one)
    /// and the event being processed. It may return `()`, an
    /// [`Assignment`] or a [`SendRequest`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use waypoint::{assign, Action};
    ///
    /// #[derive(Clone, PartialEq, Debug)]
    /// struct Counter {
    ///     count: u32,
    /// }
    ///
    /// let log = Action::<Counter>::from_fn(|_ctx, event| println!("got {event}"));
    /// let bump = Action::<Counter>::from_fn(|_ctx, _event| {
    ///     assign(|c: &Counter| Counter { count: c.count + 1 })
    /// });
    /// assert!(log.name().is_none());
    /// assert!(bump.name().is_none());
    /// ```
    pub fn from_fn<F, R>(f: F) -> Self
    where
        F: Fn(Option<&C>, &Event) -> R + Send + Sync + 'static,
        R: Into<ActionResult<C>>,
    {
        Action::Direct(action_fn(f))
    }
}

impl<C> Action<C> {
    /// The action's name, if it is a named reference.
    pub fn name(&self) -> Option<&str> {
        match self {
            Action::Named(name) => Some(name),
            Action::Direct(_) => None,
        }
    }
}

/// Shorthand for [`Action::from_fn`].
pub fn action<C, F, R>(f: F) -> Action<C>
where
    C: 'static,
    F: Fn(Option<&C>, &Event) -> R + Send + Sync + 'static,
    R: Into<ActionResult<C>>,
{
    Action::from_fn(f)
}

impl<C> Clone for Action<C> {
    fn clone(&self) -> Self {
        match self {
            Action::Named(name) => Action::Named(name.clone()),
            Action::Direct(f) => Action::Direct(Arc::clone(f)),
        }
    }
}

impl<C> fmt::Debug for Action<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Action::Direct(_) => f.write_str("Direct(<fn>)"),
        }
    }
}

impl<C> From<&str> for Action<C> {
    fn from(name: &str) -> Self {
        Action::Named(name.to_owned())
    }
}

impl<C> From<String> for Action<C> {
    fn from(name: String) -> Self {
        Action::Named(name)
    }
}

/// Ordered list of actions.
///
/// Every place that accepts actions takes `impl Into<Actions<C>>`, so a
/// single name, a single action, a vector or an array all work, and an
/// absent list is simply empty.
pub struct Actions<C>(Vec<Action<C>>);

impl<C> Actions<C> {
    pub fn new() -> Self {
        Actions(Vec::new())
    }

    pub fn push(&mut self, action: impl Into<Action<C>>) {
        self.0.push(action.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action<C>> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Action<C>] {
        &self.0
    }

    /// Names of the named actions, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(Action::name)
    }
}

impl<C> Default for Actions<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for Actions<C> {
    fn clone(&self) -> Self {
        Actions(self.0.clone())
    }
}

impl<C> fmt::Debug for Actions<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl<'a, C> IntoIterator for &'a Actions<C> {
    type Item = &'a Action<C>;
    type IntoIter = std::slice::Iter<'a, Action<C>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<C> From<Action<C>> for Actions<C> {
    fn from(action: Action<C>) -> Self {
        Actions(vec![action])
    }
}

impl<C> From<&str> for Actions<C> {
    fn from(name: &str) -> Self {
        Actions(vec![Action::from(name)])
    }
}

impl<C> From<String> for Actions<C> {
    fn from(name: String) -> Self {
        Actions(vec![Action::from(name)])
    }
}

impl<C> From<Vec<Action<C>>> for Actions<C> {
    fn from(actions: Vec<Action<C>>) -> Self {
        Actions(actions)
    }
}

impl<C> From<Vec<&str>> for Actions<C> {
    fn from(names: Vec<&str>) -> Self {
        Actions(names.into_iter().map(Action::from).collect())
    }
}

impl<C, const N: usize> From<[Action<C>; N]> for Actions<C> {
    fn from(actions: [Action<C>; N]) -> Self {
        Actions(actions.into_iter().collect())
    }
}

impl<C, const N: usize> From<[&str; N]> for Actions<C> {
    fn from(names: [&str; N]) -> Self {
        Actions(names.into_iter().map(Action::from).collect())
    }
}

impl<C> From<Option<Actions<C>>> for Actions<C> {
    fn from(actions: Option<Actions<C>>) -> Self {
        actions.unwrap_or_default()
    }
}

impl<C> FromIterator<Action<C>> for Actions<C> {
    fn from_iter<I: IntoIterator<Item = Action<C>>>(iter: I) -> Self {
        Actions(iter.into_iter().collect())
    }
}

/// What an action asked the interpreter to do.
pub enum ActionResult<C> {
    /// Nothing beyond the action's own side effects.
    Done,
    /// Replace the context.
    Assign(Assignment<C>),
    /// Schedule an event.
    Send(SendRequest),
}

impl<C> fmt::Debug for ActionResult<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionResult::Done => f.write_str("Done"),
            ActionResult::Assign(_) => f.write_str("Assign(<fn>)"),
            ActionResult::Send(request) => f.debug_tuple("Send").field(request).finish(),
        }
    }
}

impl<C> From<()> for ActionResult<C> {
    fn from(_: ()) -> Self {
        ActionResult::Done
    }
}

impl<C> From<Assignment<C>> for ActionResult<C> {
    fn from(assignment: Assignment<C>) -> Self {
        ActionResult::Assign(assignment)
    }
}

impl<C> From<SendRequest> for ActionResult<C> {
    fn from(request: SendRequest) -> Self {
        ActionResult::Send(request)
    }
}

/// A request to replace the context, computed from the current one.
pub struct Assignment<C> {
    updater: Box<dyn FnOnce(&C) -> C>,
}

impl<C> Assignment<C> {
    pub fn apply(self, context: &C) -> C {
        (self.updater)(context)
    }
}

/// Request a context update.
///
/// Struct update syntax gives the shallow-merge behavior: name the fields
/// that change and spread the rest from the current context.
///
/// ```rust
/// use waypoint::assign;
///
/// #[derive(Clone, PartialEq, Debug)]
/// struct Form {
///     name: String,
///     attempts: u32,
/// }
///
/// let bump = assign(|f: &Form| Form { attempts: f.attempts + 1, ..f.clone() });
/// let next = bump.apply(&Form { name: "a".into(), attempts: 1 });
/// assert_eq!(next, Form { name: "a".into(), attempts: 2 });
/// ```
pub fn assign<C, F>(updater: F) -> Assignment<C>
where
    F: FnOnce(&C) -> C + 'static,
{
    Assignment {
        updater: Box::new(updater),
    }
}

/// Request a shallow merge of a JSON object over a JSON context.
///
/// Keys present in `patch` overwrite the context's keys; other keys are
/// kept. If either side is not an object the patch replaces the context.
pub fn merge(patch: Value) -> Assignment<Value> {
    assign(move |context: &Value| match (context, patch) {
        (Value::Object(current), Value::Object(patch)) => {
            let mut merged = current.clone();
            merged.extend(patch);
            Value::Object(merged)
        }
        (_, patch) => patch,
    })
}

/// A request to deliver an event to the service after a delay.
#[derive(Clone, Debug, PartialEq)]
pub struct SendRequest {
    pub event: Event,
    pub delay: Duration,
}

/// Request that `event` be sent to the service after `delay`.
///
/// The event is always delivered asynchronously, on a later
/// [`advance`](crate::Service::advance), even with a zero delay.
pub fn send(event: impl Into<Event>, delay: Duration) -> SendRequest {
    SendRequest {
        event: event.into(),
        delay,
    }
}
