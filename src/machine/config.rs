//! Machine configuration with a fluent builder API.
//!
//! A configuration maps state names to [`StateNode`]s. Nothing is
//! validated at construction; undefined targets simply never transition.
//! Use [`crate::validation::validate`] to lint a configuration.

use crate::core::{Actions, Condition, Event, Guard, State};
use indexmap::IndexMap;
use std::time::Duration;

/// Complete description of a machine.
///
/// # Example
///
/// ```rust
/// use waypoint::{MachineConfig, StateNode, TransitionDescriptor};
///
/// let config: MachineConfig<()> = MachineConfig::new()
///     .initial("idle")
///     .state("idle", StateNode::new().on("START", "running"))
///     .state(
///         "running",
///         StateNode::new()
///             .on("STOP", "idle")
///             .on("PING", TransitionDescriptor::new().actions("pong")),
///     );
///
/// assert_eq!(config.initial_name(), Some("idle"));
/// assert_eq!(config.states().count(), 2);
/// ```
pub struct MachineConfig<C> {
    pub(crate) initial: Option<String>,
    pub(crate) context: Option<C>,
    pub(crate) states: IndexMap<String, StateNode<C>>,
}

impl<C> MachineConfig<C> {
    pub fn new() -> Self {
        Self {
            initial: None,
            context: None,
            states: IndexMap::new(),
        }
    }

    /// Set the initial state. Defaults to the first declared state.
    pub fn initial(mut self, name: impl Into<String>) -> Self {
        self.initial = Some(name.into());
        self
    }

    /// Set the initial context.
    pub fn context(mut self, context: C) -> Self {
        self.context = Some(context);
        self
    }

    /// Declare a state. Declaring the same name twice replaces the node
    /// but keeps its original position.
    pub fn state(mut self, name: impl Into<String>, node: StateNode<C>) -> Self {
        self.states.insert(name.into(), node);
        self
    }

    pub fn initial_name(&self) -> Option<&str> {
        self.initial.as_deref()
    }

    pub fn initial_context(&self) -> Option<&C> {
        self.context.as_ref()
    }

    /// Declared states in declaration order.
    pub fn states(&self) -> impl Iterator<Item = (&str, &StateNode<C>)> {
        self.states.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn get(&self, name: &str) -> Option<&StateNode<C>> {
        self.states.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }
}

impl<C> Default for MachineConfig<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Declarations for a single state.
pub struct StateNode<C> {
    pub(crate) on: IndexMap<String, TransitionConfig<C>>,
    pub(crate) entry: Actions<C>,
    pub(crate) exit: Actions<C>,
    pub(crate) after: Vec<AfterTransition<C>>,
    pub(crate) always: Vec<AlwaysTransition<C>>,
}

impl<C> StateNode<C> {
    pub fn new() -> Self {
        Self {
            on: IndexMap::new(),
            entry: Actions::new(),
            exit: Actions::new(),
            after: Vec::new(),
            always: Vec::new(),
        }
    }

    /// Handle `event` with a transition: a bare target name or a
    /// [`TransitionDescriptor`].
    pub fn on(
        mut self,
        event: impl Into<String>,
        transition: impl Into<TransitionConfig<C>>,
    ) -> Self {
        self.on.insert(event.into(), transition.into());
        self
    }

    /// Actions run when the state is entered.
    pub fn entry(mut self, actions: impl Into<Actions<C>>) -> Self {
        self.entry = actions.into();
        self
    }

    /// Actions run when the state is left.
    pub fn exit(mut self, actions: impl Into<Actions<C>>) -> Self {
        self.exit = actions.into();
        self
    }

    /// Transition to another state once `delay` has passed since entry.
    ///
    /// Each call adds an independent timer, so two entries may share a
    /// delay.
    pub fn after(mut self, delay: Duration, transition: impl Into<AfterTransition<C>>) -> Self {
        let mut transition = transition.into();
        transition.delay = delay;
        self.after.push(transition);
        self
    }

    /// Add an eventless transition. Candidates are evaluated in the order
    /// they were added and the first one whose condition passes wins.
    pub fn always(mut self, transition: impl Into<AlwaysTransition<C>>) -> Self {
        self.always.push(transition.into());
        self
    }

    pub fn transitions(&self) -> impl Iterator<Item = (&str, &TransitionConfig<C>)> {
        self.on.iter().map(|(event, t)| (event.as_str(), t))
    }

    pub fn transition_for(&self, event: &str) -> Option<&TransitionConfig<C>> {
        self.on.get(event)
    }

    pub fn entry_actions(&self) -> &Actions<C> {
        &self.entry
    }

    pub fn exit_actions(&self) -> &Actions<C> {
        &self.exit
    }

    pub fn after_transitions(&self) -> &[AfterTransition<C>] {
        &self.after
    }

    pub fn always_transitions(&self) -> &[AlwaysTransition<C>] {
        &self.always
    }
}

impl<C> Default for StateNode<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// An entry in a state's `on` table.
pub enum TransitionConfig<C> {
    /// Bare target name. Voids the transition if the target is unknown.
    Target(String),
    /// Full descriptor. An unknown or missing target means self-transition.
    Descriptor(TransitionDescriptor<C>),
}

impl<C> TransitionConfig<C> {
    /// The target as declared, before resolution.
    pub fn declared_target(&self) -> Option<&str> {
        match self {
            TransitionConfig::Target(target) => Some(target),
            TransitionConfig::Descriptor(descriptor) => descriptor.target.as_deref(),
        }
    }

    pub fn actions(&self) -> Option<&Actions<C>> {
        match self {
            TransitionConfig::Target(_) => None,
            TransitionConfig::Descriptor(descriptor) => Some(&descriptor.actions),
        }
    }
}

impl<C> From<&str> for TransitionConfig<C> {
    fn from(target: &str) -> Self {
        TransitionConfig::Target(target.to_owned())
    }
}

impl<C> From<String> for TransitionConfig<C> {
    fn from(target: String) -> Self {
        TransitionConfig::Target(target)
    }
}

impl<C> From<TransitionDescriptor<C>> for TransitionConfig<C> {
    fn from(descriptor: TransitionDescriptor<C>) -> Self {
        TransitionConfig::Descriptor(descriptor)
    }
}

/// Transition with optional target, actions and guard.
pub struct TransitionDescriptor<C> {
    pub(crate) target: Option<String>,
    pub(crate) actions: Actions<C>,
    pub(crate) guard: Option<Guard<C>>,
}

impl<C> TransitionDescriptor<C> {
    /// A descriptor with no target: a self-transition.
    pub fn new() -> Self {
        Self {
            target: None,
            actions: Actions::new(),
            guard: None,
        }
    }

    /// A descriptor targeting `target`.
    pub fn to(target: impl Into<String>) -> Self {
        Self::new().target(target)
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn actions(mut self, actions: impl Into<Actions<C>>) -> Self {
        self.actions = actions.into();
        self
    }

    pub fn guard(mut self, guard: Guard<C>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Add a guard using a closure.
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&State<C>, &Event) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Guard::new(predicate));
        self
    }
}

impl<C> Default for TransitionDescriptor<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Delayed transition armed on entry.
pub struct AfterTransition<C> {
    pub(crate) delay: Duration,
    pub(crate) target: String,
    pub(crate) actions: Actions<C>,
}

impl<C> AfterTransition<C> {
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            delay: Duration::ZERO,
            target: target.into(),
            actions: Actions::new(),
        }
    }

    pub fn actions(mut self, actions: impl Into<Actions<C>>) -> Self {
        self.actions = actions.into();
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn transition_actions(&self) -> &Actions<C> {
        &self.actions
    }
}

impl<C> From<&str> for AfterTransition<C> {
    fn from(target: &str) -> Self {
        Self::to(target)
    }
}

impl<C> Clone for AfterTransition<C> {
    fn clone(&self) -> Self {
        Self {
            delay: self.delay,
            target: self.target.clone(),
            actions: self.actions.clone(),
        }
    }
}

/// Eventless transition evaluated on entry.
pub struct AlwaysTransition<C> {
    pub(crate) target: String,
    pub(crate) actions: Actions<C>,
    pub(crate) condition: Option<Condition<C>>,
}

impl<C> AlwaysTransition<C> {
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            actions: Actions::new(),
            condition: None,
        }
    }

    pub fn actions(mut self, actions: impl Into<Actions<C>>) -> Self {
        self.actions = actions.into();
        self
    }

    pub fn condition(mut self, condition: Condition<C>) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Add a condition using a closure.
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&State<C>) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Condition::new(predicate));
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn transition_actions(&self) -> &Actions<C> {
        &self.actions
    }

    /// Whether this candidate is taken from `state`.
    pub fn is_enabled(&self, state: &State<C>) -> bool {
        self.condition.as_ref().is_none_or(|c| c.check(state))
    }
}

impl<C> From<&str> for AlwaysTransition<C> {
    fn from(target: &str) -> Self {
        Self::to(target)
    }
}

impl<C> Clone for AlwaysTransition<C> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            actions: self.actions.clone(),
            condition: self.condition.clone(),
        }
    }
}
