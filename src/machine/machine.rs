//! Pure transition resolution.

use crate::core::{Action, Actions, Event, State};
use crate::machine::config::{AfterTransition, AlwaysTransition, MachineConfig, TransitionConfig};
use crate::validation::{self, ConfigIssue};
use std::borrow::Cow;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use tracing::trace;

/// The state a transition is resolved from.
///
/// Accepts a snapshot, a bare state name (no context), or nothing.
pub enum StateRef<'a, C> {
    Absent,
    Name(&'a str),
    Snapshot(&'a State<C>),
}

impl<'a, C> From<&'a str> for StateRef<'a, C> {
    fn from(name: &'a str) -> Self {
        StateRef::Name(name)
    }
}

impl<'a, C> From<&'a String> for StateRef<'a, C> {
    fn from(name: &'a String) -> Self {
        StateRef::Name(name)
    }
}

impl<'a, C> From<&'a State<C>> for StateRef<'a, C> {
    fn from(state: &'a State<C>) -> Self {
        StateRef::Snapshot(state)
    }
}

impl<'a, C> From<Option<&'a State<C>>> for StateRef<'a, C> {
    fn from(state: Option<&'a State<C>>) -> Self {
        state.map_or(StateRef::Absent, StateRef::Snapshot)
    }
}

/// Immutable transition-resolution engine over a [`MachineConfig`].
///
/// The machine never runs actions and never holds a current state; it
/// only answers "what would happen". The [`Service`](crate::Service)
/// drives it over time.
///
/// # Example
///
/// ```rust
/// use waypoint::{create_machine, MachineConfig, StateNode};
///
/// let machine = create_machine(
///     MachineConfig::<()>::new()
///         .state("A", StateNode::new().on("NEXT", "B"))
///         .state("B", StateNode::new().on("NEXT", "A")),
/// );
///
/// let initial = machine.initial_state();
/// assert_eq!(initial.value(), "A");
///
/// let next = machine.transition(&initial, "NEXT").unwrap();
/// assert_eq!(next.value(), "B");
/// assert!(next.changed());
///
/// assert!(machine.transition(&initial, "UNKNOWN").is_none());
/// ```
pub struct Machine<C> {
    config: MachineConfig<C>,
}

/// Build a machine from a configuration. Never fails.
pub fn create_machine<C>(config: MachineConfig<C>) -> Machine<C> {
    Machine::new(config)
}

impl<C> Machine<C> {
    pub fn new(config: MachineConfig<C>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MachineConfig<C> {
        &self.config
    }

    pub fn has_state(&self, name: &str) -> bool {
        self.config.contains(name)
    }

    pub fn state_names(&self) -> impl Iterator<Item = &str> {
        self.config.states.keys().map(String::as_str)
    }

    /// Name of the initial state: the configured one, else the first
    /// declared state, else the empty name.
    pub fn initial_value(&self) -> &str {
        self.config
            .initial
            .as_deref()
            .or_else(|| self.config.states.keys().next().map(String::as_str))
            .unwrap_or_default()
    }

    /// Actions run on entering `state`; empty when undeclared.
    pub fn entry_actions(&self, state: &str) -> &[Action<C>] {
        self.config
            .get(state)
            .map(|node| node.entry.as_slice())
            .unwrap_or_default()
    }

    /// Actions run on leaving `state`; empty when undeclared.
    pub fn exit_actions(&self, state: &str) -> &[Action<C>] {
        self.config
            .get(state)
            .map(|node| node.exit.as_slice())
            .unwrap_or_default()
    }

    /// Delayed transitions of `state`, if any are declared.
    pub fn after_config(&self, state: &str) -> Option<&[AfterTransition<C>]> {
        self.config
            .get(state)
            .map(|node| node.after.as_slice())
            .filter(|after| !after.is_empty())
    }

    /// Eventless transitions of `state`, if any are declared.
    pub fn always_config(&self, state: &str) -> Option<&[AlwaysTransition<C>]> {
        self.config
            .get(state)
            .map(|node| node.always.as_slice())
            .filter(|always| !always.is_empty())
    }

    /// Lint the configuration, collecting every problem found.
    pub fn validate(&self) -> Validation<(), NonEmptyVec<ConfigIssue>> {
        validation::validate(&self.config)
    }
}

impl<C: Clone> Machine<C> {
    /// Snapshot of the initial state, carrying the configured context.
    pub fn initial_state(&self) -> State<C> {
        State::from_parts(
            self.initial_value(),
            self.config.context.clone(),
            Actions::new(),
            false,
        )
    }

    /// Resolve the state that `event` would lead to from `state`.
    ///
    /// Returns `None` when there is no transition: no current state, an
    /// unknown state, no handler for the event, a bare target naming an
    /// unknown state, a self-transition without actions, or a guard that
    /// rejects the pre-transition snapshot.
    pub fn transition<'a>(
        &self,
        state: impl Into<StateRef<'a, C>>,
        event: impl Into<Event>,
    ) -> Option<State<C>>
    where
        C: 'a,
    {
        let current: Cow<'a, State<C>> = match state.into() {
            StateRef::Absent => return None,
            StateRef::Name(name) => Cow::Owned(State::new(name)),
            StateRef::Snapshot(state) => Cow::Borrowed(state),
        };
        let event = event.into();

        let Some(node) = self.config.get(current.value()) else {
            trace!(state = current.value(), "unknown state, no transition");
            return None;
        };
        let Some(transition) = node.on.get(event.kind()) else {
            trace!(state = current.value(), event = event.kind(), "event not handled");
            return None;
        };

        let (target, actions, guard) = match transition {
            TransitionConfig::Target(target) => {
                if !self.has_state(target) {
                    trace!(target = target.as_str(), "undefined target, no transition");
                    return None;
                }
                (target.as_str(), Actions::new(), None)
            }
            TransitionConfig::Descriptor(descriptor) => {
                let target = descriptor
                    .target
                    .as_deref()
                    .filter(|target| self.has_state(target))
                    .unwrap_or(current.value());
                (target, descriptor.actions.clone(), descriptor.guard.as_ref())
            }
        };

        if target == current.value() && actions.is_empty() {
            trace!(state = target, "self-transition without actions suppressed");
            return None;
        }

        let next = State::from_parts(
            target,
            current.context().cloned(),
            actions,
            target != current.value(),
        );

        if let Some(guard) = guard {
            if !guard.check(&current, &event) {
                trace!(state = current.value(), event = event.kind(), "guard rejected");
                return None;
            }
        }
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::config::{StateNode, TransitionDescriptor};
    use regex::Regex;

    #[derive(Clone, PartialEq, Debug)]
    struct Ctx {
        test: &'static str,
    }

    fn cycle() -> Machine<Ctx> {
        Machine::new(
            MachineConfig::new()
                .initial("A")
                .state("A", StateNode::new().on("NEXT", "B"))
                .state("B", StateNode::new().on("NEXT", "C"))
                .state("C", StateNode::new().on("NEXT", "D"))
                .state("D", StateNode::new().on("NEXT", "A")),
        )
    }

    #[test]
    fn initial_state_uses_configured_name() {
        let machine = cycle();
        let initial = machine.initial_state();
        assert_eq!(initial.value(), "A");
        assert!(!initial.changed());
        assert!(initial.context().is_none());
    }

    #[test]
    fn initial_state_defaults_to_first_declared() {
        let machine: Machine<Ctx> = Machine::new(
            MachineConfig::new()
                .state("A", StateNode::new().on("NEXT", "B"))
                .state("B", StateNode::new().on("NEXT", "A")),
        );
        assert_eq!(machine.initial_state().value(), "A");
        let next = machine.transition(&machine.initial_state(), "NEXT");
        assert_eq!(next.unwrap().value(), "B");
    }

    #[test]
    fn empty_machine_never_transitions() {
        let machine: Machine<Ctx> = Machine::new(MachineConfig::new());
        let initial = machine.initial_state();
        assert_eq!(initial.value(), "");
        assert!(machine.transition(&initial, "NEXT").is_none());
    }

    #[test]
    fn states_without_transitions_do_not_transition() {
        let machine: Machine<Ctx> = Machine::new(
            MachineConfig::new()
                .state("A", StateNode::new())
                .state("B", StateNode::new()),
        );
        assert!(machine.transition("A", "NEXT").is_none());
    }

    #[test]
    fn absent_state_does_not_transition() {
        let machine = cycle();
        assert!(machine.transition(None, "NEXT").is_none());
    }

    #[test]
    fn unknown_state_does_not_transition() {
        let machine = cycle();
        assert!(machine.transition("Z", "NEXT").is_none());
    }

    #[test]
    fn bare_target_to_unknown_state_is_void() {
        let machine: Machine<Ctx> =
            Machine::new(MachineConfig::new().state("A", StateNode::new().on("NEXT", "B")));
        assert!(machine.transition("A", "NEXT").is_none());
    }

    #[test]
    fn descriptor_to_unknown_state_falls_back_to_self() {
        let machine: Machine<Ctx> = Machine::new(MachineConfig::new().state(
            "A",
            StateNode::new().on("NEXT", TransitionDescriptor::to("B").actions("log")),
        ));
        let next = machine.transition("A", "NEXT").unwrap();
        assert_eq!(next.value(), "A");
        assert!(!next.changed());
    }

    #[test]
    fn empty_descriptor_is_suppressed() {
        let machine: Machine<Ctx> = Machine::new(
            MachineConfig::new()
                .state("A", StateNode::new().on("NEXT", TransitionDescriptor::new()))
                .state("B", StateNode::new()),
        );
        assert!(machine.transition("A", "NEXT").is_none());
    }

    #[test]
    fn walks_the_cycle() {
        let machine = cycle();
        assert_eq!(machine.transition("A", "NEXT").unwrap().value(), "B");
        assert_eq!(machine.transition("B", "NEXT").unwrap().value(), "C");
        assert_eq!(machine.transition("C", "NEXT").unwrap().value(), "D");
        assert_eq!(machine.transition("D", "NEXT").unwrap().value(), "A");
    }

    #[test]
    fn event_objects_and_strings_are_equivalent() {
        let machine = cycle();
        let by_object = machine.transition("A", Event::new("NEXT")).unwrap();
        let by_string = machine.transition("A", "NEXT").unwrap();
        assert_eq!(by_object.value(), by_string.value());
    }

    #[test]
    fn lookups_return_declared_actions() {
        let machine: Machine<Ctx> = Machine::new(
            MachineConfig::new()
                .state(
                    "A",
                    StateNode::new()
                        .entry("enter-a")
                        .exit(vec![Action::named("exit-a"), Action::from_fn(|_, _| ())]),
                )
                .state("B", StateNode::new()),
        );

        let entry: Vec<_> = machine.entry_actions("A").iter().filter_map(Action::name).collect();
        assert_eq!(entry, vec!["enter-a"]);
        assert_eq!(machine.exit_actions("A").len(), 2);
        assert!(machine.entry_actions("B").is_empty());
        assert!(machine.exit_actions("missing").is_empty());
        assert!(machine.after_config("A").is_none());
        assert!(machine.always_config("A").is_none());
    }

    #[test]
    fn transition_carries_actions() {
        let machine: Machine<Ctx> = Machine::new(
            MachineConfig::new()
                .state(
                    "A",
                    StateNode::new()
                        .on("NEXT", TransitionDescriptor::to("B").actions(["one", "two"]))
                        .on("STAY", TransitionDescriptor::new().actions("A-NEXT")),
                )
                .state("B", StateNode::new()),
        );

        let next = machine.transition("A", "NEXT").unwrap();
        assert_eq!(next.value(), "B");
        assert_eq!(next.actions().names().collect::<Vec<_>>(), vec!["one", "two"]);

        let stay = machine.transition("A", "STAY").unwrap();
        assert_eq!(stay.value(), "A");
        assert!(!stay.changed());
        assert_eq!(stay.actions().names().collect::<Vec<_>>(), vec!["A-NEXT"]);
    }

    #[test]
    fn guard_gates_transition() {
        let machine: Machine<Ctx> = Machine::new(
            MachineConfig::new()
                .state(
                    "A",
                    StateNode::new()
                        .on("NO", TransitionDescriptor::to("B").when(|_, _| false))
                        .on("YES", TransitionDescriptor::to("B").when(|_, _| true))
                        .on(
                            "SELF",
                            TransitionDescriptor::new()
                                .actions("log")
                                .when(|_, _| true),
                        ),
                )
                .state("B", StateNode::new()),
        );

        assert!(machine.transition("A", "NO").is_none());
        assert_eq!(machine.transition("A", "YES").unwrap().value(), "B");
        assert_eq!(machine.transition("A", "SELF").unwrap().value(), "A");
    }

    #[test]
    fn guard_sees_pre_transition_state_and_event() {
        let machine: Machine<Ctx> = Machine::new(
            MachineConfig::new()
                .context(Ctx { test: "test" })
                .state(
                    "A",
                    StateNode::new().on(
                        "NEXT",
                        TransitionDescriptor::to("B").when(|state: &State<Ctx>, event: &Event| {
                            state.matches("A") && event.payload()["ok"] == true
                        }),
                    ),
                )
                .state("B", StateNode::new()),
        );

        let initial = machine.initial_state();
        let rejected = Event::new("NEXT");
        let accepted = Event::new("NEXT").with_payload(serde_json::json!({ "ok": true }));

        assert!(machine.transition(&initial, rejected).is_none());
        assert_eq!(machine.transition(&initial, accepted).unwrap().value(), "B");
    }

    #[test]
    fn context_is_carried_forward() {
        let machine: Machine<Ctx> = Machine::new(
            MachineConfig::new()
                .initial("A")
                .context(Ctx { test: "test" })
                .state("A", StateNode::new().on("NEXT", "B"))
                .state("B", StateNode::new().on("NEXT", "A")),
        );

        let initial = machine.initial_state();
        assert_eq!(initial.context(), Some(&Ctx { test: "test" }));
        assert!(!initial.changed());

        let next = machine.transition(&initial, "NEXT").unwrap();
        assert_eq!(next.context(), Some(&Ctx { test: "test" }));
        assert!(next.changed());
        assert!(next.matches("B"));
        assert!(!next.matches("A"));
        assert!(next.matches_pattern(&Regex::new("B").unwrap()));
    }

    #[test]
    fn resolution_does_not_touch_input_state() {
        let machine = cycle();
        let initial = machine.initial_state();
        let _ = machine.transition(&initial, "NEXT");
        assert_eq!(initial.value(), "A");
        assert!(!initial.changed());
    }
}
