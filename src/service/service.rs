//! The interpreter: one current state driven over time.

use crate::core::{
    Action, ActionResult, Actions, Assignment, Event, State, TransitionHistory, TransitionRecord,
};
use crate::machine::Machine;
use crate::service::options::ServiceOptions;
use crate::service::timers::{TimerQueue, TimerTask};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Lifecycle of a service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceStatus {
    /// Events are ignored and no timers are armed.
    #[default]
    Stopped,
    Running,
}

type Listener<C> = Rc<dyn Fn(&State<C>)>;

struct Listeners<C> {
    next_id: u64,
    entries: BTreeMap<u64, Listener<C>>,
}

/// Handle returned by [`Service::subscribe`].
///
/// Dropping the handle keeps the listener registered; call
/// [`unsubscribe`](Subscription::unsubscribe) to remove it.
pub struct Subscription<C> {
    listeners: Weak<RefCell<Listeners<C>>>,
    id: u64,
}

impl<C> Subscription<C> {
    /// Remove the listener. Calling this more than once, or after the
    /// service is gone, does nothing.
    pub fn unsubscribe(&self) {
        if let Some(listeners) = self.listeners.upgrade() {
            if listeners.borrow_mut().entries.remove(&self.id).is_some() {
                trace!(id = self.id, "listener removed");
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.listeners
            .upgrade()
            .is_some_and(|listeners| listeners.borrow().entries.contains_key(&self.id))
    }
}

impl<C> fmt::Debug for Subscription<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Stateful interpreter for a [`Machine`].
///
/// The service owns the current [`State`] and runs the protocol around
/// each transition: exit actions of the old state, commit, entry actions
/// of the new state, the transition's own actions, subscriber
/// notification, arming delayed transitions, then resolving eventless
/// transitions.
///
/// Time is virtual. Delayed transitions and deferred sends fire only when
/// the clock is moved with [`advance`](Service::advance) or
/// [`run_for`](Service::run_for).
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use std::time::Duration;
/// use waypoint::{create_machine, interpret, MachineConfig, ServiceOptions, StateNode};
///
/// let machine = create_machine(
///     MachineConfig::<()>::new()
///         .initial("idle")
///         .state("idle", StateNode::new().on("START", "running"))
///         .state(
///             "running",
///             StateNode::new().after(Duration::from_millis(2000), "completed"),
///         )
///         .state("completed", StateNode::new()),
/// );
///
/// let mut service = interpret(machine, ServiceOptions::new());
/// let seen = Rc::new(Cell::new(0));
/// let counter = Rc::clone(&seen);
/// service.subscribe(move |_| counter.set(counter.get() + 1));
///
/// service.start();
/// service.send("START");
/// assert!(service.state().matches("running"));
///
/// service.advance(Duration::from_millis(1000));
/// assert!(service.state().matches("running"));
///
/// service.advance(Duration::from_millis(1000));
/// assert!(service.state().matches("completed"));
/// assert_eq!(seen.get(), 2);
/// ```
pub struct Service<C> {
    machine: Arc<Machine<C>>,
    options: ServiceOptions<C>,
    status: ServiceStatus,
    current: State<C>,
    listeners: Rc<RefCell<Listeners<C>>>,
    timers: TimerQueue,
    history: TransitionHistory,
}

/// Create a stopped service for `machine`.
pub fn interpret<C>(machine: impl Into<Arc<Machine<C>>>, options: ServiceOptions<C>) -> Service<C>
where
    C: Clone + PartialEq + 'static,
{
    Service::new(machine, options)
}

/// Alias of [`interpret`].
pub fn create_service<C>(
    machine: impl Into<Arc<Machine<C>>>,
    options: ServiceOptions<C>,
) -> Service<C>
where
    C: Clone + PartialEq + 'static,
{
    Service::new(machine, options)
}

impl<C> Service<C>
where
    C: Clone + PartialEq + 'static,
{
    /// Create a stopped service positioned on the machine's initial state.
    pub fn new(machine: impl Into<Arc<Machine<C>>>, options: ServiceOptions<C>) -> Self {
        let machine = machine.into();
        let current = machine.initial_state();
        let history = TransitionHistory::with_limit(options.max_history());
        Self {
            machine,
            options,
            status: ServiceStatus::Stopped,
            current,
            listeners: Rc::new(RefCell::new(Listeners {
                next_id: 0,
                entries: BTreeMap::new(),
            })),
            timers: TimerQueue::new(),
            history,
        }
    }

    /// The current snapshot.
    pub fn state(&self) -> &State<C> {
        &self.current
    }

    pub fn status(&self) -> ServiceStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == ServiceStatus::Running
    }

    pub fn machine(&self) -> &Machine<C> {
        &self.machine
    }

    pub fn options(&self) -> &ServiceOptions<C> {
        &self.options
    }

    /// Committed transitions, oldest first.
    pub fn history(&self) -> &TransitionHistory {
        &self.history
    }

    /// Reading of the service's virtual clock.
    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    /// When the next armed timer is due, if any.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// Number of armed timers, delayed transitions and deferred send
    /// together.
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Start interpreting.
    ///
    /// Runs the entry actions of the current state, arms its delayed
    /// transitions and resolves eventless transitions. Does nothing if the
    /// service is already running. Subscribers are not notified.
    pub fn start(&mut self) {
        if self.is_running() {
            trace!(state = self.current.value(), "service already running");
            return;
        }
        self.status = ServiceStatus::Running;
        debug!(state = self.current.value(), "service started");

        let machine = Arc::clone(&self.machine);
        let event = Event::start();
        self.execute_actions(machine.entry_actions(self.current.value()), &event);
        self.setup_timers();
        self.resolve_always();
    }

    /// Stop interpreting and cancel every armed timer.
    ///
    /// Exit actions do not run: stopping is not a transition.
    pub fn stop(&mut self) {
        if !self.is_running() {
            return;
        }
        self.status = ServiceStatus::Stopped;
        self.timers.cancel_all();
        debug!(state = self.current.value(), "service stopped");
    }

    /// Deliver an event. Ignored while stopped.
    ///
    /// Cancels any deferred send still waiting, whether or not the event
    /// leads anywhere.
    pub fn send(&mut self, event: impl Into<Event>) {
        let event = event.into();
        if !self.is_running() {
            debug!(event = event.kind(), "service stopped, event ignored");
            return;
        }
        self.timers.cancel_deferred();

        let machine = Arc::clone(&self.machine);
        let Some(next) = machine.transition(&self.current, &event) else {
            return;
        };

        if next.changed() {
            let (target, _, actions, _) = next.into_parts();
            self.take_transition(&target, actions, &event);
            self.resolve_always();
        } else {
            let previous = std::mem::replace(&mut self.current, next);
            let actions = self.current.actions().clone();
            self.execute_actions(actions.as_slice(), &event);

            if self.current.context() != previous.context() {
                self.replace_current(|value, context, actions, _| {
                    State::from_parts(value, context, actions, true)
                });
                debug!(state = self.current.value(), "context updated");
                self.notify();
            }
        }
    }

    /// Deliver `event` once `delay` has passed on the service clock.
    ///
    /// Replaces any deferred send still waiting, whether it came from
    /// here or from a send action.
    pub fn send_after(&mut self, event: impl Into<Event>, delay: Duration) {
        let event = event.into();
        if !self.is_running() {
            debug!(event = event.kind(), "service stopped, deferred send ignored");
            return;
        }
        debug!(event = event.kind(), ?delay, "send deferred");
        self.timers.schedule_deferred(event, delay);
    }

    /// Register a listener called with the new snapshot on every
    /// notification.
    pub fn subscribe<F>(&self, listener: F) -> Subscription<C>
    where
        F: Fn(&State<C>) + 'static,
    {
        let mut listeners = self.listeners.borrow_mut();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.insert(id, Rc::new(listener));
        trace!(id, "listener added");

        Subscription {
            listeners: Rc::downgrade(&self.listeners),
            id,
        }
    }

    /// Move the virtual clock forward, firing every timer that falls due
    /// on the way in deadline order.
    ///
    /// Timers armed by a transition taken during the advance fire too if
    /// their deadline is within the window. Zero-delay timers armed during
    /// the advance are the exception: they stay due, and the advance stops
    /// firing once one reaches the head of the queue. The next call
    /// picks them up.
    pub fn advance(&mut self, by: Duration) {
        let until = self.timers.now() + by;
        let horizon = self.timers.horizon();
        while let Some(task) = self.timers.pop_due(until, horizon) {
            self.fire(task);
        }
        self.timers.set_now(until);
    }

    /// Drive the service in real time for `duration`.
    ///
    /// Sleeps on the tokio clock until each deadline, then advances the
    /// virtual clock by the same amount. Under a paused tokio clock this
    /// completes without waiting.
    pub async fn run_for(&mut self, duration: Duration) {
        let until = self.timers.now() + duration;
        let mut last = None;
        while let Some(deadline) = self.timers.next_deadline().filter(|d| *d <= until) {
            // Only a held zero-delay timer is still due at the instant just drained.
            if last == Some(deadline) {
                break;
            }
            last = Some(deadline);
            let wait = deadline.saturating_sub(self.timers.now());
            tokio::time::sleep(wait).await;
            self.advance(wait);
        }
        let rest = until.saturating_sub(self.timers.now());
        tokio::time::sleep(rest).await;
        self.advance(rest);
    }

    fn fire(&mut self, task: TimerTask) {
        match task {
            TimerTask::Deferred(event) => {
                debug!(event = event.kind(), "deferred send delivered");
                self.send(event);
            }
            TimerTask::After { state, index } => {
                if !self.current.matches(&state) {
                    trace!(state = state.as_str(), "stale delayed transition skipped");
                    return;
                }
                let machine = Arc::clone(&self.machine);
                let Some(after) = machine.after_config(&state).and_then(|a| a.get(index)) else {
                    return;
                };
                if after.target() == state {
                    trace!(state = state.as_str(), "delayed transition to own state ignored");
                    return;
                }
                if !machine.has_state(after.target()) {
                    debug!(
                        state = state.as_str(),
                        target = after.target(),
                        "delayed transition to unknown state ignored"
                    );
                    return;
                }
                let event = Event::after(after.delay(), &state);
                self.take_transition(after.target(), after.transition_actions().clone(), &event);
                self.resolve_always();
            }
        }
    }

    /// Follow eventless transitions until none applies or a state name
    /// repeats within this pass.
    fn resolve_always(&mut self) {
        let machine = Arc::clone(&self.machine);
        let mut visited: HashSet<String> = HashSet::new();

        loop {
            let value = self.current.value().to_owned();
            let Some(candidates) = machine.always_config(&value) else {
                break;
            };
            if !visited.insert(value.clone()) {
                debug!(state = value.as_str(), "eventless cycle stopped");
                break;
            }
            let Some(chosen) = candidates.iter().find(|c| c.is_enabled(&self.current)) else {
                break;
            };
            if !machine.has_state(chosen.target()) {
                debug!(
                    state = value.as_str(),
                    target = chosen.target(),
                    "eventless transition to unknown state ignored"
                );
                break;
            }

            let event = Event::always(&value);
            self.take_transition(chosen.target(), chosen.transition_actions().clone(), &event);
        }
    }

    /// Leave the current state for `target`.
    ///
    /// Eventless resolution is left to the caller so that chains are
    /// followed iteratively.
    fn take_transition(&mut self, target: &str, actions: Actions<C>, event: &Event) {
        let machine = Arc::clone(&self.machine);
        let from = self.current.value().to_owned();

        self.timers.cancel_after();
        self.execute_actions(machine.exit_actions(&from), event);

        let context = self.current.context().cloned();
        self.current = State::from_parts(target, context, actions, true);
        self.record(&from, target, event);
        debug!(
            from = from.as_str(),
            to = target,
            event = event.kind(),
            "transition committed"
        );

        self.execute_actions(machine.entry_actions(target), event);
        let pending = self.current.actions().clone();
        self.execute_actions(pending.as_slice(), event);

        self.notify();
        self.setup_timers();
    }

    fn setup_timers(&mut self) {
        let machine = Arc::clone(&self.machine);
        let Some(after) = machine.after_config(self.current.value()) else {
            return;
        };
        for (index, transition) in after.iter().enumerate() {
            self.timers
                .schedule_after(self.current.value(), index, transition.delay());
        }
        debug!(
            state = self.current.value(),
            armed = after.len(),
            "delayed transitions armed"
        );
    }

    /// Run `actions` in order. Each action sees the context left by the
    /// ones before it.
    fn execute_actions(&mut self, actions: &[Action<C>], event: &Event) {
        for action in actions {
            let result = match action {
                Action::Direct(f) => f(self.current.context(), event),
                Action::Named(name) => match self.options.resolve(name) {
                    Some(f) => f(self.current.context(), event),
                    None => {
                        trace!(action = name.as_str(), "unresolved action skipped");
                        continue;
                    }
                },
            };

            match result {
                ActionResult::Done => {}
                ActionResult::Assign(assignment) => self.apply_assignment(assignment),
                ActionResult::Send(request) => {
                    debug!(
                        event = request.event.kind(),
                        delay = ?request.delay,
                        "send requested by action"
                    );
                    self.timers.schedule_deferred(request.event, request.delay);
                }
            }
        }
    }

    fn apply_assignment(&mut self, assignment: Assignment<C>) {
        let Some(context) = self.current.context() else {
            debug!(
                state = self.current.value(),
                "assignment ignored, machine has no context"
            );
            return;
        };
        let next = assignment.apply(context);
        self.replace_current(|value, _, actions, changed| {
            State::from_parts(value, Some(next), actions, changed)
        });
    }

    fn replace_current<F>(&mut self, rebuild: F)
    where
        F: FnOnce(String, Option<C>, Actions<C>, bool) -> State<C>,
    {
        let (value, context, actions, changed) =
            std::mem::replace(&mut self.current, State::new("")).into_parts();
        self.current = rebuild(value, context, actions, changed);
    }

    fn record(&mut self, from: &str, to: &str, event: &Event) {
        self.history.push(TransitionRecord {
            from: from.to_owned(),
            to: to.to_owned(),
            event: event.kind().to_owned(),
            at: self.timers.now(),
            timestamp: Utc::now(),
        });
    }

    fn notify(&self) {
        let snapshot: Vec<(u64, Listener<C>)> = self
            .listeners
            .borrow()
            .entries
            .iter()
            .map(|(id, listener)| (*id, Rc::clone(listener)))
            .collect();

        for (id, listener) in snapshot {
            // A listener may unsubscribe another one mid-notification.
            if self.listeners.borrow().entries.contains_key(&id) {
                listener(&self.current);
            }
        }
    }
}

impl<C: fmt::Debug> fmt::Debug for Service<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("status", &self.status)
            .field("state", &self.current)
            .field("now", &self.timers.now())
            .field("pending_timers", &self.timers.len())
            .field("listeners", &self.listeners.borrow().entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{assign, send};
    use crate::machine::{MachineConfig, StateNode, TransitionDescriptor};
    use std::cell::Cell;

    #[derive(Clone, PartialEq, Debug)]
    struct Ctx {
        count: u32,
    }

    fn toggle() -> Machine<Ctx> {
        Machine::new(
            MachineConfig::new()
                .initial("off")
                .context(Ctx { count: 0 })
                .state("off", StateNode::new().on("TOGGLE", "on"))
                .state(
                    "on",
                    StateNode::new().on("TOGGLE", "off").on(
                        "BUMP",
                        TransitionDescriptor::new().actions(Action::<Ctx>::from_fn(|_, _| {
                            assign(|c: &Ctx| Ctx { count: c.count + 1 })
                        })),
                    ),
                ),
        )
    }

    #[test]
    fn new_service_is_stopped_on_initial_state() {
        let service = interpret(toggle(), ServiceOptions::new());
        assert_eq!(service.status(), ServiceStatus::Stopped);
        assert!(service.state().matches("off"));
        assert_eq!(service.state().context(), Some(&Ctx { count: 0 }));
    }

    #[test]
    fn send_while_stopped_is_ignored() {
        let mut service = interpret(toggle(), ServiceOptions::new());
        service.send("TOGGLE");
        assert!(service.state().matches("off"));
    }

    #[test]
    fn start_is_idempotent() {
        let entries = Rc::new(Cell::new(0));
        let counter = Rc::clone(&entries);
        let machine = Machine::new(
            MachineConfig::<()>::new().state("idle", StateNode::new().entry("enter")),
        );
        let options = ServiceOptions::<()>::new().action("enter", |_, _| ());
        let mut service = interpret(machine, options);
        service.subscribe(move |_| counter.set(counter.get() + 1));

        service.start();
        service.start();
        assert!(service.is_running());
        assert_eq!(entries.get(), 0);
    }

    #[test]
    fn self_transition_with_assignment_notifies() {
        let mut service = interpret(toggle(), ServiceOptions::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        service.subscribe(move |state: &State<Ctx>| {
            sink.borrow_mut().push((state.value().to_string(), state.changed()))
        });

        service.start();
        service.send("TOGGLE");
        service.send("BUMP");

        assert_eq!(service.state().context(), Some(&Ctx { count: 1 }));
        assert_eq!(
            *seen.borrow(),
            vec![("on".to_string(), true), ("on".to_string(), true)]
        );
    }

    #[test]
    fn self_transition_without_context_change_is_silent() {
        let machine = Machine::new(
            MachineConfig::new()
                .context(Ctx { count: 0 })
                .state(
                    "idle",
                    StateNode::new().on("PING", TransitionDescriptor::new().actions("noop")),
                ),
        );
        let options = ServiceOptions::<Ctx>::new().action("noop", |_, _| ());
        let mut service = interpret(machine, options);
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        service.subscribe(move |_| counter.set(counter.get() + 1));

        service.start();
        service.send("PING");

        assert_eq!(calls.get(), 0);
        assert!(!service.state().changed());
        assert_eq!(service.state().actions().len(), 1);
    }

    #[test]
    fn assignment_without_context_is_ignored() {
        let machine = Machine::new(MachineConfig::<u32>::new().state(
            "idle",
            StateNode::new().entry(Action::<u32>::from_fn(|_, _| assign(|n: &u32| n + 1))),
        ));
        let mut service = interpret(machine, ServiceOptions::new());
        service.start();
        assert!(service.state().context().is_none());
    }

    #[test]
    fn send_action_is_deferred() {
        let machine = Machine::new(
            MachineConfig::<()>::new()
                .state(
                    "a",
                    StateNode::new().on(
                        "GO",
                        TransitionDescriptor::to("b").actions(Action::<()>::from_fn(|_, _| {
                            send("NEXT", Duration::ZERO)
                        })),
                    ),
                )
                .state("b", StateNode::new().on("NEXT", "c"))
                .state("c", StateNode::new()),
        );
        let mut service = interpret(machine, ServiceOptions::new());
        service.start();
        service.send("GO");

        assert!(service.state().matches("b"));
        assert_eq!(service.pending_timers(), 1);

        service.advance(Duration::ZERO);
        assert!(service.state().matches("c"));
        assert_eq!(service.pending_timers(), 0);
    }

    #[test]
    fn history_records_committed_transitions() {
        let mut service = interpret(toggle(), ServiceOptions::new().history_limit(2));
        service.start();
        service.send("TOGGLE");
        service.send("BUMP");
        service.send("TOGGLE");
        service.send("TOGGLE");

        assert_eq!(service.history().len(), 2);
        assert_eq!(service.history().get_path(), vec!["on", "off", "on"]);
        assert_eq!(
            service.history().last().map(|r| r.event.as_str()),
            Some("TOGGLE")
        );
    }

    #[test]
    fn subscription_outlives_service() {
        let service = interpret(toggle(), ServiceOptions::new());
        let subscription = service.subscribe(|_| {});
        assert!(subscription.is_active());

        drop(service);
        assert!(!subscription.is_active());
        subscription.unsubscribe();
    }
}
