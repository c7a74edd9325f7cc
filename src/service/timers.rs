//! Virtual-time timer queue.
//!
//! Each service owns a queue with its own clock. Nothing fires on its
//! own: the service advances the clock and pops timers whose deadline has
//! passed, in deadline order, ties broken by arming order.
//!
//! Two kinds of timer live in the queue. Delayed transitions are armed on
//! entry to a state and cancelled as a group whenever the state is left.
//! Deferred sends occupy a single slot: arming a new one replaces the old.
//!
//! A zero-delay timer armed while the service is already draining the
//! queue waits for the next drain. Without that, two states that hand
//! over to each other after zero time would never let the drain finish.

use crate::core::Event;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, trace};

/// What to do when a timer fires.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum TimerTask {
    /// Take the `index`th delayed transition declared on `state`.
    After { state: String, index: usize },
    /// Deliver an event through `send`.
    Deferred(Event),
}

type TimerKey = (Duration, u64);

#[derive(Debug)]
struct Timer {
    task: TimerTask,
    immediate: bool,
}

#[derive(Debug, Default)]
pub(crate) struct TimerQueue {
    now: Duration,
    next_id: u64,
    pending: BTreeMap<TimerKey, Timer>,
    deferred: Option<TimerKey>,
}

impl TimerQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn now(&self) -> Duration {
        self.now
    }

    /// Move the clock forward. The clock never runs backwards.
    pub(crate) fn set_now(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }

    fn arm(&mut self, delay: Duration, task: TimerTask) -> TimerKey {
        let key = (self.now + delay, self.next_id);
        self.next_id += 1;
        trace!(id = key.1, ?delay, ?task, "timer armed");
        let immediate = delay.is_zero();
        self.pending.insert(key, Timer { task, immediate });
        key
    }

    /// Arm the delayed transition `index` of `state`.
    pub(crate) fn schedule_after(&mut self, state: &str, index: usize, delay: Duration) {
        self.arm(
            delay,
            TimerTask::After {
                state: state.to_owned(),
                index,
            },
        );
    }

    /// Arm a deferred send, replacing any send already waiting.
    pub(crate) fn schedule_deferred(&mut self, event: Event, delay: Duration) {
        self.cancel_deferred();
        let key = self.arm(delay, TimerTask::Deferred(event));
        self.deferred = Some(key);
    }

    /// Cancel every delayed-transition timer. The deferred send survives.
    pub(crate) fn cancel_after(&mut self) {
        let before = self.pending.len();
        self.pending
            .retain(|_, timer| !matches!(timer.task, TimerTask::After { .. }));
        let cancelled = before - self.pending.len();
        if cancelled > 0 {
            debug!(cancelled, "delayed transitions cancelled");
        }
    }

    pub(crate) fn cancel_deferred(&mut self) {
        if let Some(key) = self.deferred.take() {
            if self.pending.remove(&key).is_some() {
                debug!(id = key.1, "deferred send cancelled");
            }
        }
    }

    pub(crate) fn cancel_all(&mut self) {
        for ((_, id), timer) in std::mem::take(&mut self.pending) {
            trace!(id, task = ?timer.task, "timer cancelled (stop)");
        }
        self.deferred = None;
    }

    /// Id the next armed timer will get. Timers at or past a horizon were
    /// armed after it was taken.
    pub(crate) fn horizon(&self) -> u64 {
        self.next_id
    }

    /// Remove the earliest timer due at or before `until`, moving the clock
    /// to its deadline.
    ///
    /// Stops at a zero-delay timer armed at or past `horizon`: it stays
    /// queued, and so does everything behind it.
    pub(crate) fn pop_due(&mut self, until: Duration, horizon: u64) -> Option<TimerTask> {
        let entry = self.pending.first_entry()?;
        let (deadline, id) = *entry.key();
        if deadline > until {
            return None;
        }
        if id >= horizon && entry.get().immediate {
            trace!(id, "zero-delay timer held for the next drain");
            return None;
        }
        let Timer { task, .. } = entry.remove();
        if self.deferred == Some((deadline, id)) {
            self.deferred = None;
        }
        self.set_now(deadline);
        trace!(id, ?deadline, "timer fired");
        Some(task)
    }

    pub(crate) fn next_deadline(&self) -> Option<Duration> {
        self.pending.keys().next().map(|(deadline, _)| *deadline)
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}
