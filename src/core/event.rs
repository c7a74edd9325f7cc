//! Events delivered to a machine.
//!
//! An event is a type tag plus an optional JSON payload. Bare strings
//! convert into events with a `null` payload, so `service.send("NEXT")`
//! and `service.send(Event::new("NEXT"))` are equivalent.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Event type used when the interpreter runs the initial entry actions.
pub const START_EVENT: &str = "machine.start";

/// An event with a type tag and an arbitrary payload.
///
/// # Example
///
/// ```rust
/// use waypoint::Event;
/// use serde_json::json;
///
/// let plain: Event = "NEXT".into();
/// assert_eq!(plain.kind(), "NEXT");
/// assert!(plain.payload().is_null());
///
/// let rich = Event::new("UPDATE").with_payload(json!({ "count": 3 }));
/// assert_eq!(rich.payload()["count"], 3);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    payload: Value,
}

impl Event {
    /// Create an event of the given type with no payload.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Value::Null,
        }
    }

    /// Attach a payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// The event's type tag, matched against a state's `on` table.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Synthetic event passed to the initial entry actions.
    pub fn start() -> Self {
        Self::new(START_EVENT)
    }

    /// Synthetic event for a delayed transition firing in `state`.
    pub fn after(delay: Duration, state: &str) -> Self {
        Self::new(format!("machine.after({})#{}", delay.as_millis(), state))
    }

    /// Synthetic event for an eventless transition leaving `state`.
    pub fn always(state: &str) -> Self {
        Self::new(format!("machine.always#{state}"))
    }
}

impl From<&str> for Event {
    fn from(kind: &str) -> Self {
        Self::new(kind)
    }
}

impl From<String> for Event {
    fn from(kind: String) -> Self {
        Self::new(kind)
    }
}

impl From<&Event> for Event {
    fn from(event: &Event) -> Self {
        event.clone()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind)
    }
}
