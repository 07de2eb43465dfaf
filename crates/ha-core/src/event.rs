//! Event types delivered to the automation engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{events, Context, Value};

/// What happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EventKind {
    /// An external entity reported a new value
    StateChanged {
        /// External entity id (e.g. "binary_sensor.kitchen_motion")
        entity_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        old_value: Option<Value>,
        new_value: Value,
    },

    /// Synthetic time signal injected by the caller
    Tick,
}

/// An event processed by the engine
///
/// The engine treats `time_fired` as "now" for duration gates and wait
/// deadlines, so replaying events with their original timestamps is
/// deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    pub kind: EventKind,

    /// Origin of the event (local, remote, etc.)
    pub origin: EventOrigin,

    /// When the event was fired
    pub time_fired: DateTime<Utc>,

    /// Context tracking the origin and causality
    pub context: Context,
}

impl Event {
    /// Create a new event with current timestamp
    pub fn new(kind: EventKind, context: Context) -> Self {
        Self {
            kind,
            origin: EventOrigin::Local,
            time_fired: Utc::now(),
            context,
        }
    }

    /// Create a state change event
    pub fn state_changed(
        entity_id: impl Into<String>,
        old_value: Option<Value>,
        new_value: impl Into<Value>,
    ) -> Self {
        Self::new(
            EventKind::StateChanged {
                entity_id: entity_id.into(),
                old_value,
                new_value: new_value.into(),
            },
            Context::new(),
        )
    }

    /// Create a tick event at the given time
    pub fn tick(at: DateTime<Utc>) -> Self {
        Self::new(EventKind::Tick, Context::new()).at(at)
    }

    /// Override the fired timestamp
    pub fn at(mut self, time_fired: DateTime<Utc>) -> Self {
        self.time_fired = time_fired;
        self
    }

    /// Create an event with a specific origin
    pub fn with_origin(mut self, origin: EventOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Event type name, as used for bus subscriptions
    pub fn event_type(&self) -> &'static str {
        match self.kind {
            EventKind::StateChanged { .. } => events::STATE_CHANGED,
            EventKind::Tick => events::TICK,
        }
    }

    /// Entity id carried by a state change, if any
    pub fn entity_id(&self) -> Option<&str> {
        match &self.kind {
            EventKind::StateChanged { entity_id, .. } => Some(entity_id),
            EventKind::Tick => None,
        }
    }
}

/// Origin of an event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOrigin {
    /// Event originated locally
    #[default]
    Local,
    /// Event came from a remote source (websocket, message broker)
    Remote,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_event_type_names() {
        let changed = Event::state_changed("light.kitchen", None, "on");
        assert_eq!(changed.event_type(), "state_changed");
        assert_eq!(changed.entity_id(), Some("light.kitchen"));

        let tick = Event::tick(Utc::now());
        assert_eq!(tick.event_type(), "tick");
        assert_eq!(tick.entity_id(), None);
    }

    #[test]
    fn test_tick_keeps_given_time() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(Event::tick(at).time_fired, at);
    }

    #[test]
    fn test_state_changed_serializes_flat() {
        let event = Event::state_changed("sensor.temp", None, 21.5);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "state_changed");
        assert_eq!(json["entity_id"], "sensor.temp");
        assert!(json.get("old_value").is_none());
    }
}
