//! Event bus carrying state changes and ticks to the automation engine
//!
//! Whatever feeds the engine (a websocket client, a broker consumer, the
//! periodic ticker) fires [`Event`]s here; the automation service subscribes
//! to all of them.

use dashmap::DashMap;
use ha_core::{events::MATCH_ALL, Event, EventKind};
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Default channel capacity for event subscriptions
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// The event bus for publishing and subscribing to events
///
/// Supports:
/// - Subscribing to one event type (`state_changed`, `tick`)
/// - Subscribing to all events (MATCH_ALL)
/// - Subscribing to the state changes of one entity
pub struct EventBus {
    /// Map of event types to their broadcast senders
    listeners: DashMap<String, broadcast::Sender<Event>>,
    /// Special sender for MATCH_ALL subscribers
    match_all_sender: broadcast::Sender<Event>,
    /// Channel capacity
    capacity: usize,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new event bus with specified channel capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (match_all_sender, _) = broadcast::channel(capacity.max(1));
        Self {
            listeners: DashMap::new(),
            match_all_sender,
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to events of a specific type
    pub fn subscribe(&self, event_type: &str) -> broadcast::Receiver<Event> {
        trace!(event_type, "Subscribing to event type");

        if event_type == MATCH_ALL {
            return self.match_all_sender.subscribe();
        }

        self.listeners
            .entry(event_type.to_string())
            .or_insert_with(|| {
                let (tx, _) = broadcast::channel(self.capacity);
                tx
            })
            .subscribe()
    }

    /// Subscribe to all events
    pub fn subscribe_all(&self) -> broadcast::Receiver<Event> {
        self.match_all_sender.subscribe()
    }

    /// Subscribe to state changes of one external entity id
    pub fn subscribe_entity(&self, entity_id: impl Into<String>) -> EntityEventReceiver {
        EntityEventReceiver {
            rx: self.subscribe(ha_core::events::STATE_CHANGED),
            entity_id: entity_id.into(),
        }
    }

    /// Fire an event to all subscribers
    ///
    /// The event will be delivered to:
    /// 1. All subscribers of the specific event type
    /// 2. All MATCH_ALL subscribers
    pub fn fire(&self, event: Event) {
        match &event.kind {
            EventKind::Tick => trace!("Firing tick"),
            EventKind::StateChanged { entity_id, .. } => {
                debug!(event_type = event.event_type(), %entity_id, "Firing event")
            }
        }

        if let Some(sender) = self.listeners.get(event.event_type()) {
            // Ignore send errors - they just mean no active receivers
            let _ = sender.send(event.clone());
        }

        let _ = self.match_all_sender.send(event);
    }

    /// Get the number of active event type subscriptions
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A receiver for the state changes of one entity
pub struct EntityEventReceiver {
    rx: broadcast::Receiver<Event>,
    entity_id: String,
}

impl EntityEventReceiver {
    /// Receive the next state change of the entity, skipping all others
    pub async fn recv(&mut self) -> Result<Event, broadcast::error::RecvError> {
        loop {
            let event = self.rx.recv().await?;
            if event.entity_id() == Some(self.entity_id.as_str()) {
                return Ok(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ha_core::{events, Value};

    fn changed(entity_id: &str, value: &str) -> Event {
        Event::state_changed(entity_id, None, Value::from(value))
    }

    #[tokio::test]
    async fn test_subscribe_and_fire() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe(events::STATE_CHANGED);

        bus.fire(changed("light.kitchen", "on"));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type(), events::STATE_CHANGED);
        assert_eq!(received.entity_id(), Some("light.kitchen"));
    }

    #[tokio::test]
    async fn test_match_all_subscription() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe(events::MATCH_ALL);

        bus.fire(changed("light.kitchen", "on"));
        bus.fire(Event::tick(Utc::now()));

        let event1 = rx.recv().await.unwrap();
        let event2 = rx.recv().await.unwrap();

        assert_eq!(event1.event_type(), events::STATE_CHANGED);
        assert_eq!(event2.event_type(), events::TICK);
    }

    #[tokio::test]
    async fn test_entity_subscription_filters() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe_entity("sensor.temp");

        bus.fire(changed("light.kitchen", "on"));
        bus.fire(Event::tick(Utc::now()));
        bus.fire(changed("sensor.temp", "21.5"));

        let received = rx.recv().await.unwrap();
        let EventKind::StateChanged { new_value, .. } = received.kind else {
            panic!("expected a state change");
        };
        assert_eq!(new_value, Value::from("21.5"));
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe(events::TICK);
        let mut rx2 = bus.subscribe(events::TICK);

        bus.fire(Event::tick(Utc::now()));

        assert_eq!(rx1.recv().await.unwrap().event_type(), events::TICK);
        assert_eq!(rx2.recv().await.unwrap().event_type(), events::TICK);
        assert_eq!(bus.listener_count(), 1);
    }

    #[tokio::test]
    async fn test_no_cross_event_pollution() {
        let bus = EventBus::new();
        let mut rx_changes = bus.subscribe(events::STATE_CHANGED);
        let mut rx_ticks = bus.subscribe(events::TICK);

        bus.fire(changed("light.kitchen", "off"));

        assert!(rx_changes.recv().await.is_ok());
        assert!(rx_ticks.try_recv().is_err());
    }
}
