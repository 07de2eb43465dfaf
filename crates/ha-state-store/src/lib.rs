//! Entity state storage with domain indexing
//!
//! This crate provides the StateStore, which tracks the current value of
//! every external entity the engine can see. It maintains indices by domain,
//! fires STATE_CHANGED events on the event bus and answers the automation
//! engine's state lookups as a [`StateOracle`].

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use ha_automation::StateOracle;
use ha_core::{Clock, Context, Event, EventKind, SharedClock, SystemClock, Value};
use ha_event_bus::EventBus;
use ha_validator::EntitySymbol;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument, trace};

/// Current value of one external entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityState {
    pub entity_id: String,
    pub value: Value,
    /// Last time the value actually changed
    pub last_changed: DateTime<Utc>,
    /// Last time the value was written, changed or not
    pub last_updated: DateTime<Utc>,
    pub context: Context,
}

/// The state store tracks all entity values
///
/// The StateStore is responsible for:
/// - Storing the current value of all entities, keyed by external entity id
/// - Maintaining a domain index (`light`, `sensor`, ...) for domain queries
/// - Firing STATE_CHANGED events when values are written
/// - Providing thread-safe concurrent access to states
pub struct StateStore {
    states: DashMap<String, EntityState>,
    /// Index of entity_ids by domain
    domain_index: DashMap<String, Vec<String>>,
    event_bus: Arc<EventBus>,
    clock: SharedClock,
}

impl StateStore {
    /// Create a new state store on the system clock
    pub fn new(event_bus: Arc<EventBus>) -> Self {
        Self::with_clock(event_bus, Arc::new(SystemClock))
    }

    pub fn with_clock(event_bus: Arc<EventBus>, clock: SharedClock) -> Self {
        Self {
            states: DashMap::new(),
            domain_index: DashMap::new(),
            event_bus,
            clock,
        }
    }

    /// Set the value of an entity
    ///
    /// `last_changed` only moves when the value actually changed. Fires a
    /// STATE_CHANGED event stamped with the store's clock either way.
    #[instrument(skip(self, value, context))]
    pub fn set(&self, entity_id: &str, value: impl Into<Value>, context: Context) -> EntityState {
        let entity_id = entity_id.to_string();
        let value = value.into();
        let now = self.clock.now();

        let old_state = self.states.get(&entity_id).map(|s| s.clone());
        let changed = old_state.as_ref().map_or(true, |s| s.value != value);

        let new_state = EntityState {
            entity_id: entity_id.clone(),
            value: value.clone(),
            last_changed: match &old_state {
                Some(old) if !changed => old.last_changed,
                _ => now,
            },
            last_updated: now,
            context: context.clone(),
        };

        debug!(value = %new_state.value, changed, "Setting entity state");

        self.states.insert(entity_id.clone(), new_state.clone());

        if old_state.is_none() {
            self.domain_index
                .entry(domain(&entity_id).to_string())
                .or_default()
                .push(entity_id.clone());
        }

        let kind = EventKind::StateChanged {
            entity_id,
            old_value: old_state.map(|s| s.value),
            new_value: value,
        };
        self.event_bus.fire(Event::new(kind, context).at(now));

        new_state
    }

    /// Get the current state of an entity
    pub fn get(&self, entity_id: &str) -> Option<EntityState> {
        self.states.get(entity_id).map(|s| s.clone())
    }

    /// Get just the value, or None if the entity has no state
    pub fn value(&self, entity_id: &str) -> Option<Value> {
        self.states.get(entity_id).map(|s| s.value.clone())
    }

    /// Get all entity IDs for a domain
    pub fn entity_ids(&self, domain: &str) -> Vec<String> {
        self.domain_index
            .get(domain)
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    /// Get all states for a domain
    pub fn domain_states(&self, domain: &str) -> Vec<EntityState> {
        self.entity_ids(domain)
            .iter()
            .filter_map(|id| self.get(id))
            .collect()
    }

    /// Get all states
    pub fn all(&self) -> Vec<EntityState> {
        self.states.iter().map(|r| r.value().clone()).collect()
    }

    /// Remove an entity's state
    ///
    /// Fires a STATE_CHANGED event with a null new value.
    #[instrument(skip(self, context))]
    pub fn remove(&self, entity_id: &str, context: Context) -> Option<EntityState> {
        let old_state = self.states.remove(entity_id).map(|(_, s)| s);

        if let Some(ref state) = old_state {
            trace!("Removing entity state");

            if let Some(mut ids) = self.domain_index.get_mut(domain(entity_id)) {
                ids.retain(|id| id != entity_id);
            }

            let kind = EventKind::StateChanged {
                entity_id: entity_id.to_string(),
                old_value: Some(state.value.clone()),
                new_value: Value::Null,
            };
            self.event_bus
                .fire(Event::new(kind, context).at(self.clock.now()));
        }

        old_state
    }

    /// Get the total number of entities
    pub fn entity_count(&self) -> usize {
        self.states.len()
    }
}

/// Declared entities are looked up by their `id`, else by canonical path
impl StateOracle for StateStore {
    fn resolve(&self, entity: &EntitySymbol) -> Option<Value> {
        let key = entity.external_id.as_deref().unwrap_or(&entity.path);
        self.value(key)
    }
}

fn domain(entity_id: &str) -> &str {
    entity_id.split_once('.').map_or(entity_id, |(domain, _)| domain)
}

/// Thread-safe wrapper for StateStore
pub type SharedStateStore = Arc<StateStore>;
