//! Rendered entity states
//!
//! Every entity is written here after each device push. Listeners receive a
//! [`StateChanged`] for every write and removal.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::{debug, instrument, trace};

/// Capacity of the change channel; slow listeners see `Lagged`
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// The state of one entity at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    /// `<platform>.<object id>`
    pub entity_id: String,
    pub state: String,
    pub attributes: HashMap<String, Value>,
    /// When `state` last changed value
    pub last_changed: DateTime<Utc>,
    /// When the entity was last written
    pub last_updated: DateTime<Utc>,
}

impl EntityState {
    pub fn new(
        entity_id: impl Into<String>,
        state: impl Into<String>,
        attributes: HashMap<String, Value>,
    ) -> Self {
        let now = Utc::now();
        Self {
            entity_id: entity_id.into(),
            state: state.into(),
            attributes,
            last_changed: now,
            last_updated: now,
        }
    }

    /// Next version of this state; `last_changed` moves only if the value did
    fn updated(&self, state: String, attributes: HashMap<String, Value>) -> Self {
        let now = Utc::now();
        let last_changed = if self.state == state {
            self.last_changed
        } else {
            now
        };
        Self {
            entity_id: self.entity_id.clone(),
            state,
            attributes,
            last_changed,
            last_updated: now,
        }
    }

    /// Platform part of the entity id
    pub fn platform(&self) -> &str {
        self.entity_id
            .split_once('.')
            .map(|(platform, _)| platform)
            .unwrap_or(&self.entity_id)
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

/// A write or removal
#[derive(Debug, Clone, PartialEq)]
pub struct StateChanged {
    pub entity_id: String,
    pub old_state: Option<EntityState>,
    /// `None` when the entity was removed
    pub new_state: Option<EntityState>,
}

impl StateChanged {
    /// The state value changed, as opposed to only attributes or timestamps
    pub fn is_value_change(&self) -> bool {
        self.old_state.as_ref().map(|s| &s.state) != self.new_state.as_ref().map(|s| &s.state)
    }
}

/// Entity state store
pub struct EntityStates {
    states: DashMap<String, EntityState>,
    changes: broadcast::Sender<StateChanged>,
}

impl EntityStates {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            states: DashMap::new(),
            changes,
        }
    }

    /// Write an entity's state
    #[instrument(skip(self, state, attributes), fields(entity_id = %entity_id))]
    pub fn set(
        &self,
        entity_id: &str,
        state: impl Into<String>,
        attributes: HashMap<String, Value>,
    ) -> EntityState {
        let state = state.into();
        let old_state = self.states.get(entity_id).map(|s| s.clone());

        let new_state = match &old_state {
            Some(existing) => existing.updated(state, attributes),
            None => EntityState::new(entity_id, state, attributes),
        };

        trace!(
            state = %new_state.state,
            changed = old_state.as_ref().map(|s| s.state != new_state.state).unwrap_or(true),
            "Setting entity state"
        );
        self.states.insert(entity_id.to_string(), new_state.clone());

        // No receivers is fine
        let _ = self.changes.send(StateChanged {
            entity_id: entity_id.to_string(),
            old_state,
            new_state: Some(new_state.clone()),
        });

        new_state
    }

    pub fn get(&self, entity_id: &str) -> Option<EntityState> {
        self.states.get(entity_id).map(|s| s.clone())
    }

    /// State value, or `None` if the entity doesn't exist
    pub fn get_state(&self, entity_id: &str) -> Option<String> {
        self.states.get(entity_id).map(|s| s.state.clone())
    }

    pub fn is_state(&self, entity_id: &str, state: &str) -> bool {
        self.get_state(entity_id).as_deref() == Some(state)
    }

    /// Every state, sorted by entity id
    pub fn all(&self) -> Vec<EntityState> {
        let mut states: Vec<EntityState> = self.states.iter().map(|r| r.value().clone()).collect();
        states.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        states
    }

    /// States of one platform, sorted by entity id
    pub fn platform_states(&self, platform: &str) -> Vec<EntityState> {
        self.all()
            .into_iter()
            .filter(|s| s.platform() == platform)
            .collect()
    }

    pub fn remove(&self, entity_id: &str) -> Option<EntityState> {
        let (_, old_state) = self.states.remove(entity_id)?;
        debug!(entity_id, "Removed entity state");
        let _ = self.changes.send(StateChanged {
            entity_id: entity_id.to_string(),
            old_state: Some(old_state.clone()),
            new_state: None,
        });
        Some(old_state)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChanged> {
        self.changes.subscribe()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl Default for EntityStates {
    fn default() -> Self {
        Self::new()
    }
}
