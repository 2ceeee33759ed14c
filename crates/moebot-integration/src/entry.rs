//! Config entries and their lifecycle
//!
//! ```text
//! NotLoaded → SetupInProgress → Loaded
//!                            ↘ SetupError → SetupInProgress (retry)
//!
//! Loaded/SetupError → UnloadInProgress → NotLoaded
//!                                      ↘ FailedUnload (terminal)
//! ```

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use moebot_config::EntryData;
use moebot_core::DOMAIN;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use ulid::Ulid;

use crate::error::{IntegrationError, IntegrationResult};

/// Config entry lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfigEntryState {
    #[default]
    NotLoaded,
    SetupInProgress,
    Loaded,
    SetupError,
    UnloadInProgress,
    /// Unload failed; the entry cannot recover without a restart
    FailedUnload,
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid config entry transition from {from:?} to {to:?}")]
pub struct InvalidTransition {
    pub from: ConfigEntryState,
    pub to: ConfigEntryState,
}

impl ConfigEntryState {
    pub fn try_transition(self, to: ConfigEntryState) -> Result<ConfigEntryState, InvalidTransition> {
        use ConfigEntryState::*;

        let valid = matches!(
            (self, to),
            (NotLoaded, SetupInProgress)
                | (SetupInProgress, Loaded)
                | (SetupInProgress, SetupError)
                | (SetupError, SetupInProgress)
                | (SetupError, UnloadInProgress)
                | (Loaded, UnloadInProgress)
                | (UnloadInProgress, NotLoaded)
                | (UnloadInProgress, FailedUnload)
        );

        if valid {
            Ok(to)
        } else {
            Err(InvalidTransition { from: self, to })
        }
    }

    pub fn can_transition_to(self, to: ConfigEntryState) -> bool {
        self.try_transition(to).is_ok()
    }

    /// Whether the entry may be unloaded from this state
    pub fn is_unloadable(self) -> bool {
        matches!(self, ConfigEntryState::Loaded | ConfigEntryState::SetupError)
    }
}

/// A configured MoeBot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// Unique identifier (ULID)
    pub entry_id: String,
    pub domain: String,
    /// Display name, "MoeBot (<device id>)"
    pub title: String,
    pub data: EntryData,
    /// The device id; one entry per device
    pub unique_id: String,
    #[serde(skip, default)]
    pub state: ConfigEntryState,
    /// Why the entry is in a failed state
    #[serde(skip, default)]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl ConfigEntry {
    pub fn new(title: impl Into<String>, unique_id: impl Into<String>, data: EntryData) -> Self {
        let now = Utc::now();
        Self {
            entry_id: Ulid::new().to_string(),
            domain: DOMAIN.to_string(),
            title: title.into(),
            data,
            unique_id: unique_id.into(),
            state: ConfigEntryState::NotLoaded,
            reason: None,
            created_at: now,
            modified_at: now,
        }
    }

    /// Title used for a device id
    pub fn title_for(device_id: &str) -> String {
        format!("MoeBot ({device_id})")
    }
}

/// All MoeBot config entries, indexed by entry id and by unique id
#[derive(Default)]
pub struct ConfigEntries {
    entries: DashMap<String, ConfigEntry>,
    by_unique_id: DashMap<String, String>,
}

impl ConfigEntries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry; fails if its unique id is taken
    pub fn add(&self, entry: ConfigEntry) -> IntegrationResult<()> {
        match self.by_unique_id.entry(entry.unique_id.clone()) {
            Entry::Occupied(_) => {
                Err(IntegrationError::AlreadyConfigured(entry.unique_id))
            }
            Entry::Vacant(slot) => {
                slot.insert(entry.entry_id.clone());
                debug!(entry_id = %entry.entry_id, title = %entry.title, "Added config entry");
                self.entries.insert(entry.entry_id.clone(), entry);
                Ok(())
            }
        }
    }

    pub fn get(&self, entry_id: &str) -> Option<ConfigEntry> {
        self.entries.get(entry_id).map(|e| e.clone())
    }

    pub fn by_unique_id(&self, unique_id: &str) -> Option<ConfigEntry> {
        let entry_id = self.by_unique_id.get(unique_id)?.clone();
        self.get(&entry_id)
    }

    pub fn entry_ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace an entry's data
    pub fn update_data(&self, entry_id: &str, data: EntryData) -> IntegrationResult<()> {
        let mut entry = self
            .entries
            .get_mut(entry_id)
            .ok_or_else(|| IntegrationError::EntryNotFound(entry_id.to_string()))?;
        entry.data = data;
        entry.modified_at = Utc::now();
        Ok(())
    }

    /// Move an entry to a new lifecycle state
    pub fn transition(
        &self,
        entry_id: &str,
        to: ConfigEntryState,
        reason: Option<String>,
    ) -> IntegrationResult<ConfigEntryState> {
        let mut entry = self
            .entries
            .get_mut(entry_id)
            .ok_or_else(|| IntegrationError::EntryNotFound(entry_id.to_string()))?;
        let from = entry.state;
        entry.state = from.try_transition(to)?;
        entry.reason = reason;
        debug!(entry_id, ?from, ?to, "Config entry state changed");
        Ok(to)
    }

    pub fn remove(&self, entry_id: &str) -> Option<ConfigEntry> {
        let (_, entry) = self.entries.remove(entry_id)?;
        self.by_unique_id.remove(&entry.unique_id);
        Some(entry)
    }
}
