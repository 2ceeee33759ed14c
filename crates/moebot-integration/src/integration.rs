//! Setting devices up and tearing them down

use dashmap::DashMap;
use moebot_config::EntryData;
use moebot_device::{ConnectionParams, Connector, ListenerId, SharedClient, Subscription};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::device::MoebotDevice;
use crate::entity::EntitySet;
use crate::entry::{ConfigEntries, ConfigEntry, ConfigEntryState};
use crate::error::{IntegrationError, IntegrationResult};
use crate::states::EntityStates;

/// A set-up entry's runtime pieces
struct LoadedEntry {
    device: Arc<MoebotDevice>,
    entities: Arc<EntitySet>,
    listener_id: ListenerId,
    listener: JoinHandle<()>,
}

/// The MoeBot integration
///
/// Owns the config entries and, for every loaded entry, the device, its
/// planner and its entities. Setup, unload and reload of entries are
/// serialized.
pub struct MoebotIntegration {
    connector: Arc<dyn Connector>,
    states: Arc<EntityStates>,
    entries: ConfigEntries,
    loaded: DashMap<String, LoadedEntry>,
    setup_lock: Mutex<()>,
}

impl MoebotIntegration {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self::with_states(connector, Arc::new(EntityStates::new()))
    }

    /// Render entities into an existing state store
    pub fn with_states(connector: Arc<dyn Connector>, states: Arc<EntityStates>) -> Self {
        Self {
            connector,
            states,
            entries: ConfigEntries::new(),
            loaded: DashMap::new(),
            setup_lock: Mutex::new(()),
        }
    }

    pub fn states(&self) -> &Arc<EntityStates> {
        &self.states
    }

    pub fn entries(&self) -> &ConfigEntries {
        &self.entries
    }

    pub fn device(&self, entry_id: &str) -> Option<Arc<MoebotDevice>> {
        self.loaded.get(entry_id).map(|l| l.device.clone())
    }

    pub fn entities(&self, entry_id: &str) -> Option<Arc<EntitySet>> {
        self.loaded.get(entry_id).map(|l| l.entities.clone())
    }

    pub fn is_loaded(&self, entry_id: &str) -> bool {
        self.loaded.contains_key(entry_id)
    }

    /// Check that `data` is valid and its device reachable
    pub async fn validate_connection(&self, data: &EntryData) -> IntegrationResult<()> {
        data.validate()?;
        self.connector.connect(&connection_params(data)).await?;
        Ok(())
    }

    /// Create an entry for `data` and set it up
    ///
    /// A setup failure leaves the entry in `SetupError` and is not returned;
    /// only invalid data and duplicates are.
    pub async fn add_entry(&self, data: EntryData) -> IntegrationResult<String> {
        data.validate()?;
        let entry = ConfigEntry::new(
            ConfigEntry::title_for(&data.device_id),
            data.device_id.clone(),
            data,
        );
        let entry_id = entry.entry_id.clone();
        self.entries.add(entry)?;

        if let Err(error) = self.setup_entry(&entry_id).await {
            warn!(entry_id = %entry_id, %error, "Entry added but setup failed");
        }
        Ok(entry_id)
    }

    /// Set up every entry that isn't loaded
    pub async fn setup_all(&self) -> Vec<IntegrationResult<()>> {
        let mut results = Vec::new();
        for entry_id in self.entries.entry_ids() {
            if !self.is_loaded(&entry_id) {
                results.push(self.setup_entry(&entry_id).await);
            }
        }
        results
    }

    pub async fn setup_entry(&self, entry_id: &str) -> IntegrationResult<()> {
        let _lock = self.setup_lock.lock().await;
        self.setup_locked(entry_id).await
    }

    pub async fn unload_entry(&self, entry_id: &str) -> IntegrationResult<()> {
        let _lock = self.setup_lock.lock().await;
        self.unload_locked(entry_id).await
    }

    /// Unload if loaded, then set up again
    pub async fn reload_entry(&self, entry_id: &str) -> IntegrationResult<()> {
        let _lock = self.setup_lock.lock().await;
        let entry = self.entry(entry_id)?;
        if entry.state.is_unloadable() {
            self.unload_locked(entry_id).await?;
        }
        self.setup_locked(entry_id).await
    }

    /// Unload and forget an entry
    pub async fn remove_entry(&self, entry_id: &str) -> IntegrationResult<ConfigEntry> {
        let _lock = self.setup_lock.lock().await;
        let entry = self.entry(entry_id)?;
        if entry.state.is_unloadable() {
            self.unload_locked(entry_id).await?;
        }
        let entry = self
            .entries
            .remove(entry_id)
            .ok_or_else(|| IntegrationError::EntryNotFound(entry_id.to_string()))?;
        info!(entry_id, title = %entry.title, "Removed config entry");
        Ok(entry)
    }

    /// Unload every loaded entry
    pub async fn shutdown(&self) {
        info!(entries = self.loaded.len(), "Shutting down MoeBot integration");
        let _lock = self.setup_lock.lock().await;
        for entry_id in self.entries.entry_ids() {
            let unloadable = self
                .entries
                .get(&entry_id)
                .is_some_and(|e| e.state.is_unloadable());
            if !unloadable {
                continue;
            }
            if let Err(error) = self.unload_locked(&entry_id).await {
                warn!(entry_id = %entry_id, %error, "Failed to unload entry during shutdown");
            }
        }
    }

    fn entry(&self, entry_id: &str) -> IntegrationResult<ConfigEntry> {
        self.entries
            .get(entry_id)
            .ok_or_else(|| IntegrationError::EntryNotFound(entry_id.to_string()))
    }

    #[instrument(skip(self))]
    async fn setup_locked(&self, entry_id: &str) -> IntegrationResult<()> {
        let entry = self.entry(entry_id)?;
        self.entries
            .transition(entry_id, ConfigEntryState::SetupInProgress, None)?;

        match self.load(&entry).await {
            Ok(loaded) => {
                self.loaded.insert(entry_id.to_string(), loaded);
                self.entries
                    .transition(entry_id, ConfigEntryState::Loaded, None)?;
                info!(title = %entry.title, "Setup completed");
                Ok(())
            }
            Err(error) => {
                warn!(title = %entry.title, %error, "Setup failed");
                self.entries.transition(
                    entry_id,
                    ConfigEntryState::SetupError,
                    Some(error.to_string()),
                )?;
                Err(error)
            }
        }
    }

    async fn load(&self, entry: &ConfigEntry) -> IntegrationResult<LoadedEntry> {
        entry.data.validate()?;
        let client = self.connector.connect(&connection_params(&entry.data)).await?;

        // Subscribe first so the report sent on connect isn't missed
        let subscription = client.subscribe();
        let listener_id = subscription.id();
        if let Err(error) = client.listen().await {
            client.unsubscribe(listener_id);
            return Err(error.into());
        }

        let device = Arc::new(MoebotDevice::new(client));
        // Seed the planner from the report sent on connect so the first
        // render doesn't show the default state
        if let Some(status) = device.status() {
            let _ = device.planner().record_raw(&status.state);
        }
        let entities = Arc::new(EntitySet::new(&device));
        entities.render_all(&self.states);

        let listener = tokio::spawn(listen(
            subscription,
            device.clone(),
            entities.clone(),
            self.states.clone(),
        ));

        debug!(
            device_id = %device.id(),
            entities = entities.all().len(),
            "Device listener started"
        );
        Ok(LoadedEntry {
            device,
            entities,
            listener_id,
            listener,
        })
    }

    #[instrument(skip(self))]
    async fn unload_locked(&self, entry_id: &str) -> IntegrationResult<()> {
        let entry = self.entry(entry_id)?;
        if !entry.state.is_unloadable() {
            return Err(IntegrationError::CannotUnload(entry.state));
        }
        self.entries
            .transition(entry_id, ConfigEntryState::UnloadInProgress, None)?;

        if let Some((_, loaded)) = self.loaded.remove(entry_id) {
            let client: &SharedClient = loaded.device.client();
            // Closing the subscription ends the listener task
            client.unsubscribe(loaded.listener_id);
            if let Err(error) = loaded.listener.await {
                warn!(%error, "Device listener ended abnormally");
            }

            // Nothing updates these states any more, even if unlisten fails
            for entity_id in loaded.entities.entity_ids() {
                self.states.remove(&entity_id);
            }

            if let Err(error) = client.unlisten().await {
                self.entries.transition(
                    entry_id,
                    ConfigEntryState::FailedUnload,
                    Some(error.to_string()),
                )?;
                return Err(error.into());
            }
        }

        self.entries
            .transition(entry_id, ConfigEntryState::NotLoaded, None)?;
        info!(title = %entry.title, "Unloaded entry");
        Ok(())
    }
}

impl std::fmt::Debug for MoebotIntegration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MoebotIntegration")
            .field("entries", &self.entries.len())
            .field("loaded", &self.loaded.len())
            .finish()
    }
}

fn connection_params(data: &EntryData) -> ConnectionParams {
    ConnectionParams {
        device_id: data.device_id.trim().to_string(),
        ip_address: data.ip_address.trim().to_string(),
        local_key: data.local_key.clone(),
    }
}

/// Record every pushed state and re-render the device's entities
async fn listen(
    mut subscription: Subscription,
    device: Arc<MoebotDevice>,
    entities: Arc<EntitySet>,
    states: Arc<EntityStates>,
) {
    while let Some(update) = subscription.recv().await {
        // Unrecognized states are logged by the planner and leave it as is;
        // the lawn mower and vacuum render them as errors
        let _ = device.planner().record_raw(&update.status.state);
        entities.render_all(&states);
    }
    debug!(device_id = %device.id(), "Device listener stopped");
}
