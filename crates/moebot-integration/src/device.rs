//! One set-up mower: its client and its planner

use moebot_core::{DeviceStatus, MowerState};
use moebot_device::SharedClient;
use moebot_planner::MowerPlanner;
use std::sync::Arc;

use crate::control::ClientControl;

/// Shared by every entity of a device
pub struct MoebotDevice {
    client: SharedClient,
    planner: MowerPlanner,
}

impl MoebotDevice {
    pub fn new(client: SharedClient) -> Self {
        let planner = MowerPlanner::new(Arc::new(ClientControl(client.clone())));
        Self { client, planner }
    }

    pub fn id(&self) -> &str {
        self.client.id()
    }

    pub fn client(&self) -> &SharedClient {
        &self.client
    }

    pub fn planner(&self) -> &MowerPlanner {
        &self.planner
    }

    pub fn status(&self) -> Option<DeviceStatus> {
        self.client.status()
    }

    /// Recorded operating state
    pub fn state(&self) -> MowerState {
        self.planner.current_state()
    }

    /// The latest report carries a state the planner knows
    ///
    /// True before the first report. While false, the recorded state is
    /// stale and entities show an error.
    pub fn state_recognized(&self) -> bool {
        self.status()
            .map_or(true, |status| status.mower_state().is_ok())
    }

    /// The device has reported at least once
    pub fn available(&self) -> bool {
        self.client.status().is_some()
    }
}

impl std::fmt::Debug for MoebotDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MoebotDevice")
            .field("id", &self.id())
            .field("planner", &self.planner)
            .finish()
    }
}
