//! Status snapshots pushed by the device client

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{MowerState, UnrecognizedState};

/// Latest known values of the device's data points
///
/// `state` is kept as the raw wire string; it is only validated when it is
/// recorded by the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    /// Raw operating state (e.g. "MOWING")
    pub state: String,
    /// Battery level in percent
    pub battery: u8,
    /// Configured mowing time in hours
    pub mow_time: u8,
    /// Whether the mower keeps working in the rain
    pub mow_in_rain: bool,
    /// Raw emergency state (e.g. "NONE", "LIFTED")
    pub emergency_state: String,
    /// Raw work mode (e.g. "AUTO")
    pub work_mode: String,
}

impl DeviceStatus {
    /// Parse the raw state into the closed enumeration
    pub fn mower_state(&self) -> Result<MowerState, UnrecognizedState> {
        self.state.parse()
    }
}

impl Default for DeviceStatus {
    fn default() -> Self {
        Self {
            state: MowerState::Standby.to_string(),
            battery: 100,
            mow_time: 6,
            mow_in_rain: false,
            emergency_state: "NONE".to_string(),
            work_mode: "AUTO".to_string(),
        }
    }
}

/// A push notification from the device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceUpdate {
    /// Device that sent the update
    pub device_id: String,
    /// Status after applying the update
    pub status: DeviceStatus,
    /// Data points carried by the notification, as received
    #[serde(default)]
    pub raw: serde_json::Value,
    /// When the update was received
    pub received: DateTime<Utc>,
}

impl DeviceUpdate {
    pub fn new(device_id: impl Into<String>, status: DeviceStatus, raw: serde_json::Value) -> Self {
        Self {
            device_id: device_id.into(),
            status,
            raw,
            received: Utc::now(),
        }
    }
}
