//! sensor platform

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use super::{EntityCategory, MoebotEntity, Platform};
use crate::device::MoebotDevice;

/// The sensors every mower gets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    MowingState,
    BatteryLevel,
    EmergencyState,
    WorkMode,
    ClientVersion,
    ProtocolVersion,
}

impl SensorKind {
    pub const ALL: [SensorKind; 6] = [
        SensorKind::MowingState,
        SensorKind::BatteryLevel,
        SensorKind::EmergencyState,
        SensorKind::WorkMode,
        SensorKind::ClientVersion,
        SensorKind::ProtocolVersion,
    ];

    /// Suffix appended to the device id to form the unique id
    pub const fn key(self) -> &'static str {
        match self {
            SensorKind::MowingState => "state",
            SensorKind::BatteryLevel => "battery",
            SensorKind::EmergencyState => "emergency_state",
            SensorKind::WorkMode => "work_mode",
            SensorKind::ClientVersion => "pymoebot_version",
            SensorKind::ProtocolVersion => "tuya_version",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            SensorKind::MowingState => "Mowing State",
            SensorKind::BatteryLevel => "Battery Level",
            SensorKind::EmergencyState => "Emergency State",
            SensorKind::WorkMode => "Work Mode",
            SensorKind::ClientVersion => "MoeBot Client Version",
            SensorKind::ProtocolVersion => "Tuya Protocol Version",
        }
    }

    pub const fn category(self) -> Option<EntityCategory> {
        match self {
            SensorKind::ClientVersion | SensorKind::ProtocolVersion => {
                Some(EntityCategory::Diagnostic)
            }
            _ => None,
        }
    }
}

pub struct MoebotSensor {
    device: Arc<MoebotDevice>,
    kind: SensorKind,
}

impl MoebotSensor {
    pub fn new(device: Arc<MoebotDevice>, kind: SensorKind) -> Self {
        Self { device, kind }
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }
}

impl MoebotEntity for MoebotSensor {
    fn platform(&self) -> Platform {
        Platform::Sensor
    }

    fn device(&self) -> &Arc<MoebotDevice> {
        &self.device
    }

    fn unique_id(&self) -> String {
        format!("{}_{}", self.device.id(), self.kind.key())
    }

    fn name(&self) -> String {
        self.kind.name().to_string()
    }

    fn state(&self) -> Option<String> {
        let client = self.device.client();
        match self.kind {
            SensorKind::ClientVersion => Some(client.client_version()),
            SensorKind::ProtocolVersion => Some(client.protocol_version()),
            kind => {
                let status = self.device.status()?;
                Some(match kind {
                    SensorKind::MowingState => status.state,
                    SensorKind::BatteryLevel => status.battery.to_string(),
                    SensorKind::EmergencyState => status.emergency_state,
                    _ => status.work_mode,
                })
            }
        }
    }

    fn entity_category(&self) -> Option<EntityCategory> {
        self.kind.category()
    }

    fn attributes(&self) -> HashMap<String, Value> {
        match self.kind {
            SensorKind::BatteryLevel => HashMap::from([
                ("unit_of_measurement".to_string(), json!("%")),
                ("device_class".to_string(), json!("battery")),
                ("state_class".to_string(), json!("measurement")),
            ]),
            _ => HashMap::new(),
        }
    }
}
