//! vacuum platform
//!
//! Older Home Assistant frontends only know mowers as vacuums, so the mower
//! is also exposed through the vacuum state model.

use moebot_core::{battery_icon, MowerState, VacuumState};
use moebot_planner::Edge;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::{pause_in_place, MoebotEntity, Platform};
use crate::device::MoebotDevice;
use crate::error::{EntityError, EntityResult};

/// Supported feature bits
pub struct VacuumFeature;

impl VacuumFeature {
    pub const PAUSE: u32 = 4;
    pub const STOP: u32 = 8;
    pub const RETURN_HOME: u32 = 16;
    pub const FAN_SPEED: u32 = 32;
    pub const BATTERY: u32 = 64;
    pub const STATUS: u32 = 128;
    pub const SEND_COMMAND: u32 = 256;
    pub const LOCATE: u32 = 512;
    pub const CLEAN_SPOT: u32 = 1024;
    pub const STATE: u32 = 4096;
    pub const START: u32 = 8192;
}

pub struct MoebotVacuum {
    device: Arc<MoebotDevice>,
}

impl MoebotVacuum {
    pub const SUPPORTED_FEATURES: u32 = VacuumFeature::START
        | VacuumFeature::PAUSE
        | VacuumFeature::STOP
        | VacuumFeature::RETURN_HOME
        | VacuumFeature::BATTERY
        | VacuumFeature::STATUS
        | VacuumFeature::STATE;

    pub fn new(device: Arc<MoebotDevice>) -> Self {
        Self { device }
    }

    pub fn vacuum_state(&self) -> VacuumState {
        if !self.device.state_recognized() {
            return VacuumState::Error;
        }
        self.device.state().into()
    }

    pub fn battery_level(&self) -> Option<u8> {
        self.device.status().map(|s| s.battery)
    }

    pub async fn start(&self) -> EntityResult<Vec<Edge>> {
        self.drive_to(MowerState::Mowing).await
    }

    pub async fn pause(&self) -> EntityResult<Vec<Edge>> {
        info!(device_id = %self.device.id(), "Vacuum pause");
        pause_in_place(self).await
    }

    pub async fn stop(&self) -> EntityResult<Vec<Edge>> {
        self.drive_to(MowerState::Standby).await
    }

    pub async fn return_to_base(&self) -> EntityResult<Vec<Edge>> {
        self.drive_to(MowerState::Park).await
    }

    pub async fn clean_spot(&self) -> EntityResult<()> {
        Err(self.not_supported("clean_spot"))
    }

    pub async fn locate(&self) -> EntityResult<()> {
        Err(self.not_supported("locate"))
    }

    pub async fn set_fan_speed(&self, _fan_speed: &str) -> EntityResult<()> {
        Err(self.not_supported("set_fan_speed"))
    }

    pub async fn send_command(&self, _command: &str, _params: Option<Value>) -> EntityResult<()> {
        Err(self.not_supported("send_command"))
    }

    async fn drive_to(&self, target: MowerState) -> EntityResult<Vec<Edge>> {
        info!(device_id = %self.device.id(), %target, "Vacuum action");
        Ok(self.device.planner().drive_to(target).await?)
    }

    fn not_supported(&self, feature: &'static str) -> EntityError {
        EntityError::NotSupported {
            entity: self.entity_id(),
            feature,
        }
    }
}

impl MoebotEntity for MoebotVacuum {
    fn platform(&self) -> Platform {
        Platform::Vacuum
    }

    fn device(&self) -> &Arc<MoebotDevice> {
        &self.device
    }

    fn unique_id(&self) -> String {
        format!("moebot.{}", self.device.id())
    }

    fn name(&self) -> String {
        format!("MoeBot ({})", self.device.id())
    }

    fn state(&self) -> Option<String> {
        Some(self.vacuum_state().to_string())
    }

    fn icon(&self) -> Option<String> {
        Some(battery_icon(
            self.battery_level(),
            self.device.state().is_charging(),
        ))
    }

    fn attributes(&self) -> HashMap<String, Value> {
        let mut attributes = HashMap::from([
            (
                "supported_features".to_string(),
                json!(Self::SUPPORTED_FEATURES),
            ),
            ("status".to_string(), json!(self.device.state().as_str())),
        ]);
        if let Some(level) = self.battery_level() {
            attributes.insert("battery_level".to_string(), json!(level));
        }
        attributes.insert("battery_icon".to_string(), json!(self.icon()));
        attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::test_support::{device, device_with};
    use moebot_core::{DeviceStatus, MowerAction};

    #[tokio::test]
    async fn test_state_mapping() {
        let (_, device) = device().await;
        let vacuum = MoebotVacuum::new(device.clone());
        assert_eq!(vacuum.state().as_deref(), Some("docked"));

        for (state, expected) in [
            (MowerState::Mowing, "cleaning"),
            (MowerState::FixedMowing, "cleaning"),
            (MowerState::Paused, "idle"),
            (MowerState::Park, "returning"),
            (MowerState::Error, "error"),
        ] {
            device.planner().record_state(state);
            assert_eq!(vacuum.state().as_deref(), Some(expected), "{state}");
        }
    }

    #[tokio::test]
    async fn test_battery_attributes() {
        let (_, device) = device_with(DeviceStatus {
            state: "CHARGING".to_string(),
            battery: 47,
            ..Default::default()
        })
        .await;
        let vacuum = MoebotVacuum::new(device);

        let attributes = vacuum.attributes();
        assert_eq!(attributes["battery_level"], json!(47));
        assert_eq!(attributes["battery_icon"], json!("mdi:battery-charging-40"));
        assert_eq!(attributes["status"], json!("CHARGING"));
    }

    #[tokio::test]
    async fn test_stop_drives_to_standby() {
        let (sim, device) = device_with(DeviceStatus {
            state: "MOWING".to_string(),
            ..Default::default()
        })
        .await;
        let vacuum = MoebotVacuum::new(device);

        let plan = vacuum.stop().await.unwrap();

        let triggers: Vec<&str> = plan.iter().map(|e| e.trigger).collect();
        assert_eq!(triggers, ["pause", "cancel"]);
        assert_eq!(sim.commands(), [MowerAction::Pause, MowerAction::Cancel]);
    }

    #[tokio::test]
    async fn test_pause_while_docked_is_refused() {
        let (sim, device) = device().await;
        let vacuum = MoebotVacuum::new(device);

        let err = vacuum.pause().await.unwrap_err();

        assert!(matches!(err, EntityError::InvalidAction { action: "pause", .. }));
        assert!(sim.commands().is_empty());
    }

    #[tokio::test]
    async fn test_unrecognized_report_shows_error() {
        let (sim, device) = device_with(DeviceStatus {
            state: "PARK".to_string(),
            ..Default::default()
        })
        .await;
        let vacuum = MoebotVacuum::new(device.clone());
        assert_eq!(vacuum.vacuum_state(), VacuumState::Returning);

        sim.push_state("TURBO_MODE");

        assert_eq!(device.state(), MowerState::Park);
        assert_eq!(vacuum.state().as_deref(), Some("error"));
    }

    #[tokio::test]
    async fn test_return_to_base() {
        let (sim, device) = device().await;
        let vacuum = MoebotVacuum::new(device);

        vacuum.return_to_base().await.unwrap();
        assert_eq!(sim.commands(), [MowerAction::Dock]);
    }

    #[tokio::test]
    async fn test_unsupported_commands() {
        let (sim, device) = device().await;
        let vacuum = MoebotVacuum::new(device);

        let err = vacuum.clean_spot().await.unwrap_err();
        assert_eq!(
            err,
            EntityError::NotSupported {
                entity: "vacuum.moebot_dev1".to_string(),
                feature: "clean_spot",
            }
        );
        assert!(vacuum.locate().await.is_err());
        assert!(vacuum.set_fan_speed("max").await.is_err());
        assert!(vacuum.send_command("reboot", None).await.is_err());
        assert!(sim.commands().is_empty());
        assert_eq!(
            MoebotVacuum::SUPPORTED_FEATURES & VacuumFeature::CLEAN_SPOT,
            0
        );
    }
}
