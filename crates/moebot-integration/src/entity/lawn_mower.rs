//! lawn_mower platform

use moebot_core::{LawnMowerActivity, MowerState};
use moebot_planner::Edge;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::{pause_in_place, MoebotEntity, Platform};
use crate::device::MoebotDevice;
use crate::error::EntityResult;

/// Supported feature bits
pub struct LawnMowerFeature;

impl LawnMowerFeature {
    pub const START_MOWING: u32 = 1;
    pub const PAUSE: u32 = 2;
    pub const DOCK: u32 = 4;
}

pub struct MoebotLawnMower {
    device: Arc<MoebotDevice>,
}

impl MoebotLawnMower {
    pub const SUPPORTED_FEATURES: u32 =
        LawnMowerFeature::START_MOWING | LawnMowerFeature::PAUSE | LawnMowerFeature::DOCK;

    pub fn new(device: Arc<MoebotDevice>) -> Self {
        Self { device }
    }

    pub fn activity(&self) -> LawnMowerActivity {
        if !self.device.state_recognized() {
            return LawnMowerActivity::Error;
        }
        self.device.state().into()
    }

    pub async fn start_mowing(&self) -> EntityResult<Vec<Edge>> {
        self.drive_to(MowerState::Mowing).await
    }

    /// Pause a running mower; anything else is refused
    pub async fn pause(&self) -> EntityResult<Vec<Edge>> {
        info!(device_id = %self.device.id(), "Lawn mower pause");
        pause_in_place(self).await
    }

    pub async fn dock(&self) -> EntityResult<Vec<Edge>> {
        self.drive_to(MowerState::Park).await
    }

    async fn drive_to(&self, target: MowerState) -> EntityResult<Vec<Edge>> {
        info!(device_id = %self.device.id(), %target, "Lawn mower action");
        Ok(self.device.planner().drive_to(target).await?)
    }
}

impl MoebotEntity for MoebotLawnMower {
    fn platform(&self) -> Platform {
        Platform::LawnMower
    }

    fn device(&self) -> &Arc<MoebotDevice> {
        &self.device
    }

    fn unique_id(&self) -> String {
        format!("{}_mower", self.device.id())
    }

    fn name(&self) -> String {
        "MoeBot Mower".to_string()
    }

    fn state(&self) -> Option<String> {
        Some(self.activity().to_string())
    }

    fn attributes(&self) -> HashMap<String, Value> {
        HashMap::from([(
            "supported_features".to_string(),
            json!(Self::SUPPORTED_FEATURES),
        )])
    }
}
