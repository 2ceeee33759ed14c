//! number platform

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::{MoebotEntity, Platform};
use crate::device::MoebotDevice;
use crate::error::{EntityError, EntityResult};

/// Mowing time in hours
pub struct MowingTimeNumber {
    device: Arc<MoebotDevice>,
}

impl MowingTimeNumber {
    pub const MIN: f64 = 1.0;
    pub const MAX: f64 = 12.0;
    pub const STEP: f64 = 1.0;
    pub const UNIT: &'static str = "hrs";

    pub fn new(device: Arc<MoebotDevice>) -> Self {
        Self { device }
    }

    pub fn native_value(&self) -> Option<u8> {
        self.device.status().map(|s| s.mow_time)
    }

    /// Only whole hours within the range are accepted
    pub async fn set_native_value(&self, value: f64) -> EntityResult<()> {
        if !(Self::MIN..=Self::MAX).contains(&value) || value.fract() != 0.0 {
            return Err(EntityError::InvalidValue {
                entity: self.entity_id(),
                reason: format!(
                    "{value} is not a whole number of hours in {}..={}",
                    Self::MIN,
                    Self::MAX
                ),
            });
        }
        let hours = value as u8;
        info!(device_id = %self.device.id(), hours, "Setting mowing time");
        self.device.client().set_mow_time(hours).await?;
        Ok(())
    }
}

impl MoebotEntity for MowingTimeNumber {
    fn platform(&self) -> Platform {
        Platform::Number
    }

    fn device(&self) -> &Arc<MoebotDevice> {
        &self.device
    }

    fn unique_id(&self) -> String {
        format!("{}_mow_time_hrs", self.device.id())
    }

    fn name(&self) -> String {
        "Mowing Time".to_string()
    }

    fn state(&self) -> Option<String> {
        self.native_value().map(|v| v.to_string())
    }

    fn attributes(&self) -> HashMap<String, Value> {
        HashMap::from([
            ("min".to_string(), json!(Self::MIN)),
            ("max".to_string(), json!(Self::MAX)),
            ("step".to_string(), json!(Self::STEP)),
            ("mode".to_string(), json!("slider")),
            ("unit_of_measurement".to_string(), json!(Self::UNIT)),
        ])
    }
}
