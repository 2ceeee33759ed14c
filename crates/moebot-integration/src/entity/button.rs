//! button platform

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

use super::{MoebotEntity, Platform};
use crate::device::MoebotDevice;
use crate::error::EntityResult;

/// Update: asks the device to report every data point
pub struct UpdateButton {
    device: Arc<MoebotDevice>,
    last_pressed: Mutex<Option<DateTime<Utc>>>,
}

impl UpdateButton {
    pub fn new(device: Arc<MoebotDevice>) -> Self {
        Self {
            device,
            last_pressed: Mutex::new(None),
        }
    }

    pub async fn press(&self) -> EntityResult<()> {
        info!(device_id = %self.device.id(), "Polling device");
        self.device.client().poll().await?;
        *self
            .last_pressed
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());
        Ok(())
    }

    pub fn last_pressed(&self) -> Option<DateTime<Utc>> {
        *self.last_pressed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MoebotEntity for UpdateButton {
    fn platform(&self) -> Platform {
        Platform::Button
    }

    fn device(&self) -> &Arc<MoebotDevice> {
        &self.device
    }

    fn unique_id(&self) -> String {
        format!("{}_update", self.device.id())
    }

    fn name(&self) -> String {
        "Update".to_string()
    }

    /// A button's state is when it was last pressed
    fn state(&self) -> Option<String> {
        self.last_pressed().map(|t| t.to_rfc3339())
    }

    fn attributes(&self) -> HashMap<String, Value> {
        HashMap::from([("device_class".to_string(), json!("update"))])
    }
}
