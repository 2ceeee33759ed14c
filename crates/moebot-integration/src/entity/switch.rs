//! switch platform

use std::sync::Arc;
use tracing::info;

use super::{EntityCategory, MoebotEntity, Platform};
use crate::device::MoebotDevice;
use crate::error::EntityResult;

/// Park If Raining
///
/// Backed by the device's mow-in-rain data point, which it mirrors as is.
pub struct ParkIfRainingSwitch {
    device: Arc<MoebotDevice>,
}

impl ParkIfRainingSwitch {
    pub fn new(device: Arc<MoebotDevice>) -> Self {
        Self { device }
    }

    pub fn is_on(&self) -> Option<bool> {
        self.device.status().map(|s| s.mow_in_rain)
    }

    pub async fn turn_on(&self) -> EntityResult<()> {
        self.set(true).await
    }

    pub async fn turn_off(&self) -> EntityResult<()> {
        self.set(false).await
    }

    async fn set(&self, on: bool) -> EntityResult<()> {
        info!(device_id = %self.device.id(), on, "Setting park if raining");
        self.device.client().set_mow_in_rain(on).await?;
        Ok(())
    }
}

impl MoebotEntity for ParkIfRainingSwitch {
    fn platform(&self) -> Platform {
        Platform::Switch
    }

    fn device(&self) -> &Arc<MoebotDevice> {
        &self.device
    }

    fn unique_id(&self) -> String {
        format!("{}_park_if_raining", self.device.id())
    }

    fn name(&self) -> String {
        "Park If Raining".to_string()
    }

    fn state(&self) -> Option<String> {
        self.is_on()
            .map(|on| if on { "on" } else { "off" }.to_string())
    }

    fn entity_category(&self) -> Option<EntityCategory> {
        Some(EntityCategory::Config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::test_support::device;
    use crate::error::EntityError;
    use moebot_core::DeviceError;
    use moebot_device::MoebotClient;

    #[tokio::test]
    async fn test_toggle() {
        let (sim, device) = device().await;
        let switch = ParkIfRainingSwitch::new(device);
        assert_eq!(switch.is_on(), Some(false));

        switch.turn_on().await.unwrap();
        assert!(sim.status().unwrap().mow_in_rain);
        assert_eq!(switch.state().as_deref(), Some("on"));

        switch.turn_off().await.unwrap();
        assert_eq!(switch.state().as_deref(), Some("off"));
    }

    #[tokio::test]
    async fn test_disconnected_device() {
        let (sim, device) = device().await;
        sim.unlisten().await.unwrap();
        let switch = ParkIfRainingSwitch::new(device);

        assert!(matches!(
            switch.turn_on().await,
            Err(EntityError::Device(DeviceError::NotConnected { .. }))
        ));
    }
}
