//! Planner actions routed to the device client

use async_trait::async_trait;
use moebot_core::{DeviceResult, MowerAction};
use moebot_device::SharedClient;
use moebot_planner::MowerControl;

/// Lets the planner command a [`moebot_device::MoebotClient`]
pub struct ClientControl(pub SharedClient);

#[async_trait]
impl MowerControl for ClientControl {
    async fn perform(&self, action: MowerAction) -> DeviceResult<()> {
        self.0.perform(action).await
    }
}
