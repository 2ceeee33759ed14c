//! What the integration needs from a MoeBot device client

use async_trait::async_trait;
use moebot_core::{DeviceResult, DeviceStatus, MowerAction};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::bus::{ListenerId, Subscription};

/// Shared handle to a device client
pub type SharedClient = Arc<dyn MoebotClient>;

/// A connected MoeBot
///
/// Push based: after [`MoebotClient::listen`] the client publishes a
/// [`moebot_core::DeviceUpdate`] to every subscription whenever the device
/// reports new data points.
#[async_trait]
pub trait MoebotClient: Send + Sync {
    /// Device identifier
    fn id(&self) -> &str;

    /// Version of the device's local protocol (e.g. "3.3")
    fn protocol_version(&self) -> String;

    /// Version of the client library
    fn client_version(&self) -> String;

    /// Latest status, or `None` before the device first reported
    fn status(&self) -> Option<DeviceStatus>;

    fn subscribe(&self) -> Subscription;

    fn unsubscribe(&self, id: ListenerId) -> bool;

    /// Open the push connection
    async fn listen(&self) -> DeviceResult<()>;

    /// Close the push connection
    async fn unlisten(&self) -> DeviceResult<()>;

    /// Ask the device to report all data points
    async fn poll(&self) -> DeviceResult<()>;

    async fn start(&self) -> DeviceResult<()>;

    async fn pause(&self) -> DeviceResult<()>;

    async fn cancel(&self) -> DeviceResult<()>;

    async fn dock(&self) -> DeviceResult<()>;

    /// Set the mowing time in hours
    async fn set_mow_time(&self, hours: u8) -> DeviceResult<()>;

    async fn set_mow_in_rain(&self, enabled: bool) -> DeviceResult<()>;

    /// Dispatch a [`MowerAction`] to the matching command
    async fn perform(&self, action: MowerAction) -> DeviceResult<()> {
        match action {
            MowerAction::Start => self.start().await,
            MowerAction::Pause => self.pause().await,
            MowerAction::Cancel => self.cancel().await,
            MowerAction::Dock => self.dock().await,
        }
    }
}

/// Parameters needed to reach a device on the local network
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    pub device_id: String,
    pub ip_address: String,
    pub local_key: String,
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("device_id", &self.device_id)
            .field("ip_address", &self.ip_address)
            .field("local_key", &"<redacted>")
            .finish()
    }
}

/// Creates clients for devices
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, params: &ConnectionParams) -> DeviceResult<SharedClient>;
}
