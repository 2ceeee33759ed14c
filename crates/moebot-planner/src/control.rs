//! The device-facing seam of the planner

use async_trait::async_trait;
use moebot_core::{DeviceResult, MowerAction};

/// Executes device actions on behalf of the planner
///
/// Implementations must only return once the device has accepted (or
/// refused) the command; the planner starts the next step right after.
#[async_trait]
pub trait MowerControl: Send + Sync {
    async fn perform(&self, action: MowerAction) -> DeviceResult<()>;
}
