//! In-memory MoeBot
//!
//! Behaves like a mower on the end of a local connection: commands change
//! its state and every change is pushed to subscribers. Failures can be
//! injected per command and every command received is recorded.

use async_trait::async_trait;
use moebot_core::{
    DeviceError, DeviceResult, DeviceStatus, DeviceUpdate, MowerAction, MowerState,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use crate::bus::{ListenerId, Subscription, UpdateBus};
use crate::client::{ConnectionParams, Connector, MoebotClient, SharedClient};

/// Protocol version reported by simulated devices
pub const SIMULATED_PROTOCOL_VERSION: &str = "3.3";

/// Accepted mowing time range, in hours
pub const MOW_TIME_RANGE: std::ops::RangeInclusive<u8> = 1..=12;

struct SimState {
    status: Option<DeviceStatus>,
    initial: DeviceStatus,
    commands: Vec<MowerAction>,
    failures: HashMap<MowerAction, DeviceError>,
    unlisten_failure: Option<DeviceError>,
    follow_commands: bool,
    polls: usize,
}

/// A simulated mower
pub struct SimulatedMower {
    id: String,
    bus: UpdateBus,
    connected: AtomicBool,
    inner: Mutex<SimState>,
}

impl SimulatedMower {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            bus: UpdateBus::new(),
            connected: AtomicBool::new(false),
            inner: Mutex::new(SimState {
                status: None,
                initial: DeviceStatus::default(),
                commands: Vec::new(),
                failures: HashMap::new(),
                unlisten_failure: None,
                follow_commands: true,
                polls: 0,
            }),
        }
    }

    /// Status reported when the connection opens
    pub fn with_status(self, status: DeviceStatus) -> Self {
        self.inner().initial = status;
        self
    }

    /// Whether commands move the simulated state (default: true)
    pub fn with_follow_commands(self, follow: bool) -> Self {
        self.inner().follow_commands = follow;
        self
    }

    fn inner(&self) -> MutexGuard<'_, SimState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every future `action` fail with `error`
    pub fn fail_on(&self, action: MowerAction, error: DeviceError) {
        self.inner().failures.insert(action, error);
    }

    /// Make the next `unlisten` fail with `error`
    pub fn fail_unlisten(&self, error: DeviceError) {
        self.inner().unlisten_failure = Some(error);
    }

    pub fn clear_failures(&self) {
        let mut inner = self.inner();
        inner.failures.clear();
        inner.unlisten_failure = None;
    }

    /// Commands received so far, including failed ones
    pub fn commands(&self) -> Vec<MowerAction> {
        self.inner().commands.clone()
    }

    pub fn poll_count(&self) -> usize {
        self.inner().polls
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Simulate the device reporting a new raw state
    ///
    /// The string is not validated, as a real device might send anything.
    pub fn push_state(&self, raw: impl Into<String>) {
        let raw = raw.into();
        self.update(|status| status.state = raw);
    }

    /// Simulate a battery reading
    pub fn push_battery(&self, level: u8) {
        self.update(|status| status.battery = level.min(100));
    }

    fn update(&self, apply: impl FnOnce(&mut DeviceStatus)) {
        let status = {
            let mut inner = self.inner();
            let initial = inner.initial.clone();
            let status = inner.status.get_or_insert(initial);
            apply(status);
            status.clone()
        };
        self.publish(status);
    }

    fn publish(&self, status: DeviceStatus) {
        if !self.is_connected() {
            return;
        }
        let raw = json!({
            "state": status.state,
            "battery": status.battery,
            "mow_time": status.mow_time,
            "mow_in_rain": status.mow_in_rain,
        });
        self.bus.publish(DeviceUpdate::new(&self.id, status, raw));
    }

    fn ensure_connected(&self) -> DeviceResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(DeviceError::NotConnected {
                device_id: self.id.clone(),
            })
        }
    }

    fn command(&self, action: MowerAction) -> DeviceResult<()> {
        self.ensure_connected()?;

        let follow = {
            let mut inner = self.inner();
            inner.commands.push(action);
            if let Some(error) = inner.failures.get(&action) {
                debug!(device_id = %self.id, %action, "Simulated command failure");
                return Err(error.clone());
            }
            inner.follow_commands
        };

        debug!(device_id = %self.id, %action, "Simulated command");
        if follow {
            let next = match action {
                MowerAction::Start => MowerState::Mowing,
                MowerAction::Pause => MowerState::Paused,
                MowerAction::Cancel => MowerState::Standby,
                MowerAction::Dock => MowerState::Park,
            };
            self.push_state(next.as_str());
        }
        Ok(())
    }
}

#[async_trait]
impl MoebotClient for SimulatedMower {
    fn id(&self) -> &str {
        &self.id
    }

    fn protocol_version(&self) -> String {
        SIMULATED_PROTOCOL_VERSION.to_string()
    }

    fn client_version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    fn status(&self) -> Option<DeviceStatus> {
        self.inner().status.clone()
    }

    fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }

    fn unsubscribe(&self, id: ListenerId) -> bool {
        self.bus.unsubscribe(id)
    }

    async fn listen(&self) -> DeviceResult<()> {
        self.connected.store(true, Ordering::SeqCst);
        info!(device_id = %self.id, "Simulated mower listening");
        // Report everything on connect, like the real device does
        self.update(|_| {});
        Ok(())
    }

    async fn unlisten(&self) -> DeviceResult<()> {
        let failure = self.inner().unlisten_failure.take();
        if let Some(error) = failure {
            return Err(error);
        }
        self.connected.store(false, Ordering::SeqCst);
        info!(device_id = %self.id, "Simulated mower stopped listening");
        Ok(())
    }

    async fn poll(&self) -> DeviceResult<()> {
        self.ensure_connected()?;
        self.inner().polls += 1;
        self.update(|_| {});
        Ok(())
    }

    async fn start(&self) -> DeviceResult<()> {
        self.command(MowerAction::Start)
    }

    async fn pause(&self) -> DeviceResult<()> {
        self.command(MowerAction::Pause)
    }

    async fn cancel(&self) -> DeviceResult<()> {
        self.command(MowerAction::Cancel)
    }

    async fn dock(&self) -> DeviceResult<()> {
        self.command(MowerAction::Dock)
    }

    async fn set_mow_time(&self, hours: u8) -> DeviceResult<()> {
        self.ensure_connected()?;
        if !MOW_TIME_RANGE.contains(&hours) {
            return Err(DeviceError::InvalidValue {
                field: "mow_time".to_string(),
                reason: format!(
                    "{hours} is outside {}..={}",
                    MOW_TIME_RANGE.start(),
                    MOW_TIME_RANGE.end()
                ),
            });
        }
        self.update(|status| status.mow_time = hours);
        Ok(())
    }

    async fn set_mow_in_rain(&self, enabled: bool) -> DeviceResult<()> {
        self.ensure_connected()?;
        self.update(|status| status.mow_in_rain = enabled);
        Ok(())
    }
}

/// Hands out [`SimulatedMower`]s
///
/// Devices are created on first connect and reused afterwards. Addresses in
/// `unreachable` fail to connect.
#[derive(Default)]
pub struct SimulatedConnector {
    devices: Mutex<HashMap<String, Arc<SimulatedMower>>>,
    unreachable: Mutex<Vec<String>>,
}

impl SimulatedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse connections to `ip_address`
    pub fn mark_unreachable(&self, ip_address: impl Into<String>) {
        self.unreachable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ip_address.into());
    }

    /// Register a pre-built device
    pub fn insert(&self, mower: Arc<SimulatedMower>) {
        self.devices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(mower.id().to_string(), mower);
    }

    /// The simulated device behind `device_id`, if it was ever connected
    pub fn device(&self, device_id: &str) -> Option<Arc<SimulatedMower>> {
        self.devices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(device_id)
            .cloned()
    }
}

#[async_trait]
impl Connector for SimulatedConnector {
    async fn connect(&self, params: &ConnectionParams) -> DeviceResult<SharedClient> {
        let unreachable = self
            .unreachable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&params.ip_address);
        if unreachable {
            return Err(DeviceError::Transport(format!(
                "no route to {}",
                params.ip_address
            )));
        }

        let mower = self
            .devices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(params.device_id.clone())
            .or_insert_with(|| Arc::new(SimulatedMower::new(&params.device_id)))
            .clone();
        Ok(mower)
    }
}
