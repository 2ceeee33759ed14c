//! Core types for the MoeBot integration
//!
//! This crate provides the fundamental types shared by every other crate in
//! the workspace: the mower's closed operating-state enumeration, the device
//! actions that move it between states, the status snapshot pushed by the
//! device, and the Home Assistant activity mappings derived from them.

mod action;
mod activity;
mod error;
mod state;
mod status;

pub use action::MowerAction;
pub use activity::{battery_icon, LawnMowerActivity, VacuumState};
pub use error::{DeviceError, DeviceResult, UnrecognizedState};
pub use state::MowerState;
pub use status::{DeviceStatus, DeviceUpdate};

/// Integration domain
pub const DOMAIN: &str = "moebot";

/// Manufacturer reported in device info
pub const MANUFACTURER: &str = "MoeBot";

/// Config entry data keys
pub mod conf {
    pub const DEVICE_ID: &str = "device_id";
    pub const IP_ADDRESS: &str = "ip_address";
    pub const LOCAL_KEY: &str = "local_key";
}
