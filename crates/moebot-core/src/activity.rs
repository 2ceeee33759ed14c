//! Mapping of mower states onto Home Assistant entity states

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::MowerState;

/// Activity reported by the lawn_mower platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LawnMowerActivity {
    Error,
    Paused,
    Mowing,
    Docked,
}

impl LawnMowerActivity {
    pub const fn as_str(self) -> &'static str {
        match self {
            LawnMowerActivity::Error => "error",
            LawnMowerActivity::Paused => "paused",
            LawnMowerActivity::Mowing => "mowing",
            LawnMowerActivity::Docked => "docked",
        }
    }
}

impl From<MowerState> for LawnMowerActivity {
    fn from(state: MowerState) -> Self {
        match state {
            MowerState::Standby | MowerState::Charging | MowerState::ChargingWithTaskSuspend => {
                LawnMowerActivity::Docked
            }
            // Returning to the dock is still reported as mowing
            MowerState::Mowing | MowerState::FixedMowing | MowerState::Park => {
                LawnMowerActivity::Mowing
            }
            MowerState::Paused => LawnMowerActivity::Paused,
            MowerState::Emergency | MowerState::Locked | MowerState::Error => {
                LawnMowerActivity::Error
            }
        }
    }
}

impl fmt::Display for LawnMowerActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State reported by the legacy vacuum platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VacuumState {
    Cleaning,
    Docked,
    Idle,
    Returning,
    Error,
}

impl VacuumState {
    pub const fn as_str(self) -> &'static str {
        match self {
            VacuumState::Cleaning => "cleaning",
            VacuumState::Docked => "docked",
            VacuumState::Idle => "idle",
            VacuumState::Returning => "returning",
            VacuumState::Error => "error",
        }
    }
}

impl From<MowerState> for VacuumState {
    fn from(state: MowerState) -> Self {
        match state {
            MowerState::Standby | MowerState::Charging | MowerState::ChargingWithTaskSuspend => {
                VacuumState::Docked
            }
            MowerState::Mowing | MowerState::FixedMowing => VacuumState::Cleaning,
            MowerState::Paused => VacuumState::Idle,
            MowerState::Park => VacuumState::Returning,
            MowerState::Emergency | MowerState::Locked | MowerState::Error => VacuumState::Error,
        }
    }
}

impl fmt::Display for VacuumState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Material Design icon for a battery level
///
/// Matches Home Assistant's `icon_for_battery_level` helper.
pub fn battery_icon(level: Option<u8>, charging: bool) -> String {
    let Some(level) = level else {
        return "mdi:battery-unknown".to_string();
    };
    let level = f64::from(level);

    if charging && level > 10.0 {
        let bucket = ((level / 20.0 - 0.01).round() as u32) * 20;
        format!("mdi:battery-charging-{bucket}")
    } else if charging {
        "mdi:battery-outline".to_string()
    } else if level <= 5.0 {
        "mdi:battery-alert".to_string()
    } else if level < 95.0 {
        let bucket = ((level / 10.0 - 0.01).round() as u32) * 10;
        format!("mdi:battery-{bucket}")
    } else {
        "mdi:battery".to_string()
    }
}
