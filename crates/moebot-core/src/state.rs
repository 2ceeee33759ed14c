//! The mower's operating state as reported by the device

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::UnrecognizedState;

/// Operating mode of the mower
///
/// The set is closed and defined by the device protocol. Values travel over
/// the wire as upper-case strings (e.g. "CHARGING_WITH_TASK_SUSPEND"); any
/// other string is rejected rather than mapped to a catch-all.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub enum MowerState {
    /// Idle, not docked and not mowing
    #[default]
    Standby,
    Mowing,
    /// Mowing a fixed area (spiral)
    FixedMowing,
    Paused,
    /// Returning to the charging station
    Park,
    Charging,
    /// Charging with a mowing task waiting to resume
    ChargingWithTaskSuspend,
    Locked,
    Emergency,
    Error,
}

impl MowerState {
    /// Every state, in declaration order
    pub const ALL: [MowerState; 10] = [
        MowerState::Standby,
        MowerState::Mowing,
        MowerState::FixedMowing,
        MowerState::Paused,
        MowerState::Park,
        MowerState::Charging,
        MowerState::ChargingWithTaskSuspend,
        MowerState::Locked,
        MowerState::Emergency,
        MowerState::Error,
    ];

    /// Position of this state in [`MowerState::ALL`]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The device's wire name for this state
    pub const fn as_str(self) -> &'static str {
        match self {
            MowerState::Standby => "STANDBY",
            MowerState::Mowing => "MOWING",
            MowerState::FixedMowing => "FIXED_MOWING",
            MowerState::Paused => "PAUSED",
            MowerState::Park => "PARK",
            MowerState::Charging => "CHARGING",
            MowerState::ChargingWithTaskSuspend => "CHARGING_WITH_TASK_SUSPEND",
            MowerState::Locked => "LOCKED",
            MowerState::Emergency => "EMERGENCY",
            MowerState::Error => "ERROR",
        }
    }

    /// Whether the mower sits on its charging station
    pub fn is_charging(self) -> bool {
        matches!(
            self,
            MowerState::Charging | MowerState::ChargingWithTaskSuspend
        )
    }

    /// Whether the mower needs attention before it can work again
    pub fn is_fault(self) -> bool {
        matches!(
            self,
            MowerState::Locked | MowerState::Emergency | MowerState::Error
        )
    }
}

impl FromStr for MowerState {
    type Err = UnrecognizedState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MowerState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| UnrecognizedState(s.to_string()))
    }
}

impl TryFrom<String> for MowerState {
    type Error = UnrecognizedState;

    fn try_from(s: String) -> Result<Self, UnrecognizedState> {
        s.parse()
    }
}

impl From<MowerState> for String {
    fn from(state: MowerState) -> String {
        state.as_str().to_string()
    }
}

impl fmt::Display for MowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wire_names() {
        assert_eq!("STANDBY".parse::<MowerState>().unwrap(), MowerState::Standby);
        assert_eq!(
            "CHARGING_WITH_TASK_SUSPEND".parse::<MowerState>().unwrap(),
            MowerState::ChargingWithTaskSuspend
        );
        assert_eq!("PARK".parse::<MowerState>().unwrap(), MowerState::Park);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "HOVERING".parse::<MowerState>().unwrap_err();
        assert_eq!(err, UnrecognizedState("HOVERING".to_string()));
        // Wire names are case sensitive
        assert!("mowing".parse::<MowerState>().is_err());
        assert!("".parse::<MowerState>().is_err());
    }

    #[test]
    fn test_every_state_survives_display_and_parse() {
        for state in MowerState::ALL {
            assert_eq!(state.to_string().parse::<MowerState>().unwrap(), state);
        }
    }

    #[test]
    fn test_index_matches_all_order() {
        for (i, state) in MowerState::ALL.iter().enumerate() {
            assert_eq!(state.index(), i);
        }
    }

    #[test]
    fn test_default_is_standby() {
        assert_eq!(MowerState::default(), MowerState::Standby);
    }

    #[test]
    fn test_serde_uses_wire_name() {
        let json = serde_json::to_string(&MowerState::FixedMowing).unwrap();
        assert_eq!(json, "\"FIXED_MOWING\"");
        assert!(serde_json::from_str::<MowerState>("\"BOGUS\"").is_err());
    }

    #[test]
    fn test_try_from_owned_string() {
        assert_eq!(
            MowerState::try_from("PAUSED".to_string()),
            Ok(MowerState::Paused)
        );
        assert_eq!(
            MowerState::try_from("TURBO".to_string()),
            Err(UnrecognizedState("TURBO".to_string()))
        );
    }

    #[test]
    fn test_classification() {
        assert!(MowerState::ChargingWithTaskSuspend.is_charging());
        assert!(!MowerState::Park.is_charging());
        assert!(MowerState::Locked.is_fault());
        assert!(!MowerState::Paused.is_fault());
    }
}
