//! Side-effecting commands understood by the mower

use serde::{Deserialize, Serialize};
use std::fmt;

/// A zero-argument device command
///
/// Each transition of the planner is bound to exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MowerAction {
    /// Start (or resume) mowing
    Start,
    Pause,
    /// Abandon the current task
    Cancel,
    /// Return to the charging station
    Dock,
}

impl MowerAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            MowerAction::Start => "start",
            MowerAction::Pause => "pause",
            MowerAction::Cancel => "cancel",
            MowerAction::Dock => "dock",
        }
    }
}

impl fmt::Display for MowerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
