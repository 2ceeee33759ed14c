//! Planner errors

use moebot_core::{DeviceError, MowerState, UnrecognizedState};
use thiserror::Error;

use crate::graph::Edge;

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;

/// Errors surfaced by [`crate::MowerPlanner`]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlannerError {
    /// The device reported a state outside the known set
    #[error(transparent)]
    UnrecognizedState(#[from] UnrecognizedState),

    /// No chain of transitions leads to the target
    #[error("no transition path from {from} to {to}")]
    Unreachable { from: MowerState, to: MowerState },

    /// The plan was refused before any action ran
    #[error("refused to plan from {from} to {to}")]
    Rejected { from: MowerState, to: MowerState },

    /// A step of the plan failed; later steps were not attempted
    #[error("action '{}' failed on {edge}: {cause}", .edge.action)]
    ActionFailed {
        edge: Edge,
        #[source]
        cause: DeviceError,
    },
}
