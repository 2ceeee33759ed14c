//! Mower state planner
//!
//! Tracks the mower's recorded operating state and drives the device from
//! that state to a requested one along the shortest chain of legal
//! transitions.
//!
//! ```text
//! Standby | Charging                  ─start──→    Mowing
//! Paused | ChargingWithTaskSuspend    ─continue→   Mowing
//! Mowing | FixedMowing | Park         ─pause──→    Paused
//! Paused | Park                       ─cancel─→    Standby
//! (any)                               ─dock───→    Park
//! ```
//!
//! The recorded state only ever moves when the device reports a new status
//! (`record_state`); running a plan issues commands and leaves the state to
//! the device's next push.

mod control;
mod error;
mod graph;
mod planner;

pub use control::MowerControl;
pub use error::{PlannerError, PlannerResult};
pub use graph::{Edge, Source, Transition, TransitionGraph};
pub use planner::MowerPlanner;
