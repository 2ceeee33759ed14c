//! MoeBot integration
//!
//! Wires a MoeBot device client into Home Assistant style entities:
//!
//! - [`ConfigEntries`] and [`ConfigFlow`] manage which devices are set up
//! - [`MoebotIntegration`] sets a device up, listens to its pushes, records
//!   the mower state in its [`moebot_planner::MowerPlanner`] and renders
//!   every entity into the [`EntityStates`] store
//! - the [`entity`] platforms translate user actions into planner targets or
//!   direct device calls

mod control;
mod device;
pub mod entity;
mod entry;
mod error;
mod flow;
mod integration;
mod states;

pub use control::ClientControl;
pub use device::MoebotDevice;
pub use entry::{ConfigEntries, ConfigEntry, ConfigEntryState, InvalidTransition};
pub use error::{EntityError, EntityResult, IntegrationError, IntegrationResult};
pub use flow::{ConfigFlow, FlowResult};
pub use integration::MoebotIntegration;
pub use states::{EntityState, EntityStates, StateChanged};
