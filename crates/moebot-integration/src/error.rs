//! Integration and entity errors

use moebot_config::ConfigError;
use moebot_core::{DeviceError, MowerState};
use moebot_planner::PlannerError;
use thiserror::Error;

use crate::entry::{ConfigEntryState, InvalidTransition};

pub type IntegrationResult<T> = Result<T, IntegrationError>;

/// Errors from setting up, unloading or reconfiguring a device
#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("config entry not found: {0}")]
    EntryNotFound(String),

    #[error("a config entry already exists for device {0}")]
    AlreadyConfigured(String),

    #[error("cannot unload entry in state {0:?}")]
    CannotUnload(ConfigEntryState),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("invalid entry data: {0}")]
    Config(#[from] ConfigError),

    #[error("device error: {0}")]
    Device(#[from] DeviceError),
}

pub type EntityResult<T> = Result<T, EntityError>;

/// Errors returned from entity actions
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EntityError {
    #[error(transparent)]
    Planner(#[from] PlannerError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("{entity} does not support {feature}")]
    NotSupported {
        entity: String,
        feature: &'static str,
    },

    #[error("{entity} cannot {action} while {state}")]
    InvalidAction {
        entity: String,
        action: &'static str,
        state: MowerState,
    },

    #[error("invalid value for {entity}: {reason}")]
    InvalidValue { entity: String, reason: String },
}
