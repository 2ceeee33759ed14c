//! Error types shared across the integration

use thiserror::Error;

/// A state string outside the device's closed enumeration
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unrecognized mower state '{0}'")]
pub struct UnrecognizedState(pub String);

/// Result type for device client calls
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Errors raised by the device client
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceError {
    /// The client is not listening to the device
    #[error("device {device_id} is not connected")]
    NotConnected { device_id: String },

    /// The request could not be delivered
    #[error("transport error: {0}")]
    Transport(String),

    /// The device received the command and refused it
    #[error("device rejected '{command}': {reason}")]
    Rejected { command: String, reason: String },

    /// A value outside the range the device accepts
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}
