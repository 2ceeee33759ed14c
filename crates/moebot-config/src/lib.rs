//! Configuration loading for the MoeBot integration
//!
//! Devices are declared under the `moebot:` key of `configuration.yaml`:
//!
//! ```yaml
//! moebot:
//!   - device_id: bf0123456789abcdef
//!     ip_address: 192.168.1.50
//!     local_key: !secret moebot_local_key
//! ```
//!
//! The loader understands three custom tags:
//!
//! - `!secret key` - value from `secrets.yaml` next to the main file
//! - `!env_var NAME [default]` - environment variable, with optional fallback
//! - `!include path` - another YAML file, relative to the including one

mod entry;
mod error;
mod loader;
mod secrets;

pub use entry::{load_config, EntryData, MoebotConfig, CONFIGURATION_FILE};
pub use error::{ConfigError, ConfigResult};
pub use loader::{load_yaml, YamlLoader};
pub use secrets::Secrets;

pub use serde_yaml::Value;
