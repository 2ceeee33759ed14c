//! MoeBot device entries

use moebot_core::{conf, DOMAIN};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{ConfigError, ConfigResult};
use crate::loader::YamlLoader;

/// Main configuration file in the config directory
pub const CONFIGURATION_FILE: &str = "configuration.yaml";

/// Connection details for one mower
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryData {
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub local_key: String,
}

impl EntryData {
    pub fn new(
        device_id: impl Into<String>,
        ip_address: impl Into<String>,
        local_key: impl Into<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            ip_address: ip_address.into(),
            local_key: local_key.into(),
        }
    }

    /// Check that every option is present and the address is an IP
    pub fn validate(&self) -> ConfigResult<()> {
        for (key, value) in [
            (conf::DEVICE_ID, &self.device_id),
            (conf::IP_ADDRESS, &self.ip_address),
            (conf::LOCAL_KEY, &self.local_key),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingValue { key });
            }
        }

        self.ip_address
            .trim()
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                key: conf::IP_ADDRESS,
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

impl fmt::Debug for EntryData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryData")
            .field("device_id", &self.device_id)
            .field("ip_address", &self.ip_address)
            .field("local_key", &"<redacted>")
            .finish()
    }
}

/// The `moebot:` section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoebotConfig {
    pub entries: Vec<EntryData>,
}

impl MoebotConfig {
    /// Extract and validate the `moebot:` section from a loaded document
    ///
    /// A document without the section yields no entries.
    pub fn from_document(document: &serde_yaml::Value) -> ConfigResult<Self> {
        let Some(section) = document.get(DOMAIN) else {
            return Ok(Self::default());
        };

        let entries: Vec<EntryData> = match section {
            serde_yaml::Value::Null => Ok(Vec::new()),
            serde_yaml::Value::Sequence(_) => {
                serde_yaml::from_value::<Vec<EntryData>>(section.clone())
            }
            // A single device may be given without the list
            serde_yaml::Value::Mapping(_) => {
                serde_yaml::from_value::<EntryData>(section.clone()).map(|entry| vec![entry])
            }
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "moebot",
                    reason: format!("expected a list of devices, got {other:?}"),
                })
            }
        }
        .map_err(|source| ConfigError::ParseYaml {
            path: PathBuf::from(CONFIGURATION_FILE),
            source,
        })?;

        let mut seen = HashSet::new();
        for entry in &entries {
            entry.validate()?;
            if !seen.insert(entry.device_id.as_str()) {
                return Err(ConfigError::DuplicateDevice {
                    device_id: entry.device_id.clone(),
                });
            }
        }

        Ok(Self { entries })
    }
}

/// Load `configuration.yaml` from `config_dir` and return its MoeBot devices
pub fn load_config(config_dir: &Path) -> ConfigResult<MoebotConfig> {
    let mut loader = YamlLoader::new(config_dir)?;
    let document = loader.load_file(CONFIGURATION_FILE)?;
    let config = MoebotConfig::from_document(&document)?;
    info!(devices = config.entries.len(), "Loaded MoeBot configuration");
    Ok(config)
}
