//! Config flow: adding and reconfiguring mowers

use moebot_config::{ConfigError, EntryData};
use moebot_core::DeviceError;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::entry::ConfigEntry;
use crate::error::{IntegrationError, IntegrationResult};
use crate::integration::MoebotIntegration;

/// Key of errors that aren't tied to one field
pub const BASE: &str = "base";

/// Outcome of a flow step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowResult {
    /// Show (or re-show) the form
    Form {
        step_id: &'static str,
        errors: HashMap<String, String>,
        /// Values to prefill
        defaults: Option<EntryData>,
    },
    CreateEntry {
        entry_id: String,
        title: String,
        data: EntryData,
    },
    Abort { reason: &'static str },
}

impl FlowResult {
    fn form(step_id: &'static str, defaults: Option<EntryData>) -> Self {
        FlowResult::Form {
            step_id,
            errors: HashMap::new(),
            defaults,
        }
    }

    fn form_error(step_id: &'static str, field: &str, error: &str, input: EntryData) -> Self {
        FlowResult::Form {
            step_id,
            errors: HashMap::from([(field.to_string(), error.to_string())]),
            defaults: Some(input),
        }
    }

    pub fn errors(&self) -> Option<&HashMap<String, String>> {
        match self {
            FlowResult::Form { errors, .. } => Some(errors),
            _ => None,
        }
    }
}

/// Drives the user and reconfigure steps against an integration
pub struct ConfigFlow<'a> {
    integration: &'a MoebotIntegration,
}

impl<'a> ConfigFlow<'a> {
    pub fn new(integration: &'a MoebotIntegration) -> Self {
        Self { integration }
    }

    /// Add a mower
    ///
    /// `None` shows the empty form.
    pub async fn step_user(&self, input: Option<EntryData>) -> FlowResult {
        const STEP: &str = "user";
        let Some(input) = input else {
            return FlowResult::form(STEP, None);
        };
        let input = trimmed(input);

        if self
            .integration
            .entries()
            .by_unique_id(&input.device_id)
            .is_some()
        {
            debug!(device_id = %input.device_id, "Device already configured");
            return FlowResult::Abort {
                reason: "already_configured",
            };
        }

        if let Err(error) = self.integration.validate_connection(&input).await {
            let (field, code) = error_code(&error);
            return FlowResult::form_error(STEP, field, code, input);
        }

        match self.integration.add_entry(input.clone()).await {
            Ok(entry_id) => {
                let title = ConfigEntry::title_for(&input.device_id);
                info!(%entry_id, %title, "Created config entry");
                FlowResult::CreateEntry {
                    entry_id,
                    title,
                    data: input,
                }
            }
            Err(IntegrationError::AlreadyConfigured(_)) => FlowResult::Abort {
                reason: "already_configured",
            },
            Err(error) => {
                let (field, code) = error_code(&error);
                FlowResult::form_error(STEP, field, code, input)
            }
        }
    }

    /// Change an existing entry's connection details
    ///
    /// `None` shows the form prefilled with the entry's data. The device id
    /// cannot change.
    pub async fn step_reconfigure(
        &self,
        entry_id: &str,
        input: Option<EntryData>,
    ) -> IntegrationResult<FlowResult> {
        const STEP: &str = "reconfigure";
        let entry = self
            .integration
            .entries()
            .get(entry_id)
            .ok_or_else(|| IntegrationError::EntryNotFound(entry_id.to_string()))?;

        let Some(input) = input else {
            return Ok(FlowResult::form(STEP, Some(entry.data)));
        };
        let input = trimmed(input);

        if input.device_id != entry.unique_id {
            return Ok(FlowResult::Abort {
                reason: "unique_id_mismatch",
            });
        }

        if let Err(error) = self.integration.validate_connection(&input).await {
            let (field, code) = error_code(&error);
            return Ok(FlowResult::form_error(STEP, field, code, input));
        }

        self.integration.entries().update_data(entry_id, input)?;
        if let Err(error) = self.integration.reload_entry(entry_id).await {
            warn!(entry_id, %error, "Reload after reconfigure failed");
        }
        info!(entry_id, "Reconfigured entry");
        Ok(FlowResult::Abort {
            reason: "reconfigure_successful",
        })
    }
}

fn trimmed(input: EntryData) -> EntryData {
    EntryData::new(
        input.device_id.trim(),
        input.ip_address.trim(),
        input.local_key.trim(),
    )
}

/// Form field and error code for a failed validation
fn error_code(error: &IntegrationError) -> (&'static str, &'static str) {
    match error {
        IntegrationError::Config(ConfigError::MissingValue { key }) => (*key, "required"),
        IntegrationError::Config(ConfigError::InvalidValue { key, .. }) => (*key, "invalid"),
        IntegrationError::Device(DeviceError::Transport(_) | DeviceError::NotConnected { .. }) => {
            (BASE, "cannot_connect")
        }
        other => {
            warn!(error = %other, "Unexpected error validating MoeBot");
            (BASE, "unknown")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moebot_device::sim::SimulatedConnector;
    use std::sync::Arc;

    fn integration() -> (Arc<SimulatedConnector>, MoebotIntegration) {
        let connector = Arc::new(SimulatedConnector::new());
        let integration = MoebotIntegration::new(connector.clone());
        (connector, integration)
    }

    fn input(device_id: &str, ip: &str) -> EntryData {
        EntryData::new(device_id, ip, "0123456789abcdef")
    }

    #[tokio::test]
    async fn test_user_shows_form() {
        let (_, integration) = integration();
        let result = ConfigFlow::new(&integration).step_user(None).await;
        assert_eq!(result, FlowResult::form("user", None));
    }

    #[tokio::test]
    async fn test_user_creates_entry() {
        let (_, integration) = integration();
        let result = ConfigFlow::new(&integration)
            .step_user(Some(input(" garden ", "192.168.1.50")))
            .await;

        let FlowResult::CreateEntry { entry_id, title, data } = result else {
            panic!("expected an entry");
        };
        assert_eq!(title, "MoeBot (garden)");
        assert_eq!(data.device_id, "garden");
        assert!(integration.is_loaded(&entry_id));
    }

    #[tokio::test]
    async fn test_user_cannot_connect() {
        let (connector, integration) = integration();
        connector.mark_unreachable("192.168.1.50");

        let result = ConfigFlow::new(&integration)
            .step_user(Some(input("garden", "192.168.1.50")))
            .await;

        assert_eq!(result.errors().unwrap()[BASE], "cannot_connect");
        assert!(integration.entries().is_empty());
    }

    #[tokio::test]
    async fn test_user_invalid_fields() {
        let (_, integration) = integration();
        let flow = ConfigFlow::new(&integration);

        let result = flow.step_user(Some(input("garden", "not an ip"))).await;
        assert_eq!(result.errors().unwrap()["ip_address"], "invalid");

        let result = flow.step_user(Some(input("", "10.0.0.1"))).await;
        assert_eq!(result.errors().unwrap()["device_id"], "required");
    }

    #[tokio::test]
    async fn test_user_already_configured() {
        let (_, integration) = integration();
        let flow = ConfigFlow::new(&integration);
        flow.step_user(Some(input("garden", "10.0.0.1"))).await;

        let result = flow.step_user(Some(input("garden", "10.0.0.2"))).await;
        assert_eq!(
            result,
            FlowResult::Abort {
                reason: "already_configured"
            }
        );
    }

    #[test]
    fn test_unexpected_errors_are_unknown() {
        let error = IntegrationError::Device(DeviceError::Rejected {
            command: "connect".to_string(),
            reason: "bad key".to_string(),
        });
        assert_eq!(error_code(&error), (BASE, "unknown"));
    }

    #[tokio::test]
    async fn test_reconfigure_replaces_data_and_reloads() {
        let (_, integration) = integration();
        let flow = ConfigFlow::new(&integration);
        let FlowResult::CreateEntry { entry_id, .. } =
            flow.step_user(Some(input("garden", "10.0.0.1"))).await
        else {
            panic!("expected an entry");
        };

        let form = flow.step_reconfigure(&entry_id, None).await.unwrap();
        assert!(matches!(
            form,
            FlowResult::Form { step_id: "reconfigure", defaults: Some(ref d), .. } if d.ip_address == "10.0.0.1"
        ));

        let result = flow
            .step_reconfigure(&entry_id, Some(input("garden", "10.0.0.9")))
            .await
            .unwrap();

        assert_eq!(
            result,
            FlowResult::Abort {
                reason: "reconfigure_successful"
            }
        );
        let entry = integration.entries().get(&entry_id).unwrap();
        assert_eq!(entry.data.ip_address, "10.0.0.9");
        assert!(integration.is_loaded(&entry_id));
    }

    #[tokio::test]
    async fn test_reconfigure_other_device_aborts() {
        let (_, integration) = integration();
        let flow = ConfigFlow::new(&integration);
        let FlowResult::CreateEntry { entry_id, .. } =
            flow.step_user(Some(input("garden", "10.0.0.1"))).await
        else {
            panic!("expected an entry");
        };

        let result = flow
            .step_reconfigure(&entry_id, Some(input("backyard", "10.0.0.1")))
            .await
            .unwrap();
        assert_eq!(
            result,
            FlowResult::Abort {
                reason: "unique_id_mismatch"
            }
        );
    }

    #[tokio::test]
    async fn test_reconfigure_missing_entry() {
        let (_, integration) = integration();
        let result = ConfigFlow::new(&integration)
            .step_reconfigure("nope", None)
            .await;
        assert!(matches!(result, Err(IntegrationError::EntryNotFound(_))));
    }
}
