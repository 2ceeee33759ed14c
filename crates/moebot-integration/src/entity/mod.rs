//! Entity platforms
//!
//! Each platform wraps the shared [`MoebotDevice`] and exposes its state the
//! way the matching Home Assistant platform does. Entities are push driven:
//! nothing polls them, the integration re-renders every entity into
//! [`EntityStates`] after each device update.

mod button;
mod lawn_mower;
mod number;
mod sensor;
mod switch;
mod vacuum;

pub use button::UpdateButton;
pub use lawn_mower::{LawnMowerFeature, MoebotLawnMower};
pub use number::MowingTimeNumber;
pub use sensor::{MoebotSensor, SensorKind};
pub use switch::ParkIfRainingSwitch;
pub use vacuum::{MoebotVacuum, VacuumFeature};

use moebot_core::{MowerAction, MowerState, DOMAIN, MANUFACTURER};
use moebot_planner::{Edge, PlannerError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::device::MoebotDevice;
use crate::error::{EntityError, EntityResult};
use crate::states::{EntityState, EntityStates};

/// State written for entities whose device hasn't reported yet
pub const STATE_UNAVAILABLE: &str = "unavailable";

/// State written when the entity has no value
pub const STATE_UNKNOWN: &str = "unknown";

/// Platforms the integration provides entities for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Button,
    LawnMower,
    Number,
    Sensor,
    Switch,
    Vacuum,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::Button,
        Platform::LawnMower,
        Platform::Number,
        Platform::Sensor,
        Platform::Switch,
        Platform::Vacuum,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Platform::Button => "button",
            Platform::LawnMower => "lawn_mower",
            Platform::Number => "number",
            Platform::Sensor => "sensor",
            Platform::Switch => "switch",
            Platform::Vacuum => "vacuum",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    Config,
    Diagnostic,
}

impl EntityCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            EntityCategory::Config => "config",
            EntityCategory::Diagnostic => "diagnostic",
        }
    }
}

/// Device registry details shared by every entity of a mower
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// `(domain, device id)`
    pub identifiers: Vec<(String, String)>,
    pub name: String,
    pub manufacturer: String,
    pub sw_version: String,
}

impl DeviceInfo {
    pub fn for_device(device: &MoebotDevice) -> Self {
        Self {
            identifiers: vec![(DOMAIN.to_string(), device.id().to_string())],
            name: format!("MoeBot ({})", device.id()),
            manufacturer: MANUFACTURER.to_string(),
            sw_version: device.client().client_version(),
        }
    }
}

/// Behavior common to every MoeBot entity
pub trait MoebotEntity: Send + Sync {
    fn platform(&self) -> Platform;

    fn device(&self) -> &Arc<MoebotDevice>;

    /// Stable id, prefixed by the device id
    fn unique_id(&self) -> String;

    fn name(&self) -> String;

    /// Current value, `None` if unknown
    fn state(&self) -> Option<String>;

    /// Platform specific attributes
    fn attributes(&self) -> HashMap<String, Value> {
        HashMap::new()
    }

    fn entity_category(&self) -> Option<EntityCategory> {
        None
    }

    fn icon(&self) -> Option<String> {
        None
    }

    fn available(&self) -> bool {
        self.device().available()
    }

    fn device_info(&self) -> DeviceInfo {
        DeviceInfo::for_device(self.device())
    }

    fn entity_id(&self) -> String {
        format!("{}.{}", self.platform(), slugify(&self.unique_id()))
    }
}

/// Write `entity` into the state store
pub fn render(entity: &dyn MoebotEntity, states: &EntityStates) -> EntityState {
    let state = if entity.available() {
        entity.state().unwrap_or_else(|| STATE_UNKNOWN.to_string())
    } else {
        STATE_UNAVAILABLE.to_string()
    };

    let mut attributes = entity.attributes();
    attributes.insert("friendly_name".to_string(), json!(entity.name()));
    attributes.insert("unique_id".to_string(), json!(entity.unique_id()));
    attributes.insert("device_id".to_string(), json!(entity.device().id()));
    if let Some(category) = entity.entity_category() {
        attributes.insert("entity_category".to_string(), json!(category.as_str()));
    }
    if let Some(icon) = entity.icon() {
        attributes.insert("icon".to_string(), json!(icon));
    }

    states.set(&entity.entity_id(), state, attributes)
}

/// Pause the mower without driving it anywhere else first
///
/// Only a plan made of `pause` steps runs; an idle or docked mower is never
/// started just to be paused.
pub(crate) async fn pause_in_place(entity: &dyn MoebotEntity) -> EntityResult<Vec<Edge>> {
    let planner = entity.device().planner();
    let result = planner
        .drive_to_if(MowerState::Paused, |plan| {
            plan.iter().all(|edge| edge.action == MowerAction::Pause)
        })
        .await;

    match result {
        Err(PlannerError::Rejected { from, .. }) => Err(EntityError::InvalidAction {
            entity: entity.entity_id(),
            action: "pause",
            state: from,
        }),
        other => Ok(other?),
    }
}

/// Every entity created for one device
pub struct EntitySet {
    pub lawn_mower: Arc<MoebotLawnMower>,
    pub vacuum: Arc<MoebotVacuum>,
    pub sensors: Vec<Arc<MoebotSensor>>,
    pub mowing_time: Arc<MowingTimeNumber>,
    pub park_if_raining: Arc<ParkIfRainingSwitch>,
    pub update_button: Arc<UpdateButton>,
}

impl EntitySet {
    pub fn new(device: &Arc<MoebotDevice>) -> Self {
        Self {
            lawn_mower: Arc::new(MoebotLawnMower::new(device.clone())),
            vacuum: Arc::new(MoebotVacuum::new(device.clone())),
            sensors: SensorKind::ALL
                .into_iter()
                .map(|kind| Arc::new(MoebotSensor::new(device.clone(), kind)))
                .collect(),
            mowing_time: Arc::new(MowingTimeNumber::new(device.clone())),
            park_if_raining: Arc::new(ParkIfRainingSwitch::new(device.clone())),
            update_button: Arc::new(UpdateButton::new(device.clone())),
        }
    }

    pub fn all(&self) -> Vec<&dyn MoebotEntity> {
        let mut all: Vec<&dyn MoebotEntity> = vec![
            self.lawn_mower.as_ref(),
            self.vacuum.as_ref(),
            self.mowing_time.as_ref(),
            self.park_if_raining.as_ref(),
            self.update_button.as_ref(),
        ];
        all.extend(self.sensors.iter().map(|s| s.as_ref() as &dyn MoebotEntity));
        all
    }

    pub fn sensor(&self, kind: SensorKind) -> Option<&Arc<MoebotSensor>> {
        self.sensors.iter().find(|s| s.kind() == kind)
    }

    pub fn entity_ids(&self) -> Vec<String> {
        self.all().into_iter().map(|e| e.entity_id()).collect()
    }

    /// Render every entity
    pub fn render_all(&self, states: &EntityStates) {
        for entity in self.all() {
            render(entity, states);
        }
    }
}

/// Lower-case alphanumerics joined by single underscores
pub fn slugify(text: &str) -> String {
    let mut result = String::new();
    for c in text.chars() {
        if c.is_alphanumeric() {
            result.extend(c.to_lowercase());
        } else if !result.is_empty() && !result.ends_with('_') {
            result.push('_');
        }
    }
    result.trim_end_matches('_').to_string()
}
