//! Integration lifecycle tests
//!
//! Drive a [`MoebotIntegration`] against simulated mowers: setup, device
//! pushes flowing into the planner and the entity states, entity actions,
//! unload, reload and shutdown.

use moebot_config::EntryData;
use moebot_core::{DeviceError, DeviceStatus, MowerAction, MowerState};
use moebot_device::sim::{SimulatedConnector, SimulatedMower};
use moebot_device::MoebotClient;
use moebot_integration::entity::{MoebotEntity, SensorKind, STATE_UNAVAILABLE};
use moebot_integration::{ConfigEntryState, IntegrationError, MoebotIntegration};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::assert_ok;

fn setup() -> (Arc<SimulatedConnector>, MoebotIntegration) {
    let connector = Arc::new(SimulatedConnector::new());
    let integration = MoebotIntegration::new(connector.clone());
    (connector, integration)
}

fn data(device_id: &str) -> EntryData {
    EntryData::new(device_id, "192.168.1.50", "0123456789abcdef")
}

/// Poll `check` until it holds or a second has passed
async fn wait_for(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

// ==================== Setup ====================

#[tokio::test]
async fn test_setup_loads_entry_and_renders_entities() {
    let (connector, integration) = setup();
    connector.insert(Arc::new(SimulatedMower::new("garden").with_status(
        DeviceStatus {
            state: "CHARGING".to_string(),
            battery: 80,
            ..Default::default()
        },
    )));

    let entry_id = assert_ok!(integration.add_entry(data("garden")).await);

    let entry = integration.entries().get(&entry_id).unwrap();
    assert_eq!(entry.state, ConfigEntryState::Loaded);
    assert_eq!(entry.title, "MoeBot (garden)");

    let states = integration.states().clone();
    assert!(
        wait_for(|| states.is_state("lawn_mower.garden_mower", "docked")).await,
        "lawn mower not rendered: {:?}",
        states.get("lawn_mower.garden_mower")
    );
    assert!(states.is_state("sensor.garden_battery", "80"));
    assert!(states.is_state("sensor.garden_state", "CHARGING"));
    assert!(states.is_state("vacuum.moebot_garden", "docked"));
    assert!(states.is_state("number.garden_mow_time_hrs", "6"));
    assert!(states.is_state("switch.garden_park_if_raining", "off"));

    let device = integration.device(&entry_id).unwrap();
    assert!(wait_for(|| device.state() == MowerState::Charging).await);
}

#[tokio::test]
async fn test_first_render_uses_reported_state() {
    let (connector, integration) = setup();
    connector.insert(Arc::new(SimulatedMower::new("garden").with_status(
        DeviceStatus {
            state: "MOWING".to_string(),
            ..Default::default()
        },
    )));
    let mut changes = integration.states().subscribe();

    let entry_id = integration.add_entry(data("garden")).await.unwrap();

    // Rendered during setup, before the listener has run
    assert_eq!(integration.device(&entry_id).unwrap().state(), MowerState::Mowing);
    let first = std::iter::from_fn(|| changes.try_recv().ok())
        .find(|change| change.entity_id == "lawn_mower.garden_mower")
        .and_then(|change| change.new_state)
        .map(|state| state.state);
    assert_eq!(first.as_deref(), Some("mowing"));
}

#[tokio::test]
async fn test_setup_failure_then_retry() {
    let (connector, integration) = setup();
    connector.mark_unreachable("10.0.0.7");
    let entry_id = integration
        .add_entry(EntryData::new("garden", "10.0.0.7", "k"))
        .await
        .unwrap();

    let entry = integration.entries().get(&entry_id).unwrap();
    assert_eq!(entry.state, ConfigEntryState::SetupError);
    assert!(entry.reason.unwrap().contains("10.0.0.7"));
    assert!(!integration.is_loaded(&entry_id));

    integration
        .entries()
        .update_data(&entry_id, data("garden"))
        .unwrap();
    assert_ok!(integration.reload_entry(&entry_id).await);
    assert!(integration.is_loaded(&entry_id));
}

#[tokio::test]
async fn test_duplicate_device_rejected() {
    let (_, integration) = setup();
    integration.add_entry(data("garden")).await.unwrap();

    let result = integration.add_entry(data("garden")).await;
    assert!(matches!(result, Err(IntegrationError::AlreadyConfigured(_))));
    assert_eq!(integration.entries().len(), 1);
}

#[tokio::test]
async fn test_invalid_data_rejected() {
    let (_, integration) = setup();
    let result = integration
        .add_entry(EntryData::new("garden", "mower.local", "k"))
        .await;
    assert!(matches!(result, Err(IntegrationError::Config(_))));
    assert!(integration.entries().is_empty());
}

// ==================== Device pushes ====================

#[tokio::test]
async fn test_pushes_update_planner_and_states() {
    let (connector, integration) = setup();
    let entry_id = integration.add_entry(data("garden")).await.unwrap();
    let sim = connector.device("garden").unwrap();
    let device = integration.device(&entry_id).unwrap();

    sim.push_state("MOWING");
    sim.push_battery(42);

    let states = integration.states().clone();
    assert!(wait_for(|| states.is_state("sensor.garden_battery", "42")).await);
    assert_eq!(device.state(), MowerState::Mowing);
    assert!(states.is_state("lawn_mower.garden_mower", "mowing"));
    assert!(states.is_state("vacuum.moebot_garden", "cleaning"));
}

#[tokio::test]
async fn test_unrecognized_state_keeps_recorded_state() {
    let (connector, integration) = setup();
    let entry_id = integration.add_entry(data("garden")).await.unwrap();
    let sim = connector.device("garden").unwrap();
    let device = integration.device(&entry_id).unwrap();

    sim.push_state("PARK");
    assert!(wait_for(|| device.state() == MowerState::Park).await);

    sim.push_state("TURBO_MODE");
    let states = integration.states().clone();
    assert!(wait_for(|| states.is_state("sensor.garden_state", "TURBO_MODE")).await);
    assert_eq!(device.state(), MowerState::Park);
    assert!(states.is_state("lawn_mower.garden_mower", "error"));
    assert!(states.is_state("vacuum.moebot_garden", "error"));

    sim.push_state("MOWING");
    assert!(wait_for(|| states.is_state("lawn_mower.garden_mower", "mowing")).await);
    assert!(states.is_state("vacuum.moebot_garden", "cleaning"));
}

// ==================== Entity actions ====================

#[tokio::test]
async fn test_lawn_mower_actions_follow_device() {
    let (connector, integration) = setup();
    let entry_id = integration.add_entry(data("garden")).await.unwrap();
    let sim = connector.device("garden").unwrap();
    let entities = integration.entities(&entry_id).unwrap();
    let device = integration.device(&entry_id).unwrap();

    assert_ok!(entities.lawn_mower.start_mowing().await);
    assert!(wait_for(|| device.state() == MowerState::Mowing).await);

    assert_ok!(entities.lawn_mower.pause().await);
    assert!(wait_for(|| device.state() == MowerState::Paused).await);

    assert_ok!(entities.vacuum.stop().await);
    assert!(wait_for(|| device.state() == MowerState::Standby).await);

    assert_eq!(
        sim.commands(),
        [MowerAction::Start, MowerAction::Pause, MowerAction::Cancel]
    );
    let states = integration.states().clone();
    assert!(wait_for(|| states.is_state("vacuum.moebot_garden", "docked")).await);
}

#[tokio::test]
async fn test_config_entities_write_through() {
    let (connector, integration) = setup();
    let entry_id = integration.add_entry(data("garden")).await.unwrap();
    let sim = connector.device("garden").unwrap();
    let entities = integration.entities(&entry_id).unwrap();

    assert_ok!(entities.mowing_time.set_native_value(10.0).await);
    assert_ok!(entities.park_if_raining.turn_on().await);
    assert_ok!(entities.update_button.press().await);

    let status = sim.status().unwrap();
    assert_eq!(status.mow_time, 10);
    assert!(status.mow_in_rain);
    assert_eq!(sim.poll_count(), 1);

    let states = integration.states().clone();
    assert!(wait_for(|| states.is_state("switch.garden_park_if_raining", "on")).await);
    assert!(states.is_state("number.garden_mow_time_hrs", "10"));
}

// ==================== Unload ====================

#[tokio::test]
async fn test_unload_removes_states_and_disconnects() {
    let (connector, integration) = setup();
    let entry_id = integration.add_entry(data("garden")).await.unwrap();
    let sim = connector.device("garden").unwrap();
    let entity_ids = integration.entities(&entry_id).unwrap().entity_ids();

    assert_ok!(integration.unload_entry(&entry_id).await);

    assert!(!sim.is_connected());
    assert!(!integration.is_loaded(&entry_id));
    assert_eq!(
        integration.entries().get(&entry_id).unwrap().state,
        ConfigEntryState::NotLoaded
    );
    for entity_id in entity_ids {
        assert!(integration.states().get(&entity_id).is_none(), "{entity_id}");
    }

    // Pushes after unload go nowhere
    sim.push_state("MOWING");
    assert!(integration.states().is_empty());
}

#[tokio::test]
async fn test_unload_requires_loaded_entry() {
    let (_, integration) = setup();
    let entry_id = integration.add_entry(data("garden")).await.unwrap();
    integration.unload_entry(&entry_id).await.unwrap();

    let result = integration.unload_entry(&entry_id).await;
    assert!(matches!(
        result,
        Err(IntegrationError::CannotUnload(ConfigEntryState::NotLoaded))
    ));
    assert!(matches!(
        integration.unload_entry("missing").await,
        Err(IntegrationError::EntryNotFound(_))
    ));
}

#[tokio::test]
async fn test_failed_unload_still_clears_states() {
    let (connector, integration) = setup();
    let entry_id = integration.add_entry(data("garden")).await.unwrap();
    let sim = connector.device("garden").unwrap();
    sim.fail_unlisten(DeviceError::Transport("socket closed".to_string()));

    let result = integration.unload_entry(&entry_id).await;

    assert!(matches!(result, Err(IntegrationError::Device(_))));
    let entry = integration.entries().get(&entry_id).unwrap();
    assert_eq!(entry.state, ConfigEntryState::FailedUnload);
    assert!(entry.reason.unwrap().contains("socket closed"));
    assert!(!integration.is_loaded(&entry_id));
    assert!(integration.states().is_empty());
}

#[tokio::test]
async fn test_reload_reconnects() {
    let (connector, integration) = setup();
    let entry_id = integration.add_entry(data("garden")).await.unwrap();
    let sim = connector.device("garden").unwrap();

    assert_ok!(integration.reload_entry(&entry_id).await);

    assert!(sim.is_connected());
    assert!(integration.is_loaded(&entry_id));
    let states = integration.states().clone();
    sim.push_state("PAUSED");
    assert!(wait_for(|| states.is_state("lawn_mower.garden_mower", "paused")).await);
}

#[tokio::test]
async fn test_shutdown_unloads_everything() {
    let (connector, integration) = setup();
    let a = integration.add_entry(data("front")).await.unwrap();
    let b = integration
        .add_entry(EntryData::new("back", "192.168.1.51", "k"))
        .await
        .unwrap();

    integration.shutdown().await;

    for (entry_id, device_id) in [(a, "front"), (b, "back")] {
        assert_eq!(
            integration.entries().get(&entry_id).unwrap().state,
            ConfigEntryState::NotLoaded
        );
        assert!(!connector.device(device_id).unwrap().is_connected());
    }
    assert!(integration.states().is_empty());
}

#[tokio::test]
async fn test_remove_entry_frees_device() {
    let (_, integration) = setup();
    let entry_id = integration.add_entry(data("garden")).await.unwrap();

    let removed = assert_ok!(integration.remove_entry(&entry_id).await);
    assert_eq!(removed.unique_id, "garden");
    assert!(integration.entries().is_empty());
    assert_ok!(integration.add_entry(data("garden")).await);
}

// ==================== Availability ====================

#[tokio::test]
async fn test_entities_unavailable_until_first_report() {
    let sim = Arc::new(SimulatedMower::new("garden"));
    let device = moebot_integration::MoebotDevice::new(sim.clone());
    assert!(!device.available());

    let device = Arc::new(device);
    let sensor = moebot_integration::entity::MoebotSensor::new(
        device.clone(),
        SensorKind::BatteryLevel,
    );
    let states = moebot_integration::EntityStates::new();
    moebot_integration::entity::render(&sensor, &states);
    assert!(states.is_state(&sensor.entity_id(), STATE_UNAVAILABLE));

    sim.listen().await.unwrap();
    assert!(device.available());
    moebot_integration::entity::render(&sensor, &states);
    assert!(states.is_state(&sensor.entity_id(), "100"));
}
