//! End-to-end room state changes: inventory, evaluators, reconciler and
//! executor wired together with a fake device client.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{room_devices, FakeClient, RecordingPublisher};
use conductor::{
    ControllerError, EvaluatorRegistry, Executor, InventoryStore, RoomController, RoomInventory,
};
use pretty_assertions::assert_eq;
use roomproto::{DisplayState, EvaluatorRef, OutcomeStatus, RoomConfiguration, RoomState};

fn inventory(evaluators: &[&str]) -> InventoryStore {
    InventoryStore::from_rooms(vec![RoomInventory {
        building: "ITB".to_string(),
        room: "1101".to_string(),
        configuration: RoomConfiguration {
            id: "ITB-1101".to_string(),
            evaluators: evaluators.iter().map(|k| EvaluatorRef::new(*k)).collect(),
        },
        devices: room_devices(),
    }])
}

fn controller(store: InventoryStore) -> (RoomController, Arc<FakeClient>, Arc<RecordingPublisher>) {
    let client = Arc::new(FakeClient::new());
    let publisher = Arc::new(RecordingPublisher::default());
    let executor = Executor::new(client.clone(), publisher.clone(), Duration::from_secs(2));
    let controller = RoomController::new(
        Arc::new(store),
        Arc::new(EvaluatorRegistry::with_defaults()),
        executor,
    );
    (controller, client, publisher)
}

const ALL: &[&str] = &[
    "PowerOnDefault",
    "StandbyDefault",
    "ChangeVideoInputDefault",
    "BlankDisplayDefault",
    "UnBlankDisplayDefault",
    "MuteDefault",
    "UnMuteDefault",
    "SetVolumeDefault",
];

#[tokio::test]
async fn room_power_on_with_one_display_in_standby() {
    let (controller, client, _) = controller(inventory(ALL));
    let mut target = RoomState::new("ITB", "1101");
    target.power = Some("on".to_string());
    target.displays.push(DisplayState {
        name: "D2".to_string(),
        power: Some("standby".to_string()),
        ..Default::default()
    });

    let report = controller.set_room_state(&target, "alice").await.unwrap();

    let mut summary: Vec<_> = report
        .outcomes
        .iter()
        .map(|o| (o.device.as_str(), o.action.as_str(), o.status))
        .collect();
    summary.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
    assert_eq!(
        summary,
        vec![
            ("D1", "PowerOn", OutcomeStatus::Success),
            ("D2", "PowerOn", OutcomeStatus::Skipped),
            ("D2", "Standby", OutcomeStatus::Success),
        ]
    );
    assert!(report.is_clean());
    assert_eq!(client.urls_for("D2"), vec!["http://driver:8000/d2.local/power/standby"]);
}

#[tokio::test]
async fn plan_hangs_one_chain_per_device_off_the_root() {
    let (controller, client, _) = controller(inventory(ALL));
    let mut target = RoomState::new("ITB", "1101");
    target.power = Some("on".to_string());
    target.current_video_input = Some("laptop".to_string());
    target.volume = Some(25);

    let graph = controller.plan(&target, "alice").await.unwrap();

    assert_eq!(graph.children(graph.root()).len(), 2);
    let chains = graph.chains();
    for chain in &chains {
        let names: Vec<_> = chain.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["PowerOn", "ChangeInput", "SetVolume"]);
    }
    assert_eq!(chains[1][1].parameters["port"], "HDMI2");
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn conflicting_device_requests_abort_before_dispatch() {
    let (controller, client, _) = controller(inventory(ALL));
    let mut target = RoomState::new("ITB", "1101");
    target.blanked = Some(true);
    target.displays.push(DisplayState {
        name: "D1".to_string(),
        blanked: Some(false),
        ..Default::default()
    });
    target.power = Some("on".to_string());
    target.displays.push(DisplayState {
        name: "D1".to_string(),
        power: Some("standby".to_string()),
        ..Default::default()
    });
    target.displays.push(DisplayState {
        name: "D1".to_string(),
        power: Some("on".to_string()),
        ..Default::default()
    });

    let err = controller.set_room_state(&target, "alice").await.unwrap_err();

    assert!(matches!(err, ControllerError::Reconcile(_)), "{err}");
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn unknown_evaluator_in_room_configuration() {
    let (controller, _, _) = controller(inventory(&["PowerOnDefault", "DanceParty"]));
    let mut target = RoomState::new("ITB", "1101");
    target.power = Some("on".to_string());

    let err = controller.set_room_state(&target, "alice").await.unwrap_err();
    assert!(matches!(err, ControllerError::UnknownEvaluator(key) if key == "DanceParty"));
}

#[tokio::test]
async fn room_without_evaluators_is_rejected() {
    let (controller, _, _) = controller(inventory(&[]));
    let target = RoomState::new("ITB", "1101");

    let err = controller.set_room_state(&target, "alice").await.unwrap_err();
    assert!(matches!(err, ControllerError::NoEvaluators(id) if id == "ITB-1101"));
}

#[tokio::test]
async fn evaluation_errors_name_the_evaluator() {
    let (controller, _, _) = controller(inventory(ALL));
    let mut target = RoomState::new("ITB", "1101");
    target.volume = Some(250);

    let err = controller.set_room_state(&target, "alice").await.unwrap_err();
    assert!(
        matches!(&err, ControllerError::Evaluation { evaluator, .. } if evaluator == "SetVolumeDefault"),
        "{err}"
    );
}

#[tokio::test]
async fn unknown_room_is_a_store_error() {
    let (controller, _, _) = controller(inventory(ALL));
    let target = RoomState::new("ITB", "9999");

    let err = controller.set_room_state(&target, "alice").await.unwrap_err();
    assert!(matches!(err, ControllerError::Store(_)));
}

#[tokio::test]
async fn report_carries_request_metadata() {
    let (controller, _, publisher) = controller(inventory(ALL));
    let mut target = RoomState::new("ITB", "1101");
    target.muted = Some(true);

    let report = controller.set_room_state(&target, "bob").await.unwrap();

    assert_eq!(report.requestor, "bob");
    assert_eq!(report.room, "1101");
    assert!(report.finished_at >= report.started_at);
    assert_eq!(report.outcomes.len(), 2);
    let muted: Vec<_> = publisher
        .events()
        .into_iter()
        .filter(|e| e.key == "muted")
        .map(|e| (e.device, e.value))
        .collect();
    assert_eq!(muted.len(), 2);
    assert!(muted.iter().all(|(_, v)| v == "true"));
}
