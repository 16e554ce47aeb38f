//! End-to-end tests of NameplateService over the in-memory store, the
//! simulated radio and a static card catalogue.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use application::service::{
    ConnectRequest, DeleteResponse, DeployResponse, ScanResponse, UNEXPECTED_ERROR_MESSAGE,
};
use application::{BatchDeployRequest, CoreSettings, DeployRequest, NameplateService};
use domain::deploy::{DeployStatistics, HistoryPage, HistoryQuery};
use domain::{
    Actor, AttemptId, AuditEntry, AuditKind, CardId, DeployAttempt, DeploySide, DeployStatus,
    Device, DeviceId, DeviceStatus, DomainError, Face, NameplateStore, StagedChange,
};
use infrastructure::cards::{CardConfig, StaticCardProvider};
use infrastructure::radio::{SimulatedDeviceConfig, SimulatedRadio, SimulatorConfig};
use infrastructure::MemoryStore;

const RECEPTION: &str = "AA:BB:CC:DD:EE:01";
const LAB: &str = "AA:BB:CC:DD:EE:02";
const LOBBY: &str = "AA:BB:CC:DD:EE:03";

struct Harness {
    service: NameplateService,
    radio: SimulatedRadio,
    store: Arc<dyn NameplateStore>,
    actor: Actor,
}

fn display(address: &str, name: &str, signal_strength: i16) -> SimulatedDeviceConfig {
    SimulatedDeviceConfig {
        original_address: address.to_string(),
        hardware_address: None,
        name: Some(name.to_string()),
        signal_strength,
        reachable: true,
        failing_faces: vec![],
    }
}

fn cards() -> StaticCardProvider {
    StaticCardProvider::new(vec![
        CardConfig {
            id: "welcome".to_string(),
            name: "Welcome".to_string(),
            same_both_sides: true,
            side_a: Some("Welcome!".to_string()),
            side_b: None,
        },
        CardConfig {
            id: "jane".to_string(),
            name: "Jane Doe".to_string(),
            same_both_sides: false,
            side_a: Some("Jane Doe".to_string()),
            side_b: Some("Engineering".to_string()),
        },
    ])
    .unwrap()
}

fn settings() -> CoreSettings {
    CoreSettings {
        scan_window: Duration::from_millis(500),
        connect_timeout: Duration::from_secs(1),
        transmit_timeout: Duration::from_secs(1),
        max_page_size: 50,
    }
}

fn harness_with_store(store: Arc<dyn NameplateStore>) -> Harness {
    harness_with(store, 0)
}

/// Every connect and transmit of the simulated radio takes `latency_ms`
fn slow_harness(latency_ms: u64) -> Harness {
    harness_with(Arc::new(MemoryStore::new()), latency_ms)
}

fn harness_with(store: Arc<dyn NameplateStore>, latency_ms: u64) -> Harness {
    let radio = SimulatedRadio::new(SimulatorConfig {
        advertise_interval_ms: 1,
        latency_ms,
        devices: vec![
            display(RECEPTION, "Reception", -45),
            display(LAB, "Lab", -70),
            display(LOBBY, "Lobby", -60),
        ],
        ..Default::default()
    });
    let service = NameplateService::new(
        store.clone(),
        Arc::new(radio.clone()),
        Arc::new(cards()),
        settings(),
    );
    Harness {
        service,
        radio,
        store,
        actor: Actor::new("u-1", "Alice"),
    }
}

fn harness() -> Harness {
    harness_with_store(Arc::new(MemoryStore::new()))
}

fn card(id: &str) -> CardId {
    CardId::new(id).unwrap()
}

async fn audit(h: &Harness) -> Vec<AuditEntry> {
    h.store.recent_audit(1000).await.unwrap()
}

async fn connect(h: &Harness, address: &str) -> Device {
    h.service
        .connect(&h.actor, &ConnectRequest::new(address))
        .await
        .into_data()
        .expect("connect should succeed")
        .device
}

#[tokio::test]
async fn test_scan_connect_deploy_happy_path() {
    let h = harness();

    let scan = h.service.scan(&h.actor).await;
    assert!(scan.is_success(), "{}", scan.message());
    let found = scan.data().unwrap();
    assert_eq!(found.devices.len(), 3);
    assert_eq!(found.devices[0].original_address, RECEPTION);
    assert!(found.devices.iter().all(|d| !d.is_registered && !d.is_connected));

    let device = connect(&h, RECEPTION).await;
    assert_eq!(device.status, DeviceStatus::Connected);
    assert_eq!(device.name, "Nameplate AA:BB:CC:DD:EE:01");

    let response = h
        .service
        .deploy(&h.actor, &DeployRequest::new(device.id, card("jane"), DeploySide::B))
        .await;
    let outcome = response.data().expect("deploy envelope").clone();
    assert!(outcome.success);
    assert_eq!(outcome.attempt.status, DeployStatus::Success);
    assert_eq!(outcome.attempt.deployed_by, "u-1");
    assert_eq!(outcome.device_status, DeviceStatus::Connected);

    let received = h.radio.received(RECEPTION);
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].face, Face::B);

    let stored = h.store.find_device(&device.id).await.unwrap().unwrap();
    assert_eq!(stored.current_card, Some(card("jane")));

    let kinds: Vec<(String, AuditKind)> = audit(&h)
        .await
        .into_iter()
        .map(|e| (e.target, e.kind))
        .collect();
    assert!(kinds.contains(&("SmartNameplate/Device scan".to_string(), AuditKind::DataRead)));
    assert!(kinds.contains(&("SmartNameplate/Device connect".to_string(), AuditKind::DataCreate)));
    assert!(kinds.contains(&("SmartNameplate/Card deploy".to_string(), AuditKind::DataCreate)));

    let rescan = h.service.scan(&h.actor).await.into_data().unwrap();
    let reception = rescan
        .devices
        .iter()
        .find(|d| d.original_address == RECEPTION)
        .unwrap();
    assert!(reception.is_connected);
    assert!(reception.is_registered);
}

#[tokio::test]
async fn test_unreachable_device_records_failed_attempt_then_retry_succeeds() {
    let h = harness();
    let device = connect(&h, LAB).await;
    h.service.disconnect(&h.actor, LAB).await;
    h.radio.set_reachable(LAB, false);

    let response = h
        .service
        .deploy(&h.actor, &DeployRequest::new(device.id, card("welcome"), DeploySide::A))
        .await;
    assert!(response.is_success());
    let failed = response.into_data().unwrap();
    assert!(!failed.success);
    assert_eq!(failed.attempt.status, DeployStatus::Failed);
    assert!(
        failed
            .attempt
            .error_message
            .as_deref()
            .unwrap()
            .contains("not responding")
    );
    assert_eq!(failed.device_status, DeviceStatus::Disconnected);

    h.radio.set_reachable(LAB, true);
    let retried = h
        .service
        .retry(&h.actor, &failed.attempt.id)
        .await
        .into_data()
        .unwrap();
    assert!(retried.success);
    assert_eq!(retried.attempt.id, failed.attempt.id);
    assert_eq!(retried.attempt.retry_count, 1);
    assert!(retried.attempt.error_message.is_none());

    let page = h
        .service
        .get_history(&h.actor, &HistoryQuery::for_device(device.id))
        .await
        .into_data()
        .unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.items[0].status, DeployStatus::Success);

    // A successful attempt is final
    let again = h.service.retry(&h.actor, &failed.attempt.id).await;
    assert!(matches!(again, DeployResponse::Rejected { .. }));
}

#[tokio::test]
async fn test_dual_side_failure_names_the_side() {
    let h = harness();
    let device = connect(&h, LOBBY).await;
    h.radio.set_failing_faces(LOBBY, vec![Face::B]);

    let outcome = h
        .service
        .deploy(&h.actor, &DeployRequest::new(device.id, card("jane"), DeploySide::Both))
        .await
        .into_data()
        .unwrap();

    assert!(!outcome.success);
    let message = outcome.attempt.error_message.clone().unwrap();
    assert!(message.starts_with("side B"), "{message}");
    assert_eq!(outcome.device_status, DeviceStatus::Error);

    let received = h.radio.received(LOBBY);
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].face, Face::A);

    let stored = h.store.find_device(&device.id).await.unwrap().unwrap();
    assert_eq!(stored.status, DeviceStatus::Error);
    assert!(stored.current_card.is_none());
}

#[tokio::test]
async fn test_identical_faces_render_once_and_reach_both_sides() {
    let h = harness();
    let device = connect(&h, RECEPTION).await;

    let outcome = h
        .service
        .deploy(&h.actor, &DeployRequest::new(device.id, card("welcome"), DeploySide::Both))
        .await
        .into_data()
        .unwrap();
    assert!(outcome.success);

    let faces: Vec<Face> = h.radio.received(RECEPTION).iter().map(|t| t.face).collect();
    assert_eq!(faces, vec![Face::A, Face::B]);
}

#[tokio::test]
async fn test_scheduled_attempt_waits_and_can_be_cancelled() {
    let h = harness();
    let device = connect(&h, RECEPTION).await;

    let mut request = DeployRequest::new(device.id, card("welcome"), DeploySide::B);
    request.scheduled_at = Some(Utc::now() + chrono::Duration::hours(2));
    let scheduled = h.service.deploy(&h.actor, &request).await.into_data().unwrap();
    assert!(scheduled.scheduled);
    assert_eq!(scheduled.attempt.status, DeployStatus::Pending);
    assert!(h.radio.received(RECEPTION).is_empty());

    let cancelled = h
        .service
        .cancel_attempt(&h.actor, &scheduled.attempt.id)
        .await
        .into_data()
        .unwrap();
    assert_eq!(cancelled.status, DeployStatus::Cancelled);

    let twice = h.service.cancel_attempt(&h.actor, &scheduled.attempt.id).await;
    assert!(!twice.is_success());

    let stored = h
        .service
        .get_attempt(&h.actor, &scheduled.attempt.id)
        .await
        .into_data()
        .unwrap();
    assert_eq!(stored.status, DeployStatus::Cancelled);
}

#[tokio::test]
async fn test_scheduled_attempt_promoted_without_retry_increment() {
    let h = harness();
    let device = connect(&h, RECEPTION).await;

    let mut request = DeployRequest::new(device.id, card("jane"), DeploySide::A);
    request.scheduled_at = Some(Utc::now() + chrono::Duration::minutes(30));
    let scheduled = h.service.deploy(&h.actor, &request).await.into_data().unwrap();

    let promoted = h
        .service
        .retry(&h.actor, &scheduled.attempt.id)
        .await
        .into_data()
        .unwrap();
    assert!(promoted.success);
    assert!(!promoted.scheduled);
    assert_eq!(promoted.attempt.id, scheduled.attempt.id);
    assert_eq!(promoted.attempt.retry_count, 0);
    assert!(promoted.attempt.is_scheduled);
}

#[tokio::test]
async fn test_connect_and_disconnect_are_idempotent() {
    let h = harness();

    let first = h
        .service
        .connect(&h.actor, &ConnectRequest::new(LAB))
        .await
        .into_data()
        .unwrap();
    assert!(first.registered);
    assert!(!first.already_connected);

    let second = h
        .service
        .connect(&h.actor, &ConnectRequest::new(LAB.to_lowercase()))
        .await
        .into_data()
        .unwrap();
    assert!(!second.registered);
    assert!(second.already_connected);
    assert_eq!(second.device.id, first.device.id);
    assert_eq!(h.store.list_devices().await.unwrap().len(), 1);

    let off = h.service.disconnect(&h.actor, LAB).await.into_data().unwrap();
    assert!(off.was_connected);
    let again = h.service.disconnect(&h.actor, LAB).await;
    assert!(again.is_success());
    assert!(!again.data().unwrap().was_connected);

    let status = h.service.check_status(&h.actor, LAB).await.into_data().unwrap();
    assert_eq!(status.status, DeviceStatus::Disconnected);
    assert_eq!(status.device_id, Some(first.device.id));
}

#[tokio::test]
async fn test_failed_connect_rolls_back() {
    let h = harness();
    h.radio.set_reachable(LOBBY, false);
    let before = audit(&h).await.len();

    let response = h.service.connect(&h.actor, &ConnectRequest::new(LOBBY)).await;
    assert!(!response.is_success());
    assert!(response.message().contains("Device connection failed"));
    assert!(h.store.list_devices().await.unwrap().is_empty());
    assert_eq!(audit(&h).await.len(), before);
}

#[tokio::test]
async fn test_rejected_deploy_leaves_no_trace() {
    let h = harness();
    let device = connect(&h, RECEPTION).await;
    let before = audit(&h).await.len();

    let response = h
        .service
        .deploy(&h.actor, &DeployRequest::new(device.id, card("ghost"), DeploySide::B))
        .await;

    assert!(matches!(response, DeployResponse::Rejected { .. }));
    assert_eq!(response.message(), "Card not found: ghost");
    assert_eq!(audit(&h).await.len(), before);
    let stats = h.store.history_statistics(None).await.unwrap();
    assert_eq!(stats.total, 0);
    assert!(h.radio.received(RECEPTION).is_empty());
}

#[tokio::test]
async fn test_delete_refused_while_pending_and_history_kept() {
    let h = harness();
    let device = connect(&h, RECEPTION).await;
    let mut request = DeployRequest::new(device.id, card("welcome"), DeploySide::B);
    request.scheduled_at = Some(Utc::now() + chrono::Duration::hours(1));
    let scheduled = h.service.deploy(&h.actor, &request).await.into_data().unwrap();

    let refused = h.service.delete_device(&h.actor, &device.id).await;
    assert!(matches!(refused, DeleteResponse::Rejected { .. }));
    assert!(refused.message().starts_with("Conflict"));

    h.service.cancel_attempt(&h.actor, &scheduled.attempt.id).await;
    let deleted = h.service.delete_device(&h.actor, &device.id).await;
    assert!(deleted.is_success());
    assert!(h.store.find_device(&device.id).await.unwrap().is_none());

    let history = h
        .service
        .get_history(&h.actor, &HistoryQuery::for_device(device.id))
        .await
        .into_data()
        .unwrap();
    assert_eq!(history.total_count, 1);
    assert!(
        audit(&h)
            .await
            .iter()
            .any(|e| e.kind == AuditKind::DataDelete)
    );
}

#[tokio::test]
async fn test_history_pages_are_consistent() {
    let h = harness();
    let device = connect(&h, RECEPTION).await;
    for _ in 0..5 {
        h.service
            .deploy(&h.actor, &DeployRequest::new(device.id, card("welcome"), DeploySide::A))
            .await;
    }

    let mut seen: Vec<AttemptId> = Vec::new();
    for page in 1..=3 {
        let query = HistoryQuery {
            device_id: Some(device.id),
            page,
            page_size: 2,
            ..Default::default()
        };
        let result = h.service.get_history(&h.actor, &query).await.into_data().unwrap();
        assert_eq!(result.total_count, 5);
        seen.extend(result.items.iter().map(|a| a.id));
    }
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 5);

    let too_big = h
        .service
        .get_history(
            &h.actor,
            &HistoryQuery {
                page_size: 51,
                ..Default::default()
            },
        )
        .await;
    assert!(!too_big.is_success());

    let stats = h
        .service
        .history_statistics(&h.actor, Some(device.id))
        .await
        .into_data()
        .unwrap();
    assert_eq!(stats.succeeded, 5);
    assert_eq!(stats.success_rate, 100.0);
}

#[tokio::test]
async fn test_batch_deploy_isolates_failures() {
    let h = harness();
    let reception = connect(&h, RECEPTION).await;
    let lab = connect(&h, LAB).await;
    let lobby = connect(&h, LOBBY).await;
    h.service.disconnect(&h.actor, LOBBY).await;
    h.radio.set_reachable(LOBBY, false);

    let request = BatchDeployRequest {
        device_ids: vec![reception.id, lab.id, lobby.id, DeviceId::new()],
        card_id: card("welcome"),
        side: DeploySide::Both,
        scheduled_at: None,
    };
    let outcome = h
        .service
        .deploy_batch(&h.actor, &request)
        .await
        .into_data()
        .unwrap();

    assert_eq!(outcome.total_devices, 4);
    assert_eq!(outcome.successful, 2);
    assert_eq!(outcome.failed, 2);
    let unknown = outcome.items.iter().find(|i| i.attempt.is_none()).unwrap();
    assert!(unknown.message.contains("Device not found"));
    let lobby_item = outcome.items.iter().find(|i| i.device_id == lobby.id).unwrap();
    assert_eq!(
        lobby_item.attempt.as_ref().map(|a| a.status),
        Some(DeployStatus::Failed)
    );
}

#[tokio::test]
async fn test_missing_adapter_rejects_scan() {
    let h = harness();
    h.radio.set_available(false);

    let response = h.service.scan(&h.actor).await;
    assert!(matches!(response, ScanResponse::Rejected { .. }));
    assert_eq!(response.message(), "Radio adapter not found");
    assert!(audit(&h).await.is_empty());

    let radio = h.service.radio_status(&h.actor).await.into_data().unwrap();
    assert!(!radio.available);
}

#[tokio::test]
async fn test_device_update_and_listing_order() {
    let h = harness();
    let lab = connect(&h, LAB).await;
    let lobby = connect(&h, LOBBY).await;

    let update = domain::DeviceUpdate {
        name: Some("Lab East".to_string()),
        custom_index: Some(1),
        ..Default::default()
    };
    let updated = h
        .service
        .update_device(&h.actor, &lab.id, &update)
        .await
        .into_data()
        .unwrap();
    assert_eq!(updated.name, "Lab East");

    let listed = h.service.list_devices(&h.actor).await.into_data().unwrap();
    assert_eq!(listed[0].id, lab.id);
    assert_eq!(listed[1].id, lobby.id);

    let bad = domain::DeviceUpdate {
        custom_index: Some(-1),
        ..Default::default()
    };
    let response = h.service.update_device(&h.actor, &lab.id, &bad).await;
    assert!(!response.is_success());
}

/// Wraps a store and fails every commit
struct BrokenStore(MemoryStore);

#[async_trait]
impl NameplateStore for BrokenStore {
    async fn find_device(&self, id: &DeviceId) -> Result<Option<Device>, DomainError> {
        self.0.find_device(id).await
    }
    async fn find_device_by_address(&self, address: &str) -> Result<Option<Device>, DomainError> {
        self.0.find_device_by_address(address).await
    }
    async fn list_devices(&self) -> Result<Vec<Device>, DomainError> {
        self.0.list_devices().await
    }
    async fn find_attempt(&self, id: &AttemptId) -> Result<Option<DeployAttempt>, DomainError> {
        self.0.find_attempt(id).await
    }
    async fn count_pending_attempts(&self, device_id: &DeviceId) -> Result<u64, DomainError> {
        self.0.count_pending_attempts(device_id).await
    }
    async fn query_history(&self, query: &HistoryQuery) -> Result<HistoryPage, DomainError> {
        self.0.query_history(query).await
    }
    async fn history_statistics(
        &self,
        device_id: Option<DeviceId>,
    ) -> Result<DeployStatistics, DomainError> {
        self.0.history_statistics(device_id).await
    }
    async fn recent_audit(&self, limit: u64) -> Result<Vec<AuditEntry>, DomainError> {
        self.0.recent_audit(limit).await
    }
    async fn commit(&self, _changes: Vec<StagedChange>) -> Result<(), DomainError> {
        Err(DomainError::Storage("disk I/O error".to_string()))
    }
}

#[tokio::test]
async fn test_storage_failure_is_masked() {
    let h = harness_with_store(Arc::new(BrokenStore(MemoryStore::new())));

    let response = h.service.connect(&h.actor, &ConnectRequest::new(RECEPTION)).await;
    assert!(!response.is_success());
    assert_eq!(response.message(), UNEXPECTED_ERROR_MESSAGE);

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["status"], "error");
    assert!(json["data"].is_null());
}

#[tokio::test]
async fn test_concurrent_connects_register_once() {
    let h = harness();
    let request = ConnectRequest::new(RECEPTION);

    let (a, b) = tokio::join!(
        h.service.connect(&h.actor, &request),
        h.service.connect(&h.actor, &request)
    );
    assert!(a.is_success(), "{}", a.message());
    assert!(b.is_success(), "{}", b.message());

    let registered = [&a, &b]
        .iter()
        .filter(|r| r.data().unwrap().registered)
        .count();
    assert_eq!(registered, 1);
    assert_eq!(a.data().unwrap().device.id, b.data().unwrap().device.id);
    assert_eq!(h.service.list_devices(&h.actor).await.into_data().unwrap().len(), 1);
}

#[tokio::test]
async fn test_deploys_to_one_device_do_not_interleave() {
    let h = harness();
    let device = connect(&h, RECEPTION).await;

    let first = DeployRequest::new(device.id, card("jane"), DeploySide::Both);
    let second = DeployRequest::new(device.id, card("welcome"), DeploySide::Both);
    let (a, b) = tokio::join!(
        h.service.deploy(&h.actor, &first),
        h.service.deploy(&h.actor, &second)
    );
    assert!(a.data().unwrap().success);
    assert!(b.data().unwrap().success);

    let received = h.radio.received(RECEPTION);
    assert_eq!(received.len(), 4);
    assert_eq!(received[0].card_id, received[1].card_id);
    assert_eq!(received[2].card_id, received[3].card_id);
    assert_ne!(received[0].card_id, received[2].card_id);
}

#[tokio::test]
async fn test_delete_waits_for_in_flight_deploy() {
    let h = slow_harness(200);
    let device = connect(&h, RECEPTION).await;

    let request = DeployRequest::new(device.id, card("welcome"), DeploySide::Both);
    let (deployed, deleted) = tokio::join!(h.service.deploy(&h.actor, &request), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        h.service.delete_device(&h.actor, &device.id).await
    });

    let deployed = deployed.into_data().unwrap();
    assert!(deployed.success);
    assert!(deleted.is_success(), "{}", deleted.message());
    assert!(h.store.find_device(&device.id).await.unwrap().is_none());
    assert!(h.store.find_device_by_address(RECEPTION).await.unwrap().is_none());

    let kept = h.store.find_attempt(&deployed.attempt.id).await.unwrap().unwrap();
    assert_eq!(kept.status, DeployStatus::Success);
}

#[tokio::test]
async fn test_deploy_after_delete_is_not_found() {
    let h = slow_harness(200);
    let device = connect(&h, RECEPTION).await;

    let request = DeployRequest::new(device.id, card("welcome"), DeploySide::B);
    let (deleted, deployed) = tokio::join!(h.service.delete_device(&h.actor, &device.id), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        h.service.deploy(&h.actor, &request).await
    });

    assert!(deleted.is_success(), "{}", deleted.message());
    assert!(!deployed.is_success());
    assert!(h.store.find_device(&device.id).await.unwrap().is_none());
    assert!(h.radio.received(RECEPTION).is_empty());
}

#[tokio::test]
async fn test_rename_during_deploy_is_kept() {
    let h = slow_harness(200);
    let device = connect(&h, RECEPTION).await;

    let request = DeployRequest::new(device.id, card("jane"), DeploySide::Both);
    let update = domain::DeviceUpdate {
        name: Some("Renamed".to_string()),
        ..Default::default()
    };
    let (deployed, updated) = tokio::join!(h.service.deploy(&h.actor, &request), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        h.service.update_device(&h.actor, &device.id, &update).await
    });

    assert!(deployed.data().unwrap().success);
    let updated = updated.into_data().unwrap();
    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.current_card, Some(card("jane")));

    let stored = h.store.find_device(&device.id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Renamed");
    assert_eq!(stored.current_card, Some(card("jane")));
    assert_eq!(stored.status, DeviceStatus::Connected);
}

#[tokio::test]
async fn test_rename_during_reconnect_is_kept() {
    let h = slow_harness(200);
    let device = connect(&h, RECEPTION).await;
    assert!(h.service.disconnect(&h.actor, RECEPTION).await.is_success());

    let update = domain::DeviceUpdate {
        custom_index: Some(7),
        name: Some("Front Desk".to_string()),
        ..Default::default()
    };
    let request = ConnectRequest::new(RECEPTION);
    let (connected, updated) = tokio::join!(
        h.service.connect(&h.actor, &request),
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            h.service.update_device(&h.actor, &device.id, &update).await
        }
    );
    assert!(connected.is_success(), "{}", connected.message());
    assert!(updated.is_success(), "{}", updated.message());

    let stored = h.store.find_device(&device.id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Front Desk");
    assert_eq!(stored.custom_index, Some(7));
    assert_eq!(stored.status, DeviceStatus::Connected);

    let status = h.service.check_status(&h.actor, RECEPTION).await;
    assert!(status.is_success());
    let stored = h.store.find_device(&device.id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Front Desk");
}
