use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tracing::{info, instrument};

use domain::card::CardContentProvider;
use domain::deploy::{DeployStatistics, HistoryPage, HistoryQuery};
use domain::device::{normalize_address, validate_original_address};
use domain::radio::RadioAdapter;
use domain::{
    Actor, AttemptId, AuditEntry, AuditKind, DeployAttempt, Device, DeviceId, DeviceStatus,
    DeviceUpdate, DomainError, NameplateStore, ScanResult,
};

use super::envelope::*;
use super::types::{ConnectOutcome, ConnectRequest, DisconnectOutcome, RadioStatus, StatusReport};
use crate::audit::AuditRecorder;
use crate::connection::{ConnectionManager, SessionLease};
use crate::deploy::{
    BatchDeployRequest, BatchItem, BatchOutcome, DeployOrchestrator, DeployOutcome, DeployRequest,
};
use crate::history::DeploymentHistory;
use crate::registry::DeviceRegistry;
use crate::scanner::DeviceScanner;
use crate::settings::CoreSettings;
use crate::unit_of_work::{UnitOfWork, run_in_unit_of_work};

/// Entry point for every nameplate operation.
///
/// Each call runs in its own unit of work on behalf of an [`Actor`]: staged
/// device, attempt and audit writes are committed together when the call
/// succeeds and discarded when it fails.
pub struct NameplateService {
    store: Arc<dyn NameplateStore>,
    connections: Arc<ConnectionManager>,
    scanner: DeviceScanner,
    registry: DeviceRegistry,
    orchestrator: DeployOrchestrator,
    history: DeploymentHistory,
    audit: AuditRecorder,
}

impl NameplateService {
    pub fn new(
        store: Arc<dyn NameplateStore>,
        radio: Arc<dyn RadioAdapter>,
        cards: Arc<dyn CardContentProvider>,
        settings: CoreSettings,
    ) -> Self {
        let connections = Arc::new(ConnectionManager::new(
            radio.clone(),
            settings.connect_timeout,
            settings.transmit_timeout,
        ));
        Self {
            scanner: DeviceScanner::new(radio, connections.clone(), settings.scan_window),
            registry: DeviceRegistry::new(store.clone()),
            orchestrator: DeployOrchestrator::new(store.clone(), cards, connections.clone()),
            history: DeploymentHistory::new(store.clone(), settings.max_page_size),
            audit: AuditRecorder::new(store.clone()),
            connections,
            store,
        }
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    // --- Discovery -------------------------------------------------------

    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn scan(&self, actor: &Actor) -> ScanResponse {
        let result = run_in_unit_of_work(self.store.as_ref(), actor, |uow| async move {
            self.scan_in(&uow).await
        })
        .await;
        ScanResponse::from_result("scan", result, |scan| {
            format!("Found {} device(s)", scan.devices.len())
        })
    }

    async fn scan_in(&self, uow: &UnitOfWork) -> Result<ScanResult, DomainError> {
        let known = self.registry.list().await?;
        let scan = self.scanner.scan(&known).await?;
        self.audit.record(
            uow,
            "Device scan",
            AuditKind::DataRead,
            format!(
                "Scanned for {} ms, found {} device(s)",
                scan.duration_ms,
                scan.devices.len()
            ),
        );
        Ok(scan)
    }

    pub async fn radio_status(&self, _actor: &Actor) -> RadioStatusResponse {
        let status = RadioStatus {
            available: self.scanner.is_available().await,
            connected_devices: self.connections.connected_addresses().await.len(),
        };
        RadioStatusResponse::from_result("radio_status", Ok(status), |s| {
            if s.available {
                "Radio adapter available".to_string()
            } else {
                "Radio adapter not found".to_string()
            }
        })
    }

    // --- Sessions --------------------------------------------------------

    #[instrument(skip(self, actor, request), fields(actor = %actor.id, address = %request.address))]
    pub async fn connect(&self, actor: &Actor, request: &ConnectRequest) -> ConnectResponse {
        let result = run_in_unit_of_work(self.store.as_ref(), actor, |uow| async move {
            self.connect_in(&uow, request).await
        })
        .await;
        ConnectResponse::from_result("connect", result, |outcome| {
            if outcome.already_connected {
                format!("{} is already connected", outcome.device.name)
            } else {
                format!("Connected to {}", outcome.device.name)
            }
        })
    }

    async fn connect_in(
        &self,
        uow: &UnitOfWork,
        request: &ConnectRequest,
    ) -> Result<ConnectOutcome, DomainError> {
        let address = validate_original_address(&request.address)?;
        if let Some(display) = &request.display_address {
            normalize_address(display)?;
        }

        let mut lease = self.lease_address(address).await?;
        // Read under the lease so writes committed while waiting are kept
        let existing = self.registry.find_by_address(address).await?;
        let registered = existing.is_none();
        let mut device = match existing {
            Some(device) => device,
            None => Device::register(
                request.name.as_deref(),
                address,
                request.display_address.as_deref(),
                Utc::now(),
            )?,
        };

        let already_connected = lease.connect().await?;
        device.set_status(DeviceStatus::Connected, Utc::now());
        uow.save_device(&device);
        uow.hold(lease);

        let (kind, verb) = if registered {
            (AuditKind::DataCreate, "Registered and connected")
        } else {
            (AuditKind::DataUpdate, "Connected")
        };
        self.audit.record(
            uow,
            "Device connect",
            kind,
            format!("{verb} {} ({})", device.name, device.display_address),
        );
        if registered {
            info!(device_id = %device.id, name = %device.name, "New device registered");
        }

        Ok(ConnectOutcome {
            device,
            registered,
            already_connected,
        })
    }

    /// Session lease for an address, keyed by the registered device's
    /// original address when one matches
    async fn lease_address(&self, address: &str) -> Result<SessionLease, DomainError> {
        let original = self
            .registry
            .find_by_address(address)
            .await?
            .map_or_else(|| address.to_string(), |d| d.original_address);
        self.connections.acquire(&original).await
    }

    /// Session lease of a registered device. Registry writes hold it until
    /// commit so they serialize with radio operations on the same device.
    async fn lease_device(&self, id: &DeviceId) -> Result<SessionLease, DomainError> {
        let device = self.registry.get(id).await?;
        self.connections.acquire(&device.original_address).await
    }

    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn disconnect(&self, actor: &Actor, address: &str) -> DisconnectResponse {
        let result = run_in_unit_of_work(self.store.as_ref(), actor, |uow| async move {
            self.disconnect_in(&uow, address).await
        })
        .await;
        DisconnectResponse::from_result("disconnect", result, |outcome| {
            if outcome.was_connected {
                format!("Disconnected {}", outcome.address)
            } else {
                format!("{} was not connected", outcome.address)
            }
        })
    }

    async fn disconnect_in(
        &self,
        uow: &UnitOfWork,
        address: &str,
    ) -> Result<DisconnectOutcome, DomainError> {
        let address = validate_original_address(address)?;
        let mut lease = self.lease_address(address).await?;
        let original = lease.address().to_string();
        let mut device = self.registry.find_by_address(address).await?;
        let was_connected = lease.disconnect().await?;
        if let Some(device) = device.as_mut() {
            device.set_status(DeviceStatus::Disconnected, Utc::now());
            uow.save_device(device);
        }
        uow.hold(lease);

        self.audit.record(
            uow,
            "Device disconnect",
            AuditKind::DataUpdate,
            format!(
                "Disconnected {original}{}",
                if was_connected { "" } else { " (was not connected)" }
            ),
        );
        Ok(DisconnectOutcome {
            address: original,
            was_connected,
            device,
        })
    }

    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn check_status(&self, actor: &Actor, address: &str) -> StatusResponse {
        let result = run_in_unit_of_work(self.store.as_ref(), actor, |uow| async move {
            self.check_status_in(&uow, address).await
        })
        .await;
        StatusResponse::from_result("check_status", result, |report| {
            format!("{} is {}", report.address, report.status)
        })
    }

    async fn check_status_in(
        &self,
        uow: &UnitOfWork,
        address: &str,
    ) -> Result<StatusReport, DomainError> {
        let address = validate_original_address(address)?;
        let mut lease = self.lease_address(address).await?;
        let original = lease.address().to_string();
        let device = self.registry.find_by_address(address).await?;
        let status = lease.status();
        if let Some(mut device) = device.clone() {
            if device.status != status {
                device.set_status(status, Utc::now());
                uow.save_device(&device);
            }
        }
        uow.hold(lease);

        self.audit.record(
            uow,
            "Device status",
            AuditKind::DataRead,
            format!("{original} is {status}"),
        );
        Ok(StatusReport {
            address: original,
            status,
            is_connected: status.is_connected(),
            device_id: device.map(|d| d.id),
            checked_at: Utc::now(),
        })
    }

    // --- Deploy ----------------------------------------------------------

    #[instrument(skip(self, actor, request), fields(actor = %actor.id, device_id = %request.device_id))]
    pub async fn deploy(&self, actor: &Actor, request: &DeployRequest) -> DeployResponse {
        let result = run_in_unit_of_work(self.store.as_ref(), actor, |uow| async move {
            self.deploy_in(&uow, request).await
        })
        .await;
        DeployResponse::from_result("deploy", result, deploy_message)
    }

    async fn deploy_in(
        &self,
        uow: &UnitOfWork,
        request: &DeployRequest,
    ) -> Result<DeployOutcome, DomainError> {
        let outcome = self.orchestrator.deploy(uow, request).await?;
        let attempt = &outcome.attempt;
        let description = if outcome.scheduled {
            format!(
                "Scheduled card {} side {} for {}",
                attempt.card_id,
                attempt.side.code(),
                attempt
                    .scheduled_at
                    .map(|at| at.to_rfc3339())
                    .unwrap_or_default()
            )
        } else {
            format!(
                "Card {} side {} to device {}: {} (retry {})",
                attempt.card_id,
                attempt.side.code(),
                attempt.device_id,
                attempt.status,
                attempt.retry_count
            )
        };
        self.audit
            .record(uow, "Card deploy", AuditKind::DataCreate, description);
        Ok(outcome)
    }

    /// Re-drives a failed or pending attempt under its own id.
    pub async fn retry(&self, actor: &Actor, attempt_id: &AttemptId) -> DeployResponse {
        match self.history.attempt(attempt_id).await {
            Ok(attempt) => self.deploy(actor, &DeployRequest::resume(&attempt)).await,
            Err(e) => DeployResponse::from_result("retry", Err(e), deploy_message),
        }
    }

    /// Deploys one card to many devices concurrently.
    ///
    /// Each device gets its own unit of work; one device failing does not
    /// affect the others.
    #[instrument(skip(self, actor, request), fields(actor = %actor.id, devices = request.device_ids.len()))]
    pub async fn deploy_batch(
        &self,
        actor: &Actor,
        request: &BatchDeployRequest,
    ) -> BatchDeployResponse {
        let targets = match request.targets() {
            Ok(targets) => targets,
            Err(e) => return BatchDeployResponse::from_result("deploy_batch", Err(e), |_| String::new()),
        };

        let runs = targets.into_iter().map(|device_id| async move {
            let response = self.deploy(actor, &request.request_for(device_id)).await;
            let success = response.data().is_some_and(|outcome| outcome.success);
            BatchItem {
                device_id,
                success,
                message: response.message().to_string(),
                attempt: response.into_data().map(|outcome| outcome.attempt),
            }
        });
        let outcome = BatchOutcome::from_items(join_all(runs).await);
        info!(
            total = outcome.total_devices,
            successful = outcome.successful,
            failed = outcome.failed,
            "Batch deploy finished"
        );

        BatchDeployResponse::from_result("deploy_batch", Ok(outcome), |o| {
            format!(
                "Deployed to {} of {} device(s), {} failed",
                o.successful, o.total_devices, o.failed
            )
        })
    }

    pub async fn cancel_attempt(&self, actor: &Actor, attempt_id: &AttemptId) -> AttemptResponse {
        let result = run_in_unit_of_work(self.store.as_ref(), actor, |uow| async move {
            let attempt = self.orchestrator.cancel(&uow, attempt_id).await?;
            self.audit.record(
                &uow,
                "Card deploy",
                AuditKind::DataUpdate,
                format!("Cancelled scheduled deploy {}", attempt.id),
            );
            Ok::<_, DomainError>(attempt)
        })
        .await;
        AttemptResponse::from_result("cancel_attempt", result, |a| {
            format!("Deploy {} cancelled", a.id)
        })
    }

    pub async fn get_attempt(&self, _actor: &Actor, attempt_id: &AttemptId) -> AttemptResponse {
        let result = self.history.attempt(attempt_id).await;
        AttemptResponse::from_result("get_attempt", result, |a: &DeployAttempt| {
            format!("Deploy {} is {}", a.id, a.status)
        })
    }

    // --- History ---------------------------------------------------------

    pub async fn get_history(&self, actor: &Actor, query: &HistoryQuery) -> HistoryResponse {
        let result = run_in_unit_of_work(self.store.as_ref(), actor, |uow| async move {
            self.history_in(&uow, query).await
        })
        .await;
        HistoryResponse::from_result("get_history", result, |page| {
            format!(
                "{} of {} deploy record(s)",
                page.items.len(),
                page.total_count
            )
        })
    }

    async fn history_in(
        &self,
        uow: &UnitOfWork,
        query: &HistoryQuery,
    ) -> Result<HistoryPage, DomainError> {
        let page = self.history.query(query).await?;
        self.audit.record(
            uow,
            "Deploy history",
            AuditKind::DataRead,
            format!(
                "Read page {} ({} of {} record(s))",
                page.page,
                page.items.len(),
                page.total_count
            ),
        );
        Ok(page)
    }

    pub async fn history_statistics(
        &self,
        _actor: &Actor,
        device_id: Option<DeviceId>,
    ) -> StatisticsResponse {
        let result = self.history.statistics(device_id).await;
        StatisticsResponse::from_result("history_statistics", result, |s: &DeployStatistics| {
            format!("{} deploy(s), {:.2}% successful", s.total, s.success_rate)
        })
    }

    pub async fn recent_audit(&self, _actor: &Actor, limit: u64) -> AuditResponse {
        let result = self.audit.recent(limit).await;
        AuditResponse::from_result("recent_audit", result, |entries: &Vec<AuditEntry>| {
            format!("{} audit entr(ies)", entries.len())
        })
    }

    // --- Registry --------------------------------------------------------

    pub async fn list_devices(&self, _actor: &Actor) -> DeviceListResponse {
        let result = self.registry.list().await;
        DeviceListResponse::from_result("list_devices", result, |devices| {
            format!("{} registered device(s)", devices.len())
        })
    }

    pub async fn get_device(&self, _actor: &Actor, id: &DeviceId) -> DeviceResponse {
        let result = self.registry.get(id).await;
        DeviceResponse::from_result("get_device", result, |d| d.name.clone())
    }

    pub async fn update_device(
        &self,
        actor: &Actor,
        id: &DeviceId,
        update: &DeviceUpdate,
    ) -> DeviceResponse {
        let result = run_in_unit_of_work(self.store.as_ref(), actor, |uow| async move {
            let lease = self.lease_device(id).await?;
            let device = self.registry.update(&uow, id, update).await?;
            uow.hold(lease);
            self.audit.record(
                &uow,
                "Device",
                AuditKind::DataUpdate,
                format!("Updated {} ({})", device.name, device.display_address),
            );
            Ok::<_, DomainError>(device)
        })
        .await;
        DeviceResponse::from_result("update_device", result, |d| format!("Updated {}", d.name))
    }

    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn delete_device(&self, actor: &Actor, id: &DeviceId) -> DeleteResponse {
        let result = run_in_unit_of_work(self.store.as_ref(), actor, |uow| async move {
            let lease = self.lease_device(id).await?;
            let device = self.registry.delete(&uow, id).await?;
            uow.hold(lease);
            self.audit.record(
                &uow,
                "Device",
                AuditKind::DataDelete,
                format!("Deleted {} ({})", device.name, device.display_address),
            );
            Ok::<_, DomainError>(device.id)
        })
        .await;
        DeleteResponse::from_result("delete_device", result, |id| format!("Deleted device {id}"))
    }
}

fn deploy_message(outcome: &DeployOutcome) -> String {
    let attempt = &outcome.attempt;
    if outcome.scheduled {
        format!("Deploy {} scheduled", attempt.id)
    } else if outcome.success {
        format!("Card {} deployed", attempt.card_id)
    } else {
        format!(
            "Deploy failed: {}",
            attempt.error_message.as_deref().unwrap_or("unknown error")
        )
    }
}
