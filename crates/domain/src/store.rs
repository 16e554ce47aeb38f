use async_trait::async_trait;

use crate::audit::AuditEntry;
use crate::deploy::{DeployAttempt, DeployStatistics, HistoryPage, HistoryQuery};
use crate::device::Device;
use crate::error::DomainError;
use crate::ids::{AttemptId, DeviceId};

/// A write staged by a unit of work, applied only on commit
#[derive(Debug, Clone, PartialEq)]
pub enum StagedChange {
    /// Insert or replace a device record
    SaveDevice(Device),
    DeleteDevice(DeviceId),
    /// Insert or update a deploy attempt in place
    SaveAttempt(DeployAttempt),
    AppendAudit(AuditEntry),
}

/// Persistent store for devices, deploy history and the audit trail.
///
/// Reads see committed state only. `commit` applies a batch of staged changes
/// atomically: either every change is visible afterwards or none is.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait NameplateStore: Send + Sync {
    async fn find_device(&self, id: &DeviceId) -> Result<Option<Device>, DomainError>;

    /// Finds a device by its original or normalized display address
    async fn find_device_by_address(&self, address: &str) -> Result<Option<Device>, DomainError>;

    async fn list_devices(&self) -> Result<Vec<Device>, DomainError>;

    async fn find_attempt(&self, id: &AttemptId) -> Result<Option<DeployAttempt>, DomainError>;

    async fn count_pending_attempts(&self, device_id: &DeviceId) -> Result<u64, DomainError>;

    /// Count and page are taken from the same snapshot
    async fn query_history(&self, query: &HistoryQuery) -> Result<HistoryPage, DomainError>;

    async fn history_statistics(
        &self,
        device_id: Option<DeviceId>,
    ) -> Result<DeployStatistics, DomainError>;

    /// Most recent audit entries, newest first
    async fn recent_audit(&self, limit: u64) -> Result<Vec<AuditEntry>, DomainError>;

    async fn commit(&self, changes: Vec<StagedChange>) -> Result<(), DomainError>;
}
