use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use domain::deploy::{DeployStatistics, HistoryPage, HistoryQuery, history_order};
use domain::{
    AttemptId, AuditEntry, DeployAttempt, DeployStatus, Device, DeviceId, DomainError,
    NameplateStore, StagedChange,
};

#[derive(Default)]
struct State {
    devices: HashMap<DeviceId, Device>,
    attempts: HashMap<AttemptId, DeployAttempt>,
    audit: Vec<AuditEntry>,
}

/// Process-local store. Commits apply under one write lock, so readers see
/// either none or all of a batch.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NameplateStore for MemoryStore {
    async fn find_device(&self, id: &DeviceId) -> Result<Option<Device>, DomainError> {
        Ok(self.state.read().await.devices.get(id).cloned())
    }

    async fn find_device_by_address(&self, address: &str) -> Result<Option<Device>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .devices
            .values()
            .filter(|d| d.answers_to(address))
            .min_by_key(|d| d.created_at)
            .cloned())
    }

    async fn list_devices(&self) -> Result<Vec<Device>, DomainError> {
        let mut devices: Vec<Device> = self.state.read().await.devices.values().cloned().collect();
        devices.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(devices)
    }

    async fn find_attempt(&self, id: &AttemptId) -> Result<Option<DeployAttempt>, DomainError> {
        Ok(self.state.read().await.attempts.get(id).cloned())
    }

    async fn count_pending_attempts(&self, device_id: &DeviceId) -> Result<u64, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .attempts
            .values()
            .filter(|a| a.device_id == *device_id && a.status == DeployStatus::Pending)
            .count() as u64)
    }

    async fn query_history(&self, query: &HistoryQuery) -> Result<HistoryPage, DomainError> {
        let state = self.state.read().await;
        let mut matching: Vec<&DeployAttempt> =
            state.attempts.values().filter(|a| query.matches(a)).collect();
        matching.sort_by(|a, b| history_order(a, b));

        let items = matching
            .iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(query.page_size as usize)
            .map(|a| (*a).clone())
            .collect();
        Ok(HistoryPage {
            items,
            total_count: matching.len() as u64,
            page: query.page,
            page_size: query.page_size,
        })
    }

    async fn history_statistics(
        &self,
        device_id: Option<DeviceId>,
    ) -> Result<DeployStatistics, DomainError> {
        let state = self.state.read().await;
        Ok(DeployStatistics::from_attempts(
            state
                .attempts
                .values()
                .filter(|a| device_id.is_none_or(|id| a.device_id == id)),
        ))
    }

    async fn recent_audit(&self, limit: u64) -> Result<Vec<AuditEntry>, DomainError> {
        let state = self.state.read().await;
        let mut entries: Vec<AuditEntry> = state.audit.clone();
        entries.reverse();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(entries)
    }

    async fn commit(&self, changes: Vec<StagedChange>) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        for change in changes {
            match change {
                StagedChange::SaveDevice(device) => {
                    state.devices.insert(device.id, device);
                }
                StagedChange::DeleteDevice(id) => {
                    state.devices.remove(&id);
                }
                StagedChange::SaveAttempt(attempt) => {
                    state.attempts.insert(attempt.id, attempt);
                }
                StagedChange::AppendAudit(entry) => state.audit.push(entry),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use domain::{Actor, AuditKind, CardId, DeploySide};

    fn attempt(device: DeviceId, minutes_ago: i64, status: DeployStatus) -> DeployAttempt {
        let mut a = DeployAttempt::new(
            device,
            CardId::new("card-1").unwrap(),
            DeploySide::B,
            None,
            "u-1",
            Utc::now() - Duration::minutes(minutes_ago),
        );
        a.status = status;
        a
    }

    #[tokio::test]
    async fn test_history_pages_newest_first() {
        let store = MemoryStore::new();
        let device = DeviceId::new();
        let changes = (0..5)
            .map(|i| StagedChange::SaveAttempt(attempt(device, i, DeployStatus::Success)))
            .collect();
        store.commit(changes).await.unwrap();

        let query = HistoryQuery {
            device_id: Some(device),
            page: 2,
            page_size: 2,
            ..Default::default()
        };
        let page = store.query_history(&query).await.unwrap();
        assert_eq!(page.total_count, 5);
        assert_eq!(page.items.len(), 2);
        assert!(page.items[0].created_at > page.items[1].created_at);
    }

    #[tokio::test]
    async fn test_counts_only_pending_for_device() {
        let store = MemoryStore::new();
        let device = DeviceId::new();
        store
            .commit(vec![
                StagedChange::SaveAttempt(attempt(device, 1, DeployStatus::Pending)),
                StagedChange::SaveAttempt(attempt(device, 2, DeployStatus::Failed)),
                StagedChange::SaveAttempt(attempt(DeviceId::new(), 3, DeployStatus::Pending)),
            ])
            .await
            .unwrap();

        assert_eq!(store.count_pending_attempts(&device).await.unwrap(), 1);
        let stats = store.history_statistics(Some(device)).await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.failed, 1);
    }

    #[tokio::test]
    async fn test_recent_audit_is_newest_first_and_limited() {
        let store = MemoryStore::new();
        let actor = Actor::system();
        let now = Utc::now();
        let changes = (0..3)
            .map(|i| {
                StagedChange::AppendAudit(AuditEntry::new(
                    "Test",
                    AuditKind::DataRead,
                    format!("entry {i}"),
                    &actor,
                    now + Duration::seconds(i),
                ))
            })
            .collect();
        store.commit(changes).await.unwrap();

        let recent = store.recent_audit(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].description, "entry 2");
    }
}
