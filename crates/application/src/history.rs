use std::sync::Arc;

use domain::deploy::{DeployStatistics, HistoryPage, HistoryQuery};
use domain::{AttemptId, DeployAttempt, DeviceId, DomainError, NameplateStore};

/// Read side of the deploy history
pub struct DeploymentHistory {
    store: Arc<dyn NameplateStore>,
    max_page_size: u32,
}

impl DeploymentHistory {
    pub fn new(store: Arc<dyn NameplateStore>, max_page_size: u32) -> Self {
        Self {
            store,
            max_page_size,
        }
    }

    /// Filtered page, newest first. The total count matches the filter
    /// regardless of paging.
    pub async fn query(&self, query: &HistoryQuery) -> Result<HistoryPage, DomainError> {
        query.validate(self.max_page_size)?;
        self.store.query_history(query).await
    }

    pub async fn attempt(&self, id: &AttemptId) -> Result<DeployAttempt, DomainError> {
        self.store
            .find_attempt(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Deploy attempt", id))
    }

    pub async fn statistics(
        &self,
        device_id: Option<DeviceId>,
    ) -> Result<DeployStatistics, DomainError> {
        self.store.history_statistics(device_id).await
    }
}
