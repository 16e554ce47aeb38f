use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DeployAttempt, DeployStatus};
use crate::error::{DomainError, Result};
use crate::ids::{CardId, DeviceId};

/// Inclusive creation-time window
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| at >= from) && self.to.is_none_or(|to| at <= to)
    }
}

/// Filter and page of a history query. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub device_id: Option<DeviceId>,
    pub card_id: Option<CardId>,
    pub status: Option<DeployStatus>,
    pub date_range: Option<DateRange>,
    pub page: u32,
    pub page_size: u32,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            device_id: None,
            card_id: None,
            status: None,
            date_range: None,
            page: 1,
            page_size: 20,
        }
    }
}

impl HistoryQuery {
    pub fn for_device(device_id: DeviceId) -> Self {
        Self {
            device_id: Some(device_id),
            ..Default::default()
        }
    }

    pub fn validate(&self, max_page_size: u32) -> Result<()> {
        if self.page == 0 {
            return Err(DomainError::Validation("Page starts at 1".to_string()));
        }
        if self.page_size == 0 || self.page_size > max_page_size {
            return Err(DomainError::Validation(format!(
                "Page size must be between 1 and {max_page_size}, got {}",
                self.page_size
            )));
        }
        if let Some(DateRange {
            from: Some(from),
            to: Some(to),
        }) = self.date_range
        {
            if from > to {
                return Err(DomainError::Validation(
                    "Date range starts after it ends".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    pub fn matches(&self, attempt: &DeployAttempt) -> bool {
        self.device_id.is_none_or(|id| attempt.device_id == id)
            && self.card_id.as_ref().is_none_or(|id| &attempt.card_id == id)
            && self.status.is_none_or(|s| attempt.status == s)
            && self
                .date_range
                .is_none_or(|range| range.contains(attempt.created_at))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPage {
    pub items: Vec<DeployAttempt>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
}

/// Newest first; ties broken by id so pages never overlap.
pub fn history_order(a: &DeployAttempt, b: &DeployAttempt) -> std::cmp::Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// Aggregate outcome counts over a set of attempts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeployStatistics {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub pending: u64,
    pub cancelled: u64,
    /// Percentage of resolved transmissions that succeeded
    pub success_rate: f64,
}

impl DeployStatistics {
    pub fn from_counts(succeeded: u64, failed: u64, pending: u64, cancelled: u64) -> Self {
        let transmitted = succeeded + failed;
        let success_rate = if transmitted == 0 {
            0.0
        } else {
            (succeeded as f64 / transmitted as f64 * 10000.0).round() / 100.0
        };
        Self {
            total: succeeded + failed + pending + cancelled,
            succeeded,
            failed,
            pending,
            cancelled,
            success_rate,
        }
    }

    pub fn from_attempts<'a>(attempts: impl IntoIterator<Item = &'a DeployAttempt>) -> Self {
        let (mut succeeded, mut failed, mut pending, mut cancelled) = (0, 0, 0, 0);
        for attempt in attempts {
            match attempt.status {
                DeployStatus::Success => succeeded += 1,
                DeployStatus::Failed => failed += 1,
                DeployStatus::Pending => pending += 1,
                DeployStatus::Cancelled => cancelled += 1,
            }
        }
        Self::from_counts(succeeded, failed, pending, cancelled)
    }
}
