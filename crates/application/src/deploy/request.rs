use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use domain::{AttemptId, CardId, DeployAttempt, DeploySide, DeviceId, DeviceStatus, DomainError};

/// Push `card_id` to one device.
///
/// With `attempt_id` set the request re-drives an existing attempt: a failed
/// attempt is retried, a pending one is promoted and transmitted now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployRequest {
    pub device_id: DeviceId,
    pub card_id: CardId,
    #[serde(default)]
    pub side: DeploySide,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attempt_id: Option<AttemptId>,
}

impl DeployRequest {
    pub fn new(device_id: DeviceId, card_id: CardId, side: DeploySide) -> Self {
        Self {
            device_id,
            card_id,
            side,
            scheduled_at: None,
            attempt_id: None,
        }
    }

    /// Re-drives a stored attempt with its own device, card and side
    pub fn resume(attempt: &DeployAttempt) -> Self {
        Self {
            device_id: attempt.device_id,
            card_id: attempt.card_id.clone(),
            side: attempt.side,
            scheduled_at: attempt.scheduled_at,
            attempt_id: Some(attempt.id),
        }
    }
}

/// Result of a deploy that got past validation.
///
/// `success` is false when the transport failed; the attempt then carries
/// the error message. A deferred attempt reports `scheduled` and stays
/// `Pending`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployOutcome {
    pub success: bool,
    pub scheduled: bool,
    pub attempt: DeployAttempt,
    pub device_status: DeviceStatus,
}

/// Same card to many devices, one independent attempt per device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchDeployRequest {
    pub device_ids: Vec<DeviceId>,
    pub card_id: CardId,
    #[serde(default)]
    pub side: DeploySide,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl BatchDeployRequest {
    /// Distinct device ids in request order
    pub fn targets(&self) -> Result<Vec<DeviceId>, DomainError> {
        if self.device_ids.is_empty() {
            return Err(DomainError::Validation(
                "Batch deploy needs at least one device".to_string(),
            ));
        }
        let mut targets = Vec::with_capacity(self.device_ids.len());
        for id in &self.device_ids {
            if !targets.contains(id) {
                targets.push(*id);
            }
        }
        Ok(targets)
    }

    pub fn request_for(&self, device_id: DeviceId) -> DeployRequest {
        DeployRequest {
            device_id,
            card_id: self.card_id.clone(),
            side: self.side,
            scheduled_at: self.scheduled_at,
            attempt_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub device_id: DeviceId,
    pub success: bool,
    pub message: String,
    pub attempt: Option<DeployAttempt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub total_devices: usize,
    pub successful: usize,
    pub failed: usize,
    pub items: Vec<BatchItem>,
}

impl BatchOutcome {
    pub fn from_items(items: Vec<BatchItem>) -> Self {
        let successful = items.iter().filter(|i| i.success).count();
        Self {
            total_devices: items.len(),
            successful,
            failed: items.len() - successful,
            items,
        }
    }
}
