use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::DeploySide;
use crate::error::{DomainError, Result};
use crate::ids::{AttemptId, CardId, DeviceId};

/// Lifecycle of a deploy attempt.
///
/// `Pending` is the only non-terminal state. A `Failed` attempt may be
/// retried, which re-enters transmission under the same id and ends in a
/// terminal state again; nothing returns to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeployStatus {
    Pending,
    Success,
    Failed,
    Cancelled,
}

impl DeployStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Success => "Success",
            Self::Failed => "Failed",
            Self::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for DeployStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeployStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Success" => Ok(Self::Success),
            "Failed" => Ok(Self::Failed),
            "Cancelled" => Ok(Self::Cancelled),
            other => Err(DomainError::Validation(format!(
                "Unknown deploy status: {other}"
            ))),
        }
    }
}

/// One request to push a card to one device, including its retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployAttempt {
    pub id: AttemptId,
    pub device_id: DeviceId,
    pub card_id: CardId,
    pub side: DeploySide,
    pub status: DeployStatus,
    pub created_at: DateTime<Utc>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub deployed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub retry_count: u32,
    pub is_scheduled: bool,
    pub deployed_by: String,
}

impl DeployAttempt {
    pub fn new(
        device_id: DeviceId,
        card_id: CardId,
        side: DeploySide,
        scheduled_at: Option<DateTime<Utc>>,
        deployed_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AttemptId::new(),
            device_id,
            card_id,
            side,
            status: DeployStatus::Pending,
            created_at: now,
            scheduled_at,
            deployed_at: None,
            completed_at: None,
            error_message: None,
            retry_count: 0,
            is_scheduled: scheduled_at.is_some(),
            deployed_by: deployed_by.into(),
        }
    }

    /// Whether transmission must wait for the scheduler.
    pub fn is_deferred(&self, now: DateTime<Utc>) -> bool {
        self.status == DeployStatus::Pending && self.scheduled_at.is_some_and(|at| at > now)
    }

    /// Prepares the attempt for a transmission.
    ///
    /// A pending attempt is transmitted for the first time; a failed attempt is
    /// retried and its `retry_count` grows by one.
    pub fn begin_transmission(&mut self, actor: &str, now: DateTime<Utc>) -> Result<()> {
        match self.status {
            DeployStatus::Pending => {}
            DeployStatus::Failed => {
                self.retry_count = self.retry_count.saturating_add(1);
            }
            DeployStatus::Success | DeployStatus::Cancelled => {
                return Err(DomainError::Validation(format!(
                    "Deploy attempt {} is {} and cannot be transmitted again",
                    self.id, self.status
                )));
            }
        }
        self.deployed_at = Some(now);
        self.completed_at = None;
        self.deployed_by = actor.to_string();
        Ok(())
    }

    pub fn succeed(&mut self, now: DateTime<Utc>) {
        self.status = DeployStatus::Success;
        self.error_message = None;
        self.completed_at = Some(now);
    }

    pub fn fail(&mut self, message: impl Into<String>, now: DateTime<Utc>) {
        self.status = DeployStatus::Failed;
        self.error_message = Some(message.into());
        self.completed_at = Some(now);
    }

    /// Cancels a scheduled attempt before its time comes.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<()> {
        if !self.is_deferred(now) {
            return Err(DomainError::Validation(format!(
                "Only pending attempts scheduled in the future can be cancelled (attempt {} is {})",
                self.id, self.status
            )));
        }
        self.status = DeployStatus::Cancelled;
        self.completed_at = Some(now);
        Ok(())
    }

    pub fn is_success(&self) -> bool {
        self.status == DeployStatus::Success
    }
}
