use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::address::{normalize_address, validate_original_address};
use super::DeviceStatus;
use crate::error::{DomainError, Result};
use crate::ids::{CardId, DeviceId, GroupId};

/// A registered nameplate display.
///
/// `original_address` is what the radio stack uses to reach the display and is
/// never rewritten. `display_address` is its normalized form, used for lookup
/// and deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub original_address: String,
    pub display_address: String,
    pub status: DeviceStatus,
    pub current_card: Option<CardId>,
    pub group: Option<GroupId>,
    pub last_connected: Option<DateTime<Utc>>,
    pub custom_index: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of a device record. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceUpdate {
    pub name: Option<String>,
    pub group: Option<GroupId>,
    pub custom_index: Option<i32>,
}

impl DeviceUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.group.is_none() && self.custom_index.is_none()
    }
}

impl Device {
    /// Registers a display after its first successful connection.
    ///
    /// `display_address` defaults to the normalized original address when the
    /// scanner could not decode a separate hardware address.
    pub fn register(
        name: Option<&str>,
        original_address: &str,
        display_address: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let original_address = validate_original_address(original_address)?.to_string();
        let display_address =
            normalize_address(display_address.unwrap_or(original_address.as_str()))?;

        let name = match name.map(str::trim) {
            Some(n) if !n.is_empty() => validate_name(n)?,
            _ => format!("Nameplate {display_address}"),
        };

        Ok(Self {
            id: DeviceId::new(),
            name,
            original_address,
            display_address,
            status: DeviceStatus::Disconnected,
            current_card: None,
            group: None,
            last_connected: None,
            custom_index: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies a partial update, keeping omitted fields unchanged.
    pub fn apply_update(&mut self, update: &DeviceUpdate, now: DateTime<Utc>) -> Result<()> {
        let name = update
            .name
            .as_deref()
            .map(|n| validate_name(n.trim()))
            .transpose()?;
        if let Some(index) = update.custom_index {
            if index < 0 {
                return Err(DomainError::Validation(format!(
                    "Custom index must not be negative: {index}"
                )));
            }
        }

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(group) = &update.group {
            self.group = Some(group.clone());
        }
        if update.custom_index.is_some() {
            self.custom_index = update.custom_index;
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn set_status(&mut self, status: DeviceStatus, now: DateTime<Utc>) {
        if status == DeviceStatus::Connected && !self.status.is_connected() {
            self.last_connected = Some(now);
        }
        self.status = status;
        self.updated_at = now;
    }

    pub fn set_current_card(&mut self, card: CardId, now: DateTime<Utc>) {
        self.current_card = Some(card);
        self.updated_at = now;
    }

    /// Matches either the original or the display form of an address.
    pub fn answers_to(&self, address: &str) -> bool {
        if self.original_address.eq_ignore_ascii_case(address.trim()) {
            return true;
        }
        normalize_address(address)
            .map(|n| n == self.display_address)
            .unwrap_or(false)
    }
}

fn validate_name(name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(DomainError::Validation(
            "Device name cannot be empty".to_string(),
        ));
    }
    if name.chars().count() > 100 {
        return Err(DomainError::Validation(
            "Device name too long (max 100)".to_string(),
        ));
    }
    Ok(name.to_string())
}
