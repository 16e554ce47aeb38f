use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use domain::{Device, DeviceId, DeviceStatus};

/// Connect to a display, registering it on first contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectRequest {
    /// Original address as reported by the scanner
    pub address: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Hardware address, when it differs from the original one
    #[serde(default)]
    pub display_address: Option<String>,
}

impl ConnectRequest {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
            display_address: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectOutcome {
    pub device: Device,
    /// The device was unknown and has just been registered
    pub registered: bool,
    pub already_connected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisconnectOutcome {
    pub address: String,
    pub was_connected: bool,
    pub device: Option<Device>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub address: String,
    pub status: DeviceStatus,
    pub is_connected: bool,
    pub device_id: Option<DeviceId>,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadioStatus {
    pub available: bool,
    pub connected_devices: usize,
}
