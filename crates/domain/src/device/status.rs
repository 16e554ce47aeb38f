use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::DomainError;

/// Connectivity status of a nameplate display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceStatus {
    /// No session open
    Disconnected,
    /// Link is being opened
    Connecting,
    /// Session open and idle
    Connected,
    /// Session open and a transmission is in flight
    Syncing,
    /// Last transport operation failed; needs a fresh connect or disconnect
    Error,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Syncing => "Syncing",
            Self::Error => "Error",
        }
    }

    /// Check if state allows a connection attempt
    pub fn can_connect(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Error)
    }

    /// Check if a session is currently open
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected | Self::Syncing)
    }

    /// Transition to connecting state
    pub fn to_connecting(&self) -> Result<Self, &'static str> {
        match self {
            Self::Disconnected | Self::Error => Ok(Self::Connecting),
            _ => Err("Can only connect from Disconnected or Error state"),
        }
    }

    /// Transition to connected state (link acknowledged or transmission done)
    pub fn to_connected(&self) -> Result<Self, &'static str> {
        match self {
            Self::Connecting | Self::Syncing | Self::Connected => Ok(Self::Connected),
            _ => Err("Can only complete connection from Connecting or Syncing state"),
        }
    }

    /// Transition to syncing state
    pub fn to_syncing(&self) -> Result<Self, &'static str> {
        match self {
            Self::Connected => Ok(Self::Syncing),
            _ => Err("Can only start a transmission from Connected state"),
        }
    }

    /// Transition to disconnected state
    pub fn to_disconnected(&self) -> Self {
        Self::Disconnected
    }

    /// Transition to error state
    pub fn to_error(&self) -> Self {
        Self::Error
    }
}

impl Default for DeviceStatus {
    fn default() -> Self {
        Self::Disconnected
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Disconnected" => Ok(Self::Disconnected),
            "Connecting" => Ok(Self::Connecting),
            "Connected" => Ok(Self::Connected),
            "Syncing" => Ok(Self::Syncing),
            "Error" => Ok(Self::Error),
            other => Err(DomainError::Validation(format!(
                "Unknown device status: {other}"
            ))),
        }
    }
}
