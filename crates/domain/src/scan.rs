use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One advertisement heard during discovery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sighting {
    /// Address the radio stack uses to reach the device
    pub original_address: String,
    /// Hardware address decoded from the advertisement, when available
    pub hardware_address: Option<String>,
    pub name: Option<String>,
    /// RSSI in dBm
    pub signal_strength: i16,
    pub device_type: String,
}

/// A deduplicated device found by one scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    pub name: String,
    pub original_address: String,
    pub display_address: String,
    pub signal_strength: i16,
    pub device_type: String,
    pub is_connected: bool,
    pub is_registered: bool,
}

/// Result of one discovery window. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub devices: Vec<DiscoveredDevice>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// The window closed before the radio finished reporting
    pub timed_out: bool,
}
