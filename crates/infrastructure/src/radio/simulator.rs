use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info};

use domain::card::CardContent;
use domain::radio::{DisplayLink, RadioAdapter, SightingStream};
use domain::{CardId, DomainError, Face, Sighting};

/// One simulated display
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulatedDeviceConfig {
    pub original_address: String,
    #[serde(default)]
    pub hardware_address: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_signal_strength")]
    pub signal_strength: i16,
    /// Unreachable displays are not advertised and refuse connections
    #[serde(default = "default_true")]
    pub reachable: bool,
    /// Faces the display rejects on transmission
    #[serde(default)]
    pub failing_faces: Vec<Face>,
}

fn default_signal_strength() -> i16 {
    -60
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulatorConfig {
    #[serde(default = "default_true")]
    pub available: bool,
    /// Delay between two advertisements
    #[serde(default = "default_advertise_interval_ms")]
    pub advertise_interval_ms: u64,
    /// Delay of every connect and transmit
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default)]
    pub devices: Vec<SimulatedDeviceConfig>,
}

fn default_advertise_interval_ms() -> u64 {
    50
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            available: true,
            advertise_interval_ms: default_advertise_interval_ms(),
            latency_ms: 0,
            devices: Vec::new(),
        }
    }
}

/// A face received by a simulated display
#[derive(Debug, Clone, PartialEq)]
pub struct Transmission {
    pub face: Face,
    pub card_id: CardId,
    pub bytes: usize,
}

#[derive(Debug, Clone)]
struct DisplayState {
    config: SimulatedDeviceConfig,
    received: Vec<Transmission>,
}

/// In-process stand-in for the wireless adapter.
///
/// Displays are keyed by their upper-cased original address. Reachability and
/// failing faces can be changed at runtime to drive failure paths.
#[derive(Clone)]
pub struct SimulatedRadio {
    available: Arc<AtomicBool>,
    displays: Arc<DashMap<String, DisplayState>>,
    advertise_interval: Duration,
    latency: Duration,
}

impl SimulatedRadio {
    pub fn new(config: SimulatorConfig) -> Self {
        let displays = DashMap::new();
        for device in config.devices {
            displays.insert(
                key(&device.original_address),
                DisplayState {
                    config: device,
                    received: Vec::new(),
                },
            );
        }
        info!(displays = displays.len(), "📻 Simulated radio ready");
        Self {
            available: Arc::new(AtomicBool::new(config.available)),
            displays: Arc::new(displays),
            advertise_interval: Duration::from_millis(config.advertise_interval_ms),
            latency: Duration::from_millis(config.latency_ms),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn add_display(&self, config: SimulatedDeviceConfig) {
        self.displays.insert(
            key(&config.original_address),
            DisplayState {
                config,
                received: Vec::new(),
            },
        );
    }

    pub fn set_reachable(&self, original_address: &str, reachable: bool) {
        if let Some(mut display) = self.displays.get_mut(&key(original_address)) {
            display.config.reachable = reachable;
        }
    }

    pub fn set_failing_faces(&self, original_address: &str, faces: Vec<Face>) {
        if let Some(mut display) = self.displays.get_mut(&key(original_address)) {
            display.config.failing_faces = faces;
        }
    }

    /// Faces a display has accepted, oldest first
    pub fn received(&self, original_address: &str) -> Vec<Transmission> {
        self.displays
            .get(&key(original_address))
            .map(|d| d.received.clone())
            .unwrap_or_default()
    }
}

fn key(address: &str) -> String {
    address.trim().to_ascii_uppercase()
}

#[async_trait]
impl RadioAdapter for SimulatedRadio {
    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn start_discovery(&self) -> Result<Box<dyn SightingStream>, DomainError> {
        if !self.is_available().await {
            return Err(DomainError::AdapterNotFound);
        }

        let mut queue = VecDeque::new();
        for display in self.displays.iter() {
            let config = &display.config;
            if !config.reachable {
                continue;
            }
            let sighting = Sighting {
                original_address: config.original_address.clone(),
                hardware_address: config.hardware_address.clone(),
                name: config.name.clone(),
                signal_strength: config.signal_strength,
                device_type: "Nameplate".to_string(),
            };
            // A weaker echo first, as real radios report the same device repeatedly
            queue.push_back(Sighting {
                signal_strength: sighting.signal_strength.saturating_sub(15),
                name: None,
                ..sighting.clone()
            });
            queue.push_back(sighting);
        }
        debug!(advertisements = queue.len(), "Discovery started");

        Ok(Box::new(SimulatedSightings {
            queue,
            interval: self.advertise_interval,
        }))
    }

    async fn open_link(&self, original_address: &str) -> Result<Box<dyn DisplayLink>, DomainError> {
        if !self.is_available().await {
            return Err(DomainError::AdapterNotFound);
        }
        sleep(self.latency).await;

        let reachable = self
            .displays
            .get(&key(original_address))
            .is_some_and(|d| d.config.reachable);
        if !reachable {
            return Err(DomainError::DeviceConnectionFailed(
                "display is not responding".to_string(),
            ));
        }

        Ok(Box::new(SimulatedLink {
            address: key(original_address),
            displays: self.displays.clone(),
            latency: self.latency,
            open: true,
        }))
    }
}

struct SimulatedSightings {
    queue: VecDeque<Sighting>,
    interval: Duration,
}

#[async_trait]
impl SightingStream for SimulatedSightings {
    async fn next_sighting(&mut self) -> Option<Sighting> {
        let sighting = self.queue.pop_front()?;
        sleep(self.interval).await;
        Some(sighting)
    }
}

struct SimulatedLink {
    address: String,
    displays: Arc<DashMap<String, DisplayState>>,
    latency: Duration,
    open: bool,
}

#[async_trait]
impl DisplayLink for SimulatedLink {
    async fn transmit(&mut self, face: Face, content: &CardContent) -> Result<(), DomainError> {
        sleep(self.latency).await;

        let mut display = self.displays.get_mut(&self.address).ok_or_else(|| {
            DomainError::Transport(format!("{} vanished", self.address))
        })?;
        if !display.config.reachable {
            self.open = false;
            return Err(DomainError::Transport(format!(
                "{} went out of range",
                self.address
            )));
        }
        if display.config.failing_faces.contains(&face) {
            return Err(DomainError::Transport(format!(
                "display rejected side {face}"
            )));
        }

        display.received.push(Transmission {
            face,
            card_id: content.card_id.clone(),
            bytes: content.bytes.len(),
        });
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DomainError> {
        self.open = false;
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.open
            && self
                .displays
                .get(&self.address)
                .is_some_and(|d| d.config.reachable)
    }
}
