use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

use domain::device::normalize_address;
use domain::radio::RadioAdapter;
use domain::{Device, DiscoveredDevice, DomainError, ScanResult, Sighting};

use crate::connection::ConnectionManager;

/// Runs bounded discovery windows and turns raw sightings into a
/// deduplicated, strongest-first device list.
pub struct DeviceScanner {
    radio: Arc<dyn RadioAdapter>,
    connections: Arc<ConnectionManager>,
    window: Duration,
    // One discovery pass at a time per adapter
    scan_lock: Mutex<()>,
}

impl DeviceScanner {
    pub fn new(
        radio: Arc<dyn RadioAdapter>,
        connections: Arc<ConnectionManager>,
        window: Duration,
    ) -> Self {
        Self {
            radio,
            connections,
            window,
            scan_lock: Mutex::new(()),
        }
    }

    pub async fn is_available(&self) -> bool {
        self.radio.is_available().await
    }

    /// Scans for one window. `known` marks which results are registered.
    pub async fn scan(&self, known: &[Device]) -> Result<ScanResult, DomainError> {
        if !self.radio.is_available().await {
            return Err(DomainError::AdapterNotFound);
        }

        let _pass = self.scan_lock.lock().await;
        let started_at = Utc::now();
        let deadline = Instant::now() + self.window;
        info!(window_ms = self.window.as_millis() as u64, "📡 Scan started");

        let mut stream = match timeout_at(deadline, self.radio.start_discovery()).await {
            Ok(stream) => stream?,
            Err(_) => {
                return Err(DomainError::Timeout(
                    "radio did not start discovery within the scan window".to_string(),
                ));
            }
        };

        let mut strongest: HashMap<String, Sighting> = HashMap::new();
        let mut timed_out = false;
        loop {
            match timeout_at(deadline, stream.next_sighting()).await {
                Ok(Some(sighting)) => merge(&mut strongest, sighting),
                Ok(None) => break,
                Err(_) => {
                    timed_out = true;
                    break;
                }
            }
        }
        drop(stream);

        let mut devices = Vec::with_capacity(strongest.len());
        for (display_address, sighting) in strongest {
            let is_connected = self
                .connections
                .status(&sighting.original_address)
                .await
                .is_connected();
            let is_registered = known.iter().any(|d| {
                d.display_address == display_address || d.answers_to(&sighting.original_address)
            });
            devices.push(DiscoveredDevice {
                name: sighting
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("Unknown ({display_address})")),
                original_address: sighting.original_address,
                display_address,
                signal_strength: sighting.signal_strength,
                device_type: sighting.device_type,
                is_connected,
                is_registered,
            });
        }
        devices.sort_by(|a, b| {
            b.signal_strength
                .cmp(&a.signal_strength)
                .then_with(|| a.display_address.cmp(&b.display_address))
        });

        let ended_at = Utc::now();
        let duration_ms = (ended_at - started_at).num_milliseconds().max(0) as u64;
        info!(found = devices.len(), duration_ms, timed_out, "Scan finished");

        Ok(ScanResult {
            devices,
            started_at,
            ended_at,
            duration_ms,
            timed_out,
        })
    }
}

/// Keeps the strongest sighting per normalized address. Sightings whose
/// address cannot be normalized are dropped.
fn merge(strongest: &mut HashMap<String, Sighting>, sighting: Sighting) {
    let raw = sighting
        .hardware_address
        .as_deref()
        .unwrap_or(&sighting.original_address);
    let display_address = match normalize_address(raw) {
        Ok(display_address) => display_address,
        Err(e) => {
            warn!(address = %raw, error = %e, "Dropping sighting with malformed address");
            return;
        }
    };

    match strongest.get_mut(&display_address) {
        Some(best) if sighting.signal_strength > best.signal_strength => {
            let name = sighting.name.clone().or_else(|| best.name.take());
            *best = Sighting { name, ..sighting };
        }
        Some(best) => {
            if best.name.is_none() {
                best.name = sighting.name;
            }
        }
        None => {
            debug!(address = %display_address, rssi = sighting.signal_strength, "New sighting");
            strongest.insert(display_address, sighting);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use domain::radio::{DisplayLink, MockDisplayLink, MockRadioAdapter, SightingStream};
    use std::collections::VecDeque;

    struct ScriptedStream {
        sightings: VecDeque<Sighting>,
        stall_at_end: bool,
    }

    #[async_trait]
    impl SightingStream for ScriptedStream {
        async fn next_sighting(&mut self) -> Option<Sighting> {
            match self.sightings.pop_front() {
                Some(s) => Some(s),
                None if self.stall_at_end => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    None
                }
                None => None,
            }
        }
    }

    fn sighting(original: &str, hardware: Option<&str>, name: Option<&str>, rssi: i16) -> Sighting {
        Sighting {
            original_address: original.to_string(),
            hardware_address: hardware.map(str::to_string),
            name: name.map(str::to_string),
            signal_strength: rssi,
            device_type: "Nameplate".to_string(),
        }
    }

    fn radio_with(sightings: Vec<Sighting>, stall_at_end: bool) -> MockRadioAdapter {
        let mut radio = MockRadioAdapter::new();
        radio.expect_is_available().return_const(true);
        radio.expect_start_discovery().returning(move || {
            Ok(Box::new(ScriptedStream {
                sightings: sightings.clone().into(),
                stall_at_end,
            }) as Box<dyn SightingStream>)
        });
        radio.expect_open_link().returning(|_| {
            let mut link = MockDisplayLink::new();
            link.expect_is_alive().return_const(true);
            Ok(Box::new(link) as Box<dyn DisplayLink>)
        });
        radio
    }

    fn scanner(radio: MockRadioAdapter) -> (DeviceScanner, Arc<ConnectionManager>) {
        let radio: Arc<dyn RadioAdapter> = Arc::new(radio);
        let connections = Arc::new(ConnectionManager::new(
            radio.clone(),
            Duration::from_secs(1),
            Duration::from_secs(1),
        ));
        (
            DeviceScanner::new(radio, connections.clone(), Duration::from_secs(2)),
            connections,
        )
    }

    #[tokio::test]
    async fn test_deduplicates_and_keeps_strongest() {
        let (scanner, _) = scanner(radio_with(
            vec![
                sighting("aa-bb-cc-dd-ee-01", None, None, -80),
                sighting("AA:BB:CC:DD:EE:01", None, Some("Desk 1"), -50),
                sighting("AA:BB:CC:DD:EE:02", None, Some("Desk 2"), -60),
                sighting("aa:bb:cc:dd:ee:01", None, None, -70),
            ],
            false,
        ));

        let result = scanner.scan(&[]).await.unwrap();
        assert_eq!(result.devices.len(), 2);
        assert_eq!(result.devices[0].display_address, "AA:BB:CC:DD:EE:01");
        assert_eq!(result.devices[0].signal_strength, -50);
        assert_eq!(result.devices[0].name, "Desk 1");
        assert_eq!(result.devices[1].display_address, "AA:BB:CC:DD:EE:02");
        assert!(!result.timed_out);
    }

    #[tokio::test]
    async fn test_hardware_address_becomes_display_address() {
        let (scanner, _) = scanner(radio_with(
            vec![sighting("1A2B3C4D", Some("aa:bb:cc:dd:ee:03"), Some("Lobby"), -40)],
            false,
        ));

        let result = scanner.scan(&[]).await.unwrap();
        assert_eq!(result.devices[0].original_address, "1A2B3C4D");
        assert_eq!(result.devices[0].display_address, "AA:BB:CC:DD:EE:03");
    }

    #[tokio::test]
    async fn test_malformed_addresses_are_dropped() {
        let (scanner, _) = scanner(radio_with(
            vec![
                sighting("not an address!", None, Some("Noise"), -30),
                sighting("AA:BB:CC:DD:EE:04", None, Some("Desk 4"), -65),
            ],
            false,
        ));

        let result = scanner.scan(&[]).await.unwrap();
        assert_eq!(result.devices.len(), 1);
        assert_eq!(result.devices[0].name, "Desk 4");
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_bounds_a_stalled_stream() {
        let (scanner, _) = scanner(radio_with(
            vec![sighting("AA:BB:CC:DD:EE:05", None, None, -55)],
            true,
        ));

        let result = scanner.scan(&[]).await.unwrap();
        assert!(result.timed_out);
        assert_eq!(result.devices.len(), 1);
        assert_eq!(result.devices[0].name, "Unknown (AA:BB:CC:DD:EE:05)");
    }

    #[tokio::test]
    async fn test_flags_connected_and_registered() {
        let (scanner, connections) = scanner(radio_with(
            vec![
                sighting("AA:BB:CC:DD:EE:06", None, None, -50),
                sighting("AA:BB:CC:DD:EE:07", None, None, -60),
            ],
            false,
        ));
        connections.connect("AA:BB:CC:DD:EE:06").await.unwrap();
        let known =
            vec![Device::register(Some("Desk 7"), "AA:BB:CC:DD:EE:07", None, Utc::now()).unwrap()];

        let result = scanner.scan(&known).await.unwrap();
        assert!(result.devices[0].is_connected);
        assert!(!result.devices[0].is_registered);
        assert!(!result.devices[1].is_connected);
        assert!(result.devices[1].is_registered);
    }

    #[tokio::test]
    async fn test_missing_adapter_is_reported() {
        let mut radio = MockRadioAdapter::new();
        radio.expect_is_available().return_const(false);
        radio.expect_start_discovery().never();
        let (scanner, _) = scanner(radio);

        let err = scanner.scan(&[]).await.unwrap_err();
        assert_eq!(err, DomainError::AdapterNotFound);
    }
}
