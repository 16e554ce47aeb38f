use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use domain::device::{normalize_address, validate_original_address};
use domain::radio::{DisplayLink, RadioAdapter};
use domain::{DeviceStatus, DomainError};

use super::lease::SessionLease;

/// State of the session to one display
#[derive(Default)]
pub(crate) struct Session {
    pub(crate) status: DeviceStatus,
    pub(crate) link: Option<Box<dyn DisplayLink>>,
}

/// Tracks sessions keyed by original address.
///
/// Each address owns a slot guarded by an async mutex. Connect, disconnect,
/// status checks and transmissions on one address run under that guard, so
/// they never interleave; different addresses proceed independently.
pub struct ConnectionManager {
    radio: Arc<dyn RadioAdapter>,
    sessions: DashMap<String, Arc<Mutex<Session>>>,
    connect_timeout: Duration,
    transmit_timeout: Duration,
}

impl ConnectionManager {
    pub fn new(
        radio: Arc<dyn RadioAdapter>,
        connect_timeout: Duration,
        transmit_timeout: Duration,
    ) -> Self {
        Self {
            radio,
            sessions: DashMap::new(),
            connect_timeout,
            transmit_timeout,
        }
    }

    /// Slot key: the normalized address, so every spelling of one address
    /// shares a slot
    fn key(address: &str) -> String {
        normalize_address(address).unwrap_or_else(|_| address.trim().to_ascii_uppercase())
    }

    /// Locks the session slot of `original_address`, creating it on first use.
    /// Waits while another operation holds the same slot.
    pub async fn acquire(&self, original_address: &str) -> Result<SessionLease, DomainError> {
        let address = validate_original_address(original_address)?.to_string();
        let slot = self
            .sessions
            .entry(Self::key(&address))
            .or_insert_with(|| Arc::new(Mutex::new(Session::default())))
            .clone();

        let guard = slot.lock_owned().await;
        debug!(address = %address, "Session slot acquired");
        Ok(SessionLease::new(
            guard,
            address,
            self.radio.clone(),
            self.connect_timeout,
            self.transmit_timeout,
        ))
    }

    /// Opens a session unless one is already live. Returns whether it was.
    pub async fn connect(&self, original_address: &str) -> Result<bool, DomainError> {
        self.acquire(original_address).await?.connect().await
    }

    /// Closes the session if open. Returns whether one was open.
    pub async fn disconnect(&self, original_address: &str) -> Result<bool, DomainError> {
        self.acquire(original_address).await?.disconnect().await
    }

    /// Live status of an address. Addresses never seen are `Disconnected`.
    pub async fn status(&self, original_address: &str) -> DeviceStatus {
        let slot = self
            .sessions
            .get(&Self::key(original_address))
            .map(|entry| entry.value().clone());
        match slot {
            Some(slot) => {
                let mut session = slot.lock().await;
                SessionLease::reconcile(&mut session, original_address)
            }
            None => DeviceStatus::Disconnected,
        }
    }

    /// Addresses with a live session
    pub async fn connected_addresses(&self) -> Vec<String> {
        let slots: Vec<(String, Arc<Mutex<Session>>)> = self
            .sessions
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let mut connected = Vec::new();
        for (address, slot) in slots {
            let mut session = slot.lock().await;
            if SessionLease::reconcile(&mut session, &address).is_connected() {
                connected.push(address);
            }
        }
        connected
    }
}
