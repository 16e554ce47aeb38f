use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OwnedMutexGuard;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use domain::card::CardContent;
use domain::radio::RadioAdapter;
use domain::{DeviceStatus, DomainError, Face};

use super::manager::Session;

/// Exclusive hold on the session of one address.
///
/// Dropping the lease releases the slot; the session itself stays open.
pub struct SessionLease {
    session: OwnedMutexGuard<Session>,
    address: String,
    radio: Arc<dyn RadioAdapter>,
    connect_timeout: Duration,
    transmit_timeout: Duration,
}

impl SessionLease {
    pub(crate) fn new(
        session: OwnedMutexGuard<Session>,
        address: String,
        radio: Arc<dyn RadioAdapter>,
        connect_timeout: Duration,
        transmit_timeout: Duration,
    ) -> Self {
        Self {
            session,
            address,
            radio,
            connect_timeout,
            transmit_timeout,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Current status, after checking that a connected link is still alive
    pub fn status(&mut self) -> DeviceStatus {
        Self::reconcile(&mut self.session, &self.address)
    }

    pub(crate) fn reconcile(session: &mut Session, address: &str) -> DeviceStatus {
        if session.status.is_connected() {
            let alive = session.link.as_ref().is_some_and(|link| link.is_alive());
            if !alive {
                warn!(address = %address, "Link lost");
                session.link = None;
                session.status = session.status.to_error();
            }
        }
        session.status
    }

    /// Opens a link unless a live one exists. Returns whether one existed.
    pub async fn connect(&mut self) -> Result<bool, DomainError> {
        let status = self.status();
        if status.is_connected() {
            debug!(address = %self.address, "Already connected");
            return Ok(true);
        }

        self.session.status = status
            .to_connecting()
            .map_err(|e| DomainError::Conflict(format!("{}: {e}", self.address)))?;

        match timeout(self.connect_timeout, self.radio.open_link(&self.address)).await {
            Ok(Ok(link)) => {
                self.session.link = Some(link);
                self.session.status = DeviceStatus::Connected;
                info!(address = %self.address, "🔗 Connected");
                Ok(false)
            }
            Ok(Err(e)) => {
                self.session.status = DeviceStatus::Disconnected;
                warn!(address = %self.address, error = %e, "Connection failed");
                Err(DomainError::DeviceConnectionFailed(format!(
                    "{}: {}",
                    self.address,
                    reason(&e)
                )))
            }
            Err(_) => {
                self.session.status = DeviceStatus::Disconnected;
                warn!(address = %self.address, timeout = ?self.connect_timeout, "Connection timed out");
                Err(DomainError::DeviceConnectionFailed(format!(
                    "{}: no response within {} ms",
                    self.address,
                    self.connect_timeout.as_millis()
                )))
            }
        }
    }

    /// Closes the link if one is open. Returns whether one was open.
    ///
    /// The session ends up `Disconnected` even when the radio reports an error
    /// while closing.
    pub async fn disconnect(&mut self) -> Result<bool, DomainError> {
        let was_connected = self.session.status.is_connected();
        let link = self.session.link.take();
        self.session.status = self.session.status.to_disconnected();

        if let Some(mut link) = link {
            match timeout(self.connect_timeout, link.close()).await {
                Ok(Ok(())) => info!(address = %self.address, "🔌 Disconnected"),
                Ok(Err(e)) => {
                    warn!(address = %self.address, error = %e, "Close reported an error")
                }
                Err(_) => warn!(address = %self.address, "Close timed out"),
            }
        }
        Ok(was_connected)
    }

    /// Sends one face over the open link.
    ///
    /// Any failure drops the link and leaves the session in `Error`.
    pub async fn transmit(&mut self, face: Face, content: &CardContent) -> Result<(), DomainError> {
        let syncing = self
            .status()
            .to_syncing()
            .map_err(|e| DomainError::Transport(format!("{}: {e}", self.address)))?;
        self.session.status = syncing;

        let session = &mut *self.session;
        let Some(link) = session.link.as_mut() else {
            session.status = DeviceStatus::Error;
            return Err(DomainError::Transport(format!(
                "{}: no open link",
                self.address
            )));
        };

        let result = match timeout(self.transmit_timeout, link.transmit(face, content)).await {
            Ok(result) => result,
            Err(_) => Err(DomainError::Timeout(format!(
                "side {face} not acknowledged within {} ms",
                self.transmit_timeout.as_millis()
            ))),
        };

        match result {
            Ok(()) => {
                self.session.status = DeviceStatus::Connected;
                debug!(address = %self.address, face = %face, bytes = content.bytes.len(), "Face transmitted");
                Ok(())
            }
            Err(e) => {
                warn!(address = %self.address, face = %face, error = %e, "Transmission failed");
                self.session.link = None;
                self.session.status = DeviceStatus::Error;
                Err(e)
            }
        }
    }
}

fn reason(error: &DomainError) -> String {
    match error {
        DomainError::DeviceConnectionFailed(msg)
        | DomainError::Transport(msg)
        | DomainError::Timeout(msg) => msg.clone(),
        other => other.to_string(),
    }
}
