use async_trait::async_trait;

use crate::card::CardContent;
use crate::deploy::Face;
use crate::error::DomainError;
use crate::scan::Sighting;

/// The wireless adapter. Byte-level framing lives behind this trait.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait RadioAdapter: Send + Sync {
    /// Whether the adapter is present and powered
    async fn is_available(&self) -> bool;

    /// Starts a discovery pass. The stream ends when the radio stops
    /// reporting; callers bound it with their own window.
    async fn start_discovery(&self) -> Result<Box<dyn SightingStream>, DomainError>;

    /// Opens a session to a display by its original address
    async fn open_link(&self, original_address: &str)
    -> Result<Box<dyn DisplayLink>, DomainError>;
}

/// Sightings of one discovery pass
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait SightingStream: Send {
    /// Next sighting, or `None` once discovery has finished
    async fn next_sighting(&mut self) -> Option<Sighting>;
}

/// An open session to one display
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait DisplayLink: Send + Sync {
    /// Sends one face and waits for the display's acknowledgement
    async fn transmit(&mut self, face: Face, content: &CardContent) -> Result<(), DomainError>;

    async fn close(&mut self) -> Result<(), DomainError>;

    /// Whether the session is still usable
    fn is_alive(&self) -> bool;
}
