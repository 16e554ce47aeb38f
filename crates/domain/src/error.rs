use thiserror::Error;

/// Domain-level errors
///
/// Variants fall into three families that the service layer treats differently:
/// business errors (rejected before any I/O), connection errors (transport
/// level, recorded as data when they happen mid-deploy) and unexpected errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Radio adapter not found")]
    AdapterNotFound,

    #[error("Device connection failed: {0}")]
    DeviceConnectionFailed(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Errors caused by the request itself. Safe to show to the caller verbatim.
    pub fn is_business(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::NotFound { .. }
                | Self::Conflict(_)
                | Self::AdapterNotFound
        )
    }

    /// Failures of the radio link rather than of the request.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::DeviceConnectionFailed(_) | Self::Transport(_) | Self::Timeout(_)
        )
    }

    /// Whether the message may reach the caller. Everything else is reduced
    /// to a generic message after being logged.
    pub fn is_user_facing(&self) -> bool {
        self.is_business() || self.is_transport()
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
