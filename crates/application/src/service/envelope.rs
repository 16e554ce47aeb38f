use serde::ser::{Serialize, SerializeStruct, Serializer};
use tracing::error;

use domain::deploy::{DeployStatistics, HistoryPage};
use domain::{AuditEntry, DeployAttempt, Device, DeviceId, DomainError, ScanResult};

use super::types::{ConnectOutcome, DisconnectOutcome, RadioStatus, StatusReport};
use crate::deploy::{BatchOutcome, DeployOutcome};

/// Message shown for failures whose details must stay in the logs
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred, please try again later";

/// Declares a per-operation response.
///
/// `Success` carries the operation's payload, `Rejected` a business or
/// transport message the caller may see, `Fatal` a generic message after the
/// real error has been logged. All serialize as `{status, message, data}`.
macro_rules! operation_response {
    ($(#[$meta:meta])* $name:ident, $data:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub enum $name {
            Success { message: String, data: $data },
            Rejected { message: String },
            Fatal { message: String },
        }

        impl $name {
            pub fn from_result(
                operation: &str,
                result: Result<$data, DomainError>,
                message: impl FnOnce(&$data) -> String,
            ) -> Self {
                match result {
                    Ok(data) => Self::Success {
                        message: message(&data),
                        data,
                    },
                    Err(e) if e.is_user_facing() => Self::Rejected {
                        message: e.to_string(),
                    },
                    Err(e) => {
                        error!(operation, error = %e, "Unexpected error");
                        Self::Fatal {
                            message: UNEXPECTED_ERROR_MESSAGE.to_string(),
                        }
                    }
                }
            }

            pub fn is_success(&self) -> bool {
                matches!(self, Self::Success { .. })
            }

            pub fn status(&self) -> &'static str {
                if self.is_success() { "success" } else { "error" }
            }

            pub fn message(&self) -> &str {
                match self {
                    Self::Success { message, .. }
                    | Self::Rejected { message }
                    | Self::Fatal { message } => message,
                }
            }

            pub fn data(&self) -> Option<&$data> {
                match self {
                    Self::Success { data, .. } => Some(data),
                    _ => None,
                }
            }

            pub fn into_data(self) -> Option<$data> {
                match self {
                    Self::Success { data, .. } => Some(data),
                    _ => None,
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut envelope = serializer.serialize_struct(stringify!($name), 3)?;
                envelope.serialize_field("status", self.status())?;
                envelope.serialize_field("message", self.message())?;
                envelope.serialize_field("data", &self.data())?;
                envelope.end()
            }
        }
    };
}

operation_response!(ScanResponse, ScanResult);
operation_response!(RadioStatusResponse, RadioStatus);
operation_response!(ConnectResponse, ConnectOutcome);
operation_response!(DisconnectResponse, DisconnectOutcome);
operation_response!(StatusResponse, StatusReport);
operation_response!(
    /// Carries the attempt even when transmission failed; check `success`
    DeployResponse,
    DeployOutcome
);
operation_response!(BatchDeployResponse, BatchOutcome);
operation_response!(AttemptResponse, DeployAttempt);
operation_response!(HistoryResponse, HistoryPage);
operation_response!(StatisticsResponse, DeployStatistics);
operation_response!(DeviceListResponse, Vec<Device>);
operation_response!(DeviceResponse, Device);
operation_response!(DeleteResponse, DeviceId);
operation_response!(AuditResponse, Vec<AuditEntry>);
