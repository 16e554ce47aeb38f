//! Domain layer - Pure business logic with no external dependencies
//!
//! This crate contains:
//! - Entities (Device, DeployAttempt, AuditEntry)
//! - Value Objects (DeviceStatus, DeploySide, ids, addresses)
//! - Collaborator interfaces (store, radio, card content)
//!
//! Principles:
//! - No dependencies on infrastructure
//! - Business rules enforced at domain level
//! - Testable in isolation

pub mod actor;
pub mod audit;
pub mod card;
pub mod deploy;
pub mod device;
pub mod error;
pub mod ids;
pub mod radio;
pub mod scan;
pub mod store;

// Re-export commonly used types
pub use actor::Actor;
pub use audit::{AuditEntry, AuditKind};
pub use deploy::{DeployAttempt, DeploySide, DeployStatus, Face};
pub use device::{Device, DeviceStatus, DeviceUpdate};
pub use error::DomainError;
pub use ids::{AttemptId, CardId, DeviceId, GroupId};
pub use scan::{DiscoveredDevice, ScanResult, Sighting};
pub use store::{NameplateStore, StagedChange};
