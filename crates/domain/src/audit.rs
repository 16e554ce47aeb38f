use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actor::Actor;

/// Prefix applied to every audit target
pub const AUDIT_TARGET_PREFIX: &str = "SmartNameplate/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditKind {
    DataRead,
    DataCreate,
    DataUpdate,
    DataDelete,
}

impl AuditKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataRead => "DATA_READ",
            Self::DataCreate => "DATA_CREATE",
            Self::DataUpdate => "DATA_UPDATE",
            Self::DataDelete => "DATA_DELETE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DATA_READ" => Some(Self::DataRead),
            "DATA_CREATE" => Some(Self::DataCreate),
            "DATA_UPDATE" => Some(Self::DataUpdate),
            "DATA_DELETE" => Some(Self::DataDelete),
            _ => None,
        }
    }
}

/// Immutable record of a mutating or sensitive action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub target: String,
    pub kind: AuditKind,
    pub description: String,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        target: &str,
        kind: AuditKind,
        description: impl Into<String>,
        actor: &Actor,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            target: format!("{AUDIT_TARGET_PREFIX}{target}"),
            kind,
            description: description.into(),
            actor: actor.id.clone(),
            timestamp,
        }
    }
}
