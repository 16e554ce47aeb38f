use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use domain::{AuditEntry, AuditKind, DomainError, NameplateStore};

use crate::unit_of_work::UnitOfWork;

/// Stages audit entries into the caller's unit of work, so an entry exists
/// exactly when the operation's other writes do.
pub struct AuditRecorder {
    store: Arc<dyn NameplateStore>,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn NameplateStore>) -> Self {
        Self { store }
    }

    pub fn record(
        &self,
        uow: &UnitOfWork,
        target: &str,
        kind: AuditKind,
        description: impl Into<String>,
    ) {
        let entry = AuditEntry::new(target, kind, description, uow.actor(), Utc::now());
        debug!(audit_target = %entry.target, kind = kind.as_str(), actor = %entry.actor, "Audit staged");
        uow.append_audit(entry);
    }

    pub async fn recent(&self, limit: u64) -> Result<Vec<AuditEntry>, DomainError> {
        self.store.recent_audit(limit).await
    }
}
