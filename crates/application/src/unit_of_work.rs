//! Unit of work: every public operation stages its writes here and the
//! store applies them in one atomic commit once the operation succeeds.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use domain::{Actor, AuditEntry, DeployAttempt, Device, DeviceId, DomainError};
use domain::{NameplateStore, StagedChange};

use crate::connection::SessionLease;

#[derive(Default)]
struct Staging {
    changes: Vec<StagedChange>,
    leases: Vec<SessionLease>,
}

/// Handle to the writes of one operation.
///
/// Cloning is cheap; all clones stage into the same batch.
#[derive(Clone)]
pub struct UnitOfWork {
    actor: Actor,
    staging: Arc<Mutex<Staging>>,
}

impl UnitOfWork {
    pub fn new(actor: Actor) -> Self {
        Self {
            actor,
            staging: Arc::new(Mutex::new(Staging::default())),
        }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    fn staging(&self) -> MutexGuard<'_, Staging> {
        self.staging.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn stage(&self, change: StagedChange) {
        self.staging().changes.push(change);
    }

    pub fn save_device(&self, device: &Device) {
        self.stage(StagedChange::SaveDevice(device.clone()));
    }

    pub fn delete_device(&self, id: DeviceId) {
        self.stage(StagedChange::DeleteDevice(id));
    }

    pub fn save_attempt(&self, attempt: &DeployAttempt) {
        self.stage(StagedChange::SaveAttempt(attempt.clone()));
    }

    pub fn append_audit(&self, entry: AuditEntry) {
        self.stage(StagedChange::AppendAudit(entry));
    }

    /// Keeps a device session locked until the staged writes are committed
    /// or discarded, so no other operation observes the device in between.
    pub fn hold(&self, lease: SessionLease) {
        self.staging().leases.push(lease);
    }

    /// Snapshot of what would be committed right now
    pub fn staged(&self) -> Vec<StagedChange> {
        self.staging().changes.clone()
    }

    fn finish(&self) -> (Vec<StagedChange>, Vec<SessionLease>) {
        let mut staging = self.staging();
        (
            std::mem::take(&mut staging.changes),
            std::mem::take(&mut staging.leases),
        )
    }
}

/// Runs `work` inside a fresh unit of work.
///
/// Staged changes are committed only when `work` returns `Ok`; an `Err`
/// discards them, so a failed operation leaves no trace in the store (audit
/// entries included). Session leases are released after the commit.
pub async fn run_in_unit_of_work<T, F, Fut>(
    store: &dyn NameplateStore,
    actor: &Actor,
    work: F,
) -> Result<T, DomainError>
where
    F: FnOnce(UnitOfWork) -> Fut,
    Fut: Future<Output = Result<T, DomainError>>,
{
    let uow = UnitOfWork::new(actor.clone());
    let result = work(uow.clone()).await;
    let (changes, leases) = uow.finish();

    let outcome = match result {
        Ok(value) => {
            if !changes.is_empty() {
                debug!(changes = changes.len(), actor = %actor.id, "Committing unit of work");
                store.commit(changes).await?;
            }
            Ok(value)
        }
        Err(e) => {
            debug!(discarded = changes.len(), error = %e, "Unit of work rolled back");
            Err(e)
        }
    };

    drop(leases);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::store::MockNameplateStore;
    use domain::AuditKind;
    use chrono::Utc;

    fn audit(actor: &Actor) -> AuditEntry {
        AuditEntry::new("Test", AuditKind::DataRead, "read", actor, Utc::now())
    }

    #[tokio::test]
    async fn test_commits_staged_changes_on_success() {
        let mut store = MockNameplateStore::new();
        store
            .expect_commit()
            .withf(|changes| changes.len() == 1)
            .times(1)
            .returning(|_| Ok(()));

        let actor = Actor::new("u-1", "Alice");
        let value = run_in_unit_of_work(&store, &actor, |uow| async move {
            uow.append_audit(audit(uow.actor()));
            Ok(42)
        })
        .await
        .unwrap();

        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_discards_staged_changes_on_error() {
        let mut store = MockNameplateStore::new();
        store.expect_commit().never();

        let actor = Actor::system();
        let result: Result<(), _> = run_in_unit_of_work(&store, &actor, |uow| async move {
            uow.append_audit(audit(uow.actor()));
            Err(DomainError::Validation("bad".to_string()))
        })
        .await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_skips_commit_when_nothing_staged() {
        let mut store = MockNameplateStore::new();
        store.expect_commit().never();

        let result = run_in_unit_of_work(&store, &Actor::system(), |_uow| async { Ok("done") }).await;
        assert_eq!(result.unwrap(), "done");
    }

    #[tokio::test]
    async fn test_commit_failure_is_returned() {
        let mut store = MockNameplateStore::new();
        store
            .expect_commit()
            .returning(|_| Err(DomainError::Storage("disk full".to_string())));

        let actor = Actor::system();
        let result = run_in_unit_of_work(&store, &actor, |uow| async move {
            uow.append_audit(audit(uow.actor()));
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(DomainError::Storage(_))));
    }
}
