use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, Condition, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{debug, info};

use domain::deploy::{DeployStatistics, HistoryPage, HistoryQuery};
use domain::device::normalize_address;
use domain::{
    AttemptId, AuditEntry, AuditKind, CardId, DeployAttempt, DeploySide, DeployStatus, Device,
    DeviceId, DomainError, GroupId, NameplateStore, StagedChange,
};
use migration::{Migrator, MigratorTrait};

use super::entities::{audit_trails, deploy_history, devices};

/// SQLite-backed store. Every commit runs in a single transaction.
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Opens the database and brings the schema up to date.
    pub async fn connect(url: &str) -> Result<Self, DomainError> {
        let mut options = ConnectOptions::new(url.to_string());
        options.sqlx_logging(false);
        if url.contains(":memory:") {
            // Every pooled connection would get its own empty database
            options.max_connections(1).min_connections(1);
        }

        let db = Database::connect(options).await.map_err(db_error)?;
        Migrator::up(&db, None).await.map_err(db_error)?;
        info!("💾 Storage ready: {}", url);
        Ok(Self::new(db))
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    fn model_to_device(model: devices::Model) -> Result<Device, DomainError> {
        let corrupt = |e: DomainError| {
            DomainError::Storage(format!("Corrupt device row {}: {}", model.id, e))
        };
        Ok(Device {
            id: model.id.parse().map_err(corrupt)?,
            status: model.status.parse().map_err(corrupt)?,
            current_card: model
                .current_card
                .clone()
                .map(CardId::new)
                .transpose()
                .map_err(corrupt)?,
            group: model
                .group_id
                .clone()
                .map(GroupId::new)
                .transpose()
                .map_err(corrupt)?,
            last_connected: model.last_connected.map(from_offset),
            custom_index: model.custom_index,
            created_at: from_offset(model.created_at),
            updated_at: from_offset(model.updated_at),
            name: model.name,
            original_address: model.original_address,
            display_address: model.display_address,
        })
    }

    fn device_to_model(device: &Device) -> devices::ActiveModel {
        devices::ActiveModel {
            id: Set(device.id.to_string()),
            name: Set(device.name.clone()),
            original_address: Set(device.original_address.clone()),
            display_address: Set(device.display_address.clone()),
            status: Set(device.status.as_str().to_string()),
            current_card: Set(device.current_card.as_ref().map(|c| c.as_str().to_string())),
            group_id: Set(device.group.as_ref().map(|g| g.as_str().to_string())),
            last_connected: Set(device.last_connected.map(to_offset)),
            custom_index: Set(device.custom_index),
            created_at: Set(to_offset(device.created_at)),
            updated_at: Set(to_offset(device.updated_at)),
        }
    }

    fn model_to_attempt(model: deploy_history::Model) -> Result<DeployAttempt, DomainError> {
        let corrupt = |e: DomainError| {
            DomainError::Storage(format!("Corrupt deploy history row {}: {}", model.id, e))
        };
        Ok(DeployAttempt {
            id: model.id.parse().map_err(corrupt)?,
            device_id: model.device_id.parse().map_err(corrupt)?,
            card_id: CardId::new(model.card_id.clone()).map_err(corrupt)?,
            side: DeploySide::from_code(model.side).map_err(corrupt)?,
            status: model.status.parse().map_err(corrupt)?,
            created_at: from_offset(model.created_at),
            scheduled_at: model.scheduled_at.map(from_offset),
            deployed_at: model.deployed_at.map(from_offset),
            completed_at: model.completed_at.map(from_offset),
            retry_count: u32::try_from(model.retry_count).unwrap_or_default(),
            is_scheduled: model.is_scheduled,
            error_message: model.error_message,
            deployed_by: model.deployed_by,
        })
    }

    fn attempt_to_model(attempt: &DeployAttempt) -> deploy_history::ActiveModel {
        deploy_history::ActiveModel {
            id: Set(attempt.id.to_string()),
            device_id: Set(attempt.device_id.to_string()),
            card_id: Set(attempt.card_id.as_str().to_string()),
            side: Set(attempt.side.code()),
            status: Set(attempt.status.as_str().to_string()),
            created_at: Set(to_offset(attempt.created_at)),
            scheduled_at: Set(attempt.scheduled_at.map(to_offset)),
            deployed_at: Set(attempt.deployed_at.map(to_offset)),
            completed_at: Set(attempt.completed_at.map(to_offset)),
            error_message: Set(attempt.error_message.clone()),
            retry_count: Set(i32::try_from(attempt.retry_count).unwrap_or(i32::MAX)),
            is_scheduled: Set(attempt.is_scheduled),
            deployed_by: Set(attempt.deployed_by.clone()),
        }
    }

    fn model_to_audit(model: audit_trails::Model) -> Result<AuditEntry, DomainError> {
        let kind = AuditKind::parse(&model.kind).ok_or_else(|| {
            DomainError::Storage(format!(
                "Corrupt audit row {}: unknown kind {}",
                model.id, model.kind
            ))
        })?;
        let id = model.id.parse::<uuid::Uuid>().map_err(|e| {
            DomainError::Storage(format!("Corrupt audit row {}: {}", model.id, e))
        })?;
        Ok(AuditEntry {
            id,
            target: model.target,
            kind,
            description: model.description,
            actor: model.actor,
            timestamp: from_offset(model.timestamp),
        })
    }

    async fn apply<C: ConnectionTrait>(conn: &C, change: StagedChange) -> Result<(), DbErr> {
        match change {
            StagedChange::SaveDevice(device) => {
                devices::Entity::insert(Self::device_to_model(&device))
                    .on_conflict(
                        OnConflict::column(devices::Column::Id)
                            .update_columns([
                                devices::Column::Name,
                                devices::Column::OriginalAddress,
                                devices::Column::DisplayAddress,
                                devices::Column::Status,
                                devices::Column::CurrentCard,
                                devices::Column::GroupId,
                                devices::Column::LastConnected,
                                devices::Column::CustomIndex,
                                devices::Column::UpdatedAt,
                            ])
                            .to_owned(),
                    )
                    .exec(conn)
                    .await?;
            }
            StagedChange::DeleteDevice(id) => {
                devices::Entity::delete_by_id(id.to_string())
                    .exec(conn)
                    .await?;
            }
            StagedChange::SaveAttempt(attempt) => {
                deploy_history::Entity::insert(Self::attempt_to_model(&attempt))
                    .on_conflict(
                        OnConflict::column(deploy_history::Column::Id)
                            .update_columns([
                                deploy_history::Column::Status,
                                deploy_history::Column::ScheduledAt,
                                deploy_history::Column::DeployedAt,
                                deploy_history::Column::CompletedAt,
                                deploy_history::Column::ErrorMessage,
                                deploy_history::Column::RetryCount,
                                deploy_history::Column::IsScheduled,
                                deploy_history::Column::DeployedBy,
                            ])
                            .to_owned(),
                    )
                    .exec(conn)
                    .await?;
            }
            StagedChange::AppendAudit(entry) => {
                let model = audit_trails::ActiveModel {
                    id: Set(entry.id.to_string()),
                    target: Set(entry.target),
                    kind: Set(entry.kind.as_str().to_string()),
                    description: Set(entry.description),
                    actor: Set(entry.actor),
                    timestamp: Set(to_offset(entry.timestamp)),
                };
                audit_trails::Entity::insert(model).exec(conn).await?;
            }
        }
        Ok(())
    }

    fn history_filter(query: &HistoryQuery) -> Condition {
        let mut condition = Condition::all();
        if let Some(device_id) = &query.device_id {
            condition = condition.add(deploy_history::Column::DeviceId.eq(device_id.to_string()));
        }
        if let Some(card_id) = &query.card_id {
            condition = condition.add(deploy_history::Column::CardId.eq(card_id.as_str()));
        }
        if let Some(status) = &query.status {
            condition = condition.add(deploy_history::Column::Status.eq(status.as_str()));
        }
        if let Some(range) = &query.date_range {
            if let Some(from) = range.from {
                condition = condition.add(deploy_history::Column::CreatedAt.gte(to_offset(from)));
            }
            if let Some(to) = range.to {
                condition = condition.add(deploy_history::Column::CreatedAt.lte(to_offset(to)));
            }
        }
        condition
    }
}

fn db_error(e: DbErr) -> DomainError {
    DomainError::Storage(format!("Database error: {}", e))
}

fn to_offset(dt: DateTime<Utc>) -> DateTime<FixedOffset> {
    dt.fixed_offset()
}

fn from_offset(dt: DateTime<FixedOffset>) -> DateTime<Utc> {
    dt.with_timezone(&Utc)
}

#[async_trait]
impl NameplateStore for SeaOrmStore {
    async fn find_device(&self, id: &DeviceId) -> Result<Option<Device>, DomainError> {
        let model = devices::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(db_error)?;
        model.map(Self::model_to_device).transpose()
    }

    async fn find_device_by_address(&self, address: &str) -> Result<Option<Device>, DomainError> {
        let trimmed = address.trim();
        let mut condition = Condition::any().add(devices::Column::OriginalAddress.eq(trimmed));
        if let Ok(display) = normalize_address(trimmed) {
            condition = condition.add(devices::Column::DisplayAddress.eq(display));
        }

        let model = devices::Entity::find()
            .filter(condition)
            .order_by_asc(devices::Column::CreatedAt)
            .one(&self.db)
            .await
            .map_err(db_error)?;
        model.map(Self::model_to_device).transpose()
    }

    async fn list_devices(&self) -> Result<Vec<Device>, DomainError> {
        let models = devices::Entity::find()
            .order_by_asc(devices::Column::Name)
            .all(&self.db)
            .await
            .map_err(db_error)?;

        let mut result = Vec::new();
        for m in models {
            result.push(Self::model_to_device(m)?);
        }
        Ok(result)
    }

    async fn find_attempt(&self, id: &AttemptId) -> Result<Option<DeployAttempt>, DomainError> {
        let model = deploy_history::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(db_error)?;
        model.map(Self::model_to_attempt).transpose()
    }

    async fn count_pending_attempts(&self, device_id: &DeviceId) -> Result<u64, DomainError> {
        deploy_history::Entity::find()
            .filter(deploy_history::Column::DeviceId.eq(device_id.to_string()))
            .filter(deploy_history::Column::Status.eq(DeployStatus::Pending.as_str()))
            .count(&self.db)
            .await
            .map_err(db_error)
    }

    async fn query_history(&self, query: &HistoryQuery) -> Result<HistoryPage, DomainError> {
        let txn = self.db.begin().await.map_err(db_error)?;
        let select = deploy_history::Entity::find().filter(Self::history_filter(query));

        let total_count = select.clone().count(&txn).await.map_err(db_error)?;
        let models = select
            .order_by_desc(deploy_history::Column::CreatedAt)
            .order_by_desc(deploy_history::Column::Id)
            .offset(query.offset())
            .limit(u64::from(query.page_size))
            .all(&txn)
            .await
            .map_err(db_error)?;
        txn.commit().await.map_err(db_error)?;

        let mut items = Vec::with_capacity(models.len());
        for m in models {
            items.push(Self::model_to_attempt(m)?);
        }
        Ok(HistoryPage {
            items,
            total_count,
            page: query.page,
            page_size: query.page_size,
        })
    }

    async fn history_statistics(
        &self,
        device_id: Option<DeviceId>,
    ) -> Result<DeployStatistics, DomainError> {
        let mut select = deploy_history::Entity::find()
            .select_only()
            .column(deploy_history::Column::Status)
            .column_as(Expr::col(deploy_history::Column::Id).count(), "count")
            .group_by(deploy_history::Column::Status);
        if let Some(device_id) = device_id {
            select = select.filter(deploy_history::Column::DeviceId.eq(device_id.to_string()));
        }

        let rows: Vec<(String, i64)> = select.into_tuple().all(&self.db).await.map_err(db_error)?;
        let (mut succeeded, mut failed, mut pending, mut cancelled) = (0, 0, 0, 0);
        for (status, count) in rows {
            let count = u64::try_from(count).unwrap_or_default();
            match status.as_str() {
                "Success" => succeeded = count,
                "Failed" => failed = count,
                "Pending" => pending = count,
                "Cancelled" => cancelled = count,
                other => {
                    return Err(DomainError::Storage(format!(
                        "Unknown deploy status in history: {other}"
                    )));
                }
            }
        }
        Ok(DeployStatistics::from_counts(succeeded, failed, pending, cancelled))
    }

    async fn recent_audit(&self, limit: u64) -> Result<Vec<AuditEntry>, DomainError> {
        let models = audit_trails::Entity::find()
            .order_by_desc(audit_trails::Column::Timestamp)
            .order_by_desc(audit_trails::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(db_error)?;

        let mut result = Vec::with_capacity(models.len());
        for m in models {
            result.push(Self::model_to_audit(m)?);
        }
        Ok(result)
    }

    async fn commit(&self, changes: Vec<StagedChange>) -> Result<(), DomainError> {
        let count = changes.len();
        let txn = self.db.begin().await.map_err(db_error)?;
        for change in changes {
            // Dropping the transaction on error rolls it back
            Self::apply(&txn, change).await.map_err(db_error)?;
        }
        txn.commit().await.map_err(db_error)?;
        debug!(changes = count, "Committed");
        Ok(())
    }
}
