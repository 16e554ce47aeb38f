use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create devices table
        manager
            .create_table(
                Table::create()
                    .table(Devices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Devices::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Devices::Name).string().not_null())
                    .col(
                        ColumnDef::new(Devices::OriginalAddress)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Devices::DisplayAddress).string().not_null())
                    .col(
                        ColumnDef::new(Devices::Status)
                            .string()
                            .not_null()
                            .default("Disconnected"),
                    )
                    .col(ColumnDef::new(Devices::CurrentCard).string())
                    .col(ColumnDef::new(Devices::GroupId).string())
                    .col(ColumnDef::new(Devices::LastConnected).timestamp_with_time_zone())
                    .col(ColumnDef::new(Devices::CustomIndex).integer())
                    .col(
                        ColumnDef::new(Devices::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Devices::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_devices_display_address")
                    .table(Devices::Table)
                    .col(Devices::DisplayAddress)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Deploy history outlives its device, so no foreign key
        manager
            .create_table(
                Table::create()
                    .table(DeployHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeployHistory::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DeployHistory::DeviceId).string().not_null())
                    .col(ColumnDef::new(DeployHistory::CardId).string().not_null())
                    .col(ColumnDef::new(DeployHistory::Side).integer().not_null())
                    .col(ColumnDef::new(DeployHistory::Status).string().not_null())
                    .col(
                        ColumnDef::new(DeployHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DeployHistory::ScheduledAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(DeployHistory::DeployedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(DeployHistory::CompletedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(DeployHistory::ErrorMessage).text())
                    .col(
                        ColumnDef::new(DeployHistory::RetryCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DeployHistory::IsScheduled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(DeployHistory::DeployedBy).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_deploy_history_device_created")
                    .table(DeployHistory::Table)
                    .col(DeployHistory::DeviceId)
                    .col(DeployHistory::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Create audit_trails table
        manager
            .create_table(
                Table::create()
                    .table(AuditTrails::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuditTrails::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AuditTrails::Target).string().not_null())
                    .col(ColumnDef::new(AuditTrails::Kind).string().not_null())
                    .col(ColumnDef::new(AuditTrails::Description).text().not_null())
                    .col(ColumnDef::new(AuditTrails::Actor).string().not_null())
                    .col(
                        ColumnDef::new(AuditTrails::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuditTrails::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DeployHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Devices::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Devices {
    Table,
    Id,
    Name,
    OriginalAddress,
    DisplayAddress,
    Status,
    CurrentCard,
    GroupId,
    LastConnected,
    CustomIndex,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum DeployHistory {
    Table,
    Id,
    DeviceId,
    CardId,
    Side,
    Status,
    CreatedAt,
    ScheduledAt,
    DeployedAt,
    CompletedAt,
    ErrorMessage,
    RetryCount,
    IsScheduled,
    DeployedBy,
}

#[derive(DeriveIden)]
enum AuditTrails {
    Table,
    Id,
    Target,
    Kind,
    Description,
    Actor,
    Timestamp,
}
