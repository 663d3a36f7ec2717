use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ConnectionTrait, DbBackend};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_tasks_owner_status")
                    .table(Tasks::Table)
                    .col(Tasks::OwnerId)
                    .col(Tasks::Status)
                    .to_owned(),
            )
            .await?;

        // Postgres gets a proper full-text index over title + description.
        // Other backends (SQLite in tests) fall back to a plain composite index.
        match manager.get_database_backend() {
            DbBackend::Postgres => {
                manager
                    .get_connection()
                    .execute_unprepared(
                        "CREATE INDEX idx_tasks_owner_text ON tasks \
                         USING GIN (to_tsvector('english', title || ' ' || description))",
                    )
                    .await?;
            }
            _ => {
                manager
                    .create_index(
                        Index::create()
                            .name("idx_tasks_owner_text")
                            .table(Tasks::Table)
                            .col(Tasks::OwnerId)
                            .col(Tasks::Title)
                            .col(Tasks::Description)
                            .to_owned(),
                    )
                    .await?;
            }
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_tasks_owner_text")
                    .table(Tasks::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_tasks_owner_status")
                    .table(Tasks::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Tasks {
    Table,
    OwnerId,
    Title,
    Description,
    Status,
}
