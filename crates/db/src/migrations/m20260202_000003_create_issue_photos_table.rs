//! Create `issue_photos` table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(IssuePhotos::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IssuePhotos::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(IssuePhotos::IssueId).string_len(32).not_null())
                    .col(ColumnDef::new(IssuePhotos::Filename).string_len(255).not_null())
                    .col(ColumnDef::new(IssuePhotos::Path).string_len(1024).not_null())
                    .col(ColumnDef::new(IssuePhotos::Size).big_integer())
                    .col(
                        ColumnDef::new(IssuePhotos::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(IssuePhotos::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_issue_photos_issue")
                            .from(IssuePhotos::Table, IssuePhotos::IssueId)
                            .to(Issues::Table, Issues::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_issue_photos_issue_id")
                    .table(IssuePhotos::Table)
                    .col(IssuePhotos::IssueId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(IssuePhotos::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum IssuePhotos {
    Table,
    Id,
    IssueId,
    Filename,
    Path,
    Size,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Issues {
    Table,
    Id,
}
