//! Create `issues` table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Issues::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Issues::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Issues::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Issues::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Issues::Description).text().not_null())
                    .col(ColumnDef::new(Issues::Category).string_len(255).not_null())
                    .col(ColumnDef::new(Issues::Location).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Issues::Status)
                            .string_len(32)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Issues::AdminNotes).text())
                    .col(
                        ColumnDef::new(Issues::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Issues::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .check(Expr::col(Issues::Status).is_in(["pending", "in_progress", "resolved"]))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_issues_user")
                            .from(Issues::Table, Issues::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: user_id (owner-scoped listings and dashboards)
        manager
            .create_index(
                Index::create()
                    .name("idx_issues_user_id")
                    .table(Issues::Table)
                    .col(Issues::UserId)
                    .to_owned(),
            )
            .await?;

        // Index: status (status counts, resolved browse)
        manager
            .create_index(
                Index::create()
                    .name("idx_issues_status")
                    .table(Issues::Table)
                    .col(Issues::Status)
                    .to_owned(),
            )
            .await?;

        // Index: category (category filter and grouping)
        manager
            .create_index(
                Index::create()
                    .name("idx_issues_category")
                    .table(Issues::Table)
                    .col(Issues::Category)
                    .to_owned(),
            )
            .await?;

        // Index: created_at (recent issues, daily and monthly counts)
        manager
            .create_index(
                Index::create()
                    .name("idx_issues_created_at")
                    .table(Issues::Table)
                    .col(Issues::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: updated_at (community browse ordering)
        manager
            .create_index(
                Index::create()
                    .name("idx_issues_updated_at")
                    .table(Issues::Table)
                    .col(Issues::UpdatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Issues::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Issues {
    Table,
    Id,
    UserId,
    Title,
    Description,
    Category,
    Location,
    Status,
    AdminNotes,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
