//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20260201_000001_create_user_table;
mod m20260201_000002_create_issues_table;
mod m20260202_000003_create_issue_photos_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260201_000001_create_user_table::Migration),
            Box::new(m20260201_000002_create_issues_table::Migration),
            Box::new(m20260202_000003_create_issue_photos_table::Migration),
        ]
    }
}
