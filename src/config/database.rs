//! Database configuration module for `BudgetBuddy`.
//!
//! This module handles database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. The two uniqueness rules the logic relies
//! on (one budget per user per month, one entry per category per budget) are added as
//! composite unique indexes.

use crate::entities::{
    Budget, BudgetAlert, CategoryBudget, Transaction, budget, category_budget, transaction,
};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::{debug, info, instrument};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/budget_buddy.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
///
/// This function looks for `DATABASE_URL` in the environment and falls back to
/// a default local `SQLite` file if not found.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a default local `SQLite` file if no environment variable is set.
#[instrument]
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to database at {database_url}");
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates all tables and indexes if they do not already exist.
///
/// Budgets are created before the tables that reference them.
#[instrument(skip(db))]
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let tables = [
        schema.create_table_from_entity(Transaction),
        schema.create_table_from_entity(Budget),
        schema.create_table_from_entity(CategoryBudget),
        schema.create_table_from_entity(BudgetAlert),
    ];

    for mut table in tables {
        table.if_not_exists();
        db.execute(builder.build(&table)).await?;
    }

    let budget_period_index = Index::create()
        .name("idx_budgets_user_month_year")
        .table(Budget)
        .col(budget::Column::UserId)
        .col(budget::Column::Month)
        .col(budget::Column::Year)
        .unique()
        .if_not_exists()
        .to_owned();
    let category_entry_index = Index::create()
        .name("idx_category_budgets_budget_category")
        .table(CategoryBudget)
        .col(category_budget::Column::BudgetId)
        .col(category_budget::Column::Category)
        .unique()
        .if_not_exists()
        .to_owned();
    let transaction_date_index = Index::create()
        .name("idx_transactions_user_type_date")
        .table(Transaction)
        .col(transaction::Column::UserId)
        .col(transaction::Column::TransactionType)
        .col(transaction::Column::Date)
        .if_not_exists()
        .to_owned();

    db.execute(builder.build(&budget_period_index)).await?;
    db.execute(builder.build(&category_entry_index)).await?;
    db.execute(builder.build(&transaction_date_index)).await?;

    info!("Database tables ensured");
    Ok(())
}
