//! Shared test utilities for `BudgetBuddy`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.
#![allow(clippy::unwrap_used)]

use crate::{
    core::{
        budget::{self, BudgetAggregate, BudgetInput, CategoryLimit},
        category::TransactionKind,
        transaction::{self, NewTransaction},
    },
    entities::{self, Budget},
    errors::{Error, Result},
};
use chrono::{DateTime, TimeZone, Utc};
use sea_orm::{DatabaseConnection, EntityTrait};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Midnight UTC on the given day.
pub fn utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

/// Creates (or replaces) a budget through the public upsert path.
///
/// # Arguments
/// * `categories` - `(category, limit)` pairs
pub async fn create_test_budget(
    db: &DatabaseConnection,
    user_id: &str,
    year: i32,
    month: u32,
    total_budget: f64,
    categories: &[(&str, f64)],
) -> Result<BudgetAggregate> {
    let input = BudgetInput {
        month,
        year,
        total_budget,
        category_budgets: categories
            .iter()
            .map(|(category, limit)| CategoryLimit {
                category: (*category).to_string(),
                limit: *limit,
            })
            .collect(),
    };
    Ok(budget::create_or_update_budget(db, user_id, input)
        .await?
        .budget)
}

async fn create_test_transaction(
    db: &DatabaseConnection,
    user_id: &str,
    kind: TransactionKind,
    category: &str,
    amount: f64,
    date: DateTime<Utc>,
) -> Result<entities::transaction::Model> {
    transaction::create_transaction(
        db,
        user_id,
        NewTransaction {
            kind,
            category: category.to_string(),
            amount,
            description: "Test transaction".to_string(),
            date,
            notes: None,
            tags: Vec::new(),
        },
    )
    .await
}

/// Records an expense with a default description.
pub async fn create_test_expense(
    db: &DatabaseConnection,
    user_id: &str,
    category: &str,
    amount: f64,
    date: DateTime<Utc>,
) -> Result<entities::transaction::Model> {
    create_test_transaction(db, user_id, TransactionKind::Expense, category, amount, date).await
}

/// Records an income with a default description.
pub async fn create_test_income(
    db: &DatabaseConnection,
    user_id: &str,
    category: &str,
    amount: f64,
    date: DateTime<Utc>,
) -> Result<entities::transaction::Model> {
    create_test_transaction(db, user_id, TransactionKind::Income, category, amount, date).await
}

/// Reads a budget and its categories back from the database.
pub async fn reload_budget(db: &DatabaseConnection, budget_id: i64) -> Result<BudgetAggregate> {
    let stored = Budget::find_by_id(budget_id)
        .one(db)
        .await?
        .ok_or(Error::BudgetIdNotFound { id: budget_id })?;
    budget::load_aggregate(db, stored).await
}

/// Builds an in-memory budget for March 2024 without touching a database.
pub fn test_aggregate(
    total_budget: f64,
    total_spent: f64,
    categories: Vec<entities::category_budget::Model>,
) -> BudgetAggregate {
    let now = Utc::now();
    BudgetAggregate {
        budget: entities::budget::Model {
            id: 1,
            user_id: "test_user".to_string(),
            month: 3,
            year: 2024,
            total_budget,
            total_spent,
            is_active: true,
            created_at: now,
            updated_at: now,
        },
        categories,
    }
}

/// Builds an in-memory category entry with both alert flags cleared.
pub fn test_category_entry(
    category: &str,
    limit_amount: f64,
    spent: f64,
) -> entities::category_budget::Model {
    entities::category_budget::Model {
        id: 0,
        budget_id: 1,
        category: category.to_string(),
        limit_amount,
        spent,
        alert_sent_80: false,
        alert_sent_100: false,
    }
}

/// Builds an in-memory expense row without touching a database.
pub fn test_transaction_model(category: &str, amount: f64) -> entities::transaction::Model {
    let date = utc(2024, 3, 1);
    entities::transaction::Model {
        id: 0,
        user_id: "test_user".to_string(),
        transaction_type: TransactionKind::Expense.as_str().to_string(),
        category: category.to_string(),
        amount,
        description: "Test transaction".to_string(),
        date,
        notes: None,
        tags: sea_orm::prelude::Json::Array(Vec::new()),
        is_deleted: false,
        deleted_at: None,
        created_at: date,
        updated_at: date,
    }
}
