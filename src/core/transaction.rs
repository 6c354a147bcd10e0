//! Transaction business logic - Handles all transaction-related operations.
//!
//! Transactions are validated at this boundary, then written together with the budget
//! adjustment they cause inside one database transaction. Only expenses touch budgets:
//! creating one adds its amount to the budget of the month its `date` falls in, deleting
//! one subtracts it, and editing one moves the amount from the old (category, month)
//! bucket to the new one. Deletion is always soft.

use crate::{
    core::{
        analytics::{CategoryTotal, category_breakdown},
        category::{TransactionKind, parse_category_for},
        period::Period,
        reconcile::apply_spend_delta,
    },
    entities::{Transaction, transaction},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Smallest accepted amount
pub const MIN_AMOUNT: f64 = 0.01;
/// Longest accepted description, in characters
pub const MAX_DESCRIPTION_LEN: usize = 500;
/// Longest accepted notes, in characters
pub const MAX_NOTES_LEN: usize = 1000;

/// Input for recording a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    /// Income or expense
    pub kind: TransactionKind,
    /// Category label valid for `kind`
    pub category: String,
    /// Amount, at least [`MIN_AMOUNT`]
    pub amount: f64,
    /// Description, trimmed and non-empty
    pub description: String,
    /// Date the transaction applies to
    pub date: DateTime<Utc>,
    /// Optional notes
    #[serde(default)]
    pub notes: Option<String>,
    /// Optional tags
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update of a transaction; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionUpdate {
    /// New kind
    pub kind: Option<TransactionKind>,
    /// New category label
    pub category: Option<String>,
    /// New amount
    pub amount: Option<f64>,
    /// New description
    pub description: Option<String>,
    /// New date
    pub date: Option<DateTime<Utc>>,
    /// New notes; `Some(None)` clears them
    pub notes: Option<Option<String>>,
    /// Replacement tag list
    pub tags: Option<Vec<String>>,
}

/// Filter for listing transactions
///
/// When `period` is set it replaces `start_date`/`end_date`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionFilter {
    /// Only this kind
    pub kind: Option<TransactionKind>,
    /// Only this category label
    pub category: Option<String>,
    /// Dated at or after
    pub start_date: Option<DateTime<Utc>>,
    /// Dated at or before
    pub end_date: Option<DateTime<Utc>>,
    /// Only this calendar month
    pub period: Option<Period>,
}

/// Totals for a user, optionally restricted to one month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionStats {
    /// Sum of income
    pub total_income: f64,
    /// Sum of expenses
    pub total_expense: f64,
    /// Income minus expenses
    pub savings: f64,
    /// Expense totals per category, largest first
    pub category_breakdown: Vec<CategoryTotal>,
}

/// Rejects amounts that are not finite or below [`MIN_AMOUNT`].
pub fn validate_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount < MIN_AMOUNT {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<String> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation {
            field: "description",
            message: "description cannot be empty".to_string(),
        });
    }
    if trimmed.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(Error::Validation {
            field: "description",
            message: format!("description cannot exceed {MAX_DESCRIPTION_LEN} characters"),
        });
    }
    Ok(trimmed.to_string())
}

fn validate_notes(notes: Option<String>) -> Result<Option<String>> {
    if notes
        .as_ref()
        .is_some_and(|text| text.chars().count() > MAX_NOTES_LEN)
    {
        return Err(Error::Validation {
            field: "notes",
            message: format!("notes cannot exceed {MAX_NOTES_LEN} characters"),
        });
    }
    Ok(notes)
}

fn normalize_tags(tags: Vec<String>) -> Json {
    let cleaned: Vec<String> = tags
        .into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect();
    Json::from(cleaned)
}

/// Tags of a stored transaction
#[must_use]
pub fn tags_of(transaction: &transaction::Model) -> Vec<String> {
    transaction
        .tags
        .as_array()
        .map(|tags| {
            tags.iter()
                .filter_map(|tag| tag.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Kind of a stored transaction
pub fn kind_of(transaction: &transaction::Model) -> Result<TransactionKind> {
    transaction.transaction_type.parse()
}

/// Records a transaction and, for expenses, adds its amount to the matching budget.
#[instrument(skip(db, new), fields(kind = %new.kind, amount = new.amount))]
pub async fn create_transaction(
    db: &DatabaseConnection,
    user_id: &str,
    new: NewTransaction,
) -> Result<transaction::Model> {
    validate_amount(new.amount)?;
    parse_category_for(new.kind, &new.category)?;
    let description = validate_description(&new.description)?;
    let notes = validate_notes(new.notes)?;

    let txn = db.begin().await?;
    let now = Utc::now();

    let created = transaction::ActiveModel {
        user_id: Set(user_id.to_string()),
        transaction_type: Set(new.kind.as_str().to_string()),
        category: Set(new.category),
        amount: Set(new.amount),
        description: Set(description),
        date: Set(new.date),
        notes: Set(notes),
        tags: Set(normalize_tags(new.tags)),
        is_deleted: Set(false),
        deleted_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    if new.kind == TransactionKind::Expense {
        apply_spend_delta(&txn, user_id, &created.category, created.amount, created.date).await?;
    }

    txn.commit().await?;
    info!("Created transaction {}", created.id);
    Ok(created)
}

async fn find_owned<C>(db: &C, user_id: &str, transaction_id: i64) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    let transaction = Transaction::find_by_id(transaction_id)
        .one(db)
        .await?
        .filter(|t| !t.is_deleted)
        .ok_or(Error::TransactionNotFound { id: transaction_id })?;

    if transaction.user_id != user_id {
        return Err(Error::Unauthorized {
            resource: "transaction",
            id: transaction_id,
        });
    }

    Ok(transaction)
}

/// Retrieves one of the user's transactions.
///
/// # Errors
/// [`Error::TransactionNotFound`] if it does not exist or was deleted,
/// [`Error::Unauthorized`] if it belongs to another user.
pub async fn get_transaction(
    db: &DatabaseConnection,
    user_id: &str,
    transaction_id: i64,
) -> Result<transaction::Model> {
    find_owned(db, user_id, transaction_id).await
}

/// Lists the user's non-deleted transactions matching `filter`, newest first.
pub async fn get_transactions(
    db: &DatabaseConnection,
    user_id: &str,
    filter: &TransactionFilter,
) -> Result<Vec<transaction::Model>> {
    let mut query = Transaction::find()
        .filter(transaction::Column::UserId.eq(user_id))
        .filter(transaction::Column::IsDeleted.eq(false));

    if let Some(kind) = filter.kind {
        query = query.filter(transaction::Column::TransactionType.eq(kind.as_str()));
    }
    if let Some(category) = &filter.category {
        query = query.filter(transaction::Column::Category.eq(category.as_str()));
    }

    if let Some(period) = filter.period {
        query = query
            .filter(transaction::Column::Date.gte(period.start()))
            .filter(transaction::Column::Date.lt(period.end_exclusive()));
    } else {
        if let Some(start) = filter.start_date {
            query = query.filter(transaction::Column::Date.gte(start));
        }
        if let Some(end) = filter.end_date {
            query = query.filter(transaction::Column::Date.lte(end));
        }
    }

    query
        .order_by_desc(transaction::Column::Date)
        .order_by_desc(transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Applies a partial update and moves the expense amount between budget buckets.
///
/// If the old row was an expense its amount is subtracted from the budget of its old
/// category and month; if the updated row is an expense its amount is added to the budget
/// of its new category and month. Both adjustments commit with the row update.
#[instrument(skip(db, update))]
pub async fn update_transaction(
    db: &DatabaseConnection,
    user_id: &str,
    transaction_id: i64,
    update: TransactionUpdate,
) -> Result<transaction::Model> {
    let txn = db.begin().await?;
    let existing = find_owned(&txn, user_id, transaction_id).await?;
    let old_kind = kind_of(&existing)?;

    let kind = update.kind.unwrap_or(old_kind);
    let category = update.category.unwrap_or_else(|| existing.category.clone());
    let amount = update.amount.unwrap_or(existing.amount);
    let date = update.date.unwrap_or(existing.date);

    validate_amount(amount)?;
    parse_category_for(kind, &category)?;

    let mut active: transaction::ActiveModel = existing.clone().into();
    active.transaction_type = Set(kind.as_str().to_string());
    active.category = Set(category);
    active.amount = Set(amount);
    active.date = Set(date);
    if let Some(description) = update.description {
        active.description = Set(validate_description(&description)?);
    }
    if let Some(notes) = update.notes {
        active.notes = Set(validate_notes(notes)?);
    }
    if let Some(tags) = update.tags {
        active.tags = Set(normalize_tags(tags));
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;

    if old_kind == TransactionKind::Expense {
        apply_spend_delta(&txn, user_id, &existing.category, -existing.amount, existing.date)
            .await?;
    }
    if kind == TransactionKind::Expense {
        apply_spend_delta(&txn, user_id, &updated.category, updated.amount, updated.date).await?;
    }

    txn.commit().await?;
    info!("Updated transaction {transaction_id}");
    Ok(updated)
}

/// Soft-deletes a transaction and, for expenses, subtracts its amount from the budget.
#[instrument(skip(db))]
pub async fn delete_transaction(
    db: &DatabaseConnection,
    user_id: &str,
    transaction_id: i64,
) -> Result<()> {
    let txn = db.begin().await?;
    let existing = find_owned(&txn, user_id, transaction_id).await?;
    let kind = kind_of(&existing)?;

    let now = Utc::now();
    let mut active: transaction::ActiveModel = existing.clone().into();
    active.is_deleted = Set(true);
    active.deleted_at = Set(Some(now));
    active.updated_at = Set(now);
    active.update(&txn).await?;

    if kind == TransactionKind::Expense {
        apply_spend_delta(&txn, user_id, &existing.category, -existing.amount, existing.date)
            .await?;
    }

    txn.commit().await?;
    info!("Deleted transaction {transaction_id}");
    Ok(())
}

/// Sums the user's income and expenses, optionally for one month only.
pub async fn transaction_stats(
    db: &DatabaseConnection,
    user_id: &str,
    period: Option<Period>,
) -> Result<TransactionStats> {
    let filter = TransactionFilter {
        period,
        ..Default::default()
    };
    let transactions = get_transactions(db, user_id, &filter).await?;

    let (income, expenses): (Vec<_>, Vec<_>) = transactions
        .into_iter()
        .partition(|t| t.transaction_type == TransactionKind::Income.as_str());
    let total_income: f64 = income.iter().fold(0.0, |acc, t| acc + t.amount);
    let total_expense: f64 = expenses.iter().fold(0.0, |acc, t| acc + t.amount);

    Ok(TransactionStats {
        total_income,
        total_expense,
        savings: total_income - total_expense,
        category_breakdown: category_breakdown(&expenses),
    })
}
