//! Transaction entity - Represents income and expense records.
//!
//! Each transaction belongs to exactly one user and carries a `transaction_type`
//! (`"income"` or `"expense"`), a category from the closed set for that type, a strictly
//! positive `amount`, and the calendar `date` it applies to. Rows are never physically
//! removed: deletion sets `is_deleted` and stamps `deleted_at`.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner of the transaction
    #[sea_orm(indexed)]
    pub user_id: String,
    /// Type of transaction: `"income"` or `"expense"`
    pub transaction_type: String,
    /// Category label, e.g. `"Groceries"` or `"Salary"`
    pub category: String,
    /// Transaction amount, always greater than zero
    pub amount: f64,
    /// Human-readable description of the transaction
    pub description: String,
    /// Date the transaction applies to; decides which budget month it counts against
    pub date: DateTimeUtc,
    /// Optional free-form notes
    pub notes: Option<String>,
    /// JSON array of tag strings
    pub tags: Json,
    /// Soft delete flag - if true, the transaction is excluded from all default reads
    pub is_deleted: bool,
    /// When the transaction was soft-deleted
    pub deleted_at: Option<DateTimeUtc>,
    /// When the row was created
    pub created_at: DateTimeUtc,
    /// When the row was last modified
    pub updated_at: DateTimeUtc,
}

/// `Transaction` links to budgets only through (user, month, year), not a foreign key
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
