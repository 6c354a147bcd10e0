//! Category budget entity - A per-category ceiling nested inside a budget.
//!
//! Each entry tracks how much of its `limit_amount` has been spent and carries two
//! one-shot flags that stop the 80% and 100% alerts from firing more than once per period.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Category budget database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "category_budgets")]
pub struct Model {
    /// Unique identifier for the entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Budget this entry belongs to
    pub budget_id: i64,
    /// Category label, matched against `transactions.category`
    pub category: String,
    /// Spending ceiling for the category
    pub limit_amount: f64,
    /// Running sum of non-deleted expenses in the category for the month
    pub spent: f64,
    /// Whether the 80% warning has already fired this period
    pub alert_sent_80: bool,
    /// Whether the 100% alert has already fired this period
    pub alert_sent_100: bool,
}

/// Defines relationships between `CategoryBudget` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one budget
    #[sea_orm(
        belongs_to = "super::budget::Entity",
        from = "Column::BudgetId",
        to = "super::budget::Column::Id",
        on_delete = "Cascade"
    )]
    Budget,
}

impl Related<super::budget::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Budget.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
