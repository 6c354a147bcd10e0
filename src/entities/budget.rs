//! Budget entity - One spending plan per user per calendar month.
//!
//! Holds the overall ceiling (`total_budget`) and the running `total_spent`, which is
//! derived from the user's non-deleted expense transactions for that month. Per-category
//! ceilings live in [`super::category_budget`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Budget database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    /// Unique identifier for the budget
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner of the budget
    pub user_id: String,
    /// Calendar month (1-12)
    pub month: u32,
    /// Calendar year
    pub year: i32,
    /// Overall spending ceiling for the month
    pub total_budget: f64,
    /// Running sum of non-deleted expenses in the month
    pub total_spent: f64,
    /// Whether the budget is in use
    pub is_active: bool,
    /// When the budget was created
    pub created_at: DateTimeUtc,
    /// When the budget was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Budget and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One budget has many category budgets
    #[sea_orm(has_many = "super::category_budget::Entity")]
    CategoryBudgets,
    /// One budget has many recorded alerts
    #[sea_orm(has_many = "super::budget_alert::Entity")]
    Alerts,
}

impl Related<super::category_budget::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CategoryBudgets.def()
    }
}

impl Related<super::budget_alert::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Alerts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
