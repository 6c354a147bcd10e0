//! Budget alert entity - Append-only history of threshold alerts.
//!
//! A row is written for every alert the evaluator emits, keyed by budget, level,
//! optional category and threshold, so alert state can be audited after the fact.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Budget alert database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "budget_alerts")]
pub struct Model {
    /// Unique identifier for the alert
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Budget the alert was raised against
    pub budget_id: i64,
    /// `"total"` or `"category"`
    pub level: String,
    /// Category label for category-level alerts
    pub category: Option<String>,
    /// `"warning"` or `"danger"`
    pub alert_type: String,
    /// Threshold crossed (80 or 100)
    pub threshold: i32,
    /// Usage percentage at the time of the alert
    pub percentage: f64,
    /// Message shown to the user
    pub message: String,
    /// When the alert was emitted
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `BudgetAlert` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each alert belongs to one budget
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
