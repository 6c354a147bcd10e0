//! Budget business logic - monthly budgets and their per-category ceilings.
//!
//! A budget is the aggregate of one `budgets` row and its `category_budgets` rows. There
//! is at most one budget per user per calendar month. Creating or replacing a budget
//! always recalculates its spend from the stored transactions, because the running totals
//! of a freshly replaced category list cannot be trusted.

use crate::{
    core::{
        alerts::{BudgetAlert, evaluate_alerts, record_alerts},
        category::{TransactionKind, parse_category_for},
        period::Period,
        reconcile::recalculate_budget_spent,
    },
    entities::{
        Budget, BudgetAlert as BudgetAlertEntity, CategoryBudget, budget, budget_alert,
        category_budget,
    },
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, instrument, warn};

/// Percentage of a ceiling at which a warning is raised
pub const WARNING_PERCENT: f64 = 80.0;
/// Percentage of a ceiling at which the ceiling counts as exceeded
pub const EXCEEDED_PERCENT: f64 = 100.0;

/// A budget together with its category entries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetAggregate {
    /// The budget row
    pub budget: budget::Model,
    /// Category entries, in insertion order
    pub categories: Vec<category_budget::Model>,
}

impl BudgetAggregate {
    /// Calendar month the budget covers
    #[must_use]
    pub const fn period(&self) -> Period {
        Period {
            year: self.budget.year,
            month: self.budget.month,
        }
    }

    /// Ceiling minus spend; negative once the budget is exceeded
    #[must_use]
    pub fn remaining(&self) -> f64 {
        self.budget.total_budget - self.budget.total_spent
    }

    /// Looks up the entry for a category label
    #[must_use]
    pub fn category(&self, category: &str) -> Option<&category_budget::Model> {
        self.categories.iter().find(|c| c.category == category)
    }
}

/// Requested ceiling for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryLimit {
    /// Expense category label
    pub category: String,
    /// Spending ceiling, zero or more
    pub limit: f64,
}

/// Input for creating or replacing a month's budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetInput {
    /// Calendar month (1-12)
    pub month: u32,
    /// Calendar year
    pub year: i32,
    /// Overall ceiling, zero or more
    pub total_budget: f64,
    /// Complete replacement list of category ceilings
    #[serde(default)]
    pub category_budgets: Vec<CategoryLimit>,
}

/// Outcome of [`create_or_update_budget`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetUpsert {
    /// The stored budget after recalculation
    pub budget: BudgetAggregate,
    /// Alerts raised by the new totals
    pub alerts: Vec<BudgetAlert>,
    /// Whether the budget did not exist before
    pub created: bool,
}

/// Coarse health of a budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetHealth {
    /// Below 80% of the ceiling
    Good,
    /// At or above 80%, below 100%
    Warning,
    /// At or above 100%
    Exceeded,
}

/// Usage summary returned alongside a budget
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BudgetStatus {
    /// Coarse health
    pub status: BudgetHealth,
    /// `total_spent / total_budget * 100`
    pub percentage: f64,
    /// `total_budget - total_spent`
    pub remaining: f64,
}

/// Computes the status of a budget from its totals.
///
/// A zero ceiling yields a non-finite percentage, which classifies as `Exceeded` when
/// something was spent and `Good` otherwise.
#[must_use]
pub fn budget_status(aggregate: &BudgetAggregate) -> BudgetStatus {
    let percentage = aggregate.budget.total_spent / aggregate.budget.total_budget * 100.0;
    let status = if percentage >= EXCEEDED_PERCENT {
        BudgetHealth::Exceeded
    } else if percentage >= WARNING_PERCENT {
        BudgetHealth::Warning
    } else {
        BudgetHealth::Good
    };

    BudgetStatus {
        status,
        percentage,
        remaining: aggregate.remaining(),
    }
}

fn validate_ceiling(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::Validation {
            field,
            message: format!("{value} must be a finite amount of zero or more"),
        });
    }
    Ok(())
}

fn validate_budget_input(input: &BudgetInput) -> Result<Period> {
    let period = Period::new(input.year, input.month)?;
    validate_ceiling("totalBudget", input.total_budget)?;

    let mut seen = HashSet::new();
    for entry in &input.category_budgets {
        parse_category_for(TransactionKind::Expense, &entry.category)?;
        validate_ceiling("limit", entry.limit)?;
        if !seen.insert(entry.category.as_str()) {
            return Err(Error::Validation {
                field: "categoryBudgets",
                message: format!("category '{}' is listed more than once", entry.category),
            });
        }
    }

    Ok(period)
}

/// Loads the category entries of `budget` and wraps both in an aggregate.
pub async fn load_aggregate<C>(db: &C, budget: budget::Model) -> Result<BudgetAggregate>
where
    C: ConnectionTrait,
{
    let categories = CategoryBudget::find()
        .filter(category_budget::Column::BudgetId.eq(budget.id))
        .order_by_asc(category_budget::Column::Id)
        .all(db)
        .await?;

    Ok(BudgetAggregate { budget, categories })
}

/// Persists the aggregate's totals and category state.
///
/// Writes `total_budget`, `total_spent`, every entry's `spent` and both one-shot flags.
pub async fn save_aggregate<C>(db: &C, aggregate: &BudgetAggregate) -> Result<()>
where
    C: ConnectionTrait,
{
    let mut budget: budget::ActiveModel = aggregate.budget.clone().into();
    budget.total_budget = Set(aggregate.budget.total_budget);
    budget.total_spent = Set(aggregate.budget.total_spent);
    budget.updated_at = Set(Utc::now());
    budget.update(db).await?;

    for entry in &aggregate.categories {
        let mut active: category_budget::ActiveModel = entry.clone().into();
        active.spent = Set(entry.spent);
        active.alert_sent_80 = Set(entry.alert_sent_80);
        active.alert_sent_100 = Set(entry.alert_sent_100);
        active.update(db).await?;
    }

    Ok(())
}

async fn find_budget<C>(db: &C, user_id: &str, period: Period) -> Result<Option<budget::Model>>
where
    C: ConnectionTrait,
{
    Budget::find()
        .filter(budget::Column::UserId.eq(user_id))
        .filter(budget::Column::Month.eq(period.month))
        .filter(budget::Column::Year.eq(period.year))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves all of a user's budgets, newest period first.
pub async fn get_budgets(db: &DatabaseConnection, user_id: &str) -> Result<Vec<BudgetAggregate>> {
    let budgets = Budget::find()
        .filter(budget::Column::UserId.eq(user_id))
        .order_by_desc(budget::Column::Year)
        .order_by_desc(budget::Column::Month)
        .all(db)
        .await?;

    let mut aggregates = Vec::with_capacity(budgets.len());
    for budget in budgets {
        aggregates.push(load_aggregate(db, budget).await?);
    }
    Ok(aggregates)
}

/// Retrieves the budget for one month.
///
/// # Errors
/// [`Error::BudgetNotFound`] when the user has no budget for that month.
pub async fn get_budget_by_month(
    db: &DatabaseConnection,
    user_id: &str,
    year: i32,
    month: u32,
) -> Result<BudgetAggregate> {
    let period = Period::new(year, month)?;
    let budget = find_budget(db, user_id, period)
        .await?
        .ok_or_else(|| Error::BudgetNotFound {
            user_id: user_id.to_string(),
            month,
            year,
        })?;

    load_aggregate(db, budget).await
}

/// Returns the budget for the month containing `today`, creating it on first access.
///
/// A new budget gets `default_total` as its ceiling, no category entries, and spend
/// recalculated from any expenses already recorded for the month.
#[instrument(skip(db))]
pub async fn get_or_create_current_budget(
    db: &DatabaseConnection,
    user_id: &str,
    today: NaiveDate,
    default_total: f64,
) -> Result<BudgetAggregate> {
    let period = Period::of_day(today);
    if let Some(budget) = find_budget(db, user_id, period).await? {
        return load_aggregate(db, budget).await;
    }

    validate_ceiling("totalBudget", default_total)?;
    let now = Utc::now();
    let new_budget = budget::ActiveModel {
        user_id: Set(user_id.to_string()),
        month: Set(period.month),
        year: Set(period.year),
        total_budget: Set(default_total),
        total_spent: Set(0.0),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let budget = match new_budget.insert(db).await {
        Ok(budget) => budget,
        Err(e) => {
            // Another request may have created it first
            warn!("Insert of current budget failed, retrying lookup: {e}");
            find_budget(db, user_id, period).await?.ok_or(Error::Database(e))?
        }
    };

    let mut aggregate = load_aggregate(db, budget).await?;
    recalculate_budget_spent(db, &mut aggregate).await?;
    save_aggregate(db, &aggregate).await?;
    info!("Created budget for {}-{:02}", period.year, period.month);
    Ok(aggregate)
}

/// Creates the budget for `input`'s month or replaces the existing one.
///
/// The category list is replaced wholesale, which resets the entries' one-shot alert
/// flags. Spend is then recalculated from transactions, the result is saved, and alerts
/// are evaluated and recorded. Everything runs in one database transaction.
#[instrument(skip(db, input), fields(year = input.year, month = input.month))]
pub async fn create_or_update_budget(
    db: &DatabaseConnection,
    user_id: &str,
    input: BudgetInput,
) -> Result<BudgetUpsert> {
    let period = validate_budget_input(&input)?;
    let txn = db.begin().await?;
    let now = Utc::now();

    let (budget, created) = match find_budget(&txn, user_id, period).await? {
        Some(existing) => {
            CategoryBudget::delete_many()
                .filter(category_budget::Column::BudgetId.eq(existing.id))
                .exec(&txn)
                .await?;

            let mut active: budget::ActiveModel = existing.into();
            active.total_budget = Set(input.total_budget);
            active.updated_at = Set(now);
            (active.update(&txn).await?, false)
        }
        None => {
            let active = budget::ActiveModel {
                user_id: Set(user_id.to_string()),
                month: Set(period.month),
                year: Set(period.year),
                total_budget: Set(input.total_budget),
                total_spent: Set(0.0),
                is_active: Set(true),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            (active.insert(&txn).await?, true)
        }
    };

    for entry in input.category_budgets {
        category_budget::ActiveModel {
            budget_id: Set(budget.id),
            category: Set(entry.category),
            limit_amount: Set(entry.limit),
            spent: Set(0.0),
            alert_sent_80: Set(false),
            alert_sent_100: Set(false),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    let mut aggregate = load_aggregate(&txn, budget).await?;
    recalculate_budget_spent(&txn, &mut aggregate).await?;
    let alerts = evaluate_alerts(&mut aggregate);
    save_aggregate(&txn, &aggregate).await?;
    record_alerts(&txn, &aggregate, &alerts).await?;

    txn.commit().await?;

    info!(
        budget_id = aggregate.budget.id,
        created,
        alert_count = alerts.len(),
        "Saved budget"
    );
    Ok(BudgetUpsert {
        budget: aggregate,
        alerts,
        created,
    })
}

/// Deletes a budget along with its category entries and alert history.
///
/// # Errors
/// [`Error::BudgetIdNotFound`] for an unknown id, [`Error::Unauthorized`] when the
/// budget belongs to another user.
#[instrument(skip(db))]
pub async fn delete_budget(db: &DatabaseConnection, user_id: &str, budget_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let budget = Budget::find_by_id(budget_id)
        .one(&txn)
        .await?
        .ok_or(Error::BudgetIdNotFound { id: budget_id })?;

    if budget.user_id != user_id {
        return Err(Error::Unauthorized {
            resource: "budget",
            id: budget_id,
        });
    }

    BudgetAlertEntity::delete_many()
        .filter(budget_alert::Column::BudgetId.eq(budget_id))
        .exec(&txn)
        .await?;
    CategoryBudget::delete_many()
        .filter(category_budget::Column::BudgetId.eq(budget_id))
        .exec(&txn)
        .await?;
    budget.delete(&txn).await?;

    txn.commit().await?;
    info!("Deleted budget {budget_id}");
    Ok(())
}
