//! Budget threshold alerts.
//!
//! [`evaluate_alerts`] inspects a budget's current totals and produces warnings at 80% and
//! danger alerts at 100% of a ceiling:
//!
//! - The total-level check re-fires on every call; a danger alert replaces the warning.
//! - Each category entry fires each threshold once per period. The entry's
//!   `alert_sent_80` / `alert_sent_100` flag is set in memory when its alert is emitted.
//!
//! Percentages follow plain float division, so a zero ceiling gives `inf` (alerts as
//! exceeded when something was spent) or `NaN` (never alerts).
//!
//! [`record_alerts`] persists the flags and appends each crossing to the `budget_alerts`
//! history table. Re-fired total-level alerts are recorded once per threshold.

use crate::{
    core::{
        budget::{BudgetAggregate, EXCEEDED_PERCENT, WARNING_PERCENT, load_aggregate},
        period::Period,
    },
    entities::{
        Budget, BudgetAlert as BudgetAlertEntity, CategoryBudget, budget, budget_alert,
        category_budget,
    },
    errors::Result,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Severity of an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    /// 80% of a ceiling reached
    Warning,
    /// Ceiling reached or exceeded
    Danger,
}

impl AlertType {
    /// Database representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Danger => "danger",
        }
    }

    /// Threshold percentage that triggers this alert type
    #[must_use]
    pub const fn threshold(self) -> i32 {
        match self {
            Self::Warning => 80,
            Self::Danger => 100,
        }
    }
}

/// Granularity of an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    /// The overall monthly ceiling
    Total,
    /// A single category ceiling
    Category,
}

impl AlertLevel {
    /// Database representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Total => "total",
            Self::Category => "category",
        }
    }
}

/// A threshold-crossing notification, serialised as
/// `{type, level, category?, message, percentage}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAlert {
    /// Severity
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    /// Granularity
    pub level: AlertLevel,
    /// Category label for category-level alerts
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub category: Option<String>,
    /// Message shown to the user
    pub message: String,
    /// Usage percentage of the ceiling
    pub percentage: f64,
}

/// `spent / ceiling * 100`, with no special case for a zero ceiling
#[must_use]
pub fn usage_percentage(spent: f64, ceiling: f64) -> f64 {
    spent / ceiling * 100.0
}

fn total_alert(total_spent: f64, total_budget: f64) -> Option<BudgetAlert> {
    let percentage = usage_percentage(total_spent, total_budget);

    if percentage >= EXCEEDED_PERCENT {
        Some(BudgetAlert {
            alert_type: AlertType::Danger,
            level: AlertLevel::Total,
            category: None,
            message: format!(
                "You have exceeded your total monthly budget by {:.1}%",
                percentage - 100.0
            ),
            percentage,
        })
    } else if percentage >= WARNING_PERCENT {
        Some(BudgetAlert {
            alert_type: AlertType::Warning,
            level: AlertLevel::Total,
            category: None,
            message: format!("You have used {percentage:.1}% of your monthly budget"),
            percentage,
        })
    } else {
        None
    }
}

fn category_alert(entry: &mut category_budget::Model) -> Option<BudgetAlert> {
    let percentage = usage_percentage(entry.spent, entry.limit_amount);

    if percentage >= EXCEEDED_PERCENT && !entry.alert_sent_100 {
        entry.alert_sent_100 = true;
        Some(BudgetAlert {
            alert_type: AlertType::Danger,
            level: AlertLevel::Category,
            category: Some(entry.category.clone()),
            message: format!(
                "{} budget exceeded by {:.1}%",
                entry.category,
                percentage - 100.0
            ),
            percentage,
        })
    } else if (WARNING_PERCENT..EXCEEDED_PERCENT).contains(&percentage) && !entry.alert_sent_80 {
        entry.alert_sent_80 = true;
        Some(BudgetAlert {
            alert_type: AlertType::Warning,
            level: AlertLevel::Category,
            category: Some(entry.category.clone()),
            message: format!("{}: {percentage:.1}% of budget used", entry.category),
            percentage,
        })
    } else {
        None
    }
}

/// Evaluates the budget's totals and returns the alerts to show.
///
/// Mutates only the one-shot flags of the category entries that fire. The total-level
/// alert, if any, comes first, followed by category alerts in entry order.
pub fn evaluate_alerts(aggregate: &mut BudgetAggregate) -> Vec<BudgetAlert> {
    let mut alerts = Vec::new();

    if let Some(alert) = total_alert(aggregate.budget.total_spent, aggregate.budget.total_budget) {
        alerts.push(alert);
    }

    alerts.extend(aggregate.categories.iter_mut().filter_map(category_alert));
    alerts
}

async fn total_threshold_recorded<C>(
    db: &C,
    budget_id: i64,
    alert_type: AlertType,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let existing = BudgetAlertEntity::find()
        .filter(budget_alert::Column::BudgetId.eq(budget_id))
        .filter(budget_alert::Column::Level.eq(AlertLevel::Total.as_str()))
        .filter(budget_alert::Column::Threshold.eq(alert_type.threshold()))
        .one(db)
        .await?;
    Ok(existing.is_some())
}

/// Persists one-shot flags for the fired category alerts and appends each new threshold
/// crossing to the budget's alert history.
///
/// A total-level alert whose threshold is already in the history is returned to the
/// caller but not stored again.
pub async fn record_alerts<C>(
    db: &C,
    aggregate: &BudgetAggregate,
    alerts: &[BudgetAlert],
) -> Result<()>
where
    C: ConnectionTrait,
{
    let now = Utc::now();

    for alert in alerts {
        if alert.level == AlertLevel::Total
            && total_threshold_recorded(db, aggregate.budget.id, alert.alert_type).await?
        {
            continue;
        }

        if let Some(category) = &alert.category {
            let flag = match alert.alert_type {
                AlertType::Warning => category_budget::Column::AlertSent80,
                AlertType::Danger => category_budget::Column::AlertSent100,
            };
            CategoryBudget::update_many()
                .col_expr(flag, Expr::value(true))
                .filter(category_budget::Column::BudgetId.eq(aggregate.budget.id))
                .filter(category_budget::Column::Category.eq(category.as_str()))
                .exec(db)
                .await?;
        }

        budget_alert::ActiveModel {
            budget_id: Set(aggregate.budget.id),
            level: Set(alert.level.as_str().to_string()),
            category: Set(alert.category.clone()),
            alert_type: Set(alert.alert_type.as_str().to_string()),
            threshold: Set(alert.alert_type.threshold()),
            percentage: Set(alert.percentage),
            message: Set(alert.message.clone()),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(budget_id = aggregate.budget.id, "{}", alert.message);
    }

    Ok(())
}

/// Evaluates, records and returns alerts for the user's budget covering `today`.
///
/// Returns an empty list when the user has no budget for that month.
#[instrument(skip(db))]
pub async fn check_current_alerts(
    db: &DatabaseConnection,
    user_id: &str,
    today: NaiveDate,
) -> Result<Vec<BudgetAlert>> {
    let period = Period::of_day(today);
    let Some(budget) = Budget::find()
        .filter(budget::Column::UserId.eq(user_id))
        .filter(budget::Column::Month.eq(period.month))
        .filter(budget::Column::Year.eq(period.year))
        .one(db)
        .await?
    else {
        return Ok(Vec::new());
    };

    let mut aggregate = load_aggregate(db, budget).await?;
    let alerts = evaluate_alerts(&mut aggregate);
    record_alerts(db, &aggregate, &alerts).await?;
    Ok(alerts)
}

/// Retrieves the recorded alerts of a budget, oldest first.
pub async fn alert_history(
    db: &DatabaseConnection,
    budget_id: i64,
) -> Result<Vec<budget_alert::Model>> {
    BudgetAlertEntity::find()
        .filter(budget_alert::Column::BudgetId.eq(budget_id))
        .order_by_asc(budget_alert::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
