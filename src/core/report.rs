//! Report generation business logic.
//!
//! [`spending_report`] gathers everything a user sees for the current month: the lazily
//! created budget with its status and alerts, the dashboard, and the comparison, trend and
//! insight windows. All sizes and thresholds come from [`Settings`].

use crate::{
    config::settings::Settings,
    core::{
        alerts::{BudgetAlert, evaluate_alerts, record_alerts},
        analytics::{
            DailyTotal, Dashboard, Insight, MonthComparison, dashboard, expense_trends,
            monthly_comparison, spending_insights,
        },
        budget::{BudgetAggregate, BudgetStatus, budget_status, get_or_create_current_budget},
        period::Period,
    },
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tracing::instrument;

/// Current-month overview for one user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendingReport {
    /// The current month's budget, created on first access
    pub budget: BudgetAggregate,
    /// Usage summary of the budget
    pub status: BudgetStatus,
    /// Alerts raised by the current totals
    pub alerts: Vec<BudgetAlert>,
    /// Current-month totals and recent transactions
    pub dashboard: Dashboard,
    /// Month-over-month totals, oldest first
    pub comparison: Vec<MonthComparison>,
    /// Daily expense totals, oldest first
    pub trends: Vec<DailyTotal>,
    /// Category change, top-spending and average insights
    pub insights: Vec<Insight>,
}

/// Generates the current-month report for a user.
///
/// Creates the month's budget with `settings.default_monthly_budget` when it does not
/// exist yet, and records any alerts it raises.
#[instrument(skip(db, settings))]
pub async fn spending_report(
    db: &DatabaseConnection,
    user_id: &str,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<SpendingReport> {
    let today = now.date_naive();

    let mut budget =
        get_or_create_current_budget(db, user_id, today, settings.default_monthly_budget)
            .await?;
    let alerts = evaluate_alerts(&mut budget);
    record_alerts(db, &budget, &alerts).await?;
    let status = budget_status(&budget);

    let dashboard = dashboard(
        db,
        user_id,
        Period::of_day(today),
        settings.recent_transactions_limit,
    )
    .await?;
    let comparison = monthly_comparison(db, user_id, settings.comparison_months, today).await?;
    let trends = expense_trends(db, user_id, settings.trend_days, now).await?;
    let insights =
        spending_insights(db, user_id, today, settings.insight_change_threshold).await?;

    Ok(SpendingReport {
        budget,
        status,
        alerts,
        dashboard,
        comparison,
        trends,
        insights,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::{alerts::AlertType, budget::BudgetHealth};
    use crate::errors::Error;
    use crate::test_utils::*;
    use chrono::TimeZone;

    fn settings() -> Settings {
        Settings {
            default_monthly_budget: 1000.0,
            recent_transactions_limit: 1,
            comparison_months: 3,
            trend_days: 5,
            insight_change_threshold: 10.0,
        }
    }

    #[tokio::test]
    async fn test_spending_report_uses_settings() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_expense(&db, "user1", "Rent", 850.0, utc(2024, 3, 1)).await?;
        create_test_expense(&db, "user1", "Groceries", 40.0, utc(2024, 3, 18)).await?;
        let now = Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap();

        let report = spending_report(&db, "user1", &settings(), now).await?;

        assert_eq!(report.budget.budget.total_budget, 1000.0);
        assert_eq!(report.budget.budget.total_spent, 890.0);
        assert_eq!(report.status.status, BudgetHealth::Warning);
        assert_eq!(report.alerts.len(), 1);
        assert_eq!(report.alerts[0].alert_type, AlertType::Warning);

        assert_eq!(report.dashboard.recent_transactions.len(), 1);
        assert_eq!(report.dashboard.summary.total_expense, 890.0);
        assert_eq!(report.comparison.len(), 3);
        assert_eq!(report.comparison[2].expense, 890.0);
        // Only the groceries expense falls inside the five-day window
        assert_eq!(report.trends.len(), 1);
        assert_eq!(report.trends[0].date, "2024-03-18");
        assert!(matches!(report.insights.last(), Some(Insight::Average { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_spending_report_reuses_existing_budget() -> Result<()> {
        let db = setup_test_db().await?;
        let created =
            create_test_budget(&db, "user1", 2024, 3, 5000.0, &[("Travel", 100.0)]).await?;
        let now = Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap();

        let report = spending_report(&db, "user1", &settings(), now).await?;

        assert_eq!(report.budget.budget.id, created.budget.id);
        assert_eq!(report.budget.budget.total_budget, 5000.0);
        assert_eq!(report.status.status, BudgetHealth::Good);
        assert!(report.alerts.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_spending_report_rejects_invalid_window() -> Result<()> {
        let db = setup_test_db().await?;
        let now = Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap();
        let settings = Settings {
            trend_days: -1,
            ..settings()
        };

        let result = spending_report(&db, "user1", &settings, now).await;
        assert!(matches!(result, Err(Error::Validation { field: "days", .. })));

        Ok(())
    }
}
