//! Budget reconciliation - keeps running spend totals in step with transactions.
//!
//! Two procedures maintain `budgets.total_spent` and `category_budgets.spent`:
//!
//! - [`recalculate_budget_spent`] re-derives both from the live set of non-deleted expense
//!   transactions for the budget's user and month. It is idempotent and touches only the
//!   in-memory aggregate; callers persist it.
//! - [`apply_spend_delta`] adjusts the totals of the budget covering a transaction's month
//!   by a signed amount. A missing budget is a no-op, and totals are never clamped.
//!
//! Full recalculation is the correction path whenever the incremental totals drift.

use crate::{
    core::{
        budget::{BudgetAggregate, load_aggregate, save_aggregate},
        category::TransactionKind,
        period::Period,
    },
    entities::{Budget, CategoryBudget, Transaction, budget, category_budget, transaction},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, prelude::*, sea_query::Expr};
use tracing::{debug, info, instrument};

/// Fetches the user's non-deleted expense transactions dated inside `period`.
pub async fn expenses_in_period<C>(
    db: &C,
    user_id: &str,
    period: Period,
) -> Result<Vec<transaction::Model>>
where
    C: ConnectionTrait,
{
    Transaction::find()
        .filter(transaction::Column::UserId.eq(user_id))
        .filter(transaction::Column::TransactionType.eq(TransactionKind::Expense.as_str()))
        .filter(transaction::Column::IsDeleted.eq(false))
        .filter(transaction::Column::Date.gte(period.start()))
        .filter(transaction::Column::Date.lt(period.end_exclusive()))
        .order_by_asc(transaction::Column::Date)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Sets `total_spent` and every category's `spent` from the given expenses.
///
/// Categories without matching expenses end up at zero.
pub fn apply_expense_totals(aggregate: &mut BudgetAggregate, expenses: &[transaction::Model]) {
    aggregate.budget.total_spent = expenses.iter().fold(0.0, |acc, t| acc + t.amount);

    for entry in &mut aggregate.categories {
        entry.spent = expenses
            .iter()
            .filter(|t| t.category == entry.category)
            .fold(0.0, |acc, t| acc + t.amount);
    }
}

/// Re-derives the aggregate's spend totals from the database without persisting them.
///
/// Safe to call repeatedly: the totals are replaced, never accumulated.
#[instrument(skip(db, aggregate), fields(budget_id = aggregate.budget.id))]
pub async fn recalculate_budget_spent<C>(db: &C, aggregate: &mut BudgetAggregate) -> Result<()>
where
    C: ConnectionTrait,
{
    let expenses = expenses_in_period(db, &aggregate.budget.user_id, aggregate.period()).await?;
    apply_expense_totals(aggregate, &expenses);
    debug!(
        expense_count = expenses.len(),
        total_spent = aggregate.budget.total_spent,
        "Recalculated budget spend"
    );
    Ok(())
}

/// Adds `amount_delta` to the spend totals of the budget covering `date`.
///
/// The budget is looked up by the user and the calendar month containing `date`. When no
/// budget exists nothing happens and `Ok(false)` is returned. Otherwise `total_spent` is
/// incremented and, if an entry for `category` exists, so is its `spent`.
///
/// Both increments are single `UPDATE ... SET x = x + delta` statements, so concurrent
/// adjustments to the same budget do not lose updates.
#[instrument(skip(db))]
pub async fn apply_spend_delta<C>(
    db: &C,
    user_id: &str,
    category: &str,
    amount_delta: f64,
    date: DateTime<Utc>,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let period = Period::containing(date);

    let Some(budget) = Budget::find()
        .filter(budget::Column::UserId.eq(user_id))
        .filter(budget::Column::Month.eq(period.month))
        .filter(budget::Column::Year.eq(period.year))
        .one(db)
        .await?
    else {
        debug!("No budget for {}-{:02}, skipping adjustment", period.year, period.month);
        return Ok(false);
    };

    Budget::update_many()
        .col_expr(
            budget::Column::TotalSpent,
            Expr::col(budget::Column::TotalSpent).add(amount_delta),
        )
        .col_expr(budget::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(budget::Column::Id.eq(budget.id))
        .exec(db)
        .await?;

    let updated = CategoryBudget::update_many()
        .col_expr(
            category_budget::Column::Spent,
            Expr::col(category_budget::Column::Spent).add(amount_delta),
        )
        .filter(category_budget::Column::BudgetId.eq(budget.id))
        .filter(category_budget::Column::Category.eq(category))
        .exec(db)
        .await?;

    debug!(
        budget_id = budget.id,
        category_matched = updated.rows_affected > 0,
        "Applied spend delta"
    );
    Ok(true)
}

/// Recalculates and persists one budget's spend totals.
#[instrument(skip(db))]
pub async fn resync_budget(db: &DatabaseConnection, budget_id: i64) -> Result<BudgetAggregate> {
    let budget = Budget::find_by_id(budget_id)
        .one(db)
        .await?
        .ok_or(Error::BudgetIdNotFound { id: budget_id })?;

    let mut aggregate = load_aggregate(db, budget).await?;
    recalculate_budget_spent(db, &mut aggregate).await?;
    save_aggregate(db, &aggregate).await?;
    Ok(aggregate)
}

/// Recalculates and persists the spend totals of every stored budget.
#[instrument(skip(db))]
pub async fn resync_all_budgets(db: &DatabaseConnection) -> Result<Vec<BudgetAggregate>> {
    let budgets = Budget::find()
        .order_by_asc(budget::Column::Id)
        .all(db)
        .await?;

    let mut results = Vec::with_capacity(budgets.len());
    for budget in budgets {
        let mut aggregate = load_aggregate(db, budget).await?;
        recalculate_budget_spent(db, &mut aggregate).await?;
        save_aggregate(db, &aggregate).await?;
        results.push(aggregate);
    }

    info!("Resynchronised {} budgets", results.len());
    Ok(results)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::transaction::{TransactionUpdate, delete_transaction, update_transaction};
    use crate::test_utils::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_recalculate_sums_expenses_by_category() -> Result<()> {
        let db = setup_test_db().await?;
        let categories = [("Groceries", 300.0), ("Travel", 200.0)];
        let mut aggregate = create_test_budget(&db, "user1", 2024, 3, 1000.0, &categories).await?;

        create_test_expense(&db, "user1", "Groceries", 40.0, utc(2024, 3, 2)).await?;
        create_test_expense(&db, "user1", "Groceries", 60.0, utc(2024, 3, 20)).await?;
        create_test_expense(&db, "user1", "Rent", 500.0, utc(2024, 3, 1)).await?;

        recalculate_budget_spent(&db, &mut aggregate).await?;

        assert_eq!(aggregate.budget.total_spent, 600.0);
        assert_eq!(aggregate.category("Groceries").unwrap().spent, 100.0);
        assert_eq!(aggregate.category("Travel").unwrap().spent, 0.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_recalculate_ignores_income_deleted_other_users_and_months() -> Result<()> {
        let db = setup_test_db().await?;
        let mut aggregate =
            create_test_budget(&db, "user1", 2024, 3, 1000.0, &[("Groceries", 300.0)]).await?;

        create_test_expense(&db, "user1", "Groceries", 25.0, utc(2024, 3, 15)).await?;
        create_test_income(&db, "user1", "Salary", 4000.0, utc(2024, 3, 1)).await?;
        create_test_expense(&db, "user2", "Groceries", 70.0, utc(2024, 3, 15)).await?;
        create_test_expense(&db, "user1", "Groceries", 90.0, utc(2024, 2, 29)).await?;
        create_test_expense(&db, "user1", "Groceries", 80.0, utc(2024, 4, 1)).await?;
        let deleted = create_test_expense(&db, "user1", "Groceries", 10.0, utc(2024, 3, 5)).await?;
        delete_transaction(&db, "user1", deleted.id).await?;

        recalculate_budget_spent(&db, &mut aggregate).await?;

        assert_eq!(aggregate.budget.total_spent, 25.0);
        assert_eq!(aggregate.category("Groceries").unwrap().spent, 25.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_recalculate_empty_month_is_positive_zero() -> Result<()> {
        let db = setup_test_db().await?;
        let mut aggregate =
            create_test_budget(&db, "user1", 2024, 3, 1000.0, &[("Groceries", 300.0)]).await?;

        recalculate_budget_spent(&db, &mut aggregate).await?;

        assert_eq!(aggregate.budget.total_spent, 0.0);
        assert!(aggregate.budget.total_spent.is_sign_positive());
        let groceries = aggregate.category("Groceries").unwrap();
        assert!(groceries.spent.is_sign_positive());

        Ok(())
    }

    #[tokio::test]
    async fn test_recalculate_includes_last_second_of_month() -> Result<()> {
        let db = setup_test_db().await?;
        let mut aggregate =
            create_test_budget(&db, "user1", 2024, 3, 1000.0, &[("Travel", 300.0)]).await?;
        let last_second = Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 59).unwrap();
        let next_month = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();

        create_test_expense(&db, "user1", "Travel", 45.0, last_second).await?;
        create_test_expense(&db, "user1", "Travel", 70.0, next_month).await?;

        recalculate_budget_spent(&db, &mut aggregate).await?;

        assert_eq!(aggregate.budget.total_spent, 45.0);
        assert_eq!(aggregate.category("Travel").unwrap().spent, 45.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_recalculate_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let mut aggregate =
            create_test_budget(&db, "user1", 2024, 3, 500.0, &[("Shopping", 100.0)]).await?;
        create_test_expense(&db, "user1", "Shopping", 45.5, utc(2024, 3, 9)).await?;

        recalculate_budget_spent(&db, &mut aggregate).await?;
        let first = aggregate.clone();
        recalculate_budget_spent(&db, &mut aggregate).await?;

        assert_eq!(first, aggregate);
        assert_eq!(aggregate.budget.total_spent, 45.5);

        Ok(())
    }

    #[tokio::test]
    async fn test_apply_spend_delta_without_budget_is_noop() -> Result<()> {
        let db = setup_test_db().await?;

        let applied = apply_spend_delta(&db, "user1", "Travel", 50.0, utc(2024, 5, 1)).await?;
        assert!(!applied);

        Ok(())
    }

    #[tokio::test]
    async fn test_apply_spend_delta_updates_total_and_category() -> Result<()> {
        let db = setup_test_db().await?;
        let created =
            create_test_budget(&db, "user1", 2024, 5, 1000.0, &[("Travel", 200.0)]).await?;

        assert!(apply_spend_delta(&db, "user1", "Travel", 50.0, utc(2024, 5, 10)).await?);
        assert!(apply_spend_delta(&db, "user1", "Rent", 20.0, utc(2024, 5, 11)).await?);

        let stored = reload_budget(&db, created.budget.id).await?;
        assert_eq!(stored.budget.total_spent, 70.0);
        assert_eq!(stored.category("Travel").unwrap().spent, 50.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_apply_spend_delta_allows_negative_totals() -> Result<()> {
        let db = setup_test_db().await?;
        let created =
            create_test_budget(&db, "user1", 2024, 5, 100.0, &[("Travel", 50.0)]).await?;

        apply_spend_delta(&db, "user1", "Travel", -30.0, utc(2024, 5, 3)).await?;

        let stored = reload_budget(&db, created.budget.id).await?;
        assert_eq!(stored.budget.total_spent, -30.0);
        assert_eq!(stored.category("Travel").unwrap().spent, -30.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_incremental_matches_full_recalculation() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_test_budget(
            &db,
            "user1",
            2024,
            6,
            2000.0,
            &[("Groceries", 400.0), ("Entertainment", 150.0)],
        )
        .await?;

        let a = create_test_expense(&db, "user1", "Groceries", 120.0, utc(2024, 6, 1)).await?;
        let b = create_test_expense(&db, "user1", "Entertainment", 30.0, utc(2024, 6, 2)).await?;
        let c = create_test_expense(&db, "user1", "Shopping", 75.0, utc(2024, 6, 3)).await?;
        create_test_income(&db, "user1", "Salary", 3000.0, utc(2024, 6, 1)).await?;

        update_transaction(
            &db,
            "user1",
            a.id,
            TransactionUpdate {
                amount: Some(140.0),
                category: Some("Entertainment".to_string()),
                ..Default::default()
            },
        )
        .await?;
        update_transaction(
            &db,
            "user1",
            b.id,
            TransactionUpdate {
                kind: Some(TransactionKind::Income),
                category: Some("Freelance".to_string()),
                ..Default::default()
            },
        )
        .await?;
        delete_transaction(&db, "user1", c.id).await?;

        let incremental = reload_budget(&db, created.budget.id).await?;
        let mut full = incremental.clone();
        recalculate_budget_spent(&db, &mut full).await?;

        assert_eq!(incremental.budget.total_spent, 140.0);
        assert_eq!(full.budget.total_spent, incremental.budget.total_spent);
        for (inc, rec) in incremental.categories.iter().zip(&full.categories) {
            assert_eq!(inc.spent, rec.spent, "category {}", inc.category);
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_resync_budget_repairs_drift() -> Result<()> {
        let db = setup_test_db().await?;
        let created =
            create_test_budget(&db, "user1", 2024, 7, 800.0, &[("Rent", 600.0)]).await?;
        create_test_expense(&db, "user1", "Rent", 600.0, utc(2024, 7, 1)).await?;

        // Simulate a lost adjustment
        apply_spend_delta(&db, "user1", "Rent", 999.0, utc(2024, 7, 1)).await?;

        let repaired = resync_budget(&db, created.budget.id).await?;
        assert_eq!(repaired.budget.total_spent, 600.0);

        let stored = reload_budget(&db, created.budget.id).await?;
        assert_eq!(stored.budget.total_spent, 600.0);
        assert_eq!(stored.category("Rent").unwrap().spent, 600.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_resync_budget_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let result = resync_budget(&db, 42).await;
        assert!(matches!(result, Err(Error::BudgetIdNotFound { id: 42 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_resync_all_budgets() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_budget(&db, "user1", 2024, 1, 100.0, &[]).await?;
        create_test_budget(&db, "user2", 2024, 1, 100.0, &[]).await?;
        create_test_expense(&db, "user2", "Travel", 10.0, utc(2024, 1, 31)).await?;

        let results = resync_all_budgets(&db).await?;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].budget.total_spent, 0.0);
        assert_eq!(results[1].budget.total_spent, 10.0);

        Ok(())
    }
}
