//! Spending analytics.
//!
//! This module provides functions for the dashboard summary, month-over-month comparison,
//! daily expense trends and spending insights. All functions only look at non-deleted
//! transactions and return structured data for the caller to serialise.

use crate::{
    core::{category::TransactionKind, period::Period},
    entities::{Transaction, transaction},
    errors::{Error, Result},
};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use sea_orm::{QueryOrder, QuerySelect, prelude::*};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Sum and count of expenses in one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    /// Category label
    pub category: String,
    /// Sum of amounts
    pub total: f64,
    /// Number of transactions
    pub count: u64,
}

/// Income and expense totals for the dashboard month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    /// Sum of income
    pub total_income: f64,
    /// Sum of expenses
    pub total_expense: f64,
    /// Income minus expenses
    pub savings: f64,
    /// Number of income transactions
    pub income_count: u64,
    /// Number of expense transactions
    pub expense_count: u64,
}

/// Everything the dashboard shows for one month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    /// Month totals
    pub summary: DashboardSummary,
    /// Expense totals per category, largest first
    pub category_breakdown: Vec<CategoryTotal>,
    /// Latest transactions of the month, newest first
    pub recent_transactions: Vec<transaction::Model>,
}

/// One month of the month-over-month comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthComparison {
    /// Short month name, e.g. `"Jan"`
    pub month: String,
    /// Calendar year
    pub year: i32,
    /// Sum of income
    pub income: f64,
    /// Sum of expenses
    pub expense: f64,
    /// Income minus expenses
    pub savings: f64,
}

/// Expense total for one calendar day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotal {
    /// Day in `YYYY-MM-DD` form
    pub date: String,
    /// Sum of expenses
    pub total: f64,
    /// Number of expenses
    pub count: u64,
}

/// An observation about this month's spending
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Insight {
    /// Category spend rose by more than the threshold versus last month
    Increase {
        /// Category label
        category: String,
        /// Message shown to the user
        message: String,
        /// Percentage change
        percentage: f64,
        /// This month's total
        current_amount: f64,
        /// Last month's total
        previous_amount: f64,
    },
    /// Category spend fell by more than the threshold versus last month
    Decrease {
        /// Category label
        category: String,
        /// Message shown to the user
        message: String,
        /// Percentage change
        percentage: f64,
        /// This month's total
        current_amount: f64,
        /// Last month's total
        previous_amount: f64,
    },
    /// The category with the highest spend this month
    TopSpending {
        /// Category label
        category: String,
        /// Message shown to the user
        message: String,
        /// The category's total
        amount: f64,
    },
    /// Month expense total spread over the days of the month
    Average {
        /// Message shown to the user
        message: String,
        /// Average spend per day
        amount: f64,
    },
}

/// Groups expenses by category, largest total first.
///
/// Ties are ordered by category label.
#[must_use]
pub fn category_breakdown(expenses: &[transaction::Model]) -> Vec<CategoryTotal> {
    let mut totals: HashMap<&str, (f64, u64)> = HashMap::new();
    for expense in expenses {
        let entry = totals.entry(expense.category.as_str()).or_insert((0.0, 0));
        entry.0 += expense.amount;
        entry.1 += 1;
    }

    let mut breakdown: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category, (total, count))| CategoryTotal {
            category: category.to_string(),
            total,
            count,
        })
        .collect();
    breakdown.sort_by(|a, b| {
        b.total
            .total_cmp(&a.total)
            .then_with(|| a.category.cmp(&b.category))
    });
    breakdown
}

async fn transactions_between(
    db: &DatabaseConnection,
    user_id: &str,
    kind: Option<TransactionKind>,
    start: DateTime<Utc>,
    end_exclusive: Option<DateTime<Utc>>,
) -> Result<Vec<transaction::Model>> {
    let mut query = Transaction::find()
        .filter(transaction::Column::UserId.eq(user_id))
        .filter(transaction::Column::IsDeleted.eq(false))
        .filter(transaction::Column::Date.gte(start));
    if let Some(end) = end_exclusive {
        query = query.filter(transaction::Column::Date.lt(end));
    }
    if let Some(kind) = kind {
        query = query.filter(transaction::Column::TransactionType.eq(kind.as_str()));
    }

    query
        .order_by_desc(transaction::Column::Date)
        .order_by_desc(transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

fn is_kind(transaction: &transaction::Model, kind: TransactionKind) -> bool {
    transaction.transaction_type == kind.as_str()
}

/// Builds the dashboard for one month.
pub async fn dashboard(
    db: &DatabaseConnection,
    user_id: &str,
    period: Period,
    recent_limit: u64,
) -> Result<Dashboard> {
    let transactions = transactions_between(
        db,
        user_id,
        None,
        period.start(),
        Some(period.end_exclusive()),
    )
    .await?;

    let (income, expenses): (Vec<_>, Vec<_>) = transactions
        .iter()
        .cloned()
        .partition(|t| is_kind(t, TransactionKind::Income));
    let total_income: f64 = income.iter().fold(0.0, |acc, t| acc + t.amount);
    let total_expense: f64 = expenses.iter().fold(0.0, |acc, t| acc + t.amount);

    let recent_transactions = Transaction::find()
        .filter(transaction::Column::UserId.eq(user_id))
        .filter(transaction::Column::IsDeleted.eq(false))
        .filter(transaction::Column::Date.gte(period.start()))
        .filter(transaction::Column::Date.lt(period.end_exclusive()))
        .order_by_desc(transaction::Column::Date)
        .order_by_desc(transaction::Column::Id)
        .limit(recent_limit)
        .all(db)
        .await?;

    Ok(Dashboard {
        summary: DashboardSummary {
            total_income,
            total_expense,
            savings: total_income - total_expense,
            income_count: u64::try_from(income.len()).unwrap_or(u64::MAX),
            expense_count: u64::try_from(expenses.len()).unwrap_or(u64::MAX),
        },
        category_breakdown: category_breakdown(&expenses),
        recent_transactions,
    })
}

/// Longest window accepted by [`monthly_comparison`].
pub const MAX_COMPARISON_MONTHS: u32 = 120;

/// Income, expense and savings for the `months` months ending with the month of `today`,
/// oldest first.
pub async fn monthly_comparison(
    db: &DatabaseConnection,
    user_id: &str,
    months: u32,
    today: NaiveDate,
) -> Result<Vec<MonthComparison>> {
    if months > MAX_COMPARISON_MONTHS {
        return Err(Error::Validation {
            field: "months",
            message: format!("{months} exceeds the maximum of {MAX_COMPARISON_MONTHS}"),
        });
    }
    if months == 0 {
        return Ok(Vec::new());
    }

    let current = Period::of_day(today);
    let mut earliest = current;
    let mut periods = vec![current];
    for _ in 1..months {
        earliest = earliest.previous();
        periods.push(earliest);
    }
    periods.reverse();

    let transactions =
        transactions_between(db, user_id, None, earliest.start(), Some(current.end_exclusive()))
            .await?;

    let mut sums: HashMap<Period, (f64, f64)> = HashMap::new();
    for t in &transactions {
        let entry = sums.entry(Period::containing(t.date)).or_insert((0.0, 0.0));
        if is_kind(t, TransactionKind::Income) {
            entry.0 += t.amount;
        } else {
            entry.1 += t.amount;
        }
    }

    Ok(periods
        .into_iter()
        .map(|period| {
            let (income, expense) = sums.get(&period).copied().unwrap_or((0.0, 0.0));
            MonthComparison {
                month: period.short_name(),
                year: period.year,
                income,
                expense,
                savings: income - expense,
            }
        })
        .collect())
}

/// Daily expense totals for the `days` days before `now`, oldest first.
///
/// Days without expenses are omitted.
pub async fn expense_trends(
    db: &DatabaseConnection,
    user_id: &str,
    days: i64,
    now: DateTime<Utc>,
) -> Result<Vec<DailyTotal>> {
    if days < 0 {
        return Err(Error::Validation {
            field: "days",
            message: format!("{days} must not be negative"),
        });
    }

    let start = TimeDelta::try_days(days)
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| Error::Validation {
            field: "days",
            message: format!("{days} reaches outside the supported date range"),
        })?;
    let expenses =
        transactions_between(db, user_id, Some(TransactionKind::Expense), start, None).await?;

    let mut per_day: BTreeMap<NaiveDate, (f64, u64)> = BTreeMap::new();
    for expense in &expenses {
        let entry = per_day.entry(expense.date.date_naive()).or_insert((0.0, 0));
        entry.0 += expense.amount;
        entry.1 += 1;
    }

    Ok(per_day
        .into_iter()
        .map(|(day, (total, count))| DailyTotal {
            date: day.format("%Y-%m-%d").to_string(),
            total,
            count,
        })
        .collect())
}

/// Compares this month's category spend with last month's and summarises it.
///
/// Produces, in order: an increase or decrease insight for every category whose spend
/// changed by more than `change_threshold` percent (only where last month's spend was
/// positive), the top-spending category, and the average daily spend.
pub async fn spending_insights(
    db: &DatabaseConnection,
    user_id: &str,
    today: NaiveDate,
    change_threshold: f64,
) -> Result<Vec<Insight>> {
    let current = Period::of_day(today);
    let previous = current.previous();

    let expenses = transactions_between(
        db,
        user_id,
        Some(TransactionKind::Expense),
        previous.start(),
        Some(current.end_exclusive()),
    )
    .await?;
    let (this_month, last_month): (Vec<_>, Vec<_>) = expenses
        .into_iter()
        .partition(|t| current.contains(t.date));

    let current_totals = category_breakdown(&this_month);
    let previous_totals: HashMap<String, f64> = category_breakdown(&last_month)
        .into_iter()
        .map(|c| (c.category, c.total))
        .collect();

    let mut insights = Vec::new();
    for current_total in &current_totals {
        let previous_amount = previous_totals
            .get(&current_total.category)
            .copied()
            .unwrap_or(0.0);
        if previous_amount <= 0.0 {
            continue;
        }

        let change = (current_total.total - previous_amount) / previous_amount * 100.0;
        if change.abs() <= change_threshold {
            continue;
        }

        let category = current_total.category.clone();
        let direction = if change > 0.0 { "increased" } else { "decreased" };
        let message = format!(
            "Your {category} expenses {direction} by {:.1}% this month",
            change.abs()
        );
        insights.push(if change > 0.0 {
            Insight::Increase {
                category,
                message,
                percentage: change,
                current_amount: current_total.total,
                previous_amount,
            }
        } else {
            Insight::Decrease {
                category,
                message,
                percentage: change,
                current_amount: current_total.total,
                previous_amount,
            }
        });
    }

    if let Some(top) = current_totals.first() {
        insights.push(Insight::TopSpending {
            category: top.category.clone(),
            message: format!("{} is your highest expense category this month", top.category),
            amount: top.total,
        });
    }

    let month_total: f64 = current_totals.iter().fold(0.0, |acc, c| acc + c.total);
    let average = month_total / f64::from(current.days());
    insights.push(Insight::Average {
        message: format!("Your average daily spending is ${average:.2}"),
        amount: average,
    });

    Ok(insights)
}
