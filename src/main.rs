use budget_buddy::{
    config::{database, settings},
    core::{
        budget::{BudgetHealth, budget_status},
        reconcile::resync_all_budgets,
        report::spending_report,
    },
    errors::Result,
};
use chrono::Utc;
use dotenvy::dotenv;
use std::collections::BTreeSet;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the application settings
    let app_settings = settings::load_default_settings()
        .inspect_err(|e| error!("Failed to load settings: {e}"))?;
    info!(?app_settings, "Loaded settings");

    // 4. Connect and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db).await?;

    // 5. Rebuild every budget's spend totals from its transactions
    let budgets = resync_all_budgets(&db)
        .await
        .inspect_err(|e| error!("Budget resynchronisation failed: {e}"))?;

    for aggregate in &budgets {
        let status = budget_status(aggregate);
        let budget = &aggregate.budget;
        match status.status {
            BudgetHealth::Exceeded => warn!(
                user_id = %budget.user_id,
                "{}-{:02} exceeded: spent {:.2} of {:.2}",
                budget.year, budget.month, budget.total_spent, budget.total_budget
            ),
            BudgetHealth::Warning => info!(
                user_id = %budget.user_id,
                "{}-{:02} at {:.1}% of budget",
                budget.year, budget.month, status.percentage
            ),
            BudgetHealth::Good => {}
        }
    }

    info!("Reconciled {} budgets", budgets.len());

    // 6. Build each user's current-month report with the configured windows
    let now = Utc::now();
    let users: BTreeSet<&str> = budgets.iter().map(|a| a.budget.user_id.as_str()).collect();
    for user_id in users {
        let report = spending_report(&db, user_id, &app_settings, now)
            .await
            .inspect_err(|e| error!(user_id, "Failed to build report: {e}"))?;
        info!(
            user_id,
            spent = report.budget.budget.total_spent,
            ceiling = report.budget.budget.total_budget,
            alerts = report.alerts.len(),
            insights = report.insights.len(),
            "Current month report"
        );
    }

    Ok(())
}
