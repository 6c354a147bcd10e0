//! Core business logic - framework-agnostic budget, transaction and analytics operations.

/// Income and expense categories
pub mod category;
/// Calendar-month arithmetic
pub mod period;

/// Threshold alert evaluation and history
pub mod alerts;
/// Spending analytics
pub mod analytics;
/// Monthly budgets and their category ceilings
pub mod budget;
/// Spend-total recalculation and incremental adjustment
pub mod reconcile;
/// Per-user current-month reports
pub mod report;
/// Transaction recording, editing and soft deletion
pub mod transaction;
