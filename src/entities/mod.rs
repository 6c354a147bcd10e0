//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod budget;
pub mod budget_alert;
pub mod category_budget;
pub mod transaction;

// Re-export specific types to avoid conflicts
pub use budget::{Column as BudgetColumn, Entity as Budget, Model as BudgetModel};
pub use budget_alert::{
    Column as BudgetAlertColumn, Entity as BudgetAlert, Model as BudgetAlertModel,
};
pub use category_budget::{
    Column as CategoryBudgetColumn, Entity as CategoryBudget, Model as CategoryBudgetModel,
};
pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
};
