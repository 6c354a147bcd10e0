//! Transaction kinds and the closed set of categories.
//!
//! Categories are stored as their display label (e.g. `"Food & Dining"`) in both
//! transactions and category budgets. Reconciliation and alerting treat the label as an
//! opaque key; only boundary validation interprets it.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether a transaction brings money in or takes it out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money received
    Income,
    /// Money spent; the only kind that counts against budgets
    Expense,
}

impl TransactionKind {
    /// Database and wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(Error::Validation {
                field: "type",
                message: format!("'{other}' is not one of income, expense"),
            }),
        }
    }
}

macro_rules! categories {
    ($( $variant:ident => $label:literal, $kind:ident; )*) => {
        /// Every category a transaction or category budget may use
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Category {
            $(
                #[doc = $label]
                $variant,
            )*
        }

        impl Category {
            /// All categories, expenses first
            pub const ALL: &'static [Self] = &[$(Self::$variant),*];

            /// Label stored in the database
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)*
                }
            }

            /// Transaction kind this category belongs to
            #[must_use]
            pub const fn kind(self) -> TransactionKind {
                match self {
                    $(Self::$variant => TransactionKind::$kind,)*
                }
            }
        }

        impl FromStr for Category {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($label => Ok(Self::$variant),)*
                    other => Err(Error::Validation {
                        field: "category",
                        message: format!("unknown category '{other}'"),
                    }),
                }
            }
        }
    };
}

categories! {
    FoodAndDining => "Food & Dining", Expense;
    Transportation => "Transportation", Expense;
    Shopping => "Shopping", Expense;
    Entertainment => "Entertainment", Expense;
    BillsAndUtilities => "Bills & Utilities", Expense;
    Healthcare => "Healthcare", Expense;
    Education => "Education", Expense;
    Travel => "Travel", Expense;
    Rent => "Rent", Expense;
    Insurance => "Insurance", Expense;
    Groceries => "Groceries", Expense;
    PersonalCare => "Personal Care", Expense;
    GiftsAndDonations => "Gifts & Donations", Expense;
    OtherExpense => "Other Expense", Expense;
    Salary => "Salary", Income;
    Freelance => "Freelance", Income;
    Business => "Business", Income;
    Investment => "Investment", Income;
    RentalIncome => "Rental Income", Income;
    OtherIncome => "Other Income", Income;
}

impl Category {
    /// Categories available for the given transaction kind
    pub fn for_kind(kind: TransactionKind) -> impl Iterator<Item = Self> {
        Self::ALL.iter().copied().filter(move |c| c.kind() == kind)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Category {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(serde::de::Error::custom)
    }
}

/// Parses a category label and checks that it belongs to `kind`.
pub fn parse_category_for(kind: TransactionKind, label: &str) -> Result<Category> {
    let category: Category = label.parse()?;
    if category.kind() != kind {
        return Err(Error::Validation {
            field: "category",
            message: format!("'{label}' is not a valid {kind} category"),
        });
    }
    Ok(category)
}
