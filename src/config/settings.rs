//! Application settings loading from config.toml
//!
//! Settings tune the defaults used by the budget and analytics operations. Every field
//! is optional in the file; a missing file means all defaults apply.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Environment variable naming an alternative settings file
pub const CONFIG_PATH_ENV: &str = "BUDGET_BUDDY_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Ceiling used when the current month's budget is created on first access
    pub default_monthly_budget: f64,
    /// Number of recent transactions shown on the dashboard
    pub recent_transactions_limit: u64,
    /// Number of months in the month-over-month comparison
    pub comparison_months: u32,
    /// Number of days covered by the daily expense trend
    pub trend_days: i64,
    /// Minimum absolute percentage change that produces a category insight
    pub insight_change_threshold: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_monthly_budget: 0.0,
            recent_transactions_limit: 10,
            comparison_months: 6,
            trend_days: 30,
            insight_change_threshold: 10.0,
        }
    }
}

/// Loads settings from a TOML file, falling back to defaults when the file is absent.
///
/// # Errors
/// Returns [`Error::Io`] if the file exists but cannot be read, and [`Error::Config`] if
/// it cannot be parsed.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    if !path.exists() {
        info!("No settings file at {}, using defaults", path.display());
        return Ok(Settings::default());
    }

    debug!("Loading settings from {}", path.display());
    let contents = std::fs::read_to_string(path)?;

    parse_settings(&contents)
}

/// Parses settings from TOML text.
pub fn parse_settings(contents: &str) -> Result<Settings> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads settings from `BUDGET_BUDDY_CONFIG`, or ./config.toml when unset
pub fn load_default_settings() -> Result<Settings> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_settings(path)
}
