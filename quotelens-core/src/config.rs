//! TOML configuration.
//!
//! Every field has a default, so an empty file (or no file) is a valid config.
//!
//! ```toml
//! stats_scope = "per_symbol"
//!
//! [defaults]
//! period = "6mo"
//! interval = "1h"
//!
//! [interval_policy]
//! intraday_limit_days = 60
//! restricted_periods = ["1mo", "3mo", "6mo", "1y", "2y", "5y", "10y", "ytd", "max"]
//!
//! [export]
//! dir = "exports"
//! prefix = "market_data"
//! sheet_name = "Market Data"
//!
//! [[catalog]]
//! label = "Apple (AAPL)"
//! ticker = "AAPL"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::data::{Catalog, Interval, IntervalPolicy, Period};

/// How statistics are grouped when several symbols were fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsScope {
    /// Treat the flattened table as one; the first matching column per role wins.
    #[default]
    Pooled,
    /// Run role inference separately for each symbol's columns.
    PerSymbol,
}

/// Default fetch parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchDefaults {
    pub period: Period,
    pub interval: Interval,
}

impl Default for FetchDefaults {
    fn default() -> Self {
        Self {
            period: Period::OneYear,
            interval: Interval::OneDay,
        }
    }
}

/// Remote provider knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            base_delay_ms: 500,
        }
    }
}

/// Export destination and naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub dir: PathBuf,
    pub prefix: String,
    pub sheet_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("exports"),
            prefix: "market_data".to_string(),
            sheet_name: "Market Data".to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteLensConfig {
    pub stats_scope: StatsScope,
    pub defaults: FetchDefaults,
    pub interval_policy: IntervalPolicy,
    pub provider: ProviderConfig,
    pub export: ExportConfig,
    pub catalog: Catalog,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl QuoteLensConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}
