//! Data provider trait and structured acquisition errors.
//!
//! The `DataProvider` trait abstracts over remote market-data sources so the
//! acquisition adapter can be driven by a fixture in tests.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::interval::{Interval, Period};
use crate::table::TableError;

/// One bar as returned by a provider. Any field may be missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub timestamp: NaiveDateTime,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub adj_close: Option<f64>,
    pub volume: Option<f64>,
}

/// Structured errors for remote acquisition.
///
/// Displayable as-is in the CLI; none of them should end the session.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("HTTP {status} for {symbol}")]
    Http { status: u16, symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("data provider '{provider}' is not accepting requests right now")]
    Unavailable { provider: String },

    #[error("no data found for {symbols} in the selected period")]
    Empty { symbols: String },

    #[error("select at least one symbol")]
    NoSymbols,

    #[error("failed to build table: {0}")]
    Table(#[from] TableError),
}

/// Result of a successful fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub bars: Vec<RawBar>,
    /// Interval the provider actually served, which may differ from the request.
    pub interval: Interval,
    pub source: DataSource,
}

impl FetchResult {
    pub fn has_adj_close(&self) -> bool {
        self.bars.iter().any(|b| b.adj_close.is_some())
    }
}

/// Where a table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    FileUpload,
    Fixture,
}

/// Remote market-data source.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch bars for one symbol.
    fn fetch(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<FetchResult, AcquisitionError>;

    /// Whether the provider is currently accepting requests.
    fn is_available(&self) -> bool;
}
