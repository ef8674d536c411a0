//! Yahoo Finance data provider.
//!
//! Fetches OHLCV bars from Yahoo's v8 chart API by range and interval. Handles
//! retries with exponential backoff, response parsing, and the circuit breaker.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.
//! File upload is the fallback when Yahoo is unavailable.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::circuit_breaker::CircuitBreaker;
use super::interval::{Interval, Period};
use super::provider::{AcquisitionError, DataProvider, DataSource, FetchResult, RawBar};
use crate::config::ProviderConfig;

#[derive(Debug, Deserialize)]
pub(crate) struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    data_granularity: Option<String>,
    #[serde(default)]
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooProvider {
    pub fn new(
        circuit_breaker: Arc<CircuitBreaker>,
        config: &ProviderConfig,
    ) -> Result<Self, AcquisitionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| AcquisitionError::NetworkUnreachable(e.to_string()))?;

        Ok(Self {
            client,
            circuit_breaker,
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
        })
    }

    /// Build the chart API URL for a symbol, range, and interval.
    fn chart_url(symbol: &str, period: Period, interval: Interval) -> String {
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
             ?range={period}&interval={interval}&includeAdjustedClose=true"
        )
    }

    /// Parse the chart API response into bars.
    pub(crate) fn parse_response(
        symbol: &str,
        requested: Interval,
        resp: ChartResponse,
    ) -> Result<FetchResult, AcquisitionError> {
        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) if err.code == "Not Found" => AcquisitionError::SymbolNotFound {
                symbol: symbol.to_string(),
            },
            Some(err) => {
                AcquisitionError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
            }
            None => AcquisitionError::ResponseFormatChanged("empty result with no error".into()),
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| AcquisitionError::ResponseFormatChanged("result array is empty".into()))?;

        let served = data
            .meta
            .as_ref()
            .and_then(|m| m.data_granularity.as_deref())
            .and_then(|g| g.parse::<Interval>().ok())
            .unwrap_or(requested);
        let offset = ChronoDuration::seconds(data.meta.as_ref().and_then(|m| m.gmtoffset).unwrap_or(0));

        // A valid symbol with no trading in range comes back without timestamps.
        let timestamps = data.timestamp.unwrap_or_default();
        let quote = data.indicators.quote.into_iter().next().unwrap_or_default();
        let adj_closes = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose);

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let timestamp: NaiveDateTime = DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc() + offset)
                .ok_or_else(|| {
                    AcquisitionError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let bar = RawBar {
                timestamp,
                open: quote.open.get(i).copied().flatten(),
                high: quote.high.get(i).copied().flatten(),
                low: quote.low.get(i).copied().flatten(),
                close: quote.close.get(i).copied().flatten(),
                adj_close: adj_closes.as_ref().and_then(|v| v.get(i).copied().flatten()),
                volume: quote.volume.get(i).copied().flatten(),
            };

            // Holidays and halted sessions come back as all-null rows.
            if bar.open.is_none()
                && bar.high.is_none()
                && bar.low.is_none()
                && bar.close.is_none()
                && bar.volume.is_none()
            {
                continue;
            }
            bars.push(bar);
        }

        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars,
            interval: served,
            source: DataSource::YahooFinance,
        })
    }

    /// Execute a single HTTP request with retry and circuit breaker logic.
    fn fetch_with_retry(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<FetchResult, AcquisitionError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(AcquisitionError::CircuitBreakerTripped);
        }

        let url = Self::chart_url(symbol, period, interval);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                debug!(symbol, attempt, ?delay, "retrying");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(AcquisitionError::CircuitBreakerTripped);
            }

            let resp = match self.client.get(&url).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    last_error = Some(AcquisitionError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(AcquisitionError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();
            if status == reqwest::StatusCode::FORBIDDEN {
                self.circuit_breaker.trip();
                return Err(AcquisitionError::CircuitBreakerTripped);
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.circuit_breaker.record_failure();
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                warn!(symbol, retry_after, "rate limited");
                last_error = Some(AcquisitionError::RateLimited {
                    retry_after_secs: retry_after,
                });
                continue;
            }

            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(AcquisitionError::SymbolNotFound {
                    symbol: symbol.to_string(),
                });
            }

            if !status.is_success() {
                self.circuit_breaker.record_failure();
                last_error = Some(AcquisitionError::Http {
                    status: status.as_u16(),
                    symbol: symbol.to_string(),
                });
                continue;
            }

            let chart: ChartResponse = resp.json().map_err(|e| {
                AcquisitionError::ResponseFormatChanged(format!(
                    "failed to parse response for {symbol}: {e}"
                ))
            })?;

            let fetched = Self::parse_response(symbol, interval, chart)?;
            self.circuit_breaker.record_success();
            info!(symbol, bars = fetched.bars.len(), interval = %fetched.interval, "fetched");
            return Ok(fetched);
        }

        Err(last_error.unwrap_or_else(|| AcquisitionError::NetworkUnreachable("max retries exceeded".into())))
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<FetchResult, AcquisitionError> {
        self.fetch_with_retry(symbol, period, interval)
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}
