//! End-to-end pipeline tests driven by a fixture provider.
//!
//! Tests:
//! 1. Multi-symbol fetch normalizes to unique flat identifiers with a Date axis
//! 2. Standard market columns auto-detect; an Adj Close override wins
//! 3. Long-period intraday requests are coerced to daily with a warning
//! 4. Empty results, unknown symbols and an unavailable provider surface as
//!    acquisition errors
//! 5. A table with no role candidates yields the empty state, not an error
//! 6. An override naming a missing column falls back to auto-detection
//! 7. Per-symbol scope analyzes each symbol's columns separately

use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;

use quotelens_core::config::{QuoteLensConfig, StatsScope};
use quotelens_core::data::{
    AcquisitionError, DataProvider, DataSource, FetchResult, FileFormat, Interval, Period, RawBar,
};
use quotelens_core::normalize::AxisOrigin;
use quotelens_core::roles::{Role, RoleOverrides};
use quotelens_core::session::{Analysis, PipelineError, Session, Source};

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

struct FixtureProvider {
    bars: HashMap<String, Vec<RawBar>>,
    available: bool,
}

impl FixtureProvider {
    fn new(symbols: &[(&str, usize, f64)]) -> Self {
        let bars = symbols
            .iter()
            .map(|(symbol, n, base)| (symbol.to_string(), make_bars(*n, *base)))
            .collect();
        Self {
            bars,
            available: true,
        }
    }

    fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }
}

impl DataProvider for FixtureProvider {
    fn name(&self) -> &str {
        "fixture"
    }

    fn fetch(
        &self,
        symbol: &str,
        _period: Period,
        interval: Interval,
    ) -> Result<FetchResult, AcquisitionError> {
        let bars = self
            .bars
            .get(symbol)
            .cloned()
            .ok_or_else(|| AcquisitionError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?;
        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars,
            interval,
            source: DataSource::Fixture,
        })
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

/// N daily bars starting 2024-01-02, close rising by 1.0 per bar.
fn make_bars(n: usize, base: f64) -> Vec<RawBar> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    (0..n)
        .map(|i| {
            let close = base + i as f64;
            RawBar {
                timestamp: (start + chrono::Duration::days(i as i64))
                    .and_hms_opt(14, 30, 0)
                    .unwrap(),
                open: Some(close - 0.5),
                high: Some(close + 1.0),
                low: Some(close - 1.0),
                close: Some(close),
                adj_close: Some(close - 0.25),
                volume: Some(1_000.0 + i as f64),
            }
        })
        .collect()
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
}

fn session(provider: FixtureProvider, scope: StatsScope) -> Session {
    let config = QuoteLensConfig {
        stats_scope: scope,
        ..QuoteLensConfig::default()
    };
    Session::new(config).with_provider(Arc::new(provider))
}

fn remote(symbols: &[&str], period: Period, interval: Interval) -> Source {
    Source::Remote {
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        period,
        interval,
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[test]
fn multi_symbol_fetch_normalizes_to_flat_identifiers() {
    let provider = FixtureProvider::new(&[("AAPL", 5, 100.0), ("MSFT", 3, 300.0)]);
    let snapshot = session(provider, StatsScope::Pooled)
        .load(
            remote(&["AAPL", "MSFT"], Period::OneMonth, Interval::OneDay),
            &RoleOverrides::new(),
            today(),
        )
        .unwrap();

    let names = snapshot.table.column_names();
    assert_eq!(names[0], "Date");
    assert!(names.contains(&"Close AAPL".to_string()));
    assert!(names.contains(&"Adj Close MSFT".to_string()));
    let mut deduped = names.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), names.len());

    assert_eq!(snapshot.table.axis.name, "Date");
    assert_eq!(snapshot.table.axis.origin, AxisOrigin::Detected);
    assert_eq!(snapshot.table.height(), 5);
    assert_eq!(snapshot.interval, Some(Interval::OneDay));
}

#[test]
fn single_symbol_roles_auto_detect_and_override_wins() {
    let provider = FixtureProvider::new(&[("SPY", 10, 400.0)]);
    let session = session(provider, StatsScope::Pooled);
    let mut snapshot = session
        .load(
            remote(&["SPY"], Period::ThreeMonths, Interval::OneDay),
            &RoleOverrides::new(),
            today(),
        )
        .unwrap();

    let report = &snapshot.analysis.reports()[0];
    let a = &report.inference.assignment;
    assert_eq!(a.get(Role::Open), Some("Open"));
    assert_eq!(a.get(Role::High), Some("High"));
    assert_eq!(a.get(Role::Low), Some("Low"));
    assert_eq!(a.get(Role::Close), Some("Close"));
    assert_eq!(a.get(Role::Volume), Some("Volume"));
    assert_eq!(report.summaries.len(), 5);
    let chart = report.chart.as_ref().unwrap();
    assert!(chart.lines.dual_axis);
    assert_eq!(chart.lines.x_column, "Date");

    let overrides = RoleOverrides::new().with(Role::Close, "Adj Close");
    snapshot.reassign(&overrides, StatsScope::Pooled).unwrap();
    let report = &snapshot.analysis.reports()[0];
    assert_eq!(report.inference.assignment.get(Role::Close), Some("Adj Close"));
    assert_eq!(report.summaries[0].column, "Adj Close");
    assert_eq!(report.summaries[0].min, 399.75);
}

#[test]
fn long_intraday_request_is_coerced_to_daily() {
    let provider = FixtureProvider::new(&[("AAPL", 4, 100.0)]);
    let snapshot = session(provider, StatsScope::Pooled)
        .load(
            remote(&["AAPL"], Period::OneYear, Interval::FiveMinutes),
            &RoleOverrides::new(),
            today(),
        )
        .unwrap();

    assert_eq!(snapshot.interval, Some(Interval::OneDay));
    assert_eq!(snapshot.warnings.len(), 1);
    assert_eq!(snapshot.table.axis.name, "Date");
}

#[test]
fn short_intraday_request_keeps_datetime_axis() {
    let provider = FixtureProvider::new(&[("AAPL", 4, 100.0)]);
    let snapshot = session(provider, StatsScope::Pooled)
        .load(
            remote(&["AAPL"], Period::FiveDays, Interval::FiveMinutes),
            &RoleOverrides::new(),
            today(),
        )
        .unwrap();

    assert_eq!(snapshot.interval, Some(Interval::FiveMinutes));
    assert!(snapshot.warnings.is_empty());
    assert_eq!(snapshot.table.axis.name, "Datetime");
}

#[test]
fn empty_result_and_unknown_symbol_are_acquisition_errors() {
    let provider = FixtureProvider::new(&[("EMPTY", 0, 1.0)]);
    let session = session(provider, StatsScope::Pooled);

    let err = session
        .load(
            remote(&["EMPTY"], Period::OneMonth, Interval::OneDay),
            &RoleOverrides::new(),
            today(),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Acquisition(AcquisitionError::Empty { .. })
    ));

    let err = session
        .load(
            remote(&["NOPE"], Period::OneMonth, Interval::OneDay),
            &RoleOverrides::new(),
            today(),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Acquisition(AcquisitionError::SymbolNotFound { .. })
    ));

    let err = session
        .load(
            remote(&[], Period::OneMonth, Interval::OneDay),
            &RoleOverrides::new(),
            today(),
        )
        .unwrap_err();
    assert!(matches!(err, PipelineError::Acquisition(AcquisitionError::NoSymbols)));
}

#[test]
fn unavailable_provider_fails_before_fetching() {
    let provider = FixtureProvider::new(&[("AAPL", 5, 100.0)]).unavailable();
    let err = session(provider, StatsScope::Pooled)
        .load(
            remote(&["AAPL"], Period::OneMonth, Interval::OneDay),
            &RoleOverrides::new(),
            today(),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Acquisition(AcquisitionError::Unavailable { .. })
    ));
}

#[test]
fn uploaded_yahoo_csv_with_null_rows_keeps_roles() {
    let csv = "Date,Open,High,Low,Close,Adj Close,Volume\n\
        2024-01-02,187.15,188.44,183.89,185.64,184.73,82488700\n\
        2024-01-03,null,null,null,null,null,null\n\
        2024-01-04,182.15,183.09,180.88,181.91,181.02,71983600\n";
    let snapshot = Session::new(QuoteLensConfig::default())
        .load(
            Source::File {
                name: "AAPL.csv".into(),
                bytes: csv.as_bytes().to_vec(),
                format: FileFormat::Csv,
            },
            &RoleOverrides::new(),
            today(),
        )
        .unwrap();

    assert_eq!(snapshot.table.axis.name, "Date");
    let report = &snapshot.analysis.reports()[0];
    assert_eq!(report.inference.available(), vec!["Close", "High", "Low", "Open", "Volume"]);
    assert_eq!(report.summaries[0].column, "Close");
    assert_eq!(report.summaries[0].min, 181.91);
    assert!(report.chart.is_some());
}

#[test]
fn table_without_candidates_is_reportable_empty_state() {
    let csv = "Price,Quantity,Name\n1.5,10,a\n2.5,20,b\n3.5,30,c\n";
    let snapshot = Session::new(QuoteLensConfig::default())
        .load(
            Source::File {
                name: "prices.csv".into(),
                bytes: csv.as_bytes().to_vec(),
                format: FileFormat::Csv,
            },
            &RoleOverrides::new(),
            today(),
        )
        .unwrap();

    assert!(snapshot.table.axis.is_synthesized());
    assert_eq!(snapshot.table.axis.name, "Index");
    assert!(snapshot.analysis.is_empty());

    let report = &snapshot.analysis.reports()[0];
    assert!(report.chart.is_none());
    assert!(report.summaries.is_empty());
    assert!(report.inference.require_any().is_err());

    // Price, Quantity and the synthesized Index.
    let described: Vec<&str> = snapshot
        .description
        .iter()
        .map(|d| d.column.as_str())
        .collect();
    assert_eq!(described, vec!["Price", "Quantity", "Index"]);
}

#[test]
fn override_naming_missing_column_falls_back_to_auto_detection() {
    let provider = FixtureProvider::new(&[("SPY", 3, 10.0)]);
    let mut snapshot = session(provider, StatsScope::Pooled)
        .load(
            remote(&["SPY"], Period::OneMonth, Interval::OneDay),
            &RoleOverrides::new().with(Role::Close, "Last"),
            today(),
        )
        .unwrap();

    assert_eq!(snapshot.warnings.len(), 1);
    assert!(snapshot.warnings[0].contains("'Last'"));
    assert!(!snapshot.description.is_empty());
    let report = &snapshot.analysis.reports()[0];
    assert_eq!(report.inference.assignment.get(Role::Close), Some("Close"));
    assert!(report.chart.is_some());

    // Changing overrides on a loaded snapshot stays strict.
    let err = snapshot
        .reassign(&RoleOverrides::new().with(Role::Close, "Last"), StatsScope::Pooled)
        .unwrap_err();
    assert!(matches!(err, PipelineError::Role(_)));
}

#[test]
fn per_symbol_scope_reports_each_symbol() {
    let provider = FixtureProvider::new(&[("AAPL", 5, 100.0), ("MSFT", 5, 300.0)]);
    let snapshot = session(provider, StatsScope::PerSymbol)
        .load(
            remote(&["AAPL", "MSFT"], Period::OneMonth, Interval::OneDay),
            &RoleOverrides::new(),
            today(),
        )
        .unwrap();

    let Analysis::PerSymbol(reports) = &snapshot.analysis else {
        panic!("expected per-symbol analysis");
    };
    assert_eq!(reports.len(), 2);
    assert_eq!(
        reports[1].inference.assignment.get(Role::Close),
        Some("Close MSFT")
    );
    assert_eq!(reports[1].summaries[0].column, "Close MSFT");
    assert_eq!(reports[1].summaries[0].min, 300.0);
    assert_eq!(reports[1].summaries[0].max, 304.0);
}
