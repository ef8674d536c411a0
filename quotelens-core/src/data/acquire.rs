//! Remote acquisition: fetch symbols and lay their bars out as one raw table.
//!
//! A single symbol yields flat labels (`Date`, `Open`, ..., `Volume`). Several
//! symbols yield `(field, symbol)` tuple labels grouped by symbol, with the axis
//! labelled `("Date", "")`; rows are the union of all timestamps, and a symbol
//! without a bar at some timestamp gets nulls there.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::{info, warn};

use super::interval::{Interval, IntervalPolicy, Period};
use super::provider::{AcquisitionError, DataProvider, DataSource, FetchResult, RawBar};
use crate::table::{date_series, datetime_series, ColumnLabel, RawColumn, RawTable};

/// A remote table plus what was actually served.
#[derive(Debug, Clone)]
pub struct Acquired {
    pub table: RawTable,
    pub symbols: Vec<String>,
    pub period: Period,
    pub requested_interval: Interval,
    /// Interval of the returned bars; downstream code must use this one.
    pub interval: Interval,
    /// User-facing notices (interval coercion and the like).
    pub warnings: Vec<String>,
    pub source: DataSource,
}

const PRICE_FIELDS: [&str; 4] = ["Open", "High", "Low", "Close"];

fn price_field(bar: &RawBar, field: &str) -> Option<f64> {
    match field {
        "Open" => bar.open,
        "High" => bar.high,
        "Low" => bar.low,
        "Close" => bar.close,
        _ => None,
    }
}

/// Fetch `symbols` for `period` at `interval`, applying the intraday policy first.
pub fn fetch_remote(
    provider: &dyn DataProvider,
    symbols: &[String],
    period: Period,
    interval: Interval,
    policy: &IntervalPolicy,
    today: NaiveDate,
) -> Result<Acquired, AcquisitionError> {
    if symbols.is_empty() {
        return Err(AcquisitionError::NoSymbols);
    }
    if !provider.is_available() {
        warn!(provider = provider.name(), "provider unavailable, skipping fetch");
        return Err(AcquisitionError::Unavailable {
            provider: provider.name().to_string(),
        });
    }

    let coercion = policy.coerce(period, interval, today);
    let mut warnings: Vec<String> = coercion.warning.iter().cloned().collect();

    info!(
        provider = provider.name(),
        symbols = symbols.len(),
        %period,
        interval = %coercion.interval,
        "fetching market data"
    );

    let mut fetched = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let result = provider.fetch(symbol, period, coercion.interval)?;
        if result.bars.is_empty() {
            warn!(symbol = %symbol, "provider returned no bars");
            warnings.push(format!("no data returned for {symbol}"));
        }
        fetched.push(result);
    }

    if fetched.iter().all(|f| f.bars.is_empty()) {
        return Err(AcquisitionError::Empty {
            symbols: symbols.join(", "),
        });
    }

    let served = fetched
        .first()
        .map(|f| f.interval)
        .unwrap_or(coercion.interval);
    if served != coercion.interval {
        warnings.push(format!(
            "provider served '{served}' bars instead of '{}'",
            coercion.interval
        ));
    }

    let table = build_table(&fetched, served)?;
    Ok(Acquired {
        table,
        symbols: symbols.to_vec(),
        period,
        requested_interval: interval,
        interval: served,
        warnings,
        source: fetched
            .first()
            .map(|f| f.source)
            .unwrap_or(DataSource::YahooFinance),
    })
}

/// Lay out fetched bars as a raw table.
pub fn build_table(fetched: &[FetchResult], interval: Interval) -> Result<RawTable, AcquisitionError> {
    let multi = fetched.len() > 1;
    let intraday = interval.is_intraday();

    // Daily and longer bars are keyed by calendar date so symbols from
    // different sessions still line up.
    let key = |bar: &RawBar| -> NaiveDateTime {
        if intraday {
            bar.timestamp
        } else {
            bar.timestamp.date().and_time(NaiveTime::MIN)
        }
    };

    let mut rows: BTreeMap<NaiveDateTime, Vec<Option<&RawBar>>> = BTreeMap::new();
    for (i, result) in fetched.iter().enumerate() {
        for bar in &result.bars {
            let slot = rows
                .entry(key(bar))
                .or_insert_with(|| vec![None; fetched.len()]);
            slot[i] = Some(bar);
        }
    }

    let stamps: Vec<NaiveDateTime> = rows.keys().copied().collect();
    let mut columns = Vec::new();

    let axis_name = if intraday { "Datetime" } else { "Date" };
    let axis_values = if intraday {
        datetime_series(axis_name, &stamps.iter().map(|t| Some(*t)).collect::<Vec<_>>())
    } else {
        date_series(axis_name, &stamps.iter().map(|t| Some(t.date())).collect::<Vec<_>>())
    }
    .map_err(crate::table::TableError::from)?;
    let axis_label = if multi {
        ColumnLabel::tuple([axis_name, ""])
    } else {
        ColumnLabel::flat(axis_name)
    };
    columns.push(RawColumn::new(axis_label, axis_values));

    let label = |field: &str, symbol: &str| {
        if multi {
            ColumnLabel::tuple([field, symbol])
        } else {
            ColumnLabel::flat(field)
        }
    };

    for (i, result) in fetched.iter().enumerate() {
        let bars: Vec<Option<&RawBar>> = rows.values().map(|slot| slot[i]).collect();
        let symbol = result.symbol.as_str();

        for field in PRICE_FIELDS {
            let values: Vec<Option<f64>> = bars
                .iter()
                .map(|b| b.and_then(|b| price_field(b, field)))
                .collect();
            columns.push(RawColumn::new(
                label(field, symbol),
                Series::new(format!("{field} {symbol}").as_str().into(), values),
            ));
        }

        if result.has_adj_close() {
            let values: Vec<Option<f64>> = bars.iter().map(|b| b.and_then(|b| b.adj_close)).collect();
            columns.push(RawColumn::new(
                label("Adj Close", symbol),
                Series::new(format!("Adj Close {symbol}").as_str().into(), values),
            ));
        }

        let volume: Vec<Option<i64>> = bars
            .iter()
            .map(|b| b.and_then(|b| b.volume).map(|v| v.round() as i64))
            .collect();
        columns.push(RawColumn::new(
            label("Volume", symbol),
            Series::new(format!("Volume {symbol}").as_str().into(), volume),
        ));
    }

    Ok(RawTable::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{series_cells, Cell};

    fn bar(day: u32, close: f64) -> RawBar {
        RawBar {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(14, 30, 0)
                .unwrap(),
            open: Some(close - 1.0),
            high: Some(close + 1.0),
            low: Some(close - 2.0),
            close: Some(close),
            adj_close: None,
            volume: Some(1000.0),
        }
    }

    fn result(symbol: &str, bars: Vec<RawBar>) -> FetchResult {
        FetchResult {
            symbol: symbol.into(),
            bars,
            interval: Interval::OneDay,
            source: DataSource::Fixture,
        }
    }

    #[test]
    fn single_symbol_has_flat_labels() {
        let table = build_table(&[result("AAPL", vec![bar(2, 10.0), bar(3, 11.0)])], Interval::OneDay)
            .unwrap();
        let labels: Vec<String> = table.labels().iter().map(|l| l.flatten()).collect();
        assert_eq!(labels, vec!["Date", "Open", "High", "Low", "Close", "Volume"]);
        assert!(table
            .labels()
            .iter()
            .all(|l| matches!(l, ColumnLabel::Flat(_))));
        assert_eq!(table.height(), 2);
    }

    #[test]
    fn multi_symbol_uses_field_symbol_tuples_and_union_of_dates() {
        let table = build_table(
            &[
                result("AAPL", vec![bar(2, 10.0), bar(3, 11.0)]),
                result("MSFT", vec![bar(3, 20.0), bar(4, 21.0)]),
            ],
            Interval::OneDay,
        )
        .unwrap();

        assert_eq!(table.height(), 3);
        assert_eq!(table.labels()[0], &ColumnLabel::tuple(["Date", ""]));
        assert_eq!(table.labels()[4], &ColumnLabel::tuple(["Close", "AAPL"]));
        assert_eq!(table.labels()[9], &ColumnLabel::tuple(["Close", "MSFT"]));

        let msft_close = series_cells(&table.columns()[9].values).unwrap();
        assert_eq!(
            msft_close,
            vec![Cell::Null, Cell::Float(20.0), Cell::Float(21.0)]
        );
    }

    #[test]
    fn adj_close_column_only_when_served() {
        let mut with_adj = bar(2, 10.0);
        with_adj.adj_close = Some(9.5);
        let table = build_table(&[result("SPY", vec![with_adj])], Interval::OneDay).unwrap();
        let labels: Vec<String> = table.labels().iter().map(|l| l.flatten()).collect();
        assert!(labels.contains(&"Adj Close".to_string()));
    }

    #[test]
    fn intraday_axis_is_datetime() {
        let table = build_table(&[result("SPY", vec![bar(2, 10.0)])], Interval::FiveMinutes).unwrap();
        assert_eq!(table.labels()[0], &ColumnLabel::flat("Datetime"));
        let cells = series_cells(&table.columns()[0].values).unwrap();
        assert!(matches!(cells[0], Cell::DateTime(_)));
    }
}
