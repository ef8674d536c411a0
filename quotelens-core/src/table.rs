//! Raw tabular model and cell access.
//!
//! A `RawTable` is what the acquisition layer hands back: ordered columns whose
//! labels may be hierarchical (e.g. `("Close", "AAPL")` for multi-symbol
//! fetches). The normalizer turns it into a polars `DataFrame` with flat,
//! unique column names.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A column label as produced by a data source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnLabel {
    Flat(String),
    Tuple(Vec<String>),
}

impl ColumnLabel {
    pub fn flat(name: impl Into<String>) -> Self {
        ColumnLabel::Flat(name.into())
    }

    pub fn tuple<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ColumnLabel::Tuple(parts.into_iter().map(Into::into).collect())
    }

    /// Flat string identifier for this label.
    ///
    /// Tuple parts are joined with a single space and the result is trimmed;
    /// flat labels are returned unchanged.
    pub fn flatten(&self) -> String {
        match self {
            ColumnLabel::Flat(name) => name.clone(),
            ColumnLabel::Tuple(parts) => parts.join(" ").trim().to_string(),
        }
    }
}

impl fmt::Display for ColumnLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnLabel::Flat(name) => write!(f, "{name}"),
            ColumnLabel::Tuple(parts) => write!(f, "({})", parts.join(", ")),
        }
    }
}

/// One labelled column of a raw table.
#[derive(Debug, Clone)]
pub struct RawColumn {
    pub label: ColumnLabel,
    pub values: Series,
}

impl RawColumn {
    pub fn new(label: ColumnLabel, values: Series) -> Self {
        Self { label, values }
    }
}

/// Ordered collection of equally long, labelled columns.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    columns: Vec<RawColumn>,
    height: usize,
}

impl RawTable {
    /// Build a table, checking that every column has the same length.
    pub fn new(columns: Vec<RawColumn>) -> Result<Self, TableError> {
        let height = columns.first().map(|c| c.values.len()).unwrap_or(0);
        for column in &columns {
            if column.values.len() != height {
                return Err(TableError::LengthMismatch {
                    label: column.label.to_string(),
                    expected: height,
                    actual: column.values.len(),
                });
            }
        }
        Ok(Self { columns, height })
    }

    /// Wrap an already flat frame (CSV upload, re-normalization).
    pub fn from_frame(df: &DataFrame) -> Self {
        let columns = df
            .get_columns()
            .iter()
            .map(|c| {
                let series = c.as_materialized_series().clone();
                RawColumn::new(ColumnLabel::flat(series.name().as_str()), series)
            })
            .collect();
        Self {
            columns,
            height: df.height(),
        }
    }

    pub fn columns(&self) -> &[RawColumn] {
        &self.columns
    }

    pub fn labels(&self) -> Vec<&ColumnLabel> {
        self.columns.iter().map(|c| &c.label).collect()
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.height == 0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("column {label} has {actual} rows, expected {expected}")]
    LengthMismatch {
        label: String,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

/// A single table cell, decoupled from the polars physical representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Numeric view of the cell, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(v) => Some(*v as f64),
            Cell::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null) || matches!(self, Cell::Float(v) if v.is_nan())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Int(v) => write!(f, "{v}"),
            // NaN is a missing value in exports, not the literal "NaN".
            Cell::Float(v) if !v.is_finite() => Ok(()),
            Cell::Float(v) => write!(f, "{v:?}"),
            Cell::Bool(v) => write!(f, "{v}"),
            Cell::Text(v) => write!(f, "{v}"),
            Cell::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            // Fractional seconds only when present.
            Cell::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }
}

/// True for integer and floating point dtypes.
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn is_integer_dtype(dtype: &DataType) -> bool {
    is_numeric_dtype(dtype) && !matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Materialize a series into cells.
pub fn series_cells(series: &Series) -> PolarsResult<Vec<Cell>> {
    let dtype = series.dtype().clone();
    let cells = match dtype {
        ref dt if is_integer_dtype(dt) => {
            let casted = series.cast(&DataType::Int64)?;
            let ca = casted.i64()?;
            ca.into_iter().map(|v| v.map_or(Cell::Null, Cell::Int)).collect()
        }
        DataType::Float32 | DataType::Float64 => {
            let casted = series.cast(&DataType::Float64)?;
            let ca = casted.f64()?;
            ca.into_iter().map(|v| v.map_or(Cell::Null, Cell::Float)).collect()
        }
        DataType::Boolean => {
            let ca = series.bool()?;
            ca.into_iter().map(|v| v.map_or(Cell::Null, Cell::Bool)).collect()
        }
        DataType::String => {
            let ca = series.str()?;
            ca.into_iter()
                .map(|v| v.map_or(Cell::Null, |s| Cell::Text(s.to_string())))
                .collect()
        }
        DataType::Date => {
            let epoch = unix_epoch();
            let casted = series.cast(&DataType::Int32)?;
            let ca = casted.i32()?;
            ca.into_iter()
                .map(|v| {
                    v.and_then(|days| epoch.checked_add_signed(chrono::Duration::days(days as i64)))
                        .map_or(Cell::Null, Cell::Date)
                })
                .collect()
        }
        DataType::Datetime(unit, _) => {
            let casted = series.cast(&DataType::Int64)?;
            let ca = casted.i64()?;
            ca.into_iter()
                .map(|v| {
                    v.and_then(|raw| datetime_from_raw(raw, unit))
                        .map_or(Cell::Null, Cell::DateTime)
                })
                .collect()
        }
        DataType::Null => vec![Cell::Null; series.len()],
        _ => {
            let casted = series.cast(&DataType::String)?;
            let ca = casted.str()?;
            ca.into_iter()
                .map(|v| v.map_or(Cell::Null, |s| Cell::Text(s.to_string())))
                .collect()
        }
    };
    Ok(cells)
}

pub(crate) fn unix_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

fn datetime_from_raw(raw: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    match unit {
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(raw).map(|d| d.naive_utc()),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(raw).map(|d| d.naive_utc()),
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(raw).naive_utc()),
    }
}

/// Build a `Date` series from optional calendar dates.
pub fn date_series(name: &str, dates: &[Option<NaiveDate>]) -> PolarsResult<Series> {
    let epoch = unix_epoch();
    let days: Vec<Option<i32>> = dates
        .iter()
        .map(|d| d.map(|d| (d - epoch).num_days() as i32))
        .collect();
    Series::new(name.into(), days).cast(&DataType::Date)
}

/// Build a millisecond `Datetime` series from optional timestamps.
pub fn datetime_series(name: &str, stamps: &[Option<NaiveDateTime>]) -> PolarsResult<Series> {
    let millis: Vec<Option<i64>> = stamps
        .iter()
        .map(|t| t.map(|t| t.and_utc().timestamp_millis()))
        .collect();
    Series::new(name.into(), millis).cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
}
