//! Schema normalization: flat unique column identifiers and a guaranteed axis column.

use polars::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::table::{is_numeric_dtype, RawTable};

/// Name given to the synthesized row-position axis.
pub const SYNTHESIZED_AXIS: &str = "Index";

/// How the axis column was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AxisOrigin {
    /// First identifier containing "date" or "time" (any case).
    Detected,
    /// A column literally named `Date`.
    NamedDate,
    /// Appended 0..N-1 row position column.
    Synthesized,
}

/// The horizontal reference column for line charts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AxisColumn {
    pub name: String,
    pub origin: AxisOrigin,
}

impl AxisColumn {
    pub fn is_synthesized(&self) -> bool {
        self.origin == AxisOrigin::Synthesized
    }
}

/// A flattened frame together with its axis column.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    pub frame: DataFrame,
    pub axis: AxisColumn,
}

impl NormalizedTable {
    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn column_names(&self) -> Vec<String> {
        column_names(&self.frame)
    }
}

/// Inferred type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    Numeric,
    Temporal,
    Text,
    Boolean,
    /// Every value is missing.
    Empty,
}

/// Flatten labels, then find or synthesize the axis column.
pub fn normalize(raw: &RawTable) -> PolarsResult<NormalizedTable> {
    let frame = flatten_labels(raw)?;
    let (frame, axis) = with_axis(frame)?;
    Ok(NormalizedTable { frame, axis })
}

/// Produce a frame whose column names are the flattened, unique labels.
///
/// Row order and values are untouched. When two labels flatten to the same
/// string, later ones get a `_1`, `_2`, ... suffix.
pub fn flatten_labels(raw: &RawTable) -> PolarsResult<DataFrame> {
    let mut seen: HashSet<String> = HashSet::with_capacity(raw.width());
    let mut columns = Vec::with_capacity(raw.width());

    for column in raw.columns() {
        let flat = column.label.flatten();
        let name = unique_name(&flat, &seen);
        if name != flat {
            debug!(label = %column.label, renamed = %name, "duplicate column identifier");
        }
        seen.insert(name.clone());

        let mut series = column.values.clone();
        series.rename(name.as_str().into());
        columns.push(Column::from(series));
    }

    DataFrame::new(columns)
}

fn unique_name(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Locate the axis column without modifying the frame.
pub fn detect_axis(df: &DataFrame) -> Option<AxisColumn> {
    let names = column_names(df);

    if let Some(name) = names.iter().find(|name| {
        let lower = name.to_lowercase();
        lower.contains("date") || lower.contains("time")
    }) {
        return Some(AxisColumn {
            name: name.clone(),
            origin: AxisOrigin::Detected,
        });
    }

    // Subsumed by the substring rule today.
    if names.iter().any(|name| name == "Date") {
        return Some(AxisColumn {
            name: "Date".to_string(),
            origin: AxisOrigin::NamedDate,
        });
    }

    None
}

/// Return the frame with a usable axis, appending a row-position column if needed.
pub fn with_axis(mut df: DataFrame) -> PolarsResult<(DataFrame, AxisColumn)> {
    if let Some(axis) = detect_axis(&df) {
        debug!(axis = %axis.name, "axis column detected");
        return Ok((df, axis));
    }

    if let Some(name) = existing_row_position(&df) {
        debug!(axis = %name, "reusing row position axis");
        return Ok((
            df,
            AxisColumn {
                name,
                origin: AxisOrigin::Synthesized,
            },
        ));
    }

    let taken: HashSet<String> = column_names(&df).into_iter().collect();
    let name = unique_name(SYNTHESIZED_AXIS, &taken);
    let positions: Vec<i64> = (0..df.height() as i64).collect();
    df.with_column(Series::new(name.as_str().into(), positions))?;

    info!(axis = %name, rows = df.height(), "no date/time column, using row position as axis");
    Ok((
        df,
        AxisColumn {
            name,
            origin: AxisOrigin::Synthesized,
        },
    ))
}

/// A previously synthesized axis: the last column, named as `with_axis` would
/// name it given the columns before it, holding exactly 0..N-1.
fn existing_row_position(df: &DataFrame) -> Option<String> {
    let (last, rest) = df.get_columns().split_last()?;
    let taken: HashSet<String> = rest.iter().map(|c| c.name().to_string()).collect();
    let series = last.as_materialized_series();
    let name = series.name().as_str();
    if name != unique_name(SYNTHESIZED_AXIS, &taken) || series.dtype() != &DataType::Int64 {
        return None;
    }
    let positions = series.i64().ok()?;
    positions
        .into_iter()
        .enumerate()
        .all(|(i, v)| v == Some(i as i64))
        .then(|| name.to_string())
}

/// Column identifiers in table order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

/// Inferred kind of the named column, `None` if it does not exist.
pub fn column_kind(df: &DataFrame, name: &str) -> Option<ColumnKind> {
    let column = df.column(name).ok()?;
    let series = column.as_materialized_series();
    Some(series_kind(series))
}

pub(crate) fn series_kind(series: &Series) -> ColumnKind {
    let dtype = series.dtype();
    if matches!(dtype, DataType::Null) || (series.len() > 0 && series.null_count() == series.len())
    {
        // An all-missing float column is still numeric (it simply has no values).
        if is_numeric_dtype(dtype) {
            return ColumnKind::Numeric;
        }
        return ColumnKind::Empty;
    }
    if is_numeric_dtype(dtype) {
        ColumnKind::Numeric
    } else if matches!(dtype, DataType::Date | DataType::Datetime(_, _)) {
        ColumnKind::Temporal
    } else if matches!(dtype, DataType::Boolean) {
        ColumnKind::Boolean
    } else {
        ColumnKind::Text
    }
}

/// Numeric-eligible column identifiers in table order.
pub fn numeric_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .map(|c| c.as_materialized_series())
        .filter(|s| series_kind(s) == ColumnKind::Numeric)
        .map(|s| s.name().to_string())
        .collect()
}
