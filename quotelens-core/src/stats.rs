//! Descriptive statistics and five-number summaries.
//!
//! Both the full descriptive table and the reduced per-role summary go through
//! the same `quantile_linear`, so a column's quartiles never disagree between
//! the table and the chart. Missing values (nulls and NaN) are excluded; a
//! column with no values yields NaN statistics, never zero.

use polars::prelude::*;
use serde::Serialize;

use crate::roles::RoleInference;
use crate::table::is_numeric_dtype;

/// count/mean/std/min/25%/50%/75%/max for one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDescription {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator).
    pub std: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// (min, Q1, median, Q3, max) for one column; one row per grouped bar series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FiveNumberSummary {
    pub column: String,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl FiveNumberSummary {
    pub const LABELS: [&'static str; 5] = ["Min", "Q1", "Median", "Q3", "Max"];

    pub fn values(&self) -> [f64; 5] {
        [self.min, self.q1, self.median, self.q3, self.max]
    }

    /// True when the column had no numeric values at all.
    pub fn is_undefined(&self) -> bool {
        self.values().iter().all(|v| v.is_nan())
    }
}

impl From<&ColumnDescription> for FiveNumberSummary {
    fn from(d: &ColumnDescription) -> Self {
        Self {
            column: d.column.clone(),
            min: d.min,
            q1: d.q1,
            median: d.median,
            q3: d.q3,
            max: d.max,
        }
    }
}

/// Box-plot input: summary plus the raw non-missing values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSeries {
    pub summary: FiveNumberSummary,
    pub values: Vec<f64>,
}

/// Quantile of an ascending slice using linear interpolation between closest ranks.
///
/// `pos = q * (n - 1)`; returns NaN for an empty slice.
pub fn quantile_linear(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Non-missing numeric values of a series; empty for non-numeric dtypes.
pub fn numeric_values(series: &Series) -> PolarsResult<Vec<f64>> {
    if !is_numeric_dtype(series.dtype()) {
        return Ok(Vec::new());
    }
    let casted = series.cast(&DataType::Float64)?;
    let values = casted
        .f64()?
        .into_iter()
        .flatten()
        .filter(|v| !v.is_nan())
        .collect();
    Ok(values)
}

/// Describe a set of already-filtered values.
pub fn describe_values(column: &str, values: &[f64]) -> ColumnDescription {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let count = sorted.len();
    let mean = if count == 0 {
        f64::NAN
    } else {
        sorted.iter().sum::<f64>() / count as f64
    };
    let std = if count < 2 {
        f64::NAN
    } else {
        let variance =
            sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        variance.sqrt()
    };

    ColumnDescription {
        column: column.to_string(),
        count,
        mean,
        std,
        min: sorted.first().copied().unwrap_or(f64::NAN),
        q1: quantile_linear(&sorted, 0.25),
        median: quantile_linear(&sorted, 0.5),
        q3: quantile_linear(&sorted, 0.75),
        max: sorted.last().copied().unwrap_or(f64::NAN),
    }
}

/// Describe a single named column of the frame.
pub fn describe_column(df: &DataFrame, column: &str) -> PolarsResult<ColumnDescription> {
    let series = df.column(column)?.as_materialized_series();
    Ok(describe_values(column, &numeric_values(series)?))
}

/// Full descriptive table: one row per numeric column, in table order.
pub fn describe(df: &DataFrame) -> PolarsResult<Vec<ColumnDescription>> {
    df.get_columns()
        .iter()
        .map(|c| c.as_materialized_series())
        .filter(|s| is_numeric_dtype(s.dtype()))
        .map(|s| Ok(describe_values(s.name().as_str(), &numeric_values(s)?)))
        .collect()
}

/// Five-number summary for `column`.
pub fn five_number_summary(df: &DataFrame, column: &str) -> PolarsResult<FiveNumberSummary> {
    describe_column(df, column).map(|d| FiveNumberSummary::from(&d))
}

/// One summary row per available role column, in role order. Empty when no roles are available.
pub fn five_number_summaries(
    df: &DataFrame,
    inference: &RoleInference,
) -> PolarsResult<Vec<FiveNumberSummary>> {
    inference
        .available()
        .into_iter()
        .map(|column| five_number_summary(df, column))
        .collect()
}

/// Box-plot series for every available role column.
pub fn box_series(df: &DataFrame, inference: &RoleInference) -> PolarsResult<Vec<BoxSeries>> {
    inference
        .available()
        .into_iter()
        .map(|column| {
            let values = numeric_values(df.column(column)?.as_materialized_series())?;
            let summary = FiveNumberSummary::from(&describe_values(column, &values));
            Ok(BoxSeries { summary, values })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{AxisColumn, AxisOrigin};
    use crate::roles::{infer_roles, RoleOverrides};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn five_number_summary_uses_linear_interpolation() {
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        let d = describe_values("x", &values);
        assert!(approx(d.min, 1.0));
        assert!(approx(d.q1, 3.25));
        assert!(approx(d.median, 5.5));
        assert!(approx(d.q3, 7.75));
        assert!(approx(d.max, 10.0));
    }

    #[test]
    fn describe_reports_count_mean_and_sample_std() {
        let d = describe_values("x", &[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(d.count, 8);
        assert!(approx(d.mean, 5.0));
        assert!(approx(d.std, (32.0f64 / 7.0).sqrt()));
    }

    #[test]
    fn quantile_of_single_value_is_that_value() {
        assert_eq!(quantile_linear(&[42.0], 0.25), 42.0);
        assert!(quantile_linear(&[], 0.5).is_nan());
    }

    #[test]
    fn missing_values_are_excluded() {
        let df = df!("Close" => &[Some(1.0), None, Some(f64::NAN), Some(3.0)]).unwrap();
        let d = describe_column(&df, "Close").unwrap();
        assert_eq!(d.count, 2);
        assert!(approx(d.median, 2.0));
    }

    #[test]
    fn all_missing_column_yields_nan_not_zero() {
        let df = df!("Adj Close" => &[None::<f64>, None]).unwrap();
        let s = five_number_summary(&df, "Adj Close").unwrap();
        assert!(s.is_undefined());
        let d = describe_column(&df, "Adj Close").unwrap();
        assert_eq!(d.count, 0);
        assert!(d.mean.is_nan() && d.std.is_nan());
    }

    #[test]
    fn describe_skips_non_numeric_columns() {
        let df = df!(
            "Date" => &["2024-01-01", "2024-01-02"],
            "Close" => &[1.0, 2.0],
            "Volume" => &[10i64, 20],
        )
        .unwrap();
        let rows = describe(&df).unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.column.as_str()).collect();
        assert_eq!(names, vec!["Close", "Volume"]);
    }

    #[test]
    fn table_and_chart_quartiles_agree() {
        let df = df!(
            "Close" => &[5.0, 1.0, 3.0, 2.0, 4.0],
            "Volume" => &[100i64, 300, 200, 500, 400],
        )
        .unwrap();
        let axis = AxisColumn {
            name: "Index".into(),
            origin: AxisOrigin::Synthesized,
        };
        let inference = infer_roles(&df, &axis, &RoleOverrides::new()).unwrap();
        let table = describe(&df).unwrap();
        let summaries = five_number_summaries(&df, &inference).unwrap();

        assert_eq!(summaries.len(), 2);
        for summary in &summaries {
            let row = table.iter().find(|r| r.column == summary.column).unwrap();
            assert_eq!(FiveNumberSummary::from(row), *summary);
        }
    }

    #[test]
    fn box_series_carry_raw_values() {
        let df = df!("Close" => &[Some(1.0), None, Some(2.0)]).unwrap();
        let axis = AxisColumn {
            name: "Index".into(),
            origin: AxisOrigin::Synthesized,
        };
        let inference = infer_roles(&df, &axis, &RoleOverrides::new()).unwrap();
        let boxes = box_series(&df, &inference).unwrap();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].values, vec![1.0, 2.0]);
    }
}
