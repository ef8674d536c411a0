//! CSV and XLSX export of the normalized table.
//!
//! Both formats carry a header row of column identifiers and no index column.
//! Missing values (nulls and NaN) are written as empty cells. File names are
//! `{prefix}_{YYYYmmdd_HHMMSS}_{hash8}.{ext}`, where `hash8` is the first eight
//! hex digits of the blake3 hash of the CSV rendering; an existing file is
//! never overwritten (a `_N` counter is appended instead).

use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike};
use polars::prelude::*;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, XlsxError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

use crate::config::ExportConfig;
use crate::table::{series_cells, Cell};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX error: {0}")]
    Xlsx(#[from] XlsxError),

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error("CSV output is not valid UTF-8")]
    Utf8,
}

/// Output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            other => Err(format!("unknown export format '{other}' (expected csv or xlsx)")),
        }
    }
}

// ─── Cell grid ──────────────────────────────────────────────────────

/// Materialize every column of the frame as cells, column-major.
fn frame_cells(df: &DataFrame) -> PolarsResult<Vec<Vec<Cell>>> {
    df.get_columns()
        .iter()
        .map(|c| series_cells(c.as_materialized_series()))
        .collect()
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Render the frame as UTF-8, comma-separated CSV with a header row.
pub fn to_csv_string(df: &DataFrame) -> Result<String, ExportError> {
    let columns = frame_cells(df)?;
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(df.get_column_names().iter().map(|n| n.as_str()))?;
    for row in 0..df.height() {
        wtr.write_record(columns.iter().map(|col| col[row].to_string()))?;
    }

    let data = wtr
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))?;
    String::from_utf8(data).map_err(|_| ExportError::Utf8)
}

/// Write the frame as CSV to `path`.
pub fn write_csv(df: &DataFrame, path: &Path) -> Result<(), ExportError> {
    std::fs::write(path, to_csv_string(df)?)?;
    Ok(())
}

// ─── XLSX export ────────────────────────────────────────────────────

/// Years an Excel serial date can hold.
const EXCEL_YEARS: std::ops::RangeInclusive<i32> = 1900..=9999;

/// Excel date-time for `dt`, or `None` when it falls outside Excel's range.
fn excel_datetime(dt: &NaiveDateTime) -> Option<ExcelDateTime> {
    if !EXCEL_YEARS.contains(&dt.year()) {
        return None;
    }
    let seconds = f64::from(dt.second()) + f64::from(dt.nanosecond()) / 1e9;
    ExcelDateTime::from_ymd(dt.year() as u16, dt.month() as u8, dt.day() as u8)
        .and_then(|date| date.and_hms(dt.hour() as u16, dt.minute() as u8, seconds))
        .ok()
}

/// Build a single-sheet workbook holding the frame.
///
/// Dates and datetimes Excel cannot represent are written as ISO text, the
/// same rendering the CSV export uses.
pub fn to_workbook(df: &DataFrame, sheet_name: &str) -> Result<Workbook, ExportError> {
    let columns = frame_cells(df)?;
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let datetime_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name)?;

    for (col, name) in df.get_column_names().iter().enumerate() {
        sheet.write_string(0, col as u16, name.as_str())?;
    }

    for (col, cells) in columns.iter().enumerate() {
        let col = col as u16;
        for (row, cell) in cells.iter().enumerate() {
            let row = row as u32 + 1;
            match cell {
                Cell::Null => {}
                Cell::Float(v) if !v.is_finite() => {}
                Cell::Float(v) => {
                    sheet.write_number(row, col, *v)?;
                }
                Cell::Int(v) => {
                    sheet.write_number(row, col, *v as f64)?;
                }
                Cell::Bool(v) => {
                    sheet.write_boolean(row, col, *v)?;
                }
                Cell::Text(v) => {
                    sheet.write_string(row, col, v)?;
                }
                Cell::Date(d) => match excel_datetime(&d.and_time(NaiveTime::MIN)) {
                    Some(value) => {
                        sheet.write_datetime_with_format(row, col, &value, &date_format)?;
                    }
                    None => {
                        sheet.write_string(row, col, cell.to_string())?;
                    }
                },
                Cell::DateTime(dt) => match excel_datetime(dt) {
                    Some(value) => {
                        sheet.write_datetime_with_format(row, col, &value, &datetime_format)?;
                    }
                    None => {
                        sheet.write_string(row, col, cell.to_string())?;
                    }
                },
            }
        }
    }

    Ok(workbook)
}

/// Write the frame as a single-sheet XLSX workbook to `path`.
pub fn write_xlsx(df: &DataFrame, path: &Path, sheet_name: &str) -> Result<(), ExportError> {
    let mut workbook = to_workbook(df, sheet_name)?;
    workbook.save(path)?;
    Ok(())
}

// ─── Naming ─────────────────────────────────────────────────────────

/// First eight hex digits of the blake3 hash of `csv`.
pub fn fingerprint(csv: &str) -> String {
    let hash = blake3::hash(csv.as_bytes());
    hash.to_hex()[..8].to_string()
}

/// First free path of the form `{prefix}_{stamp}_{hash}[_N].{ext}` under `dir`.
pub fn export_path(
    dir: &Path,
    prefix: &str,
    stamp: NaiveDateTime,
    hash: &str,
    format: ExportFormat,
) -> PathBuf {
    let base = format!("{prefix}_{}_{hash}", stamp.format("%Y%m%d_%H%M%S"));
    let ext = format.extension();

    let first = dir.join(format!("{base}.{ext}"));
    if !first.exists() {
        return first;
    }
    (1u32..)
        .map(|n| dir.join(format!("{base}_{n}.{ext}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}

/// Export the frame in each requested format under `config.dir`.
///
/// Returns the written paths in `formats` order.
pub fn export(
    df: &DataFrame,
    formats: &[ExportFormat],
    config: &ExportConfig,
    now: NaiveDateTime,
) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(&config.dir)?;

    let csv = to_csv_string(df)?;
    let hash = fingerprint(&csv);

    let mut written = Vec::with_capacity(formats.len());
    for &format in formats {
        let path = export_path(&config.dir, &config.prefix, now, &hash, format);
        match format {
            ExportFormat::Csv => std::fs::write(&path, &csv)?,
            ExportFormat::Xlsx => write_xlsx(df, &path, &config.sheet_name)?,
        }
        info!(path = %path.display(), rows = df.height(), %format, "exported");
        written.push(path);
    }
    Ok(written)
}
