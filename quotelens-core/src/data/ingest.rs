//! Uploaded-file ingestion: CSV through polars, XLSX/XLS through calamine.
//!
//! CSV headers become flat labels and ISO dates are parsed where possible.
//! Spreadsheets are read from their first sheet; the first row is the header
//! and every column gets a single inferred type.

use calamine::{Data, DataType as _, Range, Reader, Xls, Xlsx};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;
use std::fmt;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

use crate::table::{date_series, datetime_series, ColumnLabel, RawColumn, RawTable, TableError};

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
    Xls,
}

impl FileFormat {
    /// Pick the format from a file name's extension.
    pub fn from_path(path: &Path) -> Result<Self, FileParseError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(FileFormat::Csv),
            "xlsx" => Ok(FileFormat::Xlsx),
            "xls" => Ok(FileFormat::Xls),
            _ => Err(FileParseError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileFormat::Csv => "csv",
            FileFormat::Xlsx => "xlsx",
            FileFormat::Xls => "xls",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FileParseError {
    #[error("unsupported file type: {0} (expected .csv, .xlsx, or .xls)")]
    UnsupportedFormat(String),

    #[error("malformed CSV: {0}")]
    Csv(String),

    #[error("malformed spreadsheet: {0}")]
    Excel(String),

    #[error("spreadsheet has no worksheets")]
    NoSheets,

    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to build table: {0}")]
    Table(#[from] TableError),
}

impl From<PolarsError> for FileParseError {
    fn from(e: PolarsError) -> Self {
        FileParseError::Table(TableError::Polars(e))
    }
}

/// Read a file from disk, picking the format from its extension.
pub fn load_path(path: &Path) -> Result<RawTable, FileParseError> {
    let format = FileFormat::from_path(path)?;
    let bytes = std::fs::read(path)?;
    info!(path = %path.display(), %format, bytes = bytes.len(), "loading file");
    load_file(&bytes, format)
}

/// Parse uploaded bytes in the given format.
pub fn load_file(bytes: &[u8], format: FileFormat) -> Result<RawTable, FileParseError> {
    match format {
        FileFormat::Csv => load_csv(bytes),
        FileFormat::Xlsx => {
            let workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes.to_vec()))
                .map_err(|e| FileParseError::Excel(e.to_string()))?;
            load_workbook(workbook)
        }
        FileFormat::Xls => {
            let workbook: Xls<_> = Xls::new(Cursor::new(bytes.to_vec()))
                .map_err(|e| FileParseError::Excel(e.to_string()))?;
            load_workbook(workbook)
        }
    }
}

/// Cell text read as a missing value, in CSVs and spreadsheet text cells alike.
const MISSING_MARKERS: &[&str] = &[
    "#N/A",
    "#N/A N/A",
    "#NA",
    "-1.#IND",
    "-1.#QNAN",
    "-NaN",
    "-nan",
    "1.#IND",
    "1.#QNAN",
    "<NA>",
    "N/A",
    "NA",
    "NULL",
    "NaN",
    "None",
    "n/a",
    "nan",
    "null",
];

fn load_csv(bytes: &[u8]) -> Result<RawTable, FileParseError> {
    let null_values: Vec<PlSmallStr> = MISSING_MARKERS
        .iter()
        .map(|m| PlSmallStr::from(*m))
        .collect();
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .map_parse_options(|opts| {
            opts.with_try_parse_dates(true)
                .with_null_values(Some(NullValues::AllColumns(null_values.clone())))
        })
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()
        .map_err(|e| FileParseError::Csv(e.to_string()))?;
    let df = blank_columns_as_float(df)?;
    debug!(rows = df.height(), columns = df.width(), "csv parsed");
    Ok(RawTable::from_frame(&df))
}

/// Columns with rows but no values come back as strings; read them as
/// all-missing floats instead.
fn blank_columns_as_float(mut df: DataFrame) -> PolarsResult<DataFrame> {
    if df.height() == 0 {
        return Ok(df);
    }
    let blank: Vec<PlSmallStr> = df
        .get_columns()
        .iter()
        .filter(|c| matches!(c.dtype(), DataType::String | DataType::Null))
        .filter(|c| c.null_count() == c.len())
        .map(|c| c.name().clone())
        .collect();
    for name in blank {
        let floats = df.column(name.as_str())?.cast(&DataType::Float64)?;
        df.with_column(floats)?;
    }
    Ok(df)
}

fn is_missing_marker(cell: &Data) -> bool {
    cell.get_string().is_some_and(|s| MISSING_MARKERS.contains(&s.trim()))
}

fn load_workbook<RS, R>(mut workbook: R) -> Result<RawTable, FileParseError>
where
    RS: std::io::Read + std::io::Seek,
    R: Reader<RS>,
    R::Error: fmt::Display,
{
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(FileParseError::NoSheets)?
        .map_err(|e| FileParseError::Excel(e.to_string()))?;
    table_from_range(&range)
}

/// Inferred type of a spreadsheet column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SheetColumnType {
    Int,
    Float,
    Bool,
    Date,
    Datetime,
    Text,
}

fn table_from_range(range: &Range<Data>) -> Result<RawTable, FileParseError> {
    let rows: Vec<&[Data]> = range.rows().collect();
    let Some((header, body)) = rows.split_first() else {
        return Ok(RawTable::default());
    };

    let mut columns = Vec::with_capacity(header.len());
    for (idx, head) in header.iter().enumerate() {
        let name = match head.as_string() {
            Some(s) if !s.trim().is_empty() => s,
            _ if !head.is_empty() => head.to_string(),
            _ => format!("Unnamed: {idx}"),
        };
        let cells: Vec<Option<&Data>> = body
            .iter()
            .map(|row| row.get(idx).filter(|c| !c.is_empty() && !is_missing_marker(c)))
            .collect();
        let kind = infer_column_type(&cells);
        let series = column_to_series(&name, &cells, kind)?;
        columns.push(RawColumn::new(ColumnLabel::flat(name), series));
    }

    debug!(rows = body.len(), columns = columns.len(), "sheet parsed");
    Ok(RawTable::new(columns)?)
}

fn infer_column_type(cells: &[Option<&Data>]) -> SheetColumnType {
    let present: Vec<&Data> = cells
        .iter()
        .flatten()
        .copied()
        .filter(|c| !is_missing_marker(c))
        .collect();
    if present.is_empty() {
        return SheetColumnType::Float;
    }

    if present.iter().all(|c| c.is_int()) {
        return SheetColumnType::Int;
    }
    if present.iter().all(|c| c.is_int() || c.is_float()) {
        let all_whole = present
            .iter()
            .all(|c| c.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0));
        return if all_whole {
            SheetColumnType::Int
        } else {
            SheetColumnType::Float
        };
    }
    if present.iter().all(|c| c.is_bool()) {
        return SheetColumnType::Bool;
    }

    let parsed: Option<Vec<NaiveDateTime>> = present.iter().map(|c| cell_datetime(c)).collect();
    match parsed {
        Some(stamps) if stamps.iter().all(|t| t.time() == NaiveTime::MIN) => SheetColumnType::Date,
        Some(_) => SheetColumnType::Datetime,
        None => SheetColumnType::Text,
    }
}

/// Excel serial dates, ISO datetimes, and ISO-looking strings.
fn cell_datetime(cell: &Data) -> Option<NaiveDateTime> {
    if cell.is_datetime() {
        return cell.as_datetime();
    }
    let text = cell.get_datetime_iso().or_else(|| cell.get_string())?;
    parse_datetime_str(text)
}

fn parse_datetime_str(s: &str) -> Option<NaiveDateTime> {
    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];
    let s = s.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

fn column_to_series(
    name: &str,
    cells: &[Option<&Data>],
    kind: SheetColumnType,
) -> Result<Series, FileParseError> {
    let series = match kind {
        SheetColumnType::Int => {
            let v: Vec<Option<i64>> = cells
                .iter()
                .map(|c| c.and_then(|c| c.as_f64()).map(|f| f as i64))
                .collect();
            Series::new(name.into(), v)
        }
        SheetColumnType::Float => {
            let v: Vec<Option<f64>> = cells.iter().map(|c| c.and_then(|c| c.as_f64())).collect();
            Series::new(name.into(), v)
        }
        SheetColumnType::Bool => {
            let v: Vec<Option<bool>> = cells.iter().map(|c| c.and_then(|c| c.get_bool())).collect();
            Series::new(name.into(), v)
        }
        SheetColumnType::Date => {
            let v: Vec<Option<NaiveDate>> = cells
                .iter()
                .map(|c| c.and_then(cell_datetime).map(|t| t.date()))
                .collect();
            date_series(name, &v)?
        }
        SheetColumnType::Datetime => {
            let v: Vec<Option<NaiveDateTime>> = cells.iter().map(|c| c.and_then(cell_datetime)).collect();
            datetime_series(name, &v)?
        }
        SheetColumnType::Text => {
            let v: Vec<Option<String>> = cells.iter().map(|c| c.map(|c| c.to_string())).collect();
            Series::new(name.into(), v)
        }
    };
    Ok(series)
}
