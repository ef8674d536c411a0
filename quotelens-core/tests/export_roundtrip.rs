//! Export then re-parse: identifiers and values survive CSV and XLSX.

use chrono::NaiveDate;
use polars::prelude::*;

use quotelens_core::config::ExportConfig;
use quotelens_core::data::{load_path, FileFormat};
use quotelens_core::export::{export, to_csv_string, ExportFormat};
use quotelens_core::normalize::{normalize, NormalizedTable};
use quotelens_core::table::{date_series, series_cells, Cell, ColumnLabel, RawColumn, RawTable};

fn market_table() -> NormalizedTable {
    let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let dates: Vec<Option<NaiveDate>> = (0..4)
        .map(|i| Some(start + chrono::Duration::days(i)))
        .collect();

    let raw = RawTable::new(vec![
        RawColumn::new(
            ColumnLabel::tuple(["Date", ""]),
            date_series("Date", &dates).unwrap(),
        ),
        RawColumn::new(
            ColumnLabel::tuple(["Close", "AAPL"]),
            Series::new("c".into(), &[Some(185.5), None, Some(187.25), Some(186.0)]),
        ),
        RawColumn::new(
            ColumnLabel::tuple(["Volume", "AAPL"]),
            Series::new("v".into(), &[82_488_700i64, 58_414_500, 71_983_600, 62_303_300]),
        ),
    ])
    .unwrap();
    normalize(&raw).unwrap()
}

fn cells(df: &DataFrame, column: &str) -> Vec<Cell> {
    series_cells(df.column(column).unwrap().as_materialized_series()).unwrap()
}

fn stamp() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 3)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

#[test]
fn csv_export_reparses_to_same_identifiers_and_values() {
    let table = market_table();
    let dir = tempfile::tempdir().unwrap();
    let config = ExportConfig {
        dir: dir.path().to_path_buf(),
        ..ExportConfig::default()
    };

    let paths = export(&table.frame, &[ExportFormat::Csv], &config, stamp()).unwrap();
    let name = paths[0].file_name().unwrap().to_str().unwrap().to_string();
    assert!(name.starts_with("market_data_20240603_120000_"));
    assert!(name.ends_with(".csv"));

    let reparsed = normalize(&load_path(&paths[0]).unwrap()).unwrap();
    assert_eq!(reparsed.column_names(), table.column_names());
    assert_eq!(reparsed.axis, table.axis);
    for column in ["Date", "Close AAPL", "Volume AAPL"] {
        assert_eq!(cells(&reparsed.frame, column), cells(&table.frame, column), "{column}");
    }
}

#[test]
fn csv_rendering_is_stable_across_a_round_trip() {
    let table = market_table();
    let csv = to_csv_string(&table.frame).unwrap();
    let reparsed = quotelens_core::data::load_file(csv.as_bytes(), FileFormat::Csv).unwrap();
    let again = to_csv_string(&normalize(&reparsed).unwrap().frame).unwrap();
    assert_eq!(csv, again);
    assert!(csv.starts_with("Date,Close AAPL,Volume AAPL\n2024-01-02,185.5,82488700\n"));
}

#[test]
fn xlsx_export_reparses_to_same_identifiers_and_values() {
    let table = market_table();
    let dir = tempfile::tempdir().unwrap();
    let config = ExportConfig {
        dir: dir.path().to_path_buf(),
        ..ExportConfig::default()
    };

    let paths = export(&table.frame, &[ExportFormat::Xlsx], &config, stamp()).unwrap();
    let reparsed = normalize(&load_path(&paths[0]).unwrap()).unwrap();

    assert_eq!(reparsed.column_names(), table.column_names());
    assert_eq!(cells(&reparsed.frame, "Date"), cells(&table.frame, "Date"));
    assert_eq!(cells(&reparsed.frame, "Close AAPL"), cells(&table.frame, "Close AAPL"));
    assert_eq!(
        cells(&reparsed.frame, "Volume AAPL"),
        cells(&table.frame, "Volume AAPL")
    );
}

#[test]
fn xlsx_export_keeps_dates_before_1900_as_iso_text() {
    let dates = [
        Some(NaiveDate::from_ymd_opt(1885, 2, 16).unwrap()),
        Some(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
    ];
    let raw = RawTable::new(vec![
        RawColumn::new(ColumnLabel::flat("Date"), date_series("Date", &dates).unwrap()),
        RawColumn::new(ColumnLabel::flat("Close"), Series::new("c".into(), &[3.5, 180.25])),
    ])
    .unwrap();
    let table = normalize(&raw).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let config = ExportConfig {
        dir: dir.path().to_path_buf(),
        ..ExportConfig::default()
    };

    let paths = export(&table.frame, &[ExportFormat::Xlsx], &config, stamp()).unwrap();
    let reparsed = normalize(&load_path(&paths[0]).unwrap()).unwrap();
    assert_eq!(cells(&reparsed.frame, "Date"), cells(&table.frame, "Date"));
    assert_eq!(cells(&reparsed.frame, "Close"), cells(&table.frame, "Close"));
}
