//! QuoteLens Core: market-data acquisition, schema normalization, role inference, statistics.
//!
//! This crate turns an arbitrary table into something chartable:
//! - Data acquisition from a remote provider (Yahoo Finance) or an uploaded CSV/XLSX/XLS file
//! - Schema normalization to flat, unique column identifiers plus an axis column
//! - Role inference for date, open, high, low, close, and volume
//! - Descriptive statistics and five-number summaries
//! - A renderer-agnostic chart plan
//! - CSV and XLSX export

pub mod chart;
pub mod config;
pub mod data;
pub mod export;
pub mod normalize;
pub mod roles;
pub mod session;
pub mod stats;
pub mod table;
