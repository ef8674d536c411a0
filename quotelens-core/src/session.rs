//! Session context driving the pipeline.
//!
//! A `Session` holds configuration and an optional remote provider. Each
//! `load` builds a fresh `Snapshot`: acquisition, normalization, descriptive
//! statistics and role analysis. Nothing is merged with a previous snapshot.
//! Changing role overrides re-runs only the role analysis.

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::chart::ChartPlan;
use crate::config::{QuoteLensConfig, StatsScope};
use crate::data::{
    fetch_remote, load_file, AcquisitionError, DataProvider, DataSource, FileFormat,
    FileParseError, Interval, Period,
};
use crate::export::{self, ExportError, ExportFormat};
use crate::normalize::{column_names, normalize, numeric_columns, NormalizedTable};
use crate::roles::{
    check_overrides, infer_roles_among, known_overrides, RoleError, RoleInference, RoleOverrides,
};
use crate::stats::{describe, five_number_summaries, ColumnDescription, FiveNumberSummary};
use crate::table::RawTable;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    FileParse(#[from] FileParseError),

    #[error(transparent)]
    Role(#[from] RoleError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error("no remote data provider configured")]
    NoProvider,
}

/// Where the next table comes from.
#[derive(Debug, Clone)]
pub enum Source {
    Remote {
        symbols: Vec<String>,
        period: Period,
        interval: Interval,
    },
    File {
        name: String,
        bytes: Vec<u8>,
        format: FileFormat,
    },
}

/// Role inference, summaries and chart plan for one group of columns.
#[derive(Debug, Clone)]
pub struct RoleReport {
    /// `None` for the pooled table.
    pub symbol: Option<String>,
    pub inference: RoleInference,
    pub summaries: Vec<FiveNumberSummary>,
    /// `None` when no role is available.
    pub chart: Option<ChartPlan>,
}

#[derive(Debug, Clone)]
pub enum Analysis {
    Pooled(RoleReport),
    PerSymbol(Vec<RoleReport>),
}

impl Analysis {
    pub fn reports(&self) -> &[RoleReport] {
        match self {
            Analysis::Pooled(report) => std::slice::from_ref(report),
            Analysis::PerSymbol(reports) => reports,
        }
    }

    /// True when no group has any role available.
    pub fn is_empty(&self) -> bool {
        self.reports().iter().all(|r| r.inference.is_empty())
    }
}

/// Everything derived from one load.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub source_label: String,
    pub source: DataSource,
    pub table: NormalizedTable,
    pub symbols: Vec<String>,
    /// Interval actually served; `None` for uploaded files.
    pub interval: Option<Interval>,
    pub warnings: Vec<String>,
    pub description: Vec<ColumnDescription>,
    pub analysis: Analysis,
}

impl Snapshot {
    /// Build a snapshot from an already acquired raw table.
    ///
    /// An override naming a column the table lacks is dropped with a warning
    /// and that role is auto-detected, so the table and its statistics still
    /// load.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        raw: &RawTable,
        source_label: String,
        source: DataSource,
        symbols: Vec<String>,
        interval: Option<Interval>,
        mut warnings: Vec<String>,
        overrides: &RoleOverrides,
        scope: StatsScope,
    ) -> Result<Self, PipelineError> {
        let table = normalize(raw)?;
        let description = describe(&table.frame)?;

        let (usable, rejected) = known_overrides(&table.frame, overrides);
        for err in rejected {
            warn!(%err, "ignoring role override");
            warnings.push(format!("{err}; detecting it automatically"));
        }
        let analysis = analyze(&table, &symbols, &usable, scope)?;

        info!(
            source = %source_label,
            rows = table.height(),
            columns = table.frame.width(),
            axis = %table.axis.name,
            "snapshot ready"
        );

        Ok(Self {
            source_label,
            source,
            table,
            symbols,
            interval,
            warnings,
            description,
            analysis,
        })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.table.frame
    }

    /// Re-run role analysis with new overrides. On error the previous analysis is kept.
    pub fn reassign(
        &mut self,
        overrides: &RoleOverrides,
        scope: StatsScope,
    ) -> Result<(), PipelineError> {
        self.analysis = analyze(&self.table, &self.symbols, overrides, scope)?;
        Ok(())
    }

    /// Export the normalized table.
    pub fn export(
        &self,
        formats: &[ExportFormat],
        config: &crate::config::ExportConfig,
        now: NaiveDateTime,
    ) -> Result<Vec<PathBuf>, PipelineError> {
        Ok(export::export(&self.table.frame, formats, config, now)?)
    }
}

/// Columns belonging to `symbol`: the symbol appears as a whitespace-separated token.
pub fn symbol_columns(df: &DataFrame, symbol: &str) -> Vec<String> {
    column_names(df)
        .into_iter()
        .filter(|name| name.split_whitespace().any(|token| token == symbol))
        .collect()
}

fn report(
    table: &NormalizedTable,
    symbol: Option<String>,
    numeric: &[String],
    overrides: &RoleOverrides,
) -> Result<RoleReport, PipelineError> {
    let inference = infer_roles_among(&table.frame, numeric, &table.axis, overrides)?;
    let summaries = five_number_summaries(&table.frame, &inference)?;
    let chart = ChartPlan::build(&table.frame, &table.axis, &inference)?;
    Ok(RoleReport {
        symbol,
        inference,
        summaries,
        chart,
    })
}

/// Role analysis for a normalized table.
///
/// With `PerSymbol` scope and more than one symbol, each symbol's columns are
/// analyzed separately; an override applies to a group only when it names one
/// of that group's columns.
pub fn analyze(
    table: &NormalizedTable,
    symbols: &[String],
    overrides: &RoleOverrides,
    scope: StatsScope,
) -> Result<Analysis, PipelineError> {
    check_overrides(&table.frame, overrides)?;
    let numeric = numeric_columns(&table.frame);

    if scope == StatsScope::Pooled || symbols.len() < 2 {
        return Ok(Analysis::Pooled(report(table, None, &numeric, overrides)?));
    }

    let reports = symbols
        .iter()
        .map(|symbol| {
            let group = symbol_columns(&table.frame, symbol);
            let group_numeric: Vec<String> = numeric
                .iter()
                .filter(|name| group.contains(name))
                .cloned()
                .collect();
            report(
                table,
                Some(symbol.clone()),
                &group_numeric,
                &overrides.restricted_to(&group),
            )
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Analysis::PerSymbol(reports))
}

/// Configuration plus the remote provider.
pub struct Session {
    pub config: QuoteLensConfig,
    provider: Option<Arc<dyn DataProvider>>,
}

impl Session {
    pub fn new(config: QuoteLensConfig) -> Self {
        Self {
            config,
            provider: None,
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn DataProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Acquire a table and build a fresh snapshot.
    pub fn load(
        &self,
        source: Source,
        overrides: &RoleOverrides,
        today: NaiveDate,
    ) -> Result<Snapshot, PipelineError> {
        let scope = self.config.stats_scope;
        match source {
            Source::Remote {
                symbols,
                period,
                interval,
            } => {
                let provider = self.provider.as_deref().ok_or(PipelineError::NoProvider)?;
                let acquired = fetch_remote(
                    provider,
                    &symbols,
                    period,
                    interval,
                    &self.config.interval_policy,
                    today,
                )?;
                let label = format!("{} ({period}, {})", acquired.symbols.join(", "), acquired.interval);
                Snapshot::build(
                    &acquired.table,
                    label,
                    acquired.source,
                    acquired.symbols,
                    Some(acquired.interval),
                    acquired.warnings,
                    overrides,
                    scope,
                )
            }
            Source::File {
                name,
                bytes,
                format,
            } => {
                let raw = load_file(&bytes, format)?;
                Snapshot::build(
                    &raw,
                    name,
                    DataSource::FileUpload,
                    Vec::new(),
                    None,
                    Vec::new(),
                    overrides,
                    scope,
                )
            }
        }
    }
}
