//! QuoteLens CLI: fetch, load, and catalog commands.
//!
//! Commands:
//! - `fetch`: download bars for one or more symbols and report on them
//! - `load`: read a CSV/XLSX/XLS file and report on it
//! - `catalog`: list the selectable popular stocks
//!
//! `fetch` and `load` print the descriptive table, the role assignment with
//! its candidates, five-number summaries and the chart plan, and optionally
//! export the normalized table.

mod report;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use quotelens_core::config::{QuoteLensConfig, StatsScope};
use quotelens_core::data::{CircuitBreaker, FileFormat, Interval, Period, YahooProvider};
use quotelens_core::export::ExportFormat;
use quotelens_core::roles::RoleOverrides;
use quotelens_core::session::{PipelineError, Session, Snapshot, Source};

#[derive(Parser)]
#[command(name = "quotelens", about = "QuoteLens CLI: market data tables, roles, and summaries")]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch market data from Yahoo Finance.
    Fetch {
        /// Tickers or catalog labels (e.g., AAPL "Microsoft (MSFT)").
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Look-back period: 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max.
        #[arg(long)]
        period: Option<Period>,

        /// Bar interval: 1m, 2m, 5m, 15m, 30m, 60m, 90m, 1h, 1d, 5d, 1wk, 1mo, 3mo.
        #[arg(long)]
        interval: Option<Interval>,

        #[command(flatten)]
        view: ViewArgs,
    },
    /// Load a CSV, XLSX, or XLS file.
    Load {
        /// File to load.
        path: PathBuf,

        #[command(flatten)]
        view: ViewArgs,
    },
    /// List the stock catalog.
    Catalog,
}

#[derive(Args)]
struct ViewArgs {
    /// Role override as ROLE=COLUMN, e.g. "close=Adj Close". Repeatable; ROLE=auto resets.
    #[arg(long = "role", value_name = "ROLE=COLUMN")]
    roles: Vec<String>,

    /// Statistics scope for multi-symbol tables.
    #[arg(long, value_enum)]
    scope: Option<ScopeArg>,

    /// Export the normalized table.
    #[arg(long, value_enum)]
    export: Option<ExportArg>,

    /// Export directory. Defaults to the configured one.
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Print JSON instead of text.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ScopeArg {
    Pooled,
    PerSymbol,
}

impl From<ScopeArg> for StatsScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Pooled => StatsScope::Pooled,
            ScopeArg::PerSymbol => StatsScope::PerSymbol,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportArg {
    Csv,
    Xlsx,
    Both,
}

impl ExportArg {
    fn formats(self) -> &'static [ExportFormat] {
        match self {
            ExportArg::Csv => &[ExportFormat::Csv],
            ExportArg::Xlsx => &[ExportFormat::Xlsx],
            ExportArg::Both => &[ExportFormat::Csv, ExportFormat::Xlsx],
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("quotelens=info".parse()?))
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => QuoteLensConfig::from_file(path)?,
        None => QuoteLensConfig::default(),
    };

    match cli.command {
        Commands::Fetch {
            symbols,
            period,
            interval,
            view,
        } => run_fetch(&mut config, symbols, period, interval, view),
        Commands::Load { path, view } => run_load(&mut config, &path, view),
        Commands::Catalog => {
            report::print_catalog(&config.catalog);
            Ok(())
        }
    }
}

fn run_fetch(
    config: &mut QuoteLensConfig,
    symbols: Vec<String>,
    period: Option<Period>,
    interval: Option<Interval>,
    view: ViewArgs,
) -> Result<()> {
    let tickers = config.catalog.resolve_all(&symbols);
    let source = Source::Remote {
        symbols: tickers,
        period: period.unwrap_or(config.defaults.period),
        interval: interval.unwrap_or(config.defaults.interval),
    };

    let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
    let provider = YahooProvider::new(circuit_breaker, &config.provider)?;
    run_source(config, source, view, Some(Arc::new(provider)))
}

fn run_load(config: &mut QuoteLensConfig, path: &Path, view: ViewArgs) -> Result<()> {
    let format = match FileFormat::from_path(path) {
        Ok(format) => format,
        Err(err) => fail(&err),
    };
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    run_source(config, Source::File { name, bytes, format }, view, None)
}

fn run_source(
    config: &mut QuoteLensConfig,
    source: Source,
    view: ViewArgs,
    provider: Option<Arc<YahooProvider>>,
) -> Result<()> {
    let overrides = RoleOverrides::parse_pairs(&view.roles)?;
    if let Some(scope) = view.scope {
        config.stats_scope = scope.into();
    }
    if let Some(dir) = view.export_dir {
        config.export.dir = dir;
    }

    let mut session = Session::new(config.clone());
    if let Some(provider) = provider {
        session = session.with_provider(provider);
    }

    let today = chrono::Local::now().date_naive();
    let snapshot = match session.load(source, &overrides, today) {
        Ok(snapshot) => snapshot,
        Err(err @ (PipelineError::Acquisition(_) | PipelineError::FileParse(_))) => fail(&err),
        Err(err) => return Err(err.into()),
    };

    if view.json {
        println!("{}", serde_json::to_string_pretty(&report::snapshot_json(&snapshot))?);
    } else {
        report::print_snapshot(&snapshot);
    }

    if let Some(export) = view.export {
        export_snapshot(&snapshot, export, config)?;
    }
    Ok(())
}

fn export_snapshot(snapshot: &Snapshot, export: ExportArg, config: &QuoteLensConfig) -> Result<()> {
    let now = chrono::Local::now().naive_local();
    let paths = snapshot
        .export(export.formats(), &config.export, now)
        .context("export failed")?;
    for path in paths {
        eprintln!("Exported: {}", path.display());
    }
    Ok(())
}

/// Report a data problem as a plain message and exit non-zero.
fn fail(err: &dyn std::fmt::Display) -> ! {
    eprintln!("Error: {err}");
    std::process::exit(1);
}
