//! Text and JSON rendering of a snapshot.

use quotelens_core::chart::{ChartPlan, YAxis};
use quotelens_core::data::Catalog;
use quotelens_core::roles::Role;
use quotelens_core::session::{RoleReport, Snapshot};
use quotelens_core::stats::{ColumnDescription, FiveNumberSummary};
use serde_json::{json, Value};

/// Width of the column-name field in tables.
const NAME_WIDTH: usize = 22;

fn num(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else {
        format!("{v:.4}")
    }
}

pub fn print_snapshot(snapshot: &Snapshot) {
    let table = &snapshot.table;
    println!("Source: {}", snapshot.source_label);
    println!(
        "Rows: {}  Columns: {}",
        table.height(),
        table.frame.width()
    );
    if table.axis.is_synthesized() {
        println!("Axis: {} (row position)", table.axis.name);
    } else {
        println!("Axis: {}", table.axis.name);
    }
    if let Some(interval) = snapshot.interval {
        println!("Interval served: {interval}");
    }
    for warning in &snapshot.warnings {
        println!("warning: {warning}");
    }

    println!();
    print_description(&snapshot.description);

    for report in snapshot.analysis.reports() {
        println!();
        print_role_report(report);
    }
}

fn print_description(rows: &[ColumnDescription]) {
    println!("Descriptive statistics");
    if rows.is_empty() {
        println!("  (no numeric columns)");
        return;
    }
    println!(
        "{:<NAME_WIDTH$} {:>7} {:>14} {:>14} {:>14} {:>14} {:>14} {:>14} {:>14}",
        "Column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
    );
    println!("{}", "-".repeat(NAME_WIDTH + 8 + 15 * 8));
    for d in rows {
        println!(
            "{:<NAME_WIDTH$} {:>7} {:>14} {:>14} {:>14} {:>14} {:>14} {:>14} {:>14}",
            d.column,
            d.count,
            num(d.mean),
            num(d.std),
            num(d.min),
            num(d.q1),
            num(d.median),
            num(d.q3),
            num(d.max)
        );
    }
}

fn print_role_report(report: &RoleReport) {
    match &report.symbol {
        Some(symbol) => println!("Roles ({symbol})"),
        None => println!("Roles"),
    }

    let inference = &report.inference;
    let assigned = |role: Role| inference.assignment.get(role).unwrap_or("-");
    println!("  {:<7} {}", Role::Date.label(), assigned(Role::Date));
    for role in [Role::Open, Role::High, Role::Low, Role::Close, Role::Volume] {
        let mut options = vec!["auto".to_string()];
        options.extend(inference.candidates_for(role).iter().cloned());
        println!(
            "  {:<7} {:<NAME_WIDTH$} [{}]",
            role.label(),
            assigned(role),
            options.join(" | ")
        );
    }

    if let Err(empty) = inference.require_any() {
        println!("warning: {empty}");
        return;
    }
    println!("  Available: {}", inference.available().join(", "));

    println!();
    print_summaries(&report.summaries);

    if let Some(plan) = &report.chart {
        println!();
        print_chart_plan(plan);
    }
}

fn print_summaries(rows: &[FiveNumberSummary]) {
    println!("Five-number summary");
    print!("{:<NAME_WIDTH$}", "Column");
    for label in FiveNumberSummary::LABELS {
        print!(" {label:>14}");
    }
    println!();
    println!("{}", "-".repeat(NAME_WIDTH + 15 * 5));
    for row in rows {
        print!("{:<NAME_WIDTH$}", row.column);
        for v in row.values() {
            print!(" {:>14}", num(v));
        }
        println!();
    }
}

fn print_chart_plan(plan: &ChartPlan) {
    println!("Charts");
    let bars: Vec<&str> = plan.summary_bars.iter().map(|s| s.column.as_str()).collect();
    println!("  1. Five-number summary (grouped bars): {}", bars.join(", "));
    let boxes: Vec<String> = plan
        .boxes
        .iter()
        .map(|b| format!("{} (n={})", b.summary.column, b.values.len()))
        .collect();
    println!("  2. Distribution (box plot): {}", boxes.join(", "));
    println!("  3. {} (x = {})", plan.lines.title(), plan.lines.x_column);
    for series in &plan.lines.series {
        let axis = match series.y_axis {
            YAxis::Primary => "primary",
            YAxis::Secondary => "secondary",
        };
        println!("     - {} [{axis}]", series.column);
    }
}

pub fn print_catalog(catalog: &Catalog) {
    println!("{:<8} Label", "Ticker");
    println!("{}", "-".repeat(40));
    for entry in catalog.entries() {
        println!("{:<8} {}", entry.ticker, entry.label);
    }
}

fn report_json(report: &RoleReport) -> Value {
    json!({
        "symbol": report.symbol,
        "roles": report.inference,
        "available": report.inference.available(),
        "summaries": report.summaries,
        "chart": report.chart,
    })
}

pub fn snapshot_json(snapshot: &Snapshot) -> Value {
    json!({
        "source": snapshot.source_label,
        "rows": snapshot.table.height(),
        "columns": snapshot.table.column_names(),
        "axis": snapshot.table.axis,
        "symbols": snapshot.symbols,
        "interval": snapshot.interval.map(|i| i.to_string()),
        "warnings": snapshot.warnings,
        "description": snapshot.description,
        "analysis": snapshot
            .analysis
            .reports()
            .iter()
            .map(report_json)
            .collect::<Vec<_>>(),
    })
}
