//! Renderer-agnostic chart plan built from the role assignment.
//!
//! Three charts are planned: a grouped bar of five-number summaries, a box plot,
//! and a line chart over the axis column. When a volume column is assigned the
//! line chart becomes dual-axis with volume on the secondary axis. With no
//! available roles there is no plan at all.

use polars::prelude::*;
use serde::Serialize;

use crate::normalize::AxisColumn;
use crate::roles::{Role, RoleInference};
use crate::stats::{box_series, five_number_summaries, BoxSeries, FiveNumberSummary};

/// Axis a line series is drawn against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum YAxis {
    Primary,
    Secondary,
}

/// One line-chart series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSeries {
    pub column: String,
    pub y_axis: YAxis,
}

/// Line chart over the axis column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinePlan {
    pub x_column: String,
    pub series: Vec<LineSeries>,
    /// Price on the primary axis, volume on the secondary.
    pub dual_axis: bool,
}

impl LinePlan {
    pub fn title(&self) -> &'static str {
        if self.dual_axis {
            "Price and volume over time"
        } else {
            "Available variables over time"
        }
    }
}

/// All chart inputs for one role inference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPlan {
    pub summary_bars: Vec<FiveNumberSummary>,
    pub boxes: Vec<BoxSeries>,
    pub lines: LinePlan,
}

impl ChartPlan {
    /// Build the plan, or `None` when no market role is assigned.
    pub fn build(
        df: &DataFrame,
        axis: &AxisColumn,
        inference: &RoleInference,
    ) -> PolarsResult<Option<Self>> {
        if inference.is_empty() {
            return Ok(None);
        }

        let volume = inference.assignment.get(Role::Volume);
        let series = inference
            .assignment
            .available()
            .into_iter()
            .map(|(role, column)| LineSeries {
                column: column.to_string(),
                y_axis: if role == Role::Volume {
                    YAxis::Secondary
                } else {
                    YAxis::Primary
                },
            })
            .collect();

        let x_column = inference
            .assignment
            .get(Role::Date)
            .unwrap_or(axis.name.as_str())
            .to_string();

        Ok(Some(Self {
            summary_bars: five_number_summaries(df, inference)?,
            boxes: box_series(df, inference)?,
            lines: LinePlan {
                x_column,
                series,
                dual_axis: volume.is_some(),
            },
        }))
    }
}
