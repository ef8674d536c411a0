//! Role inference: which column plays open, high, low, close, and volume.
//!
//! Candidates for a role are the numeric columns whose identifier contains the
//! role keyword (case-insensitive), in table order. An explicit override always
//! wins; otherwise the first candidate is taken; no candidate leaves the role
//! unassigned. Nothing here is cached: every load or override change runs the
//! inference again from scratch.

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::normalize::{column_names, numeric_columns, AxisColumn};

/// Logical role a column can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Date,
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl Role {
    /// The five market roles, in the order available columns are reported.
    pub const MARKET: [Role; 5] = [Role::Close, Role::High, Role::Low, Role::Open, Role::Volume];

    /// Substring searched for in column identifiers.
    pub fn keyword(self) -> &'static str {
        match self {
            Role::Date => "date",
            Role::Open => "open",
            Role::High => "high",
            Role::Low => "low",
            Role::Close => "close",
            Role::Volume => "volume",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Date => "Date",
            Role::Open => "Open",
            Role::High => "High",
            Role::Low => "Low",
            Role::Close => "Close",
            Role::Volume => "Volume",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "date" => Ok(Role::Date),
            "open" => Ok(Role::Open),
            "high" => Ok(Role::High),
            "low" => Ok(Role::Low),
            "close" => Ok(Role::Close),
            "volume" => Ok(Role::Volume),
            other => Err(RoleError::UnknownRole(other.to_string())),
        }
    }
}

/// Explicit per-role column choices. Roles absent from the map are auto-detected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleOverrides {
    choices: BTreeMap<Role, String>,
}

impl RoleOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, role: Role, column: impl Into<String>) -> Self {
        self.set(role, column);
        self
    }

    pub fn set(&mut self, role: Role, column: impl Into<String>) {
        self.choices.insert(role, column.into());
    }

    /// Back to auto-detect for `role`.
    pub fn clear(&mut self, role: Role) {
        self.choices.remove(&role);
    }

    pub fn get(&self, role: Role) -> Option<&str> {
        self.choices.get(&role).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, &str)> {
        self.choices.iter().map(|(role, column)| (*role, column.as_str()))
    }

    /// Keep only market-role overrides naming one of `columns`; a date override is always kept.
    pub fn restricted_to(&self, columns: &[String]) -> Self {
        let choices = self
            .choices
            .iter()
            .filter(|(role, column)| **role == Role::Date || columns.contains(column))
            .map(|(role, column)| (*role, column.clone()))
            .collect();
        Self { choices }
    }

    /// Parse `role=column` pairs such as `close=Adj Close`.
    ///
    /// A value of `auto` clears the override for that role.
    pub fn parse_pairs<I, S>(pairs: I) -> Result<Self, RoleError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (role, column) = pair
                .split_once('=')
                .ok_or_else(|| RoleError::MalformedOverride(pair.to_string()))?;
            let role: Role = role.parse()?;
            let column = column.trim();
            if column.eq_ignore_ascii_case("auto") {
                overrides.clear(role);
            } else {
                overrides.set(role, column);
            }
        }
        Ok(overrides)
    }
}

/// Final role → column mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoleAssignment {
    slots: BTreeMap<Role, String>,
}

impl RoleAssignment {
    pub fn get(&self, role: Role) -> Option<&str> {
        self.slots.get(&role).map(String::as_str)
    }

    /// Assigned market roles in `Role::MARKET` order.
    pub fn available(&self) -> Vec<(Role, &str)> {
        Role::MARKET
            .iter()
            .filter_map(|&role| self.get(role).map(|column| (role, column)))
            .collect()
    }

    fn insert(&mut self, role: Role, column: Option<String>) {
        if let Some(column) = column {
            self.slots.insert(role, column);
        }
    }
}

/// Everything a role selector needs: candidates per role and the resolved assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoleInference {
    pub candidates: BTreeMap<Role, Vec<String>>,
    pub assignment: RoleAssignment,
}

impl RoleInference {
    /// Column identifiers chosen for the market roles, in role order.
    pub fn available(&self) -> Vec<&str> {
        self.assignment
            .available()
            .into_iter()
            .map(|(_, column)| column)
            .collect()
    }

    /// No market role could be assigned.
    pub fn is_empty(&self) -> bool {
        self.assignment.available().is_empty()
    }

    pub fn candidates_for(&self, role: Role) -> &[String] {
        self.candidates.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Surface the empty state as an error value for callers that report it.
    pub fn require_any(&self) -> Result<&Self, EmptyRoleSetError> {
        if self.is_empty() {
            Err(EmptyRoleSetError)
        } else {
            Ok(self)
        }
    }
}

/// Reject overrides naming a column that is not in the frame.
pub fn check_overrides(df: &DataFrame, overrides: &RoleOverrides) -> Result<(), RoleError> {
    match known_overrides(df, overrides).1.into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Split overrides into those naming a column of `df` and errors for the rest.
pub fn known_overrides(
    df: &DataFrame,
    overrides: &RoleOverrides,
) -> (RoleOverrides, Vec<RoleError>) {
    let all_columns = column_names(df);
    let mut known = RoleOverrides::new();
    let mut rejected = Vec::new();
    for (role, column) in overrides.iter() {
        if all_columns.iter().any(|c| c == column) {
            known.set(role, column);
        } else {
            rejected.push(RoleError::UnknownColumn {
                role,
                column: column.to_string(),
            });
        }
    }
    (known, rejected)
}

/// Numeric columns whose identifier contains the role keyword, in table order.
pub fn candidates(numeric: &[String], role: Role) -> Vec<String> {
    let keyword = role.keyword();
    numeric
        .iter()
        .filter(|name| name.to_lowercase().contains(keyword))
        .cloned()
        .collect()
}

/// Pick the column for one role.
pub fn resolve(candidates: &[String], override_column: Option<&str>) -> Option<String> {
    match override_column {
        Some(column) => Some(column.to_string()),
        None => candidates.first().cloned(),
    }
}

/// Run role inference over every numeric column of the frame.
pub fn infer_roles(
    df: &DataFrame,
    axis: &AxisColumn,
    overrides: &RoleOverrides,
) -> Result<RoleInference, RoleError> {
    let numeric = numeric_columns(df);
    infer_roles_among(df, &numeric, axis, overrides)
}

/// Run role inference considering only `numeric` as candidate columns.
///
/// Overrides are checked against the whole frame, not just `numeric`.
pub fn infer_roles_among(
    df: &DataFrame,
    numeric: &[String],
    axis: &AxisColumn,
    overrides: &RoleOverrides,
) -> Result<RoleInference, RoleError> {
    check_overrides(df, overrides)?;

    let mut inference = RoleInference::default();

    let date = resolve(&[axis.name.clone()], overrides.get(Role::Date));
    inference.assignment.insert(Role::Date, date);

    for role in Role::MARKET {
        let found = candidates(numeric, role);
        let chosen = resolve(&found, overrides.get(role));
        debug!(%role, candidates = found.len(), chosen = ?chosen, "role resolved");
        inference.assignment.insert(role, chosen);
        inference.candidates.insert(role, found);
    }

    if inference.is_empty() {
        warn!("no numeric column matches close, high, low, open, or volume");
    }
    Ok(inference)
}

#[derive(Debug, thiserror::Error)]
pub enum RoleError {
    #[error("override for {role} names column '{column}', which is not in the table")]
    UnknownColumn { role: Role, column: String },

    #[error("unknown role '{0}' (expected date, open, high, low, close, or volume)")]
    UnknownRole(String),

    #[error("malformed role override '{0}' (expected role=column)")]
    MalformedOverride(String),
}

/// No numeric column matches any market role. Charts are skipped; tables and exports still work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no key columns found to chart (Close, High, Low, Open, Volume)")]
pub struct EmptyRoleSetError;
