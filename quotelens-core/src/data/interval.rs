//! Request periods, bar intervals, and the intraday coercion policy.
//!
//! Remote sources only serve sub-daily bars for short look-backs. The policy
//! here decides when a requested intraday interval must fall back to `1d`.
//! The limits are configuration, not hard truth: providers change them.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// How far back to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "10y")]
    TenYears,
    #[serde(rename = "ytd")]
    YearToDate,
    #[serde(rename = "max")]
    Max,
}

impl Period {
    pub const ALL: [Period; 11] = [
        Period::OneDay,
        Period::FiveDays,
        Period::OneMonth,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::OneYear,
        Period::TwoYears,
        Period::FiveYears,
        Period::TenYears,
        Period::YearToDate,
        Period::Max,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::FiveDays => "5d",
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
            Period::TenYears => "10y",
            Period::YearToDate => "ytd",
            Period::Max => "max",
        }
    }

    /// Calendar days covered, as seen from `today`. `None` means unbounded.
    pub fn span_days(self, today: NaiveDate) -> Option<u32> {
        match self {
            Period::OneDay => Some(1),
            Period::FiveDays => Some(5),
            Period::OneMonth => Some(31),
            Period::ThreeMonths => Some(92),
            Period::SixMonths => Some(183),
            Period::OneYear => Some(366),
            Period::TwoYears => Some(731),
            Period::FiveYears => Some(1827),
            Period::TenYears => Some(3653),
            Period::YearToDate => Some(today.ordinal()),
            Period::Max => None,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Period {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Period::ALL
            .into_iter()
            .find(|p| p.code().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseCodeError::new("period", s, &Period::ALL.map(Period::code)))
    }
}

/// Bar width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "2m")]
    TwoMinutes,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "60m")]
    SixtyMinutes,
    #[serde(rename = "90m")]
    NinetyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1wk")]
    OneWeek,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
}

impl Interval {
    pub const ALL: [Interval; 13] = [
        Interval::OneMinute,
        Interval::TwoMinutes,
        Interval::FiveMinutes,
        Interval::FifteenMinutes,
        Interval::ThirtyMinutes,
        Interval::SixtyMinutes,
        Interval::NinetyMinutes,
        Interval::OneHour,
        Interval::OneDay,
        Interval::FiveDays,
        Interval::OneWeek,
        Interval::OneMonth,
        Interval::ThreeMonths,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Interval::OneMinute => "1m",
            Interval::TwoMinutes => "2m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::ThirtyMinutes => "30m",
            Interval::SixtyMinutes => "60m",
            Interval::NinetyMinutes => "90m",
            Interval::OneHour => "1h",
            Interval::OneDay => "1d",
            Interval::FiveDays => "5d",
            Interval::OneWeek => "1wk",
            Interval::OneMonth => "1mo",
            Interval::ThreeMonths => "3mo",
        }
    }

    /// Shorter than one trading day.
    pub fn is_intraday(self) -> bool {
        matches!(
            self,
            Interval::OneMinute
                | Interval::TwoMinutes
                | Interval::FiveMinutes
                | Interval::FifteenMinutes
                | Interval::ThirtyMinutes
                | Interval::SixtyMinutes
                | Interval::NinetyMinutes
                | Interval::OneHour
        )
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Interval {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Interval::ALL
            .into_iter()
            .find(|i| i.code().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseCodeError::new("interval", s, &Interval::ALL.map(Interval::code)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}' (valid: {valid})")]
pub struct ParseCodeError {
    pub kind: &'static str,
    pub value: String,
    pub valid: String,
}

impl ParseCodeError {
    fn new(kind: &'static str, value: &str, valid: &[&str]) -> Self {
        Self {
            kind,
            value: value.to_string(),
            valid: valid.join(", "),
        }
    }
}

/// When sub-daily intervals are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalPolicy {
    /// Longest look-back, in days, that still serves intraday bars.
    pub intraday_limit_days: u32,
    /// Periods that never serve intraday bars, whatever their length.
    pub restricted_periods: Vec<Period>,
}

impl Default for IntervalPolicy {
    fn default() -> Self {
        Self {
            intraday_limit_days: 60,
            restricted_periods: vec![
                Period::OneMonth,
                Period::ThreeMonths,
                Period::SixMonths,
                Period::OneYear,
                Period::TwoYears,
                Period::FiveYears,
                Period::TenYears,
                Period::YearToDate,
                Period::Max,
            ],
        }
    }
}

/// Outcome of applying the policy to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coercion {
    pub requested: Interval,
    pub interval: Interval,
    /// Set when the interval was changed; meant for the user.
    pub warning: Option<String>,
}

impl Coercion {
    pub fn was_coerced(&self) -> bool {
        self.requested != self.interval
    }
}

impl IntervalPolicy {
    /// Downgrade an intraday interval to `1d` when the period is too long for it.
    pub fn coerce(&self, period: Period, interval: Interval, today: NaiveDate) -> Coercion {
        let too_long = self.restricted_periods.contains(&period)
            || period
                .span_days(today)
                .map_or(true, |days| days > self.intraday_limit_days);

        if interval.is_intraday() && too_long {
            let warning = format!(
                "intraday intervals (below 1 day) are only available for periods up to {} days; \
                 using '1d' instead of '{interval}' for period '{period}'",
                self.intraday_limit_days
            );
            warn!(%period, requested = %interval, "coercing interval to 1d");
            Coercion {
                requested: interval,
                interval: Interval::OneDay,
                warning: Some(warning),
            }
        } else {
            Coercion {
                requested: interval,
                interval,
                warning: None,
            }
        }
    }
}
