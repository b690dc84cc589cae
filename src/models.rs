//! Data models for the burndown tool.
//!
//! This module contains the core data structures shared by the tracker
//! client, the aggregator, the forecaster and the report renderers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolution code reported by the tracker for a bug.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// Open bug, or a bug with an empty resolution
    None,
    Fixed,
    Invalid,
    WontFix,
    Duplicate,
    WorksForMe,
    Incomplete,
    /// Any code the tool does not know about
    Other(String),
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::None => write!(f, "---"),
            Resolution::Fixed => write!(f, "FIXED"),
            Resolution::Invalid => write!(f, "INVALID"),
            Resolution::WontFix => write!(f, "WONTFIX"),
            Resolution::Duplicate => write!(f, "DUPLICATE"),
            Resolution::WorksForMe => write!(f, "WORKSFORME"),
            Resolution::Incomplete => write!(f, "INCOMPLETE"),
            Resolution::Other(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Resolution {
    fn from(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "" | "---" => Resolution::None,
            "FIXED" => Resolution::Fixed,
            "INVALID" => Resolution::Invalid,
            "WONTFIX" => Resolution::WontFix,
            "DUPLICATE" => Resolution::Duplicate,
            "WORKSFORME" => Resolution::WorksForMe,
            "INCOMPLETE" => Resolution::Incomplete,
            other => Resolution::Other(other.to_string()),
        }
    }
}

/// A single tracker issue, as handed over by the issue source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Tracker identifier.
    pub id: u64,
    /// One-line summary.
    pub summary: String,
    /// Whether the issue is still open.
    pub open: bool,
    /// When the issue was filed.
    pub creation_time: DateTime<Utc>,
    /// When the issue was resolved. Always `None` for open issues.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_time: Option<DateTime<Utc>>,
    /// Story points, if the issue has been estimated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<u64>,
    /// Resolution code.
    pub resolution: Resolution,
}

impl Issue {
    /// Calendar day (UTC) the issue was filed.
    pub fn creation_day(&self) -> NaiveDate {
        self.creation_time.date_naive()
    }

    /// Calendar day (UTC) the issue was resolved, if it is closed.
    pub fn resolution_day(&self) -> Option<NaiveDate> {
        if self.open {
            return None;
        }
        self.resolution_time.map(|t| t.date_naive())
    }
}

/// Which per-issue weight is summed into the buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum Weight {
    /// Every issue counts as one.
    Count,
    /// Issues count by their point value; unestimated issues count as `default`.
    Points { default: u64 },
}

impl Default for Weight {
    fn default() -> Self {
        Weight::Count
    }
}

impl Weight {
    /// Weight contributed by a single issue.
    pub fn of(&self, issue: &Issue) -> u64 {
        match self {
            Weight::Count => 1,
            // Zero points is treated as "not estimated".
            Weight::Points { default } => match issue.points {
                Some(points) if points > 0 => points,
                _ => *default,
            },
        }
    }

    /// Unit label used in forecast text and chart legends.
    pub fn unit(&self) -> &'static str {
        match self {
            Weight::Count => "bugs",
            Weight::Points { .. } => "points",
        }
    }
}

/// Opened/closed totals for a single calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub opened: u64,
    pub closed: u64,
}

/// One point of a [`TimeSeries`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub open: i64,
    pub closed: u64,
}

/// Running open/closed totals keyed by date.
///
/// The three columns are always the same length; points can only be
/// appended through [`TimeSeries::push`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimeSeries {
    dates: Vec<NaiveDate>,
    open: Vec<i64>,
    closed: Vec<u64>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a point.
    pub fn push(&mut self, date: NaiveDate, open: i64, closed: u64) {
        self.dates.push(date);
        self.open.push(open);
        self.closed.push(closed);
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn open_counts(&self) -> &[i64] {
        &self.open
    }

    pub fn closed_counts(&self) -> &[u64] {
        &self.closed
    }

    pub fn get(&self, index: usize) -> Option<SeriesPoint> {
        Some(SeriesPoint {
            date: *self.dates.get(index)?,
            open: self.open[index],
            closed: self.closed[index],
        })
    }

    pub fn first(&self) -> Option<SeriesPoint> {
        self.get(0)
    }

    pub fn last(&self) -> Option<SeriesPoint> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    pub fn points(&self) -> impl Iterator<Item = SeriesPoint> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }
}

/// Outcome of a single forecast scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Projection {
    /// Open work reaches zero after `days_to_zero` days.
    Resolves {
        days_to_zero: u64,
        projected_zero_date: NaiveDate,
    },
    /// The closing rate is not positive, so open work never reaches zero.
    Never,
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Projection::Resolves {
                days_to_zero,
                projected_zero_date,
            } => write!(
                f,
                "{} ({} days)",
                projected_zero_date.format("%Y-%m-%d"),
                days_to_zero
            ),
            Projection::Never => write!(f, "never"),
        }
    }
}

/// Velocity statistics and completion forecasts for a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Forecast {
    /// Length of the observed period, in days.
    pub period_days: u64,
    /// Open work at the end of the series.
    pub current_open: i64,
    pub closed_per_day: f64,
    pub opened_per_day: f64,
    pub net_closed_per_day: f64,
    /// Scenario assuming nothing new gets opened.
    pub minimum: Projection,
    /// Scenario assuming new work keeps arriving at the observed rate.
    pub maximum: Projection,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn issue(points: Option<u64>) -> Issue {
        Issue {
            id: 1,
            summary: "Test".to_string(),
            open: true,
            creation_time: Utc.with_ymd_and_hms(2016, 3, 1, 12, 0, 0).unwrap(),
            resolution_time: None,
            points,
            resolution: Resolution::None,
        }
    }

    #[test]
    fn test_resolution_from_str() {
        assert_eq!(Resolution::from("FIXED"), Resolution::Fixed);
        assert_eq!(Resolution::from("worksforme"), Resolution::WorksForMe);
        assert_eq!(Resolution::from(""), Resolution::None);
        assert_eq!(Resolution::from("---"), Resolution::None);
        assert_eq!(
            Resolution::from("MOVED"),
            Resolution::Other("MOVED".to_string())
        );
    }

    #[test]
    fn test_weight_of() {
        let points = Weight::Points { default: 3 };
        assert_eq!(Weight::Count.of(&issue(Some(8))), 1);
        assert_eq!(points.of(&issue(Some(8))), 8);
        assert_eq!(points.of(&issue(None)), 3);
        assert_eq!(points.of(&issue(Some(0))), 3);
    }

    #[test]
    fn test_resolution_day_ignored_while_open() {
        let mut open = issue(None);
        open.resolution_time = Some(Utc.with_ymd_and_hms(2016, 3, 2, 0, 0, 0).unwrap());
        assert_eq!(open.resolution_day(), None);

        open.open = false;
        assert_eq!(
            open.resolution_day(),
            NaiveDate::from_ymd_opt(2016, 3, 2)
        );
    }

    #[test]
    fn test_time_series_columns_stay_aligned() {
        let mut series = TimeSeries::new();
        assert!(series.last().is_none());

        let day = NaiveDate::from_ymd_opt(2016, 3, 1).unwrap();
        series.push(day, 2, 1);
        series.push(day.succ_opt().unwrap(), 1, 2);

        assert_eq!(series.len(), 2);
        assert_eq!(series.open_counts(), &[2, 1]);
        assert_eq!(series.closed_counts(), &[1, 2]);
        assert_eq!(series.last().map(|p| p.closed), Some(2));
        assert_eq!(series.points().count(), 2);
    }

    #[test]
    fn test_projection_display() {
        let resolves = Projection::Resolves {
            days_to_zero: 4,
            projected_zero_date: NaiveDate::from_ymd_opt(2016, 3, 9).unwrap(),
        };
        assert_eq!(resolves.to_string(), "2016-03-09 (4 days)");
        assert_eq!(Projection::Never.to_string(), "never");
    }
}
