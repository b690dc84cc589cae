//! Burndown aggregation and forecasting.
//!
//! This module turns a flat list of issues into running open/closed
//! totals and derives velocity forecasts from them.

pub mod aggregator;
pub mod forecast;

pub use aggregator::{bucket_by_day, build_series, chart_start, open_issues, Buckets};
pub use forecast::{forecast, round_to_two_decimals, summary_text};
