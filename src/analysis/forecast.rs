//! Velocity statistics and completion forecasts.

use crate::models::{Forecast, Projection, TimeSeries};
use chrono::{Days, NaiveDate};

/// Truncate to two decimal places.
///
/// Floors instead of rounding, so `1.235` becomes `1.23`.
pub fn round_to_two_decimals(value: f64) -> f64 {
    (value * 100.0).floor() / 100.0
}

/// Derive closing/opening rates from a series and project when open work
/// reaches zero.
///
/// Returns `None` for an empty series.
pub fn forecast(series: &TimeSeries, today: NaiveDate) -> Option<Forecast> {
    let first = series.first()?;
    let last = series.last()?;

    let period_days = (last.date - first.date).num_days().max(0) as u64;

    let bugs_closed = last.closed.saturating_sub(first.closed) as f64;
    let bugs_opened = (last.open - first.open) as f64 + bugs_closed;

    let (closed_per_day, opened_per_day) = if period_days > 0 {
        (
            bugs_closed / period_days as f64,
            bugs_opened / period_days as f64,
        )
    } else {
        (0.0, 0.0)
    };
    let net_closed_per_day = closed_per_day - opened_per_day;

    Some(Forecast {
        period_days,
        current_open: last.open,
        closed_per_day,
        opened_per_day,
        net_closed_per_day,
        minimum: project(last.open, closed_per_day, today),
        maximum: project(last.open, net_closed_per_day, today),
    })
}

fn project(open: i64, rate: f64, today: NaiveDate) -> Projection {
    if rate.is_nan() || rate <= 0.0 {
        return Projection::Never;
    }

    let days_to_zero = (open.max(0) as f64 / rate).ceil() as u64;
    match today.checked_add_days(Days::new(days_to_zero)) {
        Some(projected_zero_date) => Projection::Resolves {
            days_to_zero,
            projected_zero_date,
        },
        None => Projection::Never,
    }
}

/// Render a forecast as human-readable text, one sentence per line.
pub fn summary_text(forecast: &Forecast, unit: &str) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "Over the last {} days: {} {} closed per day, {} {} opened per day (net {} per day).",
        forecast.period_days,
        round_to_two_decimals(forecast.closed_per_day),
        unit,
        round_to_two_decimals(forecast.opened_per_day),
        unit,
        round_to_two_decimals(forecast.net_closed_per_day),
    ));
    lines.push(format!("{} {} open.", forecast.current_open, unit));
    lines.push(format!(
        "Minimum forecast (no new {}): {}",
        unit, forecast.minimum
    ));
    lines.push(format!(
        "Maximum forecast (at current opening rate): {}",
        forecast.maximum
    ));

    lines.join("\n")
}
