//! Date-bucketed aggregation of issue activity.
//!
//! Issues are folded into per-day opened/closed buckets, clamped to the
//! chart window, and the buckets are then walked in date order to produce
//! running open/closed totals.

use crate::models::{DayBucket, Issue, TimeSeries, Weight};
use chrono::{Days, NaiveDate};
use std::collections::BTreeMap;
use tracing::warn;

/// Buckets keyed and ordered by calendar day.
pub type Buckets = BTreeMap<NaiveDate, DayBucket>;

/// First day of the chart window.
///
/// An explicit `since` date wins; otherwise the window covers the last
/// `period_days` days up to `today`. The start never lies after `today`.
pub fn chart_start(today: NaiveDate, since: Option<NaiveDate>, period_days: u64) -> NaiveDate {
    match since {
        Some(since) if since > today => {
            warn!("Start date {} is after today, charting from {}", since, today);
            today
        }
        Some(since) => since,
        None => today
            .checked_sub_days(Days::new(period_days))
            .unwrap_or(NaiveDate::MIN),
    }
}

/// Fold issues into per-day opened/closed buckets.
///
/// Events before `chart_start` are clamped onto `chart_start` so that
/// activity older than the window still counts towards the totals.
pub fn bucket_by_day(issues: &[Issue], chart_start: NaiveDate, weight: Weight) -> Buckets {
    let mut buckets = Buckets::new();

    for issue in issues {
        let amount = weight.of(issue);

        let opened_day = issue.creation_day().max(chart_start);
        bucket_at(&mut buckets, opened_day).opened += amount;

        if issue.open {
            continue;
        }

        match issue.resolution_day() {
            Some(day) => bucket_at(&mut buckets, day.max(chart_start)).closed += amount,
            None => warn!("Bug {} is closed but has no resolution time", issue.id),
        }
    }

    buckets
}

fn bucket_at(buckets: &mut Buckets, date: NaiveDate) -> &mut DayBucket {
    buckets.entry(date).or_insert(DayBucket {
        date,
        opened: 0,
        closed: 0,
    })
}

/// Walk the buckets in date order and accumulate running totals.
///
/// One point is emitted per active day. A non-empty series is padded with a
/// final point at `today` carrying the last totals forward.
pub fn build_series(buckets: &Buckets, today: NaiveDate) -> TimeSeries {
    let mut series = TimeSeries::new();
    let mut open_count: i64 = 0;
    let mut closed_count: u64 = 0;

    for bucket in buckets.values() {
        open_count += bucket.opened as i64 - bucket.closed as i64;
        closed_count += bucket.closed;
        series.push(bucket.date, open_count, closed_count);
    }

    if let Some(last) = series.last() {
        if last.date < today {
            series.push(today, last.open, last.closed);
        }
    }

    series
}

/// Open issues, in the order the source returned them.
pub fn open_issues(issues: &[Issue]) -> Vec<&Issue> {
    issues.iter().filter(|issue| issue.open).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Resolution;
    use chrono::{TimeZone, Utc};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2016, 3, d).unwrap()
    }

    fn create_test_issue(id: u64, opened: u32, closed: Option<u32>) -> Issue {
        Issue {
            id,
            summary: format!("Bug {}", id),
            open: closed.is_none(),
            creation_time: Utc.with_ymd_and_hms(2016, 3, opened, 9, 30, 0).unwrap(),
            resolution_time: closed.map(|d| Utc.with_ymd_and_hms(2016, 3, d, 17, 0, 0).unwrap()),
            points: None,
            resolution: if closed.is_some() {
                Resolution::Fixed
            } else {
                Resolution::None
            },
        }
    }

    fn scenario() -> Vec<Issue> {
        vec![
            create_test_issue(1, 1, Some(3)),
            create_test_issue(2, 2, None),
            create_test_issue(3, 1, Some(1)),
        ]
    }

    #[test]
    fn test_bucket_by_day_scenario() {
        let buckets = bucket_by_day(&scenario(), day(1), Weight::Count);

        let buckets: Vec<_> = buckets.values().copied().collect();
        assert_eq!(
            buckets,
            vec![
                DayBucket { date: day(1), opened: 2, closed: 1 },
                DayBucket { date: day(2), opened: 1, closed: 0 },
                DayBucket { date: day(3), opened: 0, closed: 1 },
            ]
        );
    }

    #[test]
    fn test_build_series_scenario() {
        let buckets = bucket_by_day(&scenario(), day(1), Weight::Count);
        let series = build_series(&buckets, day(5));

        assert_eq!(series.dates(), &[day(1), day(2), day(3), day(5)]);
        assert_eq!(series.open_counts(), &[1, 2, 1, 1]);
        assert_eq!(series.closed_counts(), &[1, 1, 2, 2]);
    }

    #[test]
    fn test_events_before_window_are_clamped() {
        let issues = vec![
            create_test_issue(1, 1, None),
            create_test_issue(2, 2, Some(3)),
        ];

        let buckets = bucket_by_day(&issues, day(10), Weight::Count);

        assert_eq!(buckets.len(), 1);
        let first = buckets.values().next().unwrap();
        assert_eq!(first.date, day(10));
        assert_eq!(first.opened, 2);
        assert_eq!(first.closed, 1);
    }

    #[test]
    fn test_no_padding_when_last_event_is_today() {
        let issues = vec![create_test_issue(1, 1, Some(4))];
        let series = build_series(&bucket_by_day(&issues, day(1), Weight::Count), day(4));

        assert_eq!(series.dates(), &[day(1), day(4)]);
        assert_eq!(series.last().map(|p| p.open), Some(0));
    }

    #[test]
    fn test_empty_issue_list() {
        let buckets = bucket_by_day(&[], day(1), Weight::Count);
        assert!(buckets.is_empty());
        assert!(build_series(&buckets, day(5)).is_empty());
    }

    #[test]
    fn test_series_properties() {
        let issues = vec![
            create_test_issue(1, 1, Some(9)),
            create_test_issue(2, 3, Some(4)),
            create_test_issue(3, 4, None),
            create_test_issue(4, 6, Some(6)),
            create_test_issue(5, 7, None),
            create_test_issue(6, 2, Some(12)),
        ];
        let start = day(3);
        let today = day(20);

        let buckets = bucket_by_day(&issues, start, Weight::Count);
        let series = build_series(&buckets, today);

        assert_eq!(series.last().map(|p| p.date), Some(today));
        assert!(series.closed_counts().windows(2).all(|w| w[0] <= w[1]));

        for point in series.points() {
            let opened_by_then = issues
                .iter()
                .filter(|i| i.creation_day().max(start) <= point.date)
                .count() as i64;
            assert_eq!(point.open + point.closed as i64, opened_by_then);
        }

        // Idempotent.
        assert_eq!(build_series(&bucket_by_day(&issues, start, Weight::Count), today), series);
    }

    #[test]
    fn test_points_weight() {
        let mut estimated = create_test_issue(1, 1, Some(2));
        estimated.points = Some(5);
        let unestimated = create_test_issue(2, 1, None);

        let buckets = bucket_by_day(&[estimated, unestimated], day(1), Weight::Points { default: 3 });
        let series = build_series(&buckets, day(2));

        assert_eq!(series.open_counts(), &[8, 3]);
        assert_eq!(series.closed_counts(), &[0, 5]);
    }

    #[test]
    fn test_chart_start() {
        assert_eq!(chart_start(day(30), None, 7), day(23));
        assert_eq!(chart_start(day(30), Some(day(2)), 7), day(2));
    }

    #[test]
    fn test_future_start_date_still_ends_today() {
        let today = day(5);
        let start = chart_start(today, Some(day(20)), 84);
        assert_eq!(start, today);

        let buckets = bucket_by_day(&[create_test_issue(1, 1, None)], start, Weight::Count);
        let series = build_series(&buckets, today);

        assert_eq!(series.dates(), &[today]);
        assert_eq!(series.last().map(|p| p.open), Some(1));
    }

    #[test]
    fn test_open_issues() {
        let issues = scenario();
        let open = open_issues(&issues);
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, 2);
    }
}
