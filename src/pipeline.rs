//! One-shot burndown pipeline: fetch, aggregate, forecast.

use crate::analysis::{self, Buckets};
use crate::models::{DayBucket, Forecast, Issue, TimeSeries, Weight};
use crate::tracker::{FetchError, IssueSource, SearchQuery};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

/// Settings for a single burndown run.
#[derive(Debug, Clone)]
pub struct BurndownSettings {
    /// First day of the chart window.
    pub chart_start: NaiveDate,
    /// Day the chart ends on.
    pub today: NaiveDate,
    pub weight: Weight,
}

/// An open issue together with its tracker link.
#[derive(Debug, Clone, Serialize)]
pub struct OpenIssue {
    #[serde(flatten)]
    pub issue: Issue,
    pub url: String,
}

/// Everything a renderer needs to draw a burndown.
#[derive(Debug, Clone, Serialize)]
pub struct Burndown {
    pub chart_start: NaiveDate,
    pub today: NaiveDate,
    pub weight: Weight,
    pub buckets: Vec<DayBucket>,
    pub series: TimeSeries,
    pub forecast: Forecast,
    pub open_issues: Vec<OpenIssue>,
    /// Link opening every open issue in the tracker.
    pub open_list_url: String,
}

/// Result of a burndown run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum BurndownOutcome {
    /// The search matched nothing.
    NoResults,
    /// The search matched at least one issue.
    Chart(Box<Burndown>),
}

/// Aggregate an already-fetched issue list.
pub fn aggregate(
    issues: &[Issue],
    settings: &BurndownSettings,
    source: &dyn IssueSource,
) -> BurndownOutcome {
    if issues.is_empty() {
        info!("Zarro boogs found");
        return BurndownOutcome::NoResults;
    }

    let buckets: Buckets =
        analysis::bucket_by_day(issues, settings.chart_start, settings.weight);
    let series = analysis::build_series(&buckets, settings.today);

    // A non-empty issue list always yields at least one series point.
    let Some(forecast) = analysis::forecast(&series, settings.today) else {
        return BurndownOutcome::NoResults;
    };

    let open: Vec<&Issue> = analysis::open_issues(issues);
    let open_ids: Vec<u64> = open.iter().map(|issue| issue.id).collect();
    let open_issues = open
        .into_iter()
        .map(|issue| OpenIssue {
            url: source.issue_url(issue.id),
            issue: issue.clone(),
        })
        .collect();

    BurndownOutcome::Chart(Box::new(Burndown {
        chart_start: settings.chart_start,
        today: settings.today,
        weight: settings.weight,
        buckets: buckets.into_values().collect(),
        series,
        forecast,
        open_issues,
        open_list_url: source.buglist_url(&open_ids),
    }))
}

/// Fetch issues for `query` and aggregate them.
pub async fn run_burndown(
    source: &dyn IssueSource,
    query: &SearchQuery,
    settings: &BurndownSettings,
) -> Result<BurndownOutcome, FetchError> {
    let issues = source.search_issues(query).await?;
    Ok(aggregate(&issues, settings, source))
}
