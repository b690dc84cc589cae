//! Markdown and JSON report generation.

use super::{AddonReport, BurndownReport};
use crate::addons::{it_works_url, report_bug_url, Addon, AddonSettings, BugRef};
use crate::analysis::summary_text;
use crate::pipeline::{Burndown, BurndownOutcome, OpenIssue};
use anyhow::Result;
use serde::Serialize;

/// Generate a complete Markdown burndown report.
pub fn generate_markdown_report(report: &BurndownReport) -> String {
    let mut output = String::new();

    // Title
    output.push_str(&format!("# {}\n\n", report.title));

    match report.outcome {
        BurndownOutcome::NoResults => {
            output.push_str("Zarro boogs found.\n\n");
        }
        BurndownOutcome::Chart(ref burndown) => {
            output.push_str(&generate_metadata_section(report, burndown));
            output.push_str(&generate_forecast_section(burndown));
            output.push_str(&generate_history_section(burndown));
            output.push_str(&generate_open_issues_section(burndown));
        }
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(report: &BurndownReport, burndown: &Burndown) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Chart Window:** {} to {}\n",
        burndown.chart_start, burndown.today
    ));
    section.push_str(&format!("- **Counting:** {}\n", burndown.weight.unit()));
    section.push_str(&format!(
        "- **Open Bugs:** {}\n",
        burndown.open_issues.len()
    ));
    section.push('\n');

    section
}

/// Generate the forecast section.
fn generate_forecast_section(burndown: &Burndown) -> String {
    let mut section = String::new();

    section.push_str("## Forecast\n\n");
    for line in summary_text(&burndown.forecast, burndown.weight.unit()).lines() {
        section.push_str(&format!("- {}\n", line));
    }
    section.push('\n');

    section
}

/// Generate the open/closed history table.
fn generate_history_section(burndown: &Burndown) -> String {
    let mut section = String::new();
    let unit = burndown.weight.unit();

    section.push_str("## History\n\n");
    section.push_str(&format!("| Date | Open {} | Closed {} |\n", unit, unit));
    section.push_str("|:---|---:|---:|\n");
    for point in burndown.series.points() {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            point.date, point.open, point.closed
        ));
    }
    section.push('\n');

    section
}

/// Generate the open issue list.
fn generate_open_issues_section(burndown: &Burndown) -> String {
    let mut section = String::new();

    section.push_str("## Open Bugs\n\n");

    if burndown.open_issues.is_empty() {
        section.push_str("Every bug in this search is closed. 🎉\n\n");
        return section;
    }

    for open in &burndown.open_issues {
        section.push_str(&format!(
            "- [{}]({})\n",
            markdown_escape(&open_issue_label(open)),
            open.url
        ));
    }
    section.push_str(&format!(
        "\n[Open bug list in Bugzilla]({})\n\n",
        burndown.open_list_url
    ));

    section
}

/// `bug <id> - <summary>`, plus the point estimate when there is one.
pub(crate) fn open_issue_label(open: &OpenIssue) -> String {
    let mut label = format!("bug {} - {}", open.issue.id, open.issue.summary);
    if let Some(points) = open.issue.points.filter(|p| *p > 0) {
        label.push_str(&format!(" ({} points)", points));
    }
    label
}

/// Generate a Markdown add-on compatibility table.
pub fn generate_addons_markdown(report: &AddonReport, settings: &AddonSettings) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", report.title));
    output.push_str(&format!(
        "*Generated {} | {} compatible | {} not tested | {} bug reported*\n\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        report.table.compatible.len(),
        report.table.untested.len(),
        report.table.incompatible.len(),
    ));

    if report.table.is_empty() {
        output.push_str("No add-ons found in the spreadsheet.\n\n");
        output.push_str(&generate_footer());
        return output;
    }

    output.push_str("| Add-on | Status | Bug |\n");
    output.push_str("|:---|:---|:---|\n");
    for addon in report.table.rows() {
        output.push_str(&format!(
            "| [{}]({}) | {} | {} |\n",
            markdown_escape(&addon.name),
            addon.amo_url,
            addon.compatibility.label(),
            addon_bug_cell(addon, settings)
        ));
    }
    output.push('\n');

    output.push_str(&generate_footer());

    output
}

fn addon_bug_cell(addon: &Addon, settings: &AddonSettings) -> String {
    match (addon.bug, addon.bug_url.as_deref()) {
        (BugRef::Filed(id), Some(url)) => format!("[bug {}]({})", id, url),
        (BugRef::Filed(id), None) => format!("bug {}", id),
        (BugRef::NoBug, _) => "no bug".to_string(),
        (BugRef::Unfiled, _) => {
            let mut cell = format!("[Report bug]({})", report_bug_url(&addon.name, settings));
            if let Some(url) = it_works_url(&addon.name, settings) {
                cell.push_str(&format!(" or [it works]({})", url));
            }
            cell
        }
    }
}

/// Escape text placed inside link labels or table cells.
fn markdown_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '|' | '[' | ']') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by burndown v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report<T: Serialize>(report: &T) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::addons::{AddonTable, Compatibility};
    use crate::models::{Forecast, Issue, Projection, Resolution, TimeSeries, Weight};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2016, 3, d).unwrap()
    }

    pub(crate) fn create_test_burndown() -> Burndown {
        let mut series = TimeSeries::new();
        series.push(day(1), 1, 1);
        series.push(day(2), 2, 1);
        series.push(day(3), 1, 2);
        series.push(day(5), 1, 2);

        Burndown {
            chart_start: day(1),
            today: day(5),
            weight: Weight::Count,
            buckets: vec![],
            series,
            forecast: Forecast {
                period_days: 4,
                current_open: 1,
                closed_per_day: 0.25,
                opened_per_day: 0.25,
                net_closed_per_day: 0.0,
                minimum: Projection::Resolves {
                    days_to_zero: 4,
                    projected_zero_date: day(9),
                },
                maximum: Projection::Never,
            },
            open_issues: vec![OpenIssue {
                issue: Issue {
                    id: 2,
                    summary: "Tabs <flicker>".to_string(),
                    open: true,
                    creation_time: Utc.with_ymd_and_hms(2016, 3, 2, 0, 0, 0).unwrap(),
                    resolution_time: None,
                    points: Some(5),
                    resolution: Resolution::None,
                },
                url: "https://bugs.test/2".to_string(),
            }],
            open_list_url: "https://bugs.test/list?ids=2".to_string(),
        }
    }

    fn create_test_report(outcome: BurndownOutcome) -> BurndownReport {
        BurndownReport {
            title: "Burndown: Graphics".to_string(),
            generated_at: Utc.with_ymd_and_hms(2016, 3, 5, 12, 0, 0).unwrap(),
            outcome,
        }
    }

    fn test_settings() -> AddonSettings {
        AddonSettings {
            max_untested_tier: 2,
            tracker_url: "https://bugs.test".to_string(),
            report_product: "Firefox".to_string(),
            report_component: "Extension Compatibility".to_string(),
            report_blocks: None,
            report_keywords: "addon-compat".to_string(),
            it_works_address: Some("compat@example.com".to_string()),
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report(BurndownOutcome::Chart(Box::new(create_test_burndown())));
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("# Burndown: Graphics"));
        assert!(markdown.contains("## Forecast"));
        assert!(markdown.contains("2016-03-09 (4 days)"));
        assert!(markdown.contains("| 2016-03-05 | 1 | 2 |"));
        assert!(markdown.contains("[bug 2 - Tabs <flicker> (5 points)](https://bugs.test/2)"));
        assert!(markdown.contains("[Open bug list in Bugzilla](https://bugs.test/list?ids=2)"));
    }

    #[test]
    fn test_generate_markdown_no_results() {
        let markdown = generate_markdown_report(&create_test_report(BurndownOutcome::NoResults));

        assert!(markdown.contains("Zarro boogs found."));
        assert!(!markdown.contains("## Forecast"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report(BurndownOutcome::Chart(Box::new(create_test_burndown())));
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"status\": \"chart\""));
        assert!(json.contains("\"series\""));
        assert!(json.contains("\"outcome\": \"never\""));

        let empty = generate_json_report(&create_test_report(BurndownOutcome::NoResults)).unwrap();
        assert!(empty.contains("\"status\": \"no_results\""));
    }

    #[test]
    fn test_markdown_escape() {
        assert_eq!(markdown_escape("a|b [c] \\d"), "a\\|b \\[c\\] \\\\d");
        assert_eq!(markdown_escape("Tabs <flicker>"), "Tabs <flicker>");
    }

    #[test]
    fn test_pipes_in_summaries_keep_table_shape() {
        let mut burndown = create_test_burndown();
        burndown.open_issues[0].issue.summary = "Crash | hang in [e10s]".to_string();
        let report = create_test_report(BurndownOutcome::Chart(Box::new(burndown)));

        let markdown = generate_markdown_report(&report);
        assert!(markdown.contains("- [bug 2 - Crash \\| hang in \\[e10s\\] (5 points)](https://bugs.test/2)"));
    }

    #[test]
    fn test_generate_addons_markdown() {
        let addon = |name: &str, bug: BugRef, compatibility: Compatibility| Addon {
            name: name.to_string(),
            tier: Some(1),
            amo_url: format!("https://amo.test/{}", name),
            date: None,
            bug,
            bug_url: match bug {
                BugRef::Filed(id) => Some(format!("https://bugs.test/{}", id)),
                _ => None,
            },
            compatibility,
            notes: None,
        };
        let report = AddonReport {
            title: "Add-on Compatibility".to_string(),
            generated_at: Utc.with_ymd_and_hms(2016, 3, 5, 12, 0, 0).unwrap(),
            table: AddonTable {
                compatible: vec![addon("Tidy", BugRef::NoBug, Compatibility::Compatible)],
                untested: vec![addon("Shiny", BugRef::Unfiled, Compatibility::Unknown)],
                incompatible: vec![addon("WOT", BugRef::Filed(7), Compatibility::Incompatible)],
            },
        };

        let markdown = generate_addons_markdown(&report, &test_settings());

        assert!(markdown.contains("| [Tidy](https://amo.test/Tidy) | compatible | no bug |"));
        assert!(markdown.contains("| not tested | [Report bug](https://bugs.test/enter_bug.cgi?"));
        assert!(markdown.contains(" or [it works](mailto:compat@example.com?subject=%22Shiny%22"));
        assert!(markdown.contains("| bug reported | [bug 7](https://bugs.test/7) |"));
    }
}
