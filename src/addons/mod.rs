//! Add-on compatibility table.
//!
//! Reads the add-on spreadsheet, resolves the filed bugs against the
//! tracker and groups the add-ons by compatibility.

pub mod compat;
pub mod spreadsheet;

use crate::tracker::{IssueSource, SearchQuery};
use anyhow::{Context, Result};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::Url;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info};

pub use compat::{
    addon_from_row, apply_resolutions, compatibility_for, filed_bug_ids, group_addons, Addon,
    AddonTable, BugRef, Compatibility,
};
pub use spreadsheet::{parse_spreadsheet, SpreadsheetError, SpreadsheetRow};

/// Settings for building the add-on table.
#[derive(Debug, Clone)]
pub struct AddonSettings {
    /// Untested add-ons above this tier are hidden.
    pub max_untested_tier: u32,
    /// Tracker base URL used for "Report bug" links.
    pub tracker_url: String,
    pub report_product: String,
    pub report_component: String,
    pub report_blocks: Option<u64>,
    pub report_keywords: String,
    /// Mailbox collecting "it works" reports for untested add-ons.
    pub it_works_address: Option<String>,
}

/// Read the spreadsheet feed from a local file or an `http(s)` URL.
pub async fn load_feed(location: &str, timeout_seconds: u64) -> Result<String> {
    if location.starts_with("http://") || location.starts_with("https://") {
        debug!("Downloading spreadsheet feed from {}", location);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        let response = client
            .get(location)
            .send()
            .await
            .with_context(|| format!("Failed to download spreadsheet feed: {}", location))?
            .error_for_status()
            .with_context(|| format!("Spreadsheet feed request failed: {}", location))?;

        return response
            .text()
            .await
            .context("Failed to read spreadsheet feed");
    }

    std::fs::read_to_string(Path::new(location))
        .with_context(|| format!("Failed to read spreadsheet feed: {}", location))
}

/// Build the compatibility table from a feed document.
///
/// A tracker failure is logged and the table falls back to what the
/// spreadsheet alone says.
pub async fn build_table(
    source: &dyn IssueSource,
    feed_json: &str,
    settings: &AddonSettings,
) -> Result<AddonTable, SpreadsheetError> {
    let rows = parse_spreadsheet(feed_json)?;
    let mut addons: Vec<Addon> = rows
        .iter()
        .map(|row| addon_from_row(row, source))
        .collect();
    info!("Parsed {} add-ons from spreadsheet", addons.len());

    let bug_ids = filed_bug_ids(&addons);
    if !bug_ids.is_empty() {
        match source.search_issues(&SearchQuery::by_ids(bug_ids)).await {
            Ok(issues) => apply_resolutions(&mut addons, &issues),
            Err(e) => error!("Failed to resolve add-on bugs: {}", e),
        }
    }

    Ok(group_addons(addons, settings.max_untested_tier))
}

/// Link for filing a compatibility bug against an add-on.
pub fn report_bug_url(addon_name: &str, settings: &AddonSettings) -> String {
    let base = format!("{}/enter_bug.cgi", settings.tracker_url.trim_end_matches('/'));
    let mut params = vec![
        ("format", "__default__".to_string()),
        ("product", settings.report_product.clone()),
        ("component", settings.report_component.clone()),
        ("keywords", settings.report_keywords.clone()),
        (
            "short_desc",
            format!("\"{}\" add-on does not work with e10s", addon_name),
        ),
    ];
    if let Some(blocks) = settings.report_blocks {
        params.push(("blocked", blocks.to_string()));
    }

    Url::parse_with_params(&base, &params)
        .map(String::from)
        .unwrap_or(base)
}

/// `mailto:` link for reporting that an untested add-on works.
///
/// `None` when no address is configured.
pub fn it_works_url(addon_name: &str, settings: &AddonSettings) -> Option<String> {
    let address = settings.it_works_address.as_deref()?;
    let subject = format!("\"{}\" add-on works with e10s!", addon_name);
    let body = format!("Add-on:\n{}\n", addon_name);

    Some(format!(
        "mailto:{}?subject={}&body={}",
        address,
        utf8_percent_encode(&subject, NON_ALPHANUMERIC),
        utf8_percent_encode(&body, NON_ALPHANUMERIC)
    ))
}
