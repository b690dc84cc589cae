//! Add-on compatibility classification.

use super::spreadsheet::SpreadsheetRow;
use crate::models::{Issue, Resolution};
use crate::tracker::IssueSource;
use chrono::NaiveDate;
use reqwest::Url;
use serde::Serialize;
use std::collections::HashMap;
use tracing::error;

/// Whether an add-on is known to work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Compatibility {
    Compatible,
    Incompatible,
    /// Not tested yet.
    Unknown,
}

impl Compatibility {
    /// Status label shown in the table.
    pub fn label(&self) -> &'static str {
        match self {
            Compatibility::Compatible => "compatible",
            Compatibility::Incompatible => "bug reported",
            Compatibility::Unknown => "not tested",
        }
    }
}

/// Bug tracking an add-on's compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum BugRef {
    /// No bug column in the spreadsheet.
    Unfiled,
    /// Explicitly marked as needing no bug.
    NoBug,
    Filed(u64),
}

/// A row of the compatibility table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Addon {
    pub name: String,
    pub tier: Option<u32>,
    pub amo_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub bug: BugRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bug_url: Option<String>,
    pub compatibility: Compatibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Map a bug resolution onto add-on compatibility.
///
/// Unexpected codes are logged and counted as incompatible.
pub fn compatibility_for(bug_id: u64, resolution: &Resolution) -> Compatibility {
    match resolution {
        Resolution::Fixed | Resolution::WorksForMe => Compatibility::Compatible,
        Resolution::Duplicate
        | Resolution::Invalid
        | Resolution::Incomplete
        | Resolution::None
        | Resolution::WontFix => Compatibility::Incompatible,
        Resolution::Other(code) => {
            error!("Bug {} has unexpected resolution: {}", bug_id, code);
            Compatibility::Incompatible
        }
    }
}

/// Build an add-on from a spreadsheet row.
pub fn addon_from_row(row: &SpreadsheetRow, source: &dyn IssueSource) -> Addon {
    let name = row.title.clone();

    let (bug, bug_url, compatibility) = match row.get("bug") {
        None => (BugRef::Unfiled, None, Compatibility::Unknown),
        Some(value) => match value.parse::<u64>() {
            Ok(id) if id > 0 => (
                BugRef::Filed(id),
                Some(source.issue_url(id)),
                Compatibility::Unknown,
            ),
            _ => (BugRef::NoBug, None, Compatibility::Compatible),
        },
    };

    let amo_url = row
        .get("amourl")
        .filter(|url| !url.is_empty())
        .map(String::from)
        .unwrap_or_else(|| amo_search_url(&name));

    Addon {
        tier: row.get("tier").and_then(|tier| tier.parse().ok()),
        date: row.get("addondate").and_then(parse_date),
        notes: row.get("notes").map(String::from),
        name,
        amo_url,
        bug,
        bug_url,
        compatibility,
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    ["%Y-%m-%d", "%m/%d/%Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

/// Search link used when the spreadsheet has no add-on page URL.
fn amo_search_url(name: &str) -> String {
    let query = format!("site:addons.mozilla.org {}", name);
    Url::parse_with_params(
        "https://www.google.com/search",
        &[("btnI", "1"), ("q", query.as_str())],
    )
    .map(String::from)
    .unwrap_or_default()
}

/// Filed bug ids, in spreadsheet order.
pub fn filed_bug_ids(addons: &[Addon]) -> Vec<u64> {
    addons
        .iter()
        .filter_map(|addon| match addon.bug {
            BugRef::Filed(id) => Some(id),
            _ => None,
        })
        .collect()
}

/// Update compatibility from the resolutions of the fetched bugs.
pub fn apply_resolutions(addons: &mut [Addon], issues: &[Issue]) {
    let resolutions: HashMap<u64, &Resolution> =
        issues.iter().map(|issue| (issue.id, &issue.resolution)).collect();

    for addon in addons.iter_mut() {
        if let BugRef::Filed(id) = addon.bug {
            if let Some(resolution) = resolutions.get(&id) {
                addon.compatibility = compatibility_for(id, resolution);
            }
        }
    }
}

/// Add-ons grouped for display.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AddonTable {
    pub compatible: Vec<Addon>,
    pub untested: Vec<Addon>,
    pub incompatible: Vec<Addon>,
}

impl AddonTable {
    /// Rows in display order.
    pub fn rows(&self) -> impl Iterator<Item = &Addon> {
        self.compatible
            .iter()
            .chain(self.untested.iter())
            .chain(self.incompatible.iter())
    }

    pub fn len(&self) -> usize {
        self.compatible.len() + self.untested.len() + self.incompatible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Group add-ons by compatibility.
///
/// Untested add-ons above `max_untested_tier` are hidden. Compatible and
/// incompatible rows are sorted by name; untested rows keep feed order.
pub fn group_addons(addons: Vec<Addon>, max_untested_tier: u32) -> AddonTable {
    let mut table = AddonTable::default();

    for addon in addons {
        match addon.compatibility {
            Compatibility::Compatible => table.compatible.push(addon),
            Compatibility::Incompatible => table.incompatible.push(addon),
            Compatibility::Unknown => {
                if matches!(addon.tier, Some(tier) if tier > max_untested_tier) {
                    continue;
                }
                table.untested.push(addon);
            }
        }
    }

    table.compatible.sort_by(|a, b| a.name.cmp(&b.name));
    table.incompatible.sort_by(|a, b| a.name.cmp(&b.name));

    table
}
