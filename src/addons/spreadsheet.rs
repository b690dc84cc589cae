//! Google Sheets list-feed parsing.
//!
//! Each feed entry carries the row title in `title.$t` and the remaining
//! columns flattened into `content.$t` as `"key: value, key: value"`.

use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

/// Failure while reading the spreadsheet feed.
#[derive(Debug, Error)]
pub enum SpreadsheetError {
    #[error("invalid spreadsheet feed: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct FeedDocument {
    feed: Feed,
}

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    title: TextNode,
    #[serde(default)]
    content: Option<TextNode>,
}

#[derive(Debug, Deserialize)]
struct TextNode {
    #[serde(rename = "$t", default)]
    text: String,
}

/// A single spreadsheet row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadsheetRow {
    pub title: String,
    pub columns: HashMap<String, String>,
}

impl SpreadsheetRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns.get(column).map(String::as_str)
    }
}

/// Parse a list-feed JSON document into rows.
pub fn parse_spreadsheet(json: &str) -> Result<Vec<SpreadsheetRow>, SpreadsheetError> {
    let document: FeedDocument = serde_json::from_str(json)?;

    Ok(document
        .feed
        .entry
        .into_iter()
        .map(|entry| SpreadsheetRow {
            title: entry.title.text,
            columns: entry
                .content
                .map(|content| parse_columns(&content.text))
                .unwrap_or_default(),
        })
        .collect())
}

/// Split `"tier: 1, bug: 1002880"` into key/value pairs.
fn parse_columns(content: &str) -> HashMap<String, String> {
    content
        .split(", ")
        .filter_map(|column| column.split_once(": "))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}
