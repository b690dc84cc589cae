//! Bugzilla REST API client.
//!
//! Searches go through `GET /rest/bug`; the response is mapped onto
//! [`Issue`] values and every failure onto a [`FetchError`].

use super::{FetchError, IssueSource, SearchQuery};
use crate::models::{Issue, Resolution};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Fields requested for every search.
const INCLUDE_FIELDS: &str =
    "id,summary,is_open,creation_time,last_change_time,cf_last_resolved,resolution,cf_fx_points";

/// Header carrying the optional API key.
const API_KEY_HEADER: &str = "X-BUGZILLA-API-KEY";

/// Bugzilla error codes that mean the request was not authorized.
const AUTH_ERROR_CODES: &[i64] = &[102, 410];

/// Configuration for the Bugzilla client.
#[derive(Debug, Clone)]
pub struct BugzillaConfig {
    /// Base URL of the Bugzilla instance, without a trailing slash.
    pub base_url: String,
    /// API key sent with every request, if any.
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for BugzillaConfig {
    fn default() -> Self {
        Self {
            base_url: "https://bugzilla.mozilla.org".to_string(),
            api_key: None,
            timeout_seconds: 60,
        }
    }
}

/// `GET /rest/bug` response.
#[derive(Debug, Deserialize)]
struct BugSearchResponse {
    #[serde(default)]
    bugs: Vec<RawBug>,
}

#[derive(Debug, Deserialize)]
struct RawBug {
    id: u64,
    #[serde(default)]
    summary: String,
    is_open: bool,
    #[serde(deserialize_with = "deserialize_timestamp")]
    creation_time: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    last_change_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    cf_last_resolved: Option<DateTime<Utc>>,
    #[serde(default)]
    resolution: String,
    #[serde(default)]
    cf_fx_points: Option<Value>,
}

/// Bugzilla timestamps are RFC 3339, except custom fields such as
/// `cf_last_resolved`, which use `YYYY-MM-DD HH:MM:SS` in UTC.
fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|time| time.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|time| time.and_utc())
        })
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse_timestamp(&value).map_err(serde::de::Error::custom)
}

fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(value) if !value.trim().is_empty() => parse_timestamp(&value)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

/// Error body returned by Bugzilla.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    error: bool,
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Client for a Bugzilla instance.
pub struct BugzillaClient {
    config: BugzillaConfig,
    http_client: reqwest::Client,
}

impl BugzillaClient {
    /// Create a new client.
    pub fn new(mut config: BugzillaConfig) -> Result<Self> {
        config.base_url = config.base_url.trim_end_matches('/').to_string();

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("burndown/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn query_pairs(query: &SearchQuery) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("include_fields", INCLUDE_FIELDS.to_string())];

        for component in &query.components {
            pairs.push(("component", component.clone()));
        }
        if let Some(ref whiteboard) = query.whiteboard {
            pairs.push(("whiteboard", whiteboard.clone()));
        }
        for blocked in &query.blocks {
            pairs.push(("blocked", blocked.to_string()));
        }
        if !query.ids.is_empty() {
            pairs.push(("id", join_ids(&query.ids)));
        }

        pairs
    }

    fn map_send_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Network(format!(
                "request timed out after {}s",
                self.config.timeout_seconds
            ))
        } else if e.is_connect() {
            FetchError::Network(format!(
                "cannot connect to Bugzilla at {}",
                self.config.base_url
            ))
        } else {
            FetchError::Network(format!("failed to send request: {}", e))
        }
    }
}

#[async_trait]
impl IssueSource for BugzillaClient {
    async fn search_issues(&self, query: &SearchQuery) -> Result<Vec<Issue>, FetchError> {
        let url = format!("{}/rest/bug", self.config.base_url);
        let started = Instant::now();
        debug!("Searching {} for: {}", url, query.describe());

        let mut request = self
            .http_client
            .get(&url)
            .query(&Self::query_pairs(query));
        if let Some(ref key) = self.config.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await.map_err(|e| self.map_send_error(e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(format!("failed to read response: {}", e)))?;

        let issues = parse_search_response(status, &body)?;
        debug!("Bug search took {} ms", started.elapsed().as_millis());
        info!("Fetched {} bugs", issues.len());

        Ok(issues)
    }

    fn issue_url(&self, id: u64) -> String {
        format!("{}/show_bug.cgi?id={}", self.config.base_url, id)
    }

    fn buglist_url(&self, ids: &[u64]) -> String {
        format!("{}/buglist.cgi?bug_id={}", self.config.base_url, join_ids(ids))
    }
}

fn join_ids(ids: &[u64]) -> String {
    ids.iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Map a raw HTTP status and body onto issues or a fetch error.
fn parse_search_response(status: StatusCode, body: &str) -> Result<Vec<Issue>, FetchError> {
    if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(body) {
        if api_error.error {
            return Err(if AUTH_ERROR_CODES.contains(&api_error.code) {
                FetchError::Auth(api_error.message)
            } else {
                FetchError::Api {
                    code: api_error.code,
                    message: api_error.message,
                }
            });
        }
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(FetchError::Auth(format!("Bugzilla returned {}", status)));
    }
    if !status.is_success() {
        return Err(FetchError::Api {
            code: i64::from(status.as_u16()),
            message: body.chars().take(200).collect(),
        });
    }

    let response: BugSearchResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::MalformedResponse(format!("invalid bug list: {}", e)))?;

    response.bugs.into_iter().map(into_issue).collect()
}

fn into_issue(bug: RawBug) -> Result<Issue, FetchError> {
    let resolution_time = if bug.is_open {
        None
    } else {
        // Not every instance tracks cf_last_resolved.
        let resolved = bug.cf_last_resolved.or(bug.last_change_time).ok_or_else(|| {
            FetchError::MalformedResponse(format!("bug {} is closed but has no resolution time", bug.id))
        })?;
        Some(resolved)
    };

    Ok(Issue {
        id: bug.id,
        summary: bug.summary,
        open: bug.is_open,
        creation_time: bug.creation_time,
        resolution_time,
        points: bug.cf_fx_points.as_ref().and_then(parse_points),
        resolution: Resolution::from(bug.resolution.as_str()),
    })
}

/// Points arrive as a number, a numeric string, or `"---"`.
fn parse_points(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, api_key: Option<&str>) -> BugzillaClient {
        BugzillaClient::new(BugzillaConfig {
            base_url: format!("{}/", server.uri()),
            api_key: api_key.map(String::from),
            timeout_seconds: 5,
        })
        .unwrap()
    }

    fn sample_bugs() -> Value {
        json!({
            "bugs": [
                {
                    "id": 1001,
                    "summary": "Crash on startup",
                    "is_open": true,
                    "creation_time": "2016-03-01T10:00:00Z",
                    "last_change_time": "2016-03-04T10:00:00Z",
                    "cf_last_resolved": null,
                    "resolution": "",
                    "cf_fx_points": "5"
                },
                {
                    "id": 1002,
                    "summary": "Slow scrolling",
                    "is_open": false,
                    "creation_time": "2016-03-01T10:00:00Z",
                    "last_change_time": "2016-03-09T10:00:00Z",
                    "cf_last_resolved": "2016-03-03T08:00:00Z",
                    "resolution": "FIXED",
                    "cf_fx_points": "---"
                },
                {
                    "id": 1003,
                    "summary": "Typo",
                    "is_open": false,
                    "creation_time": "2016-03-02T10:00:00Z",
                    "last_change_time": "2016-03-05T10:00:00Z",
                    "resolution": "WONTFIX",
                    "cf_fx_points": 2
                }
            ]
        })
    }

    #[tokio::test]
    async fn test_search_maps_bugs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/bug"))
            .and(query_param("component", "Graphics"))
            .and(query_param("blocked", "905436"))
            .and(header(API_KEY_HEADER, "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_bugs()))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("secret"));
        let query = SearchQuery {
            components: vec!["Graphics".to_string()],
            blocks: vec![905436],
            ..SearchQuery::default()
        };
        let issues = client.search_issues(&query).await.unwrap();

        assert_eq!(issues.len(), 3);

        assert!(issues[0].open);
        assert_eq!(issues[0].resolution_time, None);
        assert_eq!(issues[0].points, Some(5));

        assert_eq!(
            issues[1].resolution_time,
            Some(Utc.with_ymd_and_hms(2016, 3, 3, 8, 0, 0).unwrap())
        );
        assert_eq!(issues[1].points, None);
        assert_eq!(issues[1].resolution, Resolution::Fixed);

        // Falls back to the last change time.
        assert_eq!(
            issues[2].resolution_time,
            Some(Utc.with_ymd_and_hms(2016, 3, 5, 10, 0, 0).unwrap())
        );
        assert_eq!(issues[2].points, Some(2));
    }

    #[tokio::test]
    async fn test_search_empty_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/bug"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "bugs": [] })))
            .mount(&server)
            .await;

        let issues = client_for(&server, None)
            .search_issues(&SearchQuery::by_ids(vec![1]))
            .await
            .unwrap();
        assert!(issues.is_empty());
    }

    #[tokio::test]
    async fn test_search_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/bug"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": true,
                "code": 410,
                "message": "You must log in before using this part of Bugzilla."
            })))
            .mount(&server)
            .await;

        let err = client_for(&server, None)
            .search_issues(&SearchQuery::by_ids(vec![1]))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Auth(_)));
    }

    #[tokio::test]
    async fn test_search_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/bug"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": true,
                "code": 51,
                "message": "There is no component named 'Nope'."
            })))
            .mount(&server)
            .await;

        let err = client_for(&server, None)
            .search_issues(&SearchQuery::by_ids(vec![1]))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Api { code: 51, .. }));
    }

    #[tokio::test]
    async fn test_search_malformed_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/bug"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server, None)
            .search_issues(&SearchQuery::by_ids(vec![1]))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_search_network_failure() {
        let client = BugzillaClient::new(BugzillaConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            api_key: None,
            timeout_seconds: 5,
        })
        .unwrap();

        let err = client
            .search_issues(&SearchQuery::by_ids(vec![1]))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }

    #[test]
    fn test_closed_bug_without_timestamps_is_rejected() {
        let body = json!({
            "bugs": [{
                "id": 7,
                "is_open": false,
                "creation_time": "2016-03-02T10:00:00Z",
                "resolution": "FIXED"
            }]
        })
        .to_string();

        let err = parse_search_response(StatusCode::OK, &body).unwrap_err();
        assert!(matches!(err, FetchError::MalformedResponse(_)));
    }

    #[test]
    fn test_space_separated_timestamps() {
        let body = json!({
            "bugs": [{
                "id": 8,
                "summary": "Resolved on the custom field",
                "is_open": false,
                "creation_time": "2016-03-01T10:00:00Z",
                "last_change_time": "2016-03-09T10:00:00Z",
                "cf_last_resolved": "2016-03-03 08:00:00",
                "resolution": "FIXED"
            }, {
                "id": 9,
                "summary": "Never resolved",
                "is_open": true,
                "creation_time": "2016-03-02 11:15:00",
                "cf_last_resolved": ""
            }]
        })
        .to_string();

        let issues = parse_search_response(StatusCode::OK, &body).unwrap();
        assert_eq!(
            issues[0].resolution_time,
            Some(Utc.with_ymd_and_hms(2016, 3, 3, 8, 0, 0).unwrap())
        );
        assert_eq!(
            issues[1].creation_time,
            Utc.with_ymd_and_hms(2016, 3, 2, 11, 15, 0).unwrap()
        );
        assert_eq!(issues[1].resolution_time, None);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_urls() {
        let client = BugzillaClient::new(BugzillaConfig::default()).unwrap();
        assert_eq!(
            client.issue_url(42),
            "https://bugzilla.mozilla.org/show_bug.cgi?id=42"
        );
        assert_eq!(
            client.buglist_url(&[1, 2, 3]),
            "https://bugzilla.mozilla.org/buglist.cgi?bug_id=1,2,3"
        );
    }
}
