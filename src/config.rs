//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.burndown.toml` files.

use crate::addons::AddonSettings;
use crate::models::Weight;
use crate::tracker::bugzilla::BugzillaConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = ".burndown.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Bugzilla connection settings.
    #[serde(default)]
    pub bugzilla: BugzillaSection,

    /// Burndown chart settings.
    #[serde(default)]
    pub chart: ChartConfig,

    /// Add-on compatibility table settings.
    #[serde(default)]
    pub addons: AddonsConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "burndown.html".to_string()
}

/// Bugzilla connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BugzillaSection {
    /// Base URL of the Bugzilla instance.
    #[serde(default = "default_bugzilla_url")]
    pub url: String,

    /// API key, if the instance requires one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for BugzillaSection {
    fn default() -> Self {
        Self {
            url: default_bugzilla_url(),
            api_key: None,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_bugzilla_url() -> String {
    "https://bugzilla.mozilla.org".to_string()
}

fn default_timeout() -> u64 {
    60
}

/// What the chart counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightKind {
    #[default]
    Count,
    Points,
}

/// Burndown chart settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Days covered by the chart when no start date is given.
    #[serde(default = "default_start_period_days")]
    pub start_period_days: u64,

    /// Count bugs or sum their points.
    #[serde(default)]
    pub weight: WeightKind,

    /// Points assumed for unestimated bugs.
    #[serde(default = "default_points")]
    pub default_points: u64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            start_period_days: default_start_period_days(),
            weight: WeightKind::default(),
            default_points: default_points(),
        }
    }
}

fn default_start_period_days() -> u64 {
    84 // three 4-week months
}

fn default_points() -> u64 {
    3
}

/// Add-on compatibility table settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddonsConfig {
    /// Untested add-ons above this tier are not listed.
    #[serde(default = "default_max_untested_tier")]
    pub max_untested_tier: u32,

    /// Product for "Report bug" links.
    #[serde(default = "default_report_product")]
    pub report_product: String,

    /// Component for "Report bug" links.
    #[serde(default = "default_report_component")]
    pub report_component: String,

    /// Tracking bug that new reports block.
    #[serde(default = "default_report_blocks")]
    pub report_blocks: Option<u64>,

    /// Keywords for "Report bug" links.
    #[serde(default = "default_report_keywords")]
    pub report_keywords: String,

    /// Address for "it works" reports on untested add-ons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub it_works_address: Option<String>,
}

impl Default for AddonsConfig {
    fn default() -> Self {
        Self {
            max_untested_tier: default_max_untested_tier(),
            report_product: default_report_product(),
            report_component: default_report_component(),
            report_blocks: default_report_blocks(),
            report_keywords: default_report_keywords(),
            it_works_address: None,
        }
    }
}

fn default_max_untested_tier() -> u32 {
    2
}

fn default_report_product() -> String {
    "Firefox".to_string()
}

fn default_report_component() -> String {
    "Extension Compatibility".to_string()
}

fn default_report_blocks() -> Option<u64> {
    Some(905436) // e10s add-on tracking bug
}

fn default_report_keywords() -> String {
    "addon-compat".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were explicitly given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.bugzilla_url {
            self.bugzilla.url = url.clone();
        }
        if let Some(ref key) = args.api_key {
            self.bugzilla.api_key = Some(key.clone());
        }
        if let Some(timeout) = args.timeout {
            self.bugzilla.timeout_seconds = timeout;
        }

        if let crate::cli::Command::Chart(ref chart) = args.command {
            if chart.points {
                self.chart.weight = WeightKind::Points;
            }
            if let Some(points) = chart.default_points {
                self.chart.default_points = points;
            }
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check chart flags that only make sense with the merged settings.
    pub fn validate_chart(&self, chart: &crate::cli::ChartArgs) -> Result<(), String> {
        if chart.default_points.is_some() && self.chart.weight != WeightKind::Points {
            return Err(
                "--default-points only applies when weighting by points (--points or weight = \"points\")"
                    .to_string(),
            );
        }
        Ok(())
    }

    /// The weight the chart sums.
    pub fn weight(&self) -> Weight {
        match self.chart.weight {
            WeightKind::Count => Weight::Count,
            WeightKind::Points => Weight::Points {
                default: self.chart.default_points,
            },
        }
    }

    /// Client settings for the Bugzilla instance.
    pub fn bugzilla_config(&self) -> BugzillaConfig {
        BugzillaConfig {
            base_url: self.bugzilla.url.clone(),
            api_key: self.bugzilla.api_key.clone(),
            timeout_seconds: self.bugzilla.timeout_seconds,
        }
    }

    /// Settings for the add-on table.
    pub fn addon_settings(&self) -> AddonSettings {
        AddonSettings {
            max_untested_tier: self.addons.max_untested_tier,
            tracker_url: self.bugzilla.url.clone(),
            report_product: self.addons.report_product.clone(),
            report_component: self.addons.report_component.clone(),
            report_blocks: self.addons.report_blocks,
            report_keywords: self.addons.report_keywords.clone(),
            it_works_address: self.addons.it_works_address.clone(),
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
