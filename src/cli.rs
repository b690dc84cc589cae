//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::tracker::SearchQuery;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Burndown - Bugzilla burndown charts and forecasts
///
/// Chart how a set of bugs is burning down, forecast when it will reach
/// zero, and track add-on compatibility from a spreadsheet.
///
/// Examples:
///   burndown chart --component Graphics,DOM
///   burndown chart --blocks 905436 --since 2016-01-01 --points
///   burndown addons --feed addons.json --format markdown
///   burndown init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for .burndown.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Bugzilla base URL
    #[arg(long, value_name = "URL", env = "BUGZILLA_URL", global = true)]
    pub bugzilla_url: Option<String>,

    /// Bugzilla API key
    #[arg(long, value_name = "KEY", env = "BUGZILLA_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Draw a burndown chart for a bug search
    Chart(ChartArgs),

    /// Build the add-on compatibility table
    Addons(AddonArgs),

    /// Generate a default .burndown.toml configuration file
    InitConfig,
}

/// Arguments for `burndown chart`.
#[derive(clap::Args, Debug, Clone)]
pub struct ChartArgs {
    /// Components to search (comma-separated)
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub component: Vec<String>,

    /// Whiteboard text to search for
    #[arg(long, value_name = "TEXT")]
    pub whiteboard: Option<String>,

    /// Only bugs blocking these bugs (comma-separated)
    #[arg(long, alias = "bug", value_name = "IDS", value_delimiter = ',')]
    pub blocks: Vec<u64>,

    /// First day of the chart (YYYY-MM-DD)
    ///
    /// Defaults to the configured period before today.
    #[arg(long, value_name = "DATE")]
    pub since: Option<NaiveDate>,

    /// Sum story points instead of counting bugs
    #[arg(long)]
    pub points: bool,

    /// Points assumed for bugs without an estimate
    #[arg(long, value_name = "N")]
    pub default_points: Option<u64>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (html, markdown, json)
    #[arg(long, default_value = "html", value_name = "FORMAT")]
    pub format: OutputFormat,
}

/// Arguments for `burndown addons`.
#[derive(clap::Args, Debug, Clone)]
pub struct AddonArgs {
    /// Spreadsheet list feed (JSON file or http(s) URL)
    #[arg(long, value_name = "FILE|URL")]
    pub feed: String,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (html, markdown, json)
    #[arg(long, default_value = "html", value_name = "FORMAT")]
    pub format: OutputFormat,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// HTML page with an inline chart (default)
    #[default]
    Html,
    /// Markdown format
    Markdown,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// File extension for reports in this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
        }
    }
}

impl ChartArgs {
    /// Search terms given on the command line.
    pub fn search_query(&self) -> SearchQuery {
        SearchQuery {
            components: self.component.clone(),
            whiteboard: self.whiteboard.clone(),
            blocks: self.blocks.clone(),
            ids: Vec::new(),
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref url) = self.bugzilla_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Bugzilla URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        match self.command {
            Command::Chart(ref chart) => {
                if chart.search_query().is_empty() {
                    return Err(
                        "At least one of --component, --whiteboard or --blocks is required"
                            .to_string(),
                    );
                }
            }
            Command::Addons(ref addons) => {
                if addons.feed.trim().is_empty() {
                    return Err("--feed must not be empty".to_string());
                }
            }
            Command::InitConfig => {}
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `verbose_by_default` comes from the config file; `--quiet` beats it.
    pub fn log_level(&self, verbose_by_default: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || verbose_by_default {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
