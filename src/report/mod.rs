//! Report generation.
//!
//! Burndown and add-on reports can be rendered as a standalone HTML page,
//! Markdown, or JSON.

pub mod generator;
pub mod html;

use crate::addons::{AddonSettings, AddonTable};
use crate::cli::OutputFormat;
use crate::pipeline::BurndownOutcome;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub use generator::{generate_addons_markdown, generate_json_report, generate_markdown_report};
pub use html::{generate_addons_html, generate_burndown_html};

/// A rendered burndown run.
#[derive(Debug, Clone, Serialize)]
pub struct BurndownReport {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub outcome: BurndownOutcome,
}

/// A rendered add-on compatibility table.
#[derive(Debug, Clone, Serialize)]
pub struct AddonReport {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub table: AddonTable,
}

/// Render a burndown report in the requested format.
pub fn render_burndown(report: &BurndownReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Html => generate_burndown_html(report),
        OutputFormat::Markdown => Ok(generate_markdown_report(report)),
        OutputFormat::Json => generate_json_report(report),
    }
}

/// Render an add-on report in the requested format.
pub fn render_addons(
    report: &AddonReport,
    settings: &AddonSettings,
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Html => generate_addons_html(report, settings),
        OutputFormat::Markdown => Ok(generate_addons_markdown(report, settings)),
        OutputFormat::Json => generate_json_report(report),
    }
}
