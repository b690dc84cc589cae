//! Burndown - Bugzilla burndown charts and add-on compatibility tables
//!
//! A CLI tool that fetches a bug search from Bugzilla, charts how the
//! open and closed totals evolved day by day, and forecasts when the
//! open total will reach zero.
//!
//! Exit codes:
//!   0 - Success (including searches that match no bugs)
//!   1 - Runtime error (invalid arguments, network, auth, write failure, etc.)

mod addons;
mod analysis;
mod cli;
mod clock;
mod config;
mod models;
mod pipeline;
mod report;
mod tracker;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{AddonArgs, Args, ChartArgs, Command, OutputFormat};
use clock::{Clock, SystemClock};
use config::{Config, CONFIG_FILE_NAME};
use indicatif::{ProgressBar, ProgressStyle};
use pipeline::{BurndownOutcome, BurndownSettings};
use report::{AddonReport, BurndownReport};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use tracker::BugzillaClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if let Command::InitConfig = args.command {
        return handle_init_config();
    }

    // The config file can turn on verbose logging, so read it first
    let (mut config, origin) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    if let Command::Chart(ref chart) = args.command {
        if let Err(e) = config.validate_chart(chart) {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    init_logging(args.log_level(config.general.verbose));

    info!("Burndown v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    origin.log();

    let result = match args.command {
        Command::Chart(ref chart) => run_chart(&args, chart, &config, &SystemClock).await,
        Command::Addons(ref addon_args) => run_addons(&args, addon_args, &config).await,
        Command::InitConfig => Ok(()),
    };

    if let Err(e) = result {
        error!("Run failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle init-config: generate a default .burndown.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to set the Bugzilla URL, chart window, weights, and more.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Fetch, aggregate and render a burndown chart.
async fn run_chart(
    args: &Args,
    chart: &ChartArgs,
    config: &Config,
    clock: &dyn Clock,
) -> Result<()> {
    let start_time = Instant::now();

    let query = chart.search_query();
    let settings = chart_settings(chart, config, clock);

    println!("🔎 Searching {} for {}", config.bugzilla.url, query.describe());
    let client = BugzillaClient::new(config.bugzilla_config())?;

    let spinner = fetch_spinner(args.quiet, "Fetching bugs...");
    let outcome = pipeline::run_burndown(&client, &query, &settings).await;
    spinner.finish_and_clear();
    let outcome = outcome.context("Failed to fetch bugs")?;

    let report = BurndownReport {
        title: format!("Burndown: {}", query.describe()),
        generated_at: Utc::now(),
        outcome,
    };

    let output = report::render_burndown(&report, chart.format)?;
    let output_path = output_path(chart.output.as_deref(), config, chart.format);
    write_report(&output_path, &output)?;

    // Print summary
    match report.outcome {
        BurndownOutcome::NoResults => println!("\n🎉 Zarro boogs found."),
        BurndownOutcome::Chart(ref burndown) => {
            let unit = burndown.weight.unit();
            println!("\n📊 Burndown Summary:");
            println!(
                "   Window: {} to {} ({} days)",
                burndown.chart_start, burndown.today, burndown.forecast.period_days
            );
            println!("   Open: {} {}", burndown.forecast.current_open, unit);
            println!("   Minimum forecast: {}", burndown.forecast.minimum);
            println!("   Maximum forecast: {}", burndown.forecast.maximum);
        }
    }
    println!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());
    println!("\n✅ Report saved to: {}", output_path.display());

    Ok(())
}

/// Build and render the add-on compatibility table.
async fn run_addons(args: &Args, addon_args: &AddonArgs, config: &Config) -> Result<()> {
    println!("📥 Loading add-on spreadsheet: {}", addon_args.feed);
    let feed = addons::load_feed(&addon_args.feed, config.bugzilla.timeout_seconds).await?;

    let client = BugzillaClient::new(config.bugzilla_config())?;
    let settings = config.addon_settings();

    let spinner = fetch_spinner(args.quiet, "Resolving add-on bugs...");
    let table = addons::build_table(&client, &feed, &settings).await;
    spinner.finish_and_clear();
    let table = table.context("Failed to parse add-on spreadsheet")?;

    let report = AddonReport {
        title: "Add-on Compatibility".to_string(),
        generated_at: Utc::now(),
        table,
    };

    let output = report::render_addons(&report, &settings, addon_args.format)?;
    let output_path = addon_args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("addons.{}", addon_args.format.extension())));
    write_report(&output_path, &output)?;

    println!("\n📊 Add-on Summary:");
    println!(
        "   ✅ Compatible: {} | ❔ Not tested: {} | ⛔ Bug reported: {}",
        report.table.compatible.len(),
        report.table.untested.len(),
        report.table.incompatible.len()
    );
    println!("\n✅ Report saved to: {}", output_path.display());

    Ok(())
}

/// Chart window and weight for a run, with "today" taken from `clock`.
fn chart_settings(chart: &ChartArgs, config: &Config, clock: &dyn Clock) -> BurndownSettings {
    let today = clock.today();
    BurndownSettings {
        chart_start: analysis::chart_start(today, chart.since, config.chart.start_period_days),
        today,
        weight: config.weight(),
    }
}

/// Spinner shown while waiting on the tracker. Hidden in quiet mode.
fn fetch_spinner(quiet: bool, message: &'static str) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Where to write a chart report.
///
/// An explicit `--output` wins; otherwise the configured output is used,
/// with its extension swapped to match the format.
fn output_path(explicit: Option<&Path>, config: &Config, format: OutputFormat) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(&config.general.output).with_extension(format.extension()),
    }
}

fn write_report(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

/// Where the configuration came from, logged once logging is up.
enum ConfigOrigin {
    Explicit(PathBuf),
    DefaultFile,
    Defaults,
    Unreadable(anyhow::Error),
}

impl ConfigOrigin {
    fn log(&self) {
        match self {
            ConfigOrigin::Explicit(path) => info!("Loaded config from: {}", path.display()),
            ConfigOrigin::DefaultFile => info!("Loaded default config from {}", CONFIG_FILE_NAME),
            ConfigOrigin::Defaults => debug!("No config file found, using defaults"),
            ConfigOrigin::Unreadable(e) => warn!("Failed to load config: {:#}", e),
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigOrigin)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigOrigin::Explicit(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigOrigin::DefaultFile)),
        Ok(None) => Ok((Config::default(), ConfigOrigin::Defaults)),
        Err(e) => Ok((Config::default(), ConfigOrigin::Unreadable(e))),
    }
}
