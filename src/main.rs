//! Planning Harvester main entry point
//!
//! This is the command-line interface for harvesting planning applications
//! from council portals.

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use clap::Parser;
use planning_harvester::config::{load_config_with_hash, Config, PortalConfig};
use planning_harvester::output::{print_summary, JsonFileSink, RecordSink, RunSummary};
use planning_harvester::{build_backend, DateRange};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Planning Harvester: polite retrieval of UK planning applications
///
/// Drives each configured council portal through its search protocol,
/// normalizes what comes back and writes one JSON array of records.
#[derive(Parser, Debug)]
#[command(name = "planning-harvester")]
#[command(version)]
#[command(about = "Harvests planning applications from council portals", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// First received date to include (YYYY-MM-DD)
    #[arg(long, value_name = "DATE", value_parser = parse_day)]
    from: Option<NaiveDate>,

    /// Last received date to include (YYYY-MM-DD), defaults to today
    #[arg(long, value_name = "DATE", value_parser = parse_day)]
    to: Option<NaiveDate>,

    /// Only harvest the named portal (repeatable); disabled portals may be named
    #[arg(long = "portal", value_name = "NAME")]
    portals: Vec<String>,

    /// Override the output file from the configuration
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Validate config and show what would be harvested without sending requests
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn parse_day(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let today = Local::now().date_naive();
    let end = cli.to.unwrap_or(today);
    let range = match cli.from {
        Some(start) => DateRange::new(start, end),
        None => DateRange::last_days(config.scrape.days, end),
    };
    if range.start > range.end {
        bail!("--from {} is after --to {}", range.start, range.end);
    }

    let selected = select_portals(&config, &cli.portals)?;
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output.path));

    if cli.dry_run {
        handle_dry_run(&config, &selected, &range, &output);
        return Ok(());
    }

    let summary = handle_harvest(&config, &selected, &range, output, config_hash).await?;
    if !cli.quiet {
        print_summary(&summary);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("planning_harvester=info,warn"),
            1 => EnvFilter::new("planning_harvester=debug,info"),
            2 => EnvFilter::new("planning_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Picks the portals to run: the named ones, or every enabled portal
fn select_portals<'a>(config: &'a Config, names: &[String]) -> anyhow::Result<Vec<&'a PortalConfig>> {
    if names.is_empty() {
        return Ok(config.enabled_portals().collect());
    }

    names
        .iter()
        .map(|name| {
            config
                .portals
                .iter()
                .find(|p| p.name.eq_ignore_ascii_case(name))
                .with_context(|| {
                    let known: Vec<&str> = config.portals.iter().map(|p| p.name.as_str()).collect();
                    format!("Unknown portal '{}' (configured: {})", name, known.join(", "))
                })
        })
        .collect()
}

/// Handles the --dry-run mode: shows what would be harvested
fn handle_dry_run(
    config: &Config,
    portals: &[&PortalConfig],
    range: &DateRange,
    output: &std::path::Path,
) {
    println!("=== Planning Harvester Dry Run ===\n");

    println!("HTTP:");
    println!("  User agent: {}", config.http.user_agent);
    println!(
        "  Timeouts: {}s request, {}s connect",
        config.http.timeout_secs, config.http.connect_timeout_secs
    );

    println!("\nDate range: {} to {}", range.start, range.end);
    println!("Output: {}", output.display());

    println!("\nPortals ({}):", portals.len());
    for portal in portals {
        let limits = portal.effective_rate_limit();
        println!(
            "  - {} [{}] {} (rate {}/s, burst {}, max {} pages, {} retries)",
            portal.name,
            portal.kind.as_str(),
            portal.base_url,
            limits.rate,
            limits.burst,
            portal.max_pages,
            portal.retry.max_retries
        );
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main harvest: portals run one after another
///
/// A failing portal contributes zero records and the run continues.
async fn handle_harvest(
    config: &Config,
    portals: &[&PortalConfig],
    range: &DateRange,
    output: PathBuf,
    config_hash: String,
) -> planning_harvester::Result<RunSummary> {
    tracing::info!(
        "Harvesting {} portals from {} to {}",
        portals.len(),
        range.start,
        range.end
    );

    let mut sink = JsonFileSink::new(output);
    let mut summary = RunSummary::new(config_hash);

    for portal in portals {
        let backend = build_backend(portal, &config.http)?;
        let report = backend.fetch(range).await;
        if report.is_failed() {
            tracing::warn!("{} failed, continuing with 0 records", report.portal);
        }
        sink.record_batch(&report.portal, &report.records)?;
        summary.record(&report);
    }

    tracing::debug!("Flushing {} buffered records", sink.pending());
    sink.finalize()?;
    Ok(summary)
}
