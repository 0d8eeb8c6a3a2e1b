//! Timelapse generator.
//!
//! Builds one annotated GIF per (site, composite) from the archived rasters
//! of a date window and stores it under `<site>/timelapses/`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use timelapse::{load_logo, TimelapseJob};
use volcano_common::time::parse_date;
use volcano_common::{BandComposite, DateRange, MonitorConfig};

#[derive(Parser, Debug)]
#[command(name = "timelapse")]
#[command(about = "Build annotated GIF timelapses from the Sentinel-2 archive")]
struct Args {
    /// Configuration file
    #[arg(long, env = "MONITOR_CONFIG", default_value = "config/monitor.yaml")]
    config: PathBuf,

    /// Only this site, even if inactive (default: all active sites)
    #[arg(short, long, env = "MONITOR_SITE")]
    site: Option<String>,

    /// Only this composite: RGB or ThermalFalseColor (default: both)
    #[arg(short, long)]
    composite: Option<BandComposite>,

    /// First day, YYYY-MM-DD (default: window_days before --end)
    #[arg(long, value_parser = parse_date)]
    start: Option<chrono::NaiveDate>,

    /// Last day, YYYY-MM-DD (default: today)
    #[arg(long, value_parser = parse_date)]
    end: Option<chrono::NaiveDate>,

    /// Archive root directory
    #[arg(long, env = "ARCHIVE_ROOT")]
    archive_root: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = if args.config.exists() {
        MonitorConfig::load(&args.config).context("Failed to load configuration")?
    } else {
        warn!(path = %args.config.display(), "Config file not found, using defaults");
        MonitorConfig::default()
    };
    if let Some(root) = &args.archive_root {
        config.archive_root = root.clone();
    }

    let end = args.end.unwrap_or_else(|| Utc::now().date_naive());
    let range = match args.start {
        Some(start) => DateRange::new(start, end).context("Invalid date range")?,
        None => DateRange::trailing(end, config.timelapse.window_days),
    };

    let registry = config.site_registry().context("Invalid site list")?;
    let sites = registry
        .select(args.site.as_deref())
        .context("Failed to select sites")?;
    let composites: Vec<BandComposite> = match args.composite {
        Some(c) => vec![c],
        None => BandComposite::ALL.to_vec(),
    };

    info!(
        sites = sites.len(),
        start = %range.start,
        end = %range.end,
        "Starting timelapse generation"
    );

    let logo = load_logo(config.timelapse.logo_url.as_deref()).await;
    let job = TimelapseJob::from_config(&config, logo.as_ref());

    let mut written = 0;
    let mut failed = 0;
    for site in &sites {
        for composite in &composites {
            match job.run(site, *composite, &range) {
                Ok(Some(_)) => written += 1,
                Ok(None) => {}
                Err(e) => {
                    failed += 1;
                    error!(site = %site.name, composite = %composite, error = %e, "Timelapse failed");
                }
            }
        }
    }

    info!(written, failed, "Timelapse generation complete");
    Ok(())
}
