//! Sentinel-2 acquisition service.
//!
//! One invocation runs one batch:
//! - Searches the catalog for each active site (or the one named by `--site`)
//! - Renders and archives every configured composite of each new scene
//! - Merges the site ledger and sweeps assets past the retention horizon
//!
//! With `--scan-dark` it only reports nearly black rasters already archived.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use archive::{scan_dark_assets, write_atomic, ArchiveStore};
use downloader::{AcquisitionPipeline, AuthSession, HttpCatalogClient, HttpRasterFetcher};
use volcano_common::{MonitorConfig, Site};

/// File written by `--scan-dark`, under the archive root.
const DARK_REPORT: &str = "dark_assets.txt";

#[derive(Parser, Debug)]
#[command(name = "downloader")]
#[command(about = "Archive recent Sentinel-2 composites for monitored volcanoes")]
struct Args {
    /// Configuration file
    #[arg(long, env = "MONITOR_CONFIG", default_value = "config/monitor.yaml")]
    config: PathBuf,

    /// Process only this site, even if inactive
    #[arg(short, long, env = "MONITOR_SITE")]
    site: Option<String>,

    /// Refetch and replace assets that are already archived
    #[arg(long)]
    overwrite: bool,

    /// Days back from today to search
    #[arg(long)]
    lookback_days: Option<u32>,

    /// Retention horizon in days
    #[arg(long)]
    retention_days: Option<u32>,

    /// Archive root directory
    #[arg(long, env = "ARCHIVE_ROOT")]
    archive_root: Option<PathBuf>,

    /// List nearly black archived rasters and exit
    #[arg(long)]
    scan_dark: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    /// Apply command-line overrides on top of the file configuration.
    fn apply(&self, config: &mut MonitorConfig) {
        if self.overwrite {
            config.acquisition.overwrite = true;
        }
        if let Some(days) = self.lookback_days {
            config.acquisition.lookback_days = days;
        }
        if let Some(days) = self.retention_days {
            config.retention.horizon_days = days;
        }
        if let Some(root) = &self.archive_root {
            config.archive_root = root.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
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

    info!("Starting Sentinel-2 downloader");

    let mut config = if args.config.exists() {
        MonitorConfig::load(&args.config).context("Failed to load configuration")?
    } else {
        warn!(path = %args.config.display(), "Config file not found, using defaults");
        MonitorConfig::default()
    };
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    let registry = config.site_registry().context("Invalid site list")?;
    let sites = registry
        .select(args.site.as_deref())
        .context("Failed to select sites")?;
    if sites.is_empty() {
        warn!("No active sites configured, nothing to do");
        return Ok(());
    }

    if args.scan_dark {
        return scan_dark(&config, &sites);
    }

    let auth = Arc::new(
        AuthSession::from_env(config.endpoints.token_url.clone())
            .context("Missing upstream credentials")?,
    );
    let catalog = Arc::new(HttpCatalogClient::new(auth.clone(), &config.endpoints)?);
    let fetcher = Arc::new(HttpRasterFetcher::new(
        auth,
        &config.endpoints,
        config.acquisition.max_cloud_cover,
    )?);

    let pipeline = AcquisitionPipeline::new(catalog, fetcher, &config);
    let today = Utc::now().date_naive();

    match pipeline.run(&sites, today).await {
        Ok(summary) => {
            info!(
                sites = summary.sites.len(),
                failed_sites = summary.failed_sites(),
                "Acquisition run complete"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Acquisition run aborted");
            Err(e).context("Acquisition run aborted")
        }
    }
}

/// Write every dark asset path, one per line, to the report file.
fn scan_dark(config: &MonitorConfig, sites: &[&Site]) -> Result<()> {
    let store = ArchiveStore::new(&config.archive_root);
    let threshold = config.acquisition.dark_threshold;
    let mut lines = Vec::new();

    for site in sites {
        match scan_dark_assets(&store, &site.name, threshold) {
            Ok(found) => {
                info!(site = %site.name, dark = found.len(), "Scanned site");
                lines.extend(found.iter().map(|d| store.asset_path(&d.key).display().to_string()));
            }
            Err(e) => error!(site = %site.name, error = %e, "Dark scan failed"),
        }
    }

    let report = config.archive_root.join(DARK_REPORT);
    write_report(&report, &lines)?;
    info!(path = %report.display(), count = lines.len(), "Wrote dark asset report");
    Ok(())
}

fn write_report(path: &Path, lines: &[String]) -> Result<()> {
    let mut body = lines.join("\n");
    if !body.is_empty() {
        body.push('\n');
    }
    write_atomic(path, body.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))
}
