//! Configuration loading for the archive and timelapse jobs.
//!
//! Loads a single YAML file (default `config/monitor.yaml`). Every section
//! and field has a default, so an empty file is a valid configuration with no
//! sites.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::composite::CompositeProfile;
use crate::error::{MonitorError, MonitorResult};
use crate::site::{Site, SiteRegistry};

/// Root configuration loaded from the monitor YAML file.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_archive_root")]
    pub archive_root: PathBuf,
    #[serde(default)]
    pub sites: Vec<Site>,
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
    #[serde(default = "CompositeProfile::defaults")]
    pub composites: Vec<CompositeProfile>,
    #[serde(default)]
    pub endpoints: EndpointConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub timelapse: TimelapseConfig,
}

fn default_archive_root() -> PathBuf {
    PathBuf::from("data/sentinel2")
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            archive_root: default_archive_root(),
            sites: Vec::new(),
            acquisition: AcquisitionConfig::default(),
            composites: CompositeProfile::defaults(),
            endpoints: EndpointConfig::default(),
            retention: RetentionConfig::default(),
            timelapse: TimelapseConfig::default(),
        }
    }
}

/// How rasters are written to the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveCompression {
    /// Store the renderer's bytes untouched.
    #[default]
    AsFetched,
    /// Re-encode the PNG at maximum deflate compression.
    Lossless,
}

/// Catalog search and fetch settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AcquisitionConfig {
    /// How many days back from today the catalog is searched.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    /// Cloud cover ceiling in percent.
    #[serde(default = "default_max_cloud_cover")]
    pub max_cloud_cover: f64,
    /// Refetch and replace assets that already exist.
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default)]
    pub compression: ArchiveCompression,
    /// Mean brightness (0-255) under which a raster is reported as dark.
    #[serde(default = "default_dark_threshold")]
    pub dark_threshold: f64,
}

fn default_lookback_days() -> u32 {
    30
}

fn default_max_cloud_cover() -> f64 {
    30.0
}

fn default_dark_threshold() -> f64 {
    5.0
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            max_cloud_cover: default_max_cloud_cover(),
            overwrite: false,
            compression: ArchiveCompression::default(),
            dark_threshold: default_dark_threshold(),
        }
    }
}

/// Upstream identity, catalog and process endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,
    #[serde(default = "default_process_url")]
    pub process_url: String,
    #[serde(default = "default_catalog_timeout")]
    pub catalog_timeout_secs: u64,
    #[serde(default = "default_render_timeout")]
    pub render_timeout_secs: u64,
    #[serde(default = "default_max_records")]
    pub max_records: u32,
}

fn default_token_url() -> String {
    "https://identity.dataspace.copernicus.eu/auth/realms/CDSE/protocol/openid-connect/token"
        .to_string()
}

fn default_catalog_url() -> String {
    "https://catalogue.dataspace.copernicus.eu/resto/api/collections/Sentinel2/search.json"
        .to_string()
}

fn default_process_url() -> String {
    "https://sh.dataspace.copernicus.eu/api/v1/process".to_string()
}

fn default_catalog_timeout() -> u64 {
    30
}

fn default_render_timeout() -> u64 {
    60
}

fn default_max_records() -> u32 {
    50
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            token_url: default_token_url(),
            catalog_url: default_catalog_url(),
            process_url: default_process_url(),
            catalog_timeout_secs: default_catalog_timeout(),
            render_timeout_secs: default_render_timeout(),
            max_records: default_max_records(),
        }
    }
}

/// Data retention settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    /// Drop ledger rows for swept assets.
    #[serde(default = "default_true")]
    pub prune_ledger: bool,
}

fn default_horizon_days() -> u32 {
    60
}

fn default_true() -> bool {
    true
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            horizon_days: default_horizon_days(),
            prune_ledger: true,
        }
    }
}

/// Animated composite settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TimelapseConfig {
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    #[serde(default = "default_frame_duration")]
    pub frame_duration_ms: u32,
    #[serde(default = "default_size_budget")]
    pub size_budget_bytes: usize,
    #[serde(default = "default_downscale")]
    pub downscale_factor: f32,
    /// Bits kept per channel by the palette reduction pass.
    #[serde(default = "default_palette_bits")]
    pub palette_bits: u8,
    #[serde(default = "default_scale_bar_km")]
    pub scale_bar_km: f64,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default = "default_font_paths")]
    pub font_paths: Vec<PathBuf>,
    #[serde(default = "default_bold_font_paths")]
    pub bold_font_paths: Vec<PathBuf>,
}

fn default_window_days() -> u32 {
    30
}

fn default_frame_duration() -> u32 {
    1000
}

fn default_size_budget() -> usize {
    1_572_864 // 1.5 MB
}

fn default_downscale() -> f32 {
    0.85
}

fn default_palette_bits() -> u8 {
    5
}

fn default_scale_bar_km() -> f64 {
    3.0
}

fn default_font_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
        PathBuf::from("/usr/share/fonts/TTF/DejaVuSans.ttf"),
        PathBuf::from("/Library/Fonts/Arial.ttf"),
    ]
}

fn default_bold_font_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf"),
        PathBuf::from("/usr/share/fonts/TTF/DejaVuSans-Bold.ttf"),
        PathBuf::from("/Library/Fonts/Arial Bold.ttf"),
    ]
}

impl Default for TimelapseConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            frame_duration_ms: default_frame_duration(),
            size_budget_bytes: default_size_budget(),
            downscale_factor: default_downscale(),
            palette_bits: default_palette_bits(),
            scale_bar_km: default_scale_bar_km(),
            logo_url: None,
            font_paths: default_font_paths(),
            bold_font_paths: default_bold_font_paths(),
        }
    }
}

impl MonitorConfig {
    /// Load a configuration from a YAML file.
    pub fn load(path: &Path) -> MonitorResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MonitorError::InvalidConfig(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config = Self::from_yaml(&content)?;
        info!(
            path = %path.display(),
            sites = config.sites.len(),
            composites = config.composites.len(),
            "Loaded monitor configuration"
        );
        Ok(config)
    }

    /// Parse and validate a configuration from YAML text.
    pub fn from_yaml(content: &str) -> MonitorResult<Self> {
        let config: MonitorConfig = if content.trim().is_empty() {
            MonitorConfig::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.validate()?;
        debug!(archive_root = %config.archive_root.display(), "Parsed monitor configuration");
        Ok(config)
    }

    pub fn validate(&self) -> MonitorResult<()> {
        for profile in &self.composites {
            if profile.width == 0 || profile.height == 0 {
                return Err(MonitorError::InvalidConfig(format!(
                    "composite {} has zero pixel size",
                    profile.kind
                )));
            }
            if matches!(profile.radius_km, Some(r) if !(r > 0.0)) {
                return Err(MonitorError::InvalidConfig(format!(
                    "composite {} radius_km must be positive",
                    profile.kind
                )));
            }
        }
        for (i, profile) in self.composites.iter().enumerate() {
            if self.composites[..i].iter().any(|p| p.kind == profile.kind) {
                return Err(MonitorError::InvalidConfig(format!(
                    "composite {} configured twice",
                    profile.kind
                )));
            }
        }
        if !(0.0..=100.0).contains(&self.acquisition.max_cloud_cover) {
            return Err(MonitorError::InvalidConfig(
                "max_cloud_cover must be within 0-100".into(),
            ));
        }
        if !(self.timelapse.downscale_factor > 0.0 && self.timelapse.downscale_factor < 1.0) {
            return Err(MonitorError::InvalidConfig(
                "downscale_factor must be within (0, 1)".into(),
            ));
        }
        if !(1..=8).contains(&self.timelapse.palette_bits) {
            return Err(MonitorError::InvalidConfig(
                "palette_bits must be within 1-8".into(),
            ));
        }
        Ok(())
    }

    /// Validated site registry for this configuration.
    pub fn site_registry(&self) -> MonitorResult<SiteRegistry> {
        SiteRegistry::new(self.sites.clone())
    }
}
