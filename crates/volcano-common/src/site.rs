//! Monitored sites (volcanoes) and the registry built from configuration.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{MonitorError, MonitorResult};

/// A point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A point of interest whose surroundings are archived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Half the side of the monitored square footprint.
    #[serde(default = "default_radius_km")]
    pub radius_km: f64,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub region: Option<String>,
}

fn default_radius_km() -> f64 {
    3.0
}

impl Site {
    pub fn new(name: impl Into<String>, lat: f64, lon: f64, radius_km: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lon,
            radius_km,
            active: true,
            region: None,
        }
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }

    /// Reject coordinates and radii the footprint math cannot handle.
    pub fn validate(&self) -> MonitorResult<()> {
        if self.name.trim().is_empty() {
            return Err(MonitorError::InvalidConfig("site with empty name".into()));
        }
        let name = self.name.as_str();
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(MonitorError::InvalidConfig(format!(
                "site name '{}' must be a single directory name",
                self.name
            )));
        }
        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lon) {
            return Err(MonitorError::InvalidConfig(format!(
                "site '{}' has out-of-range coordinates ({}, {})",
                self.name, self.lat, self.lon
            )));
        }
        if !(self.radius_km > 0.0) {
            return Err(MonitorError::InvalidConfig(format!(
                "site '{}' must have a positive radius_km",
                self.name
            )));
        }
        Ok(())
    }
}

/// The configured set of sites, in configuration order.
#[derive(Debug, Clone, Default)]
pub struct SiteRegistry {
    sites: Vec<Site>,
}

impl SiteRegistry {
    /// Build a registry, validating every site and rejecting duplicate names.
    pub fn new(sites: Vec<Site>) -> MonitorResult<Self> {
        for (i, site) in sites.iter().enumerate() {
            site.validate()?;
            if sites[..i].iter().any(|s| s.name == site.name) {
                return Err(MonitorError::InvalidConfig(format!(
                    "duplicate site name '{}'",
                    site.name
                )));
            }
        }
        debug!(count = sites.len(), "Loaded site registry");
        Ok(Self { sites })
    }

    pub fn all(&self) -> &[Site] {
        &self.sites
    }

    pub fn active(&self) -> impl Iterator<Item = &Site> {
        self.sites.iter().filter(|s| s.active)
    }

    pub fn get(&self, name: &str) -> Option<&Site> {
        self.sites.iter().find(|s| s.name == name)
    }

    /// Sites to process: the named one if given (even when inactive), else all active.
    pub fn select(&self, name: Option<&str>) -> MonitorResult<Vec<&Site>> {
        match name {
            Some(name) => {
                let site = self
                    .get(name)
                    .ok_or_else(|| MonitorError::UnknownSite(name.to_string()))?;
                if !site.active {
                    warn!(site = %site.name, "Selected site is inactive, processing anyway");
                }
                Ok(vec![site])
            }
            None => Ok(self.active().collect()),
        }
    }
}
