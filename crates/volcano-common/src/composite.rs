//! Band composites and their render recipes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MonitorError;
use crate::footprint::GeoFootprint;
use crate::site::Site;

const EVALSCRIPT_TRUE_COLOR: &str = r#"//VERSION=3
function setup() {
  return {
    input: ["B04", "B03", "B02"],
    output: { bands: 3 }
  };
}

function evaluatePixel(sample) {
  return [2.5 * sample.B04, 2.5 * sample.B03, 2.5 * sample.B02];
}
"#;

const EVALSCRIPT_THERMAL: &str = r#"//VERSION=3
function setup() {
  return {
    input: ["B12", "B11", "B04"],
    output: { bands: 3 }
  };
}

function evaluatePixel(sample) {
  return [2.5 * sample.B12, 2.5 * sample.B11, 2.5 * sample.B04];
}
"#;

/// A fixed 3-band rendering recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BandComposite {
    #[serde(rename = "RGB")]
    TrueColor,
    #[serde(rename = "ThermalFalseColor")]
    ThermalFalseColor,
}

impl BandComposite {
    pub const ALL: [BandComposite; 2] = [BandComposite::TrueColor, BandComposite::ThermalFalseColor];

    /// Identifier used for directories, file names and the ledger `tipo` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            BandComposite::TrueColor => "RGB",
            BandComposite::ThermalFalseColor => "ThermalFalseColor",
        }
    }

    /// Caption drawn on annotated frames.
    pub fn label(&self) -> &'static str {
        match self {
            BandComposite::TrueColor => "Sentinel-2 L2A RGB",
            BandComposite::ThermalFalseColor => "Sentinel-2 L2A SWIR (B12-B11-B04)",
        }
    }

    /// Input bands, in output channel order.
    pub fn bands(&self) -> [&'static str; 3] {
        match self {
            BandComposite::TrueColor => ["B04", "B03", "B02"],
            BandComposite::ThermalFalseColor => ["B12", "B11", "B04"],
        }
    }

    pub fn evalscript(&self) -> &'static str {
        match self {
            BandComposite::TrueColor => EVALSCRIPT_TRUE_COLOR,
            BandComposite::ThermalFalseColor => EVALSCRIPT_THERMAL,
        }
    }
}

impl fmt::Display for BandComposite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BandComposite {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RGB" | "rgb" | "true-color" | "TrueColor" => Ok(BandComposite::TrueColor),
            "ThermalFalseColor" | "thermal" | "swir" => Ok(BandComposite::ThermalFalseColor),
            other => Err(MonitorError::InvalidConfig(format!(
                "unknown composite '{}', expected RGB or ThermalFalseColor",
                other
            ))),
        }
    }
}

/// Per-invocation render settings for one composite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeProfile {
    pub kind: BandComposite,
    #[serde(default = "default_pixels")]
    pub width: u32,
    #[serde(default = "default_pixels")]
    pub height: u32,
    /// Overrides the site radius when set.
    #[serde(default)]
    pub radius_km: Option<f64>,
}

fn default_pixels() -> u32 {
    1024
}

impl CompositeProfile {
    pub fn new(kind: BandComposite) -> Self {
        Self {
            kind,
            width: default_pixels(),
            height: default_pixels(),
            radius_km: None,
        }
    }

    /// Default profiles: both composites at 1024 × 1024 with the site radius.
    pub fn defaults() -> Vec<CompositeProfile> {
        BandComposite::ALL.iter().copied().map(Self::new).collect()
    }

    pub fn radius_for(&self, site: &Site) -> f64 {
        self.radius_km.unwrap_or(site.radius_km)
    }

    /// Footprint requested from the renderer for `site`.
    pub fn footprint(&self, site: &Site) -> GeoFootprint {
        GeoFootprint::around(site.center(), self.radius_for(site), self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_names() {
        for c in BandComposite::ALL {
            assert_eq!(c.as_str().parse::<BandComposite>().unwrap(), c);
        }
        assert!("NDVI".parse::<BandComposite>().is_err());
    }

    #[test]
    fn test_serde_uses_directory_names() {
        let json = serde_json::to_string(&BandComposite::ThermalFalseColor).unwrap();
        assert_eq!(json, "\"ThermalFalseColor\"");
        let c: BandComposite = serde_json::from_str("\"RGB\"").unwrap();
        assert_eq!(c, BandComposite::TrueColor);
    }

    #[test]
    fn test_evalscript_matches_bands() {
        for c in BandComposite::ALL {
            for band in c.bands() {
                assert!(c.evalscript().contains(band));
            }
        }
    }

    #[test]
    fn test_profile_radius_override() {
        let site = Site::new("Villarrica", -39.42, -71.93, 3.0);
        let mut profile = CompositeProfile::new(BandComposite::TrueColor);
        assert_eq!(profile.footprint(&site).side_km, 6.0);
        profile.radius_km = Some(5.0);
        assert_eq!(profile.footprint(&site).side_km, 10.0);
    }
}
