//! Square ground footprints around a site and the pixel/distance scale they imply.
//!
//! Degrees are converted with the flat-Earth approximation `1° ≈ 111 km`. This
//! is only adequate for small footprints (a few tens of km) at mid latitudes,
//! which is what the monitored sites use.
//!
//! [`scale_bar_length_px`] is the only place where raster pixels are related
//! to ground distance. Every scale bar drawn on a frame goes through it, fed
//! with the side length of the footprint that was actually requested from the
//! renderer.

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::site::Coordinate;

/// Kilometres per degree used for footprint construction.
pub const KM_PER_DEGREE: f64 = 111.0;

/// Build the symmetric square bbox of side `2 * radius_km` around `center`.
pub fn bbox(center: Coordinate, radius_km: f64) -> BoundingBox {
    let delta = radius_km / KM_PER_DEGREE;
    BoundingBox::new(
        center.lon - delta,
        center.lat - delta,
        center.lon + delta,
        center.lat + delta,
    )
}

/// Pixel length of a bar representing `bar_km` on a raster `raster_width_px`
/// wide whose footprint spans `footprint_side_km`.
///
/// Returns 0 for a degenerate footprint.
pub fn scale_bar_length_px(raster_width_px: u32, footprint_side_km: f64, bar_km: f64) -> u32 {
    if footprint_side_km <= 0.0 || bar_km <= 0.0 {
        return 0;
    }
    (raster_width_px as f64 / footprint_side_km * bar_km).round() as u32
}

/// Human label for a physical distance: "3 km", "1.5 km", "500 m".
pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        format!("{} m", (km * 1000.0).round() as u32)
    } else if (km - km.round()).abs() < 1e-9 {
        format!("{} km", km.round() as u32)
    } else {
        format!("{:.1} km", km)
    }
}

/// A requested ground footprint plus the raster size it is rendered at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFootprint {
    pub bbox: BoundingBox,
    /// Side length of the square footprint in km.
    pub side_km: f64,
    pub width_px: u32,
    pub height_px: u32,
}

impl GeoFootprint {
    /// Footprint of `radius_km` around `center`, rendered at `width_px` × `height_px`.
    pub fn around(center: Coordinate, radius_km: f64, width_px: u32, height_px: u32) -> Self {
        Self {
            bbox: bbox(center, radius_km),
            side_km: 2.0 * radius_km,
            width_px,
            height_px,
        }
    }

    /// Horizontal pixels per km at the requested raster width.
    pub fn pixels_per_km(&self) -> f64 {
        if self.side_km <= 0.0 {
            return 0.0;
        }
        self.width_px as f64 / self.side_km
    }

    /// Scale bar for this footprint at its requested width.
    pub fn scale_bar(&self, bar_km: f64) -> ScaleBar {
        ScaleBar::new(self.width_px, self.side_km, bar_km)
    }
}

/// Pixel length and label of a distance bar for one raster width.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleBar {
    pub length_px: u32,
    /// Physical distance represented, in km.
    pub distance_km: f64,
    /// Label text; derived from `distance_km`, never from pixels.
    pub label: String,
}

impl ScaleBar {
    pub fn new(raster_width_px: u32, footprint_side_km: f64, bar_km: f64) -> Self {
        Self {
            length_px: scale_bar_length_px(raster_width_px, footprint_side_km, bar_km),
            distance_km: bar_km,
            label: format_distance(bar_km),
        }
    }

    /// Pixel offset of the tick for kilometre `index` from the bar start.
    pub fn tick_offset_px(&self, index: u32) -> u32 {
        if self.distance_km <= 0.0 {
            return 0;
        }
        (self.length_px as f64 / self.distance_km * index as f64).round() as u32
    }

    /// Number of whole-km ticks including the zero tick.
    pub fn tick_count(&self) -> u32 {
        self.distance_km.floor().max(0.0) as u32 + 1
    }
}
