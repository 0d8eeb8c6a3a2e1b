//! Brightness checks for rasters that came back black or nearly so.

use serde::Serialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use volcano_common::{AssetKey, BandComposite, MonitorError, MonitorResult};

use crate::store::ArchiveStore;

/// An archived asset whose mean brightness is under the threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DarkAsset {
    pub key: AssetKey,
    pub mean_brightness: f64,
}

/// Mean of all RGB channel values (0..=255) of an encoded raster.
pub fn mean_brightness(bytes: &[u8]) -> MonitorResult<f64> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| MonitorError::Image(e.to_string()))?
        .to_rgb8();

    let samples = img.as_raw();
    if samples.is_empty() {
        return Ok(0.0);
    }
    let total: u64 = samples.iter().map(|&v| v as u64).sum();
    Ok(total as f64 / samples.len() as f64)
}

pub fn is_dark(bytes: &[u8], threshold: f64) -> MonitorResult<bool> {
    Ok(mean_brightness(bytes)? < threshold)
}

/// Walk a site's composite directories and report assets darker than `threshold`.
///
/// Unreadable or undecodable files are logged and skipped. Results are sorted
/// by composite, then date.
pub fn scan_dark_assets(
    store: &ArchiveStore,
    site: &str,
    threshold: f64,
) -> MonitorResult<Vec<DarkAsset>> {
    let site_dir = store.site_dir(site);
    if !site_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut dark = Vec::new();

    for entry in WalkDir::new(&site_dir)
        .min_depth(2)
        .max_depth(2)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let Some(dir_name) = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
        else {
            continue;
        };
        // timelapses and anything else that is not a composite directory
        if !BandComposite::ALL.iter().any(|c| c.as_str() == dir_name) {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        let key = match AssetKey::from_file_name(site, &file_name) {
            Ok(key) => key,
            Err(_) => continue,
        };

        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read asset");
                continue;
            }
        };

        match mean_brightness(&bytes) {
            Ok(mean) if mean < threshold => {
                debug!(asset = %key, mean, "Dark asset");
                dark.push(DarkAsset {
                    key,
                    mean_brightness: mean,
                });
            }
            Ok(_) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to decode asset"),
        }
    }

    dark.sort_by(|a, b| {
        a.key
            .composite
            .cmp(&b.key.composite)
            .then(a.key.date.cmp(&b.key.date))
    });
    Ok(dark)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageOutputFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png(value: u8) -> Vec<u8> {
        let img = RgbImage::from_pixel(8, 8, Rgb([value, value, value]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageOutputFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_mean_brightness() {
        assert_eq!(mean_brightness(&png(0)).unwrap(), 0.0);
        assert_eq!(mean_brightness(&png(200)).unwrap(), 200.0);
    }

    #[test]
    fn test_is_dark_threshold_is_strict() {
        assert!(is_dark(&png(4), 5.0).unwrap());
        assert!(!is_dark(&png(5), 5.0).unwrap());
    }

    #[test]
    fn test_mean_brightness_rejects_garbage() {
        assert!(matches!(
            mean_brightness(b"not an image"),
            Err(MonitorError::Image(_))
        ));
    }
}
