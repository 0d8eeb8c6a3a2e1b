//! One timelapse: list, decode, annotate, encode, store.

use std::path::PathBuf;

use chrono::NaiveDate;
use image::RgbaImage;
use rayon::prelude::*;
use tracing::{info, instrument, warn};

use archive::{write_atomic, ArchiveStore};
use renderer::{attribution_mark, OverlayCompositor, Remediation, TextRenderer, TimelapseEncoder};
use volcano_common::time::DATE_FORMAT;
use volcano_common::{
    AssetKey, BandComposite, CompositeProfile, DateRange, MonitorConfig, MonitorError,
    MonitorResult, Site,
};

/// A stored timelapse.
#[derive(Debug, Clone)]
pub struct TimelapseOutput {
    pub path: PathBuf,
    pub frames: usize,
    pub first: NaiveDate,
    pub last: NaiveDate,
    pub bytes: usize,
    pub width: u32,
    pub height: u32,
    pub remediation: Remediation,
    pub within_budget: bool,
}

/// `<site>_<composite>_<first>_<last>.gif`
pub fn timelapse_file_name(
    site: &str,
    composite: BandComposite,
    first: NaiveDate,
    last: NaiveDate,
) -> String {
    format!(
        "{}_{}_{}_{}.gif",
        site,
        composite,
        first.format(DATE_FORMAT),
        last.format(DATE_FORMAT)
    )
}

/// Builds annotated timelapses from one archive.
pub struct TimelapseJob {
    store: ArchiveStore,
    text: TextRenderer,
    mark: RgbaImage,
    encoder: TimelapseEncoder,
    scale_bar_km: f64,
    profiles: Vec<CompositeProfile>,
}

impl TimelapseJob {
    /// `logo` is scaled into the attribution mark; `None` selects the badge.
    pub fn new(config: &MonitorConfig, text: TextRenderer, logo: Option<&RgbaImage>) -> Self {
        let mark = attribution_mark(logo, &text);
        Self {
            store: ArchiveStore::new(&config.archive_root),
            text,
            mark,
            encoder: TimelapseEncoder::from_config(&config.timelapse),
            scale_bar_km: config.timelapse.scale_bar_km,
            profiles: config.composites.clone(),
        }
    }

    /// Load fonts from the configured paths.
    pub fn from_config(config: &MonitorConfig, logo: Option<&RgbaImage>) -> Self {
        let text = TextRenderer::load(&config.timelapse.font_paths, &config.timelapse.bold_font_paths);
        Self::new(config, text, logo)
    }

    /// Radius the composite was fetched with for `site`.
    fn radius_km(&self, site: &Site, composite: BandComposite) -> f64 {
        self.profiles
            .iter()
            .find(|p| p.kind == composite)
            .map(|p| p.radius_for(site))
            .unwrap_or(site.radius_km)
    }

    /// Build and store the timelapse of `composite` over `range`.
    ///
    /// Returns `Ok(None)` when no readable frame falls in the range.
    #[instrument(skip(self, site, composite, range), fields(site = %site.name, composite = %composite, start = %range.start, end = %range.end))]
    pub fn run(
        &self,
        site: &Site,
        composite: BandComposite,
        range: &DateRange,
    ) -> MonitorResult<Option<TimelapseOutput>> {
        let keys = self.store.list_range(&site.name, composite, range)?;
        if keys.is_empty() {
            warn!("No archived frames in range");
            return Ok(None);
        }

        let frames: Vec<(NaiveDate, RgbaImage)> = keys
            .iter()
            .filter_map(|key| match self.load_frame(key) {
                Ok(img) => Some((key.date, img)),
                Err(e) => {
                    warn!(asset = %key, error = %e, "Skipping unreadable frame");
                    None
                }
            })
            .collect();
        let (Some(&(first, _)), Some(&(last, _))) = (frames.first(), frames.last()) else {
            warn!(listed = keys.len(), "No readable frames in range");
            return Ok(None);
        };

        let side_km = 2.0 * self.radius_km(site, composite);
        let compositor = OverlayCompositor::new(&self.text, side_km, self.scale_bar_km);
        let annotated: Vec<RgbaImage> = frames
            .par_iter()
            .map(|(date, img)| compositor.annotate(img, *date, composite, &self.mark))
            .collect();

        let encoded = self.encoder.encode(&annotated)?;

        let path = self
            .store
            .timelapse_dir(&site.name)
            .join(timelapse_file_name(&site.name, composite, first, last));
        write_atomic(&path, &encoded.bytes)?;

        info!(
            path = %path.display(),
            frames = encoded.frame_count,
            bytes = encoded.bytes.len(),
            remediation = ?encoded.remediation,
            within_budget = encoded.within_budget,
            "Wrote timelapse"
        );

        Ok(Some(TimelapseOutput {
            path,
            frames: encoded.frame_count,
            first,
            last,
            bytes: encoded.bytes.len(),
            width: encoded.width,
            height: encoded.height,
            remediation: encoded.remediation,
            within_budget: encoded.within_budget,
        }))
    }

    fn load_frame(&self, key: &AssetKey) -> MonitorResult<RgbaImage> {
        let bytes = self.store.read(key)?;
        image::load_from_memory(&bytes)
            .map(|img| img.to_rgba8())
            .map_err(|e| MonitorError::Image(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name() {
        let d = |s: &str| NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap();
        assert_eq!(
            timelapse_file_name(
                "Villarrica",
                BandComposite::ThermalFalseColor,
                d("2025-05-03"),
                d("2025-06-01")
            ),
            "Villarrica_ThermalFalseColor_2025-05-03_2025-06-01.gif"
        );
    }
}
