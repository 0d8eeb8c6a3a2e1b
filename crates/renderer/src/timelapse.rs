//! Animated GIF assembly under a byte budget.
//!
//! Encoding is tried at most three times:
//!
//! 1. frames as given
//! 2. per-channel palette reduction
//! 3. palette reduction on frames downscaled by a fixed factor
//!
//! The first result that fits is returned. If the last one still does not
//! fit, it is returned flagged as over budget. Frame count and order never
//! change.

use image::codecs::gif::{GifEncoder, Repeat};
use image::imageops::{resize, FilterType};
use image::{Delay, Frame, RgbaImage};
use tracing::{debug, info, instrument, warn};

use volcano_common::config::TimelapseConfig;
use volcano_common::{MonitorError, MonitorResult};

use crate::palette::reduce_palette;

/// NeuQuant speed, 1 (best) to 30 (fastest).
const QUANTIZE_SPEED: i32 = 10;

/// Which remediation produced the returned bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remediation {
    None,
    ReducedPalette,
    Downscaled,
}

/// An encoded animation and how it was obtained.
#[derive(Debug, Clone)]
pub struct EncodedTimelapse {
    pub bytes: Vec<u8>,
    pub frame_count: usize,
    pub width: u32,
    pub height: u32,
    pub remediation: Remediation,
    pub within_budget: bool,
}

/// Encodes frame sequences as looping GIFs.
#[derive(Debug, Clone)]
pub struct TimelapseEncoder {
    frame_duration_ms: u32,
    size_budget: usize,
    downscale_factor: f32,
    palette_bits: u8,
}

impl TimelapseEncoder {
    pub fn new(frame_duration_ms: u32, size_budget: usize) -> Self {
        Self {
            frame_duration_ms,
            size_budget,
            downscale_factor: 0.85,
            palette_bits: 5,
        }
    }

    pub fn from_config(config: &TimelapseConfig) -> Self {
        Self {
            frame_duration_ms: config.frame_duration_ms,
            size_budget: config.size_budget_bytes,
            downscale_factor: config.downscale_factor,
            palette_bits: config.palette_bits,
        }
    }

    pub fn with_downscale_factor(mut self, factor: f32) -> Self {
        self.downscale_factor = factor;
        self
    }

    pub fn with_palette_bits(mut self, bits: u8) -> Self {
        self.palette_bits = bits;
        self
    }

    pub fn size_budget(&self) -> usize {
        self.size_budget
    }

    /// Encode `frames` in order, shrinking the output if it exceeds the budget.
    #[instrument(skip(self, frames), fields(frames = frames.len(), budget = self.size_budget))]
    pub fn encode(&self, frames: &[RgbaImage]) -> MonitorResult<EncodedTimelapse> {
        let frames = normalize_dimensions(frames)?;
        let (width, height) = frames[0].dimensions();

        let bytes = encode_gif(&frames, self.frame_duration_ms)?;
        debug!(bytes = bytes.len(), "Encoded timelapse");
        if bytes.len() <= self.size_budget {
            return Ok(self.finish(bytes, frames.len(), (width, height), Remediation::None));
        }

        let reduced: Vec<RgbaImage> = frames
            .iter()
            .map(|f| reduce_palette(f, self.palette_bits))
            .collect();
        let bytes = encode_gif(&reduced, self.frame_duration_ms)?;
        info!(
            bytes = bytes.len(),
            bits = self.palette_bits,
            "Timelapse over budget, reduced palette"
        );
        if bytes.len() <= self.size_budget {
            return Ok(self.finish(
                bytes,
                frames.len(),
                (width, height),
                Remediation::ReducedPalette,
            ));
        }

        // downscale the originals once; reduce again so both passes stack
        let scaled: Vec<RgbaImage> = frames
            .iter()
            .map(|f| reduce_palette(&downscale(f, self.downscale_factor), self.palette_bits))
            .collect();
        let dims = scaled[0].dimensions();
        let bytes = encode_gif(&scaled, self.frame_duration_ms)?;
        info!(
            bytes = bytes.len(),
            width = dims.0,
            height = dims.1,
            "Timelapse over budget, downscaled"
        );

        Ok(self.finish(bytes, frames.len(), dims, Remediation::Downscaled))
    }

    fn finish(
        &self,
        bytes: Vec<u8>,
        frame_count: usize,
        (width, height): (u32, u32),
        remediation: Remediation,
    ) -> EncodedTimelapse {
        let within_budget = bytes.len() <= self.size_budget;
        if !within_budget {
            warn!(
                bytes = bytes.len(),
                budget = self.size_budget,
                "Timelapse still exceeds size budget after remediation"
            );
        }
        EncodedTimelapse {
            bytes,
            frame_count,
            width,
            height,
            remediation,
            within_budget,
        }
    }
}

/// Encode frames as an infinitely looping GIF with a fixed per-frame delay.
pub fn encode_gif(frames: &[RgbaImage], frame_duration_ms: u32) -> MonitorResult<Vec<u8>> {
    if frames.is_empty() {
        return Err(MonitorError::Encode("no frames to encode".to_string()));
    }

    let mut out = Vec::new();
    {
        let mut encoder = GifEncoder::new_with_speed(&mut out, QUANTIZE_SPEED);
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(|e| MonitorError::Encode(e.to_string()))?;

        for frame in frames {
            let delay = Delay::from_numer_denom_ms(frame_duration_ms, 1);
            encoder
                .encode_frame(Frame::from_parts(frame.clone(), 0, 0, delay))
                .map_err(|e| MonitorError::Encode(e.to_string()))?;
        }
    }
    Ok(out)
}

/// Resize by `factor` on both axes with a Lanczos filter.
pub fn downscale(img: &RgbaImage, factor: f32) -> RgbaImage {
    let (w, h) = img.dimensions();
    let nw = ((w as f32 * factor).round() as u32).max(1);
    let nh = ((h as f32 * factor).round() as u32).max(1);
    resize(img, nw, nh, FilterType::Lanczos3)
}

/// All frames at the first frame's size; mismatches are resized with a warning.
fn normalize_dimensions(frames: &[RgbaImage]) -> MonitorResult<Vec<RgbaImage>> {
    let first = frames
        .first()
        .ok_or_else(|| MonitorError::Encode("no frames to encode".to_string()))?;
    let (w, h) = first.dimensions();

    Ok(frames
        .iter()
        .enumerate()
        .map(|(i, f)| {
            if f.dimensions() == (w, h) {
                f.clone()
            } else {
                warn!(
                    frame = i,
                    found_width = f.width(),
                    found_height = f.height(),
                    width = w,
                    height = h,
                    "Frame size differs from the first frame, resizing"
                );
                resize(f, w, h, FilterType::Lanczos3)
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_empty_input_is_an_error() {
        let encoder = TimelapseEncoder::new(1000, 1024);
        assert!(matches!(encoder.encode(&[]), Err(MonitorError::Encode(_))));
    }

    #[test]
    fn test_downscale_rounds() {
        let img = RgbaImage::new(96, 96);
        assert_eq!(downscale(&img, 0.85).dimensions(), (82, 82));
        let tiny = RgbaImage::new(1, 1);
        assert_eq!(downscale(&tiny, 0.1).dimensions(), (1, 1));
    }

    #[test]
    fn test_mismatched_frames_are_resized() {
        let frames = vec![
            RgbaImage::from_pixel(16, 16, Rgba([10, 10, 10, 255])),
            RgbaImage::from_pixel(32, 8, Rgba([200, 10, 10, 255])),
        ];
        let normalized = normalize_dimensions(&frames).unwrap();
        assert!(normalized.iter().all(|f| f.dimensions() == (16, 16)));
    }
}
