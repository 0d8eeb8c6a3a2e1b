//! Provider attribution mark for the top-left corner of each frame.
//!
//! A downloaded logo is scaled to a fixed width; without one, a solid badge
//! with the provider name is synthesised.

use image::imageops::{resize, FilterType};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use volcano_common::{MonitorError, MonitorResult};

use crate::text::{TextRenderer, TextStyle};

/// Width the attribution mark is scaled to.
pub const MARK_WIDTH: u32 = 150;

pub const BADGE_HEIGHT: u32 = 50;
pub const BADGE_TEXT: &str = "COPERNICUS";
const BADGE_FILL: Rgba<u8> = Rgba([0, 51, 153, 255]);
const BADGE_TEXT_ORIGIN: (i32, i32) = (10, 15);

/// Decode logo bytes (PNG, JPEG, ...) to RGBA.
pub fn decode_logo(bytes: &[u8]) -> MonitorResult<RgbaImage> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| MonitorError::Image(format!("logo: {}", e)))
}

/// Scale `logo` to `width`, keeping its aspect ratio.
pub fn scale_logo(logo: &RgbaImage, width: u32) -> RgbaImage {
    let (w, h) = logo.dimensions();
    if w == 0 || h == 0 {
        return RgbaImage::new(width, 1);
    }
    let height = ((h as f64 * width as f64 / w as f64).round() as u32).max(1);
    resize(logo, width, height, FilterType::Lanczos3)
}

/// The fallback badge: a filled box with the provider name.
pub fn badge(text: &TextRenderer) -> RgbaImage {
    let mut img = RgbaImage::new(MARK_WIDTH, BADGE_HEIGHT);
    draw_filled_rect_mut(
        &mut img,
        Rect::at(0, 0).of_size(MARK_WIDTH, BADGE_HEIGHT),
        BADGE_FILL,
    );
    let style = TextStyle::new(20.0, Rgba([255, 255, 255, 255])).bold();
    text.draw(&mut img, BADGE_TEXT, BADGE_TEXT_ORIGIN.0, BADGE_TEXT_ORIGIN.1, &style);
    img
}

/// The mark to stamp on every frame: the scaled logo if present, else the badge.
pub fn attribution_mark(logo: Option<&RgbaImage>, text: &TextRenderer) -> RgbaImage {
    match logo {
        Some(logo) => scale_logo(logo, MARK_WIDTH),
        None => badge(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_badge_geometry_and_fill() {
        let mark = badge(&TextRenderer::without_fonts());
        assert_eq!(mark.dimensions(), (MARK_WIDTH, BADGE_HEIGHT));
        assert_eq!(*mark.get_pixel(0, 0), BADGE_FILL);
        assert_eq!(*mark.get_pixel(149, 49), BADGE_FILL);
    }

    #[test]
    fn test_logo_keeps_aspect_ratio() {
        let logo = RgbaImage::from_pixel(300, 100, Rgba([255, 0, 0, 255]));
        let scaled = scale_logo(&logo, MARK_WIDTH);
        assert_eq!(scaled.dimensions(), (150, 50));
    }

    #[test]
    fn test_mark_prefers_logo() {
        let logo = RgbaImage::from_pixel(600, 120, Rgba([0, 255, 0, 255]));
        let mark = attribution_mark(Some(&logo), &TextRenderer::without_fonts());
        assert_eq!(mark.dimensions(), (150, 30));
        assert_eq!(mark.get_pixel(75, 15).0[1], 255);
    }

    #[test]
    fn test_decode_logo_rejects_html() {
        assert!(decode_logo(b"<html>not found</html>").is_err());
    }
}
