//! TrueType text drawing for frame annotations.
//!
//! Fonts are loaded from the first readable file in each candidate list. When
//! nothing loads, text is measured with a fixed per-character estimate and not
//! drawn, so overlays still get their backing boxes.

use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use rusttype::{point, Font, Scale};
use tracing::{debug, warn};

/// Estimated glyph advance as a fraction of the font size.
const FALLBACK_CHAR_WIDTH: f32 = 0.6;

/// Size, colour and weight of one piece of annotation text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub color: Rgba<u8>,
    pub bold: bool,
}

impl TextStyle {
    pub fn new(size: f32, color: Rgba<u8>) -> Self {
        Self {
            size,
            color,
            bold: false,
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

/// Regular and bold faces used by the overlay.
pub struct TextRenderer {
    regular: Option<Font<'static>>,
    bold: Option<Font<'static>>,
}

impl TextRenderer {
    /// Load the first usable font from each list.
    pub fn load(regular_paths: &[PathBuf], bold_paths: &[PathBuf]) -> Self {
        let regular = load_first(regular_paths);
        let bold = load_first(bold_paths);

        if regular.is_none() && bold.is_none() {
            warn!("No TrueType font could be loaded, annotations will have boxes without text");
        }

        Self { regular, bold }
    }

    /// A renderer with no fonts; text is measured but never drawn.
    pub fn without_fonts() -> Self {
        Self {
            regular: None,
            bold: None,
        }
    }

    pub fn has_font(&self) -> bool {
        self.regular.is_some() || self.bold.is_some()
    }

    fn face(&self, bold: bool) -> Option<&Font<'static>> {
        if bold {
            self.bold.as_ref().or(self.regular.as_ref())
        } else {
            self.regular.as_ref().or(self.bold.as_ref())
        }
    }

    /// Width and height in pixels of `text` in `style`.
    pub fn measure(&self, text: &str, style: &TextStyle) -> (u32, u32) {
        let size = style.size;
        let Some(font) = self.face(style.bold) else {
            let width = text.chars().count() as f32 * size * FALLBACK_CHAR_WIDTH;
            return (width.round() as u32, size.round() as u32);
        };

        let scale = Scale::uniform(size);
        let v_metrics = font.v_metrics(scale);
        let width = font
            .layout(text, scale, point(0.0, v_metrics.ascent))
            .filter_map(|g| g.pixel_bounding_box().map(|b| b.max.x))
            .max()
            .unwrap_or(0)
            .max(0) as u32;
        let height = (v_metrics.ascent - v_metrics.descent).ceil().max(0.0) as u32;
        (width, height)
    }

    /// Draw `text` with its top-left corner at (`x`, `y`).
    pub fn draw(&self, img: &mut RgbaImage, text: &str, x: i32, y: i32, style: &TextStyle) {
        if let Some(font) = self.face(style.bold) {
            draw_text_mut(img, style.color, x, y, Scale::uniform(style.size), font, text);
        }
    }
}

fn load_first(paths: &[PathBuf]) -> Option<Font<'static>> {
    paths.iter().find_map(|p| load_font(p))
}

fn load_font(path: &Path) -> Option<Font<'static>> {
    let bytes = std::fs::read(path).ok()?;
    match Font::try_from_vec(bytes) {
        Some(font) => {
            debug!(path = %path.display(), "Loaded font");
            Some(font)
        }
        None => {
            warn!(path = %path.display(), "File is not a usable TrueType font");
            None
        }
    }
}
