//! Per-frame annotation: attribution mark, acquisition date, composite label
//! and a distance scale bar.
//!
//! Layout is computed first ([`OverlayCompositor::layout`]) and drawn second,
//! so geometry can be checked without fonts. Annotations are drawn onto a
//! transparent layer that is alpha-composited over the frame; the scale bar
//! goes on a second layer composited afterwards. The result is flattened onto
//! black, fully opaque.

use chrono::NaiveDate;
use image::imageops::overlay;
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use tracing::warn;

use volcano_common::time::DATE_FORMAT;
use volcano_common::{BandComposite, ScaleBar};

use crate::text::{TextRenderer, TextStyle};

/// Fixed colours and offsets of the annotation layout, in pixels.
#[derive(Debug, Clone)]
pub struct OverlayStyle {
    /// Offset of the attribution mark from the top-left corner.
    pub margin: i32,
    pub date_size: f32,
    pub date_right_margin: i32,
    pub date_padding: i32,
    pub label_size: f32,
    pub label_color: Rgba<u8>,
    /// Distance of the label baseline box from the bottom edge.
    pub label_bottom: i32,
    pub label_padding: i32,
    pub backing: Rgba<u8>,
    pub text_color: Rgba<u8>,
    pub bar_right_margin: i32,
    pub bar_bottom_margin: i32,
    pub bar_height: u32,
    pub bar_backing: Rgba<u8>,
    pub bar_label_size: f32,
    pub bar_label_gap: i32,
    pub tick_width: u32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            margin: 15,
            date_size: 20.0,
            date_right_margin: 20,
            date_padding: 8,
            label_size: 16.0,
            label_color: Rgba([200, 200, 200, 255]),
            label_bottom: 40,
            label_padding: 5,
            backing: Rgba([0, 0, 0, 200]),
            text_color: Rgba([255, 255, 255, 255]),
            bar_right_margin: 30,
            bar_bottom_margin: 50,
            bar_height: 6,
            bar_backing: Rgba([0, 0, 0, 180]),
            bar_label_size: 16.0,
            bar_label_gap: 20,
            tick_width: 2,
        }
    }
}

/// A piece of text with its backing box.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    pub text: String,
    pub origin: (i32, i32),
    pub backing: Rect,
}

/// Scale bar placement.
#[derive(Debug, Clone, PartialEq)]
pub struct BarLayout {
    pub bar: ScaleBar,
    pub origin: (i32, i32),
    pub backing: Rect,
    pub label_origin: (i32, i32),
}

/// Geometry of every annotation on one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLayout {
    pub mark: Rect,
    pub date: TextBox,
    pub label: TextBox,
    /// `None` when the frame is too narrow for the bar.
    pub scale_bar: Option<BarLayout>,
}

/// Stamps annotations on frames of one site's footprint.
pub struct OverlayCompositor<'a> {
    text: &'a TextRenderer,
    style: OverlayStyle,
    footprint_side_km: f64,
    bar_km: f64,
}

impl<'a> OverlayCompositor<'a> {
    pub fn new(text: &'a TextRenderer, footprint_side_km: f64, bar_km: f64) -> Self {
        Self {
            text,
            style: OverlayStyle::default(),
            footprint_side_km,
            bar_km,
        }
    }

    pub fn with_style(mut self, style: OverlayStyle) -> Self {
        self.style = style;
        self
    }

    fn date_style(&self) -> TextStyle {
        TextStyle::new(self.style.date_size, self.style.text_color).bold()
    }

    fn label_style(&self) -> TextStyle {
        TextStyle::new(self.style.label_size, self.style.label_color)
    }

    fn bar_label_style(&self) -> TextStyle {
        TextStyle::new(self.style.bar_label_size, self.style.text_color).bold()
    }

    /// Place every annotation on a `width` x `height` frame.
    pub fn layout(
        &self,
        width: u32,
        height: u32,
        date: NaiveDate,
        composite: BandComposite,
        mark_size: (u32, u32),
    ) -> OverlayLayout {
        let s = &self.style;
        let (w, h) = (width as i32, height as i32);

        let mark = Rect::at(s.margin, s.margin).of_size(mark_size.0.max(1), mark_size.1.max(1));

        // top-right date, pushed below the mark if the two collide
        let date_text = date.format(DATE_FORMAT).to_string();
        let (dw, dh) = self.text.measure(&date_text, &self.date_style());
        let dx = w - dw as i32 - s.date_right_margin;
        let mut dy = s.margin;
        let mut date_backing = padded(dx, dy, dw, dh, s.date_padding);
        if date_backing.intersect(mark).is_some() {
            dy = mark.bottom() + 1 + 2 * s.date_padding;
            date_backing = padded(dx, dy, dw, dh, s.date_padding);
        }

        let label_text = composite.label().to_string();
        let (lw, lh) = self.text.measure(&label_text, &self.label_style());
        let (lx, ly) = (s.margin, h - s.label_bottom);

        OverlayLayout {
            mark,
            date: TextBox {
                text: date_text,
                origin: (dx, dy),
                backing: date_backing,
            },
            label: TextBox {
                text: label_text,
                origin: (lx, ly),
                backing: padded(lx, ly, lw, lh, s.label_padding),
            },
            scale_bar: self.bar_layout(width, height),
        }
    }

    fn bar_layout(&self, width: u32, height: u32) -> Option<BarLayout> {
        let s = &self.style;
        let bar = ScaleBar::new(width, self.footprint_side_km, self.bar_km);
        let len = bar.length_px as i32;

        let x = width as i32 - len - s.bar_right_margin;
        let y = height as i32 - s.bar_bottom_margin;
        if len == 0 || x < 10 || y < 30 {
            return None;
        }

        let (tw, _) = self.text.measure(&bar.label, &self.bar_label_style());
        Some(BarLayout {
            origin: (x, y),
            backing: Rect::at(x - 10, y - 30).of_size(bar.length_px + 20, 50),
            label_origin: (x + len / 2 - tw as i32 / 2, y - s.bar_label_gap),
            bar,
        })
    }

    /// Annotate one frame; `mark` is drawn unchanged in the top-left corner.
    pub fn annotate(
        &self,
        frame: &RgbaImage,
        date: NaiveDate,
        composite: BandComposite,
        mark: &RgbaImage,
    ) -> RgbaImage {
        let (width, height) = frame.dimensions();
        let layout = self.layout(width, height, date, composite, mark.dimensions());
        let s = &self.style;

        let mut layer = RgbaImage::new(width, height);
        overlay(&mut layer, mark, layout.mark.left() as i64, layout.mark.top() as i64);

        draw_filled_rect_mut(&mut layer, layout.date.backing, s.backing);
        let (x, y) = layout.date.origin;
        self.text.draw(&mut layer, &layout.date.text, x, y, &self.date_style());

        draw_filled_rect_mut(&mut layer, layout.label.backing, s.backing);
        let (x, y) = layout.label.origin;
        self.text.draw(&mut layer, &layout.label.text, x, y, &self.label_style());

        let mut out = frame.clone();
        overlay(&mut out, &layer, 0, 0);

        match &layout.scale_bar {
            Some(bar) => {
                let bar_layer = self.draw_bar(width, height, bar);
                overlay(&mut out, &bar_layer, 0, 0);
            }
            None => warn!(width, "Frame too narrow for the scale bar, omitting it"),
        }

        flatten_on_black(&mut out);
        out
    }

    fn draw_bar(&self, width: u32, height: u32, layout: &BarLayout) -> RgbaImage {
        let s = &self.style;
        let (x, y) = layout.origin;
        let len = layout.bar.length_px;
        let black = Rgba([0, 0, 0, 255]);

        let mut layer = RgbaImage::new(width, height);
        draw_filled_rect_mut(&mut layer, layout.backing, s.bar_backing);
        draw_filled_rect_mut(
            &mut layer,
            Rect::at(x - 1, y - 1).of_size(len + 2, s.bar_height + 2),
            black,
        );
        draw_filled_rect_mut(&mut layer, Rect::at(x, y).of_size(len, s.bar_height), s.text_color);

        // one tick per whole kilometre, centred on its offset
        for i in 0..layout.bar.tick_count() {
            let tx = x + layout.bar.tick_offset_px(i) as i32 - s.tick_width as i32 / 2;
            draw_filled_rect_mut(
                &mut layer,
                Rect::at(tx, y).of_size(s.tick_width, s.bar_height),
                black,
            );
        }

        let (lx, ly) = layout.label_origin;
        self.text
            .draw(&mut layer, &layout.bar.label, lx, ly, &self.bar_label_style());
        layer
    }
}

fn padded(x: i32, y: i32, w: u32, h: u32, pad: i32) -> Rect {
    Rect::at(x - pad, y - pad).of_size(w + 2 * pad as u32, h + 2 * pad as u32)
}

/// Composite every pixel over opaque black.
pub fn flatten_on_black(img: &mut RgbaImage) {
    for p in img.pixels_mut() {
        let a = p[3] as u32;
        if a == 255 {
            continue;
        }
        for c in 0..3 {
            p[c] = ((p[c] as u32 * a + 127) / 255) as u8;
        }
        p[3] = 255;
    }
}
