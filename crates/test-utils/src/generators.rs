//! Synthetic raster generators.
//!
//! Everything here is deterministic so that size-sensitive tests (GIF budget,
//! palette reduction) produce the same bytes on every run.

use std::io::Cursor;

use image::{ImageOutputFormat, Rgba, RgbaImage};

/// Encodes an RGBA image as PNG bytes.
pub fn encode_png(img: &RgbaImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageOutputFormat::Png)
        .expect("PNG encoding of a synthetic frame");
    out.into_inner()
}

/// A single-colour opaque PNG.
///
/// # Example
///
/// ```
/// use test_utils::solid_png;
///
/// let png = solid_png(4, 4, [0, 0, 0]);
/// assert_eq!(&png[1..4], b"PNG");
/// ```
pub fn solid_png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    encode_png(&solid_frame(width, height, rgb))
}

pub fn solid_frame(width: u32, height: u32, rgb: [u8; 3]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba([rgb[0], rgb[1], rgb[2], 255]))
}

/// Horizontal red / vertical green gradient, like a lit terrain tile.
pub fn gradient_frame(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let r = ((x as f32 / width.max(1) as f32) * 255.0) as u8;
        let g = ((y as f32 / height.max(1) as f32) * 255.0) as u8;
        Rgba([r, g, 128, 255])
    })
}

/// Flat blocks of a few colours with per-pixel noise in the low 3 bits.
///
/// Masking the low bits of each channel turns this back into flat blocks,
/// which compress far better than the noisy original.
pub fn blocky_noise_frame(width: u32, height: u32, block: u32, seed: u32) -> RgbaImage {
    let block = block.max(1);
    RgbaImage::from_fn(width, height, |x, y| {
        let base = simple_hash(x / block, y / block, seed);
        let noise = simple_hash(x, y, seed.wrapping_add(7919));
        let channel = |shift: u32| (((base >> shift) as u8) & 0xC0) | (((noise >> shift) as u8) & 0x07);
        Rgba([channel(0), channel(8), channel(16), 255])
    })
}

/// Full-entropy noise in every channel.
pub fn random_frame(width: u32, height: u32, seed: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let h = simple_hash(x, y, seed);
        Rgba([h as u8, (h >> 8) as u8, (h >> 16) as u8, 255])
    })
}

/// `count` frames from `make`, each with its own seed.
pub fn frame_sequence<F>(count: usize, make: F) -> Vec<RgbaImage>
where
    F: Fn(u32) -> RgbaImage,
{
    (0..count as u32).map(|i| make(i * 31 + 1)).collect()
}

/// Simple deterministic hash for reproducible test data.
pub fn simple_hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}
