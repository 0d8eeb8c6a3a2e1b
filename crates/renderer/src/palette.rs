//! Per-channel colour depth reduction.
//!
//! Dropping the low bits of each channel collapses near-identical colours,
//! which makes GIF quantisation output far more compressible.

use std::collections::HashSet;

use image::RgbaImage;
use rayon::prelude::*;

/// Minimum pixels to benefit from parallel processing
const PARALLEL_THRESHOLD: usize = 4096; // 64x64 or larger

/// Pack RGBA bytes into a u32 for faster hashing and comparison
#[inline(always)]
fn pack_color(r: u8, g: u8, b: u8, a: u8) -> u32 {
    (r as u32) | ((g as u32) << 8) | ((b as u32) << 16) | ((a as u32) << 24)
}

/// Mask keeping the top `bits` bits of a channel; `bits` is clamped to 1..=8.
pub fn channel_mask(bits: u8) -> u8 {
    let bits = bits.clamp(1, 8);
    0xFFu8 << (8 - bits)
}

/// Copy of `img` with only the top `bits` bits of R, G and B kept.
///
/// Alpha is untouched.
pub fn reduce_palette(img: &RgbaImage, bits: u8) -> RgbaImage {
    let mask = channel_mask(bits);
    let mut out = img.clone();
    let apply = |px: &mut [u8]| {
        px[0] &= mask;
        px[1] &= mask;
        px[2] &= mask;
    };

    let pixels = (out.width() * out.height()) as usize;
    let raw: &mut [u8] = &mut out;
    if pixels >= PARALLEL_THRESHOLD {
        raw.par_chunks_exact_mut(4).for_each(apply);
    } else {
        raw.chunks_exact_mut(4).for_each(apply);
    }
    out
}

/// Number of distinct RGBA colours in `img`.
pub fn count_colors(img: &RgbaImage) -> usize {
    img.pixels()
        .map(|p| pack_color(p[0], p[1], p[2], p[3]))
        .collect::<HashSet<u32>>()
        .len()
}
