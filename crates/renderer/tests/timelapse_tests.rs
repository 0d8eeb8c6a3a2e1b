//! Tests for GIF assembly and the size-budget remediation passes.

use image::codecs::gif::GifDecoder;
use image::AnimationDecoder;
use renderer::palette::reduce_palette;
use renderer::timelapse::{downscale, encode_gif};
use renderer::{Remediation, TimelapseEncoder};
use test_utils::{blocky_noise_frame, frame_sequence, random_frame, solid_frame};

fn decode_frames(bytes: &[u8]) -> Vec<image::Frame> {
    GifDecoder::new(std::io::Cursor::new(bytes))
        .unwrap()
        .into_frames()
        .collect_frames()
        .unwrap()
}

// ============================================================================
// encoding tests
// ============================================================================

#[test]
fn test_gif_keeps_frame_order_and_delay() {
    let frames = vec![
        solid_frame(16, 16, [255, 0, 0]),
        solid_frame(16, 16, [0, 255, 0]),
        solid_frame(16, 16, [0, 0, 255]),
    ];
    let bytes = encode_gif(&frames, 1000).unwrap();
    assert_eq!(&bytes[..6], b"GIF89a");

    let decoded = decode_frames(&bytes);
    assert_eq!(decoded.len(), 3);
    let firsts: Vec<[u8; 4]> = decoded.iter().map(|f| f.buffer().get_pixel(8, 8).0).collect();
    assert!(firsts[0][0] > 200 && firsts[0][1] < 50);
    assert!(firsts[1][1] > 200 && firsts[1][0] < 50);
    assert!(firsts[2][2] > 200 && firsts[2][0] < 50);

    let (numer, denom) = decoded[0].delay().numer_denom_ms();
    assert_eq!(numer / denom, 1000);
}

#[test]
fn test_within_budget_is_untouched() {
    let frames = frame_sequence(4, |_| solid_frame(32, 32, [40, 80, 120]));
    let result = TimelapseEncoder::new(1000, 1_572_864).encode(&frames).unwrap();

    assert_eq!(result.remediation, Remediation::None);
    assert!(result.within_budget);
    assert_eq!(result.frame_count, 4);
    assert_eq!((result.width, result.height), (32, 32));
}

// ============================================================================
// budget tests
// ============================================================================

#[test]
fn test_palette_reduction_satisfies_budget() {
    let frames = frame_sequence(3, |seed| blocky_noise_frame(96, 96, 8, seed));
    let naive = encode_gif(&frames, 1000).unwrap();
    let reduced: Vec<_> = frames.iter().map(|f| reduce_palette(f, 5)).collect();
    let reduced_len = encode_gif(&reduced, 1000).unwrap().len();
    assert!(reduced_len < naive.len(), "masking noise should shrink the GIF");

    let result = TimelapseEncoder::new(1000, reduced_len).encode(&frames).unwrap();

    assert_eq!(result.remediation, Remediation::ReducedPalette);
    assert!(result.within_budget);
    assert!(result.bytes.len() <= reduced_len);
    assert_eq!((result.width, result.height), (96, 96));
    assert_eq!(decode_frames(&result.bytes).len(), 3);
}

#[test]
fn test_downscale_when_palette_is_not_enough() {
    let frames = frame_sequence(3, |seed| random_frame(96, 96, seed));
    let naive_len = encode_gif(&frames, 1000).unwrap().len();
    let reduced: Vec<_> = frames.iter().map(|f| reduce_palette(f, 5)).collect();
    let reduced_len = encode_gif(&reduced, 1000).unwrap().len();
    let scaled: Vec<_> = frames
        .iter()
        .map(|f| reduce_palette(&downscale(f, 0.85), 5))
        .collect();
    let scaled_len = encode_gif(&scaled, 1000).unwrap().len();
    assert!(scaled_len < naive_len.min(reduced_len));
    // exactly what the downscale pass produces, so it must land in budget
    let budget = scaled_len;

    let result = TimelapseEncoder::new(1000, budget).encode(&frames).unwrap();

    assert_eq!(result.remediation, Remediation::Downscaled);
    assert!(result.within_budget);
    assert!(result.bytes.len() <= budget);
    assert_eq!((result.width, result.height), (82, 82));
    assert_eq!(result.frame_count, 3);
    let decoded = decode_frames(&result.bytes);
    assert_eq!(decoded.len(), 3);
    assert_eq!(decoded[0].buffer().dimensions(), (82, 82));
}

#[test]
fn test_custom_downscale_factor_and_palette() {
    let frames = frame_sequence(2, |seed| random_frame(96, 96, seed));
    let result = TimelapseEncoder::new(1000, 1)
        .with_downscale_factor(0.5)
        .with_palette_bits(4)
        .encode(&frames)
        .unwrap();

    assert_eq!(result.remediation, Remediation::Downscaled);
    assert_eq!((result.width, result.height), (48, 48));
    let expected: Vec<_> = frames
        .iter()
        .map(|f| reduce_palette(&downscale(f, 0.5), 4))
        .collect();
    assert_eq!(result.bytes, encode_gif(&expected, 1000).unwrap());
}

#[test]
fn test_unreachable_budget_is_flagged_not_fatal() {
    let frames = frame_sequence(2, |seed| random_frame(48, 48, seed));
    let result = TimelapseEncoder::new(1000, 1).encode(&frames).unwrap();

    assert_eq!(result.remediation, Remediation::Downscaled);
    assert!(!result.within_budget);
    assert_eq!(result.frame_count, 2);
    assert!(!result.bytes.is_empty());
}

#[test]
fn test_single_frame_timelapse() {
    let frames = vec![solid_frame(24, 24, [9, 9, 9])];
    let result = TimelapseEncoder::new(500, 1_000_000).encode(&frames).unwrap();
    assert_eq!(result.frame_count, 1);
    assert_eq!(decode_frames(&result.bytes).len(), 1);
}
