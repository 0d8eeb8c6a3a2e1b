//! Tests for footprint construction and the pixel/distance scale.

use volcano_common::footprint::{bbox, format_distance, scale_bar_length_px, KM_PER_DEGREE};
use volcano_common::{BandComposite, CompositeProfile, Coordinate, GeoFootprint, ScaleBar, Site};

// ============================================================================
// bbox tests
// ============================================================================

#[test]
fn test_bbox_is_symmetric_square() {
    let center = Coordinate::new(-39.42, -71.93);
    let b = bbox(center, 3.0);

    let delta = 3.0 / KM_PER_DEGREE;
    assert!((b.min_lon - (-71.93 - delta)).abs() < 1e-12);
    assert!((b.max_lon - (-71.93 + delta)).abs() < 1e-12);
    assert!((b.min_lat - (-39.42 - delta)).abs() < 1e-12);
    assert!((b.max_lat - (-39.42 + delta)).abs() < 1e-12);

    // side of 2 * radius, in degrees, on both axes
    assert!((b.width() - b.height()).abs() < 1e-12);
    assert!((b.width() * KM_PER_DEGREE - 6.0).abs() < 1e-9);
}

#[test]
fn test_bbox_contains_center() {
    let center = Coordinate::new(-38.69, -71.73);
    let b = bbox(center, 5.0);
    assert!(b.contains_point(center.lon, center.lat));
}

// ============================================================================
// scale bar tests
// ============================================================================

#[test]
fn test_scale_bar_6km_1024px() {
    assert_eq!(scale_bar_length_px(1024, 6.0, 3.0), 512);
}

#[test]
fn test_scale_bar_doubles_with_width() {
    let narrow = ScaleBar::new(1024, 6.0, 3.0);
    let wide = ScaleBar::new(2048, 6.0, 3.0);

    assert_eq!(wide.length_px, narrow.length_px * 2);
    assert_eq!(narrow.label, "3 km");
    assert_eq!(wide.label, "3 km");
}

#[test]
fn test_scale_bar_rounds_to_nearest_pixel() {
    // 800 / 6 * 3 = 400 exactly; 1000 / 6 * 1 = 166.67 -> 167
    assert_eq!(scale_bar_length_px(800, 6.0, 3.0), 400);
    assert_eq!(scale_bar_length_px(1000, 6.0, 1.0), 167);
}

#[test]
fn test_scale_bar_follows_fetch_radius() {
    let site = Site::new("Puyehue-Cordon Caulle", -40.59, -72.12, 20.0);
    let profile = CompositeProfile::new(BandComposite::TrueColor);
    let footprint = profile.footprint(&site);

    assert_eq!(footprint.side_km, 40.0);
    // 1024 px over 40 km
    assert_eq!(footprint.scale_bar(3.0).length_px, 77);
    assert!((footprint.pixels_per_km() - 25.6).abs() < 1e-9);
}

#[test]
fn test_scale_bar_label_independent_of_pixels() {
    for width in [512, 870, 1024, 2048] {
        assert_eq!(ScaleBar::new(width, 6.0, 3.0).label, format_distance(3.0));
    }
}

#[test]
fn test_footprint_records_requested_size() {
    let fp = GeoFootprint::around(Coordinate::new(-39.42, -71.93), 3.0, 800, 600);
    assert_eq!(fp.width_px, 800);
    assert_eq!(fp.height_px, 600);
    assert_eq!(fp.scale_bar(3.0).length_px, 400);
}
