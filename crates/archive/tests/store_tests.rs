//! Tests for the archive store: write modes, listing and compression.

use archive::{ArchiveStore, WriteMode};
use test_utils::dates::date;
use test_utils::{encode_png, gradient_frame, solid_png, TempArchive};
use volcano_common::{ArchiveCompression, AssetKey, BandComposite, DateRange};

fn key(d: &str, composite: BandComposite) -> AssetKey {
    AssetKey::new("Villarrica", date(d), composite)
}

// ============================================================================
// write tests
// ============================================================================

#[test]
fn test_write_creates_directories() {
    let archive = TempArchive::new();
    let store = ArchiveStore::new(archive.root());
    let k = key("2025-06-01", BandComposite::TrueColor);

    assert!(!store.exists(&k));
    let outcome = store
        .write(&k, &solid_png(4, 4, [1, 2, 3]), WriteMode::SkipExisting)
        .unwrap();

    assert!(outcome.was_written());
    assert!(store.exists(&k));
    assert_eq!(outcome.path(), archive.root().join("Villarrica/RGB/2025-06-01_RGB.png"));
    assert_eq!(outcome.bytes(), store.file_size(&k).unwrap());
}

#[test]
fn test_skip_existing_keeps_first_bytes() {
    let archive = TempArchive::new();
    let store = ArchiveStore::new(archive.root());
    let k = key("2025-06-01", BandComposite::TrueColor);

    let first = solid_png(4, 4, [10, 10, 10]);
    let second = solid_png(8, 8, [200, 200, 200]);
    store.write(&k, &first, WriteMode::SkipExisting).unwrap();
    let outcome = store.write(&k, &second, WriteMode::SkipExisting).unwrap();

    assert!(!outcome.was_written());
    assert_eq!(store.read(&k).unwrap(), first);
}

#[test]
fn test_overwrite_replaces_bytes() {
    let archive = TempArchive::new();
    let store = ArchiveStore::new(archive.root());
    let k = key("2025-06-01", BandComposite::ThermalFalseColor);

    store
        .write(&k, &solid_png(4, 4, [10, 10, 10]), WriteMode::SkipExisting)
        .unwrap();
    let replacement = solid_png(8, 8, [200, 200, 200]);
    let outcome = store.write(&k, &replacement, WriteMode::Overwrite).unwrap();

    assert!(outcome.was_written());
    assert_eq!(store.read(&k).unwrap(), replacement);
}

#[test]
fn test_write_leaves_no_temp_files() {
    let archive = TempArchive::new();
    let store = ArchiveStore::new(archive.root());
    let k = key("2025-06-01", BandComposite::TrueColor);
    store
        .write(&k, &solid_png(4, 4, [0, 0, 0]), WriteMode::Overwrite)
        .unwrap();

    let names: Vec<String> = std::fs::read_dir(store.composite_dir("Villarrica", BandComposite::TrueColor))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["2025-06-01_RGB.png".to_string()]);
}

#[test]
fn test_lossless_compression_preserves_pixels() {
    let archive = TempArchive::new();
    let store = ArchiveStore::new(archive.root()).with_compression(ArchiveCompression::Lossless);
    let k = key("2025-06-01", BandComposite::TrueColor);

    let frame = gradient_frame(64, 64);
    let original = encode_png(&frame);
    let outcome = store.write(&k, &original, WriteMode::Overwrite).unwrap();

    assert!(outcome.bytes() <= original.len() as u64);
    let stored = image::load_from_memory(&store.read(&k).unwrap())
        .unwrap()
        .to_rgba8();
    assert_eq!(stored, frame);
}

#[test]
fn test_lossless_keeps_undecodable_payload() {
    let archive = TempArchive::new();
    let store = ArchiveStore::new(archive.root()).with_compression(ArchiveCompression::Lossless);
    let k = key("2025-06-01", BandComposite::TrueColor);

    store.write(&k, b"not a png", WriteMode::Overwrite).unwrap();
    assert_eq!(store.read(&k).unwrap(), b"not a png");
}

// ============================================================================
// listing tests
// ============================================================================

#[test]
fn test_list_sorted_and_filtered() {
    let archive = TempArchive::new();
    let store = ArchiveStore::new(archive.root());
    let png = solid_png(2, 2, [50, 50, 50]);

    for d in ["2025-06-03", "2025-06-01", "2025-06-02"] {
        archive.seed_asset(&key(d, BandComposite::TrueColor), &png);
    }
    archive.seed_asset(&key("2025-06-02", BandComposite::ThermalFalseColor), &png);
    archive.seed_file("Villarrica/RGB/notes.txt", b"hello");
    archive.seed_file("Villarrica/RGB/2025-06-04_RGB_copy.png", &png);
    archive.seed_file("Villarrica/RGB/.tmp-abc", b"partial");

    let dates: Vec<String> = store
        .list("Villarrica", BandComposite::TrueColor)
        .unwrap()
        .iter()
        .map(|k| k.date_string())
        .collect();
    assert_eq!(dates, vec!["2025-06-01", "2025-06-02", "2025-06-03"]);

    let range = DateRange::new(date("2025-06-02"), date("2025-06-03")).unwrap();
    let in_range = store
        .list_range("Villarrica", BandComposite::TrueColor, &range)
        .unwrap();
    assert_eq!(in_range.len(), 2);
    assert_eq!(in_range[0].date, date("2025-06-02"));
}

#[test]
fn test_list_missing_site_is_empty() {
    let archive = TempArchive::new();
    let store = ArchiveStore::new(archive.root());
    assert!(store.list("Llaima", BandComposite::TrueColor).unwrap().is_empty());
}
