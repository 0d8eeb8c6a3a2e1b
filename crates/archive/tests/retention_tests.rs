//! Tests for the retention sweep and dark-asset scan.

use archive::{scan_dark_assets, ArchiveStore, LedgerEntry, MetadataLedger, RetentionSweeper};
use test_utils::dates::date;
use test_utils::{solid_png, TempArchive};
use volcano_common::{AssetKey, BandComposite};

fn key(d: &str, composite: BandComposite) -> AssetKey {
    AssetKey::new("Villarrica", date(d), composite)
}

// ============================================================================
// retention tests
// ============================================================================

#[test]
fn test_sweep_removes_only_expired() {
    let archive = TempArchive::new();
    let store = ArchiveStore::new(archive.root());
    let ledger = MetadataLedger::new(archive.root());
    let png = solid_png(2, 2, [90, 90, 90]);

    // horizon 60 from 2025-03-01: cutoff 2024-12-31
    let expired = key("2024-12-30", BandComposite::TrueColor);
    let boundary = key("2024-12-31", BandComposite::ThermalFalseColor);
    let kept = key("2025-01-01", BandComposite::TrueColor);
    for k in [&expired, &boundary, &kept] {
        archive.seed_asset(k, &png);
    }
    let foreign = archive.seed_file("Villarrica/RGB/2020-01-01_RGB_backup.png", &png);

    let stats = RetentionSweeper::new(&store, &ledger).sweep("Villarrica", 60, date("2025-03-01"));

    assert_eq!(stats.files_deleted, 1);
    assert_eq!(stats.delete_errors, 0);
    assert!(!store.exists(&expired));
    assert!(store.exists(&boundary));
    assert!(store.exists(&kept));
    assert!(foreign.exists(), "files outside the naming grammar are never deleted");
}

#[test]
fn test_sweep_prunes_ledger_rows() {
    let archive = TempArchive::new();
    let store = ArchiveStore::new(archive.root());
    let ledger = MetadataLedger::new(archive.root());

    ledger
        .merge(
            "Villarrica",
            vec![
                LedgerEntry::new(&key("2024-12-01", BandComposite::TrueColor), 1.0, "Sentinel-2A", 10),
                LedgerEntry::new(&key("2025-02-01", BandComposite::TrueColor), 1.0, "Sentinel-2A", 10),
            ],
        )
        .unwrap();

    let stats = RetentionSweeper::new(&store, &ledger).sweep("Villarrica", 60, date("2025-03-01"));
    assert_eq!(stats.ledger_rows_removed, 1);

    let rows = ledger.load("Villarrica").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].date, date("2025-02-01"));
}

#[test]
fn test_sweep_can_leave_ledger_alone() {
    let archive = TempArchive::new();
    let store = ArchiveStore::new(archive.root());
    let ledger = MetadataLedger::new(archive.root());
    ledger
        .merge(
            "Villarrica",
            vec![LedgerEntry::new(&key("2024-12-01", BandComposite::TrueColor), 1.0, "Sentinel-2A", 10)],
        )
        .unwrap();

    let stats = RetentionSweeper::new(&store, &ledger)
        .prune_ledger(false)
        .sweep("Villarrica", 60, date("2025-03-01"));

    assert_eq!(stats.ledger_rows_removed, 0);
    assert_eq!(ledger.load("Villarrica").unwrap().len(), 1);
}

#[test]
fn test_sweep_reports_corrupt_ledger_without_failing() {
    let archive = TempArchive::new();
    let store = ArchiveStore::new(archive.root());
    let ledger = MetadataLedger::new(archive.root());
    archive.seed_asset(&key("2024-01-01", BandComposite::TrueColor), &solid_png(2, 2, [1, 1, 1]));
    archive.seed_file("Villarrica/metadata.csv", b"garbage\n");

    let stats = RetentionSweeper::new(&store, &ledger).sweep("Villarrica", 60, date("2025-03-01"));

    assert_eq!(stats.files_deleted, 1);
    assert!(stats.ledger_error.is_some());
}

#[test]
fn test_sweep_empty_site() {
    let archive = TempArchive::new();
    let store = ArchiveStore::new(archive.root());
    let ledger = MetadataLedger::new(archive.root());

    let stats = RetentionSweeper::new(&store, &ledger).sweep("Llaima", 60, date("2025-03-01"));
    assert_eq!(stats.files_deleted, 0);
    assert_eq!(stats.cutoff, Some(date("2024-12-31")));
}

// ============================================================================
// dark scan tests
// ============================================================================

#[test]
fn test_scan_finds_dark_assets() {
    let archive = TempArchive::new();
    let store = ArchiveStore::new(archive.root());

    archive.seed_asset(&key("2025-06-02", BandComposite::TrueColor), &solid_png(4, 4, [0, 0, 0]));
    archive.seed_asset(&key("2025-06-01", BandComposite::TrueColor), &solid_png(4, 4, [2, 3, 4]));
    archive.seed_asset(&key("2025-06-01", BandComposite::ThermalFalseColor), &solid_png(4, 4, [120, 60, 10]));
    archive.seed_file("Villarrica/timelapses/2025-06-01_RGB.png", &solid_png(4, 4, [0, 0, 0]));
    archive.seed_file("Villarrica/RGB/2025-06-03_RGB.png", b"truncated");

    let dark = scan_dark_assets(&store, "Villarrica", 5.0).unwrap();
    let found: Vec<String> = dark.iter().map(|d| d.key.to_string()).collect();
    assert_eq!(
        found,
        vec![
            "Villarrica/RGB/2025-06-01_RGB.png".to_string(),
            "Villarrica/RGB/2025-06-02_RGB.png".to_string(),
        ]
    );
    assert_eq!(dark[0].mean_brightness, 3.0);
}
