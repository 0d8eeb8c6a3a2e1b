//! Local archive of rendered rasters for each monitored site.
//!
//! - [`ArchiveStore`]: date-indexed PNG files with atomic writes
//! - [`MetadataLedger`]: the per-site `metadata.csv`, merged under a file lock
//! - [`RetentionSweeper`]: deletes assets older than the retention horizon
//! - [`quality`]: dark-raster detection

pub mod ledger;
pub mod lock;
pub mod quality;
pub mod retention;
pub mod store;

pub use ledger::{merge_entries, LedgerEntry, MergeOutcome, MetadataLedger};
pub use lock::LedgerLock;
pub use quality::{mean_brightness, scan_dark_assets, DarkAsset};
pub use retention::{RetentionSweeper, SweepStats};
pub use store::{write_atomic, ArchiveStore, WriteMode, WriteOutcome};
