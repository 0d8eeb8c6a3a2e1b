//! Per-site CSV ledger of archived rasters.
//!
//! One row per (date, composite), sorted by date descending. Column names are
//! fixed because downstream tooling reads the file directly:
//!
//! `fecha,tipo,cobertura_nubosa,sensor,ruta_archivo,tamano_mb`

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use volcano_common::{AssetKey, BandComposite, MonitorError, MonitorResult};

use crate::lock::LedgerLock;
use crate::store::{persist, LEDGER_FILE};

/// Ledger header, in column order.
pub const LEDGER_HEADERS: [&str; 6] = [
    "fecha",
    "tipo",
    "cobertura_nubosa",
    "sensor",
    "ruta_archivo",
    "tamano_mb",
];

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(rename = "fecha")]
    pub date: NaiveDate,
    #[serde(rename = "tipo")]
    pub composite: BandComposite,
    #[serde(rename = "cobertura_nubosa")]
    pub cloud_cover: f64,
    pub sensor: String,
    /// Path relative to the site directory.
    #[serde(rename = "ruta_archivo")]
    pub path: String,
    #[serde(rename = "tamano_mb")]
    pub size_mb: f64,
}

impl LedgerEntry {
    pub fn new(key: &AssetKey, cloud_cover: f64, sensor: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            date: key.date,
            composite: key.composite,
            cloud_cover,
            sensor: sensor.into(),
            path: key.relative_path(),
            size_mb: size_mb(size_bytes),
        }
    }

    /// Identity within a ledger.
    pub fn key(&self) -> (NaiveDate, BandComposite) {
        (self.date, self.composite)
    }
}

/// Bytes to MB rounded to two decimals.
pub fn size_mb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
}

/// Merge `incoming` into `existing`.
///
/// Rows are keyed by (date, composite); for duplicate keys the row seen last
/// wins, with `incoming` seen after `existing`. Output is sorted by date
/// descending, then composite.
pub fn merge_entries(existing: Vec<LedgerEntry>, incoming: Vec<LedgerEntry>) -> Vec<LedgerEntry> {
    let mut rows: BTreeMap<(Reverse<NaiveDate>, BandComposite), LedgerEntry> = BTreeMap::new();
    for entry in existing.into_iter().chain(incoming) {
        rows.insert((Reverse(entry.date), entry.composite), entry);
    }
    rows.into_values().collect()
}

/// Summary of a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub rows: usize,
    pub changed: bool,
}

/// Reads and rewrites the ledgers under one archive root.
#[derive(Debug, Clone)]
pub struct MetadataLedger {
    root: PathBuf,
}

impl MetadataLedger {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn site_dir(&self, site: &str) -> PathBuf {
        self.root.join(site)
    }

    pub fn path(&self, site: &str) -> PathBuf {
        self.site_dir(site).join(LEDGER_FILE)
    }

    /// All rows for `site`; an absent ledger is empty.
    pub fn load(&self, site: &str) -> MonitorResult<Vec<LedgerEntry>> {
        read_ledger(&self.path(site))
    }

    /// Merge `entries` into the site ledger under the site lock.
    ///
    /// The file is rewritten only when its contents change. A corrupt ledger
    /// is reported and left in place.
    #[instrument(skip(self, entries), fields(site = %site, incoming = entries.len()))]
    pub fn merge(&self, site: &str, entries: Vec<LedgerEntry>) -> MonitorResult<MergeOutcome> {
        let _lock = LedgerLock::acquire(&self.site_dir(site))?;
        let path = self.path(site);

        let existing = read_ledger(&path)?;
        let merged = merge_entries(existing.clone(), entries);

        if merged == existing && path.exists() {
            debug!(rows = merged.len(), "Ledger unchanged");
            return Ok(MergeOutcome {
                rows: merged.len(),
                changed: false,
            });
        }

        write_ledger(&path, &merged)?;
        info!(
            ledger = %path.display(),
            before = existing.len(),
            after = merged.len(),
            "Ledger updated"
        );

        Ok(MergeOutcome {
            rows: merged.len(),
            changed: true,
        })
    }

    /// Drop rows for which `keep` is false; returns the number removed.
    pub fn retain<F>(&self, site: &str, keep: F) -> MonitorResult<usize>
    where
        F: Fn(&LedgerEntry) -> bool,
    {
        let path = self.path(site);
        if !path.exists() {
            return Ok(0);
        }

        let _lock = LedgerLock::acquire(&self.site_dir(site))?;
        let rows = read_ledger(&path)?;
        let before = rows.len();
        let kept: Vec<LedgerEntry> = rows.into_iter().filter(|r| keep(r)).collect();
        let removed = before - kept.len();

        if removed > 0 {
            write_ledger(&path, &kept)?;
            info!(ledger = %path.display(), removed, "Pruned ledger rows");
        }
        Ok(removed)
    }
}

fn read_ledger(path: &Path) -> MonitorResult<Vec<LedgerEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut reader = csv::Reader::from_path(path).map_err(|e| MonitorError::ledger_corrupt(path, e))?;

    let headers = reader
        .headers()
        .map_err(|e| MonitorError::ledger_corrupt(path, e))?
        .clone();
    if headers.iter().ne(LEDGER_HEADERS.iter().copied()) {
        return Err(MonitorError::ledger_corrupt(
            path,
            format!("unexpected header: {}", headers.iter().collect::<Vec<_>>().join(",")),
        ));
    }

    reader
        .deserialize::<LedgerEntry>()
        .enumerate()
        .map(|(i, row)| {
            // row 1 is the header
            row.map_err(|e| MonitorError::ledger_corrupt(path, format!("row {}: {}", i + 2, e)))
        })
        .collect()
}

fn write_ledger(path: &Path, rows: &[LedgerEntry]) -> MonitorResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| MonitorError::filesystem(path, "ledger path has no parent directory"))?;

    let tmp = tempfile::Builder::new()
        .prefix(".metadata-")
        .suffix(".csv")
        .tempfile_in(dir)
        .map_err(|e| MonitorError::filesystem(dir, e))?;

    {
        let file: &File = tmp.as_file();
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        writer
            .write_record(LEDGER_HEADERS)
            .map_err(|e| MonitorError::filesystem(tmp.path(), e))?;
        for row in rows {
            writer
                .serialize(row)
                .map_err(|e| MonitorError::filesystem(tmp.path(), e))?;
        }
        writer
            .flush()
            .map_err(|e| MonitorError::filesystem(tmp.path(), e))?;
    }

    tmp.as_file()
        .sync_all()
        .map_err(|e| MonitorError::filesystem(tmp.path(), e))?;
    persist(tmp, path)
}
