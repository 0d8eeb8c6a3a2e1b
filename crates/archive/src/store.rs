//! Filesystem archive of rendered rasters.
//!
//! Layout under the archive root:
//!
//! ```text
//! <site>/<composite>/<YYYY-MM-DD>_<composite>.png
//! <site>/metadata.csv
//! <site>/timelapses/<site>_<composite>_<start>_<end>.gif
//! ```
//!
//! Paths are a pure function of the asset key, so independent processes
//! agree on where an asset lives. Writes go through a temp file in the target
//! directory and are renamed into place.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::ImageEncoder;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use volcano_common::{
    ArchiveCompression, AssetKey, BandComposite, DateRange, MonitorError, MonitorResult,
};

/// Ledger file name inside a site directory.
pub const LEDGER_FILE: &str = "metadata.csv";

/// Timelapse directory name inside a site directory.
pub const TIMELAPSE_DIR: &str = "timelapses";

/// Whether an existing asset may be replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    #[default]
    SkipExisting,
    Overwrite,
}

impl WriteMode {
    pub fn from_overwrite(overwrite: bool) -> Self {
        if overwrite {
            WriteMode::Overwrite
        } else {
            WriteMode::SkipExisting
        }
    }
}

/// Result of a write request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written { path: PathBuf, bytes: u64 },
    SkippedExisting { path: PathBuf, bytes: u64 },
}

impl WriteOutcome {
    pub fn path(&self) -> &Path {
        match self {
            WriteOutcome::Written { path, .. } | WriteOutcome::SkippedExisting { path, .. } => path,
        }
    }

    pub fn bytes(&self) -> u64 {
        match self {
            WriteOutcome::Written { bytes, .. } | WriteOutcome::SkippedExisting { bytes, .. } => {
                *bytes
            }
        }
    }

    pub fn was_written(&self) -> bool {
        matches!(self, WriteOutcome::Written { .. })
    }
}

/// Date-indexed raster store rooted at one directory.
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    root: PathBuf,
    compression: ArchiveCompression,
}

impl ArchiveStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            compression: ArchiveCompression::AsFetched,
        }
    }

    pub fn with_compression(mut self, compression: ArchiveCompression) -> Self {
        self.compression = compression;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn site_dir(&self, site: &str) -> PathBuf {
        self.root.join(site)
    }

    pub fn composite_dir(&self, site: &str, composite: BandComposite) -> PathBuf {
        self.site_dir(site).join(composite.as_str())
    }

    pub fn ledger_path(&self, site: &str) -> PathBuf {
        self.site_dir(site).join(LEDGER_FILE)
    }

    pub fn timelapse_dir(&self, site: &str) -> PathBuf {
        self.site_dir(site).join(TIMELAPSE_DIR)
    }

    pub fn asset_path(&self, key: &AssetKey) -> PathBuf {
        self.root.join(key.archive_path())
    }

    pub fn exists(&self, key: &AssetKey) -> bool {
        self.asset_path(key).is_file()
    }

    /// Size in bytes of a stored asset.
    pub fn file_size(&self, key: &AssetKey) -> MonitorResult<u64> {
        let path = self.asset_path(key);
        fs::metadata(&path)
            .map(|m| m.len())
            .map_err(|e| MonitorError::filesystem(&path, e))
    }

    pub fn read(&self, key: &AssetKey) -> MonitorResult<Vec<u8>> {
        let path = self.asset_path(key);
        fs::read(&path).map_err(|e| MonitorError::filesystem(&path, e))
    }

    /// Store `bytes` for `key`.
    ///
    /// With [`WriteMode::SkipExisting`] an existing asset is left untouched and
    /// reported as skipped.
    pub fn write(&self, key: &AssetKey, bytes: &[u8], mode: WriteMode) -> MonitorResult<WriteOutcome> {
        let path = self.asset_path(key);

        if mode == WriteMode::SkipExisting && path.is_file() {
            let existing = self.file_size(key)?;
            debug!(asset = %key, "Asset already archived, skipping write");
            return Ok(WriteOutcome::SkippedExisting {
                path,
                bytes: existing,
            });
        }

        let payload = match self.compression {
            ArchiveCompression::AsFetched => None,
            ArchiveCompression::Lossless => recompress_png(key, bytes),
        };
        let payload = payload.as_deref().unwrap_or(bytes);

        write_atomic(&path, payload)?;

        info!(
            asset = %key,
            path = %path.display(),
            bytes = payload.len(),
            "Archived raster"
        );

        Ok(WriteOutcome::Written {
            path,
            bytes: payload.len() as u64,
        })
    }

    /// Delete a stored asset.
    pub fn remove(&self, key: &AssetKey) -> MonitorResult<()> {
        let path = self.asset_path(key);
        fs::remove_file(&path).map_err(|e| MonitorError::filesystem(&path, e))
    }

    /// All assets for (site, composite), date ascending.
    ///
    /// Files outside the naming grammar are skipped with a warning.
    pub fn list(&self, site: &str, composite: BandComposite) -> MonitorResult<Vec<AssetKey>> {
        let dir = self.composite_dir(site, composite);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&dir).map_err(|e| MonitorError::filesystem(&dir, e))?;
        let mut keys = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| MonitorError::filesystem(&dir, e))?;
            if !entry.path().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            // in-flight temp files from a concurrent writer
            if name.starts_with('.') {
                continue;
            }
            match AssetKey::from_file_name(site, &name) {
                Ok(key) if key.composite == composite => keys.push(key),
                Ok(key) => {
                    warn!(
                        path = %entry.path().display(),
                        found = %key.composite,
                        expected = %composite,
                        "Asset stored under the wrong composite directory, skipping"
                    );
                }
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "Skipping unrecognised file");
                }
            }
        }

        keys.sort_by_key(|k| k.date);
        Ok(keys)
    }

    /// Assets for (site, composite) whose date falls in `range`, date ascending.
    pub fn list_range(
        &self,
        site: &str,
        composite: BandComposite,
        range: &DateRange,
    ) -> MonitorResult<Vec<AssetKey>> {
        Ok(self
            .list(site, composite)?
            .into_iter()
            .filter(|k| range.contains(k.date))
            .collect())
    }
}

/// Write `bytes` to `path` through a sibling temp file and an atomic rename.
///
/// Parent directories are created as needed.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> MonitorResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| MonitorError::filesystem(path, "path has no parent directory"))?;
    fs::create_dir_all(dir).map_err(|e| MonitorError::filesystem(dir, e))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".tmp-")
        .tempfile_in(dir)
        .map_err(|e| MonitorError::filesystem(dir, e))?;
    tmp.write_all(bytes)
        .map_err(|e| MonitorError::filesystem(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| MonitorError::filesystem(tmp.path(), e))?;

    persist(tmp, path)
}

pub(crate) fn persist(tmp: NamedTempFile, path: &Path) -> MonitorResult<()> {
    tmp.persist(path)
        .map_err(|e| MonitorError::filesystem(path, e.error))?;
    Ok(())
}

/// Re-encode a PNG at maximum compression; `None` if it is not smaller or fails.
fn recompress_png(key: &AssetKey, bytes: &[u8]) -> Option<Vec<u8>> {
    let img = match image::load_from_memory(bytes) {
        Ok(img) => img,
        Err(e) => {
            warn!(asset = %key, error = %e, "Could not decode raster for recompression, storing as fetched");
            return None;
        }
    };

    let mut out = Vec::with_capacity(bytes.len());
    let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    if let Err(e) = encoder.write_image(img.as_bytes(), img.width(), img.height(), img.color()) {
        warn!(asset = %key, error = %e, "PNG recompression failed, storing as fetched");
        return None;
    }

    if out.len() < bytes.len() {
        debug!(
            asset = %key,
            before = bytes.len(),
            after = out.len(),
            "Recompressed raster"
        );
        Some(out)
    } else {
        None
    }
}
