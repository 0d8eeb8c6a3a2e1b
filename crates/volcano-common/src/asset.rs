//! Asset identity and the on-disk file name grammar.
//!
//! An archived raster lives at `<site>/<composite>/<YYYY-MM-DD>_<composite>.png`.
//! File names are parsed back into keys only through [`AssetKey::from_file_name`],
//! which rejects anything outside that grammar.

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::composite::BandComposite;
use crate::error::{MonitorError, MonitorResult};
use crate::time::{parse_date, DATE_FORMAT};

/// Identity of one archived raster: (site, date, composite).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetKey {
    pub site: String,
    pub date: NaiveDate,
    pub composite: BandComposite,
}

impl AssetKey {
    pub fn new(site: impl Into<String>, date: NaiveDate, composite: BandComposite) -> Self {
        Self {
            site: site.into(),
            date,
            composite,
        }
    }

    /// Parse `YYYY-MM-DD_<composite>.png` for `site`.
    pub fn from_file_name(site: &str, file_name: &str) -> MonitorResult<Self> {
        let invalid = || MonitorError::InvalidAssetName(file_name.to_string());

        let stem = file_name.strip_suffix(".png").ok_or_else(invalid)?;
        let (date_part, composite_part) = stem.split_once('_').ok_or_else(invalid)?;
        let date = parse_date(date_part).map_err(|_| invalid())?;
        let composite = BandComposite::ALL
            .into_iter()
            .find(|c| c.as_str() == composite_part)
            .ok_or_else(invalid)?;

        Ok(Self::new(site, date, composite))
    }

    pub fn date_string(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }

    /// `2025-06-01_RGB.png`
    pub fn file_name(&self) -> String {
        format!("{}_{}.png", self.date_string(), self.composite.as_str())
    }

    /// Path relative to the site directory, as recorded in the ledger.
    pub fn relative_path(&self) -> String {
        format!("{}/{}", self.composite.as_str(), self.file_name())
    }

    /// Path relative to the archive root.
    pub fn archive_path(&self) -> PathBuf {
        PathBuf::from(&self.site)
            .join(self.composite.as_str())
            .join(self.file_name())
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.site, self.relative_path())
    }
}
