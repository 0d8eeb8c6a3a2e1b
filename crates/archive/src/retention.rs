//! Rolling-horizon retention for archived rasters.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use volcano_common::time::retention_cutoff;
use volcano_common::{AssetKey, BandComposite, MonitorResult};

use crate::ledger::MetadataLedger;
use crate::store::ArchiveStore;

/// Statistics from one sweep.
#[derive(Debug, Default, Clone, Serialize)]
pub struct SweepStats {
    /// Assets dated strictly before this were eligible.
    pub cutoff: Option<NaiveDate>,
    /// Number of rasters deleted
    pub files_deleted: u64,
    /// Number of deletes that failed
    pub delete_errors: u64,
    /// Number of ledger rows pruned
    pub ledger_rows_removed: u64,
    /// Set when the ledger could not be pruned
    pub ledger_error: Option<String>,
}

/// Deletes rasters that fall out of the retention horizon.
pub struct RetentionSweeper<'a> {
    store: &'a ArchiveStore,
    ledger: &'a MetadataLedger,
    prune_ledger: bool,
}

impl<'a> RetentionSweeper<'a> {
    pub fn new(store: &'a ArchiveStore, ledger: &'a MetadataLedger) -> Self {
        Self {
            store,
            ledger,
            prune_ledger: true,
        }
    }

    pub fn prune_ledger(mut self, prune: bool) -> Self {
        self.prune_ledger = prune;
        self
    }

    /// Delete every asset of `site` dated before `now - horizon_days`.
    ///
    /// Only files that parse as asset names are considered. A failed delete is
    /// logged and counted; the sweep carries on with the next file. Ledger
    /// rows of assets that could not be deleted are kept.
    pub fn sweep(&self, site: &str, horizon_days: u32, now: NaiveDate) -> SweepStats {
        self.sweep_with(site, horizon_days, now, |key| self.store.remove(key))
    }

    #[instrument(skip(self, remove), fields(site = %site))]
    fn sweep_with<F>(&self, site: &str, horizon_days: u32, now: NaiveDate, mut remove: F) -> SweepStats
    where
        F: FnMut(&AssetKey) -> MonitorResult<()>,
    {
        let cutoff = retention_cutoff(now, horizon_days);
        let mut stats = SweepStats {
            cutoff: Some(cutoff),
            ..Default::default()
        };
        let mut undeleted: HashSet<(NaiveDate, BandComposite)> = HashSet::new();

        for composite in BandComposite::ALL {
            let keys = match self.store.list(site, composite) {
                Ok(keys) => keys,
                Err(e) => {
                    warn!(composite = %composite, error = %e, "Failed to list assets for retention");
                    continue;
                }
            };

            for key in keys.into_iter().filter(|k| k.date < cutoff) {
                match remove(&key) {
                    Ok(()) => stats.files_deleted += 1,
                    Err(e) => {
                        warn!(asset = %key, error = %e, "Failed to delete expired asset");
                        stats.delete_errors += 1;
                        undeleted.insert((key.date, key.composite));
                    }
                }
            }
        }

        if self.prune_ledger {
            match self
                .ledger
                .retain(site, |row| row.date >= cutoff || undeleted.contains(&row.key()))
            {
                Ok(removed) => stats.ledger_rows_removed = removed as u64,
                Err(e) => {
                    error!(error = %e, "Failed to prune ledger");
                    stats.ledger_error = Some(e.to_string());
                }
            }
        }

        info!(
            cutoff = %cutoff,
            files = stats.files_deleted,
            ledger_rows = stats.ledger_rows_removed,
            errors = stats.delete_errors,
            "Retention sweep complete"
        );

        stats
    }
}
