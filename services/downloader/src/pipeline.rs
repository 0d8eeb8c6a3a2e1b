//! Sequential acquisition run: search, fetch, archive, record, sweep.
//!
//! Sites are processed one at a time, scenes within a site one at a time.
//! Failures are contained at the narrowest scope that makes sense: a render
//! failure skips one asset, a catalog or ledger failure skips the site, and
//! only a credential failure stops the run.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, error, info, instrument, warn};

use archive::quality::is_dark;
use archive::{ArchiveStore, LedgerEntry, MetadataLedger, RetentionSweeper, WriteMode, WriteOutcome};
use volcano_common::config::{AcquisitionConfig, RetentionConfig};
use volcano_common::time::retention_cutoff;
use volcano_common::{AssetKey, CompositeProfile, DateRange, MonitorConfig, MonitorResult, Site};

use crate::catalog::{CatalogClient, SceneRecord};
use crate::fetch::RasterFetcher;
use crate::summary::{RunSummary, SiteSummary};

/// Drives catalog search and archival for a list of sites.
pub struct AcquisitionPipeline {
    catalog: Arc<dyn CatalogClient>,
    fetcher: Arc<dyn RasterFetcher>,
    store: ArchiveStore,
    ledger: MetadataLedger,
    profiles: Vec<CompositeProfile>,
    acquisition: AcquisitionConfig,
    retention: RetentionConfig,
}

impl AcquisitionPipeline {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        fetcher: Arc<dyn RasterFetcher>,
        config: &MonitorConfig,
    ) -> Self {
        Self {
            catalog,
            fetcher,
            store: ArchiveStore::new(&config.archive_root)
                .with_compression(config.acquisition.compression),
            ledger: MetadataLedger::new(&config.archive_root),
            profiles: config.composites.clone(),
            acquisition: config.acquisition.clone(),
            retention: config.retention.clone(),
        }
    }

    pub fn store(&self) -> &ArchiveStore {
        &self.store
    }

    pub fn ledger(&self) -> &MetadataLedger {
        &self.ledger
    }

    /// Process `sites` in order with `today` as the reference day.
    ///
    /// Returns an error only when a credential failure aborts the run; every
    /// other failure is recorded in that site's summary.
    pub async fn run(&self, sites: &[&Site], today: NaiveDate) -> MonitorResult<RunSummary> {
        info!(sites = sites.len(), today = %today, "Starting acquisition run");
        let mut summary = RunSummary::default();

        for site in sites {
            match self.process_site(site, today).await {
                Ok(site_summary) => summary.push(site_summary),
                Err(e) if e.is_fatal() => {
                    error!(site = %site.name, error = %e, "Aborting run");
                    summary.push(SiteSummary::failed_with(&site.name, &e));
                    summary.log();
                    return Err(e);
                }
                Err(e) => {
                    error!(site = %site.name, error = %e, "Site failed, continuing with next site");
                    summary.push(SiteSummary::failed_with(&site.name, &e));
                }
            }
        }

        summary.log();
        Ok(summary)
    }

    /// Acquire, record and sweep one site.
    #[instrument(skip(self, site), fields(site = %site.name))]
    pub async fn process_site(&self, site: &Site, today: NaiveDate) -> MonitorResult<SiteSummary> {
        let mut summary = SiteSummary::new(&site.name);
        // nothing older than the retention cutoff is fetched, or every run
        // would archive it only for the sweep to delete it again
        let cutoff = retention_cutoff(today, self.retention.horizon_days);
        let lookback = self.acquisition.lookback_days.min(self.retention.horizon_days);
        if lookback < self.acquisition.lookback_days {
            debug!(
                lookback_days = self.acquisition.lookback_days,
                horizon_days = self.retention.horizon_days,
                "Lookback clamped to the retention horizon"
            );
        }
        let range = DateRange::trailing(today, lookback);

        let scenes: Vec<SceneRecord> = self
            .catalog
            .search(site, &range, self.acquisition.max_cloud_cover)
            .await?
            .into_iter()
            .filter(|s| s.date >= cutoff)
            .collect();
        if scenes.is_empty() {
            info!("No scenes under the cloud ceiling");
        }

        let mut entries = Vec::new();
        for scene in &scenes {
            for profile in &self.profiles {
                if let Some(entry) = self.acquire(site, scene, profile, &mut summary).await? {
                    entries.push(entry);
                }
            }
        }

        let merged = match self.ledger.merge(&site.name, entries) {
            Ok(merged) => merged,
            Err(e) => {
                error!(error = %e, "Ledger merge failed, skipping retention for this site");
                summary.error = Some(e.to_string());
                return Ok(summary);
            }
        };

        let sweep = RetentionSweeper::new(&self.store, &self.ledger)
            .prune_ledger(self.retention.prune_ledger)
            .sweep(&site.name, self.retention.horizon_days, today);
        summary.pruned = sweep.files_deleted as usize;
        summary.ledger_rows = merged.rows.saturating_sub(sweep.ledger_rows_removed as usize);
        if let Some(ledger_error) = sweep.ledger_error {
            summary.error = Some(ledger_error);
        }

        Ok(summary)
    }

    /// Store one (date, composite). `Ok(None)` means the asset was skipped
    /// after a non-fatal failure.
    async fn acquire(
        &self,
        site: &Site,
        scene: &SceneRecord,
        profile: &CompositeProfile,
        summary: &mut SiteSummary,
    ) -> MonitorResult<Option<LedgerEntry>> {
        let key = AssetKey::new(&site.name, scene.date, profile.kind);

        if !self.acquisition.overwrite && self.store.exists(&key) {
            return match self.store.file_size(&key) {
                Ok(size) => {
                    debug!(asset = %key, "Already archived");
                    summary.skipped_existing += 1;
                    Ok(Some(LedgerEntry::new(&key, scene.cloud_cover, &scene.sensor, size)))
                }
                Err(e) => {
                    warn!(asset = %key, error = %e, "Cannot stat archived asset");
                    summary.failed += 1;
                    Ok(None)
                }
            };
        }

        let bytes = match self.fetcher.fetch(site, scene.date, profile).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!(
                    date = %scene.date,
                    composite = %profile.kind,
                    error = %e,
                    "Render failed, skipping asset"
                );
                summary.failed += 1;
                return Ok(None);
            }
        };

        match is_dark(&bytes, self.acquisition.dark_threshold) {
            Ok(true) => {
                warn!(asset = %key, threshold = self.acquisition.dark_threshold, "Raster is nearly black");
                summary.dark += 1;
            }
            Ok(false) => {}
            Err(e) => warn!(asset = %key, error = %e, "Could not measure brightness"),
        }

        let mode = WriteMode::from_overwrite(self.acquisition.overwrite);
        match self.store.write(&key, &bytes, mode) {
            Ok(outcome) => {
                match &outcome {
                    WriteOutcome::Written { .. } => summary.fetched += 1,
                    WriteOutcome::SkippedExisting { .. } => summary.skipped_existing += 1,
                }
                Ok(Some(LedgerEntry::new(
                    &key,
                    scene.cloud_cover,
                    &scene.sensor,
                    outcome.bytes(),
                )))
            }
            Err(e) => {
                error!(asset = %key, error = %e, "Failed to archive raster");
                summary.failed += 1;
                Ok(None)
            }
        }
    }
}

