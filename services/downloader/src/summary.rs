//! Per-site and per-run acquisition counters.

use serde::Serialize;
use tracing::{info, warn};

/// What one site's acquisition did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SiteSummary {
    pub site: String,
    pub fetched: usize,
    pub skipped_existing: usize,
    pub failed: usize,
    pub pruned: usize,
    pub dark: usize,
    /// Ledger size after the merge and sweep.
    pub ledger_rows: usize,
    /// Set when the site was abandoned part way.
    pub error: Option<String>,
}

impl SiteSummary {
    pub fn new(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            ..Default::default()
        }
    }

    pub fn failed_with(site: impl Into<String>, error: impl ToString) -> Self {
        Self {
            site: site.into(),
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// All sites of one invocation, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub sites: Vec<SiteSummary>,
}

impl RunSummary {
    pub fn push(&mut self, site: SiteSummary) {
        self.sites.push(site);
    }

    pub fn site(&self, name: &str) -> Option<&SiteSummary> {
        self.sites.iter().find(|s| s.site == name)
    }

    /// Sum of every counter; `site` is "total" and `error` is unset.
    pub fn totals(&self) -> SiteSummary {
        self.sites.iter().fold(SiteSummary::new("total"), |mut t, s| {
            t.fetched += s.fetched;
            t.skipped_existing += s.skipped_existing;
            t.failed += s.failed;
            t.pruned += s.pruned;
            t.dark += s.dark;
            t.ledger_rows += s.ledger_rows;
            t
        })
    }

    pub fn failed_sites(&self) -> usize {
        self.sites.iter().filter(|s| !s.is_ok()).count()
    }

    /// One line per site, then a total line.
    pub fn log(&self) {
        for s in &self.sites {
            match &s.error {
                None => info!(
                    site = %s.site,
                    fetched = s.fetched,
                    skipped_existing = s.skipped_existing,
                    failed = s.failed,
                    pruned = s.pruned,
                    dark = s.dark,
                    ledger_rows = s.ledger_rows,
                    "Site summary"
                ),
                Some(error) => warn!(
                    site = %s.site,
                    fetched = s.fetched,
                    skipped_existing = s.skipped_existing,
                    failed = s.failed,
                    error = %error,
                    "Site summary (incomplete)"
                ),
            }
        }

        let t = self.totals();
        info!(
            sites = self.sites.len(),
            failed_sites = self.failed_sites(),
            fetched = t.fetched,
            skipped_existing = t.skipped_existing,
            failed = t.failed,
            pruned = t.pruned,
            dark = t.dark,
            "Run summary"
        );
    }
}
