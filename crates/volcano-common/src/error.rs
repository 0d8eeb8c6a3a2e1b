//! Error types for the volcano imagery archive.

use std::path::Path;

use thiserror::Error;

/// Result type alias using MonitorError.
pub type MonitorResult<T> = Result<T, MonitorError>;

/// How far a failure reaches when it surfaces at the site-processing boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    /// Abort the whole run.
    Run,
    /// Skip the rest of this site, continue with siblings.
    Site,
    /// Skip this (date, composite), continue with the site.
    Asset,
    /// Skip a single file or row, continue the current loop.
    Item,
}

/// Primary error type for acquisition, archival and compositing.
#[derive(Debug, Error)]
pub enum MonitorError {
    // === Upstream Errors ===
    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Catalog unavailable for site '{site}': {message}")]
    CatalogUnavailable { site: String, message: String },

    #[error("Render unavailable for {site} {date} {composite}: {message}")]
    RenderUnavailable {
        site: String,
        date: String,
        composite: String,
        message: String,
    },

    // === Archive Errors ===
    #[error("Ledger corrupt at {path}: {message}")]
    LedgerCorrupt { path: String, message: String },

    #[error("Filesystem error at {path}: {message}")]
    Filesystem { path: String, message: String },

    #[error("Invalid asset file name: {0}")]
    InvalidAssetName(String),

    // === Configuration Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown site: {0}")]
    UnknownSite(String),

    // === Imaging Errors ===
    #[error("Image error: {0}")]
    Image(String),

    #[error("Encoding failed: {0}")]
    Encode(String),
}

impl MonitorError {
    /// Build a filesystem error carrying the offending path.
    pub fn filesystem(path: &Path, err: impl std::fmt::Display) -> Self {
        MonitorError::Filesystem {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    /// Build a ledger corruption error carrying the ledger path.
    pub fn ledger_corrupt(path: &Path, err: impl std::fmt::Display) -> Self {
        MonitorError::LedgerCorrupt {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    /// Get the propagation scope for this error.
    pub fn scope(&self) -> ErrorScope {
        match self {
            MonitorError::Credential(_) => ErrorScope::Run,

            MonitorError::CatalogUnavailable { .. }
            | MonitorError::LedgerCorrupt { .. }
            | MonitorError::UnknownSite(_)
            | MonitorError::InvalidConfig(_) => ErrorScope::Site,

            MonitorError::RenderUnavailable { .. }
            | MonitorError::Image(_)
            | MonitorError::Encode(_) => ErrorScope::Asset,

            MonitorError::Filesystem { .. } | MonitorError::InvalidAssetName(_) => {
                ErrorScope::Item
            }
        }
    }

    /// Only credential failures stop the batch.
    pub fn is_fatal(&self) -> bool {
        self.scope() == ErrorScope::Run
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::InvalidConfig(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for MonitorError {
    fn from(err: serde_yaml::Error) -> Self {
        MonitorError::InvalidConfig(format!("YAML error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_credential_is_fatal() {
        assert!(MonitorError::Credential("missing".into()).is_fatal());
        assert!(!MonitorError::CatalogUnavailable {
            site: "Llaima".into(),
            message: "timeout".into()
        }
        .is_fatal());
        assert!(!MonitorError::LedgerCorrupt {
            path: "x".into(),
            message: "bad".into()
        }
        .is_fatal());
    }

    #[test]
    fn test_scopes() {
        let render = MonitorError::RenderUnavailable {
            site: "Villarrica".into(),
            date: "2025-06-01".into(),
            composite: "RGB".into(),
            message: "502".into(),
        };
        assert_eq!(render.scope(), ErrorScope::Asset);
        assert_eq!(
            MonitorError::filesystem(Path::new("/tmp/a.png"), "denied").scope(),
            ErrorScope::Item
        );
    }
}
