//! Sentinel-2 acquisition for monitored volcano sites.
//!
//! Searches the Copernicus catalog for recent low-cloud scenes, renders each
//! configured composite through the Process API, archives the PNGs, records
//! them in the site ledger and sweeps assets past the retention horizon.

pub mod auth;
pub mod catalog;
pub mod fetch;
pub mod pipeline;
pub mod summary;

pub use auth::AuthSession;
pub use catalog::{normalize_scenes, CatalogClient, HttpCatalogClient, RawScene, SceneRecord};
pub use fetch::{HttpRasterFetcher, RasterFetcher};
pub use pipeline::AcquisitionPipeline;
pub use summary::{RunSummary, SiteSummary};
