//! Common types and utilities shared across the volcano imagery services.

pub mod asset;
pub mod bbox;
pub mod composite;
pub mod config;
pub mod error;
pub mod footprint;
pub mod site;
pub mod time;

pub use asset::AssetKey;
pub use bbox::BoundingBox;
pub use composite::{BandComposite, CompositeProfile};
pub use config::{ArchiveCompression, MonitorConfig};
pub use error::{ErrorScope, MonitorError, MonitorResult};
pub use footprint::{scale_bar_length_px, GeoFootprint, ScaleBar};
pub use site::{Coordinate, Site, SiteRegistry};
pub use time::DateRange;
