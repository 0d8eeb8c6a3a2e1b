//! Timelapse generation over the Sentinel-2 archive.
//!
//! For one site and composite: list archived frames in a date range, stamp
//! each with attribution, date, label and scale bar, encode a looping GIF
//! under the size budget and store it next to the site's assets.

pub mod job;
pub mod logo;

pub use job::{timelapse_file_name, TimelapseJob, TimelapseOutput};
pub use logo::{fetch_logo, load_logo};
