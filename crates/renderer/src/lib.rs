//! Frame rendering for site timelapses.
//!
//! Implements:
//! - Attribution mark (logo or synthesised badge)
//! - Date, composite label and distance scale bar overlays
//! - Palette reduction
//! - Looping GIF encoding under a byte budget

pub mod attribution;
pub mod overlay;
pub mod palette;
pub mod text;
pub mod timelapse;

pub use attribution::{attribution_mark, decode_logo};
pub use overlay::{OverlayCompositor, OverlayLayout, OverlayStyle};
pub use text::{TextRenderer, TextStyle};
pub use timelapse::{EncodedTimelapse, Remediation, TimelapseEncoder};
