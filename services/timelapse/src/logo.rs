//! Attribution logo download.

use std::time::Duration;

use image::RgbaImage;
use reqwest::Client;
use tracing::{info, warn};

use renderer::decode_logo;
use volcano_common::{MonitorError, MonitorResult};

const LOGO_TIMEOUT: Duration = Duration::from_secs(10);

/// Download and decode the logo at `url`.
pub async fn fetch_logo(url: &str) -> MonitorResult<RgbaImage> {
    let client = Client::builder()
        .timeout(LOGO_TIMEOUT)
        .build()
        .map_err(|e| MonitorError::Image(format!("logo client: {}", e)))?;

    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| MonitorError::Image(format!("logo download: {}", e)))?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| MonitorError::Image(format!("logo download: {}", e)))?;

    decode_logo(&bytes)
}

/// The configured logo, or `None` (badge fallback) when unset or unavailable.
pub async fn load_logo(url: Option<&str>) -> Option<RgbaImage> {
    let url = url?;
    match fetch_logo(url).await {
        Ok(logo) => {
            info!(url, width = logo.width(), height = logo.height(), "Loaded attribution logo");
            Some(logo)
        }
        Err(e) => {
            warn!(url, error = %e, "Attribution logo unavailable, using badge");
            None
        }
    }
}
