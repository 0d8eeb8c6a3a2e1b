//! Raster rendering through the Sentinel Hub Process API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDate;
use image::ImageFormat;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use volcano_common::config::EndpointConfig;
use volcano_common::time::DATE_FORMAT;
use volcano_common::{BandComposite, CompositeProfile, MonitorError, MonitorResult, Site};

use crate::auth::{truncate, AuthSession};

const COLLECTION: &str = "sentinel-2-l2a";
const CRS84: &str = "http://www.opengis.net/def/crs/OGC/1.3/CRS84";
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Renders one composite of one acquisition day as PNG bytes.
#[async_trait]
pub trait RasterFetcher: Send + Sync {
    async fn fetch(
        &self,
        site: &Site,
        date: NaiveDate,
        profile: &CompositeProfile,
    ) -> MonitorResult<Bytes>;
}

/// JSON body of a Process API request for `profile` over `site` on `date`.
pub fn render_request(
    site: &Site,
    date: NaiveDate,
    profile: &CompositeProfile,
    max_cloud_cover: f64,
) -> Value {
    let footprint = profile.footprint(site);
    let day = date.format(DATE_FORMAT);

    json!({
        "input": {
            "bounds": {
                "bbox": footprint.bbox.to_array(),
                "properties": { "crs": CRS84 }
            },
            "data": [{
                "type": COLLECTION,
                "dataFilter": {
                    "timeRange": {
                        "from": format!("{}T00:00:00Z", day),
                        "to": format!("{}T23:59:59Z", day)
                    },
                    "maxCloudCoverage": max_cloud_cover
                }
            }]
        },
        "output": {
            "width": footprint.width_px,
            "height": footprint.height_px,
            "responses": [{
                "identifier": "default",
                "format": { "type": "image/png" }
            }]
        },
        "evalscript": profile.kind.evalscript()
    })
}

/// [`RasterFetcher`] backed by the Process API.
pub struct HttpRasterFetcher {
    client: Client,
    auth: Arc<AuthSession>,
    url: String,
    max_cloud_cover: f64,
}

impl HttpRasterFetcher {
    pub fn new(
        auth: Arc<AuthSession>,
        endpoints: &EndpointConfig,
        max_cloud_cover: f64,
    ) -> MonitorResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(endpoints.render_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| MonitorError::InvalidConfig(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            auth,
            url: endpoints.process_url.clone(),
            max_cloud_cover,
        })
    }
}

fn unavailable(
    site: &Site,
    date: NaiveDate,
    composite: BandComposite,
    message: impl Into<String>,
) -> MonitorError {
    MonitorError::RenderUnavailable {
        site: site.name.clone(),
        date: date.format(DATE_FORMAT).to_string(),
        composite: composite.to_string(),
        message: message.into(),
    }
}

/// Reject bodies that are not a decodable PNG.
fn validate_png(bytes: &[u8]) -> Result<(), String> {
    image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map(|_| ())
        .map_err(|e| format!("response is not a valid PNG: {}", e))
}

#[async_trait]
impl RasterFetcher for HttpRasterFetcher {
    #[instrument(skip(self, site, date, profile), fields(site = %site.name, date = %date, composite = %profile.kind))]
    async fn fetch(
        &self,
        site: &Site,
        date: NaiveDate,
        profile: &CompositeProfile,
    ) -> MonitorResult<Bytes> {
        let composite = profile.kind;
        let body = render_request(site, date, profile, self.max_cloud_cover);
        let token = self.auth.bearer_token().await?;

        let mut retry_count = 0;
        let response = loop {
            let result = self
                .client
                .post(&self.url)
                .bearer_auth(&token)
                .header(reqwest::header::ACCEPT, "image/png")
                .json(&body)
                .send()
                .await;

            match result {
                Ok(response) => break response,
                Err(e) if retry_count == 0 && (e.is_connect() || e.is_timeout()) => {
                    retry_count += 1;
                    warn!(error = %e, "Render request failed, retrying once");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(e) => return Err(unavailable(site, date, composite, e.to_string())),
            }
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(unavailable(
                site,
                date,
                composite,
                format!("HTTP {}: {}", status, truncate(&text, 200)),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| unavailable(site, date, composite, e.to_string()))?;
        validate_png(&bytes).map_err(|m| unavailable(site, date, composite, m))?;

        debug!(bytes = bytes.len(), "Rendered raster");
        Ok(bytes)
    }
}
