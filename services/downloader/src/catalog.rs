//! Scene discovery against the Copernicus resto catalog.
//!
//! The HTTP client only shapes the request and decodes the feature list;
//! filtering and per-day deduplication live in [`normalize_scenes`] so they
//! can be tested without a network.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use volcano_common::config::EndpointConfig;
use volcano_common::footprint::bbox;
use volcano_common::time::{date_prefix, DATE_FORMAT};
use volcano_common::{DateRange, MonitorError, MonitorResult, Site};

use crate::auth::{truncate, AuthSession};

const PRODUCT_TYPE: &str = "S2MSI2A";
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// One acquisition day that passed the cloud-cover ceiling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneRecord {
    pub date: NaiveDate,
    pub cloud_cover: f64,
    pub sensor: String,
}

/// A catalog feature before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawScene {
    pub timestamp: Option<String>,
    pub cloud_cover: Option<f64>,
    pub platform: Option<String>,
}

/// Finds scenes over a site.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Scenes in `range` at or under `max_cloud_cover` percent, one per day,
    /// newest first.
    async fn search(
        &self,
        site: &Site,
        range: &DateRange,
        max_cloud_cover: f64,
    ) -> MonitorResult<Vec<SceneRecord>>;
}

/// Map a platform string ("sentinel-2a", "S2B", ...) to a sensor name.
pub fn sensor_from_platform(platform: Option<&str>) -> &'static str {
    let platform = platform.unwrap_or("").trim().to_ascii_uppercase();
    if platform.ends_with("2A") {
        "Sentinel-2A"
    } else if platform.ends_with("2C") {
        "Sentinel-2C"
    } else {
        "Sentinel-2B"
    }
}

/// Validate, filter and deduplicate raw catalog features.
///
/// Features without a parseable date or without a cloud cover are dropped
/// with a warning. Of several features on one day the least cloudy wins.
/// The result is sorted by date, newest first.
pub fn normalize_scenes(raw: Vec<RawScene>, max_cloud_cover: f64) -> Vec<SceneRecord> {
    let mut by_day: BTreeMap<NaiveDate, SceneRecord> = BTreeMap::new();

    for scene in raw {
        let Some(date) = scene.timestamp.as_deref().and_then(date_prefix) else {
            warn!(timestamp = ?scene.timestamp, "Dropping scene with malformed date");
            continue;
        };
        let Some(cloud_cover) = scene.cloud_cover else {
            warn!(date = %date, "Dropping scene without cloud cover");
            continue;
        };
        if cloud_cover > max_cloud_cover {
            debug!(date = %date, cloud_cover, "Scene above cloud ceiling");
            continue;
        }

        let record = SceneRecord {
            date,
            cloud_cover,
            sensor: sensor_from_platform(scene.platform.as_deref()).to_string(),
        };
        let keep_existing = by_day
            .get(&date)
            .is_some_and(|existing| existing.cloud_cover <= cloud_cover);
        if !keep_existing {
            by_day.insert(date, record);
        }
    }

    by_day.into_values().rev().collect()
}

// ============================================================================
// resto response shape
// ============================================================================

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: FeatureProperties,
}

#[derive(Debug, Default, Deserialize)]
struct FeatureProperties {
    #[serde(rename = "startDate", default)]
    start_date: Option<String>,
    #[serde(default)]
    published: Option<String>,
    #[serde(rename = "cloudCover", default)]
    cloud_cover: Option<f64>,
    #[serde(default)]
    platform: Option<String>,
}

/// Decode a resto `search.json` body into raw scenes.
pub fn parse_feature_collection(body: &str) -> Result<Vec<RawScene>, serde_json::Error> {
    let collection: FeatureCollection = serde_json::from_str(body)?;
    Ok(collection
        .features
        .into_iter()
        .map(|f| RawScene {
            timestamp: f.properties.start_date.or(f.properties.published),
            cloud_cover: f.properties.cloud_cover,
            platform: f.properties.platform,
        })
        .collect())
}

/// Query parameters for one catalog search.
pub fn search_params(
    site: &Site,
    range: &DateRange,
    max_cloud_cover: f64,
    max_records: u32,
) -> Vec<(&'static str, String)> {
    let bounds = bbox(site.center(), site.radius_km);
    vec![
        ("box", bounds.to_query_string()),
        (
            "startDate",
            format!("{}T00:00:00Z", range.start.format(DATE_FORMAT)),
        ),
        (
            "completionDate",
            format!("{}T23:59:59Z", range.end.format(DATE_FORMAT)),
        ),
        ("maxRecords", max_records.to_string()),
        ("cloudCover", format!("[0,{}]", max_cloud_cover)),
        ("sortParam", "startDate".to_string()),
        ("sortOrder", "descending".to_string()),
        ("productType", PRODUCT_TYPE.to_string()),
    ]
}

/// [`CatalogClient`] backed by the resto HTTP API.
pub struct HttpCatalogClient {
    client: Client,
    auth: Arc<AuthSession>,
    url: String,
    max_records: u32,
}

impl HttpCatalogClient {
    pub fn new(auth: Arc<AuthSession>, endpoints: &EndpointConfig) -> MonitorResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(endpoints.catalog_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| MonitorError::InvalidConfig(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            auth,
            url: endpoints.catalog_url.clone(),
            max_records: endpoints.max_records,
        })
    }

    fn unavailable(site: &Site, message: impl Into<String>) -> MonitorError {
        MonitorError::CatalogUnavailable {
            site: site.name.clone(),
            message: message.into(),
        }
    }

    async fn get(
        &self,
        site: &Site,
        params: &[(&'static str, String)],
    ) -> MonitorResult<reqwest::Response> {
        let token = self.auth.bearer_token().await?;
        let mut retry_count = 0;
        loop {
            let result = self
                .client
                .get(&self.url)
                .bearer_auth(&token)
                .query(params)
                .send()
                .await;

            match result {
                Ok(response) => return Ok(response),
                Err(e) if retry_count == 0 && (e.is_connect() || e.is_timeout()) => {
                    retry_count += 1;
                    warn!(site = %site.name, error = %e, "Catalog request failed, retrying once");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(e) => return Err(Self::unavailable(site, e.to_string())),
            }
        }
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    #[instrument(skip(self, site), fields(site = %site.name, start = %range.start, end = %range.end))]
    async fn search(
        &self,
        site: &Site,
        range: &DateRange,
        max_cloud_cover: f64,
    ) -> MonitorResult<Vec<SceneRecord>> {
        let params = search_params(site, range, max_cloud_cover, self.max_records);
        let response = self.get(site, &params).await?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Self::unavailable(site, e.to_string()))?;
        if !status.is_success() {
            return Err(Self::unavailable(
                site,
                format!("HTTP {}: {}", status, truncate(&body, 200)),
            ));
        }

        let raw = parse_feature_collection(&body)
            .map_err(|e| Self::unavailable(site, format!("malformed response: {}", e)))?;
        let found = raw.len();
        let scenes = normalize_scenes(raw, max_cloud_cover);
        info!(found, kept = scenes.len(), "Catalog search complete");
        Ok(scenes)
    }
}
