//! OAuth2 client-credentials session for the Copernicus Data Space.
//!
//! One session is shared (by `Arc`) between the catalog client and the
//! raster fetcher. The bearer token is fetched lazily on first use, cached,
//! and refreshed once it is within a minute of expiry.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use volcano_common::{MonitorError, MonitorResult};

/// Environment variable holding the OAuth client id.
pub const CLIENT_ID_VAR: &str = "SH_CLIENT_ID";
/// Environment variable holding the OAuth client secret.
pub const CLIENT_SECRET_VAR: &str = "SH_CLIENT_SECRET";

/// Tokens are treated as expired this long before the server says so.
const EXPIRY_MARGIN_SECS: i64 = 60;
/// Lifetime assumed when the token response omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 300;
const TOKEN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Cached bearer token plus the credentials used to refresh it.
pub struct AuthSession {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    cached: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl AuthSession {
    pub fn new(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> MonitorResult<Self> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        if client_id.trim().is_empty() || client_secret.trim().is_empty() {
            return Err(MonitorError::Credential(
                "client id and secret must both be set".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(TOKEN_TIMEOUT)
            .build()
            .map_err(|e| MonitorError::Credential(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            token_url: token_url.into(),
            client_id,
            client_secret,
            cached: Mutex::new(None),
        })
    }

    /// Read `SH_CLIENT_ID` / `SH_CLIENT_SECRET` from the environment.
    pub fn from_env(token_url: impl Into<String>) -> MonitorResult<Self> {
        let id = std::env::var(CLIENT_ID_VAR).unwrap_or_default();
        let secret = std::env::var(CLIENT_SECRET_VAR).unwrap_or_default();
        if id.trim().is_empty() || secret.trim().is_empty() {
            return Err(MonitorError::Credential(format!(
                "{} and {} must be set",
                CLIENT_ID_VAR, CLIENT_SECRET_VAR
            )));
        }
        Self::new(token_url, id, secret)
    }

    /// A valid bearer token, fetching a new one if none is cached or it expired.
    pub async fn bearer_token(&self) -> MonitorResult<String> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref() {
            if token.expires_at > now {
                return Ok(token.token.clone());
            }
            debug!(expired_at = %token.expires_at, "Bearer token expired, refreshing");
        }

        let fresh = self.request_token().await?;
        let expires_at = token_expiry(now, fresh.expires_in);
        info!(expires_at = %expires_at, "Obtained bearer token");
        let token = fresh.access_token.clone();
        *cached = Some(CachedToken {
            token: fresh.access_token,
            expires_at,
        });
        Ok(token)
    }

    #[instrument(skip(self), fields(url = %self.token_url))]
    async fn request_token(&self) -> MonitorResult<TokenResponse> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| MonitorError::Credential(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MonitorError::Credential(format!(
                "token endpoint returned {}: {}",
                status,
                truncate(&body, 200)
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| MonitorError::Credential(format!("malformed token response: {}", e)))?;
        if token.access_token.is_empty() {
            return Err(MonitorError::Credential("empty access token".to_string()));
        }
        Ok(token)
    }
}

/// Instant after which a token issued at `now` must be refreshed.
fn token_expiry(now: DateTime<Utc>, expires_in: Option<i64>) -> DateTime<Utc> {
    let lifetime = expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
    now + chrono::Duration::seconds(lifetime - EXPIRY_MARGIN_SECS)
}

pub(crate) fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_missing_credentials_are_fatal() {
        let err = AuthSession::new("http://localhost/token", "", "secret").unwrap_err();
        assert!(err.is_fatal());
        let err = AuthSession::new("http://localhost/token", "id", "  ").unwrap_err();
        assert!(matches!(err, MonitorError::Credential(_)));
    }

    #[test]
    fn test_expiry_keeps_safety_margin() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(token_expiry(now, Some(3600)), now + chrono::Duration::seconds(3540));
        assert_eq!(token_expiry(now, None), now + chrono::Duration::seconds(240));
    }

    #[test]
    fn test_debug_hides_secret() {
        let session = AuthSession::new("http://localhost/token", "id", "hunter2").unwrap();
        assert!(!format!("{:?}", session).contains("hunter2"));
    }

    #[test]
    fn test_unreachable_token_endpoint_is_credential_error() {
        let session = AuthSession::new("http://127.0.0.1:9/token", "id", "secret").unwrap();
        let err = tokio_test::assert_err!(tokio_test::block_on(session.bearer_token()));
        assert!(matches!(err, MonitorError::Credential(_)));
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("ok", 10), "ok");
    }
}
