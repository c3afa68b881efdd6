//! Authenticated HTTP client for the firewall-management control plane
//!
//! `ControlPlaneClient` wraps a `reqwest::Client`, a base URL and a bearer
//! token. It is cheap to clone; the per-resource handlers in
//! [`api`](crate::api) each hold their own clone.

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::{CoreError, Result, TransportError};

/// User agent string for msspctl HTTP requests
const MSSPCTL_USER_AGENT: &str = concat!("msspctl/", env!("CARGO_PKG_VERSION"));

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Resolve the API base URL for a portal or tenant region
///
/// `SCALE` and `STAGING` are special-cased; every other region maps to
/// `https://api.<region>.security.cisco.com/firewall`.
pub fn base_url_for_region(region: &str) -> String {
    match region.to_ascii_uppercase().as_str() {
        "SCALE" => "https://scale.manage.security.cisco.com".to_string(),
        "STAGING" => "https://api.int.security.cisco.com/firewall".to_string(),
        _ => format!(
            "https://api.{}.security.cisco.com/firewall",
            region.to_ascii_lowercase()
        ),
    }
}

/// Client for the control-plane REST API
#[derive(Clone)]
pub struct ControlPlaneClient {
    http: Client,
    base_url: String,
    api_token: String,
}

impl std::fmt::Debug for ControlPlaneClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlPlaneClient")
            .field("base_url", &self.base_url)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

impl ControlPlaneClient {
    /// Create a client for `base_url`
    ///
    /// Fails with [`CoreError::Config`] if the URL does not parse or the
    /// token is empty.
    pub fn new(base_url: &str, api_token: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(CoreError::Config("API token is empty".to_string()));
        }

        let parsed = Url::parse(base_url)
            .map_err(|e| CoreError::Config(format!("Invalid base URL '{}': {}", base_url, e)))?;

        let http = Client::builder()
            .user_agent(MSSPCTL_USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CoreError::Config(format!("Failed to build HTTP client: {}", e)))?;

        debug!("Created control-plane client for {}", parsed);
        Ok(Self {
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            api_token,
        })
    }

    /// Create a client for a named region (see [`base_url_for_region`])
    pub fn for_region(region: &str, api_token: impl Into<String>) -> Result<Self> {
        Self::new(&base_url_for_region(region), api_token)
    }

    /// A client for the same endpoint that authenticates with another token
    pub fn with_token(&self, api_token: impl Into<String>) -> Result<Self> {
        Self::new(&self.base_url, api_token)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> std::result::Result<T, TransportError> {
        self.send::<(), T>(Method::GET, path, None).await
    }

    pub(crate) async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> std::result::Result<T, TransportError> {
        self.send(Method::POST, path, Some(body)).await
    }

    async fn send<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> std::result::Result<T, TransportError> {
        let url = format!("{}{}", self.base_url, path);
        trace!("{} {}", method, url);

        let mut request = self
            .http
            .request(method, &url)
            .bearer_auth(&self.api_token)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        trace!("Response {}: {}", status, text);

        if status.is_success() {
            return serde_json::from_str(&text).map_err(|e| {
                TransportError::Decode(format!("{} (from {})", e, url))
            });
        }

        let message = error_message(&text).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TransportError::Unauthorized {
                status: status.as_u16(),
                message,
            },
            _ => TransportError::Http {
                status: status.as_u16(),
                message,
            },
        })
    }
}

/// Pull a human-readable message out of an error body, if there is one
fn error_message(body: &str) -> Option<String> {
    if body.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => ["message", "errorMessage", "error", "description"]
            .iter()
            .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
            .map(str::to_string)
            .or_else(|| Some(value.to_string())),
        Err(_) => Some(body.trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_base_urls() {
        assert_eq!(
            base_url_for_region("SCALE"),
            "https://scale.manage.security.cisco.com"
        );
        assert_eq!(
            base_url_for_region("STAGING"),
            "https://api.int.security.cisco.com/firewall"
        );
        assert_eq!(
            base_url_for_region("US"),
            "https://api.us.security.cisco.com/firewall"
        );
        assert_eq!(
            base_url_for_region("eu"),
            "https://api.eu.security.cisco.com/firewall"
        );
    }

    #[test]
    fn test_new_rejects_bad_input() {
        assert!(matches!(
            ControlPlaneClient::new("not a url", "token"),
            Err(CoreError::Config(_))
        ));
        assert!(matches!(
            ControlPlaneClient::new("https://example.com", "  "),
            Err(CoreError::Config(_))
        ));
    }

    #[test]
    fn test_with_token_keeps_endpoint() {
        let msp = ControlPlaneClient::new("https://example.com/firewall", "msp-token").unwrap();
        let tenant = msp.with_token("tenant-token").unwrap();
        assert_eq!(tenant.base_url(), msp.base_url());
        assert!(msp.with_token("").is_err());
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = ControlPlaneClient::new("https://example.com/firewall/", "t").unwrap();
        assert_eq!(client.base_url(), "https://example.com/firewall");
        assert!(!format!("{:?}", client).contains("\"t\""));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"message":"tenant not found"}"#).as_deref(),
            Some("tenant not found")
        );
        assert_eq!(
            error_message(r#"{"errorMessage":"bad token"}"#).as_deref(),
            Some("bad token")
        );
        assert_eq!(error_message("gateway exploded").as_deref(), Some("gateway exploded"));
        assert_eq!(error_message(""), None);
    }
}
