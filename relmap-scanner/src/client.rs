use crate::document::Document;
use crate::error::{Result, ScanError};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Fetches an API path and returns the parsed document.
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<Document>;
}

/// Strips an optional `bearer ` prefix so tokens copied from CLI tools that
/// print the full header value can be used as-is.
pub fn bearer_token(raw: &str) -> &str {
    let trimmed = raw.trim();
    match trimmed.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => trimmed[7..].trim_start(),
        _ => trimmed,
    }
}

/// [`ApiClient`] over HTTP, authenticating with a bearer token.
pub struct HttpApiClient {
    client: Client,
    base_url: Url,
    token: String,
}

impl HttpApiClient {
    pub fn new(base_url: Url, token: &str) -> Result<Self> {
        Self::with_timeout(base_url, token, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(base_url: Url, token: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("Relmap/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self {
            client,
            base_url,
            token: bearer_token(token).to_string(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append `path` to the base URL, keeping any path prefix the base
    /// carries (`http://host/cf` + `/v3` is `http://host/cf/v3`).
    fn url_for(&self, path: &str) -> Result<Url> {
        if self.base_url.cannot_be_a_base() {
            return Err(ScanError::InvalidUrl(format!(
                "{}{}: base URL cannot carry a path",
                self.base_url, path
            )));
        }
        let prefix = self.base_url.path().trim_end_matches('/');
        let mut url = self.base_url.clone();
        url.set_path(&format!("{}/{}", prefix, path.trim_start_matches('/')));
        Ok(url)
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn fetch(&self, path: &str) -> Result<Document> {
        let url = self.url_for(path)?;
        debug!("Fetching {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::UnexpectedStatus {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| ScanError::MalformedDocument {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        Document::from_value(value).ok_or_else(|| ScanError::MalformedDocument {
            path: path.to_string(),
            reason: "expected a JSON object".to_string(),
        })
    }
}
