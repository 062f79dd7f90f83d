//! Thin JSON-over-HTTP helper shared by the bundled adapters.

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::{Config, ProviderSettings};
use crate::error::{ProviderError, ProviderResult};

const USER_AGENT: &str = concat!("bookmeta/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client bound to one provider, with the provider's timeout applied to
/// every request.
#[derive(Debug, Clone)]
pub(crate) struct HttpClient {
    client: reqwest::Client,
    provider: &'static str,
    timeout: Duration,
}

impl HttpClient {
    pub(crate) fn new(provider: &'static str, settings: &ProviderSettings) -> ProviderResult<Self> {
        let timeout = settings.timeout().unwrap_or(DEFAULT_TIMEOUT);
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            provider,
            timeout,
        })
    }

    /// Per-request timeout applied by the underlying client.
    pub(crate) fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `url` and decode the JSON body.
    ///
    /// A 404 is reported as `Ok(None)`: the catalog has no such record.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> ProviderResult<Option<T>> {
        debug!(provider = self.provider, url = %url, "Querying catalog");

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        match status {
            StatusCode::NOT_FOUND => return Ok(None),
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(ProviderError::RateLimited(self.provider.to_string()))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let body = response.text().await.unwrap_or_default();
                return Err(ProviderError::Authentication(format!("HTTP {status}: {body}")));
            }
            s if !s.is_success() => {
                return Err(ProviderError::Network(format!("HTTP {status}")));
            }
            _ => {}
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        Ok(Some(serde_json::from_slice(&body)?))
    }

    /// Plain reachability check: any HTTP answer below 500 counts as reachable.
    pub(crate) async fn ping(&self, url: &str, query: &[(&str, String)]) -> bool {
        match self.client.get(url).query(query).send().await {
            Ok(response) => !response.status().is_server_error(),
            Err(e) => {
                debug!(provider = self.provider, error = %e, "Connection test failed");
                false
            }
        }
    }

    fn map_transport_error(&self, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout(self.timeout.as_millis() as u64)
        } else {
            err.into()
        }
    }
}

/// Trim a trailing slash so paths can be appended with `format!`.
pub(crate) fn base_url(configured: Option<&str>, default: &str) -> String {
    configured
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}

/// Force `https` on catalog image links.
pub(crate) fn secure_url(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}
