//! Forwarding of accepted deliveries to a secondary endpoint.

use anyhow::Context as _;
use gitops_gateway_core::BufferedRequest;
use http::HeaderValue;
use tracing::{debug, instrument};

use crate::errors::ConfigError;

/// Header the originating request id is stamped on.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP_HEADERS: [&str; 10] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

/// Replays a buffered delivery against a fixed URL.
///
/// The copy keeps the original method, headers and body bytes, so a signed
/// delivery still verifies at the mirror target.
#[derive(Debug, Clone)]
pub struct RequestMirror {
    client: reqwest::Client,
    target: reqwest::Url,
}

impl RequestMirror {
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] if `target` is not an absolute URL.
    pub fn new(target: &str) -> Result<Self, ConfigError> {
        Self::with_client(reqwest::Client::new(), target)
    }

    pub fn with_client(client: reqwest::Client, target: &str) -> Result<Self, ConfigError> {
        let target = reqwest::Url::parse(target)
            .map_err(|e| ConfigError::invalid("webhooks.mirror_url", e.to_string()))?;
        Ok(Self { client, target })
    }

    pub fn target(&self) -> &reqwest::Url {
        &self.target
    }

    /// Send `request` to the mirror target.
    ///
    /// # Errors
    ///
    /// Fails if the target cannot be reached or answers with a non-success
    /// status.
    #[instrument(skip(self, request), fields(target = %self.target))]
    pub async fn forward(&self, request: &BufferedRequest) -> anyhow::Result<()> {
        let mut headers = request.headers().clone();
        for name in HOP_BY_HOP_HEADERS {
            headers.remove(name);
        }
        let request_id = request
            .context_fields()
            .and_then(|fields| fields.request_id.as_deref());
        if let Some(value) = request_id.and_then(|id| HeaderValue::from_str(id).ok()) {
            headers.insert(REQUEST_ID_HEADER, value);
        }

        let response = self
            .client
            .request(request.method().clone(), self.target.clone())
            .headers(headers)
            .body(request.body().clone())
            .send()
            .await
            .context("failed to reach mirror target")?;
        let status = response.status();
        response
            .error_for_status()
            .with_context(|| format!("mirror target answered {status}"))?;

        debug!(status = %status, "Delivery mirrored");
        Ok(())
    }
}

#[cfg(test)]
#[path = "mirror_tests.rs"]
mod tests;
