// src/client/mod.rs

//! HTTP clients for a remote recipe graph owner and product catalog
//!
//! Both clients share the same transport rules:
//! - every call has a timeout
//! - 404 means "does not exist" and yields `None`
//! - 429, 5xx, timeouts and connection failures are retried per
//!   [`RetryPolicy`] and finally surface as `UpstreamUnavailable`
//! - any other 4xx is returned immediately as `UpstreamRejected`

mod products;
mod recipes;
mod retry;

pub use products::HttpProductCatalog;
pub use recipes::HttpRecipeSource;
pub use retry::RetryPolicy;

use crate::error::{Error, Result};
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Default timeout for a single HTTP request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Transport shared by the concrete clients
pub(crate) struct JsonClient {
    client: Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl JsonClient {
    pub(crate) fn new(base_url: &str, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to create HTTP client: {e}")))?;
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::ConfigError(format!("Invalid base URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::ConfigError(format!(
                "Base URL '{base_url}' cannot carry a path"
            )));
        }

        Ok(Self {
            client,
            base_url,
            retry,
        })
    }

    /// Append `segments` to the base URL, percent-encoding each one
    ///
    /// A segment never spans more than one path component: `/`, `?` and `#`
    /// inside an id are escaped.
    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                Error::ConfigError(format!("Base URL '{}' cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET the path built from `segments` and decode a JSON body, retrying
    /// transient failures
    pub(crate) fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<Option<T>> {
        let url = self.url(segments)?;
        self.retry.run(&format!("GET {url}"), |attempt| {
            debug!("GET {} (attempt {})", url, attempt);
            let response = self
                .client
                .get(url.clone())
                .send()
                .map_err(|e| Error::UpstreamUnavailable(format!("{url}: {e}")))?;

            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                return Err(Error::UpstreamUnavailable(format!("HTTP {status} from {url}")));
            }
            if !status.is_success() {
                let message = response.text().unwrap_or_default();
                return Err(Error::UpstreamRejected {
                    status: status.as_u16(),
                    message: truncate(&message, 200),
                });
            }

            response
                .json::<T>()
                .map(Some)
                .map_err(|e| Error::Internal(format!("Invalid response from {url}: {e}")))
        })
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
