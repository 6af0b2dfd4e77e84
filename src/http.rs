//! HTTP source for raw track files.
//!
//! Track references are resolved against a base URL (absolute `http(s)://`
//! references are used as-is). Every failure, including non-success status
//! codes, is returned as [`MapError::Fetch`]; there is no retry or backoff.

use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use log::{debug, warn};
use reqwest::Client;

use crate::error::{MapError, Result};
use crate::store::TrackSource;

const REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_IDLE_PER_HOST: usize = 8;

/// Fetches raw track bytes over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTrackSource {
    client: Client,
    base_url: String,
}

impl HttpTrackSource {
    /// Create a source resolving references against `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| MapError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Full URL for a track reference.
    pub fn resolve_url(&self, reference: &str) -> String {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            reference.to_string()
        } else {
            format!("{}/{}", self.base_url, reference.trim_start_matches('/'))
        }
    }

    async fn fetch(client: Client, url: String, reference: String) -> Result<Vec<u8>> {
        debug!("[HttpTrackSource] GET {}", url);

        let response = client.get(&url).send().await.map_err(|e| {
            warn!("[HttpTrackSource] Request for '{}' failed: {}", reference, e);
            MapError::fetch(&reference, e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("[HttpTrackSource] '{}' returned HTTP {}", reference, status);
            return Err(MapError::Fetch {
                reference,
                message: format!("HTTP {}", status),
                status_code: Some(status.as_u16()),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| MapError::fetch(&reference, format!("Body read failed: {}", e)))?;
        Ok(body.to_vec())
    }
}

impl TrackSource for HttpTrackSource {
    fn fetch_raw_track(&self, reference: &str) -> BoxFuture<'static, Result<Vec<u8>>> {
        let url = self.resolve_url(reference);
        Self::fetch(self.client.clone(), url, reference.to_string()).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let source = HttpTrackSource::new("https://tracks.example.org/v1/").unwrap();
        assert_eq!(
            source.resolve_url("routes/ben-nevis.gpx"),
            "https://tracks.example.org/v1/routes/ben-nevis.gpx"
        );
        assert_eq!(
            source.resolve_url("/routes/ben-nevis.gpx"),
            "https://tracks.example.org/v1/routes/ben-nevis.gpx"
        );
        assert_eq!(
            source.resolve_url("https://cdn.example.org/a.geojson"),
            "https://cdn.example.org/a.geojson"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_fetch_error() {
        let source = HttpTrackSource::new("http://127.0.0.1:9").unwrap();
        let result = source.fetch_raw_track("missing.gpx").await;
        assert!(matches!(result, Err(MapError::Fetch { .. })));
    }
}
