//! Tile downloads from a templated tile server.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use super::http::HttpClient;
use super::pacer::RequestPacer;
use super::template::UrlTemplate;
use super::types::ProviderError;
use crate::coord::TileCoord;

/// Downloads raster tiles by substituting the tile address into a URL
/// template and issuing a paced, time-bounded GET.
pub struct TileProvider {
    client: Arc<dyn HttpClient>,
    template: UrlTemplate,
    source: String,
    timeout: Duration,
    pacer: Arc<RequestPacer>,
}

impl TileProvider {
    pub fn new(
        client: Arc<dyn HttpClient>,
        template: UrlTemplate,
        source: impl Into<String>,
        timeout: Duration,
        pacer: Arc<RequestPacer>,
    ) -> Self {
        Self {
            client,
            template,
            source: source.into(),
            timeout,
            pacer,
        }
    }

    /// Provider tag recorded with each cached tile.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn url_for(&self, tile: &TileCoord) -> String {
        self.template.render(tile)
    }

    /// Downloads one tile.
    ///
    /// A request that exceeds the timeout fails with
    /// [`ProviderError::Timeout`]; an empty body is treated as a failure.
    pub async fn download(&self, tile: &TileCoord) -> Result<Bytes, ProviderError> {
        let url = self.url_for(tile);
        self.pacer.wait().await;

        debug!(tile = %tile, url = %url, "Downloading tile");

        let body = match tokio::time::timeout(self.timeout, self.client.get(&url)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ProviderError::Timeout {
                    url,
                    timeout: self.timeout,
                })
            }
        };

        if body.is_empty() {
            return Err(ProviderError::EmptyResponse(url));
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockHttpClient;

    fn provider(client: Arc<MockHttpClient>, timeout: Duration) -> TileProvider {
        TileProvider::new(
            client,
            UrlTemplate::parse("https://tile.example.org/{z}/{x}/{y}.png").unwrap(),
            "osm",
            timeout,
            Arc::new(RequestPacer::new(Duration::ZERO)),
        )
    }

    #[tokio::test]
    async fn test_download_substitutes_template() {
        let client = Arc::new(MockHttpClient::ok(b"png"));
        let provider = provider(client.clone(), Duration::from_secs(10));

        let body = provider.download(&TileCoord::new(15, 16372, 10896)).await.unwrap();

        assert_eq!(body, Bytes::from_static(b"png"));
        assert_eq!(
            client.urls(),
            vec!["https://tile.example.org/15/16372/10896.png".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_times_out() {
        let client = Arc::new(MockHttpClient::ok(b"png").with_delay(Duration::from_secs(60)));
        let provider = provider(client, Duration::from_secs(10));

        let err = provider.download(&TileCoord::new(1, 0, 0)).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_empty_body_is_failure() {
        let client = Arc::new(MockHttpClient::ok(b""));
        let provider = provider(client, Duration::from_secs(10));

        let err = provider.download(&TileCoord::new(1, 0, 0)).await.unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse(_)));
    }

    #[tokio::test]
    async fn test_status_error_propagates() {
        let client = Arc::new(MockHttpClient::failing(ProviderError::Status {
            status: 404,
            url: "u".to_string(),
        }));
        let provider = provider(client, Duration::from_secs(10));

        let err = provider.download(&TileCoord::new(1, 0, 0)).await.unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 404, .. }));
    }
}
