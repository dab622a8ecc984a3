//! HTTP client abstraction for testability

use std::time::Duration;

use bytes::Bytes;

use super::types::{BoxFuture, ProviderError};

/// Trait for asynchronous HTTP GET.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests. It is dyn-compatible so the
/// cache can hold an `Arc<dyn HttpClient>`.
pub trait HttpClient: Send + Sync {
    /// Performs an HTTP GET request.
    ///
    /// # Returns
    ///
    /// The response body, or an error for transport failures and
    /// non-success status codes.
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, ProviderError>>;
}

/// HTTP client implementation using reqwest.
///
/// Every request carries the configured `User-Agent` and is bounded by
/// the configured timeout.
#[derive(Clone, Debug)]
pub struct ReqwestClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestClient {
    /// Creates a client with the given timeout and identifying user agent.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(user_agent)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| ProviderError::ClientBuild(e.to_string()))?;

        Ok(Self { client, timeout })
    }
}

impl HttpClient for ReqwestClient {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, ProviderError>> {
        Box::pin(async move {
            let response = self.client.get(url).send().await.map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout {
                        url: url.to_string(),
                        timeout: self.timeout,
                    }
                } else {
                    ProviderError::HttpError(format!("Request failed: {}", e))
                }
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(ProviderError::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }

            response
                .bytes()
                .await
                .map_err(|e| ProviderError::HttpError(format!("Failed to read response: {}", e)))
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    /// Mock HTTP client for testing.
    ///
    /// Returns a fixed body (or error) after an optional delay and records
    /// every requested URL.
    pub struct MockHttpClient {
        pub response: Result<Bytes, ProviderError>,
        pub delay: Duration,
        calls: AtomicUsize,
        urls: Mutex<Vec<String>>,
    }

    impl MockHttpClient {
        pub fn ok(body: &'static [u8]) -> Self {
            Self::with_response(Ok(Bytes::from_static(body)))
        }

        pub fn failing(error: ProviderError) -> Self {
            Self::with_response(Err(error))
        }

        pub fn with_response(response: Result<Bytes, ProviderError>) -> Self {
            Self {
                response,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
                urls: Mutex::new(Vec::new()),
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn urls(&self) -> Vec<String> {
            self.urls.lock().clone()
        }
    }

    impl HttpClient for MockHttpClient {
        fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, ProviderError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().push(url.to_string());
            Box::pin(async move {
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                self.response.clone()
            })
        }
    }

    #[tokio::test]
    async fn test_mock_client_success() {
        let mock = MockHttpClient::ok(&[1, 2, 3, 4]);

        let result = mock.get("http://example.com").await;
        assert_eq!(result.unwrap(), Bytes::from_static(&[1, 2, 3, 4]));
        assert_eq!(mock.calls(), 1);
        assert_eq!(mock.urls(), vec!["http://example.com".to_string()]);
    }

    #[tokio::test]
    async fn test_mock_client_error() {
        let mock = MockHttpClient::failing(ProviderError::HttpError("Test error".to_string()));

        let result = mock.get("http://example.com").await;
        assert!(result.is_err());
    }

    #[test]
    fn test_reqwest_client_builds() {
        assert!(ReqwestClient::new(Duration::from_secs(10), "slippycache-test/1.0").is_ok());
    }
}
