//! Remote tile server access.
//!
//! ```ignore
//! use slippycache::provider::{ReqwestClient, RequestPacer, TileProvider, UrlTemplate};
//!
//! let client = Arc::new(ReqwestClient::new(Duration::from_secs(10), "MyMapApp/1.0")?);
//! let template = UrlTemplate::parse("https://tile.openstreetmap.org/{z}/{x}/{y}.png")?;
//! let provider = TileProvider::new(client, template, "osm", timeout, Arc::new(RequestPacer::new(delay)));
//! let png = provider.download(&TileCoord::new(15, 16372, 10896)).await?;
//! ```

mod http;
mod pacer;
mod template;
mod tile;
mod types;

pub use http::{HttpClient, ReqwestClient};
pub use pacer::RequestPacer;
pub use template::UrlTemplate;
pub use tile::TileProvider;
pub use types::{BoxFuture, ProviderError};

#[cfg(test)]
pub use http::tests::MockHttpClient;
