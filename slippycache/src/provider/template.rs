//! Tile server URL templates.

use crate::config::{validate_url_template, ConfigError};
use crate::coord::TileCoord;

/// A URL template with `{z}`, `{x}` and `{y}` placeholders.
///
/// ```
/// use slippycache::coord::TileCoord;
/// use slippycache::provider::UrlTemplate;
///
/// let template = UrlTemplate::parse("https://tile.example.org/{z}/{x}/{y}.png").unwrap();
/// assert_eq!(
///     template.render(&TileCoord::new(15, 16372, 10896)),
///     "https://tile.example.org/15/16372/10896.png"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    template: String,
}

impl UrlTemplate {
    /// Validates and wraps a template string.
    pub fn parse(template: impl Into<String>) -> Result<Self, ConfigError> {
        let template = template.into();
        validate_url_template(&template)?;
        Ok(Self { template })
    }

    /// Substitutes the tile address as decimal integers.
    pub fn render(&self, tile: &TileCoord) -> String {
        self.template
            .replace("{z}", &tile.zoom.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }
}
