//! Configuration for the tile cache.
//!
//! [`CacheConfig`] is the plain value the cache consumes. It can be built in
//! code with the `with_*` setters or loaded from an INI file:
//!
//! ```ini
//! [cache]
//! directory = ~/.cache/slippycache
//! max_size = 500MB
//!
//! [provider]
//! url_template = https://tile.openstreetmap.org/{z}/{x}/{y}.png
//! user_agent = MyMapApp/1.0
//!
//! [download]
//! max_concurrent = 2
//! request_delay_ms = 0
//!
//! [prefetch]
//! max_concurrent = 4
//! radius = 5
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod size;

pub use defaults::*;
pub use file::{config_file_path, ConfigError};
pub use parser::validate_url_template;
pub use settings::CacheConfig;
pub use size::{format_size, parse_size, SizeParseError};
