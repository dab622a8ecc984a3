//! Durable tile metadata.
//!
//! [`TileMetadataStore`] is the seam the cache talks to; [`SqliteTileStore`]
//! is the on-device implementation.

mod record;
mod sqlite;
mod traits;

pub use record::{Partition, PartitionError, TileRecord};
pub use sqlite::SqliteTileStore;
pub use traits::{StoreError, TileMetadataStore};
