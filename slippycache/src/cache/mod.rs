//! Tile cache: on-disk layout, get-or-fetch coordination and eviction.
//!
//! [`FetchCoordinator`] is the entry point for reading tiles. It consults
//! the metadata store, downloads missing tiles through a
//! [`ConcurrencyGate`], and hands each live-partition write to the
//! [`EvictionManager`] so the live cache stays within its byte budget.

mod connectivity;
mod eviction;
mod fetch;
mod gate;
mod inflight;
mod path;
mod stats;

pub use connectivity::{Connectivity, ConnectivityFlag};
pub use eviction::{run_eviction_daemon, EvictionManager, EvictionResult, EVICTION_TARGET_FRACTION};
pub use fetch::{FetchCoordinator, FetchOutcome};
pub use gate::{ConcurrencyGate, GatePermit, ON_DEMAND_GATE, PREFETCH_GATE};
pub use inflight::{InFlightGuard, InFlightTiles};
pub use path::{cleanup_temp_files, partition_directory, temp_path, tile_path, write_atomic};
pub use stats::{CacheStats, PartitionStats, RequestStats};
