//! Application bootstrap and lifecycle management.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      TileCacheApp                        │
//! │                                                          │
//! │  SqliteTileStore ◄──── EvictionManager ◄── daemon task   │
//! │        ▲                     ▲                           │
//! │        │                     │                           │
//! │  FetchCoordinator ───────────┘   (on-demand gate)        │
//! │        ▲                                                 │
//! │        │                                                 │
//! │  PrefetchScheduler               (prefetch gate)         │
//! └──────────────────────────────────────────────────────────┘
//! ```

mod bootstrap;
mod error;

pub use bootstrap::TileCacheApp;
pub use error::AppError;
