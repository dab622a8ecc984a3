//! slippycache - device-local slippy-map tile cache
//!
//! Serves raster map tiles from local storage, downloads missing tiles
//! from a templated tile server under bounded concurrency, keeps the live
//! cache within a byte budget by least-recently-used eviction, and
//! prefetches tile neighborhoods across zoom levels for offline use.
//!
//! # Modules
//!
//! - [`coord`]: lat/lon to tile projection and tile address validation
//! - [`store`]: durable tile metadata (SQLite)
//! - [`provider`]: HTTP tile downloads
//! - [`cache`]: get-or-fetch coordination and eviction
//! - [`prefetch`]: multi-zoom neighborhood prefetch
//! - [`app`]: wiring and lifecycle

pub mod app;
pub mod cache;
pub mod config;
pub mod coord;
pub mod error;
pub mod logging;
pub mod prefetch;
pub mod provider;
pub mod store;

pub use error::TileCacheError;
