//! CLI command handlers.

pub mod cache;
pub mod fetch;
pub mod locate;
pub mod prefetch;
