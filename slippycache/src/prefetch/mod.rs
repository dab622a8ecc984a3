//! Multi-zoom neighborhood prefetch.
//!
//! # Architecture
//!
//! ```text
//! PrefetchScheduler (orchestrator)
//!     │
//!     ├─► plan.rs: zoom priority + tile grid
//!     │     └─ zoom_order(), PrefetchPlan
//!     │
//!     ├─► config.rs: request and event types
//!     │     └─ PrefetchRequest, PrefetchProgress, PrefetchSummary
//!     │
//!     └─► FetchCoordinator::fetch_with_gate (through the prefetch gate)
//! ```
//!
//! # Example
//!
//! ```ignore
//! let scheduler = PrefetchScheduler::new(coordinator, 4);
//! let request = PrefetchRequest::new(51.5074, -0.1278, 15);
//!
//! let (progress_tx, mut progress_rx) = mpsc::channel(32);
//! let summary = scheduler.run(&request, progress_tx, cancellation).await?;
//! ```

mod config;
mod plan;
mod scheduler;

pub use config::{PrefetchProgress, PrefetchRequest, PrefetchSummary, DEFAULT_PROGRESS_INTERVAL};
pub use plan::{zoom_order, PrefetchPlan};
pub use scheduler::PrefetchScheduler;
