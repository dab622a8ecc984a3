//! Bounded concurrency gates for tile downloads.
//!
//! The cache runs two independent gates: a small one for on-demand
//! requests and a separately sized one for prefetch, so a long prefetch
//! run never holds the slots an interactive request needs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::TileCacheError;

/// Label of the on-demand gate.
pub const ON_DEMAND_GATE: &str = "on_demand";

/// Label of the prefetch gate.
pub const PREFETCH_GATE: &str = "prefetch";

/// Counting semaphore with in-flight and peak accounting.
#[derive(Debug)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    max_permits: usize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    label: String,
}

impl ConcurrencyGate {
    /// Creates a gate admitting `max_concurrent` holders (at least one).
    pub fn new(max_concurrent: usize, label: impl Into<String>) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_permits: max_concurrent,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            label: label.into(),
        }
    }

    /// Waits for a slot. The slot is released when the permit drops.
    pub async fn acquire(&self) -> Result<GatePermit<'_>, TileCacheError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| TileCacheError::GateClosed(self.label.clone()))?;

        let current = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::Relaxed);

        Ok(GatePermit {
            _permit: permit,
            in_flight: &self.in_flight,
        })
    }

    /// Stops admitting new holders; pending and future waiters fail.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_permits
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Highest number of simultaneous holders observed.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::Relaxed)
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// A held slot of a [`ConcurrencyGate`].
pub struct GatePermit<'a> {
    _permit: OwnedSemaphorePermit,
    in_flight: &'a AtomicUsize,
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_gate() {
        let gate = ConcurrencyGate::new(2, ON_DEMAND_GATE);
        assert_eq!(gate.max_concurrent(), 2);
        assert_eq!(gate.available_permits(), 2);
        assert_eq!(gate.in_flight(), 0);
        assert_eq!(gate.label(), "on_demand");
    }

    #[test]
    fn test_zero_is_raised_to_one() {
        let gate = ConcurrencyGate::new(0, "test");
        assert_eq!(gate.max_concurrent(), 1);
    }

    #[tokio::test]
    async fn test_permits_release_on_drop() {
        let gate = ConcurrencyGate::new(2, "test");

        {
            let _p1 = gate.acquire().await.unwrap();
            let _p2 = gate.acquire().await.unwrap();
            assert_eq!(gate.available_permits(), 0);
            assert_eq!(gate.in_flight(), 2);
        }

        assert_eq!(gate.available_permits(), 2);
        assert_eq!(gate.in_flight(), 0);
        assert_eq!(gate.peak_in_flight(), 2);
    }

    #[tokio::test]
    async fn test_closed_gate_fails() {
        let gate = ConcurrencyGate::new(1, PREFETCH_GATE);
        gate.close();

        let result = gate.acquire().await;
        assert!(matches!(result, Err(TileCacheError::GateClosed(label)) if label == "prefetch"));
    }

    #[tokio::test]
    async fn test_gate_blocks_when_full() {
        let gate = Arc::new(ConcurrencyGate::new(1, "test"));
        let held = gate.acquire().await.unwrap();

        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move {
                let _permit = gate.acquire().await.unwrap();
            })
        };

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(held);
        waiter.await.unwrap();
        assert_eq!(gate.in_flight(), 0);
    }
}
