//! Per-tile exclusion for downloads.
//!
//! Requests for the same `(partition, tile)` queue on one async lock, so
//! once the first holder has persisted the tile every later holder finds
//! it in the cache on its double-check. Entries are dropped from the table
//! as soon as the last interested request is done.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::coord::TileCoord;
use crate::store::Partition;

type TileKey = (Partition, TileCoord);

/// Table of tiles currently being fetched.
#[derive(Default)]
pub struct InFlightTiles {
    locks: Mutex<HashMap<TileKey, Arc<AsyncMutex<()>>>>,
}

impl InFlightTiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other request holds `tile`, then holds it.
    pub async fn lock(&self, partition: &Partition, tile: TileCoord) -> InFlightGuard<'_> {
        let key = (partition.clone(), tile);
        let entry = Arc::clone(self.locks.lock().entry(key.clone()).or_default());

        // Built before waiting so a dropped waiter still cleans up the entry.
        // `acquire` is declared after `held`, so it drops (releasing its
        // reference to the entry) before `held` checks the count.
        let mut held = InFlightGuard {
            owner: self,
            key,
            guard: None,
        };
        let acquire = entry.lock_owned();
        held.guard = Some(acquire.await);
        held
    }

    /// Number of tiles with at least one request holding or waiting.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive hold on one tile; released on drop.
///
/// Also dropped by a request that gave up while still waiting, in which
/// case `guard` is empty.
pub struct InFlightGuard<'a> {
    owner: &'a InFlightTiles,
    key: TileKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut locks = self.owner.locks.lock();
        if let Some(entry) = locks.get(&self.key) {
            // Only the table still references it: nobody is waiting
            if Arc::strong_count(entry) == 1 {
                locks.remove(&self.key);
            }
        }
    }
}
