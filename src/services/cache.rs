//! In-memory dataset cache keyed by period
//!
//! Each period owns a once-cell, so concurrent resolutions of the same
//! uncached period share one fetch. A period is written once and stays
//! until it is explicitly invalidated.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::types::{Dataset, Period, Result};

type Slot = Arc<OnceCell<Arc<Dataset>>>;

#[derive(Default)]
pub struct DatasetCache {
    slots: Mutex<HashMap<Period, Slot>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, period: Period) -> Option<Arc<Dataset>> {
        self.lock().get(&period).and_then(|slot| slot.get().cloned())
    }

    /// Store `dataset` for `period`. Returns false (and keeps the existing
    /// value) if the period is already populated or being fetched.
    pub fn put(&self, period: Period, dataset: Arc<Dataset>) -> bool {
        let stored = self.slot(period).set(dataset).is_ok();
        debug!(%period, stored, "cache put");
        stored
    }

    /// Drop the cached dataset for `period`. A fetch already in flight
    /// still completes for its callers but is not kept.
    pub fn invalidate(&self, period: Period) -> bool {
        let removed = self
            .lock()
            .remove(&period)
            .is_some_and(|slot| slot.initialized());
        debug!(%period, removed, "cache invalidate");
        removed
    }

    pub fn invalidate_all(&self) {
        let mut slots = self.lock();
        debug!(count = slots.len(), "cache invalidate all");
        slots.clear();
    }

    /// Return the cached dataset, or run `fetch` to populate it.
    ///
    /// Concurrent callers for the same period wait on the first caller's
    /// fetch. A failed fetch leaves the period empty, so the next waiter
    /// (or a later call) retries.
    pub async fn get_or_fetch<F, Fut>(&self, period: Period, fetch: F) -> Result<Arc<Dataset>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<Dataset>>>,
    {
        let slot = self.slot(period);
        slot.get_or_try_init(fetch).await.cloned()
    }

    /// Number of populated periods
    pub fn len(&self) -> usize {
        self.lock().values().filter(|s| s.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Populated periods, ascending
    pub fn periods(&self) -> Vec<Period> {
        let mut periods: Vec<Period> = self
            .lock()
            .iter()
            .filter(|(_, s)| s.initialized())
            .map(|(p, _)| *p)
            .collect();
        periods.sort();
        periods
    }

    fn slot(&self, period: Period) -> Slot {
        Arc::clone(self.lock().entry(period).or_default())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Period, Slot>> {
        // A poisoned map is still structurally valid
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}
