//! Resolves one period's dataset through the cache and the source chain

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::services::consistency::{ConsistencyCheck, ConsistencyIssue};
use crate::services::DatasetCache;
use crate::sources::SourceChain;
use crate::types::{Dataset, NanRateError, Period, Result};

/// Cache-first resolver
///
/// Order: cache => each source in the chain. The first source that
/// returns a valid dataset wins and is cached under the period.
pub struct DatasetResolver {
    cache: Arc<DatasetCache>,
    chain: SourceChain,
    checks: Vec<Box<dyn ConsistencyCheck>>,
    /// Periods whose cached dataset came from a last-resort source
    stand_ins: Mutex<HashSet<Period>>,
}

impl DatasetResolver {
    pub fn new(cache: Arc<DatasetCache>, chain: SourceChain) -> Self {
        Self {
            cache,
            chain,
            checks: Vec::new(),
            stand_ins: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_checks(mut self, checks: Vec<Box<dyn ConsistencyCheck>>) -> Self {
        self.checks = checks;
        self
    }

    pub fn cache(&self) -> &Arc<DatasetCache> {
        &self.cache
    }

    /// Fails with `DataUnavailable` only when every source is exhausted.
    pub async fn resolve(&self, period: Period) -> Result<Arc<Dataset>> {
        if let Some(dataset) = self.cache.get(period) {
            debug!(%period, "cache hit");
            return Ok(dataset);
        }

        self.cache
            .get_or_fetch(period, || self.fetch_from_sources(period))
            .await
    }

    /// Whether the last fetch for `period` was answered by a last-resort
    /// source rather than data of its own
    pub fn served_by_default(&self, period: Period) -> bool {
        self.stand_ins().contains(&period)
    }

    /// Run the configured consistency checks; issues are logged and returned.
    pub fn check(&self, period: Period, dataset: &Dataset) -> Vec<ConsistencyIssue> {
        let issues: Vec<ConsistencyIssue> = self
            .checks
            .iter()
            .flat_map(|c| c.check(period, dataset))
            .collect();
        for issue in &issues {
            warn!(%issue, "dataset consistency mismatch");
        }
        issues
    }

    async fn fetch_from_sources(&self, period: Period) -> Result<Arc<Dataset>> {
        for source in self.chain.sources() {
            match source.fetch(period).await {
                Ok(dataset) => {
                    info!(
                        %period,
                        source = source.name(),
                        total_records = dataset.total_records,
                        weeks = ?dataset.week_labels(),
                        "dataset resolved"
                    );
                    if source.is_last_resort() {
                        self.stand_ins().insert(period);
                    } else {
                        self.stand_ins().remove(&period);
                        self.check(period, &dataset);
                    }
                    return Ok(Arc::new(dataset));
                }
                Err(e @ NanRateError::SourceNotFound { .. }) => {
                    debug!(%period, source = source.name(), reason = %e, "source miss");
                }
                Err(e) => {
                    warn!(%period, source = source.name(), error = %e, "source failed, trying next");
                }
            }
        }

        warn!(%period, "every source exhausted");
        Err(NanRateError::DataUnavailable(period.to_string()))
    }

    fn stand_ins(&self) -> MutexGuard<'_, HashSet<Period>> {
        self.stand_ins.lock().unwrap_or_else(|e| e.into_inner())
    }
}
