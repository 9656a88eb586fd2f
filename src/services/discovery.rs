//! Finds which periods have data by probing the enhanced dataset files

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::DiscoveryConfig;
use crate::sources::{DataStore, SourceVariant};
use crate::types::{NanRateError, Period};

pub struct PeriodDiscovery {
    store: Arc<dyn DataStore>,
    variant: SourceVariant,
    fallback_periods: Vec<Period>,
    empty_periods: Vec<Period>,
}

impl PeriodDiscovery {
    pub fn new(store: Arc<dyn DataStore>, config: &DiscoveryConfig) -> Self {
        Self {
            store,
            variant: SourceVariant::Enhanced,
            fallback_periods: sorted(config.fallback_periods.clone()),
            empty_periods: sorted(config.empty_periods.clone()),
        }
    }

    /// Probe every period in `start..=end`; see [`PeriodDiscovery::discover_candidates`].
    pub async fn discover(&self, start: Period, end: Period) -> Vec<Period> {
        self.discover_candidates(Period::range(start, end)).await
    }

    /// Ascending periods whose dataset file exists.
    ///
    /// A failing probe counts as "absent". If every probe fails the store
    /// is treated as unreachable and the configured fallback periods are
    /// returned; if probing works but nothing exists, the empty-case
    /// periods are returned. The result is never empty as long as those
    /// lists are not.
    pub async fn discover_candidates(&self, candidates: Vec<Period>) -> Vec<Period> {
        info!(
            store = %self.store.describe(),
            candidates = candidates.len(),
            "discovering available periods"
        );

        let mut found = Vec::new();
        let mut failures = 0usize;

        for period in &candidates {
            let file_name = self.variant.file_name(*period);
            match self.store.exists(&file_name).await {
                Ok(true) => {
                    debug!(%period, file = %file_name, "period available");
                    found.push(*period);
                }
                Ok(false) => {}
                Err(e) => {
                    failures += 1;
                    let failure = NanRateError::ProbeFailure {
                        period: period.to_string(),
                        reason: e.to_string(),
                    };
                    debug!(error = %failure, "probe failed, treating as absent");
                }
            }
        }

        if !candidates.is_empty() && failures == candidates.len() {
            warn!(
                failures,
                fallback = ?self.fallback_periods,
                "all probes failed, using fallback periods"
            );
            return self.fallback_periods.clone();
        }

        if found.is_empty() {
            warn!(fallback = ?self.empty_periods, "no period data found, using defaults");
            return self.empty_periods.clone();
        }

        let found = sorted(found);
        info!(
            periods = %found.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", "),
            "available periods"
        );
        found
    }
}

fn sorted(mut periods: Vec<Period>) -> Vec<Period> {
    periods.sort();
    periods.dedup();
    periods
}
