//! Query surface for the presentation layer

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::services::consistency::checks_from_config;
use crate::services::{Aggregator, DatasetCache, DatasetResolver, PeriodDiscovery};
use crate::sources::{build_store, SourceChain};
use crate::types::{Dataset, NanRateError, Period, Result, Selection};

const EVENT_CAPACITY: usize = 16;

/// Fired once per completed `get_dataset` call
#[derive(Debug, Clone)]
pub struct LoadEvent {
    pub selection: Selection,
    pub dataset: Arc<Dataset>,
}

pub struct Dashboard {
    periods: Vec<Period>,
    resolver: Arc<DatasetResolver>,
    events: broadcast::Sender<LoadEvent>,
}

impl Dashboard {
    /// `periods` must be ascending, as produced by discovery
    pub fn new(periods: Vec<Period>, resolver: Arc<DatasetResolver>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            periods,
            resolver,
            events,
        }
    }

    /// Wire up store, discovery and resolver from `config`.
    /// Discovery finishes before this returns.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store = build_store(config)?;
        let periods = PeriodDiscovery::new(store.clone(), &config.discovery)
            .discover(config.discovery.start, config.discovery.end)
            .await;
        let chain = SourceChain::from_config(config, store).await?;
        let resolver = DatasetResolver::new(Arc::new(DatasetCache::new()), chain)
            .with_checks(checks_from_config(&config.consistency));
        Ok(Self::new(periods, Arc::new(resolver)))
    }

    pub fn available_periods(&self) -> &[Period] {
        &self.periods
    }

    /// The most recent available period
    pub fn default_period(&self) -> Option<Period> {
        self.periods.last().copied()
    }

    pub fn resolver(&self) -> &DatasetResolver {
        &self.resolver
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LoadEvent> {
        self.events.subscribe()
    }

    pub async fn get_dataset(&self, selection: Selection) -> Result<Arc<Dataset>> {
        let dataset = match selection {
            Selection::Period(period) => self.resolver.resolve(period).await?,
            Selection::All => Arc::new(self.combine_all().await?),
        };

        // No subscribers is fine
        let _ = self.events.send(LoadEvent {
            selection,
            dataset: Arc::clone(&dataset),
        });
        Ok(dataset)
    }

    /// Resolve every available period concurrently, then combine.
    ///
    /// A period answered only by the global default has no data of its
    /// own and is left out of the combination.
    async fn combine_all(&self) -> Result<Dataset> {
        let mut tasks = JoinSet::new();
        for &period in &self.periods {
            let resolver = Arc::clone(&self.resolver);
            tasks.spawn(async move {
                let resolved = resolver
                    .resolve(period)
                    .await
                    .map(|dataset| (dataset, resolver.served_by_default(period)));
                (period, resolved)
            });
        }

        let mut datasets: HashMap<Period, Arc<Dataset>> = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((period, Ok((_, true)))) => {
                    let missing = NanRateError::AggregationInputMissing(period.to_string());
                    warn!(error = %missing, "only the global default is available, skipping");
                }
                Ok((period, Ok((dataset, false)))) => {
                    datasets.insert(period, dataset);
                }
                Ok((period, Err(e))) => {
                    warn!(%period, error = %e, "period unavailable for combined view");
                }
                Err(e) => {
                    error!(error = %e, "resolve task failed");
                }
            }
        }

        if datasets.is_empty() {
            return Err(NanRateError::DataUnavailable(Selection::All.to_string()));
        }

        let combined = Aggregator::combine(&self.periods, &datasets);
        info!(
            periods = datasets.len(),
            total_records = combined.total_records,
            label = %combined.period_label,
            "combined dataset ready"
        );
        Ok(combined)
    }
}
