//! Dataset source traits and implementations

mod bundle;
mod fallback;
mod file;
mod store;

pub use bundle::BundleSource;
pub use fallback::DefaultSource;
pub use file::{FileSource, SourceVariant};
pub use store::{DataStore, DirStore, HttpStore};

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::Config;
use crate::types::{Dataset, Period, Result};

/// One link in the resolution chain: try to produce a dataset for a period
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Source name (e.g., "enhanced")
    fn name(&self) -> &str;

    /// Fetch the dataset for `period`. `SourceNotFound`, `Parse` and
    /// transport errors all mean "try the next source".
    async fn fetch(&self, period: Period) -> Result<Dataset>;

    /// True for a source that answers any period with stand-in data
    fn is_last_resort(&self) -> bool {
        false
    }
}

/// Build the store named by `config.source`
pub fn build_store(config: &Config) -> Result<Arc<dyn DataStore>> {
    if config.is_remote() {
        Ok(Arc::new(HttpStore::new(
            &config.source,
            config.request_timeout_secs,
        )?))
    } else {
        Ok(Arc::new(DirStore::new(&config.source)))
    }
}

/// Ordered list of sources, attempted first to last
pub struct SourceChain {
    sources: Vec<Box<dyn DatasetSource>>,
}

impl SourceChain {
    pub fn new(sources: Vec<Box<dyn DatasetSource>>) -> Self {
        Self { sources }
    }

    /// enhanced file => bundle => plain file => global default
    pub fn standard(
        store: Arc<dyn DataStore>,
        bundle: BundleSource,
        default: DefaultSource,
    ) -> Self {
        Self::new(vec![
            Box::new(FileSource::enhanced(store.clone())),
            Box::new(bundle),
            Box::new(FileSource::plain(store)),
            Box::new(default),
        ])
    }

    /// Standard chain with bundle and default loaded from the config paths
    pub async fn from_config(config: &Config, store: Arc<dyn DataStore>) -> Result<Self> {
        let bundle = match &config.bundle {
            Some(path) => BundleSource::load(path).await?,
            None => BundleSource::empty(),
        };
        let default = match &config.default_dataset {
            Some(path) => DefaultSource::load(path).await,
            None => DefaultSource::none(),
        };
        Ok(Self::standard(store, bundle, default))
    }

    pub fn sources(&self) -> &[Box<dyn DatasetSource>] {
        &self.sources
    }

    pub fn get(&self, name: &str) -> Option<&dyn DatasetSource> {
        self.sources
            .iter()
            .find(|s| s.name() == name)
            .map(|s| s.as_ref())
    }
}

#[cfg(test)]
pub mod testing {
    //! Fixtures shared by the source and service tests

    pub use super::store::testing::MemoryStore;

    use crate::types::Dataset;
    use serde_json::{json, Map, Value};

    /// Payload with one mech partner entry per `(week, partner, total, nan)`;
    /// the partner summary sums them.
    pub fn sample_json(period: &str, total_records: u64, rows: &[(&str, &str, u64, u64)]) -> String {
        let mut weekly = Map::new();
        let mut summary: Map<String, Value> = Map::new();

        for (week, partner, total, nan) in rows {
            let entry = weekly.entry(week.to_string()).or_insert_with(|| {
                json!({
                    "date": "2025-01-01",
                    "is_sunday_data": false,
                    "partners": {"mech": {}, "elec": {}}
                })
            });
            entry["partners"]["mech"][*partner] = json!({
                "total_tasks": total,
                "nan_count": nan,
                "nan_ratio": 0.0,
                "records": []
            });

            let ps = summary
                .entry(partner.to_string())
                .or_insert_with(|| json!({"total_tasks": 0, "nan_count": 0, "weeks": {}}));
            let t = ps["total_tasks"].as_u64().unwrap_or(0) + total;
            let n = ps["nan_count"].as_u64().unwrap_or(0) + nan;
            ps["total_tasks"] = json!(t);
            ps["nan_count"] = json!(n);
            ps["weeks"][*week] = json!({"total_tasks": total, "nan_count": nan});
        }

        json!({
            "extracted_at": "2025-09-01T09:00:00Z",
            "period": period,
            "total_records": total_records,
            "weekly_stats": weekly,
            "partner_summary": summary,
            "metadata": {}
        })
        .to_string()
    }

    pub fn sample_dataset(period: &str, total_records: u64, rows: &[(&str, &str, u64, u64)]) -> Dataset {
        Dataset::from_json(sample_json(period, total_records, rows).as_bytes()).unwrap()
    }
}
