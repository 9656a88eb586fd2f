//! Datasets shipped with the application instead of fetched per request

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use super::DatasetSource;
use crate::types::{Dataset, NanRateError, Period, Result};

/// Bundle of datasets keyed by period, e.g. a JSON object
/// `{"2025-07": {...}, "2025-08": {...}}`.
#[derive(Default)]
pub struct BundleSource {
    datasets: HashMap<Period, Dataset>,
}

impl BundleSource {
    pub fn new(datasets: HashMap<Period, Dataset>) -> Self {
        Self { datasets }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a bundle. Entries that fail validation are dropped with a
    /// warning; the rest of the bundle stays usable.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let raw: HashMap<String, serde_json::Value> = serde_json::from_slice(bytes)?;
        let mut datasets = HashMap::with_capacity(raw.len());

        for (key, value) in raw {
            let period: Period = match key.parse() {
                Ok(p) => p,
                Err(e) => {
                    warn!(key = %key, error = %e, "skipping bundle entry with invalid period");
                    continue;
                }
            };
            match Dataset::from_value(value) {
                Ok(dataset) => {
                    datasets.insert(period, dataset);
                }
                Err(e) => warn!(%period, error = %e, "skipping malformed bundle entry"),
            }
        }

        Ok(Self { datasets })
    }

    /// Load a bundle file. A missing file gives an empty bundle.
    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = match tokio::fs::read(path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "bundle file not found, continuing without it");
                return Ok(Self::empty());
            }
            Err(e) => return Err(e.into()),
        };
        let bundle = Self::from_json(&bytes)?;
        info!(path = %path.display(), periods = bundle.len(), "loaded dataset bundle");
        Ok(bundle)
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    pub fn periods(&self) -> Vec<Period> {
        let mut periods: Vec<Period> = self.datasets.keys().copied().collect();
        periods.sort();
        periods
    }
}

#[async_trait]
impl DatasetSource for BundleSource {
    fn name(&self) -> &str {
        "bundle"
    }

    async fn fetch(&self, period: Period) -> Result<Dataset> {
        self.datasets
            .get(&period)
            .cloned()
            .ok_or_else(|| NanRateError::SourceNotFound {
                source_name: self.name().to_string(),
                period: period.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::testing::sample_json;
    use tempfile::TempDir;

    fn period(s: &str) -> Period {
        s.parse().unwrap()
    }

    fn bundle_json() -> String {
        format!(
            "{{\"2025-07\": {}, \"2025-08\": {}, \"garbage\": {{}}, \"2025-09\": {{\"period\": 3}}}}",
            sample_json("2025-07", 10, &[("27주차", "BAT", 10, 1)]),
            sample_json("2025-08", 20, &[("31주차", "BAT", 20, 2)]),
        )
    }

    #[test]
    fn test_from_json_skips_bad_entries() {
        let bundle = BundleSource::from_json(bundle_json().as_bytes()).unwrap();
        assert_eq!(bundle.len(), 2);
        assert_eq!(bundle.periods(), vec![period("2025-07"), period("2025-08")]);
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(BundleSource::from_json(b"[1, 2, 3]").is_err());
    }

    #[tokio::test]
    async fn test_fetch_present_and_absent() {
        let bundle = BundleSource::from_json(bundle_json().as_bytes()).unwrap();

        let dataset = bundle.fetch(period("2025-08")).await.unwrap();
        assert_eq!(dataset.total_records, 20);

        let err = bundle.fetch(period("2025-10")).await.unwrap_err();
        assert!(matches!(err, NanRateError::SourceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let bundle = BundleSource::load(&temp.path().join("bundle.json"))
            .await
            .unwrap();
        assert!(bundle.is_empty());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bundle.json");
        std::fs::write(&path, bundle_json()).unwrap();

        let bundle = BundleSource::load(&path).await.unwrap();
        assert_eq!(bundle.len(), 2);
    }
}
