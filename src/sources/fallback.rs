//! Global last-resort dataset

use async_trait::async_trait;
use std::path::Path;
use tracing::warn;

use super::DatasetSource;
use crate::types::{Dataset, NanRateError, Period, Result};

/// Answers every period with the same dataset, if one is configured.
#[derive(Default)]
pub struct DefaultSource {
    dataset: Option<Dataset>,
}

impl DefaultSource {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset: Some(dataset),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    /// Load the default dataset from disk. Missing or malformed files leave
    /// the source empty rather than failing startup.
    pub async fn load(path: &Path) -> Self {
        let bytes = match tokio::fs::read(path).await {
            Ok(b) => b,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "default dataset unreadable");
                return Self::none();
            }
        };
        match Dataset::from_json(&bytes) {
            Ok(dataset) => Self::new(dataset),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "default dataset malformed");
                Self::none()
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.dataset.is_some()
    }
}

#[async_trait]
impl DatasetSource for DefaultSource {
    fn name(&self) -> &str {
        "default"
    }

    fn is_last_resort(&self) -> bool {
        true
    }

    async fn fetch(&self, period: Period) -> Result<Dataset> {
        match &self.dataset {
            Some(dataset) => {
                warn!(%period, label = %dataset.period_label, "serving global default dataset");
                Ok(dataset.clone())
            }
            None => Err(NanRateError::SourceNotFound {
                source_name: self.name().to_string(),
                period: period.to_string(),
            }),
        }
    }
}
