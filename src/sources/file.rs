//! Per-period dataset files following the `nan_data_YYYY_MM[_improved].json` convention

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::{DataStore, DatasetSource};
use crate::types::{Dataset, NanRateError, Period, Result};

/// Which flavour of per-period file to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceVariant {
    /// `nan_data_YYYY_MM_improved.json`
    Enhanced,
    /// `nan_data_YYYY_MM.json`
    Plain,
}

impl SourceVariant {
    pub fn name(&self) -> &'static str {
        match self {
            SourceVariant::Enhanced => "enhanced",
            SourceVariant::Plain => "plain",
        }
    }

    pub fn file_name(&self, period: Period) -> String {
        match self {
            SourceVariant::Enhanced => format!("nan_data_{}_improved.json", period.file_stem()),
            SourceVariant::Plain => format!("nan_data_{}.json", period.file_stem()),
        }
    }
}

/// Reads one variant of the per-period files from a [`DataStore`]
pub struct FileSource {
    variant: SourceVariant,
    store: Arc<dyn DataStore>,
}

impl FileSource {
    pub fn new(variant: SourceVariant, store: Arc<dyn DataStore>) -> Self {
        Self { variant, store }
    }

    pub fn enhanced(store: Arc<dyn DataStore>) -> Self {
        Self::new(SourceVariant::Enhanced, store)
    }

    pub fn plain(store: Arc<dyn DataStore>) -> Self {
        Self::new(SourceVariant::Plain, store)
    }
}

#[async_trait]
impl DatasetSource for FileSource {
    fn name(&self) -> &str {
        self.variant.name()
    }

    async fn fetch(&self, period: Period) -> Result<Dataset> {
        let file_name = self.variant.file_name(period);
        debug!(source = self.name(), file = %file_name, "fetching");

        let bytes = self
            .store
            .read(&file_name)
            .await?
            .ok_or_else(|| NanRateError::SourceNotFound {
                source_name: self.name().to_string(),
                period: period.to_string(),
            })?;

        Dataset::from_json(&bytes).map_err(|e| match e {
            NanRateError::Parse(msg) => NanRateError::Parse(format!("{}: {}", file_name, msg)),
            other => other,
        })
    }
}
