//! Raw byte stores backing the file-based sources
//!
//! `Ok(false)` / `Ok(None)` mean "not there"; `Err` means the store itself
//! could not answer.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use crate::types::{NanRateError, Result};

#[async_trait]
pub trait DataStore: Send + Sync {
    /// Human readable location, for logs
    fn describe(&self) -> String;

    /// Existence check without reading the body
    async fn exists(&self, name: &str) -> Result<bool>;

    /// Full read; `None` when the file does not exist
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>>;
}

/// Dataset files served over HTTP(S)
pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStore {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| NanRateError::Http(format!("HTTP client error: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }
}

/// 2xx is present, 4xx is absent, anything else is a store failure
fn classify(status: StatusCode, url: &str) -> Result<bool> {
    if status.is_success() {
        Ok(true)
    } else if status.is_client_error() {
        Ok(false)
    } else {
        Err(NanRateError::Http(format!("{} returned {}", url, status)))
    }
}

#[async_trait]
impl DataStore for HttpStore {
    fn describe(&self) -> String {
        self.base_url.clone()
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let url = self.url(name);
        let response = self.client.head(&url).send().await?;
        debug!(url = %url, status = %response.status(), "HEAD");
        classify(response.status(), &url)
    }

    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let url = self.url(name);
        let response = self.client.get(&url).send().await?;
        debug!(url = %url, status = %response.status(), "GET");
        if !classify(response.status(), &url)? {
            return Ok(None);
        }
        let bytes = response.bytes().await?;
        Ok(Some(bytes.to_vec()))
    }
}

/// Dataset files in a local directory
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DataStore for DirStore {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        match tokio::fs::metadata(self.root.join(name)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.root.join(name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_classify_status() {
        assert!(classify(StatusCode::OK, "u").unwrap());
        assert!(!classify(StatusCode::NOT_FOUND, "u").unwrap());
        assert!(!classify(StatusCode::FORBIDDEN, "u").unwrap());
        assert!(classify(StatusCode::BAD_GATEWAY, "u").is_err());
    }

    #[test]
    fn test_http_store_url_join() {
        let store = HttpStore::new("https://example.com/data/", 5).unwrap();
        assert_eq!(
            store.url("nan_data_2025_08.json"),
            "https://example.com/data/nan_data_2025_08.json"
        );
    }

    #[tokio::test]
    async fn test_dir_store_exists_and_read() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.json"), b"{}").unwrap();
        let store = DirStore::new(temp.path());

        assert!(store.exists("a.json").await.unwrap());
        assert!(!store.exists("b.json").await.unwrap());
        assert_eq!(store.read("a.json").await.unwrap(), Some(b"{}".to_vec()));
        assert_eq!(store.read("b.json").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_dir_store_directory_is_not_a_file() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("sub.json")).unwrap();
        let store = DirStore::new(temp.path());
        assert!(!store.exists("sub.json").await.unwrap());
    }

    #[tokio::test]
    async fn test_dir_store_missing_root_reports_absent() {
        let store = DirStore::new("/nonexistent/nanrate/root");
        assert!(!store.exists("x.json").await.unwrap());
    }
}
