//! Source document fetch
//!
//! The document is downloaded at most once: when the file is already on
//! disk the network is never touched. There is no retry, no checksum and
//! no resume; a failed download just surfaces as an error.

use crate::config::DocumentConfig;
use crate::errors::AppError;
use crate::metrics;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Downloads the fixed source document on first use
pub struct DocumentFetcher {
    client: reqwest::Client,
    url: String,
    path: PathBuf,
}

impl DocumentFetcher {
    /// Create a fetcher for the configured document
    pub fn new(config: &DocumentConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder().build().map_err(|e| {
            AppError::DocumentFetchError(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            url: config.url.clone(),
            path: config.path(),
        })
    }

    /// Return the local path, downloading the document only when absent
    pub async fn ensure_local(&self) -> Result<&Path, AppError> {
        if self.path.exists() {
            debug!(path = %self.path.display(), "Document already present");
            return Ok(&self.path);
        }

        self.download().await?;
        Ok(&self.path)
    }

    async fn download(&self) -> Result<(), AppError> {
        info!(url = %self.url, "Downloading document");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AppError::DocumentFetchError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::DocumentFetchError(format!(
                "HTTP {} from {}",
                response.status(),
                self.url
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::DocumentFetchError(format!("Failed to read body: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::DocumentFetchError(format!(
                    "Failed to create {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        tokio::fs::write(&self.path, &bytes).await.map_err(|e| {
            AppError::DocumentFetchError(format!(
                "Failed to write {}: {}",
                self.path.display(),
                e
            ))
        })?;

        metrics::record_download();
        info!(path = %self.path.display(), size = bytes.len(), "Document saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn test_document_config(url: String, data_dir: &Path) -> DocumentConfig {
        DocumentConfig {
            url,
            filename: "case.pdf".to_string(),
            data_dir: data_dir.display().to_string(),
            process_pdf: true,
            chunk_size: 250,
            chunk_overlap: 120,
            top_k: 4,
        }
    }

    #[tokio::test]
    async fn test_downloads_when_absent() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/case.pdf");
                then.status(200).body("%PDF-1.4 fake");
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = test_document_config(server.url("/case.pdf"), dir.path());
        let fetcher = DocumentFetcher::new(&config).unwrap();

        let path = fetcher.ensure_local().await.unwrap().to_path_buf();

        assert_eq!(path, dir.path().join("case.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4 fake");
        assert_eq!(mock.hits_async().await, 1);
    }

    #[tokio::test]
    async fn test_skips_download_when_present() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/case.pdf");
                then.status(200).body("from network");
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("case.pdf");
        std::fs::write(&existing, b"already here").unwrap();

        let config = test_document_config(server.url("/case.pdf"), dir.path());
        let fetcher = DocumentFetcher::new(&config).unwrap();

        let path = fetcher.ensure_local().await.unwrap().to_path_buf();

        assert_eq!(path, existing);
        assert_eq!(std::fs::read(&path).unwrap(), b"already here");
        assert_eq!(mock.hits_async().await, 0);
    }

    #[tokio::test]
    async fn test_http_error_surfaces() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/case.pdf");
                then.status(404);
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = test_document_config(server.url("/case.pdf"), dir.path());
        let fetcher = DocumentFetcher::new(&config).unwrap();

        let err = fetcher.ensure_local().await.unwrap_err();
        assert!(matches!(err, AppError::DocumentFetchError(_)));
        assert!(!dir.path().join("case.pdf").exists());
    }
}
