//! Content upload
//!
//! [`ContentStore`] is the storage network seam: one `upload` call per blob,
//! returning an opaque locator. [`ContentUploader`] enforces the input
//! contract and classifies store errors as `UploadFailed`. Retries are the
//! store's business; the uploader makes exactly one call.

use crate::error::{PipelineError, StorageError};
use crate::types::Locator;
use async_trait::async_trait;
use std::sync::Arc;

/// Content-addressed storage network client
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `bytes`; `name` is provenance/display only
    async fn upload(&self, bytes: &[u8], name: &str) -> Result<Locator, StorageError>;
}

/// Uploads assets and descriptors through a [`ContentStore`]
#[derive(Clone)]
pub struct ContentUploader {
    store: Arc<dyn ContentStore>,
}

impl ContentUploader {
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Upload one blob
    ///
    /// # Errors
    /// - `MalformedInput` for empty bytes or a blank name (no store call)
    /// - `UploadFailed` wrapping the store error
    pub async fn upload(&self, bytes: &[u8], name: &str) -> Result<Locator, PipelineError> {
        if bytes.is_empty() {
            return Err(PipelineError::malformed(format!("upload {name:?}: payload is empty")));
        }
        if name.trim().is_empty() {
            return Err(PipelineError::malformed("upload: display name is empty"));
        }

        let locator = self
            .store
            .upload(bytes, name)
            .await
            .map_err(|source| PipelineError::UploadFailed {
                name: name.to_string(),
                source,
            })?;

        tracing::info!(name, size = bytes.len(), locator = %locator, "Content uploaded");
        Ok(locator)
    }
}

impl std::fmt::Debug for ContentUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentUploader").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_returns_store_locator() {
        let mut store = MockContentStore::new();
        store
            .expect_upload()
            .withf(|bytes, name| bytes.to_vec() == b"IMG".to_vec() && name.to_string() == "5.jpg")
            .times(1)
            .returning(|_, _| Ok(Locator::new("ar://img5")));

        let uploader = ContentUploader::new(Arc::new(store));
        let locator = uploader.upload(b"IMG", "5.jpg").await.unwrap();
        assert_eq!(locator.as_str(), "ar://img5");
    }

    #[tokio::test]
    async fn empty_payload_never_reaches_store() {
        let mut store = MockContentStore::new();
        store.expect_upload().never();

        let uploader = ContentUploader::new(Arc::new(store));
        let err = uploader.upload(b"", "5.jpg").await.unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput(_)));

        let err = uploader.upload(b"IMG", " ").await.unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput(_)));
    }

    #[tokio::test]
    async fn store_error_becomes_upload_failed() {
        let mut store = MockContentStore::new();
        store
            .expect_upload()
            .times(1)
            .returning(|_, _| Err(StorageError::Transport("connection reset".to_string())));

        let uploader = ContentUploader::new(Arc::new(store));
        let err = uploader.upload(b"IMG", "5.jpg").await.unwrap_err();
        match err {
            PipelineError::UploadFailed { name, source } => {
                assert_eq!(name, "5.jpg");
                assert!(matches!(source, StorageError::Transport(_)));
            }
            other => panic!("expected UploadFailed, got {other:?}"),
        }
    }
}
