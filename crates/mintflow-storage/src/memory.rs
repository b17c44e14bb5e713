//! In-memory content store

use crate::content_address;
use async_trait::async_trait;
use dashmap::DashMap;
use mintflow_core::{ContentStore, Locator, StorageError};

/// Keeps blobs in a concurrent map keyed by `mem://<blake3-hex>`
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    blobs: DashMap<Locator, Vec<u8>>,
}

impl MemoryContentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, locator: &Locator) -> Option<Vec<u8>> {
        self.blobs.get(locator).map(|blob| blob.value().clone())
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn upload(&self, bytes: &[u8], name: &str) -> Result<Locator, StorageError> {
        let locator = Locator::new(format!("mem://{}", content_address(bytes)));
        self.blobs.insert(locator.clone(), bytes.to_vec());
        tracing::trace!(name, %locator, "Blob kept in memory");
        Ok(locator)
    }
}
