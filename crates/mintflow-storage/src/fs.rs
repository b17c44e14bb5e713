//! Filesystem content store

use crate::content_address;
use async_trait::async_trait;
use mintflow_core::{ContentStore, Locator, StorageError};
use std::path::{Path, PathBuf};
use ulid::Ulid;

/// Stores each blob at `<root>/<blake3-hex>` and answers `<scheme>://<hex>`
///
/// Identical bytes map to the same file and locator; a repeated upload
/// writes nothing.
#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
    scheme: String,
}

impl FsContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            scheme: "cas".to_string(),
        }
    }

    #[must_use]
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `locator`, if it was issued by this store's scheme
    #[must_use]
    pub fn path_for(&self, locator: &Locator) -> Option<PathBuf> {
        let address = locator
            .as_str()
            .strip_prefix(&self.scheme)?
            .strip_prefix("://")?;
        if address.len() == 64 && address.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(self.root.join(address))
        } else {
            None
        }
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn upload(&self, bytes: &[u8], name: &str) -> Result<Locator, StorageError> {
        let address = content_address(bytes);
        let target = self.root.join(&address);

        if tokio::fs::try_exists(&target).await? {
            tracing::debug!(name, %address, "Blob already stored");
        } else {
            tokio::fs::create_dir_all(&self.root).await?;
            // concurrent writers of the same bytes each stage their own file
            let staging = self.root.join(format!(".{address}.{}.partial", Ulid::new()));
            let written = match tokio::fs::write(&staging, bytes).await {
                Ok(()) => tokio::fs::rename(&staging, &target).await,
                Err(e) => Err(e),
            };
            if let Err(e) = written {
                tokio::fs::remove_file(&staging).await.ok();
                return Err(e.into());
            }
            tracing::debug!(name, %address, path = %target.display(), "Blob written");
        }

        Ok(Locator::new(format!("{}://{address}", self.scheme)))
    }
}
