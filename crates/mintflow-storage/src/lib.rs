//! Content store backends for mintflow
//!
//! Implementations of [`mintflow_core::ContentStore`]:
//! - [`FsContentStore`]: content-addressed directory on local disk
//! - [`MemoryContentStore`]: process-local map, for tests and dry runs
//! - [`HttpContentStore`]: upload gateway reached over HTTP

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod fs;
mod http;
mod memory;

pub use fs::FsContentStore;
pub use http::{HttpContentStore, HttpStoreConfig, UploadReceipt};
pub use memory::MemoryContentStore;

/// Hex Blake3 digest used as the content address by local backends
pub(crate) fn content_address(bytes: &[u8]) -> String {
    hex::encode(blake3::hash(bytes).as_bytes())
}
