//! Content-addressable byte storage.

pub mod cache;
pub mod disk;
pub mod memory;
pub mod validation;

use async_trait::async_trait;

use crate::{ContentAddress, Result};

pub use disk::{DiskContentStore, ObjectManifest};
pub use memory::MemoryContentStore;

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `data` and return the address that names it.
    async fn put(&self, data: &[u8]) -> Result<ContentAddress>;

    /// Fetch the bytes stored under `address`.
    async fn get(&self, address: &ContentAddress) -> Result<Vec<u8>>;
}
