//! Durable id → record storage for file metadata.

pub mod disk;
pub mod memory;

use async_trait::async_trait;

use crate::{FileId, FileRecord, Result};

pub use disk::DiskIndex;
pub use memory::MemoryIndex;

#[async_trait]
pub trait MetadataIndex: Send + Sync {
    async fn get(&self, id: &FileId) -> Result<Option<FileRecord>>;

    /// Unconditionally write `record` under its id.
    async fn put(&self, record: &FileRecord) -> Result<()>;

    async fn delete(&self, id: &FileId) -> Result<()>;

    /// Write `new` only if the stored record is exactly `expected`.
    /// Returns whether the write happened.
    async fn compare_and_swap(&self, id: &FileId, expected: &FileRecord, new: &FileRecord) -> Result<bool>;

    async fn list(&self) -> Result<Vec<FileRecord>>;
}
