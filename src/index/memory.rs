use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::MetadataIndex;
use crate::{FileId, FileRecord, Result};

#[derive(Default)]
pub struct MemoryIndex {
    records: RwLock<HashMap<FileId, FileRecord>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataIndex for MemoryIndex {
    async fn get(&self, id: &FileId) -> Result<Option<FileRecord>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn put(&self, record: &FileRecord) -> Result<()> {
        self.records.write().await.insert(record.id, record.clone());
        Ok(())
    }

    async fn delete(&self, id: &FileId) -> Result<()> {
        self.records.write().await.remove(id);
        Ok(())
    }

    async fn compare_and_swap(&self, id: &FileId, expected: &FileRecord, new: &FileRecord) -> Result<bool> {
        let mut records = self.records.write().await;
        match records.get_mut(id) {
            Some(current) if current == expected => {
                *current = new.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list(&self) -> Result<Vec<FileRecord>> {
        let mut records: Vec<FileRecord> = self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at));
        Ok(records)
    }
}
