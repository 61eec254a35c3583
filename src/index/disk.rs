use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use super::MetadataIndex;
use crate::storage::disk::write_atomic;
use crate::{FileId, FileRecord, Result};

const LOCK_STRIPES: usize = 16;

/// One JSON document per record under `<base>/metadata`.
///
/// Conditional writes are serialized per id through a small set of striped
/// locks, so writers for different records rarely contend and never share a
/// single global lock.
pub struct DiskIndex {
    metadata_path: PathBuf,
    stripes: Vec<Mutex<()>>,
}

impl DiskIndex {
    pub async fn new<P: AsRef<Path>>(base_path: P) -> Result<Self> {
        let metadata_path = base_path.as_ref().join("metadata");
        fs::create_dir_all(&metadata_path).await?;
        Ok(Self {
            metadata_path,
            stripes: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        })
    }

    fn get_metadata_path(&self, id: &FileId) -> PathBuf {
        self.metadata_path.join(format!("{}.json", id))
    }

    fn stripe(&self, id: &FileId) -> &Mutex<()> {
        let bytes = id.0.as_bytes();
        &self.stripes[bytes[bytes.len() - 1] as usize % LOCK_STRIPES]
    }

    async fn read_record(&self, path: &Path) -> Result<Option<FileRecord>> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_record(&self, record: &FileRecord) -> Result<()> {
        let json = serde_json::to_vec_pretty(record)?;
        write_atomic(&self.get_metadata_path(&record.id), &json).await
    }
}

#[async_trait]
impl MetadataIndex for DiskIndex {
    async fn get(&self, id: &FileId) -> Result<Option<FileRecord>> {
        self.read_record(&self.get_metadata_path(id)).await
    }

    async fn put(&self, record: &FileRecord) -> Result<()> {
        let _guard = self.stripe(&record.id).lock().await;
        self.write_record(record).await
    }

    async fn delete(&self, id: &FileId) -> Result<()> {
        let _guard = self.stripe(id).lock().await;
        match fs::remove_file(self.get_metadata_path(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn compare_and_swap(&self, id: &FileId, expected: &FileRecord, new: &FileRecord) -> Result<bool> {
        let _guard = self.stripe(id).lock().await;
        let current = self.read_record(&self.get_metadata_path(id)).await?;
        if current.as_ref() != Some(expected) {
            debug!(file_id = %id, "conditional write lost");
            return Ok(false);
        }
        self.write_record(new).await?;
        Ok(true)
    }

    async fn list(&self) -> Result<Vec<FileRecord>> {
        let mut records = Vec::new();
        let mut entries = fs::read_dir(&self.metadata_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().extension().map_or(false, |ext| ext == "json") {
                if let Some(record) = self.read_record(&entry.path()).await? {
                    records.push(record);
                }
            }
        }
        records.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at));
        Ok(records)
    }
}
