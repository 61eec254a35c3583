use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::cache::CacheManager;
use super::validation::ValidationManager;
use super::ContentStore;
use crate::chunk::{ChunkManager, FileChunker};
use crate::{Chunk, ChunkId, ChunkRef, ContentAddress, Result, StoreError};

/// Chunk files younger than this are never collected; an in-flight `put`
/// writes its chunks before its manifest.
pub const DEFAULT_GC_GRACE: Duration = Duration::from_secs(15 * 60);

/// How an object is laid out across chunk files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectManifest {
    pub address: ContentAddress,
    pub size: u64,
    pub chunks: Vec<ChunkRef>,
    pub stored_at: DateTime<Utc>,
}

pub struct DiskContentStore {
    objects_path: PathBuf,
    chunks_path: PathBuf,
    chunker: FileChunker,
    validator: ValidationManager,
    cache: Option<CacheManager>,
    gc_grace: Duration,
}

impl DiskContentStore {
    pub async fn new<P: AsRef<Path>>(base_path: P) -> Result<Self> {
        let base_path = base_path.as_ref().to_owned();
        let objects_path = base_path.join("objects");
        let chunks_path = base_path.join("chunks");

        fs::create_dir_all(&objects_path).await?;
        fs::create_dir_all(&chunks_path).await?;

        let chunker = FileChunker::new(ChunkManager::default());
        let validator = ValidationManager::new(chunks_path.clone());
        Ok(Self {
            objects_path,
            chunks_path,
            chunker,
            validator,
            cache: None,
            gc_grace: DEFAULT_GC_GRACE,
        })
    }

    pub fn with_cache(mut self, cache_size: usize) -> Self {
        self.cache = (cache_size > 0).then(|| CacheManager::new(cache_size));
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunker = FileChunker::new(ChunkManager::with_chunk_size(chunk_size));
        self
    }

    pub fn with_gc_grace(mut self, grace: Duration) -> Self {
        self.gc_grace = grace;
        self
    }

    pub fn cache(&self) -> Option<&CacheManager> {
        self.cache.as_ref()
    }

    fn get_chunk_path(&self, chunk_id: &ChunkId) -> PathBuf {
        self.chunks_path.join(chunk_id.0.to_string())
    }

    fn get_manifest_path(&self, address: &ContentAddress) -> PathBuf {
        self.objects_path.join(format!("{}.json", address))
    }

    async fn store_chunks(&self, chunks: &[Chunk]) -> Result<Vec<ChunkRef>> {
        let mut refs = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            fs::write(self.get_chunk_path(&chunk.id), &chunk.data).await?;
            refs.push(chunk.reference());
        }
        Ok(refs)
    }

    pub async fn read_manifest(&self, address: &ContentAddress) -> Result<ObjectManifest> {
        let manifest_path = self.get_manifest_path(address);
        let content = match fs::read_to_string(&manifest_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::StorageFailure(format!(
                    "content {} not found",
                    address
                )))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    async fn stored_intact(&self, address: &ContentAddress) -> Result<()> {
        let manifest = self.read_manifest(address).await?;
        self.validator.validate_manifest(&manifest).await
    }

    /// Remove chunk files that no manifest references, e.g. leftovers of an
    /// interrupted `put`. Files modified within the grace window are kept.
    /// Returns how many were removed.
    pub async fn collect_garbage(&self) -> Result<usize> {
        let mut referenced = HashSet::new();
        let mut manifests = fs::read_dir(&self.objects_path).await?;
        while let Some(entry) = manifests.next_entry().await? {
            if entry.path().extension().map_or(false, |ext| ext == "json") {
                let content = fs::read_to_string(entry.path()).await?;
                match serde_json::from_str::<ObjectManifest>(&content) {
                    Ok(manifest) => {
                        referenced.extend(manifest.chunks.into_iter().map(|c| c.id.0.to_string()))
                    }
                    Err(e) => {
                        // An unreadable manifest might still own chunks; keep everything.
                        warn!(path = %entry.path().display(), error = %e, "skipping garbage collection");
                        return Ok(0);
                    }
                }
            }
        }

        let mut removed = 0;
        let mut chunk_files = fs::read_dir(&self.chunks_path).await?;
        while let Some(entry) = chunk_files.next_entry().await? {
            let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if referenced.contains(&file_name) {
                continue;
            }
            let modified = entry.metadata().await?.modified()?;
            let age = SystemTime::now().duration_since(modified).unwrap_or(Duration::ZERO);
            if age < self.gc_grace {
                debug!(chunk = %file_name, "orphaned chunk too recent to collect");
                continue;
            }
            match fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(chunk = %file_name, error = %e, "failed to delete orphaned chunk"),
            }
        }

        info!(removed, "content garbage collection finished");
        Ok(removed)
    }
}

#[async_trait]
impl ContentStore for DiskContentStore {
    async fn put(&self, data: &[u8]) -> Result<ContentAddress> {
        let address = ContentAddress::of(data);
        let manifest_path = self.get_manifest_path(&address);

        if fs::try_exists(&manifest_path).await? {
            match self.stored_intact(&address).await {
                Ok(()) => {
                    debug!(%address, "content already stored");
                    return Ok(address);
                }
                Err(e) => warn!(%address, error = %e, "rewriting damaged object"),
            }
        }

        let chunks = self.chunker.chunk_data(data);
        let chunk_refs = self.store_chunks(&chunks).await?;

        let manifest = ObjectManifest {
            address: address.clone(),
            size: data.len() as u64,
            chunks: chunk_refs,
            stored_at: Utc::now(),
        };
        write_atomic(&manifest_path, &serde_json::to_vec(&manifest)?).await?;
        debug!(%address, size = manifest.size, chunks = manifest.chunks.len(), "stored content");

        if let Some(cache) = &self.cache {
            cache.put(address.clone(), Arc::new(data.to_vec())).await;
        }

        Ok(address)
    }

    async fn get(&self, address: &ContentAddress) -> Result<Vec<u8>> {
        if let Some(cache) = &self.cache {
            if let Some(data) = cache.get(address).await {
                return Ok(data.as_ref().clone());
            }
        }

        let manifest = self.read_manifest(address).await?;
        self.validator.validate_manifest(&manifest).await?;

        let mut data = Vec::with_capacity(manifest.size as usize);
        for chunk in &manifest.chunks {
            let chunk_data = fs::read(self.get_chunk_path(&chunk.id)).await?;
            ValidationManager::validate_chunk(chunk, &chunk_data)?;
            data.extend(chunk_data);
        }
        ValidationManager::validate_content(address, &data)?;

        if let Some(cache) = &self.cache {
            cache.put(address.clone(), Arc::new(data.clone())).await;
        }

        Ok(data)
    }
}

/// Replace `path` with `bytes` so readers never observe a half-written file.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension(format!("tmp-{}", Uuid::new_v4()));
    fs::write(&tmp_path, bytes).await?;
    if let Err(e) = fs::rename(&tmp_path, path).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(e.into());
    }
    Ok(())
}
