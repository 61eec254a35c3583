use std::path::PathBuf;

use tokio::fs;

use super::ObjectManifest;
use crate::chunk::FileChunker;
use crate::{ChunkRef, ContentAddress, Result, StoreError};

pub struct ValidationManager {
    chunks_path: PathBuf,
}

impl ValidationManager {
    pub fn new(chunks_path: PathBuf) -> Self {
        Self { chunks_path }
    }

    /// Every chunk the manifest lists is on disk with the recorded size.
    pub async fn validate_manifest(&self, manifest: &ObjectManifest) -> Result<()> {
        let mut total_size = 0;
        for chunk in &manifest.chunks {
            let chunk_path = self.chunks_path.join(chunk.id.0.to_string());
            let metadata = fs::metadata(&chunk_path).await.map_err(|_| {
                StoreError::StorageFailure(format!(
                    "chunk {} of {} is missing",
                    chunk.id.0, manifest.address
                ))
            })?;
            if metadata.len() != chunk.size {
                return Err(StoreError::StorageFailure(format!(
                    "chunk {} size mismatch. Expected: {}, Got: {}",
                    chunk.id.0,
                    chunk.size,
                    metadata.len()
                )));
            }
            total_size += metadata.len();
        }

        if total_size != manifest.size {
            return Err(StoreError::StorageFailure(format!(
                "object size mismatch. Expected: {}, Got: {}",
                manifest.size, total_size
            )));
        }

        Ok(())
    }

    pub fn validate_chunk(reference: &ChunkRef, data: &[u8]) -> Result<()> {
        if FileChunker::verify(reference, data) {
            Ok(())
        } else {
            Err(StoreError::StorageFailure(format!(
                "chunk {} failed checksum verification",
                reference.id.0
            )))
        }
    }

    /// The reassembled bytes hash to the address they were requested by.
    pub fn validate_content(address: &ContentAddress, data: &[u8]) -> Result<()> {
        let actual = ContentAddress::of(data);
        if &actual != address {
            return Err(StoreError::StorageFailure(format!(
                "content address mismatch. Expected: {}, Got: {}",
                address, actual
            )));
        }
        Ok(())
    }
}
