use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{Chunk, ChunkId, ChunkRef};

pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

pub struct ChunkManager {
    chunk_size: usize,
}

impl ChunkManager {
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }
}

impl Default for ChunkManager {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

pub struct FileChunker {
    config: ChunkManager,
}

impl FileChunker {
    pub fn new(config: ChunkManager) -> Self {
        Self { config }
    }

    pub fn chunk_data(&self, data: &[u8]) -> Vec<Chunk> {
        data.chunks(self.config.chunk_size)
            .map(|piece| Chunk {
                id: ChunkId(Uuid::new_v4()),
                data: piece.to_vec(),
                checksum: calculate_checksum(piece),
            })
            .collect()
    }

    /// Whether `data` read back from disk is the chunk the manifest recorded.
    pub fn verify(reference: &ChunkRef, data: &[u8]) -> bool {
        data.len() as u64 == reference.size && calculate_checksum(data) == reference.checksum
    }
}

pub fn calculate_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_chunk_size() {
        let chunker = FileChunker::new(ChunkManager::with_chunk_size(4));
        let chunks = chunker.chunk_data(b"0123456789");
        let sizes: Vec<usize> = chunks.iter().map(|c| c.data.len()).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
        assert!(chunks
            .iter()
            .all(|c| FileChunker::verify(&c.reference(), &c.data)));
    }

    #[test]
    fn empty_input_has_no_chunks() {
        let chunker = FileChunker::new(ChunkManager::default());
        assert!(chunker.chunk_data(&[]).is_empty());
    }

    #[test]
    fn verify_rejects_tampered_bytes() {
        let chunker = FileChunker::new(ChunkManager::default());
        let chunk = chunker.chunk_data(b"payload").remove(0);
        assert!(!FileChunker::verify(&chunk.reference(), b"pAyload"));
    }
}
