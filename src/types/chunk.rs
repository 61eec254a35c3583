use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ChunkId(pub Uuid);

#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: ChunkId,
    pub data: Vec<u8>,
    pub checksum: String,
}

impl Chunk {
    pub fn reference(&self) -> ChunkRef {
        ChunkRef {
            id: self.id,
            checksum: self.checksum.clone(),
            size: self.data.len() as u64,
        }
    }
}

/// What an object manifest remembers about one stored chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkRef {
    pub id: ChunkId,
    pub checksum: String,
    pub size: u64,
}
