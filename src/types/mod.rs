mod chunk;
mod commitment;
mod file;
mod record;

pub use chunk::{Chunk, ChunkId, ChunkRef};
pub use commitment::{Commitment, CommitmentKind, COMMITMENT_VERSION};
pub use file::{ContentType, OCTET_STREAM};
pub use record::{ContentAddress, FileId, FileRecord, OnChainRef, ProvenanceView};
