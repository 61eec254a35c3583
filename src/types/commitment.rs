use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{ContentAddress, FileId, FileRecord};
use crate::Result;

pub const COMMITMENT_VERSION: &str = "decentral-store/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitmentKind {
    Create,
    Delete,
}

/// The payload anchored on the ledger for one state transition of a record.
///
/// Field order is fixed by the struct and serialization is compact JSON, so
/// two equivalent records always encode to the same bytes. Capability tokens
/// are never part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    pub version: String,
    pub kind: CommitmentKind,
    pub file_id: FileId,
    pub name: String,
    pub size: u64,
    pub content_address: ContentAddress,
    pub owner: String,
    pub uploaded_at: String,
    pub tombstone: bool,
}

impl Commitment {
    pub fn for_record(record: &FileRecord, kind: CommitmentKind) -> Self {
        Self {
            version: COMMITMENT_VERSION.to_string(),
            kind,
            file_id: record.id,
            name: record.name.clone(),
            size: record.size,
            content_address: record.content_address.clone(),
            owner: record.owner.clone(),
            uploaded_at: record.uploaded_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            tombstone: kind == CommitmentKind::Delete,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }

    pub fn digest(payload: &[u8]) -> String {
        hex::encode(Sha256::digest(payload))
    }

    /// Check that `payload` is exactly what `record` commits to for `kind`.
    pub fn verify(record: &FileRecord, kind: CommitmentKind, payload: &[u8]) -> bool {
        match Commitment::for_record(record, kind).encode() {
            Ok(expected) => expected == payload,
            Err(_) => false,
        }
    }
}
