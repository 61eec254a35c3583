use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Commitment, CommitmentKind, ContentType};
use crate::capability::{CapabilityToken, TokenPair};
use crate::{Result, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub Uuid);

impl FileId {
    pub fn new() -> Self {
        FileId(Uuid::new_v4())
    }

    /// Parse a caller-supplied id. Anything unparsable cannot name a record.
    pub fn parse(raw: &str) -> Result<Self> {
        Uuid::parse_str(raw)
            .map(FileId)
            .map_err(|_| StoreError::NotFound(raw.to_string()))
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Hex BLAKE3 digest of stored bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentAddress(pub String);

impl ContentAddress {
    pub fn of(data: &[u8]) -> Self {
        ContentAddress(blake3::hash(data).to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where on the ledger a state transition of a record was confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnChainRef {
    pub block_number: u64,
    pub transaction_hash: String,
    pub kind: CommitmentKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    pub name: String,
    pub size: u64,
    pub content_address: ContentAddress,
    #[serde(default)]
    pub content_type: ContentType,
    pub uploaded_at: DateTime<Utc>,
    pub download_token: CapabilityToken,
    pub delete_token: CapabilityToken,
    pub owner: String,
    pub on_chain_ref: Option<OnChainRef>,
    pub deleted: bool,
}

impl FileRecord {
    pub fn new(
        name: &str,
        owner: &str,
        size: u64,
        content_address: ContentAddress,
        content_type: ContentType,
        tokens: TokenPair,
    ) -> Self {
        Self {
            id: FileId::new(),
            name: name.to_string(),
            size,
            content_address,
            content_type,
            // Millisecond precision survives every serialization round trip.
            uploaded_at: Utc::now().trunc_subsecs(3),
            download_token: tokens.download,
            delete_token: tokens.delete,
            owner: owner.to_string(),
            on_chain_ref: None,
            deleted: false,
        }
    }

    /// The transition whose commitment describes the record as it stands now.
    pub fn logical_kind(&self) -> CommitmentKind {
        if self.deleted {
            CommitmentKind::Delete
        } else {
            CommitmentKind::Create
        }
    }

    /// Returns the record with `reference` applied, or `None` when the
    /// confirmation is stale for the record's current state.
    ///
    /// A create confirmation only lands on a live record that has no
    /// reference yet. A delete confirmation only lands on a live record and
    /// turns it into a tombstone. Confirmations arriving after the record was
    /// deleted are never applied, so a late create cannot resurrect it.
    pub fn apply_confirmation(&self, reference: OnChainRef) -> Option<FileRecord> {
        if self.deleted {
            return None;
        }

        let mut next = self.clone();
        match reference.kind {
            CommitmentKind::Create => {
                if self.on_chain_ref.is_some() {
                    return None;
                }
                next.on_chain_ref = Some(reference);
            }
            CommitmentKind::Delete => {
                next.deleted = true;
                next.on_chain_ref = Some(reference);
            }
        }
        Some(next)
    }

    pub fn public_view(&self) -> Result<ProvenanceView> {
        let payload = Commitment::for_record(self, self.logical_kind()).encode()?;
        Ok(ProvenanceView {
            id: self.id,
            name: self.name.clone(),
            size: self.size,
            content_address: self.content_address.clone(),
            content_type: self.content_type.clone(),
            uploaded_at: self.uploaded_at,
            owner: self.owner.clone(),
            on_chain_ref: self.on_chain_ref.clone(),
            deleted: self.deleted,
            commitment_digest: Commitment::digest(&payload),
        })
    }
}

/// Everything about a record that may be shown to anyone: no capability tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceView {
    pub id: FileId,
    pub name: String,
    pub size: u64,
    pub content_address: ContentAddress,
    pub content_type: ContentType,
    pub uploaded_at: DateTime<Utc>,
    pub owner: String,
    pub on_chain_ref: Option<OnChainRef>,
    pub deleted: bool,
    pub commitment_digest: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityIssuer;

    fn live_record() -> FileRecord {
        let tokens = CapabilityIssuer::new().issue().unwrap();
        FileRecord::new(
            "a.txt",
            "alice",
            10,
            ContentAddress::of(b"0123456789"),
            ContentType::default(),
            tokens,
        )
    }

    fn reference(kind: CommitmentKind, block_number: u64) -> OnChainRef {
        OnChainRef {
            block_number,
            transaction_hash: format!("0x{:064x}", block_number),
            kind,
        }
    }

    #[test]
    fn create_confirmation_applies_once() {
        let record = live_record();
        let anchored = record
            .apply_confirmation(reference(CommitmentKind::Create, 7))
            .expect("first create confirmation applies");
        assert_eq!(anchored.on_chain_ref.as_ref().unwrap().block_number, 7);

        assert!(anchored
            .apply_confirmation(reference(CommitmentKind::Create, 9))
            .is_none());
    }

    #[test]
    fn delete_confirmation_tombstones() {
        let record = live_record()
            .apply_confirmation(reference(CommitmentKind::Create, 1))
            .unwrap();
        let tombstone = record
            .apply_confirmation(reference(CommitmentKind::Delete, 2))
            .unwrap();
        assert!(tombstone.deleted);
        assert_eq!(tombstone.on_chain_ref.unwrap().kind, CommitmentKind::Delete);
    }

    #[test]
    fn late_create_does_not_resurrect_tombstone() {
        let tombstone = live_record()
            .apply_confirmation(reference(CommitmentKind::Delete, 5))
            .unwrap();
        assert!(tombstone
            .apply_confirmation(reference(CommitmentKind::Create, 6))
            .is_none());
        assert!(tombstone
            .apply_confirmation(reference(CommitmentKind::Delete, 6))
            .is_none());
    }

    #[test]
    fn public_view_carries_no_tokens() {
        let record = live_record();
        let view = serde_json::to_string(&record.public_view().unwrap()).unwrap();
        assert!(!view.contains(record.download_token.expose()));
        assert!(!view.contains(record.delete_token.expose()));
    }

    #[test]
    fn unparsable_id_is_not_found() {
        let err = FileId::parse("not-a-uuid").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
    }
}
