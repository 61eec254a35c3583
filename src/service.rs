//! File lifecycle: store content, mint capabilities, persist metadata and
//! anchor it on the ledger.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};

use crate::anchor::{AnchorContext, ChainAnchor};
use crate::capability::CapabilityIssuer;
use crate::index::MetadataIndex;
use crate::retry::{with_retry_if, RetryConfig};
use crate::storage::ContentStore;
use crate::{
    CommitmentKind, ContentAddress, ContentType, FileId, FileRecord, OnChainRef, ProvenanceView, Result,
    StoreError,
};

/// Result of a create. Content and tokens are valid either way; only an
/// anchored record has verifiable provenance.
#[derive(Debug)]
pub enum CreateOutcome {
    Anchored(FileRecord),
    Unanchored { record: FileRecord, reason: StoreError },
}

impl CreateOutcome {
    pub fn record(&self) -> &FileRecord {
        match self {
            CreateOutcome::Anchored(record) => record,
            CreateOutcome::Unanchored { record, .. } => record,
        }
    }

    pub fn is_anchored(&self) -> bool {
        matches!(self, CreateOutcome::Anchored(_))
    }

    pub fn reason(&self) -> Option<&StoreError> {
        match self {
            CreateOutcome::Anchored(_) => None,
            CreateOutcome::Unanchored { reason, .. } => Some(reason),
        }
    }
}

/// What the uploader gets back, the only place tokens are ever shown.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedFile {
    pub id: FileId,
    pub name: String,
    pub size: u64,
    pub content_address: ContentAddress,
    pub content_type: ContentType,
    pub uploaded_at: DateTime<Utc>,
    pub owner: String,
    pub download_token: String,
    pub delete_token: String,
    pub on_chain_ref: Option<OnChainRef>,
    pub anchored: bool,
    pub anchor_error: Option<String>,
}

impl From<&CreateOutcome> for CreatedFile {
    fn from(outcome: &CreateOutcome) -> Self {
        let record = outcome.record();
        Self {
            id: record.id,
            name: record.name.clone(),
            size: record.size,
            content_address: record.content_address.clone(),
            content_type: record.content_type.clone(),
            uploaded_at: record.uploaded_at,
            owner: record.owner.clone(),
            download_token: record.download_token.expose().to_string(),
            delete_token: record.delete_token.expose().to_string(),
            on_chain_ref: record.on_chain_ref.clone(),
            anchored: outcome.is_anchored(),
            anchor_error: outcome.reason().map(|e| e.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Download {
    pub name: String,
    pub content_type: ContentType,
    pub data: Vec<u8>,
}

pub struct MetadataService {
    content: Arc<dyn ContentStore>,
    index: Arc<dyn MetadataIndex>,
    anchor: ChainAnchor,
    issuer: CapabilityIssuer,
    conflict_retry: RetryConfig,
}

impl MetadataService {
    pub fn new(content: Arc<dyn ContentStore>, index: Arc<dyn MetadataIndex>, anchor: ChainAnchor) -> Self {
        Self {
            content,
            index,
            anchor,
            issuer: CapabilityIssuer::new(),
            conflict_retry: RetryConfig::conflict(),
        }
    }

    /// Store the content, persist its record and anchor it.
    ///
    /// An anchoring failure does not undo the upload: the record stays
    /// persisted without an on-chain reference and is returned as
    /// [`CreateOutcome::Unanchored`]. Anything failing before the record is
    /// persisted is a plain error.
    pub async fn create<R>(&self, ctx: &AnchorContext, name: &str, owner: &str, mut content: R) -> Result<CreateOutcome>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut data = Vec::new();
        content
            .read_to_end(&mut data)
            .await
            .map_err(|e| StoreError::StorageFailure(format!("failed to read upload: {}", e)))?;

        let address = self.content.put(&data).await?;
        let tokens = self.issuer.issue()?;
        let record = FileRecord::new(
            name,
            owner,
            data.len() as u64,
            address,
            ContentType::detect(&data),
            tokens,
        );
        self.index.put(&record).await?;
        info!(file_id = %record.id, size = record.size, address = %record.content_address, "file stored");

        let reference = match self.anchor.anchor(ctx, &record, CommitmentKind::Create).await {
            Ok(reference) => reference,
            Err(reason) => {
                warn!(file_id = %record.id, error = %reason, "file stored without on-chain reference");
                return Ok(CreateOutcome::Unanchored { record, reason });
            }
        };

        match self.apply_confirmation(&record.id, reference).await {
            Ok(anchored) => Ok(CreateOutcome::Anchored(anchored)),
            Err(reason) => {
                warn!(file_id = %record.id, error = %reason, "confirmed anchor could not be recorded");
                Ok(CreateOutcome::Unanchored { record, reason })
            }
        }
    }

    pub async fn read(&self, id: &FileId, download_token: &str) -> Result<Download> {
        let record = self.load_live(id).await?;
        if !CapabilityIssuer::verify(download_token, &record.download_token) {
            warn!(file_id = %id, "download token rejected");
            return Err(StoreError::Unauthorized(format!("invalid download token for {}", id)));
        }

        let data = self.content.get(&record.content_address).await?;
        debug!(file_id = %id, size = data.len(), "file read");
        Ok(Download {
            name: record.name,
            content_type: record.content_type,
            data,
        })
    }

    /// Anchor a tombstone and mark the record deleted. The record only
    /// counts as deleted once the tombstone is confirmed; every anchoring
    /// failure is returned to the caller.
    pub async fn delete(&self, ctx: &AnchorContext, id: &FileId, delete_token: &str) -> Result<OnChainRef> {
        let record = self.load_live(id).await?;
        if !CapabilityIssuer::verify(delete_token, &record.delete_token) {
            warn!(file_id = %id, "delete token rejected");
            return Err(StoreError::Unauthorized(format!("invalid delete token for {}", id)));
        }

        let reference = self.anchor.anchor(ctx, &record, CommitmentKind::Delete).await?;
        self.apply_confirmation(id, reference.clone()).await?;
        info!(file_id = %id, tx = %reference.transaction_hash, block = reference.block_number, "file deleted");
        Ok(reference)
    }

    /// Retry the create anchor of a record that was left unanchored.
    pub async fn reanchor(&self, ctx: &AnchorContext, id: &FileId) -> Result<OnChainRef> {
        let record = self.load_live(id).await?;
        if let Some(reference) = record.on_chain_ref {
            return Ok(reference);
        }

        let reference = self.anchor.anchor(ctx, &record, CommitmentKind::Create).await?;
        let anchored = self.apply_confirmation(id, reference).await?;
        anchored
            .on_chain_ref
            .ok_or_else(|| StoreError::StorageFailure(format!("anchor for {} was not recorded", id)))
    }

    /// Public metadata of a record, tombstones included.
    pub async fn provenance(&self, id: &FileId) -> Result<ProvenanceView> {
        self.index
            .get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?
            .public_view()
    }

    pub async fn list(&self) -> Result<Vec<ProvenanceView>> {
        self.index
            .list()
            .await?
            .iter()
            .map(FileRecord::public_view)
            .collect()
    }

    async fn load_live(&self, id: &FileId) -> Result<FileRecord> {
        match self.index.get(id).await? {
            Some(record) if !record.deleted => Ok(record),
            _ => Err(StoreError::NotFound(id.to_string())),
        }
    }

    /// Write a confirmed reference into the stored record with a conditional
    /// update against a fresh read. A lost race is retried once.
    ///
    /// A confirmation that no longer fits the record's state is discarded:
    /// after deletion it is reported as `NotFound`; a second create
    /// confirmation leaves the first reference in place.
    async fn apply_confirmation(&self, id: &FileId, reference: OnChainRef) -> Result<FileRecord> {
        with_retry_if(&self.conflict_retry, StoreError::is_conflict, || {
            let reference = reference.clone();
            async move {
                let current = self
                    .index
                    .get(id)
                    .await?
                    .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

                let Some(next) = current.apply_confirmation(reference.clone()) else {
                    if current.deleted {
                        warn!(
                            file_id = %id,
                            kind = ?reference.kind,
                            tx = %reference.transaction_hash,
                            "discarding confirmation for deleted record"
                        );
                        return Err(StoreError::NotFound(id.to_string()));
                    }
                    debug!(file_id = %id, tx = %reference.transaction_hash, "record already anchored");
                    return Ok(current);
                };

                if self.index.compare_and_swap(id, &current, &next).await? {
                    Ok(next)
                } else {
                    Err(StoreError::IndexConflict(id.to_string()))
                }
            }
        })
        .await
    }
}
