use std::fmt;

use thiserror::Error;

use crate::ledger::LedgerError;

/// Why a confirmation wait ended without a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutCause {
    DeadlineElapsed,
    Cancelled,
}

impl fmt::Display for TimeoutCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutCause::DeadlineElapsed => f.write_str("deadline elapsed"),
            TimeoutCause::Cancelled => f.write_str("cancelled"),
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Storage error: {0}")]
    StorageFailure(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Anchor confirmation for {transaction_hash} not received: {cause}")]
    AnchorTimeout {
        transaction_hash: String,
        cause: TimeoutCause,
    },
    #[error("Anchor rejected: {0}")]
    AnchorRejected(#[from] LedgerError),
    #[error("Index conflict: {0}")]
    IndexConflict(String),
}

/// The closed set of failure classes a caller can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    StorageFailure,
    AnchorTimeout,
    AnchorRejected,
    IndexConflict,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::Unauthorized(_) => ErrorKind::Unauthorized,
            StoreError::StorageFailure(_) | StoreError::Io(_) | StoreError::Serialization(_) => {
                ErrorKind::StorageFailure
            }
            StoreError::AnchorTimeout { .. } => ErrorKind::AnchorTimeout,
            StoreError::AnchorRejected(_) => ErrorKind::AnchorRejected,
            StoreError::IndexConflict(_) => ErrorKind::IndexConflict,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::IndexConflict
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::StorageFailure => "storage_failure",
            ErrorKind::AnchorTimeout => "anchor_timeout",
            ErrorKind::AnchorRejected => "anchor_rejected",
            ErrorKind::IndexConflict => "index_conflict",
        };
        f.write_str(name)
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
