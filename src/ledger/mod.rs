//! The append-only ledger the store anchors commitments on.

pub mod memory;
pub mod rpc;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::{ConfirmationPolicy, InMemoryLedger};
pub use rpc::{JsonRpcLedger, RpcLedgerConfig};

/// Handle returned by a successful submission: the transaction hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHandle(pub String);

impl fmt::Display for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerReceipt {
    pub block_number: u64,
    pub transaction_hash: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("transaction rejected: {0}")]
    Rejected(String),
    #[error("ledger transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn submit(&self, payload: &[u8]) -> Result<TxHandle, LedgerError>;

    /// `Ok(None)` means the transaction has no receipt yet.
    async fn receipt(&self, tx: &TxHandle) -> Result<Option<LedgerReceipt>, LedgerError>;
}
