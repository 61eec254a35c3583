use std::collections::HashMap;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use super::{LedgerClient, LedgerError, LedgerReceipt, TxHandle};

/// When a submitted transaction gets its receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationPolicy {
    /// On the first poll.
    Immediate,
    /// On the n-th poll.
    AfterPolls(u32),
    /// Once [`InMemoryLedger::release`] was called for it.
    Manual,
    Never,
}

struct PendingTx {
    payload: Vec<u8>,
    polls: u32,
    released: bool,
    receipt: Option<LedgerReceipt>,
}

struct LedgerState {
    policy: ConfirmationPolicy,
    next_block: u64,
    nonce: u64,
    txs: HashMap<TxHandle, PendingTx>,
    order: Vec<TxHandle>,
    reject_with: Option<String>,
    poll_failure: Option<String>,
}

/// A ledger that lives in process memory. Used for development and as a
/// controllable stand-in for the live ledger in tests.
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::with_policy(ConfirmationPolicy::Immediate)
    }

    pub fn with_policy(policy: ConfirmationPolicy) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                policy,
                next_block: 1,
                nonce: 0,
                txs: HashMap::new(),
                order: Vec::new(),
                reject_with: None,
                poll_failure: None,
            }),
        }
    }

    /// Every submission fails with `LedgerError::Rejected(reason)`.
    pub fn rejecting(mut self, reason: &str) -> Self {
        self.state.get_mut().reject_with = Some(reason.to_string());
        self
    }

    /// Every receipt poll fails with `LedgerError::Transport(reason)`.
    pub fn failing_polls(mut self, reason: &str) -> Self {
        self.state.get_mut().poll_failure = Some(reason.to_string());
        self
    }

    pub async fn set_policy(&self, policy: ConfirmationPolicy) {
        self.state.lock().await.policy = policy;
    }

    /// Allow a transaction to confirm under [`ConfirmationPolicy::Manual`].
    pub async fn release(&self, tx: &TxHandle) -> bool {
        match self.state.lock().await.txs.get_mut(tx) {
            Some(pending) => {
                pending.released = true;
                true
            }
            None => false,
        }
    }

    /// Submitted transactions in submission order with their payloads.
    pub async fn submitted(&self) -> Vec<(TxHandle, Vec<u8>)> {
        let state = self.state.lock().await;
        state
            .order
            .iter()
            .filter_map(|tx| state.txs.get(tx).map(|p| (tx.clone(), p.payload.clone())))
            .collect()
    }

    pub async fn poll_count(&self, tx: &TxHandle) -> u32 {
        self.state.lock().await.txs.get(tx).map_or(0, |p| p.polls)
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn submit(&self, payload: &[u8]) -> Result<TxHandle, LedgerError> {
        let mut state = self.state.lock().await;
        if let Some(reason) = &state.reject_with {
            return Err(LedgerError::Rejected(reason.clone()));
        }

        state.nonce += 1;
        let mut hasher = Sha256::new();
        hasher.update(payload);
        hasher.update(state.nonce.to_be_bytes());
        let tx = TxHandle(format!("0x{}", hex::encode(hasher.finalize())));

        state.txs.insert(
            tx.clone(),
            PendingTx {
                payload: payload.to_vec(),
                polls: 0,
                released: false,
                receipt: None,
            },
        );
        state.order.push(tx.clone());
        Ok(tx)
    }

    async fn receipt(&self, tx: &TxHandle) -> Result<Option<LedgerReceipt>, LedgerError> {
        let mut state = self.state.lock().await;
        if let Some(reason) = &state.poll_failure {
            return Err(LedgerError::Transport(reason.clone()));
        }

        let policy = state.policy;
        let next_block = state.next_block;
        let pending = state
            .txs
            .get_mut(tx)
            .ok_or_else(|| LedgerError::Rejected(format!("unknown transaction {}", tx)))?;

        if let Some(receipt) = &pending.receipt {
            return Ok(Some(receipt.clone()));
        }

        pending.polls += 1;
        let ready = match policy {
            ConfirmationPolicy::Immediate => true,
            ConfirmationPolicy::AfterPolls(n) => pending.polls >= n,
            ConfirmationPolicy::Manual => pending.released,
            ConfirmationPolicy::Never => false,
        };
        if !ready {
            return Ok(None);
        }

        let receipt = LedgerReceipt {
            block_number: next_block,
            transaction_hash: tx.0.clone(),
        };
        pending.receipt = Some(receipt.clone());
        state.next_block += 1;
        Ok(Some(receipt))
    }
}
