//! Submit a commitment to the ledger and wait for it to become final.
//!
//! One [`AnchorAttempt`] moves through
//! `Pending -> Submitted -> Confirmed` or `Pending -> Submitted -> Failed`
//! (submission errors go straight from `Pending` to `Failed`). Submission is
//! never retried here. While waiting for a receipt, "not yet available" polls
//! are retried on a fixed interval until the caller's deadline passes or its
//! cancellation token fires; every wait races both, so a give-up is noticed
//! without sitting out a further poll interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::ledger::{LedgerClient, LedgerError, TxHandle};
use crate::{Commitment, CommitmentKind, FileId, FileRecord, OnChainRef, Result, StoreError, TimeoutCause};

/// Caller-controlled bounds on how long an anchor may wait.
#[derive(Debug, Clone)]
pub struct AnchorContext {
    deadline: Instant,
    cancel: CancellationToken,
}

impl AnchorContext {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorFailure {
    Submission(LedgerError),
    Receipt { tx: TxHandle, error: LedgerError },
    Timeout { tx: TxHandle, cause: TimeoutCause },
}

impl From<AnchorFailure> for StoreError {
    fn from(failure: AnchorFailure) -> Self {
        match failure {
            AnchorFailure::Submission(error) | AnchorFailure::Receipt { error, .. } => {
                StoreError::AnchorRejected(error)
            }
            AnchorFailure::Timeout { tx, cause } => StoreError::AnchorTimeout {
                transaction_hash: tx.0,
                cause,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorState {
    Pending,
    Submitted(TxHandle),
    Confirmed(OnChainRef),
    Failed(AnchorFailure),
}

impl AnchorState {
    fn name(&self) -> &'static str {
        match self {
            AnchorState::Pending => "pending",
            AnchorState::Submitted(_) => "submitted",
            AnchorState::Confirmed(_) => "confirmed",
            AnchorState::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AnchorState::Confirmed(_) | AnchorState::Failed(_))
    }
}

#[derive(Debug)]
pub struct AnchorAttempt {
    file_id: FileId,
    kind: CommitmentKind,
    payload: Vec<u8>,
    state: AnchorState,
}

impl AnchorAttempt {
    fn new(file_id: FileId, kind: CommitmentKind, payload: Vec<u8>) -> Self {
        Self {
            file_id,
            kind,
            payload,
            state: AnchorState::Pending,
        }
    }

    fn transition(&mut self, next: AnchorState) {
        debug!(
            file_id = %self.file_id,
            kind = ?self.kind,
            from = self.state.name(),
            to = next.name(),
            "anchor state transition"
        );
        self.state = next;
    }

    pub fn state(&self) -> &AnchorState {
        &self.state
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_result(self) -> Result<OnChainRef> {
        match self.state {
            AnchorState::Confirmed(reference) => Ok(reference),
            AnchorState::Failed(failure) => Err(failure.into()),
            AnchorState::Pending | AnchorState::Submitted(_) => Err(StoreError::StorageFailure(
                format!("anchor for {} did not finish", self.file_id),
            )),
        }
    }
}

#[derive(Clone)]
pub struct ChainAnchor {
    ledger: Arc<dyn LedgerClient>,
    poll_interval: Duration,
}

impl ChainAnchor {
    pub fn new(ledger: Arc<dyn LedgerClient>, poll_interval: Duration) -> Self {
        Self {
            ledger,
            poll_interval,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub async fn anchor(
        &self,
        ctx: &AnchorContext,
        record: &FileRecord,
        kind: CommitmentKind,
    ) -> Result<OnChainRef> {
        self.attempt(ctx, record, kind).await?.into_result()
    }

    /// Drive one attempt to a terminal state. Only a payload that cannot be
    /// encoded is an `Err`; ledger outcomes are reported through the state.
    pub async fn attempt(
        &self,
        ctx: &AnchorContext,
        record: &FileRecord,
        kind: CommitmentKind,
    ) -> Result<AnchorAttempt> {
        let payload = Commitment::for_record(record, kind).encode()?;
        let mut attempt = AnchorAttempt::new(record.id, kind, payload);

        let tx = match self.ledger.submit(attempt.payload()).await {
            Ok(tx) => tx,
            Err(error) => {
                warn!(file_id = %record.id, kind = ?kind, %error, "anchor submission rejected");
                attempt.transition(AnchorState::Failed(AnchorFailure::Submission(error)));
                return Ok(attempt);
            }
        };
        attempt.transition(AnchorState::Submitted(tx.clone()));

        let outcome = self.await_receipt(ctx, &tx, kind).await;
        match &outcome {
            AnchorState::Confirmed(reference) => info!(
                file_id = %record.id,
                kind = ?kind,
                tx = %reference.transaction_hash,
                block = reference.block_number,
                "anchor confirmed"
            ),
            AnchorState::Failed(failure) => {
                warn!(file_id = %record.id, kind = ?kind, tx = %tx, ?failure, "anchor failed")
            }
            _ => {}
        }
        attempt.transition(outcome);
        Ok(attempt)
    }

    async fn await_receipt(&self, ctx: &AnchorContext, tx: &TxHandle, kind: CommitmentKind) -> AnchorState {
        let timed_out = |cause| {
            AnchorState::Failed(AnchorFailure::Timeout {
                tx: tx.clone(),
                cause,
            })
        };

        loop {
            let poll = tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => return timed_out(TimeoutCause::Cancelled),
                result = self.ledger.receipt(tx) => result,
                _ = sleep_until(ctx.deadline) => return timed_out(TimeoutCause::DeadlineElapsed),
            };

            match poll {
                Ok(Some(receipt)) => {
                    return AnchorState::Confirmed(OnChainRef {
                        block_number: receipt.block_number,
                        transaction_hash: receipt.transaction_hash,
                        kind,
                    })
                }
                Ok(None) => trace!(tx = %tx, "receipt not yet available"),
                Err(error) => {
                    return AnchorState::Failed(AnchorFailure::Receipt {
                        tx: tx.clone(),
                        error,
                    })
                }
            }

            tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => return timed_out(TimeoutCause::Cancelled),
                _ = sleep_until(ctx.deadline) => return timed_out(TimeoutCause::DeadlineElapsed),
                _ = sleep(self.poll_interval) => {}
            }
        }
    }
}
