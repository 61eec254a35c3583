//! Live ledger over Ethereum-style JSON-RPC.
//!
//! Transactions are sent with `eth_sendTransaction` from an account the node
//! manages, so the store never holds signing keys. The commitment payload is
//! the transaction's `data` field, addressed to the anchoring contract.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{LedgerClient, LedgerError, LedgerReceipt, TxHandle};

#[derive(Debug, Clone)]
pub struct RpcLedgerConfig {
    pub url: String,
    pub contract_address: String,
    pub from_address: String,
    pub request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: String,
    block_number: Option<String>,
    status: Option<String>,
}

pub struct JsonRpcLedger {
    http: reqwest::Client,
    config: RpcLedgerConfig,
    next_id: AtomicU64,
}

impl JsonRpcLedger {
    pub fn new(config: RpcLedgerConfig) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LedgerError::Transport(format!("client init: {}", e)))?;
        Ok(Self {
            http,
            config,
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.config.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(format!("{}: {}", method, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LedgerError::Transport(format!("{}: HTTP {}", method, status)));
        }

        let envelope: RpcResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::Transport(format!("{}: invalid response: {}", method, e)))?;

        if let Some(error) = envelope.error {
            return Err(LedgerError::Rejected(format!("{} (code {})", error.message, error.code)));
        }

        serde_json::from_value(envelope.result.unwrap_or(Value::Null))
            .map_err(|e| LedgerError::Transport(format!("{}: unexpected result: {}", method, e)))
    }
}

#[async_trait]
impl LedgerClient for JsonRpcLedger {
    async fn submit(&self, payload: &[u8]) -> Result<TxHandle, LedgerError> {
        let params = json!([{
            "from": self.config.from_address,
            "to": self.config.contract_address,
            "data": format!("0x{}", hex::encode(payload)),
        }]);
        let hash: String = self.call("eth_sendTransaction", params).await?;
        debug!(tx = %hash, "transaction submitted");
        Ok(TxHandle(hash))
    }

    async fn receipt(&self, tx: &TxHandle) -> Result<Option<LedgerReceipt>, LedgerError> {
        let receipt: Option<RpcReceipt> = self
            .call("eth_getTransactionReceipt", json!([tx.0]))
            .await?;

        let Some(receipt) = receipt else {
            return Ok(None);
        };
        // Some nodes report pending transactions with a null block.
        let Some(block_number) = receipt.block_number else {
            return Ok(None);
        };

        if receipt.status.as_deref() == Some("0x0") {
            return Err(LedgerError::Rejected(format!("transaction {} reverted", tx)));
        }

        Ok(Some(LedgerReceipt {
            block_number: parse_quantity(&block_number)?,
            transaction_hash: receipt.transaction_hash,
        }))
    }
}

fn parse_quantity(raw: &str) -> Result<u64, LedgerError> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    u64::from_str_radix(digits, 16)
        .map_err(|_| LedgerError::Transport(format!("invalid block number {:?}", raw)))
}
