use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, ValueEnum};
use thiserror::Error;
use tracing::{info, warn};

use crate::anchor::{AnchorContext, ChainAnchor};
use crate::index::DiskIndex;
use crate::ledger::{InMemoryLedger, JsonRpcLedger, LedgerClient, LedgerError, RpcLedgerConfig};
use crate::service::MetadataService;
use crate::storage::DiskContentStore;
use crate::StoreError;

const RPC_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LedgerMode {
    /// Process-local ledger that confirms on the first poll.
    Memory,
    /// Ethereum-style JSON-RPC node.
    Rpc,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing setting: {0}")]
    MissingSetting(&'static str),
    #[error("ledger setup failed: {0}")]
    Ledger(#[from] LedgerError),
    #[error("store setup failed: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Args)]
pub struct StoreConfig {
    /// Directory holding content chunks and metadata records
    #[arg(long, env = "DECENTRAL_STORE_DATA_DIR", default_value = "./storage")]
    pub data_dir: PathBuf,

    #[arg(long, env = "DECENTRAL_STORE_LEDGER", value_enum, default_value_t = LedgerMode::Memory)]
    pub ledger: LedgerMode,

    #[arg(long, env = "ETHEREUM_RPC_URL", default_value = "http://localhost:8545")]
    pub rpc_url: String,

    /// Address of the anchoring contract
    #[arg(long, env = "CONTRACT_ADDRESS")]
    pub contract_address: Option<String>,

    /// Node-managed account that sends anchor transactions
    #[arg(long, env = "LEDGER_FROM_ADDRESS")]
    pub from_address: Option<String>,

    /// Delay between receipt polls, at least 1ms
    #[arg(
        long,
        env = "ANCHOR_POLL_INTERVAL_MS",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll_interval_ms: u64,

    #[arg(long, env = "ANCHOR_TIMEOUT_SECS", default_value_t = 30)]
    pub anchor_timeout_secs: u64,

    /// Number of objects kept in the read cache, 0 disables it
    #[arg(long, env = "CONTENT_CACHE_SIZE", default_value_t = 100)]
    pub cache_size: usize,

    #[arg(long, env = "DECENTRAL_STORE_JSON_LOGS")]
    pub json_logs: bool,
}

impl StoreConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn anchor_timeout(&self) -> Duration {
        Duration::from_secs(self.anchor_timeout_secs)
    }

    /// A fresh context bounded by the configured anchor timeout.
    pub fn anchor_context(&self) -> AnchorContext {
        AnchorContext::with_timeout(self.anchor_timeout())
    }

    fn ledger_client(&self) -> Result<Arc<dyn LedgerClient>, ConfigError> {
        match self.ledger {
            LedgerMode::Memory => {
                warn!("using in-memory ledger, anchors do not outlive this process");
                Ok(Arc::new(InMemoryLedger::new()))
            }
            LedgerMode::Rpc => {
                let contract_address = self
                    .contract_address
                    .clone()
                    .ok_or(ConfigError::MissingSetting("CONTRACT_ADDRESS"))?;
                let from_address = self
                    .from_address
                    .clone()
                    .ok_or(ConfigError::MissingSetting("LEDGER_FROM_ADDRESS"))?;
                let ledger = JsonRpcLedger::new(RpcLedgerConfig {
                    url: self.rpc_url.clone(),
                    contract_address,
                    from_address,
                    request_timeout: RPC_REQUEST_TIMEOUT,
                })?;
                Ok(Arc::new(ledger))
            }
        }
    }

    /// Build the content store, index and ledger client this configuration
    /// names and wire them into a service.
    pub async fn open_service(&self) -> Result<MetadataService, ConfigError> {
        let ledger = self.ledger_client()?;
        let content = DiskContentStore::new(&self.data_dir).await?.with_cache(self.cache_size);
        let index = DiskIndex::new(&self.data_dir).await?;

        info!(
            data_dir = %self.data_dir.display(),
            ledger = ?self.ledger,
            poll_interval_ms = self.poll_interval_ms,
            "metadata service ready"
        );
        Ok(MetadataService::new(
            Arc::new(content),
            Arc::new(index),
            ChainAnchor::new(ledger, self.poll_interval()),
        ))
    }
}
