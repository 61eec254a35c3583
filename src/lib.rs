pub mod anchor;
pub mod capability;
pub mod chunk;
pub mod config;
pub mod error;
pub mod index;
pub mod ledger;
pub mod retry;
pub mod service;
pub mod storage;
pub mod telemetry;

mod types;

pub use anchor::{AnchorContext, ChainAnchor};
pub use error::{ErrorKind, Result, StoreError, TimeoutCause};
pub use service::{CreateOutcome, CreatedFile, Download, MetadataService};
pub use types::*;
