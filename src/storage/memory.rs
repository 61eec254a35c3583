use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::ContentStore;
use crate::{ContentAddress, Result, StoreError};

/// Content store held entirely in memory.
#[derive(Default)]
pub struct MemoryContentStore {
    objects: RwLock<HashMap<ContentAddress, Vec<u8>>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, data: &[u8]) -> Result<ContentAddress> {
        let address = ContentAddress::of(data);
        self.objects
            .write()
            .await
            .entry(address.clone())
            .or_insert_with(|| data.to_vec());
        Ok(address)
    }

    async fn get(&self, address: &ContentAddress) -> Result<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(address)
            .cloned()
            .ok_or_else(|| StoreError::StorageFailure(format!("content {} not found", address)))
    }
}
