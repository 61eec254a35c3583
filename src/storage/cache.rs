use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::ContentAddress;

/// Read-through cache of whole objects keyed by content address.
pub struct CacheManager {
    cache: Arc<Mutex<LruCache<ContentAddress, Arc<Vec<u8>>>>>,
}

impl CacheManager {
    pub fn new(cache_size: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    pub async fn get(&self, address: &ContentAddress) -> Option<Arc<Vec<u8>>> {
        let mut cache = self.cache.lock().await;
        cache.get(address).cloned()
    }

    pub async fn put(&self, address: ContentAddress, data: Arc<Vec<u8>>) {
        let mut cache = self.cache.lock().await;
        cache.put(address, data);
    }

    pub async fn len(&self) -> usize {
        self.cache.lock().await.len()
    }
}
