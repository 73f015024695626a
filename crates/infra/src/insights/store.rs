use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use libris_core::ExternalId;

use crate::store::StoreError;

/// Memo of generated insights, keyed by book.
#[async_trait]
pub trait InsightStore: Send + Sync {
    async fn get(&self, key: &ExternalId) -> Result<Option<String>, StoreError>;

    async fn put(&self, key: ExternalId, text: String) -> Result<(), StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> InsightStore for Arc<S>
where
    S: InsightStore + ?Sized,
{
    async fn get(&self, key: &ExternalId) -> Result<Option<String>, StoreError> {
        (**self).get(key).await
    }

    async fn put(&self, key: ExternalId, text: String) -> Result<(), StoreError> {
        (**self).put(key, text).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        (**self).clear().await
    }
}

/// Process-local insight memo. Unbounded; entries live until `clear`.
#[derive(Debug, Default)]
pub struct InMemoryInsightStore {
    inner: RwLock<HashMap<ExternalId, String>>,
}

impl InMemoryInsightStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StoreError {
    StoreError::storage("insight store lock poisoned")
}

#[async_trait]
impl InsightStore for InMemoryInsightStore {
    async fn get(&self, key: &ExternalId) -> Result<Option<String>, StoreError> {
        Ok(self.inner.read().map_err(|_| poisoned())?.get(key).cloned())
    }

    async fn put(&self, key: ExternalId, text: String) -> Result<(), StoreError> {
        self.inner.write().map_err(|_| poisoned())?.insert(key, text);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.inner.write().map_err(|_| poisoned())?.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_clear() {
        let store = InMemoryInsightStore::new();
        let key = ExternalId::new("dune");

        assert_eq!(store.get(&key).await.unwrap(), None);
        store.put(key.clone(), "spice".to_string()).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap().as_deref(), Some("spice"));

        store.clear().await.unwrap();
        assert!(store.is_empty());
    }
}
