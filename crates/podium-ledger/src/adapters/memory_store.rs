//! In-memory object store.

use crate::domain::{Document, LedgerError};
use crate::ports::ObjectStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Object store held in a map.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<String, Document>>,
}

impl InMemoryObjectStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// True when nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, key: &str) -> Result<Option<Document>, LedgerError> {
        Ok(self.objects.read().get(key).cloned())
    }

    async fn put(&self, key: &str, document: Document) -> Result<(), LedgerError> {
        self.objects.write().insert(key.to_string(), document);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = InMemoryObjectStore::new();
        assert_eq!(store.get("live").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_replaces() {
        let store = InMemoryObjectStore::new();
        store.put("live", document(json!({"ID": "a"}))).await.unwrap();
        store.put("live", document(json!({"ID": "b"}))).await.unwrap();
        let doc = store.get("live").await.unwrap().unwrap();
        assert_eq!(doc["ID"], json!("b"));
        assert_eq!(store.len(), 1);
    }
}
