//! Document store abstraction.
//!
//! The sync pipeline only needs three operations from the store: upsert one
//! document, read one document and read many documents in a single batch.
//! [`MemoryStore`] is an in-process implementation used for local runs and
//! tests.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{DeckSyncError, Result};

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// A document's state as returned by a batched read.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub key: String,
    /// `None` when no document exists at `key`.
    pub data: Option<Value>,
}

impl Snapshot {
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    /// Decode the document body into a new `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let data = self.data.as_ref().ok_or_else(|| DeckSyncError::Decode {
            key: self.key.clone(),
            reason: "document does not exist".into(),
        })?;
        T::deserialize(data).map_err(|e| DeckSyncError::Decode {
            key: self.key.clone(),
            reason: e.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// DocumentStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create or overwrite the document at `collection/key`.
    async fn set(&self, collection: &str, key: &str, doc: Value) -> Result<()>;

    /// Read one document.
    async fn get(&self, collection: &str, key: &str) -> Result<Snapshot>;

    /// Read many documents in one round trip. Returns one snapshot per key,
    /// in the order requested.
    async fn get_all(&self, collection: &str, keys: &[String]) -> Result<Vec<Snapshot>>;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, HashMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in `collection`.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|c| c.get(collection).map_or(0, |docs| docs.len()))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn poisoned() -> DeckSyncError {
        DeckSyncError::Store("memory store lock poisoned".into())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn set(&self, collection: &str, key: &str, doc: Value) -> Result<()> {
        let mut collections = self.collections.write().map_err(|_| Self::poisoned())?;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), doc);
        Ok(())
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Snapshot> {
        let collections = self.collections.read().map_err(|_| Self::poisoned())?;
        Ok(Snapshot {
            key: key.to_string(),
            data: collections.get(collection).and_then(|c| c.get(key)).cloned(),
        })
    }

    async fn get_all(&self, collection: &str, keys: &[String]) -> Result<Vec<Snapshot>> {
        let collections = self.collections.read().map_err(|_| Self::poisoned())?;
        let docs = collections.get(collection);
        Ok(keys
            .iter()
            .map(|key| Snapshot {
                key: key.clone(),
                data: docs.and_then(|c| c.get(key)).cloned(),
            })
            .collect())
    }
}
