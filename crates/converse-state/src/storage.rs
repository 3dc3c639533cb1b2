//! Key-value storage contract backing the user and conversation scopes.
//!
//! The evaluator itself is pure in-memory computation; persistence is
//! confined to this collaborator. Writes carry the e-tag observed at
//! load time, and a mismatch surfaces as [`StorageError::EtagConflict`]
//! with no automatic retry — contention handling belongs to the host.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Errors from a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The stored e-tag no longer matches the one observed at load time.
    #[error("etag conflict for '{key}': expected {expected}, found {found}")]
    EtagConflict {
        /// The storage key that was written.
        key: String,
        /// The e-tag the writer observed at load time.
        expected: String,
        /// The e-tag currently stored.
        found: String,
    },

    /// Backend-specific failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// A stored value together with its current version tag.
#[derive(Clone, Debug, PartialEq)]
pub struct StoreItem {
    /// The stored JSON document.
    pub value: Value,
    /// Opaque version tag for optimistic concurrency.
    pub etag: String,
}

/// Key-value persistence with optimistic concurrency.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read the item stored under `key`, if any.
    async fn read(&self, key: &str) -> Result<Option<StoreItem>, StorageError>;

    /// Write `value` under `key` and return the new e-tag.
    ///
    /// When `etag` is `Some`, the write only succeeds if it matches the
    /// currently stored tag. `None` means the writer never observed an
    /// existing row and the write is unconditional.
    async fn write(
        &self,
        key: &str,
        value: &Value,
        etag: Option<&str>,
    ) -> Result<String, StorageError>;

    /// Delete the item stored under `key`. Missing keys are a no-op.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

struct MemoryEntry {
    value: Value,
    version: u64,
}

/// In-memory storage for testing and local development.
#[derive(Default)]
pub struct MemoryStorage {
    entries: tokio::sync::RwLock<HashMap<String, MemoryEntry>>,
}

impl MemoryStorage {
    /// Create a new in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn read(&self, key: &str) -> Result<Option<StoreItem>, StorageError> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).map(|e| StoreItem {
            value: e.value.clone(),
            etag: e.version.to_string(),
        }))
    }

    async fn write(
        &self,
        key: &str,
        value: &Value,
        etag: Option<&str>,
    ) -> Result<String, StorageError> {
        let mut entries = self.entries.write().await;
        let next = match (entries.get(key), etag) {
            (Some(existing), Some(expected)) => {
                let found = existing.version.to_string();
                if found != expected {
                    return Err(StorageError::EtagConflict {
                        key: key.to_string(),
                        expected: expected.to_string(),
                        found,
                    });
                }
                existing.version + 1
            }
            (Some(existing), None) => existing.version + 1,
            (None, _) => 1,
        };
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.clone(),
                version: next,
            },
        );
        Ok(next.to_string())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_read_missing() {
        let store = MemoryStorage::new();
        assert_eq!(store.read("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let store = MemoryStorage::new();
        let etag = store.write("k", &json!({"a": 1}), None).await.unwrap();

        let item = store.read("k").await.unwrap().unwrap();
        assert_eq!(item.value, json!({"a": 1}));
        assert_eq!(item.etag, etag);
    }

    #[tokio::test]
    async fn test_conditional_write_advances_etag() {
        let store = MemoryStorage::new();
        let first = store.write("k", &json!(1), None).await.unwrap();
        let second = store.write("k", &json!(2), Some(&first)).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_stale_etag_conflicts() {
        let store = MemoryStorage::new();
        let stale = store.write("k", &json!(1), None).await.unwrap();
        store.write("k", &json!(2), Some(&stale)).await.unwrap();

        let err = store.write("k", &json!(3), Some(&stale)).await.unwrap_err();
        assert!(matches!(err, StorageError::EtagConflict { .. }));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryStorage::new();
        store.write("k", &json!(1), None).await.unwrap();
        store.delete("k").await.unwrap();
        store.delete("k").await.unwrap();
        assert_eq!(store.read("k").await.unwrap(), None);
    }
}
