//! In-memory store backend
//!
//! `BTreeMap` behind a `parking_lot::RwLock`; scans come back in key order.
//! Counters share the keyspace under `seq/` with a plain decimal payload so
//! they survive a round-trip through the same `Document` shape as entities.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::StoreError;
use crate::{Document, Expected, KvStore};

/// Ephemeral [`KvStore`] used by tests and the demo configuration.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Document>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents (counters included).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

fn check_expected(
    key: &str,
    current: Option<&Document>,
    expected: Expected,
) -> Result<(), StoreError> {
    match (expected, current) {
        (Expected::Any, _) => Ok(()),
        (Expected::Absent, None) => Ok(()),
        (Expected::Absent, Some(_)) => Err(StoreError::AlreadyExists {
            key: key.to_string(),
        }),
        (Expected::Version(v), Some(doc)) if doc.version == v => Ok(()),
        (Expected::Version(_), _) => Err(StoreError::VersionConflict {
            key: key.to_string(),
        }),
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        expected: Expected,
    ) -> Result<u64, StoreError> {
        let mut entries = self.entries.write();
        check_expected(key, entries.get(key), expected)?;
        let version = entries.get(key).map_or(1, |doc| doc.version + 1);
        entries.insert(key.to_string(), Document { version, bytes });
        Ok(version)
    }

    async fn delete(&self, key: &str, expected: Expected) -> Result<bool, StoreError> {
        let mut entries = self.entries.write();
        check_expected(key, entries.get(key), expected)?;
        Ok(entries.remove(key).is_some())
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<(String, Document)>, StoreError> {
        let entries = self.entries.read();
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn increment(&self, counter: &str) -> Result<u64, StoreError> {
        let mut entries = self.entries.write();
        let next = match entries.get(counter) {
            None => 1,
            Some(doc) => {
                let text = std::str::from_utf8(&doc.bytes).map_err(|e| StoreError::Corrupt {
                    key: counter.to_string(),
                    detail: e.to_string(),
                })?;
                text.parse::<u64>().map_err(|e| StoreError::Corrupt {
                    key: counter.to_string(),
                    detail: e.to_string(),
                })? + 1
            }
        };
        let version = entries.get(counter).map_or(1, |doc| doc.version + 1);
        entries.insert(
            counter.to_string(),
            Document {
                version,
                bytes: next.to_string().into_bytes(),
            },
        );
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_absent_then_conflict() {
        let store = MemoryStore::new();
        let v1 = store
            .put("order/a", b"{}".to_vec(), Expected::Absent)
            .await
            .unwrap();
        assert_eq!(v1, 1);

        let err = store
            .put("order/a", b"{}".to_vec(), Expected::Absent)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn cas_detects_lost_update() {
        let store = MemoryStore::new();
        store
            .put("lead/a", b"1".to_vec(), Expected::Absent)
            .await
            .unwrap();

        // Two writers read version 1; only the first CAS lands.
        let v2 = store
            .put("lead/a", b"2".to_vec(), Expected::Version(1))
            .await
            .unwrap();
        assert_eq!(v2, 2);
        let err = store
            .put("lead/a", b"3".to_vec(), Expected::Version(1))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn scan_is_prefix_bounded_and_ordered() {
        let store = MemoryStore::new();
        for key in ["order/b", "order/a", "lead/z", "orderx"] {
            store
                .put(key, b"{}".to_vec(), Expected::Absent)
                .await
                .unwrap();
        }
        let rows = store.scan("order/").await.unwrap();
        let keys: Vec<_> = rows.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["order/a", "order/b"]);
    }

    #[tokio::test]
    async fn increment_is_sequential_from_one() {
        let store = MemoryStore::new();
        for expect in 1..=4u64 {
            assert_eq!(store.increment("seq/code").await.unwrap(), expect);
        }
    }

    #[tokio::test]
    async fn delete_with_version_guard() {
        let store = MemoryStore::new();
        store
            .put("code/UNLOCK-001", b"{}".to_vec(), Expected::Absent)
            .await
            .unwrap();
        let err = store
            .delete("code/UNLOCK-001", Expected::Version(9))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(store
            .delete("code/UNLOCK-001", Expected::Version(1))
            .await
            .unwrap());
        assert!(!store.delete("code/UNLOCK-001", Expected::Any).await.unwrap());
    }
}
