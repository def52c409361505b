//! File-backed store backend
//!
//! One JSON file per key under a data directory, `{root}/{namespace}/{id}.json`,
//! each carrying its version token in-file so conditional writes survive a
//! process restart. A single async mutex serializes mutations; this backend
//! targets a single back-office process, not multi-process sharing.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StoreError;
use crate::{Document, Expected, KvStore};

#[derive(Debug, Serialize, Deserialize)]
struct FileDoc {
    version: u64,
    value: serde_json::Value,
}

/// Persistent [`KvStore`] writing one JSON document per key.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    guard: Mutex<()>,
}

impl FileStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            guard: Mutex::new(()),
        })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        if key.is_empty()
            || key.split('/').any(|part| {
                part.is_empty()
                    || part == ".."
                    || !part
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
            })
        {
            return Err(StoreError::Corrupt {
                key: key.to_string(),
                detail: "key is not a safe relative path".to_string(),
            });
        }
        Ok(self.root.join(format!("{key}.json")))
    }

    async fn read_doc(&self, key: &str) -> Result<Option<(FileDoc, PathBuf)>, StoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(raw) => {
                let doc: FileDoc =
                    serde_json::from_slice(&raw).map_err(|e| StoreError::Corrupt {
                        key: key.to_string(),
                        detail: e.to_string(),
                    })?;
                Ok(Some((doc, path)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_doc(&self, path: &Path, doc: &FileDoc) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Write-then-rename so a crash never leaves a torn document.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(doc)?).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    fn doc_to_document(doc: &FileDoc) -> Result<Document, StoreError> {
        Ok(Document {
            version: doc.version,
            bytes: serde_json::to_vec(&doc.value)?,
        })
    }

    fn check_expected(
        key: &str,
        current: Option<u64>,
        expected: Expected,
    ) -> Result<(), StoreError> {
        match (expected, current) {
            (Expected::Any, _) => Ok(()),
            (Expected::Absent, None) => Ok(()),
            (Expected::Absent, Some(_)) => Err(StoreError::AlreadyExists {
                key: key.to_string(),
            }),
            (Expected::Version(v), Some(cur)) if cur == v => Ok(()),
            (Expected::Version(_), _) => Err(StoreError::VersionConflict {
                key: key.to_string(),
            }),
        }
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Document>, StoreError> {
        let _held = self.guard.lock().await;
        match self.read_doc(key).await? {
            Some((doc, _)) => Ok(Some(Self::doc_to_document(&doc)?)),
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        expected: Expected,
    ) -> Result<u64, StoreError> {
        let _held = self.guard.lock().await;
        let current = self.read_doc(key).await?;
        Self::check_expected(key, current.as_ref().map(|(d, _)| d.version), expected)?;
        let version = current.as_ref().map_or(1, |(d, _)| d.version + 1);
        let value: serde_json::Value = serde_json::from_slice(&bytes)?;
        let path = self.path_for(key)?;
        self.write_doc(&path, &FileDoc { version, value }).await?;
        debug!(key, version, "file store put");
        Ok(version)
    }

    async fn delete(&self, key: &str, expected: Expected) -> Result<bool, StoreError> {
        let _held = self.guard.lock().await;
        let current = self.read_doc(key).await?;
        Self::check_expected(key, current.as_ref().map(|(d, _)| d.version), expected)?;
        match current {
            Some((_, path)) => {
                tokio::fs::remove_file(path).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<(String, Document)>, StoreError> {
        let _held = self.guard.lock().await;
        let (namespace, rest) = match prefix.split_once('/') {
            Some((ns, rest)) => (ns, rest),
            None => (prefix, ""),
        };
        let dir = self.root.join(namespace);
        let mut rows = Vec::new();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(rows),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stem) = name.strip_suffix(".json") else {
                continue;
            };
            if !stem.starts_with(rest) {
                continue;
            }
            let key = format!("{namespace}/{stem}");
            if let Some((doc, _)) = self.read_doc(&key).await? {
                rows.push((key, Self::doc_to_document(&doc)?));
            }
        }
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(rows)
    }

    async fn increment(&self, counter: &str) -> Result<u64, StoreError> {
        let _held = self.guard.lock().await;
        let current = self.read_doc(counter).await?;
        let (next, version) = match &current {
            None => (1, 1),
            Some((doc, _)) => {
                let prev = doc.value.as_u64().ok_or_else(|| StoreError::Corrupt {
                    key: counter.to_string(),
                    detail: "counter payload is not a u64".to_string(),
                })?;
                (prev + 1, doc.version + 1)
            }
        };
        let path = self.path_for(counter)?;
        self.write_doc(
            &path,
            &FileDoc {
                version,
                value: serde_json::Value::from(next),
            },
        )
        .await?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_traversal_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let err = store.get("../etc/passwd").await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
        let err = store.get("order//x").await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn versions_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::open(dir.path()).await.unwrap();
            store
                .put("order/a", b"{\"n\":1}".to_vec(), Expected::Absent)
                .await
                .unwrap();
            store
                .put("order/a", b"{\"n\":2}".to_vec(), Expected::Version(1))
                .await
                .unwrap();
            store.increment("seq/code").await.unwrap();
        }

        let store = FileStore::open(dir.path()).await.unwrap();
        let doc = store.get("order/a").await.unwrap().unwrap();
        assert_eq!(doc.version, 2);
        let err = store
            .put("order/a", b"{}".to_vec(), Expected::Version(1))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.increment("seq/code").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn scan_lists_namespace_in_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        for key in ["lead/b", "lead/a", "order/x"] {
            store
                .put(key, b"{}".to_vec(), Expected::Absent)
                .await
                .unwrap();
        }
        let rows = store.scan("lead/").await.unwrap();
        let keys: Vec<_> = rows.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["lead/a", "lead/b"]);
    }
}
