//! Versioned key-value persistence for the caseflow back-office
//!
//! Every entity lives under its own key (`order/{id}`, `lead/{id}`, ...),
//! stored as a [`Document`] carrying a version token. Writes are conditional:
//! a writer states what version it read, and a mismatch surfaces as
//! [`StoreError::VersionConflict`] instead of silently clobbering a
//! concurrent update. Sequence numbers (confirmation codes) come from
//! [`KvStore::increment`], an atomic counter primitive, rather than a
//! max-scan over existing rows.
//!
//! Two backends ship here: [`MemoryStore`] for tests and ephemeral use, and
//! [`FileStore`] persisting one JSON file per key.

pub mod collection;
pub mod error;
pub mod file;
pub mod memory;

use async_trait::async_trait;

pub use collection::{Collection, MAX_CAS_ATTEMPTS};
pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;

/// A stored value plus its version token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Monotonic per-key version, starting at 1 on first write.
    pub version: u64,
    /// Serialized entity (JSON in both shipped backends).
    pub bytes: Vec<u8>,
}

/// Precondition for a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    /// Unconditional; last writer wins.
    Any,
    /// The key must not exist yet.
    Absent,
    /// The key must currently be at exactly this version.
    Version(u64),
}

/// Key-value store with compare-and-swap writes and atomic counters.
///
/// Keys are `{namespace}/{id}` paths; [`KvStore::scan`] enumerates a
/// namespace. Implementations must apply each operation atomically with
/// respect to the others.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a document.
    async fn get(&self, key: &str) -> Result<Option<Document>, StoreError>;

    /// Conditionally write a document, returning the new version.
    ///
    /// # Errors
    /// [`StoreError::VersionConflict`] when `expected` does not match the
    /// current state of the key.
    async fn put(&self, key: &str, bytes: Vec<u8>, expected: Expected)
        -> Result<u64, StoreError>;

    /// Conditionally delete a key. Returns `false` when the key was absent
    /// (and `expected` allowed that).
    async fn delete(&self, key: &str, expected: Expected) -> Result<bool, StoreError>;

    /// All documents whose key starts with `prefix`, in key order.
    async fn scan(&self, prefix: &str) -> Result<Vec<(String, Document)>, StoreError>;

    /// Atomically bump a named counter and return the new value (first call
    /// returns 1).
    async fn increment(&self, counter: &str) -> Result<u64, StoreError>;
}
