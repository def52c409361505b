//! Store error type

/// Errors surfaced by the persistence layer
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A conditional write observed a different version than expected.
    #[error("version conflict on key '{key}'")]
    VersionConflict { key: String },

    /// A `put` with [`crate::Expected::Absent`] found the key present.
    #[error("key '{key}' already exists")]
    AlreadyExists { key: String },

    /// Serialization of an entity failed.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend I/O failure.
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// A stored document could not be interpreted (corrupt file, bad
    /// counter payload).
    #[error("corrupt document at key '{key}': {detail}")]
    Corrupt { key: String, detail: String },

    /// A compare-and-swap retry loop gave up.
    #[error("update of key '{key}' still conflicted after {attempts} attempts")]
    RetriesExhausted { key: String, attempts: u32 },
}

impl StoreError {
    /// Conflicts are retryable by re-reading; everything else is not.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::VersionConflict { .. } | Self::AlreadyExists { .. }
        )
    }
}
