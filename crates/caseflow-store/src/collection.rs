//! Typed namespace view over a [`KvStore`]
//!
//! A [`Collection`] binds a namespace (`order`, `lead`, ...) to an entity
//! type and handles JSON (de)serialization plus the compare-and-swap retry
//! loop for read-modify-write updates.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::StoreError;
use crate::{Expected, KvStore};

/// Bounded retries for [`Collection::update`]; conflicts past this surface
/// as [`StoreError::RetriesExhausted`].
pub const MAX_CAS_ATTEMPTS: u32 = 8;

/// Typed accessor for one entity namespace.
pub struct Collection<T> {
    store: Arc<dyn KvStore>,
    namespace: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            namespace: self.namespace,
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>, namespace: &'static str) -> Self {
        Self {
            store,
            namespace,
            _marker: PhantomData,
        }
    }

    fn key(&self, id: &str) -> String {
        format!("{}/{id}", self.namespace)
    }

    /// Insert a brand-new entity; the id must be unused.
    pub async fn put_new(&self, id: &str, value: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(value)?;
        self.store
            .put(&self.key(id), bytes, Expected::Absent)
            .await?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<T>, StoreError> {
        Ok(self.get_versioned(id).await?.map(|(value, _)| value))
    }

    /// Read an entity together with its version token, for manual
    /// compare-and-swap flows.
    pub async fn get_versioned(&self, id: &str) -> Result<Option<(T, u64)>, StoreError> {
        let key = self.key(id);
        match self.store.get(&key).await? {
            None => Ok(None),
            Some(doc) => {
                let value = serde_json::from_slice(&doc.bytes)?;
                Ok(Some((value, doc.version)))
            }
        }
    }

    /// Conditional write at a version observed via [`Self::get_versioned`].
    pub async fn put_version(
        &self,
        id: &str,
        value: &T,
        expected_version: u64,
    ) -> Result<u64, StoreError> {
        let bytes = serde_json::to_vec(value)?;
        self.store
            .put(&self.key(id), bytes, Expected::Version(expected_version))
            .await
    }

    /// Read-modify-write with bounded conflict retries.
    ///
    /// Returns `Ok(None)` when the entity does not exist. The closure may
    /// run more than once; keep it free of side effects.
    pub async fn update<F>(&self, id: &str, mut mutate: F) -> Result<Option<T>, StoreError>
    where
        F: FnMut(&mut T) + Send,
    {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let Some((mut value, version)) = self.get_versioned(id).await? else {
                return Ok(None);
            };
            mutate(&mut value);
            match self.put_version(id, &value, version).await {
                Ok(_) => return Ok(Some(value)),
                Err(e) if e.is_conflict() => {
                    warn!(
                        namespace = self.namespace,
                        id, attempt, "update conflicted, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Err(StoreError::RetriesExhausted {
            key: self.key(id),
            attempts: MAX_CAS_ATTEMPTS,
        })
    }

    /// Unconditional delete. Returns `false` when the id was absent.
    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.store.delete(&self.key(id), Expected::Any).await
    }

    /// Every entity in the namespace, in key order.
    pub async fn list(&self) -> Result<Vec<T>, StoreError> {
        let prefix = format!("{}/", self.namespace);
        let rows = self.store.scan(&prefix).await?;
        rows.into_iter()
            .map(|(_, doc)| serde_json::from_slice(&doc.bytes).map_err(StoreError::from))
            .collect()
    }
}
