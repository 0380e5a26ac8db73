//! In-memory [`KeyValueStore`] backed by [`DashMap`].
//!
//! TTL handling is lazy: each entry records its expiry instant, reads
//! treat expired entries as absent and evict them on the way out.  The
//! atomicity of [`KeyValueStore::take`] comes directly from
//! `DashMap::remove`, which removes and returns the entry under the
//! shard's write lock.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;
use tracing::trace;

use crate::error::StoreResult;
use crate::kv::KeyValueStore;

/// A single stored entry with an optional expiry instant.
#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Process-local key/value store.
///
/// Cheaply cloneable (`Arc`-backed) and `Send + Sync`.
#[derive(Clone, Default)]
pub struct MemoryKv {
    inner: Arc<DashMap<String, Entry>>,
}

impl MemoryKv {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries, counting not-yet-evicted expired ones.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the store holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKv {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let now = Utc::now();

        let expired = match self.inner.get(key) {
            Some(entry) if entry.is_expired(now) => true,
            Some(entry) => return Ok(Some(entry.value.clone())),
            None => return Ok(None),
        };

        if expired {
            // Evict lazily; the entry may already be gone, which is fine.
            self.inner.remove(key);
            trace!(key = key, "expired entry evicted on read");
        }
        Ok(None)
    }

    async fn put(&self, key: &str, value: Value, ttl: Option<Duration>) -> StoreResult<()> {
        let expires_at = ttl.map(|ttl| {
            Utc::now() + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero())
        });
        self.inner
            .insert(key.to_string(), Entry { value, expires_at });
        trace!(key = key, ttl = ?ttl, "entry stored");
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.inner.remove(key);
        Ok(())
    }

    async fn take(&self, key: &str) -> StoreResult<Option<Value>> {
        // DashMap::remove is atomic per key: of two racing callers exactly
        // one receives the entry.
        let removed = self.inner.remove(key);

        match removed {
            Some((_, entry)) if entry.is_expired(Utc::now()) => {
                trace!(key = key, "expired entry consumed as absent");
                Ok(None)
            }
            Some((_, entry)) => Ok(Some(entry.value)),
            None => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
