//! The key/value contract every waypoint store backend satisfies.
//!
//! The engine only ever needs four operations: `get`, `put` (with an
//! optional TTL), `delete`, and `take`.  `take` is the load-bearing one —
//! an atomic get-and-delete that lets single-use tokens be consumed
//! race-free: of two concurrent `take` calls on the same key, exactly one
//! observes the value.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreResult;

/// Uniform key/value interface over JSON values.
///
/// Implementations must guarantee that `take` is atomic per key: two
/// concurrent `take` calls for the same key yield the value to exactly one
/// caller.  Entries written with a TTL read as absent once expired.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Look up a value by key.  Expired entries read as `None`.
    async fn get(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Store a value under a key, optionally bounded by a time-to-live.
    async fn put(&self, key: &str, value: Value, ttl: Option<Duration>) -> StoreResult<()>;

    /// Remove a key.  Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Atomically remove a key and return its value, or `None` if the key
    /// was absent or expired.
    async fn take(&self, key: &str) -> StoreResult<Option<Value>>;
}
