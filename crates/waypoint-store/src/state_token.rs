//! Single-use CSRF state tokens for the OAuth authorization flow.
//!
//! A state token binds an authorization request to its callback.  Tokens
//! are random, TTL-bound, and consumed atomically on verification: a token
//! that validated one callback can never validate a second one.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use ring::rand::{SecureRandom, SystemRandom};
use serde_json::json;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::kv::KeyValueStore;

/// Key prefix for stored state tokens.
const STATE_PREFIX: &str = "oauth_state_";

/// Entropy of a state token in bytes (before base64url encoding).
const STATE_TOKEN_BYTES: usize = 32;

/// Default token lifetime: five minutes.
pub const DEFAULT_STATE_TTL: Duration = Duration::from_secs(300);

/// Issues and consumes single-use state tokens over a [`KeyValueStore`].
#[derive(Clone)]
pub struct StateStore {
    kv: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl StateStore {
    /// Create a state store with the default five-minute token TTL.
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            ttl: DEFAULT_STATE_TTL,
        }
    }

    /// Override the token TTL.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Issue a fresh state token and persist it with the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Entropy`] if the system CSPRNG fails.
    pub async fn issue(&self) -> StoreResult<String> {
        let rng = SystemRandom::new();
        let mut bytes = [0u8; STATE_TOKEN_BYTES];
        rng.fill(&mut bytes).map_err(|_| StoreError::Entropy)?;
        let token = URL_SAFE_NO_PAD.encode(bytes);

        let key = format!("{STATE_PREFIX}{token}");
        self.kv
            .put(
                &key,
                json!({ "created_at": Utc::now().timestamp() }),
                Some(self.ttl),
            )
            .await?;

        debug!(ttl_secs = self.ttl.as_secs(), "state token issued");
        Ok(token)
    }

    /// Consume a state token.
    ///
    /// Returns `true` exactly once per issued, unexpired token.  The
    /// consume is an atomic get-and-delete on the key/value layer, so two
    /// callbacks racing on the same token see exactly one success.
    pub async fn consume(&self, token: &str) -> StoreResult<bool> {
        if token.is_empty() {
            return Ok(false);
        }

        let key = format!("{STATE_PREFIX}{token}");
        let taken = self.kv.take(&key).await?;

        let valid = taken.is_some();
        debug!(valid = valid, "state token consumed");
        Ok(valid)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
