//! Durable per-user OAuth credential records.
//!
//! A record is keyed by the identity the provider resolved (an email for
//! Google-style providers, a workspace id for Notion-style ones).  Records
//! are overwritten on re-authentication and never expire on their own.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreResult;
use crate::kv::KeyValueStore;

/// Key prefix for stored credential records.
const USER_PREFIX: &str = "oauth_user_";

/// Tokens and identity details persisted after a completed OAuth flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthCredential {
    /// Which provider issued the tokens (e.g. "google", "notion").
    pub provider: String,
    /// The access token used to authenticate API requests.
    pub access_token: String,
    /// Refresh token, when the provider issues one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Space-separated scopes granted by the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Access-token lifetime in seconds, as reported by the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    /// Account email, when the provider exposes one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Workspace id, for workspace-scoped providers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    /// Bot/integration id, for workspace-scoped providers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_id: Option<String>,
    /// When this record was last written.
    pub updated_at: DateTime<Utc>,
}

/// Store for [`OAuthCredential`] records over a [`KeyValueStore`].
#[derive(Clone)]
pub struct CredentialStore {
    kv: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    /// Create a credential store over the given backend.
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Persist a credential record, replacing any previous record for the
    /// same identity.  No TTL: records live until explicitly overwritten.
    pub async fn save(&self, identity: &str, record: &OAuthCredential) -> StoreResult<()> {
        let key = format!("{USER_PREFIX}{identity}");
        self.kv
            .put(&key, serde_json::to_value(record)?, None)
            .await?;
        debug!(provider = %record.provider, "credential record saved");
        Ok(())
    }

    /// Load the credential record for an identity, if one exists.
    pub async fn load(&self, identity: &str) -> StoreResult<Option<OAuthCredential>> {
        let key = format!("{USER_PREFIX}{identity}");
        match self.kv.get(&key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryKv;

    fn record(token: &str) -> OAuthCredential {
        OAuthCredential {
            provider: "google".to_string(),
            access_token: token.to_string(),
            refresh_token: Some("refresh_1".to_string()),
            scope: Some("calendar email".to_string()),
            expires_in: Some(3600),
            email: Some("user@example.com".to_string()),
            workspace_id: None,
            bot_id: None,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let store = CredentialStore::new(Arc::new(MemoryKv::new()));
        let rec = record("tok_a");

        store.save("user@example.com", &rec).await.unwrap();
        let loaded = store.load("user@example.com").await.unwrap().unwrap();
        assert_eq!(loaded, rec);
    }

    #[tokio::test]
    async fn load_missing_returns_none() {
        let store = CredentialStore::new(Arc::new(MemoryKv::new()));
        assert!(store.load("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reauth_overwrites_previous_record() {
        let store = CredentialStore::new(Arc::new(MemoryKv::new()));

        store.save("id", &record("first")).await.unwrap();
        store.save("id", &record("second")).await.unwrap();

        let loaded = store.load("id").await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "second");
    }

    #[tokio::test]
    async fn identities_are_isolated() {
        let store = CredentialStore::new(Arc::new(MemoryKv::new()));

        store.save("a@example.com", &record("tok_a")).await.unwrap();
        store.save("b@example.com", &record("tok_b")).await.unwrap();

        let a = store.load("a@example.com").await.unwrap().unwrap();
        let b = store.load("b@example.com").await.unwrap().unwrap();
        assert_eq!(a.access_token, "tok_a");
        assert_eq!(b.access_token, "tok_b");
    }
}
