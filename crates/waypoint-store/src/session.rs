//! Browser sessions minted after a completed OAuth flow.
//!
//! Sessions are KV-backed with a 30-day TTL and carried to the client as
//! an `HttpOnly` cookie.  A bearer token in the `Authorization` header is
//! accepted equivalently.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::kv::KeyValueStore;

/// Key prefix for stored sessions.
const SESSION_PREFIX: &str = "session:";

/// Session lifetime: thirty days.
const SESSION_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// A logged-in session bound to a provider identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session id (UUID v4), also the cookie value.
    pub id: String,
    /// The provider that authenticated this session.
    pub provider: String,
    /// The resolved identity the session belongs to.
    pub identity: String,
    /// Display name, when the provider profile exposes one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Account email, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session expires.
    pub expires_at: DateTime<Utc>,
}

/// Store for [`Session`] records over a [`KeyValueStore`].
#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    /// Create a session store over the given backend.
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Mint and persist a new session for an authenticated identity.
    pub async fn create(
        &self,
        provider: &str,
        identity: &str,
        name: Option<String>,
        email: Option<String>,
    ) -> StoreResult<Session> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            provider: provider.to_string(),
            identity: identity.to_string(),
            name,
            email,
            created_at: now,
            expires_at: now + ChronoDuration::seconds(SESSION_TTL_SECS as i64),
        };

        let key = format!("{SESSION_PREFIX}{}", session.id);
        self.kv
            .put(
                &key,
                serde_json::to_value(&session)?,
                Some(std::time::Duration::from_secs(SESSION_TTL_SECS)),
            )
            .await?;

        debug!(provider = provider, "session created");
        Ok(session)
    }

    /// Look up a session by id.  Expired sessions read as `None`.
    pub async fn get(&self, session_id: &str) -> StoreResult<Option<Session>> {
        if session_id.is_empty() {
            return Ok(None);
        }
        let key = format!("{SESSION_PREFIX}{session_id}");
        match self.kv.get(&key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Remove a session.
    pub async fn delete(&self, session_id: &str) -> StoreResult<()> {
        let key = format!("{SESSION_PREFIX}{session_id}");
        self.kv.delete(&key).await
    }
}

/// Build the `Set-Cookie` value carrying a session id.
#[must_use]
pub fn session_cookie(session_id: &str) -> String {
    format!(
        "session_id={session_id}; HttpOnly; Secure; SameSite=Lax; Max-Age={SESSION_TTL_SECS}; Path=/"
    )
}

/// Extract a session id from request headers: the `session_id` cookie
/// first, then a `Bearer` token in the `Authorization` header.
#[must_use]
pub fn session_id_from_headers(cookie: Option<&str>, authorization: Option<&str>) -> Option<String> {
    if let Some(cookie) = cookie {
        for pair in cookie.split(';') {
            if let Some((key, value)) = pair.trim().split_once('=')
                && key == "session_id"
                && !value.is_empty()
            {
                return Some(value.to_string());
            }
        }
    }

    if let Some(auth) = authorization
        && let Some(token) = auth.strip_prefix("Bearer ")
        && !token.is_empty()
    {
        return Some(token.to_string());
    }

    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryKv;

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(MemoryKv::new()))
    }

    #[tokio::test]
    async fn create_and_get_session() {
        let sessions = store();
        let created = sessions
            .create(
                "google",
                "user@example.com",
                Some("User".to_string()),
                Some("user@example.com".to_string()),
            )
            .await
            .unwrap();

        let fetched = sessions.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert!(fetched.expires_at > fetched.created_at);
    }

    #[tokio::test]
    async fn get_unknown_session_returns_none() {
        let sessions = store();
        assert!(sessions.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_empty_id_returns_none() {
        let sessions = store();
        assert!(sessions.get("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_removes_session() {
        let sessions = store();
        let created = sessions
            .create("notion", "workspace-1", None, None)
            .await
            .unwrap();

        sessions.delete(&created.id).await.unwrap();
        assert!(sessions.get(&created.id).await.unwrap().is_none());
    }

    #[test]
    fn cookie_carries_attributes() {
        let cookie = session_cookie("abc-123");
        assert!(cookie.starts_with("session_id=abc-123;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
    }

    #[test]
    fn session_id_from_cookie_header() {
        let id = session_id_from_headers(Some("theme=dark; session_id=s-1"), None);
        assert_eq!(id.as_deref(), Some("s-1"));
    }

    #[test]
    fn session_id_from_bearer_token() {
        let id = session_id_from_headers(None, Some("Bearer tok-9"));
        assert_eq!(id.as_deref(), Some("tok-9"));
    }

    #[test]
    fn cookie_takes_precedence_over_bearer() {
        let id = session_id_from_headers(Some("session_id=cookie-id"), Some("Bearer bearer-id"));
        assert_eq!(id.as_deref(), Some("cookie-id"));
    }

    #[test]
    fn no_headers_yields_no_session_id() {
        assert!(session_id_from_headers(None, None).is_none());
        assert!(session_id_from_headers(Some("other=1"), Some("Basic abc")).is_none());
    }
}
