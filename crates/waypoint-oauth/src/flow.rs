//! The per-provider OAuth bridge.
//!
//! Drives the authorization-code flow end to end:
//!
//! ```text
//! UNAUTHENTICATED → STATE_ISSUED → CALLBACK_RECEIVED → STATE_VERIFIED
//!   → TOKEN_EXCHANGED → PROFILE_FETCHED (optional) → PERSISTED → SUCCESS
//! ```
//!
//! State tokens are single-use: verification consumes the token
//! atomically, so a replayed callback can never validate twice.  The
//! token exchange, profile fetch, and persistence steps each run under
//! the bounded linear-backoff retry policy before a terminal error
//! surfaces.

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use waypoint_store::{CredentialStore, OAuthCredential, Session, SessionStore, StateStore};

use crate::error::{OAuthError, OAuthResult};
use crate::pages;
use crate::provider::{IdentitySource, ProviderConfig, TokenAuthStyle};
use crate::retry::{RetryPolicy, with_linear_backoff};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Query parameters a provider sends to the callback endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    /// The authorization code, on success.
    pub code: Option<String>,
    /// The state token issued at authorization time.
    pub state: Option<String>,
    /// Provider-reported error (e.g. "access_denied").
    pub error: Option<String>,
}

/// What the authorize route should respond with.
#[derive(Debug, Clone)]
pub enum AuthorizationRequest {
    /// Serve a landing page carrying the authorize link.
    Landing {
        /// The page HTML.
        html: String,
    },
    /// Redirect straight to the provider.
    Redirect {
        /// The provider authorize URL.
        url: String,
    },
}

/// The terminal success of a callback: who authenticated, plus the
/// session minted for them.
#[derive(Debug, Clone)]
pub struct CallbackSuccess {
    /// The provider that completed.
    pub provider: String,
    /// The resolved identity the credential record is keyed by.
    pub identity: String,
    /// Account email, when known.
    pub email: Option<String>,
    /// The freshly minted session.
    pub session: Session,
}

/// Raw token response shared across provider styles.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    scope: Option<String>,
    workspace_id: Option<String>,
    bot_id: Option<String>,
    owner: Option<TokenOwner>,
}

#[derive(Debug, Deserialize)]
struct TokenOwner {
    user: Option<TokenOwnerUser>,
}

#[derive(Debug, Deserialize)]
struct TokenOwnerUser {
    id: Option<String>,
}

/// Raw error response from a token endpoint.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Profile shape returned by userinfo endpoints.
#[derive(Debug, Deserialize)]
struct Profile {
    id: Option<String>,
    email: Option<String>,
    name: Option<String>,
}

// ---------------------------------------------------------------------------
// Bridge
// ---------------------------------------------------------------------------

/// One provider's OAuth flow, wired to the engine's stores.
#[derive(Clone)]
pub struct OAuthBridge {
    config: ProviderConfig,
    states: StateStore,
    credentials: CredentialStore,
    sessions: SessionStore,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl OAuthBridge {
    /// Create a bridge for one provider.
    pub fn new(
        config: ProviderConfig,
        states: StateStore,
        credentials: CredentialStore,
        sessions: SessionStore,
    ) -> Self {
        Self {
            config,
            states,
            credentials,
            sessions,
            client: reqwest::Client::new(),
            retry: RetryPolicy::default(),
        }
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The provider key this bridge serves.
    pub fn provider(&self) -> &str {
        &self.config.name
    }

    /// The provider configuration.
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Begin a flow: issue and persist a fresh single-use state token and
    /// emit the redirect/landing payload for the authorize route.
    ///
    /// Fails closed with [`OAuthError::MissingClientId`] when the
    /// provider is unconfigured.
    pub async fn build_authorization_request(
        &self,
        base_url: &str,
    ) -> OAuthResult<AuthorizationRequest> {
        if !self.config.is_configured() {
            warn!(provider = %self.config.name, "authorize requested but client id unset");
            return Err(OAuthError::MissingClientId {
                provider: self.config.name.clone(),
            });
        }

        let state = self.states.issue().await?;
        let redirect_uri = self.config.redirect_uri(base_url);
        let authorize_url = self.config.authorize_url(&redirect_uri, &state)?;

        info!(provider = %self.config.name, "authorization request issued");

        if self.config.landing_page {
            Ok(AuthorizationRequest::Landing {
                html: pages::landing_page(&self.config.title, &authorize_url),
            })
        } else {
            Ok(AuthorizationRequest::Redirect { url: authorize_url })
        }
    }

    /// Complete a flow from the provider's callback.
    ///
    /// A provider-reported error or missing code returns before the state
    /// token is touched, so those callbacks have no side effects.  State
    /// verification consumes the token atomically; of two callbacks
    /// racing on one token, exactly one proceeds.
    pub async fn handle_callback(
        &self,
        params: &CallbackParams,
        base_url: &str,
    ) -> OAuthResult<CallbackSuccess> {
        if let Some(reason) = &params.error {
            warn!(provider = %self.config.name, error = %reason, "provider reported an error");
            return Err(OAuthError::ProviderError {
                reason: reason.clone(),
            });
        }

        let Some(code) = params.code.as_deref() else {
            return Err(OAuthError::MissingCode);
        };

        let state = params.state.as_deref().unwrap_or("");
        if !self.states.consume(state).await? {
            warn!(provider = %self.config.name, "state token missing, expired, or replayed");
            return Err(OAuthError::StateInvalid);
        }

        info!(provider = %self.config.name, "state verified, exchanging code");

        let redirect_uri = self.config.redirect_uri(base_url);
        let tokens = with_linear_backoff(self.retry, "token exchange", || {
            self.request_token(code, &redirect_uri)
        })
        .await
        .map_err(|err| OAuthError::ExchangeFailed {
            step: "token exchange",
            attempts: err.attempts,
            reason: err.last_error.to_string(),
        })?;

        let (identity, email, name) = self.resolve_identity(&tokens).await?;

        let record = OAuthCredential {
            provider: self.config.name.clone(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            scope: tokens.scope,
            expires_in: tokens.expires_in,
            email: email.clone(),
            workspace_id: tokens.workspace_id,
            bot_id: tokens.bot_id,
            updated_at: Utc::now(),
        };

        let credentials = &self.credentials;
        let sessions = &self.sessions;
        let provider = self.config.name.as_str();
        let identity_ref = identity.as_str();
        let record_ref = &record;
        let name_ref = &name;
        let email_ref = &email;

        let session = with_linear_backoff(self.retry, "credential persistence", move || {
            async move {
                credentials.save(identity_ref, record_ref).await?;
                sessions
                    .create(provider, identity_ref, name_ref.clone(), email_ref.clone())
                    .await
            }
        })
        .await
        .map_err(|err| OAuthError::PersistenceFailed {
            attempts: err.attempts,
            reason: err.last_error.to_string(),
        })?;

        info!(provider = %self.config.name, "OAuth flow completed");

        Ok(CallbackSuccess {
            provider: self.config.name.clone(),
            identity,
            email,
            session,
        })
    }

    // -- Internal steps -----------------------------------------------------

    /// One token-exchange attempt against the provider's token endpoint.
    async fn request_token(&self, code: &str, redirect_uri: &str) -> OAuthResult<TokenResponse> {
        let request = match self.config.token_auth {
            TokenAuthStyle::FormBody => {
                let params = [
                    ("grant_type", "authorization_code"),
                    ("code", code),
                    ("redirect_uri", redirect_uri),
                    ("client_id", self.config.client_id.as_str()),
                    ("client_secret", self.config.client_secret.as_str()),
                ];
                self.client.post(&self.config.token_url).form(&params)
            }
            TokenAuthStyle::BasicJson => self
                .client
                .post(&self.config.token_url)
                .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
                .json(&serde_json::json!({
                    "grant_type": "authorization_code",
                    "code": code,
                    "redirect_uri": redirect_uri,
                })),
        };

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(response.json::<TokenResponse>().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            let reason = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => err.error_description.unwrap_or(err.error),
                Err(_) => format!("HTTP {status}: {body}"),
            };
            Err(OAuthError::ProviderError { reason })
        }
    }

    /// One profile-fetch attempt against a userinfo endpoint.
    async fn fetch_profile(&self, userinfo_url: &str, access_token: &str) -> OAuthResult<Profile> {
        let response = self
            .client
            .get(userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(response.json::<Profile>().await?)
        } else {
            Err(OAuthError::ProviderError {
                reason: format!("profile fetch returned HTTP {status}"),
            })
        }
    }

    /// Resolve the identity the credential record will be keyed by.
    async fn resolve_identity(
        &self,
        tokens: &TokenResponse,
    ) -> OAuthResult<(String, Option<String>, Option<String>)> {
        match &self.config.identity {
            IdentitySource::ProfileEndpoint { userinfo_url } => {
                let profile = with_linear_backoff(self.retry, "profile fetch", || {
                    self.fetch_profile(userinfo_url, &tokens.access_token)
                })
                .await
                .map_err(|err| OAuthError::ExchangeFailed {
                    step: "profile fetch",
                    attempts: err.attempts,
                    reason: err.last_error.to_string(),
                })?;

                let identity = profile
                    .email
                    .clone()
                    .or_else(|| profile.id.clone())
                    .ok_or_else(|| OAuthError::IdentityUnresolved {
                        provider: self.config.name.clone(),
                    })?;
                Ok((identity, profile.email, profile.name))
            }
            IdentitySource::TokenResponse => {
                let identity = tokens
                    .owner
                    .as_ref()
                    .and_then(|owner| owner.user.as_ref())
                    .and_then(|user| user.id.clone())
                    .or_else(|| tokens.workspace_id.clone())
                    .unwrap_or_else(|| format!("{}_user", self.config.name));
                Ok((identity, None, None))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use url::Url;
    use waypoint_store::MemoryKv;

    /// Bridge whose token endpoint is unroutable, so exchange attempts
    /// fail fast with a connection error.
    fn bridge(config: ProviderConfig) -> OAuthBridge {
        let kv: Arc<dyn waypoint_store::KeyValueStore> = Arc::new(MemoryKv::new());
        let mut config = config;
        config.token_url = "http://127.0.0.1:9/token".to_string();
        if let IdentitySource::ProfileEndpoint { userinfo_url } = &mut config.identity {
            *userinfo_url = "http://127.0.0.1:9/userinfo".to_string();
        }

        OAuthBridge::new(
            config,
            StateStore::new(Arc::clone(&kv)),
            CredentialStore::new(Arc::clone(&kv)),
            SessionStore::new(kv),
        )
        .with_retry(RetryPolicy {
            attempts: 2,
            base_delay: Duration::from_millis(1),
        })
    }

    fn state_from(request: &AuthorizationRequest) -> String {
        let url_str = match request {
            AuthorizationRequest::Redirect { url } => url.clone(),
            AuthorizationRequest::Landing { html } => {
                // Pull the href out of the landing page.
                let start = html.find("href=\"").unwrap() + 6;
                let end = html[start..].find('"').unwrap() + start;
                html[start..end].replace("&amp;", "&")
            }
        };
        let url = Url::parse(&url_str).unwrap();
        url.query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.to_string())
            .unwrap()
    }

    const BASE: &str = "http://127.0.0.1:8787";

    #[tokio::test]
    async fn authorize_fails_closed_without_client_id() {
        let bridge = bridge(ProviderConfig::google("", "secret"));
        let result = bridge.build_authorization_request(BASE).await;
        assert!(matches!(result, Err(OAuthError::MissingClientId { .. })));
    }

    #[tokio::test]
    async fn google_authorize_serves_landing_page() {
        let bridge = bridge(ProviderConfig::google("cid", "secret"));
        let request = bridge.build_authorization_request(BASE).await.unwrap();
        match &request {
            AuthorizationRequest::Landing { html } => {
                assert!(html.contains("Continue with Google"));
            }
            other => panic!("expected landing page, got {other:?}"),
        }
        assert_eq!(state_from(&request).len(), 43);
    }

    #[tokio::test]
    async fn notion_authorize_redirects() {
        let bridge = bridge(ProviderConfig::notion("cid", "secret"));
        let request = bridge.build_authorization_request(BASE).await.unwrap();
        match &request {
            AuthorizationRequest::Redirect { url } => {
                assert!(url.starts_with("https://api.notion.com/v1/oauth/authorize"));
                assert!(url.contains("owner=user"));
            }
            other => panic!("expected redirect, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn provider_error_returns_before_touching_state() {
        let bridge = bridge(ProviderConfig::google("cid", "secret"));
        let request = bridge.build_authorization_request(BASE).await.unwrap();
        let state = state_from(&request);

        let params = CallbackParams {
            code: Some("abc".to_string()),
            state: Some(state.clone()),
            error: Some("access_denied".to_string()),
        };
        let result = bridge.handle_callback(&params, BASE).await;
        assert!(matches!(result, Err(OAuthError::ProviderError { .. })));

        // No side effects: the state token is still consumable.
        let params = CallbackParams {
            code: Some("abc".to_string()),
            state: Some(state),
            error: None,
        };
        let result = bridge.handle_callback(&params, BASE).await;
        assert!(matches!(result, Err(OAuthError::ExchangeFailed { .. })));
    }

    #[tokio::test]
    async fn missing_code_is_rejected() {
        let bridge = bridge(ProviderConfig::google("cid", "secret"));
        let params = CallbackParams {
            code: None,
            state: Some("whatever".to_string()),
            error: None,
        };
        let result = bridge.handle_callback(&params, BASE).await;
        assert!(matches!(result, Err(OAuthError::MissingCode)));
    }

    #[tokio::test]
    async fn unknown_state_is_invalid() {
        let bridge = bridge(ProviderConfig::google("cid", "secret"));
        let params = CallbackParams {
            code: Some("abc".to_string()),
            state: Some("never-issued".to_string()),
            error: None,
        };
        let result = bridge.handle_callback(&params, BASE).await;
        assert!(matches!(result, Err(OAuthError::StateInvalid)));
    }

    #[tokio::test]
    async fn missing_state_is_invalid() {
        let bridge = bridge(ProviderConfig::google("cid", "secret"));
        let params = CallbackParams {
            code: Some("abc".to_string()),
            state: None,
            error: None,
        };
        let result = bridge.handle_callback(&params, BASE).await;
        assert!(matches!(result, Err(OAuthError::StateInvalid)));
    }

    #[tokio::test]
    async fn exchange_exhaustion_reports_attempts() {
        let bridge = bridge(ProviderConfig::google("cid", "secret"));
        let request = bridge.build_authorization_request(BASE).await.unwrap();
        let state = state_from(&request);

        let params = CallbackParams {
            code: Some("abc".to_string()),
            state: Some(state),
            error: None,
        };
        match bridge.handle_callback(&params, BASE).await {
            Err(OAuthError::ExchangeFailed { step, attempts, .. }) => {
                assert_eq!(step, "token exchange");
                assert_eq!(attempts, 2);
            }
            other => panic!("expected ExchangeFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn state_verifies_at_most_once() {
        let bridge = bridge(ProviderConfig::google("cid", "secret"));
        let request = bridge.build_authorization_request(BASE).await.unwrap();
        let state = state_from(&request);

        let params = CallbackParams {
            code: Some("abc".to_string()),
            state: Some(state),
            error: None,
        };

        // First callback gets past state verification (and then fails at
        // the unreachable token endpoint).
        let first = bridge.handle_callback(&params, BASE).await;
        assert!(matches!(first, Err(OAuthError::ExchangeFailed { .. })));

        // The replay never reaches the exchange.
        let second = bridge.handle_callback(&params, BASE).await;
        assert!(matches!(second, Err(OAuthError::StateInvalid)));
    }

    #[tokio::test]
    async fn racing_callbacks_verify_exactly_one() {
        let bridge = bridge(ProviderConfig::google("cid", "secret"));
        let request = bridge.build_authorization_request(BASE).await.unwrap();
        let state = state_from(&request);

        let mut handles = Vec::new();
        for _ in 0..2 {
            let bridge = bridge.clone();
            let state = state.clone();
            handles.push(tokio::spawn(async move {
                let params = CallbackParams {
                    code: Some("abc".to_string()),
                    state: Some(state),
                    error: None,
                };
                bridge.handle_callback(&params, BASE).await
            }));
        }

        let mut verified = 0;
        let mut replayed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Err(OAuthError::ExchangeFailed { .. }) => verified += 1,
                Err(OAuthError::StateInvalid) => replayed += 1,
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
        assert_eq!(verified, 1);
        assert_eq!(replayed, 1);
    }

    #[test]
    fn token_response_parses_google_shape() {
        let json = r#"{
            "access_token": "ya29.abc",
            "refresh_token": "1//xyz",
            "expires_in": 3599,
            "scope": "https://www.googleapis.com/auth/calendar",
            "token_type": "Bearer"
        }"#;
        let tokens: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(tokens.access_token, "ya29.abc");
        assert_eq!(tokens.refresh_token.as_deref(), Some("1//xyz"));
        assert_eq!(tokens.expires_in, Some(3599));
        assert!(tokens.workspace_id.is_none());
    }

    #[test]
    fn token_response_parses_notion_shape() {
        let json = r#"{
            "access_token": "secret_tok",
            "workspace_id": "ws-1",
            "bot_id": "bot-1",
            "owner": { "user": { "id": "u-1" } }
        }"#;
        let tokens: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(tokens.workspace_id.as_deref(), Some("ws-1"));
        assert_eq!(
            tokens.owner.unwrap().user.unwrap().id.as_deref(),
            Some("u-1")
        );
    }

    #[tokio::test]
    async fn notion_identity_prefers_owner_user_id() {
        let bridge = bridge(ProviderConfig::notion("cid", "secret"));

        let tokens: TokenResponse = serde_json::from_str(
            r#"{ "access_token": "t", "workspace_id": "ws-1",
                 "owner": { "user": { "id": "u-1" } } }"#,
        )
        .unwrap();
        let (identity, _, _) = bridge.resolve_identity(&tokens).await.unwrap();
        assert_eq!(identity, "u-1");

        let tokens: TokenResponse =
            serde_json::from_str(r#"{ "access_token": "t", "workspace_id": "ws-1" }"#).unwrap();
        let (identity, _, _) = bridge.resolve_identity(&tokens).await.unwrap();
        assert_eq!(identity, "ws-1");

        let tokens: TokenResponse =
            serde_json::from_str(r#"{ "access_token": "t" }"#).unwrap();
        let (identity, _, _) = bridge.resolve_identity(&tokens).await.unwrap();
        assert_eq!(identity, "notion_user");
    }
}
