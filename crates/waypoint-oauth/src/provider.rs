//! Provider configuration for the OAuth bridge.
//!
//! The bridge is generic over its provider: everything provider-specific
//! is data in [`ProviderConfig`].  Two presets ship with the engine —
//! Google (form-encoded token endpoint, identity from a userinfo fetch)
//! and Notion (JSON token endpoint with Basic auth, identity from the
//! token response itself).

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{OAuthError, OAuthResult};

/// How the token endpoint wants the code exchange delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenAuthStyle {
    /// Form-encoded body carrying `client_id` and `client_secret`.
    FormBody,
    /// JSON body with client credentials in a Basic authorization header.
    BasicJson,
}

/// Where the user's identity comes from after the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    /// Fetch a profile from a userinfo endpoint with the access token.
    ProfileEndpoint {
        /// The userinfo URL to call.
        userinfo_url: String,
    },
    /// Read the identity out of the token response (workspace id).
    TokenResponse,
}

/// Everything the bridge needs to know about one provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider key used in routes and records (e.g. "google").
    pub name: String,
    /// Display name used on HTML pages (e.g. "Google").
    pub title: String,
    /// The OAuth client id.
    pub client_id: String,
    /// The OAuth client secret.
    pub client_secret: String,
    /// The authorization endpoint.
    pub auth_url: String,
    /// The token endpoint.
    pub token_url: String,
    /// Scopes to request (space-joined in the authorize URL).
    pub scopes: Vec<String>,
    /// Provider-specific extra query parameters on the authorize URL.
    pub extra_auth_params: Vec<(String, String)>,
    /// How the token endpoint authenticates the exchange.
    pub token_auth: TokenAuthStyle,
    /// How the identity is resolved after the exchange.
    pub identity: IdentitySource,
    /// Whether the authorize route serves a landing page (`true`) or a
    /// direct redirect (`false`).
    pub landing_page: bool,
}

impl ProviderConfig {
    /// The stock Google configuration: calendar + email scopes, offline
    /// access, identity from the userinfo endpoint.
    pub fn google(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            name: "google".to_string(),
            title: "Google".to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            scopes: vec![
                "https://www.googleapis.com/auth/calendar".to_string(),
                "https://www.googleapis.com/auth/userinfo.email".to_string(),
            ],
            extra_auth_params: vec![
                ("access_type".to_string(), "offline".to_string()),
                ("prompt".to_string(), "consent".to_string()),
            ],
            token_auth: TokenAuthStyle::FormBody,
            identity: IdentitySource::ProfileEndpoint {
                userinfo_url: "https://www.googleapis.com/oauth2/v2/userinfo".to_string(),
            },
            landing_page: true,
        }
    }

    /// The stock Notion configuration: workspace-scoped, Basic-auth JSON
    /// token endpoint, identity from the token response.
    pub fn notion(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            name: "notion".to_string(),
            title: "Notion".to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_url: "https://api.notion.com/v1/oauth/authorize".to_string(),
            token_url: "https://api.notion.com/v1/oauth/token".to_string(),
            scopes: vec![],
            extra_auth_params: vec![("owner".to_string(), "user".to_string())],
            token_auth: TokenAuthStyle::BasicJson,
            identity: IdentitySource::TokenResponse,
            landing_page: false,
        }
    }

    /// Whether the provider can actually run a flow.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty()
    }

    /// The callback URL for this provider under the given public base.
    #[must_use]
    pub fn redirect_uri(&self, base_url: &str) -> String {
        format!("{}/oauth/{}/callback", base_url.trim_end_matches('/'), self.name)
    }

    /// Build the authorization URL embedding the CSRF state token.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::UrlParse`] if `auth_url` is malformed and
    /// [`OAuthError::MissingClientId`] if the provider is unconfigured.
    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> OAuthResult<String> {
        if !self.is_configured() {
            return Err(OAuthError::MissingClientId {
                provider: self.name.clone(),
            });
        }

        let mut url = Url::parse(&self.auth_url)?;
        {
            let mut params = url.query_pairs_mut();
            params.append_pair("response_type", "code");
            params.append_pair("client_id", &self.client_id);
            params.append_pair("redirect_uri", redirect_uri);
            params.append_pair("state", state);

            if !self.scopes.is_empty() {
                params.append_pair("scope", &self.scopes.join(" "));
            }
            for (key, value) in &self.extra_auth_params {
                params.append_pair(key, value);
            }
        }

        Ok(url.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
