//! Error types for the OAuth bridge.
//!
//! Variants map one-to-one onto the terminal states of the callback
//! state machine, so the web layer can pick a status code and error page
//! without inspecting message strings.

use thiserror::Error;

/// Alias for `Result<T, OAuthError>`.
pub type OAuthResult<T> = Result<T, OAuthError>;

/// Errors raised by the OAuth bridge.
#[derive(Debug, Error)]
pub enum OAuthError {
    /// The provider's client id is not configured; the flow fails closed.
    #[error("{provider} OAuth client id is not configured")]
    MissingClientId {
        /// The provider that is unconfigured.
        provider: String,
    },

    /// The provider reported an error on the callback (e.g. the user
    /// denied access).
    #[error("authentication error: {reason}")]
    ProviderError {
        /// The provider-reported error value.
        reason: String,
    },

    /// The callback carried no authorization code.
    #[error("authorization code is missing")]
    MissingCode,

    /// The state token was missing, expired, or already consumed.
    #[error("invalid state parameter")]
    StateInvalid,

    /// A retried step (token exchange or profile fetch) exhausted its
    /// attempts.
    #[error("{step} failed after {attempts} attempts: {reason}")]
    ExchangeFailed {
        /// Which step exhausted its retries.
        step: &'static str,
        /// How many attempts were made.
        attempts: u32,
        /// The last attempt's error.
        reason: String,
    },

    /// Persisting the credential record exhausted its attempts.
    #[error("failed to persist credentials after {attempts} attempts: {reason}")]
    PersistenceFailed {
        /// How many attempts were made.
        attempts: u32,
        /// The last attempt's error.
        reason: String,
    },

    /// The provider's responses contained nothing usable as an identity.
    #[error("could not resolve an identity from the {provider} response")]
    IdentityUnresolved {
        /// The provider whose response lacked an identity.
        provider: String,
    },

    /// An HTTP request to the provider failed.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A provider URL in the configuration is malformed.
    #[error("url parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// The state/credential store failed.
    #[error("store error: {0}")]
    Store(#[from] waypoint_store::StoreError),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
