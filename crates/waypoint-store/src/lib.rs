//! # waypoint-store
//!
//! Storage layer for the waypoint engine.
//!
//! Everything here is built on one small contract — [`KeyValueStore`]:
//! `get` / `put` (with TTL) / `delete` / atomic `take`.  The in-process
//! [`MemoryKv`] backend implements it on a concurrent map; typed stores
//! layer the engine's three persistence concerns on top:
//!
//! - [`StateStore`] — single-use, TTL-bound CSRF state tokens.
//! - [`CredentialStore`] — durable per-identity OAuth credential records.
//! - [`SessionStore`] — 30-day browser sessions plus cookie helpers.
//!
//! The `take` operation is required to be atomic per key, which is what
//! makes single-use token consumption race-free without any extra locks.

pub mod credentials;
pub mod error;
pub mod kv;
pub mod memory;
pub mod session;
pub mod state_token;

// ── re-exports ───────────────────────────────────────────────────────

pub use credentials::{CredentialStore, OAuthCredential};
pub use error::{StoreError, StoreResult};
pub use kv::KeyValueStore;
pub use memory::MemoryKv;
pub use session::{Session, SessionStore, session_cookie, session_id_from_headers};
pub use state_token::{DEFAULT_STATE_TTL, StateStore};
