//! # waypoint-routing
//!
//! The routing half of the waypoint engine: a versioned table mapping
//! intents to matching metadata and dispatch targets, and the scorer that
//! selects one intent for a piece of free text.
//!
//! The table is produced offline by a scenario generator and read here as
//! a JSON artifact.  [`RuleStore`] caches the parsed table process-wide
//! with explicit invalidation; [`matcher::match_intent`] is a pure
//! function over the table, so it stays trivially unit-testable.

pub mod error;
pub mod matcher;
pub mod store;
pub mod table;

// ── re-exports ───────────────────────────────────────────────────────

pub use error::{RoutingError, RoutingResult};
pub use matcher::{MatchResult, match_intent, score_rule};
pub use store::{IntentSummary, RuleStore, StoreStatus};
pub use table::{RoutingRule, RoutingTable, RulePaths, TableMetadata};
