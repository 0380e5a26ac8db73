//! Cached access to the routing-rules artifact.
//!
//! [`RuleStore`] owns the artifact path and a process-wide cache slot.
//! The table is parsed once and shared as an `Arc`; `clear_cache` forces a
//! reload on the next access.  Concurrent cold-start loads may race to
//! populate the slot, which is benign — parsing the same artifact is
//! idempotent.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{RoutingError, RoutingResult};
use crate::table::{RoutingRule, RoutingTable};

/// A priority-sorted, read-only view of one enabled rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentSummary {
    /// The intent key.
    pub intent: String,
    /// Category the intent belongs to.
    pub category: String,
    /// Human-readable title.
    pub title: String,
    /// Human-readable description.
    pub description: String,
    /// Trigger keywords.
    pub triggers: Vec<String>,
    /// Rule priority.
    pub priority: i64,
}

/// Rule-store health as reported by [`RuleStore::status`].
#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    /// "ready" when the table loads, "error" otherwise.
    pub status: &'static str,
    /// Artifact version, when loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Artifact generation timestamp, when loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated: Option<String>,
    /// Scenario count reported by the generator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_scenarios: Option<u64>,
    /// Number of enabled rules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled_scenarios: Option<usize>,
    /// Categories present in the table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    /// Configured fallback intent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_intent: Option<String>,
    /// Whether the cache slot was populated before this call.
    pub cache_loaded: bool,
    /// Error detail when `status == "error"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Owned, injectable access point for the routing table.
///
/// Share via `Arc` and pass by reference to the matcher and dispatcher.
pub struct RuleStore {
    path: PathBuf,
    cache: RwLock<Option<Arc<RoutingTable>>>,
}

impl RuleStore {
    /// Create a store reading from the given artifact path.  Nothing is
    /// loaded until the first [`RuleStore::load`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
        }
    }

    /// The artifact path this store reads from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the routing table, reading and parsing the artifact on first
    /// access and serving the cached `Arc` afterwards.
    ///
    /// # Errors
    ///
    /// [`RoutingError::ConfigNotFound`] when the artifact is absent,
    /// [`RoutingError::Parse`] when it cannot be parsed.
    pub async fn load(&self) -> RoutingResult<Arc<RoutingTable>> {
        if let Some(table) = self.cache.read().await.as_ref() {
            return Ok(Arc::clone(table));
        }

        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(RoutingError::ConfigNotFound {
                    path: self.path.clone(),
                });
            }
            Err(err) => return Err(err.into()),
        };

        let table = Arc::new(RoutingTable::from_json(&content)?);

        info!(
            path = %self.path.display(),
            version = %table.metadata.version,
            rules = table.rules.len(),
            "routing table loaded"
        );

        // A concurrent loader may have populated the slot meanwhile; both
        // parsed the same artifact, so either result is fine to keep.
        let mut slot = self.cache.write().await;
        let table = slot.get_or_insert_with(|| table);
        Ok(Arc::clone(table))
    }

    /// Drop the cached table so the next access re-reads the artifact.
    pub async fn clear_cache(&self) {
        *self.cache.write().await = None;
        debug!("routing table cache cleared");
    }

    /// Look up an enabled rule by intent key.
    ///
    /// # Errors
    ///
    /// [`RoutingError::UnknownIntent`] for absent or disabled intents.
    pub async fn rule(&self, intent: &str) -> RoutingResult<RoutingRule> {
        let table = self.load().await?;
        match table.get(intent) {
            Some(rule) if rule.enabled => Ok(rule.clone()),
            _ => Err(RoutingError::UnknownIntent {
                intent: intent.to_string(),
            }),
        }
    }

    /// All enabled intents, priority descending (intent key breaks ties).
    pub async fn available_intents(&self) -> RoutingResult<Vec<IntentSummary>> {
        let table = self.load().await?;
        let mut intents: Vec<IntentSummary> = table
            .enabled_rules()
            .map(|(intent, rule)| IntentSummary {
                intent: intent.clone(),
                category: rule.category.clone(),
                title: rule.title.clone(),
                description: rule.description.clone(),
                triggers: rule.triggers.clone(),
                priority: rule.priority,
            })
            .collect();

        intents.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.intent.cmp(&b.intent)));
        Ok(intents)
    }

    /// Enabled intents within one category, priority descending.
    pub async fn intents_by_category(&self, category: &str) -> RoutingResult<Vec<IntentSummary>> {
        let mut intents = self.available_intents().await?;
        intents.retain(|summary| summary.category == category);
        Ok(intents)
    }

    /// Report store health without surfacing load errors to the caller.
    pub async fn status(&self) -> StoreStatus {
        let cache_loaded = self.cache.read().await.is_some();

        match self.load().await {
            Ok(table) => StoreStatus {
                status: "ready",
                version: Some(table.metadata.version.clone()),
                generated: Some(table.metadata.generated.clone()),
                total_scenarios: Some(table.metadata.total_scenarios),
                enabled_scenarios: Some(table.enabled_rules().count()),
                categories: Some(table.metadata.categories.clone()),
                fallback_intent: table.fallback_intent.clone(),
                cache_loaded,
                error: None,
            },
            Err(err) => StoreStatus {
                status: "error",
                version: None,
                generated: None,
                total_scenarios: None,
                enabled_scenarios: None,
                categories: None,
                fallback_intent: None,
                cache_loaded,
                error: Some(err.to_string()),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const ARTIFACT: &str = r#"{
        "metadata": {
            "version": "2.0.0",
            "generated": "2025-06-01T09:00:00Z",
            "total_scenarios": 2,
            "categories": ["create", "interact"]
        },
        "routing": {
            "default_priority": 50,
            "fallback_intent": "interact.chat",
            "rules": {
                "create.task": {
                    "category": "create",
                    "title": "Create a task",
                    "priority": 100,
                    "enabled": true,
                    "triggers": ["task"],
                    "examples": [],
                    "paths": { "code": "workflows/create/task" }
                },
                "interact.chat": {
                    "category": "interact",
                    "title": "Chat",
                    "priority": 10,
                    "enabled": true,
                    "paths": { "code": "workflows/interact/chat" }
                },
                "create.disabled": {
                    "category": "create",
                    "title": "Disabled",
                    "priority": 200,
                    "enabled": false,
                    "paths": { "code": "workflows/create/disabled" }
                }
            }
        }
    }"#;

    fn artifact_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn load_parses_artifact() {
        let file = artifact_file(ARTIFACT);
        let store = RuleStore::new(file.path());
        let table = store.load().await.unwrap();
        assert_eq!(table.metadata.version, "2.0.0");
        assert_eq!(table.rules.len(), 3);
    }

    #[tokio::test]
    async fn load_twice_returns_same_cached_table() {
        let file = artifact_file(ARTIFACT);
        let store = RuleStore::new(file.path());

        let first = store.load().await.unwrap();
        let second = store.load().await.unwrap();
        // Identical Arc — no re-parse happened.
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn clear_cache_forces_reload() {
        let file = artifact_file(ARTIFACT);
        let store = RuleStore::new(file.path());

        let first = store.load().await.unwrap();
        store.clear_cache().await;
        let second = store.load().await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn cached_table_survives_artifact_deletion() {
        let file = artifact_file(ARTIFACT);
        let store = RuleStore::new(file.path());
        store.load().await.unwrap();

        let path = file.path().to_path_buf();
        drop(file);
        assert!(!path.exists());

        // Still served from cache.
        assert!(store.load().await.is_ok());

        // Until the cache is cleared.
        store.clear_cache().await;
        assert!(matches!(
            store.load().await,
            Err(RoutingError::ConfigNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn missing_artifact_is_config_not_found() {
        let store = RuleStore::new("/nonexistent/routing-rules.json");
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, RoutingError::ConfigNotFound { .. }));
        assert!(err.to_string().contains("generator"));
    }

    #[tokio::test]
    async fn malformed_artifact_is_parse_error() {
        let file = artifact_file("{\"routing\": []}");
        let store = RuleStore::new(file.path());
        assert!(matches!(store.load().await, Err(RoutingError::Parse(_))));
    }

    #[tokio::test]
    async fn rule_lookup_finds_enabled_rule() {
        let file = artifact_file(ARTIFACT);
        let store = RuleStore::new(file.path());
        let rule = store.rule("create.task").await.unwrap();
        assert_eq!(rule.paths.code, "workflows/create/task");
    }

    #[tokio::test]
    async fn rule_lookup_rejects_disabled_and_unknown() {
        let file = artifact_file(ARTIFACT);
        let store = RuleStore::new(file.path());

        assert!(matches!(
            store.rule("create.disabled").await,
            Err(RoutingError::UnknownIntent { .. })
        ));
        assert!(matches!(
            store.rule("no.such").await,
            Err(RoutingError::UnknownIntent { .. })
        ));
    }

    #[tokio::test]
    async fn available_intents_sorted_by_priority() {
        let file = artifact_file(ARTIFACT);
        let store = RuleStore::new(file.path());
        let intents = store.available_intents().await.unwrap();

        let keys: Vec<&str> = intents.iter().map(|i| i.intent.as_str()).collect();
        assert_eq!(keys, vec!["create.task", "interact.chat"]);
        assert!(intents[0].priority >= intents[1].priority);
    }

    #[tokio::test]
    async fn intents_by_category_filters() {
        let file = artifact_file(ARTIFACT);
        let store = RuleStore::new(file.path());
        let intents = store.intents_by_category("create").await.unwrap();
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].intent, "create.task");
    }

    #[tokio::test]
    async fn status_reports_ready_table() {
        let file = artifact_file(ARTIFACT);
        let store = RuleStore::new(file.path());
        let status = store.status().await;

        assert_eq!(status.status, "ready");
        assert_eq!(status.version.as_deref(), Some("2.0.0"));
        assert_eq!(status.enabled_scenarios, Some(2));
        assert_eq!(status.fallback_intent.as_deref(), Some("interact.chat"));
        assert!(!status.cache_loaded);

        // A second call sees the populated cache.
        let status = store.status().await;
        assert!(status.cache_loaded);
    }

    #[tokio::test]
    async fn status_reports_error_without_failing() {
        let store = RuleStore::new("/nonexistent/routing-rules.json");
        let status = store.status().await;
        assert_eq!(status.status, "error");
        assert!(status.error.is_some());
        assert!(!status.cache_loaded);
    }
}
