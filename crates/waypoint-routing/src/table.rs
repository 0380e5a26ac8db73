//! Routing table model and artifact parsing.
//!
//! The table is generated offline by a scenario scanner and shipped as a
//! JSON artifact of the shape
//! `{metadata: {...}, routing: {default_priority, fallback_intent, rules}}`.
//! This module only reads it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::RoutingResult;

/// Dispatch targets attached to a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulePaths {
    /// The registry key of the workflow bound to this intent.
    pub code: String,
    /// Optional path to the scenario definition the rule was generated from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
}

/// A single intent rule: matching metadata plus its dispatch target.
///
/// The intent key itself ("<category>.<name>") is the rule's key in
/// [`RoutingTable::rules`], not a field on the rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingRule {
    /// Category the intent belongs to (e.g. "create", "interact").
    pub category: String,
    /// Human-readable title.
    pub title: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Higher priority wins score ties.
    pub priority: i64,
    /// Disabled rules never match.
    pub enabled: bool,
    /// Ordered trigger keywords, matched as case-insensitive substrings.
    #[serde(default)]
    pub triggers: Vec<String>,
    /// Natural-language example utterances used for word-overlap scoring.
    #[serde(default)]
    pub examples: Vec<String>,
    /// Dispatch targets.
    pub paths: RulePaths,
}

/// Artifact metadata emitted by the offline generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    /// Artifact schema/content version.
    #[serde(default)]
    pub version: String,
    /// When the artifact was generated (generator-formatted timestamp).
    #[serde(default)]
    pub generated: String,
    /// Number of scenarios the generator scanned.
    #[serde(default)]
    pub total_scenarios: u64,
    /// All categories present in the rule set.
    #[serde(default)]
    pub categories: Vec<String>,
}

/// The in-memory routing table: metadata plus the intent → rule map.
///
/// Rules are kept in a [`BTreeMap`] so iteration order is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingTable {
    /// Generator metadata.
    pub metadata: TableMetadata,
    /// Priority assigned to rules the generator had no explicit value for.
    pub default_priority: i64,
    /// The intent selected when nothing scores above zero.
    pub fallback_intent: Option<String>,
    /// Intent key → rule.
    pub rules: BTreeMap<String, RoutingRule>,
}

/// The raw artifact layout on disk.
#[derive(Debug, Deserialize)]
struct RoutingArtifact {
    #[serde(default)]
    metadata: TableMetadata,
    routing: RoutingSection,
}

#[derive(Debug, Deserialize)]
struct RoutingSection {
    #[serde(default)]
    default_priority: i64,
    #[serde(default)]
    fallback_intent: Option<String>,
    rules: BTreeMap<String, RoutingRule>,
}

impl RoutingTable {
    /// Parse a routing table from the artifact JSON.
    pub fn from_json(json: &str) -> RoutingResult<Self> {
        let artifact: RoutingArtifact = serde_json::from_str(json)?;
        Ok(Self {
            metadata: artifact.metadata,
            default_priority: artifact.routing.default_priority,
            fallback_intent: artifact.routing.fallback_intent,
            rules: artifact.routing.rules,
        })
    }

    /// Look up a rule by intent key.
    pub fn get(&self, intent: &str) -> Option<&RoutingRule> {
        self.rules.get(intent)
    }

    /// Iterate over enabled rules in deterministic key order.
    pub fn enabled_rules(&self) -> impl Iterator<Item = (&String, &RoutingRule)> {
        self.rules.iter().filter(|(_, rule)| rule.enabled)
    }

    /// The fallback rule, when one is configured and actually exists.
    pub fn fallback_rule(&self) -> Option<(&String, &RoutingRule)> {
        let intent = self.fallback_intent.as_deref()?;
        self.rules.get_key_value(intent)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
