//! Scoring-based intent matching.
//!
//! Matching is a pure function of `(input, rule)`:
//!
//! - +10 per trigger whose lowercase form is a substring of the lowered
//!   input,
//! - +2 per input word (longer than 2 characters) that appears verbatim
//!   in an example, summed across all examples,
//! - +5 when the category name appears in the input.
//!
//! Triggers are matched as substrings, not on word boundaries.  Short
//! triggers can therefore over-match inside unrelated words; that is the
//! documented behavior, not an oversight.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::table::{RoutingRule, RoutingTable};

/// The winning rule for an input, with its matching evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// The selected intent key.
    pub intent: String,
    /// Total match score (0 for fallback selections).
    pub score: u32,
    /// Triggers that contributed to the score, in rule order.
    pub matched_triggers: Vec<String>,
    /// The rule's priority at selection time.
    pub priority: i64,
    /// Whether this is the configured fallback rather than a scored match.
    pub is_fallback: bool,
    /// The selected rule.
    pub rule: RoutingRule,
}

/// Score a single rule against an input.
///
/// Returns the score and the triggers that hit.  Pure and deterministic:
/// equal inputs always produce equal outputs.
#[must_use]
pub fn score_rule(input: &str, rule: &RoutingRule) -> (u32, Vec<String>) {
    let lowered = input.to_lowercase();
    let mut score: u32 = 0;
    let mut matched_triggers = Vec::new();

    // Trigger keywords: case-insensitive substring match.
    for trigger in &rule.triggers {
        if !trigger.is_empty() && lowered.contains(&trigger.to_lowercase()) {
            score += 10;
            matched_triggers.push(trigger.clone());
        }
    }

    // Example overlap: input words longer than 2 characters that appear
    // verbatim among an example's words, summed over all examples.
    let input_words: Vec<&str> = lowered.split_whitespace().collect();
    for example in &rule.examples {
        let example_lowered = example.to_lowercase();
        let example_words: Vec<&str> = example_lowered.split_whitespace().collect();

        let common = input_words
            .iter()
            .filter(|word| word.chars().count() > 2 && example_words.contains(*word))
            .count();
        score += 2 * common as u32;
    }

    // Category bonus.
    if lowered.contains(&rule.category.to_lowercase()) {
        score += 5;
    }

    (score, matched_triggers)
}

/// Select the best-matching enabled rule for an input.
///
/// Candidates are ordered by score descending, then priority descending,
/// then intent key ascending — the last leg makes equal-score-and-priority
/// ties deterministic instead of depending on map iteration order.
///
/// With no candidate above zero, the configured fallback rule is returned
/// at score 0 with `is_fallback = true`; with no fallback configured the
/// result is `None`.
#[must_use]
pub fn match_intent(table: &RoutingTable, input: &str) -> Option<MatchResult> {
    let mut candidates: Vec<MatchResult> = Vec::new();

    for (intent, rule) in table.enabled_rules() {
        let (score, matched_triggers) = score_rule(input, rule);
        if score == 0 {
            continue;
        }
        candidates.push(MatchResult {
            intent: intent.clone(),
            score,
            matched_triggers,
            priority: rule.priority,
            is_fallback: false,
            rule: rule.clone(),
        });
    }

    candidates.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(b.priority.cmp(&a.priority))
            .then(a.intent.cmp(&b.intent))
    });

    if let Some(winner) = candidates.into_iter().next() {
        debug!(
            intent = %winner.intent,
            score = winner.score,
            triggers = winner.matched_triggers.len(),
            "intent matched"
        );
        return Some(winner);
    }

    // Nothing scored: fall back if the table names a fallback rule.
    if let Some((intent, rule)) = table.fallback_rule() {
        debug!(intent = %intent, "no rule scored, using fallback");
        return Some(MatchResult {
            intent: intent.clone(),
            score: 0,
            matched_triggers: Vec::new(),
            priority: rule.priority,
            is_fallback: true,
            rule: rule.clone(),
        });
    }

    debug!("no rule scored and no fallback configured");
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
