//! Hook Ranker — scores and classifies evidence into outreach hooks.
//!
//! Pure, synchronous scoring over evidence fetched from the store. All
//! decisions are deterministic; thresholds and weights live in
//! [`RankerConfig`] with the production defaults.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::evidence::{Evidence, EvidenceClassification, EvidenceStore, Sentiment};
use crate::hooks::types::{Hook, HookStatus, HookType};

/// Domain-indicative terms counted by the specificity heuristic: product,
/// market, and metric words that signal a concrete, non-generic headline.
const SPECIFICITY_TERMS: [&str; 18] = [
    "platform",
    "app",
    "product",
    "customers",
    "users",
    "revenue",
    "growth",
    "market",
    "sales",
    "rating",
    "stars",
    "employees",
    "stores",
    "clients",
    "oslo",
    "bergen",
    "stockholm",
    "copenhagen",
];

/// Positive/indicator keywords used by the fallback quote extractor.
const INDICATOR_KEYWORDS: [&str; 10] = [
    "best", "award", "growth", "launch", "record", "milestone", "5-star", "partner", "top",
    "expand",
];

/// Component weights for the composite hook score
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub recency: f64,
    pub relevance: f64,
    pub authority: f64,
    pub specificity: f64,
    pub sentiment: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            recency: 0.35,
            relevance: 0.25,
            authority: 0.20,
            specificity: 0.10,
            sentiment: 0.10,
        }
    }
}

/// Configuration for the Hook Ranker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankerConfig {
    /// Default evidence window when the caller does not pass one
    pub default_max_days_old: i64,
    /// Hard age ceiling applied regardless of the requested window
    pub hard_ceiling_days: i64,
    /// Minimum score for `Approved`
    pub approve_score: f64,
    /// Maximum freshness (days) for `Approved`
    pub approve_max_freshness_days: i64,
    /// Minimum score for `Review`
    pub review_score: f64,
    /// Component weights
    pub weights: ScoreWeights,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            default_max_days_old: 14,
            hard_ceiling_days: 30,
            approve_score: 0.78,
            approve_max_freshness_days: 14,
            review_score: 0.60,
            weights: ScoreWeights::default(),
        }
    }
}

/// The Hook Ranker
pub struct HookRanker {
    evidence: Arc<dyn EvidenceStore>,
    config: RankerConfig,
}

impl HookRanker {
    /// Create a ranker with default config
    pub fn new(evidence: Arc<dyn EvidenceStore>) -> Self {
        Self {
            evidence,
            config: RankerConfig::default(),
        }
    }

    /// Create with custom config
    pub fn with_config(evidence: Arc<dyn EvidenceStore>, config: RankerConfig) -> Self {
        Self { evidence, config }
    }

    /// Mine scored hooks for one prospect.
    ///
    /// Fetches evidence newer than `max_days_old` (default from config),
    /// classifies each item, filters negative sentiment and anything older
    /// than the hard ceiling, scores the survivors, and returns the top
    /// `limit` hooks sorted by descending score. Rejected and review hooks
    /// are included; acting only on usable ones is the caller's concern.
    ///
    /// An empty evidence set yields an empty list. A classification failure
    /// for one item skips that item and continues.
    pub async fn mine(
        &self,
        prospect_id: &str,
        max_days_old: Option<i64>,
        limit: usize,
    ) -> EngineResult<Vec<Hook>> {
        let window = max_days_old.unwrap_or(self.config.default_max_days_old);
        let now = Utc::now();

        let evidence = self
            .evidence
            .find_fresh_evidence(prospect_id, window)
            .await
            .map_err(|e| EngineError::Evidence(e.to_string()))?;

        if evidence.is_empty() {
            debug!(prospect_id, window, "No fresh evidence");
            return Ok(vec![]);
        }

        let mut hooks = Vec::new();
        for item in &evidence {
            let classification = match self.evidence.classify_evidence(item).await {
                Ok(c) => c,
                Err(e) => {
                    warn!(evidence_id = %item.id, "Classification failed, skipping item: {e}");
                    continue;
                }
            };

            // Two independent filters: negative material never becomes a
            // hook, and nothing older than the hard ceiling does either,
            // even when the caller asked for a wider window.
            if classification.sentiment == Sentiment::Negative {
                debug!(evidence_id = %item.id, "Dropping negative-sentiment evidence");
                continue;
            }
            let freshness = item.age_days(now);
            if freshness > self.config.hard_ceiling_days {
                debug!(evidence_id = %item.id, freshness, "Dropping stale evidence");
                continue;
            }

            hooks.push(self.synthesize(prospect_id, item, &classification, freshness, now));
        }

        hooks.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hooks.truncate(limit);

        for hook in &mut hooks {
            hook.status = self.assign_status(hook.score, hook.freshness_days);
        }

        debug!(prospect_id, count = hooks.len(), "Mined hooks");
        Ok(hooks)
    }

    /// Mine hooks for a batch of prospects.
    ///
    /// Invokes [`mine`](Self::mine) per prospect and collects non-empty
    /// results; there is no cross-prospect interaction. A store failure for
    /// one prospect is logged and skipped rather than aborting the batch.
    pub async fn top_hooks_for_campaign(
        &self,
        prospect_ids: &[String],
        max_per_prospect: usize,
    ) -> EngineResult<HashMap<String, Vec<Hook>>> {
        let mut results = HashMap::new();
        for prospect_id in prospect_ids {
            match self.mine(prospect_id, None, max_per_prospect).await {
                Ok(hooks) if !hooks.is_empty() => {
                    results.insert(prospect_id.clone(), hooks);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(prospect_id, "Mining failed for prospect, skipping: {e}");
                }
            }
        }
        Ok(results)
    }

    /// Build one scored hook from a surviving evidence item.
    fn synthesize(
        &self,
        prospect_id: &str,
        evidence: &Evidence,
        classification: &EvidenceClassification,
        freshness_days: i64,
        now: DateTime<Utc>,
    ) -> Hook {
        let headline = headline_for(classification.event_type, evidence);
        let quote = extract_quote(evidence);
        let confidence = (classification.relevance * classification.specificity).clamp(0.0, 1.0);

        let w = &self.config.weights;
        let recency = recency_score(freshness_days);
        let authority = evidence.authority.unwrap_or(0.5);
        let specificity = specificity_score(&headline, quote.as_deref());
        let sentiment = classification.event_type.sentiment_weight();

        let score = (w.recency * recency
            + w.relevance * confidence
            + w.authority * authority
            + w.specificity * specificity
            + w.sentiment * sentiment)
            .clamp(0.0, 1.0);

        Hook {
            id: Uuid::new_v4().to_string(),
            prospect_id: prospect_id.to_string(),
            hook_type: classification.event_type,
            headline,
            quote,
            evidence_ids: vec![evidence.id.clone()],
            freshness_days,
            score,
            confidence,
            // Placeholder until the post-sort pass assigns the terminal status.
            status: HookStatus::Rejected,
            mined_at: now,
        }
    }

    fn assign_status(&self, score: f64, freshness_days: i64) -> HookStatus {
        if score >= self.config.approve_score
            && freshness_days <= self.config.approve_max_freshness_days
        {
            HookStatus::Approved
        } else if score >= self.config.review_score {
            HookStatus::Review
        } else {
            HookStatus::Rejected
        }
    }
}

/// Step function mapping freshness-in-days to a recency score.
fn recency_score(freshness_days: i64) -> f64 {
    if freshness_days < 2 {
        1.0
    } else if freshness_days <= 7 {
        0.8
    } else if freshness_days <= 14 {
        0.6
    } else if freshness_days <= 30 {
        0.4
    } else {
        0.2
    }
}

/// Specificity heuristic over headline + quote text.
///
/// Base 0.5, +0.1 per domain-indicative term, +0.1 if any digit appears,
/// +0.1 if at least three capitalized tokens appear (a cheap proxy for named
/// entities), clamped to 1.0.
fn specificity_score(headline: &str, quote: Option<&str>) -> f64 {
    let text = match quote {
        Some(q) => format!("{headline} {q}"),
        None => headline.to_string(),
    };
    let lower = text.to_lowercase();

    let mut score: f64 = 0.5;
    for term in SPECIFICITY_TERMS {
        if lower.contains(term) {
            score += 0.1;
        }
    }
    if text.chars().any(|c| c.is_ascii_digit()) {
        score += 0.1;
    }
    let capitalized = text
        .split_whitespace()
        .filter(|w| w.chars().next().is_some_and(|c| c.is_uppercase()))
        .count();
    if capitalized >= 3 {
        score += 0.1;
    }

    score.min(1.0)
}

/// Fixed natural-language headline template per hook type.
fn headline_for(hook_type: HookType, evidence: &Evidence) -> String {
    let date = evidence.published_at.format("%b %d, %Y");
    match hook_type {
        HookType::ReviewWin => format!(
            "Fresh praise on {}: \"{}\" ({})",
            evidence.source, evidence.title, date
        ),
        HookType::Award => format!("Award win: {} ({})", evidence.title, date),
        HookType::ProductLaunch => format!("Just launched: {} ({})", evidence.title, date),
        HookType::PrFeature => format!("Featured in {}: {} ({})", evidence.source, evidence.title, date),
        HookType::Milestone => format!("Milestone reached: {} ({})", evidence.title, date),
        HookType::CaseStudy => format!("New case study: {} ({})", evidence.title, date),
        HookType::Funding => format!("Funding news: {} ({})", evidence.title, date),
        HookType::Partnership => format!("New partnership: {} ({})", evidence.title, date),
        HookType::Expansion => format!("Expanding: {} ({})", evidence.title, date),
    }
}

/// Quote extraction ladder: evidence-supplied quote, else a short snippet
/// verbatim, else the first snippet sentence carrying an indicator keyword,
/// else none.
fn extract_quote(evidence: &Evidence) -> Option<String> {
    if let Some(q) = evidence.quotes.first() {
        return Some(q.clone());
    }
    let snippet = evidence.snippet.trim();
    if snippet.is_empty() {
        return None;
    }
    if snippet.len() <= 150 {
        return Some(snippet.to_string());
    }
    snippet
        .split_inclusive(['.', '!', '?'])
        .map(str::trim)
        .find(|sentence| {
            let lower = sentence.to_lowercase();
            INDICATOR_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::InMemoryEvidenceStore;
    use chrono::Duration;

    fn evidence(id: &str, days_old: i64, title: &str, snippet: &str) -> Evidence {
        Evidence {
            id: id.to_string(),
            prospect_id: "p-1".to_string(),
            source: "Trustpilot".to_string(),
            title: title.to_string(),
            snippet: snippet.to_string(),
            quotes: vec![],
            published_at: Utc::now() - Duration::days(days_old),
            authority: Some(0.9),
        }
    }

    fn classification(
        event_type: HookType,
        sentiment: Sentiment,
        relevance: f64,
        specificity: f64,
    ) -> EvidenceClassification {
        EvidenceClassification {
            event_type,
            sentiment,
            relevance,
            specificity,
        }
    }

    fn store_with(items: Vec<(Evidence, EvidenceClassification)>) -> Arc<InMemoryEvidenceStore> {
        let store = Arc::new(InMemoryEvidenceStore::new());
        for (ev, cls) in items {
            store.set_classification(&ev.id, cls);
            store.seed([ev]);
        }
        store
    }

    #[tokio::test]
    async fn test_negative_only_evidence_yields_no_hooks() {
        let store = store_with(vec![(
            evidence("e-1", 2, "Customer complaint", "service outage"),
            classification(HookType::ReviewWin, Sentiment::Negative, 0.9, 0.9),
        )]);
        let ranker = HookRanker::new(store);

        let hooks = ranker.mine("p-1", None, 10).await.unwrap();
        assert!(hooks.is_empty());
    }

    #[tokio::test]
    async fn test_hard_ceiling_independent_of_window() {
        let store = store_with(vec![(
            evidence("e-1", 45, "Old award", "won an industry prize"),
            classification(HookType::Award, Sentiment::Positive, 0.9, 0.9),
        )]);
        let ranker = HookRanker::new(store);

        // Ask for a 60-day window: the 30-day ceiling still applies.
        let hooks = ranker.mine("p-1", Some(60), 10).await.unwrap();
        assert!(hooks.is_empty());
    }

    #[tokio::test]
    async fn test_empty_evidence_is_not_an_error() {
        let store = Arc::new(InMemoryEvidenceStore::new());
        let ranker = HookRanker::new(store);
        let hooks = ranker.mine("nobody", None, 10).await.unwrap();
        assert!(hooks.is_empty());
    }

    #[tokio::test]
    async fn test_trustpilot_scenario_scores_approved() {
        // Evidence published 3 days ago with authority 0.9 and a strong
        // classification should clear the approve bar.
        let store = store_with(vec![(
            evidence(
                "e-1",
                3,
                "5-star review",
                "5-star review, best service in Oslo",
            ),
            classification(HookType::ReviewWin, Sentiment::Positive, 0.9, 0.9),
        )]);
        let ranker = HookRanker::new(store);

        let hooks = ranker.mine("p-1", None, 10).await.unwrap();
        assert_eq!(hooks.len(), 1);
        let hook = &hooks[0];

        assert!(hook.score >= 0.78, "score was {}", hook.score);
        assert!(hook.score <= 1.0);
        assert_eq!(hook.status, HookStatus::Approved);
        assert_eq!(hook.freshness_days, 3);
        assert_eq!(hook.evidence_ids, vec!["e-1".to_string()]);
    }

    #[tokio::test]
    async fn test_status_thresholds() {
        // Weak classification and mediocre authority: review band.
        let mut ev = evidence("e-1", 10, "Small update", "minor notes");
        ev.authority = Some(0.5);
        let store = store_with(vec![(
            ev,
            classification(HookType::PrFeature, Sentiment::Neutral, 0.6, 0.6),
        )]);
        let ranker = HookRanker::new(store);

        let hooks = ranker.mine("p-1", None, 10).await.unwrap();
        assert_eq!(hooks.len(), 1);
        let hook = &hooks[0];
        assert!((0.0..=1.0).contains(&hook.score));
        match hook.status {
            HookStatus::Approved => {
                assert!(hook.score >= 0.78 && hook.freshness_days <= 14)
            }
            HookStatus::Review => assert!(hook.score >= 0.60),
            HookStatus::Rejected => assert!(hook.score < 0.60),
        }
    }

    #[tokio::test]
    async fn test_limit_and_ordering() {
        let store = store_with(vec![
            (
                evidence("e-1", 1, "5-star review", "best service in Oslo"),
                classification(HookType::ReviewWin, Sentiment::Positive, 0.9, 0.9),
            ),
            (
                evidence("e-2", 20, "Press mention", "brief note"),
                classification(HookType::PrFeature, Sentiment::Neutral, 0.5, 0.5),
            ),
            (
                evidence("e-3", 4, "Series A raised", "raised 40 MNOK to grow the platform"),
                classification(HookType::Funding, Sentiment::Positive, 0.85, 0.8),
            ),
        ]);
        let ranker = HookRanker::new(store);

        let hooks = ranker.mine("p-1", Some(30), 2).await.unwrap();
        assert_eq!(hooks.len(), 2);
        assert!(hooks[0].score >= hooks[1].score);
    }

    #[tokio::test]
    async fn test_batch_collects_non_empty_only() {
        let store = store_with(vec![(
            evidence("e-1", 2, "5-star review", "best service in Oslo"),
            classification(HookType::ReviewWin, Sentiment::Positive, 0.9, 0.9),
        )]);
        let ranker = HookRanker::new(store);

        let ids = vec!["p-1".to_string(), "p-none".to_string()];
        let map = ranker.top_hooks_for_campaign(&ids, 3).await.unwrap();
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("p-1"));
    }

    #[test]
    fn test_recency_step_function() {
        assert_eq!(recency_score(0), 1.0);
        assert_eq!(recency_score(1), 1.0);
        assert_eq!(recency_score(2), 0.8);
        assert_eq!(recency_score(7), 0.8);
        assert_eq!(recency_score(8), 0.6);
        assert_eq!(recency_score(14), 0.6);
        assert_eq!(recency_score(15), 0.4);
        assert_eq!(recency_score(30), 0.4);
        assert_eq!(recency_score(31), 0.2);
    }

    #[test]
    fn test_specificity_components() {
        // Digits and three capitalized tokens each add 0.1.
        let with_all = specificity_score("Acme Oslo Platform hits 500 users", None);
        let bare = specificity_score("an update", None);
        assert!(with_all > bare);
        assert!(with_all <= 1.0);
        assert_eq!(bare, 0.5);
    }

    #[test]
    fn test_quote_prefers_supplied_quote() {
        let mut ev = evidence("e-1", 1, "Review", &"long snippet ".repeat(20));
        ev.quotes = vec!["verbatim words".to_string()];
        assert_eq!(extract_quote(&ev).as_deref(), Some("verbatim words"));
    }

    #[test]
    fn test_quote_falls_back_to_indicator_sentence() {
        let long = format!(
            "{} This was their best quarter on record. More filler follows here.",
            "filler sentence without keywords. ".repeat(10)
        );
        let ev = evidence("e-1", 1, "Review", &long);
        let quote = extract_quote(&ev).unwrap();
        assert!(quote.contains("best quarter"));
    }
}
