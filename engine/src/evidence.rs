//! Evidence model and the evidence-store collaborator contract.
//!
//! Evidence is owned by an external store and is read-only to this engine:
//! one observed signal about a prospect (a review, a press mention, a funding
//! announcement). The engine consumes it through the [`EvidenceStore`] trait;
//! [`InMemoryEvidenceStore`] ships for tests and the CLI driver.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hooks::HookType;

/// Error type for evidence store operations
#[derive(Debug, thiserror::Error)]
pub enum EvidenceError {
    #[error("evidence not found: {0}")]
    NotFound(String),

    #[error("classification failed for {evidence_id}: {reason}")]
    Classification { evidence_id: String, reason: String },

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Result type for evidence store operations
pub type EvidenceResult<T> = Result<T, EvidenceError>;

/// One observed signal about a prospect. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    /// Opaque identifier
    pub id: String,
    /// Owning prospect identifier
    pub prospect_id: String,
    /// Where the signal was observed (e.g. "Trustpilot", "TechCrunch")
    pub source: String,
    /// Title of the observed item
    pub title: String,
    /// Snippet of the observed content
    pub snippet: String,
    /// Verbatim quotes extracted at acquisition time, if any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quotes: Vec<String>,
    /// Publication timestamp
    pub published_at: DateTime<Utc>,
    /// Source-authority score in [0,1], when the acquirer provides one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authority: Option<f64>,
}

impl Evidence {
    /// Whole days elapsed since publication, never negative.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.published_at).num_days().max(0)
    }
}

/// Sentiment of a classified evidence item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// Classification of one evidence item, produced by the evidence collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceClassification {
    /// Which outreach angle the signal supports
    pub event_type: HookType,
    /// Sentiment of the signal
    pub sentiment: Sentiment,
    /// How relevant the signal is to outreach, in [0,1]
    pub relevance: f64,
    /// How specific the signal is (names, numbers, concrete facts), in [0,1]
    pub specificity: f64,
}

/// Filter for [`EvidenceStore::get_evidence_for_prospect`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvidenceFilter {
    /// Restrict to these sources
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
    /// Only evidence published at or after this instant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
    /// Cap the number of returned items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// Contract of the external evidence store.
///
/// The engine never mutates evidence; `store_evidence` exists for the
/// acquisition layer and for seeding fixtures.
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    /// Evidence for a prospect newer than `max_days_old` days.
    async fn find_fresh_evidence(
        &self,
        prospect_id: &str,
        max_days_old: i64,
    ) -> EvidenceResult<Vec<Evidence>>;

    /// Classify one evidence item into an event type, sentiment, relevance,
    /// and specificity.
    async fn classify_evidence(
        &self,
        evidence: &Evidence,
    ) -> EvidenceResult<EvidenceClassification>;

    /// Evidence for a prospect matching a filter.
    async fn get_evidence_for_prospect(
        &self,
        prospect_id: &str,
        filter: &EvidenceFilter,
    ) -> EvidenceResult<Vec<Evidence>>;

    /// Store one evidence record, returning its identifier.
    async fn store_evidence(&self, evidence: Evidence) -> EvidenceResult<String>;

    /// Resolve evidence records by identifier.
    async fn get_by_ids(&self, ids: &[String]) -> EvidenceResult<Vec<Evidence>>;
}

/// In-memory evidence store with a deterministic keyword classifier.
///
/// Classification overrides registered via [`set_classification`] take
/// precedence over the keyword heuristic, which keeps tests in full control
/// of the classification input.
///
/// [`set_classification`]: InMemoryEvidenceStore::set_classification
#[derive(Default)]
pub struct InMemoryEvidenceStore {
    items: RwLock<Vec<Evidence>>,
    overrides: RwLock<HashMap<String, EvidenceClassification>>,
}

impl InMemoryEvidenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a batch of evidence.
    pub fn seed(&self, evidence: impl IntoIterator<Item = Evidence>) {
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        items.extend(evidence);
    }

    /// Pin the classification returned for a specific evidence id.
    pub fn set_classification(&self, evidence_id: &str, classification: EvidenceClassification) {
        let mut overrides = self.overrides.write().unwrap_or_else(|e| e.into_inner());
        overrides.insert(evidence_id.to_string(), classification);
    }

    /// Keyword classifier used when no override is pinned.
    fn classify_by_keywords(evidence: &Evidence) -> EvidenceClassification {
        let text = format!("{} {}", evidence.title, evidence.snippet).to_lowercase();

        let event_type = if text.contains("review") || text.contains("rating") {
            HookType::ReviewWin
        } else if text.contains("award") || text.contains("prize") {
            HookType::Award
        } else if text.contains("funding") || text.contains("raised") || text.contains("investment")
        {
            HookType::Funding
        } else if text.contains("launch") || text.contains("unveil") {
            HookType::ProductLaunch
        } else if text.contains("case study") {
            HookType::CaseStudy
        } else if text.contains("partner") {
            HookType::Partnership
        } else if text.contains("expansion")
            || text.contains("new office")
            || text.contains("opens")
        {
            HookType::Expansion
        } else if text.contains("featured") || text.contains("press") || text.contains("interview")
        {
            HookType::PrFeature
        } else {
            HookType::Milestone
        };

        const NEGATIVE: [&str; 6] = [
            "lawsuit",
            "complaint",
            "layoff",
            "recall",
            "bankrupt",
            "scandal",
        ];
        const POSITIVE: [&str; 8] = [
            "best", "great", "award", "growth", "record", "5-star", "top", "success",
        ];

        let sentiment = if NEGATIVE.iter().any(|w| text.contains(w)) {
            Sentiment::Negative
        } else if POSITIVE.iter().any(|w| text.contains(w)) {
            Sentiment::Positive
        } else {
            Sentiment::Neutral
        };

        // Longer, more concrete snippets read as more specific.
        let specificity = if evidence.snippet.len() > 120 { 0.8 } else { 0.6 };
        let relevance = match sentiment {
            Sentiment::Positive => 0.9,
            Sentiment::Neutral => 0.7,
            Sentiment::Negative => 0.3,
        };

        EvidenceClassification {
            event_type,
            sentiment,
            relevance,
            specificity,
        }
    }
}

#[async_trait]
impl EvidenceStore for InMemoryEvidenceStore {
    async fn find_fresh_evidence(
        &self,
        prospect_id: &str,
        max_days_old: i64,
    ) -> EvidenceResult<Vec<Evidence>> {
        let now = Utc::now();
        let items = self
            .items
            .read()
            .map_err(|_| EvidenceError::Backend("evidence lock poisoned".to_string()))?;
        Ok(items
            .iter()
            .filter(|e| e.prospect_id == prospect_id && e.age_days(now) <= max_days_old)
            .cloned()
            .collect())
    }

    async fn classify_evidence(
        &self,
        evidence: &Evidence,
    ) -> EvidenceResult<EvidenceClassification> {
        let overrides = self
            .overrides
            .read()
            .map_err(|_| EvidenceError::Backend("evidence lock poisoned".to_string()))?;
        if let Some(c) = overrides.get(&evidence.id) {
            return Ok(c.clone());
        }
        Ok(Self::classify_by_keywords(evidence))
    }

    async fn get_evidence_for_prospect(
        &self,
        prospect_id: &str,
        filter: &EvidenceFilter,
    ) -> EvidenceResult<Vec<Evidence>> {
        let items = self
            .items
            .read()
            .map_err(|_| EvidenceError::Backend("evidence lock poisoned".to_string()))?;
        let mut matched: Vec<Evidence> = items
            .iter()
            .filter(|e| e.prospect_id == prospect_id)
            .filter(|e| match &filter.sources {
                Some(sources) => sources.iter().any(|s| s == &e.source),
                None => true,
            })
            .filter(|e| match filter.since {
                Some(since) => e.published_at >= since,
                None => true,
            })
            .cloned()
            .collect();

        matched.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn store_evidence(&self, evidence: Evidence) -> EvidenceResult<String> {
        let id = evidence.id.clone();
        let mut items = self
            .items
            .write()
            .map_err(|_| EvidenceError::Backend("evidence lock poisoned".to_string()))?;
        items.push(evidence);
        Ok(id)
    }

    async fn get_by_ids(&self, ids: &[String]) -> EvidenceResult<Vec<Evidence>> {
        let items = self
            .items
            .read()
            .map_err(|_| EvidenceError::Backend("evidence lock poisoned".to_string()))?;
        Ok(items.iter().filter(|e| ids.contains(&e.id)).cloned().collect())
    }
}
