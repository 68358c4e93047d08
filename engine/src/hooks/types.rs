//! Hook domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The outreach angle a hook is built on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookType {
    /// A strong customer review or rating win
    ReviewWin,
    /// An award or prize
    Award,
    /// A product or service launch
    ProductLaunch,
    /// A press feature or interview
    PrFeature,
    /// A company milestone (anniversary, customer count, record quarter)
    Milestone,
    /// A published case study
    CaseStudy,
    /// A funding round
    Funding,
    /// A new partnership
    Partnership,
    /// A geographic or market expansion
    Expansion,
}

impl HookType {
    /// Inherent sentiment weight of this hook type.
    ///
    /// Review wins, awards, funding rounds, and milestones are inherently
    /// celebratory; launches, case studies, partnerships, and expansions are
    /// neutral-positive news.
    pub fn sentiment_weight(&self) -> f64 {
        match self {
            Self::ReviewWin | Self::Award | Self::Funding | Self::Milestone => 1.0,
            Self::ProductLaunch | Self::CaseStudy | Self::Partnership | Self::Expansion => 0.7,
            Self::PrFeature => 0.5,
        }
    }
}

impl std::fmt::Display for HookType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReviewWin => write!(f, "review_win"),
            Self::Award => write!(f, "award"),
            Self::ProductLaunch => write!(f, "product_launch"),
            Self::PrFeature => write!(f, "pr_feature"),
            Self::Milestone => write!(f, "milestone"),
            Self::CaseStudy => write!(f, "case_study"),
            Self::Funding => write!(f, "funding"),
            Self::Partnership => write!(f, "partnership"),
            Self::Expansion => write!(f, "expansion"),
        }
    }
}

/// Terminal review status assigned when a hook is scored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookStatus {
    /// High score on fresh evidence; safe to act on directly
    Approved,
    /// Usable but should be eyeballed first
    Review,
    /// Below the usefulness bar; returned for transparency only
    Rejected,
}

/// A scored, classified candidate conversation-opener derived from evidence.
///
/// Hooks are immutable once scored. Re-mining a prospect produces new hook
/// records; it never mutates old ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hook {
    /// Opaque identifier
    pub id: String,
    /// Owning prospect identifier
    pub prospect_id: String,
    /// Outreach angle
    pub hook_type: HookType,
    /// Generated natural-language headline
    pub headline: String,
    /// Extracted quote, when one was available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,
    /// Evidence records this hook is grounded in (never empty)
    pub evidence_ids: Vec<String>,
    /// Whole days since the grounding evidence was published
    pub freshness_days: i64,
    /// Composite score in [0,1]
    pub score: f64,
    /// Classification confidence (relevance x specificity), in [0,1]
    pub confidence: f64,
    /// Terminal review status
    pub status: HookStatus,
    /// When the hook was mined
    pub mined_at: DateTime<Utc>,
}

impl Hook {
    /// Compact form for logging.
    pub fn summary(&self) -> String {
        format!(
            "hook={} type={} score={:.2} fresh={}d status={:?}",
            self.id, self.hook_type, self.score, self.freshness_days, self.status
        )
    }
}
