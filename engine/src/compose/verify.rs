//! Verify stage — factual-claim extraction and evidence-overlap checking.
//!
//! A claim is any sentence containing a past-tense achievement verb. Each
//! claim must share at least the configured fraction of its significant words
//! with the grounding evidence text, or the whole draft fails verification.
//! Repair strips the failing sentences; it never invents replacements.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Past-tense achievement verbs that mark a sentence as a factual claim.
static ACHIEVEMENT_VERB_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(won|launched|raised|increased|grew|secured|announced|achieved|earned|reached|hit|opened|expanded|signed|acquired|reported|closed|partnered)\b",
    )
    .expect("ACHIEVEMENT_VERB_RE regex should compile")
});

/// Words too common to count toward claim support.
const STOPWORDS: [&str; 24] = [
    "the", "and", "for", "that", "this", "with", "from", "your", "their", "have", "has", "was",
    "were", "are", "you", "they", "its", "our", "into", "about", "while", "when", "what", "just",
];

/// Verification verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Every extracted claim cleared the overlap bar
    Pass,
    /// At least one claim is unsupported by the evidence
    Fail,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

/// One extracted factual claim with its measured evidence overlap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    /// The claim sentence, trimmed
    pub sentence: String,
    /// Fraction of the claim's significant words found in the evidence
    pub overlap: f64,
}

/// Structured result of one verification pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub verdict: Verdict,
    /// Every claim found in the draft
    pub claims: Vec<Claim>,
    /// The subset that failed the overlap bar
    pub unsupported: Vec<Claim>,
}

impl VerificationReport {
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }
}

/// Claim verifier with a configurable overlap threshold
#[derive(Debug, Clone)]
pub struct ClaimVerifier {
    threshold: f64,
}

impl ClaimVerifier {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Verify a draft against the concatenated grounding evidence text.
    pub fn verify(&self, draft: &str, evidence_text: &str) -> VerificationReport {
        let evidence_words = significant_words(evidence_text);

        let mut claims = Vec::new();
        let mut unsupported = Vec::new();

        for sentence in split_sentences(draft) {
            if !ACHIEVEMENT_VERB_RE.is_match(&sentence) {
                continue;
            }
            let claim_words = significant_words(&sentence);
            let overlap = if claim_words.is_empty() {
                1.0
            } else {
                let shared = claim_words.intersection(&evidence_words).count();
                shared as f64 / claim_words.len() as f64
            };

            let claim = Claim {
                sentence: sentence.clone(),
                overlap,
            };
            if overlap < self.threshold {
                unsupported.push(claim.clone());
            }
            claims.push(claim);
        }

        let verdict = if unsupported.is_empty() {
            Verdict::Pass
        } else {
            Verdict::Fail
        };
        VerificationReport {
            verdict,
            claims,
            unsupported,
        }
    }

    /// Mechanically strip the unsupported sentences and re-normalize
    /// whitespace. Never invents replacement facts.
    pub fn repair(&self, draft: &str, unsupported: &[Claim]) -> String {
        let kept: Vec<String> = split_sentences(draft)
            .into_iter()
            .filter(|sentence| !unsupported.iter().any(|c| &c.sentence == sentence))
            .collect();

        kept.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

impl Default for ClaimVerifier {
    fn default() -> Self {
        Self::new(0.4)
    }
}

/// Split text into trimmed sentences on terminal punctuation.
fn split_sentences(text: &str) -> Vec<String> {
    text.split_inclusive(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Significant words: lowercase alphanumeric tokens of three or more
/// characters, stopwords removed. Numbers always count.
fn significant_words(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|w| w.len() >= 3 || (!w.is_empty() && w.chars().all(|c| c.is_ascii_digit())))
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}
