//! Draft stage — swappable text-generation backend plus the deterministic
//! template fallback.
//!
//! The backend is optional by design: when it is absent or errors, the
//! template path produces valid output from string interpolation alone. That
//! is a designed degrade mode, not an error path.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::compose::plan::MessagePlan;
use crate::compose::types::{Channel, GenerateOptions, VoiceProfile};
use crate::evidence::Evidence;
use crate::hooks::Hook;

/// Error type for drafting backends
#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("drafting backend unavailable: {0}")]
    Unavailable(String),

    #[error("drafting backend error: {0}")]
    Backend(String),

    #[error("drafting backend returned empty output")]
    EmptyOutput,
}

/// One stateless drafting request: a system instruction plus grounding text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftRequest {
    /// System instruction carrying outline, budget, and voice constraints
    pub system: String,
    /// Concatenated grounding evidence text
    pub grounding: String,
    /// Inclusive word budget (min, max)
    pub word_budget: (usize, usize),
    /// Target language
    pub language: String,
}

/// Contract of a text-generation backend.
///
/// Implementations are stateless per call; absence of a backend must never
/// break the pipeline.
#[async_trait]
pub trait DraftBackend: Send + Sync {
    /// Model identity recorded in generation metadata.
    fn model(&self) -> &str;

    /// Produce drafted body text for the request.
    async fn draft(&self, request: &DraftRequest) -> Result<String, DraftError>;
}

/// Build the system instruction for a backend draft.
pub fn system_instruction(
    hook: &Hook,
    plan: &MessagePlan,
    channel: Channel,
    voice: &VoiceProfile,
    opts: &GenerateOptions,
    word_budget: (usize, usize),
) -> String {
    let greeting = opts
        .recipient_name
        .as_deref()
        .map(|n| format!("Address the recipient as {n}."))
        .unwrap_or_else(|| "Do not invent a recipient name.".to_string());

    format!(
        r#"You write one short outbound {channel} message in {language}.

Structure, in order: acknowledge the recent win, say why reaching out now, state one value proposition, close with exactly this call-to-action: "{cta}"

Hook: {headline}
Value propositions to pick ONE from:
{props}

Rules:
- {min} to {max} words.
- Name the evidence source and its date.
- Only state facts present in the grounding text. Never invent numbers, names, or outcomes.
- Tone: {tone:?}, formality: {formality:?}, style: {style:?}.
- {greeting}
- No sign-off placeholder, no bullet points."#,
        channel = channel,
        language = opts.language,
        cta = plan.call_to_action,
        headline = hook.headline,
        props = plan
            .value_props
            .iter()
            .map(|p| format!("- {p}"))
            .collect::<Vec<_>>()
            .join("\n"),
        min = word_budget.0,
        max = word_budget.1,
        tone = voice.tone,
        formality = voice.formality,
        style = voice.style,
        greeting = greeting,
    )
}

/// Deterministic template fallback.
///
/// Interpolates the hook headline, quote or snippet, source, date, and the
/// first planned value proposition into a fixed skeleton per channel class.
pub struct TemplateDrafter;

impl TemplateDrafter {
    /// Model identity recorded when the template path produced the draft.
    pub const MODEL_ID: &'static str = "template";

    /// Render the long-form body (email, linkedin).
    pub fn render_long(
        hook: &Hook,
        evidence: &Evidence,
        plan: &MessagePlan,
        opts: &GenerateOptions,
    ) -> String {
        let greeting = match opts.recipient_name.as_deref() {
            Some(name) => format!("Hi {name},"),
            None => "Hi,".to_string(),
        };
        let date = evidence.published_at.format("%b %d, %Y");
        let quoted = hook
            .quote
            .as_deref()
            .map(|q| format!(" \"{q}\" stood out."))
            .unwrap_or_default();
        let value = plan
            .value_props
            .first()
            .map(String::as_str)
            .unwrap_or("build on this momentum");

        format!(
            "{greeting}\n\nI came across {source}'s piece from {date}: {headline}.{quoted} \
Moments like this are exactly when outreach lands best, while the story is still fresh. \
We help teams like yours {value}. {cta}",
            greeting = greeting,
            source = evidence.source,
            date = date,
            headline = hook.headline,
            quoted = quoted,
            value = value,
            cta = plan.call_to_action,
        )
    }

    /// Render a short-form body (sms, whatsapp). WhatsApp is emoji-tolerant.
    pub fn render_short(
        hook: &Hook,
        evidence: &Evidence,
        plan: &MessagePlan,
        channel: Channel,
        opts: &GenerateOptions,
    ) -> String {
        let name = opts
            .recipient_name
            .as_deref()
            .map(|n| format!("{n} - "))
            .unwrap_or_default();
        let date = evidence.published_at.format("%b %d");
        let opener = if channel == Channel::Whatsapp {
            "👋 "
        } else {
            ""
        };

        format!(
            "{opener}{name}saw the {source} news from {date} ({headline}). \
Nice moment to build on it. {cta}",
            opener = opener,
            name = name,
            source = evidence.source,
            date = date,
            headline = hook.headline,
            cta = plan.call_to_action,
        )
    }
}

/// Count whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Mechanically trim a draft down to `max_words` by dropping trailing
/// sentences; falls back to a hard word cut when a single sentence overruns.
pub fn trim_to_budget(text: &str, max_words: usize) -> String {
    if word_count(text) <= max_words {
        return text.to_string();
    }

    let mut kept = String::new();
    for sentence in text.split_inclusive(['.', '!', '?']) {
        let candidate_len = word_count(&kept) + word_count(sentence);
        if !kept.is_empty() && candidate_len > max_words {
            break;
        }
        kept.push_str(sentence);
    }

    if word_count(&kept) > max_words {
        kept = kept
            .split_whitespace()
            .take(max_words)
            .collect::<Vec<_>>()
            .join(" ");
    }
    kept.trim().to_string()
}
