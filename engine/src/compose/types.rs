//! Message variant domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outbound communication channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Sms,
    Whatsapp,
    Linkedin,
}

impl Channel {
    /// Short-form channels get the tighter word budget and no subject line.
    pub fn is_short_form(&self) -> bool {
        matches!(self, Self::Sms | Self::Whatsapp)
    }

    /// Channels that require explicit opt-in consent before sending.
    pub fn requires_opt_in(&self) -> bool {
        matches!(self, Self::Sms | Self::Whatsapp)
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Email => write!(f, "email"),
            Self::Sms => write!(f, "sms"),
            Self::Whatsapp => write!(f, "whatsapp"),
            Self::Linkedin => write!(f, "linkedin"),
        }
    }
}

/// Tone axis of a voice profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Friendly,
    Professional,
    Enthusiastic,
}

/// Formality axis of a voice profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Formality {
    Casual,
    #[default]
    Neutral,
    Formal,
}

/// Style axis of a voice profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    #[default]
    Direct,
    Storytelling,
    Consultative,
}

/// Voice profile: tone x formality x style
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub tone: Tone,
    pub formality: Formality,
    pub style: Style,
}

/// Generation metadata retained on every variant for auditability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationMeta {
    /// Identity of the drafting model, or "template" for the fallback path
    pub model: String,
    /// Evidence records actually used while drafting
    pub evidence_ids: Vec<String>,
    /// When the variant was generated
    pub generated_at: DateTime<Utc>,
    /// Claim sentences that failed verification and were stripped (kept for
    /// audit, per the error-handling design)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unsupported_claims: Vec<String>,
}

/// A short-form payload fanned out from an email primary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelAlternate {
    pub channel: Channel,
    pub body: String,
}

/// One drafted, evidence-verified message for a (hook, channel) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageVariant {
    /// Opaque identifier
    pub id: String,
    /// Owning hook identifier
    pub hook_id: String,
    /// Target channel
    pub channel: Channel,
    /// Subject line (email only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Message body
    pub body: String,
    /// Target language (BCP 47-ish short code, e.g. "en", "no")
    pub language: String,
    /// Voice profile used while drafting
    pub voice: VoiceProfile,
    /// Generation metadata
    pub metadata: GenerationMeta,
    /// Confidence score in [0,1]
    pub confidence: f64,
    /// Short-form channel alternates carried on an email primary
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternates: Vec<ChannelAlternate>,
}

/// Optional inputs to [`MessageComposer::generate`].
///
/// [`MessageComposer::generate`]: crate::compose::MessageComposer::generate
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Recipient first name for the greeting, when known
    pub recipient_name: Option<String>,
    /// Prospect industry, used to narrow value propositions
    pub industry: Option<String>,
    /// Target language
    pub language: String,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            recipient_name: None,
            industry: None,
            language: "en".to_string(),
        }
    }
}
