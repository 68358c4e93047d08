//! Outreach Escalation Engine
//!
//! Turns evidence of a prospect's recent activity into personalized,
//! fact-checked messages delivered across channels on a compliant,
//! time-boxed cadence. Three components form the pipeline:
//!
//! - **Hook Ranker**: scores and classifies evidence into candidate
//!   conversation openers, filtering stale and negative material.
//! - **Message Composer**: drafts channel-specific text, verifies every
//!   factual claim against the grounding evidence, and repairs or rejects
//!   unsupported claims.
//! - **Escalation Scheduler**: builds multi-step, multi-channel send plans,
//!   enforces quiet hours, attempt caps, domain cooldowns, and
//!   consent/suppression rules, and reacts to delivery callbacks.
//!
//! Data flows strictly downstream (evidence, hooks, variants, schedules);
//! delivery events flow back only as schedule-state mutations.

#![allow(clippy::uninlined_format_args)]

pub mod analytics;
pub mod compose;
pub mod config;
pub mod error;
pub mod events;
pub mod evidence;
pub mod hooks;
pub mod schedule;

// Re-export the engine surface consumed by drivers.
pub use analytics::CampaignStats;
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use events::{EventBus, OutreachEvent, SharedEventBus};

// Evidence collaborator contract
pub use evidence::{
    Evidence, EvidenceClassification, EvidenceError, EvidenceFilter, EvidenceResult,
    EvidenceStore, InMemoryEvidenceStore, Sentiment,
};

// Hook Ranker
pub use hooks::{Hook, HookRanker, HookStatus, HookType, RankerConfig, ScoreWeights};

// Message Composer
pub use compose::{
    Channel, ChannelAlternate, ClaimVerifier, ComposeConfig, DraftBackend, DraftError,
    DraftRequest, Formality, GenerateOptions, GenerationMeta, MessageComposer, MessagePlan,
    MessageVariant, Style, TemplateDrafter, Tone, VerificationReport, Verdict, VoiceProfile,
};

// Escalation Scheduler
pub use schedule::scheduler::{EscalationScheduler, PlannedSend, SchedulerConfig, SweepReport};
pub use schedule::{
    ChannelTransport, ComplianceGate, ComplianceViolation, DomainCooldown, Prospect,
    ResponseEvent, ScheduleStatus, SendCaps, SendReceipt, SendRequest, SendSchedule, SendStep,
    SharedDomainCooldown, SharedSuppressionSet, SkipReason, StepResponse, StepStatus,
    SuppressionEntry, SuppressionReason, SuppressionSet, TransportError, TransportRegistry,
    DEFAULT_CADENCE,
};
