//! Message composition — plan, draft, verify, repair.
//!
//! Turns a hook plus its grounding evidence into channel-specific message
//! text. Every factual claim in the output is checked against the evidence;
//! unsupported claims are mechanically stripped, never invented around.

pub mod composer;
pub mod draft;
pub mod plan;
pub mod types;
pub mod verify;

pub use composer::{ComposeConfig, MessageComposer};
pub use draft::{DraftBackend, DraftError, DraftRequest, TemplateDrafter};
pub use plan::{MessagePlan, OutlineSection};
pub use types::{
    Channel, ChannelAlternate, Formality, GenerateOptions, GenerationMeta, MessageVariant, Style,
    Tone, VoiceProfile,
};
pub use verify::{Claim, ClaimVerifier, VerificationReport, Verdict};
