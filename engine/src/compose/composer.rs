//! Message Composer — the plan, draft, verify, repair pipeline.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::compose::draft::{
    system_instruction, trim_to_budget, word_count, DraftBackend, DraftRequest, TemplateDrafter,
};
use crate::compose::plan::{build_plan, MessagePlan};
use crate::compose::types::{
    Channel, ChannelAlternate, GenerateOptions, GenerationMeta, MessageVariant, VoiceProfile,
};
use crate::compose::verify::ClaimVerifier;
use crate::error::{EngineError, EngineResult};
use crate::evidence::{Evidence, EvidenceStore};
use crate::hooks::Hook;

/// Configuration for the Message Composer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeConfig {
    /// Word budget for email/linkedin drafts
    pub long_word_budget: (usize, usize),
    /// Word budget for sms/whatsapp drafts
    pub short_word_budget: (usize, usize),
    /// Minimum significant-word overlap for a claim to count as supported
    pub overlap_threshold: f64,
    /// Bounded re-verify passes after a repair
    pub max_repair_retries: usize,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            long_word_budget: (90, 130),
            short_word_budget: (50, 80),
            overlap_threshold: 0.4,
            max_repair_retries: 1,
        }
    }
}

/// The Message Composer
pub struct MessageComposer {
    evidence: Arc<dyn EvidenceStore>,
    backend: Option<Arc<dyn DraftBackend>>,
    verifier: ClaimVerifier,
    config: ComposeConfig,
}

impl MessageComposer {
    /// Create a composer without a drafting backend; every draft takes the
    /// template path.
    pub fn new(evidence: Arc<dyn EvidenceStore>) -> Self {
        let config = ComposeConfig::default();
        Self {
            evidence,
            backend: None,
            verifier: ClaimVerifier::new(config.overlap_threshold),
            config,
        }
    }

    /// Attach a text-generation backend.
    pub fn with_backend(mut self, backend: Arc<dyn DraftBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Override the default configuration.
    pub fn with_config(mut self, config: ComposeConfig) -> Self {
        self.verifier = ClaimVerifier::new(config.overlap_threshold);
        self.config = config;
        self
    }

    /// Generate a verified message variant for one (hook, channel) pair.
    ///
    /// The only hard failure is a hook whose evidence set is empty or
    /// unresolvable; backend unavailability degrades to the template path
    /// and verification failures are routed into repair.
    pub async fn generate(
        &self,
        hook: &Hook,
        channel: Channel,
        voice: VoiceProfile,
        opts: &GenerateOptions,
    ) -> EngineResult<MessageVariant> {
        let grounding = self
            .evidence
            .get_by_ids(&hook.evidence_ids)
            .await
            .map_err(|e| EngineError::Evidence(e.to_string()))?;
        if grounding.is_empty() {
            return Err(EngineError::NoEvidence {
                hook_id: hook.id.clone(),
            });
        }
        let primary = &grounding[0];
        let evidence_text = concat_evidence_text(&grounding);

        let plan = build_plan(hook, channel, opts);
        let budget = if channel.is_short_form() {
            self.config.short_word_budget
        } else {
            self.config.long_word_budget
        };

        let (mut body, model) = self
            .draft(hook, primary, &plan, channel, &voice, opts, budget)
            .await;
        if word_count(&body) > budget.1 {
            body = trim_to_budget(&body, budget.1);
        }

        // Verify, repair, and re-verify at most `max_repair_retries` times.
        // The final repair is unconditional: stripping every unsupported
        // sentence guarantees the survivors all cleared the bar.
        let mut unsupported_audit = Vec::new();
        let mut report = self.verifier.verify(&body, &evidence_text);
        let mut rounds = 0;
        while !report.passed() && rounds <= self.config.max_repair_retries {
            warn!(
                hook_id = %hook.id,
                unsupported = report.unsupported.len(),
                round = rounds,
                "Draft failed claim verification, repairing"
            );
            unsupported_audit.extend(report.unsupported.iter().map(|c| c.sentence.clone()));
            body = self.verifier.repair(&body, &report.unsupported);
            report = self.verifier.verify(&body, &evidence_text);
            rounds += 1;
        }

        let repaired = !unsupported_audit.is_empty();
        let backend_drafted = model != TemplateDrafter::MODEL_ID;
        let alternates = if channel == Channel::Email {
            self.fan_out(hook, primary, opts)
        } else {
            Vec::new()
        };

        let variant = MessageVariant {
            id: Uuid::new_v4().to_string(),
            hook_id: hook.id.clone(),
            channel,
            subject: (channel == Channel::Email).then(|| plan.subjects[0].clone()),
            body,
            language: opts.language.clone(),
            voice,
            metadata: GenerationMeta {
                model,
                evidence_ids: hook.evidence_ids.clone(),
                generated_at: Utc::now(),
                unsupported_claims: unsupported_audit,
            },
            confidence: variant_confidence(backend_drafted, repaired, hook.confidence),
            alternates,
        };

        debug!(
            variant = %variant.id,
            hook = %hook.id,
            channel = %channel,
            words = word_count(&variant.body),
            repaired,
            "Variant composed"
        );
        Ok(variant)
    }

    /// Draft stage: backend when available, template fallback otherwise.
    #[allow(clippy::too_many_arguments)]
    async fn draft(
        &self,
        hook: &Hook,
        primary: &Evidence,
        plan: &MessagePlan,
        channel: Channel,
        voice: &VoiceProfile,
        opts: &GenerateOptions,
        budget: (usize, usize),
    ) -> (String, String) {
        if let Some(backend) = &self.backend {
            let request = DraftRequest {
                system: system_instruction(hook, plan, channel, voice, opts, budget),
                grounding: concat_evidence_text(std::slice::from_ref(primary)),
                word_budget: budget,
                language: opts.language.clone(),
            };
            match backend.draft(&request).await {
                Ok(text) if !text.trim().is_empty() => {
                    return (text, backend.model().to_string());
                }
                Ok(_) => {
                    warn!(hook_id = %hook.id, "Backend returned empty draft, using template");
                }
                Err(e) => {
                    warn!(hook_id = %hook.id, "Backend draft failed, using template: {e}");
                }
            }
        }

        let body = if channel.is_short_form() {
            TemplateDrafter::render_short(hook, primary, plan, channel, opts)
        } else {
            TemplateDrafter::render_long(hook, primary, plan, opts)
        };
        (body, TemplateDrafter::MODEL_ID.to_string())
    }

    /// Channel fan-out: short SMS and WhatsApp payloads derived from the same
    /// hook and evidence, carried on the email primary.
    fn fan_out(&self, hook: &Hook, primary: &Evidence, opts: &GenerateOptions) -> Vec<ChannelAlternate> {
        [Channel::Sms, Channel::Whatsapp]
            .into_iter()
            .map(|channel| {
                let plan = build_plan(hook, channel, opts);
                ChannelAlternate {
                    channel,
                    body: TemplateDrafter::render_short(hook, primary, &plan, channel, opts),
                }
            })
            .collect()
    }
}

/// Confidence heuristic: backend drafts start higher than template drafts,
/// repairs cost a step, and the hook's own classification confidence caps
/// the result.
fn variant_confidence(backend_used: bool, repaired: bool, hook_confidence: f64) -> f64 {
    let base: f64 = if backend_used { 0.85 } else { 0.75 };
    let penalty: f64 = if repaired { 0.10 } else { 0.0 };
    (base - penalty).min(hook_confidence + 0.2).clamp(0.0, 1.0)
}

fn concat_evidence_text(evidence: &[Evidence]) -> String {
    evidence
        .iter()
        .map(|e| {
            let quotes = e.quotes.join(" ");
            format!("{} {} {} {}", e.source, e.title, e.snippet, quotes)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::draft::DraftError;
    use crate::evidence::InMemoryEvidenceStore;
    use crate::hooks::{HookStatus, HookType};
    use async_trait::async_trait;
    use chrono::Duration;

    fn seeded_store() -> Arc<InMemoryEvidenceStore> {
        let store = Arc::new(InMemoryEvidenceStore::new());
        store.seed([Evidence {
            id: "e-1".to_string(),
            prospect_id: "p-1".to_string(),
            source: "Trustpilot".to_string(),
            title: "5-star review".to_string(),
            snippet: "5-star review, best service in Oslo".to_string(),
            quotes: vec![],
            published_at: Utc::now() - Duration::days(3),
            authority: Some(0.9),
        }]);
        store
    }

    fn hook() -> Hook {
        Hook {
            id: "h-1".to_string(),
            prospect_id: "p-1".to_string(),
            hook_type: HookType::ReviewWin,
            headline: "Fresh praise on Trustpilot: \"5-star review\"".to_string(),
            quote: Some("best service in Oslo".to_string()),
            evidence_ids: vec!["e-1".to_string()],
            freshness_days: 3,
            score: 0.85,
            confidence: 0.81,
            status: HookStatus::Approved,
            mined_at: Utc::now(),
        }
    }

    /// Backend that always fails, to exercise the degrade path.
    struct BrokenBackend;

    #[async_trait]
    impl DraftBackend for BrokenBackend {
        fn model(&self) -> &str {
            "broken-model"
        }
        async fn draft(&self, _request: &DraftRequest) -> Result<String, DraftError> {
            Err(DraftError::Unavailable("connection refused".to_string()))
        }
    }

    /// Backend that fabricates a claim the evidence cannot support.
    struct FabricatingBackend;

    #[async_trait]
    impl DraftBackend for FabricatingBackend {
        fn model(&self) -> &str {
            "fabricator-1"
        }
        async fn draft(&self, _request: &DraftRequest) -> Result<String, DraftError> {
            Ok("Congrats on the Trustpilot review from the team. \
They increased warehouse robots ninefold across Germany. \
Would a quick chat help?"
                .to_string())
        }
    }

    #[tokio::test]
    async fn test_template_path_mentions_source_within_budget() {
        let composer = MessageComposer::new(seeded_store());
        let variant = composer
            .generate(&hook(), Channel::Email, VoiceProfile::default(), &GenerateOptions::default())
            .await
            .unwrap();

        assert!(variant.body.contains("Trustpilot"));
        assert!(word_count(&variant.body) <= 130);
        assert!(variant.subject.is_some());
        assert_eq!(variant.metadata.model, "template");
    }

    #[tokio::test]
    async fn test_backend_failure_degrades_to_template() {
        let composer =
            MessageComposer::new(seeded_store()).with_backend(Arc::new(BrokenBackend));
        let variant = composer
            .generate(&hook(), Channel::Email, VoiceProfile::default(), &GenerateOptions::default())
            .await
            .unwrap();

        assert_eq!(variant.metadata.model, "template");
        assert!(!variant.body.is_empty());
    }

    #[tokio::test]
    async fn test_fabricated_claims_are_stripped_and_audited() {
        let composer =
            MessageComposer::new(seeded_store()).with_backend(Arc::new(FabricatingBackend));
        let variant = composer
            .generate(&hook(), Channel::Email, VoiceProfile::default(), &GenerateOptions::default())
            .await
            .unwrap();

        assert!(!variant.body.contains("ninefold"));
        assert_eq!(variant.metadata.unsupported_claims.len(), 1);
        assert_eq!(variant.metadata.model, "fabricator-1");

        // After repair the surviving text re-verifies clean.
        let verifier = ClaimVerifier::default();
        let report = verifier.verify(
            &variant.body,
            "Trustpilot 5-star review 5-star review, best service in Oslo",
        );
        assert!(report.passed() || report.claims.is_empty());
    }

    #[tokio::test]
    async fn test_email_variant_carries_short_form_alternates() {
        let composer = MessageComposer::new(seeded_store());
        let variant = composer
            .generate(&hook(), Channel::Email, VoiceProfile::default(), &GenerateOptions::default())
            .await
            .unwrap();

        let channels: Vec<Channel> = variant.alternates.iter().map(|a| a.channel).collect();
        assert_eq!(channels, vec![Channel::Sms, Channel::Whatsapp]);
        for alt in &variant.alternates {
            assert!(word_count(&alt.body) <= 80);
        }
    }

    #[tokio::test]
    async fn test_sms_variant_has_no_subject_or_alternates() {
        let composer = MessageComposer::new(seeded_store());
        let variant = composer
            .generate(&hook(), Channel::Sms, VoiceProfile::default(), &GenerateOptions::default())
            .await
            .unwrap();

        assert!(variant.subject.is_none());
        assert!(variant.alternates.is_empty());
        assert!(word_count(&variant.body) <= 80);
    }

    #[tokio::test]
    async fn test_missing_evidence_is_a_hard_failure() {
        let composer = MessageComposer::new(Arc::new(InMemoryEvidenceStore::new()));
        let err = composer
            .generate(&hook(), Channel::Email, VoiceProfile::default(), &GenerateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NoEvidence { .. }));
    }
}
