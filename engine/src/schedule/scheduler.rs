//! Escalation Scheduler — builds send plans, executes due steps under the
//! policy gates, and reacts to inbound delivery events.
//!
//! The sweep claims due steps under the write lock (marking them `Sent`
//! provisionally), dispatches outside the lock, and writes results back, so
//! concurrent ticks never double-send a step. Suppression and domain
//! cooldown are shared, injected state.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock as StdRwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::analytics::CampaignStats;
use crate::compose::{Channel, MessageVariant};
use crate::error::{EngineError, EngineResult};
use crate::events::{EventBus, OutreachEvent, SharedEventBus};
use crate::schedule::compliance::{
    ComplianceGate, SharedSuppressionSet, SuppressionEntry, SuppressionReason, SuppressionSet,
};
use crate::schedule::cooldown::{DomainCooldown, SharedDomainCooldown};
use crate::schedule::transport::{SendRequest, TransportRegistry};
use crate::schedule::types::{
    Prospect, ResponseEvent, ScheduleStatus, SendCaps, SendSchedule, SendStep, SkipReason,
    StepResponse, StepStatus, DEFAULT_CADENCE,
};

/// Dispatch attempts per step before it is marked failed permanently.
const MAX_DISPATCH_ATTEMPTS: u32 = 2;

/// Configuration for the scheduler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Default caps applied to new schedules
    pub caps: SendCaps,
    /// Languages the compliance gate accepts
    pub supported_languages: Vec<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            caps: SendCaps::default(),
            supported_languages: ["en", "no", "sv", "da", "de"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

/// One intended send or skip from a dry-run sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedSend {
    pub schedule_id: String,
    pub step_number: u32,
    pub channel: Channel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Present when the gates would skip this step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<SkipReason>,
}

/// Outcome of one sweep
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepReport {
    pub dry_run: bool,
    /// Due steps evaluated against the gates
    pub evaluated: usize,
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Intended actions (populated on dry runs)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub planned: Vec<PlannedSend>,
}

/// A claimed dispatch, carried between the claim and write-back phases.
struct DispatchJob {
    schedule_id: String,
    step_number: u32,
    channel: Channel,
    domain: String,
    request: SendRequest,
}

/// The Escalation Scheduler
pub struct EscalationScheduler {
    schedules: RwLock<HashMap<String, SendSchedule>>,
    prospects: RwLock<HashMap<String, Prospect>>,
    variants: RwLock<HashMap<String, MessageVariant>>,
    meetings: StdRwLock<HashMap<String, u64>>,
    gate: ComplianceGate,
    suppression: SharedSuppressionSet,
    cooldown: SharedDomainCooldown,
    transports: TransportRegistry,
    events: SharedEventBus,
    config: SchedulerConfig,
}

impl EscalationScheduler {
    /// Create a scheduler with its own suppression set, cooldown tracker,
    /// and event bus.
    pub fn new(transports: TransportRegistry, config: SchedulerConfig) -> Self {
        let suppression = SuppressionSet::new().shared();
        let cooldown = DomainCooldown::new().shared();
        Self::with_shared_state(transports, config, suppression, cooldown)
    }

    /// Create a scheduler over injected shared compliance state, so multiple
    /// scheduler instances observe consistent suppression and cooldown.
    pub fn with_shared_state(
        transports: TransportRegistry,
        config: SchedulerConfig,
        suppression: SharedSuppressionSet,
        cooldown: SharedDomainCooldown,
    ) -> Self {
        let gate = ComplianceGate::new(suppression.clone(), config.supported_languages.clone());
        Self {
            schedules: RwLock::new(HashMap::new()),
            prospects: RwLock::new(HashMap::new()),
            variants: RwLock::new(HashMap::new()),
            meetings: StdRwLock::new(HashMap::new()),
            gate,
            suppression,
            cooldown,
            transports,
            events: EventBus::new().shared(),
            config,
        }
    }

    /// The scheduler's event bus.
    pub fn events(&self) -> &SharedEventBus {
        &self.events
    }

    /// The shared suppression set.
    pub fn suppression(&self) -> &SharedSuppressionSet {
        &self.suppression
    }

    // =========================================================================
    // Schedule creation and campaign bulk operations
    // =========================================================================

    /// Create a send schedule for one (prospect, campaign) pair.
    ///
    /// Runs the compliance gate first and rejects on failure. Builds the
    /// fixed six-step cadence, pairing each step with the supplied variant
    /// matching its channel (directly, or through a carried short-form
    /// alternate); steps without a match are omitted, not inserted empty.
    pub async fn create_schedule(
        &self,
        prospect: Prospect,
        campaign_id: &str,
        variants: Vec<MessageVariant>,
    ) -> EngineResult<SendSchedule> {
        self.gate.check_compliance(&prospect)?;

        let caps = self.config.caps.clone();
        let now = Utc::now();
        let mut steps = Vec::new();
        let mut last_offset: Option<i64> = None;

        for (offset, channel) in DEFAULT_CADENCE {
            if !self.gate.check_consent(&prospect, channel) {
                debug!(prospect_id = %prospect.id, %channel, "Omitting step: no opt-in consent");
                continue;
            }
            let Some(variant) = variants.iter().find(|v| matches_channel(v, channel)) else {
                debug!(prospect_id = %prospect.id, %channel, "Omitting step: no matching variant");
                continue;
            };

            // Preserve at least the configured gap between consecutive steps.
            let offset = match last_offset {
                Some(prev) => offset.max(prev + caps.inter_step_delay_days),
                None => offset,
            };
            last_offset = Some(offset);

            steps.push(SendStep {
                step_number: steps.len() as u32 + 1,
                day_offset: offset,
                channel,
                variant_id: variant.id.clone(),
                status: StepStatus::Pending,
                sent_at: None,
                message_id: None,
                attempts: 0,
                skip_reason: None,
                last_error: None,
                response: StepResponse::default(),
            });
        }

        let schedule = SendSchedule {
            id: Uuid::new_v4().to_string(),
            prospect_id: prospect.id.clone(),
            campaign_id: campaign_id.to_string(),
            steps,
            caps,
            consent: true,
            status: ScheduleStatus::Pending,
            created_at: now,
            started_at: None,
            completed_at: None,
        };

        info!(summary = %schedule.summary(), "Schedule created");
        self.events.publish(OutreachEvent::ScheduleCreated {
            schedule_id: schedule.id.clone(),
            prospect_id: prospect.id.clone(),
            campaign_id: campaign_id.to_string(),
            step_count: schedule.steps.len(),
            timestamp: now,
        });

        {
            let mut prospects = self.prospects.write().await;
            prospects.insert(prospect.id.clone(), prospect);
        }
        {
            let mut stored = self.variants.write().await;
            for variant in variants {
                stored.insert(variant.id.clone(), variant);
            }
        }
        let mut schedules = self.schedules.write().await;
        schedules.insert(schedule.id.clone(), schedule.clone());
        Ok(schedule)
    }

    /// Activate all pending schedules of a campaign, starting their clocks
    /// now. Returns the number activated.
    pub async fn start_campaign(&self, campaign_id: &str) -> usize {
        self.start_campaign_at(campaign_id, Utc::now()).await
    }

    /// Activate all pending schedules of a campaign with an explicit start
    /// instant.
    pub async fn start_campaign_at(&self, campaign_id: &str, started_at: DateTime<Utc>) -> usize {
        let mut schedules = self.schedules.write().await;
        let mut activated = 0;
        for schedule in schedules.values_mut() {
            if schedule.campaign_id == campaign_id && schedule.status == ScheduleStatus::Pending {
                schedule.status = ScheduleStatus::Active;
                schedule.started_at = Some(started_at);
                activated += 1;
            }
        }
        info!(campaign_id, activated, "Campaign started");
        self.events.publish(OutreachEvent::CampaignStarted {
            campaign_id: campaign_id.to_string(),
            activated,
            timestamp: Utc::now(),
        });
        activated
    }

    /// Pause all active schedules of a campaign. Already-sent steps are left
    /// untouched. Returns the number paused.
    pub async fn pause_campaign(&self, campaign_id: &str) -> usize {
        let mut schedules = self.schedules.write().await;
        let mut paused = 0;
        for schedule in schedules.values_mut() {
            if schedule.campaign_id == campaign_id && schedule.status == ScheduleStatus::Active {
                schedule.status = ScheduleStatus::Paused;
                paused += 1;
            }
        }
        info!(campaign_id, paused, "Campaign paused");
        self.events.publish(OutreachEvent::CampaignPaused {
            campaign_id: campaign_id.to_string(),
            paused,
            timestamp: Utc::now(),
        });
        paused
    }

    // =========================================================================
    // Sweep execution
    // =========================================================================

    /// Sweep all active schedules, evaluating due steps against the four
    /// policy gates and dispatching the survivors.
    ///
    /// Idempotent per step: a step that has left `Pending` is never
    /// re-evaluated, so re-running the sweep on every tick is safe. With
    /// `dry_run` the intended actions are reported without mutating state.
    pub async fn execute_sends(&self, dry_run: bool) -> EngineResult<SweepReport> {
        let now = Utc::now();
        let mut report = SweepReport {
            dry_run,
            ..Default::default()
        };
        let mut jobs: Vec<DispatchJob> = Vec::new();

        {
            let mut schedules = self.schedules.write().await;
            let prospects = self.prospects.read().await;
            let variants = self.variants.read().await;

            for schedule in schedules
                .values_mut()
                .filter(|s| s.status == ScheduleStatus::Active)
            {
                let Some(started_at) = schedule.started_at else {
                    continue;
                };
                let Some(prospect) = prospects.get(&schedule.prospect_id) else {
                    warn!(schedule_id = %schedule.id, "Prospect record missing, skipping schedule");
                    continue;
                };

                // At most one step per channel is actioned per evaluation
                // instant; later due steps on the same channel wait for the
                // next sweep.
                let mut claimed_channels: HashSet<Channel> = HashSet::new();

                for idx in 0..schedule.steps.len() {
                    let (due, channel) = {
                        let step = &schedule.steps[idx];
                        (step.is_due(started_at, now), step.channel)
                    };
                    if !due || claimed_channels.contains(&channel) {
                        continue;
                    }
                    report.evaluated += 1;

                    let decision = {
                        let step = &schedule.steps[idx];
                        self.evaluate_gates(schedule, step, prospect, now)
                    };

                    let step_number = schedule.steps[idx].step_number;
                    match decision {
                        Err(reason) => {
                            report.skipped += 1;
                            if dry_run {
                                report.planned.push(PlannedSend {
                                    schedule_id: schedule.id.clone(),
                                    step_number,
                                    channel,
                                    to: None,
                                    skip: Some(reason),
                                });
                            } else {
                                let step = &mut schedule.steps[idx];
                                step.status = StepStatus::Skipped;
                                step.skip_reason = Some(reason.clone());
                                debug!(
                                    schedule_id = %schedule.id,
                                    step_number,
                                    %channel,
                                    %reason,
                                    "Step skipped by policy gate"
                                );
                                self.events.publish(OutreachEvent::StepSkipped {
                                    schedule_id: schedule.id.clone(),
                                    step_number,
                                    channel,
                                    reason,
                                    timestamp: now,
                                });
                            }
                        }
                        Ok(()) => {
                            let variant_id = schedule.steps[idx].variant_id.clone();
                            let payload = variants
                                .get(&variant_id)
                                .and_then(|v| resolve_payload(v, channel));
                            let to = prospect.contact_for(channel).map(str::to_string);

                            let (Some((subject, body)), Some(to)) = (payload, to) else {
                                let reason = SkipReason::Compliance {
                                    detail: "variant or contact handle unresolvable".to_string(),
                                };
                                report.skipped += 1;
                                if !dry_run {
                                    let step = &mut schedule.steps[idx];
                                    step.status = StepStatus::Skipped;
                                    step.skip_reason = Some(reason);
                                }
                                continue;
                            };

                            claimed_channels.insert(channel);
                            if dry_run {
                                report.planned.push(PlannedSend {
                                    schedule_id: schedule.id.clone(),
                                    step_number,
                                    channel,
                                    to: Some(to),
                                    skip: None,
                                });
                                continue;
                            }

                            // Claim before the network call: a concurrent
                            // tick sees `Sent` and never re-dispatches.
                            let step = &mut schedule.steps[idx];
                            step.status = StepStatus::Sent;
                            step.sent_at = Some(now);
                            step.attempts += 1;

                            let mut metadata = HashMap::new();
                            metadata.insert("schedule_id".to_string(), schedule.id.clone());
                            metadata.insert("step".to_string(), step_number.to_string());
                            jobs.push(DispatchJob {
                                schedule_id: schedule.id.clone(),
                                step_number,
                                channel,
                                domain: prospect.domain.clone(),
                                request: SendRequest {
                                    to,
                                    subject,
                                    body,
                                    metadata,
                                },
                            });
                        }
                    }
                }
            }
        }

        // Dispatch outside the lock.
        let mut outcomes = Vec::with_capacity(jobs.len());
        for job in jobs {
            let result = match self.transports.get(job.channel) {
                Ok(transport) => transport.send(&job.request).await,
                Err(e) => Err(e),
            };
            outcomes.push((job, result));
        }

        // Write results back.
        {
            let mut schedules = self.schedules.write().await;
            for (job, result) in outcomes {
                let Some(schedule) = schedules.get_mut(&job.schedule_id) else {
                    continue;
                };
                let Some(step) = schedule
                    .steps
                    .iter_mut()
                    .find(|s| s.step_number == job.step_number)
                else {
                    continue;
                };

                match result {
                    Ok(receipt) => {
                        step.message_id = Some(receipt.message_id.clone());
                        self.cooldown.mark_sent(&job.domain, now);
                        report.sent += 1;
                        info!(
                            schedule_id = %job.schedule_id,
                            step_number = job.step_number,
                            channel = %job.channel,
                            message_id = %receipt.message_id,
                            "Step sent"
                        );
                        self.events.publish(OutreachEvent::StepSent {
                            schedule_id: job.schedule_id.clone(),
                            step_number: job.step_number,
                            channel: job.channel,
                            message_id: receipt.message_id,
                            timestamp: now,
                        });
                    }
                    Err(e) => {
                        report.failed += 1;
                        let will_retry = step.attempts < MAX_DISPATCH_ATTEMPTS;
                        if will_retry {
                            // Roll the claim back; the next sweep re-offers it.
                            step.status = StepStatus::Pending;
                            step.sent_at = None;
                        } else {
                            step.status = StepStatus::Failed;
                        }
                        step.last_error = Some(e.to_string());
                        warn!(
                            schedule_id = %job.schedule_id,
                            step_number = job.step_number,
                            channel = %job.channel,
                            will_retry,
                            "Dispatch failed: {e}"
                        );
                        self.events.publish(OutreachEvent::StepFailed {
                            schedule_id: job.schedule_id.clone(),
                            step_number: job.step_number,
                            channel: job.channel,
                            error: e.to_string(),
                            will_retry,
                            timestamp: now,
                        });
                    }
                }
            }

            // Schedules whose steps have all resolved are completed.
            if !dry_run {
                for schedule in schedules.values_mut() {
                    if schedule.status == ScheduleStatus::Active && schedule.all_steps_resolved() {
                        schedule.status = ScheduleStatus::Completed;
                        schedule.completed_at = Some(now);
                        self.events.publish(OutreachEvent::ScheduleCompleted {
                            schedule_id: schedule.id.clone(),
                            replied: false,
                            timestamp: now,
                        });
                    }
                }
            }
        }

        debug!(
            dry_run,
            evaluated = report.evaluated,
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            "Sweep finished"
        );
        Ok(report)
    }

    /// Evaluate the four independent policy gates for one due step.
    fn evaluate_gates(
        &self,
        schedule: &SendSchedule,
        step: &SendStep,
        prospect: &Prospect,
        now: DateTime<Utc>,
    ) -> Result<(), SkipReason> {
        if schedule.caps.in_quiet_hours(now_hour(now)) {
            return Err(SkipReason::QuietHours);
        }
        if schedule.sent_count_for_channel(step.channel) >= schedule.caps.max_attempts_per_channel
        {
            return Err(SkipReason::ChannelCapReached);
        }
        if self
            .cooldown
            .in_cooldown(&prospect.domain, schedule.caps.per_domain_frequency_days, now)
        {
            return Err(SkipReason::DomainCooldown);
        }
        if let Err(e) = self.gate.check_compliance(prospect) {
            return Err(SkipReason::Compliance {
                detail: e.to_string(),
            });
        }
        if !self.gate.check_consent(prospect, step.channel) {
            return Err(SkipReason::Compliance {
                detail: format!("channel {} requires opt-in consent", step.channel),
            });
        }
        Ok(())
    }

    // =========================================================================
    // Inbound delivery events
    // =========================================================================

    /// Record a delivery webhook event against the step owning `message_id`.
    ///
    /// Stamps exactly one response flag. `Replied` completes the schedule
    /// immediately; `Unsubscribed` pauses it and suppresses the prospect's
    /// domain and address for all future schedule creation.
    pub async fn handle_response(
        &self,
        message_id: &str,
        event: ResponseEvent,
        metadata: HashMap<String, String>,
    ) -> EngineResult<()> {
        let now = Utc::now();
        let mut schedules = self.schedules.write().await;

        let schedule = schedules
            .values_mut()
            .find(|s| s.steps.iter().any(|st| st.message_id.as_deref() == Some(message_id)))
            .ok_or_else(|| EngineError::UnknownMessage(message_id.to_string()))?;

        let step = schedule
            .step_by_message_id_mut(message_id)
            .ok_or_else(|| EngineError::UnknownMessage(message_id.to_string()))?;
        step.response.record(event, now);

        debug!(message_id, %event, ?metadata, "Delivery event recorded");
        self.events.publish(OutreachEvent::ResponseRecorded {
            schedule_id: schedule.id.clone(),
            message_id: message_id.to_string(),
            event,
            timestamp: now,
        });

        match event {
            ResponseEvent::Replied => {
                if schedule.status != ScheduleStatus::Completed {
                    schedule.status = ScheduleStatus::Completed;
                    schedule.completed_at = Some(now);
                    info!(schedule_id = %schedule.id, "Reply received, schedule completed");
                    self.events.publish(OutreachEvent::ScheduleCompleted {
                        schedule_id: schedule.id.clone(),
                        replied: true,
                        timestamp: now,
                    });
                }
            }
            ResponseEvent::Unsubscribed => {
                schedule.status = ScheduleStatus::Paused;
                info!(schedule_id = %schedule.id, "Unsubscribe received, schedule paused");
                self.events.publish(OutreachEvent::SchedulePaused {
                    schedule_id: schedule.id.clone(),
                    timestamp: now,
                });

                let prospect_id = schedule.prospect_id.clone();
                let prospects = self.prospects.read().await;
                if let Some(prospect) = prospects.get(&prospect_id) {
                    self.suppress_prospect(prospect, SuppressionReason::Unsubscribed, now);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn suppress_prospect(&self, prospect: &Prospect, reason: SuppressionReason, now: DateTime<Utc>) {
        self.suppression.add(&prospect.domain, reason);
        self.events.publish(OutreachEvent::ProspectSuppressed {
            value: prospect.domain.clone(),
            reason,
            timestamp: now,
        });
        if let Some(email) = &prospect.email {
            self.suppression.add(email, reason);
            self.events.publish(OutreachEvent::ProspectSuppressed {
                value: email.clone(),
                reason,
                timestamp: now,
            });
        }
    }

    // =========================================================================
    // Statistics and suppression management
    // =========================================================================

    /// Roll up statistics for a campaign.
    pub async fn campaign_stats(&self, campaign_id: &str) -> CampaignStats {
        let schedules = self.schedules.read().await;
        let campaign: Vec<&SendSchedule> = schedules
            .values()
            .filter(|s| s.campaign_id == campaign_id)
            .collect();
        let meetings = {
            let meetings = self.meetings.read().unwrap_or_else(|e| e.into_inner());
            meetings.get(campaign_id).copied().unwrap_or(0)
        };
        CampaignStats::from_schedules(campaign_id, &campaign, meetings)
    }

    /// Record a booked meeting for a campaign.
    pub fn record_meeting(&self, campaign_id: &str) {
        let mut meetings = self.meetings.write().unwrap_or_else(|e| e.into_inner());
        *meetings.entry(campaign_id.to_string()).or_insert(0) += 1;
    }

    /// Add a domain or address to the suppression set.
    pub fn suppress(&self, value: &str, reason: SuppressionReason) {
        self.suppression.add(value, reason);
        self.events.publish(OutreachEvent::ProspectSuppressed {
            value: value.to_string(),
            reason,
            timestamp: Utc::now(),
        });
    }

    /// Whether a domain or address is suppressed.
    pub fn is_suppressed(&self, value: &str) -> bool {
        self.suppression.contains(value)
    }

    /// Snapshot of the suppression list.
    pub fn suppression_entries(&self) -> Vec<SuppressionEntry> {
        self.suppression.list()
    }

    /// Fetch a schedule by id.
    pub async fn get_schedule(&self, schedule_id: &str) -> Option<SendSchedule> {
        let schedules = self.schedules.read().await;
        schedules.get(schedule_id).cloned()
    }

    /// Schedules belonging to a campaign.
    pub async fn campaign_schedules(&self, campaign_id: &str) -> Vec<SendSchedule> {
        let schedules = self.schedules.read().await;
        schedules
            .values()
            .filter(|s| s.campaign_id == campaign_id)
            .cloned()
            .collect()
    }
}

/// Whether a supplied variant can serve a step on `channel`, directly or via
/// a carried short-form alternate.
fn matches_channel(variant: &MessageVariant, channel: Channel) -> bool {
    variant.channel == channel || variant.alternates.iter().any(|a| a.channel == channel)
}

/// Resolve the (subject, body) payload a variant provides for a channel.
fn resolve_payload(variant: &MessageVariant, channel: Channel) -> Option<(Option<String>, String)> {
    if variant.channel == channel {
        return Some((variant.subject.clone(), variant.body.clone()));
    }
    variant
        .alternates
        .iter()
        .find(|a| a.channel == channel)
        .map(|a| (None, a.body.clone()))
}

fn now_hour(now: DateTime<Utc>) -> u32 {
    use chrono::Timelike;
    now.hour()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{ChannelAlternate, GenerationMeta, VoiceProfile};
    use crate::schedule::transport::{ChannelTransport, SendReceipt, TransportError};
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    /// Transport fake that records requests and can be told to fail.
    struct FakeTransport {
        channel: Channel,
        fail: bool,
        counter: AtomicU32,
        requests: Mutex<Vec<SendRequest>>,
    }

    impl FakeTransport {
        fn new(channel: Channel) -> Arc<Self> {
            Arc::new(Self {
                channel,
                fail: false,
                counter: AtomicU32::new(0),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn failing(channel: Channel) -> Arc<Self> {
            Arc::new(Self {
                channel,
                fail: true,
                counter: AtomicU32::new(0),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn sent_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChannelTransport for FakeTransport {
        fn channel(&self) -> Channel {
            self.channel
        }

        async fn send(&self, request: &SendRequest) -> Result<SendReceipt, TransportError> {
            if self.fail {
                return Err(TransportError::Provider("simulated outage".to_string()));
            }
            self.requests.lock().unwrap().push(request.clone());
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            Ok(SendReceipt {
                message_id: format!("{}-msg-{}", self.channel, n),
            })
        }
    }

    fn prospect() -> Prospect {
        Prospect {
            id: "p-1".to_string(),
            name: "Anna Berg".to_string(),
            company: "Fjord Clean AS".to_string(),
            domain: "fjordclean.no".to_string(),
            email: Some("anna@fjordclean.no".to_string()),
            phone: Some("+4740000000".to_string()),
            linkedin: Some("annaberg".to_string()),
            language: "no".to_string(),
            industry: None,
        }
    }

    fn variant(id: &str, channel: Channel, alternates: Vec<ChannelAlternate>) -> MessageVariant {
        MessageVariant {
            id: id.to_string(),
            hook_id: "h-1".to_string(),
            channel,
            subject: (channel == Channel::Email).then(|| "Quick note".to_string()),
            body: "Saw the Trustpilot news. Worth a chat?".to_string(),
            language: "no".to_string(),
            voice: VoiceProfile::default(),
            metadata: GenerationMeta {
                model: "template".to_string(),
                evidence_ids: vec!["e-1".to_string()],
                generated_at: Utc::now(),
                unsupported_claims: vec![],
            },
            confidence: 0.8,
            alternates,
        }
    }

    fn full_variants() -> Vec<MessageVariant> {
        vec![
            variant(
                "v-email",
                Channel::Email,
                vec![
                    ChannelAlternate {
                        channel: Channel::Sms,
                        body: "Short note about the Trustpilot news.".to_string(),
                    },
                    ChannelAlternate {
                        channel: Channel::Whatsapp,
                        body: "👋 Short note about the Trustpilot news.".to_string(),
                    },
                ],
            ),
            variant("v-linkedin", Channel::Linkedin, vec![]),
        ]
    }

    fn open_caps() -> SendCaps {
        SendCaps {
            // start == end disables quiet hours so tests are time-of-day safe
            quiet_hours: (0, 0),
            max_attempts_per_channel: 6,
            per_domain_frequency_days: 0,
            inter_step_delay_days: 2,
        }
    }

    fn config_with(caps: SendCaps) -> SchedulerConfig {
        SchedulerConfig {
            caps,
            supported_languages: vec!["en".to_string(), "no".to_string()],
        }
    }

    fn scheduler_with(
        email: Arc<FakeTransport>,
        caps: SendCaps,
    ) -> EscalationScheduler {
        let registry = TransportRegistry::new()
            .register(email)
            .register(FakeTransport::new(Channel::Sms))
            .register(FakeTransport::new(Channel::Linkedin));
        EscalationScheduler::new(registry, config_with(caps))
    }

    #[tokio::test]
    async fn test_schedule_has_six_steps_with_full_variants() {
        let scheduler = scheduler_with(FakeTransport::new(Channel::Email), open_caps());
        let schedule = scheduler
            .create_schedule(prospect(), "c-1", full_variants())
            .await
            .unwrap();

        assert_eq!(schedule.steps.len(), 6);
        let offsets: Vec<i64> = schedule.steps.iter().map(|s| s.day_offset).collect();
        assert_eq!(offsets, vec![0, 4, 7, 11, 14, 20]);
        assert_eq!(schedule.status, ScheduleStatus::Pending);
    }

    #[tokio::test]
    async fn test_steps_without_matching_variant_are_omitted() {
        let scheduler = scheduler_with(FakeTransport::new(Channel::Email), open_caps());
        // Email-only variant without alternates: sms and linkedin steps drop.
        let schedule = scheduler
            .create_schedule(prospect(), "c-1", vec![variant("v-email", Channel::Email, vec![])])
            .await
            .unwrap();

        assert_eq!(schedule.steps.len(), 4);
        assert!(schedule.steps.iter().all(|s| s.channel == Channel::Email));
    }

    #[tokio::test]
    async fn test_inter_step_delay_stretches_offsets() {
        let mut caps = open_caps();
        caps.inter_step_delay_days = 5;
        let scheduler = scheduler_with(FakeTransport::new(Channel::Email), caps);
        let schedule = scheduler
            .create_schedule(prospect(), "c-1", full_variants())
            .await
            .unwrap();

        let offsets: Vec<i64> = schedule.steps.iter().map(|s| s.day_offset).collect();
        for pair in offsets.windows(2) {
            assert!(pair[1] - pair[0] >= 5, "offsets: {offsets:?}");
        }
    }

    #[tokio::test]
    async fn test_suppressed_prospect_is_rejected() {
        let scheduler = scheduler_with(FakeTransport::new(Channel::Email), open_caps());
        scheduler.suppress("fjordclean.no", SuppressionReason::Manual);

        let err = scheduler
            .create_schedule(prospect(), "c-1", full_variants())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Compliance(_)));
    }

    #[tokio::test]
    async fn test_sweep_sends_due_step_once() {
        let email = FakeTransport::new(Channel::Email);
        let scheduler = scheduler_with(email.clone(), open_caps());
        scheduler
            .create_schedule(prospect(), "c-1", full_variants())
            .await
            .unwrap();
        scheduler.start_campaign("c-1").await;

        let first = scheduler.execute_sends(false).await.unwrap();
        assert_eq!(first.sent, 1);

        // Immediately re-running sends nothing new.
        let second = scheduler.execute_sends(false).await.unwrap();
        assert_eq!(second.sent, 0);
        assert_eq!(email.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_mutates_nothing() {
        let email = FakeTransport::new(Channel::Email);
        let scheduler = scheduler_with(email.clone(), open_caps());
        let schedule = scheduler
            .create_schedule(prospect(), "c-1", full_variants())
            .await
            .unwrap();
        scheduler.start_campaign("c-1").await;

        let report = scheduler.execute_sends(true).await.unwrap();
        assert!(report.dry_run);
        assert_eq!(report.planned.len(), 1);
        assert_eq!(report.sent, 0);
        assert_eq!(email.sent_count(), 0);

        let after = scheduler.get_schedule(&schedule.id).await.unwrap();
        assert!(after.steps.iter().all(|s| s.status == StepStatus::Pending));
    }

    #[tokio::test]
    async fn test_quiet_hours_skips_step() {
        let mut caps = open_caps();
        // Window covering the whole day: every send instant is quiet.
        caps.quiet_hours = (0, 24);
        let email = FakeTransport::new(Channel::Email);
        let scheduler = scheduler_with(email.clone(), caps);
        let schedule = scheduler
            .create_schedule(prospect(), "c-1", full_variants())
            .await
            .unwrap();
        scheduler.start_campaign("c-1").await;

        let report = scheduler.execute_sends(false).await.unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.sent, 0);
        assert_eq!(email.sent_count(), 0);

        let after = scheduler.get_schedule(&schedule.id).await.unwrap();
        assert_eq!(after.steps[0].status, StepStatus::Skipped);
        assert_eq!(after.steps[0].skip_reason, Some(SkipReason::QuietHours));
    }

    #[tokio::test]
    async fn test_channel_cap_skips_after_limit() {
        let mut caps = open_caps();
        caps.max_attempts_per_channel = 1;
        let email = FakeTransport::new(Channel::Email);
        let scheduler = scheduler_with(email.clone(), caps);
        scheduler
            .create_schedule(prospect(), "c-1", full_variants())
            .await
            .unwrap();
        // Backdate the start so the day-0 and day-4 email steps are both due.
        scheduler
            .start_campaign_at("c-1", Utc::now() - Duration::days(5))
            .await;

        // First sweep claims one email step (one per channel per instant).
        let first = scheduler.execute_sends(false).await.unwrap();
        assert_eq!(first.sent, 1);

        // Second sweep: the other due email step hits the channel cap.
        let second = scheduler.execute_sends(false).await.unwrap();
        assert_eq!(second.sent, 0);
        assert!(second.skipped >= 1);
        assert_eq!(email.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_domain_cooldown_skips_step() {
        let mut caps = open_caps();
        caps.per_domain_frequency_days = 3;
        let registry = TransportRegistry::new().register(FakeTransport::new(Channel::Email));
        let suppression = SuppressionSet::new().shared();
        let cooldown = DomainCooldown::new().shared();
        cooldown.mark_sent("fjordclean.no", Utc::now());
        let scheduler = EscalationScheduler::with_shared_state(
            registry,
            config_with(caps),
            suppression,
            cooldown,
        );

        let schedule = scheduler
            .create_schedule(prospect(), "c-1", full_variants())
            .await
            .unwrap();
        scheduler.start_campaign("c-1").await;

        let report = scheduler.execute_sends(false).await.unwrap();
        assert_eq!(report.sent, 0);
        let after = scheduler.get_schedule(&schedule.id).await.unwrap();
        assert_eq!(after.steps[0].skip_reason, Some(SkipReason::DomainCooldown));
    }

    #[tokio::test]
    async fn test_transport_failure_reoffers_then_fails_permanently() {
        let email = FakeTransport::failing(Channel::Email);
        let scheduler = scheduler_with(email, open_caps());
        let schedule = scheduler
            .create_schedule(prospect(), "c-1", full_variants())
            .await
            .unwrap();
        scheduler.start_campaign("c-1").await;

        // First failure rolls the step back to pending.
        let first = scheduler.execute_sends(false).await.unwrap();
        assert_eq!(first.failed, 1);
        let after = scheduler.get_schedule(&schedule.id).await.unwrap();
        assert_eq!(after.steps[0].status, StepStatus::Pending);
        assert_eq!(after.steps[0].attempts, 1);
        assert!(after.steps[0].last_error.is_some());

        // Second failure is permanent.
        let second = scheduler.execute_sends(false).await.unwrap();
        assert_eq!(second.failed, 1);
        let after = scheduler.get_schedule(&schedule.id).await.unwrap();
        assert_eq!(after.steps[0].status, StepStatus::Failed);

        // Third sweep no longer evaluates the step.
        let third = scheduler.execute_sends(false).await.unwrap();
        assert_eq!(third.evaluated, 0);
    }

    #[tokio::test]
    async fn test_replied_completes_schedule_and_stops_sends() {
        let email = FakeTransport::new(Channel::Email);
        let scheduler = scheduler_with(email.clone(), open_caps());
        let schedule = scheduler
            .create_schedule(prospect(), "c-1", full_variants())
            .await
            .unwrap();
        // Backdate far enough that several steps are due.
        scheduler
            .start_campaign_at("c-1", Utc::now() - Duration::days(8))
            .await;

        let first = scheduler.execute_sends(false).await.unwrap();
        assert!(first.sent >= 1);

        let after = scheduler.get_schedule(&schedule.id).await.unwrap();
        let message_id = after.steps[0].message_id.clone().unwrap();
        scheduler
            .handle_response(&message_id, ResponseEvent::Replied, HashMap::new())
            .await
            .unwrap();

        let after = scheduler.get_schedule(&schedule.id).await.unwrap();
        assert_eq!(after.status, ScheduleStatus::Completed);
        assert!(after.completed_at.is_some());

        // No further steps go out.
        let next = scheduler.execute_sends(false).await.unwrap();
        assert_eq!(next.sent, 0);
        assert_eq!(next.evaluated, 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_pauses_and_suppresses() {
        let email = FakeTransport::new(Channel::Email);
        let scheduler = scheduler_with(email, open_caps());
        let schedule = scheduler
            .create_schedule(prospect(), "c-1", full_variants())
            .await
            .unwrap();
        scheduler.start_campaign("c-1").await;
        scheduler.execute_sends(false).await.unwrap();

        let after = scheduler.get_schedule(&schedule.id).await.unwrap();
        let message_id = after.steps[0].message_id.clone().unwrap();
        scheduler
            .handle_response(&message_id, ResponseEvent::Unsubscribed, HashMap::new())
            .await
            .unwrap();

        let after = scheduler.get_schedule(&schedule.id).await.unwrap();
        assert_eq!(after.status, ScheduleStatus::Paused);
        assert!(scheduler.is_suppressed("fjordclean.no"));
        assert!(scheduler.is_suppressed("anna@fjordclean.no"));

        // The same prospect can no longer get a new schedule.
        let err = scheduler
            .create_schedule(prospect(), "c-2", full_variants())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Compliance(_)));
    }

    #[tokio::test]
    async fn test_unknown_message_id_is_an_error() {
        let scheduler = scheduler_with(FakeTransport::new(Channel::Email), open_caps());
        let err = scheduler
            .handle_response("no-such-message", ResponseEvent::Opened, HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownMessage(_)));
    }

    #[tokio::test]
    async fn test_campaign_stats_rollup() {
        let email = FakeTransport::new(Channel::Email);
        let scheduler = scheduler_with(email, open_caps());
        let schedule = scheduler
            .create_schedule(prospect(), "c-1", full_variants())
            .await
            .unwrap();
        scheduler.start_campaign("c-1").await;
        scheduler.execute_sends(false).await.unwrap();

        let after = scheduler.get_schedule(&schedule.id).await.unwrap();
        let message_id = after.steps[0].message_id.clone().unwrap();
        scheduler
            .handle_response(&message_id, ResponseEvent::Opened, HashMap::new())
            .await
            .unwrap();
        scheduler.record_meeting("c-1");

        let stats = scheduler.campaign_stats("c-1").await;
        assert_eq!(stats.messages_sent, 1);
        assert_eq!(stats.opened, 1);
        assert_eq!(stats.meetings, 1);
        assert!((stats.open_rate - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_pause_campaign_halts_future_evaluation() {
        let email = FakeTransport::new(Channel::Email);
        let scheduler = scheduler_with(email.clone(), open_caps());
        scheduler
            .create_schedule(prospect(), "c-1", full_variants())
            .await
            .unwrap();
        scheduler.start_campaign("c-1").await;

        let paused = scheduler.pause_campaign("c-1").await;
        assert_eq!(paused, 1);

        let report = scheduler.execute_sends(false).await.unwrap();
        assert_eq!(report.evaluated, 0);
        assert_eq!(email.sent_count(), 0);
    }
}
