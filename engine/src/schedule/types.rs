//! Send schedule domain types and state machines.
//!
//! Schedules follow `Pending -> Active -> {Completed, Paused}`; steps follow
//! `Pending -> {Sent, Failed, Skipped}` and are terminal once they leave
//! `Pending` (a failed dispatch may roll back to `Pending` for one bounded
//! re-offer before settling on `Failed`).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::compose::Channel;

/// The fixed six-step escalation cadence: day offsets paired with channels.
pub const DEFAULT_CADENCE: [(i64, Channel); 6] = [
    (0, Channel::Email),
    (4, Channel::Email),
    (7, Channel::Sms),
    (11, Channel::Email),
    (14, Channel::Linkedin),
    (20, Channel::Email),
];

/// A prospect as the scheduler sees one: identity, contact handles, and the
/// attributes the compliance gate inspects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prospect {
    pub id: String,
    pub name: String,
    pub company: String,
    /// Company domain, the unit of cooldown and suppression
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    /// Preferred language short code
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
}

impl Prospect {
    /// Whether any contact channel is usable at all.
    pub fn has_contact_channel(&self) -> bool {
        self.email.is_some() || self.phone.is_some() || self.linkedin.is_some()
    }

    /// Contact handle for a channel, when present.
    pub fn contact_for(&self, channel: Channel) -> Option<&str> {
        match channel {
            Channel::Email => self.email.as_deref(),
            Channel::Sms | Channel::Whatsapp => self.phone.as_deref(),
            Channel::Linkedin => self.linkedin.as_deref(),
        }
    }
}

/// Rate and timing policy for one schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendCaps {
    /// Quiet hours as an hour-of-day window `(start, end)`, half-open and
    /// wrapping midnight when `start > end`. `start == end` disables it.
    pub quiet_hours: (u32, u32),
    /// Maximum steps sent per channel within one schedule
    pub max_attempts_per_channel: u32,
    /// Minimum gap in days between sends to the same domain (global)
    pub per_domain_frequency_days: i64,
    /// Minimum gap in days between consecutive steps of one schedule
    pub inter_step_delay_days: i64,
}

impl Default for SendCaps {
    fn default() -> Self {
        Self {
            quiet_hours: (20, 7),
            max_attempts_per_channel: 3,
            per_domain_frequency_days: 2,
            inter_step_delay_days: 2,
        }
    }
}

impl SendCaps {
    /// Whether `hour` falls inside the quiet-hours window.
    pub fn in_quiet_hours(&self, hour: u32) -> bool {
        let (start, end) = self.quiet_hours;
        if start == end {
            return false;
        }
        if start < end {
            hour >= start && hour < end
        } else {
            hour >= start || hour < end
        }
    }
}

/// Lifecycle of a schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    /// Created, waiting for the campaign to start
    Pending,
    /// Campaign started; steps become due as their offsets elapse
    Active,
    /// Halted by unsubscribe or an explicit campaign pause
    Paused,
    /// All steps resolved, or a reply arrived
    Completed,
}

impl ScheduleStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Active => write!(f, "active"),
            Self::Paused => write!(f, "paused"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Lifecycle of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Sent,
    Failed,
    Skipped,
}

/// Why a due step was skipped by the policy gates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Inside the quiet-hours window
    QuietHours,
    /// Channel already at its per-schedule attempt cap
    ChannelCapReached,
    /// Prospect domain inside its global cooldown window
    DomainCooldown,
    /// Compliance or consent check failed
    Compliance { detail: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuietHours => write!(f, "quiet hours"),
            Self::ChannelCapReached => write!(f, "channel cap reached"),
            Self::DomainCooldown => write!(f, "domain cooldown"),
            Self::Compliance { detail } => write!(f, "compliance: {detail}"),
        }
    }
}

/// Inbound delivery event, one per webhook callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseEvent {
    Delivered,
    Opened,
    Clicked,
    Replied,
    Unsubscribed,
}

impl std::fmt::Display for ResponseEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Delivered => write!(f, "delivered"),
            Self::Opened => write!(f, "opened"),
            Self::Clicked => write!(f, "clicked"),
            Self::Replied => write!(f, "replied"),
            Self::Unsubscribed => write!(f, "unsubscribed"),
        }
    }
}

/// Append-only response record on a sent step. Each flag is stamped at most
/// once; repeated events for the same flag are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opened_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clicked_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replied_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

impl StepResponse {
    /// Stamp exactly one flag for the event, first write wins.
    pub fn record(&mut self, event: ResponseEvent, at: DateTime<Utc>) {
        let slot = match event {
            ResponseEvent::Delivered => &mut self.delivered_at,
            ResponseEvent::Opened => &mut self.opened_at,
            ResponseEvent::Clicked => &mut self.clicked_at,
            ResponseEvent::Replied => &mut self.replied_at,
            ResponseEvent::Unsubscribed => &mut self.unsubscribed_at,
        };
        if slot.is_none() {
            *slot = Some(at);
        }
    }
}

/// One planned attempt within a schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendStep {
    /// 1-indexed position within the schedule
    pub step_number: u32,
    /// Days after schedule start when this step becomes due
    pub day_offset: i64,
    pub channel: Channel,
    /// The message variant dispatched by this step
    pub variant_id: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    /// Transport receipt identifier once dispatched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Dispatch attempts made (bounded transport re-offer)
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default)]
    pub response: StepResponse,
}

impl SendStep {
    /// Whether this step is due at `now` for a schedule started at `started_at`.
    pub fn is_due(&self, started_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.status == StepStatus::Pending && now >= started_at + Duration::days(self.day_offset)
    }
}

/// The unit of escalation for one (prospect, campaign) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendSchedule {
    pub id: String,
    pub prospect_id: String,
    pub campaign_id: String,
    /// Steps in strict day-offset order
    pub steps: Vec<SendStep>,
    pub caps: SendCaps,
    /// Outcome of the consent gate at creation time
    pub consent: bool,
    pub status: ScheduleStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl SendSchedule {
    /// Steps already sent on a channel within this schedule.
    pub fn sent_count_for_channel(&self, channel: Channel) -> u32 {
        self.steps
            .iter()
            .filter(|s| s.channel == channel && s.status == StepStatus::Sent)
            .count() as u32
    }

    /// Whether every step has left `Pending`.
    pub fn all_steps_resolved(&self) -> bool {
        self.steps.iter().all(|s| s.status != StepStatus::Pending)
    }

    /// Mutable step lookup by transport message id.
    pub fn step_by_message_id_mut(&mut self, message_id: &str) -> Option<&mut SendStep> {
        self.steps
            .iter_mut()
            .find(|s| s.message_id.as_deref() == Some(message_id))
    }

    /// Compact form for logging.
    pub fn summary(&self) -> String {
        format!(
            "schedule={} prospect={} campaign={} steps={} status={}",
            self.id,
            self.prospect_id,
            self.campaign_id,
            self.steps.len(),
            self.status,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_hours_wraps_midnight() {
        let caps = SendCaps {
            quiet_hours: (20, 7),
            ..Default::default()
        };
        assert!(caps.in_quiet_hours(22));
        assert!(caps.in_quiet_hours(3));
        assert!(!caps.in_quiet_hours(9));
        assert!(!caps.in_quiet_hours(19));
        // Boundary behavior: start inclusive, end exclusive.
        assert!(caps.in_quiet_hours(20));
        assert!(!caps.in_quiet_hours(7));
    }

    #[test]
    fn test_quiet_hours_plain_window_and_disabled() {
        let day = SendCaps {
            quiet_hours: (12, 14),
            ..Default::default()
        };
        assert!(day.in_quiet_hours(12));
        assert!(day.in_quiet_hours(13));
        assert!(!day.in_quiet_hours(14));

        let off = SendCaps {
            quiet_hours: (9, 9),
            ..Default::default()
        };
        for hour in 0..24 {
            assert!(!off.in_quiet_hours(hour));
        }
    }

    #[test]
    fn test_response_flags_are_append_only() {
        let mut response = StepResponse::default();
        let first = Utc::now();
        let later = first + Duration::hours(2);

        response.record(ResponseEvent::Opened, first);
        response.record(ResponseEvent::Opened, later);
        assert_eq!(response.opened_at, Some(first));
        assert!(response.replied_at.is_none());
    }

    #[test]
    fn test_step_due_respects_offset() {
        let started = Utc::now() - Duration::days(5);
        let step = SendStep {
            step_number: 2,
            day_offset: 4,
            channel: Channel::Email,
            variant_id: "v-1".to_string(),
            status: StepStatus::Pending,
            sent_at: None,
            message_id: None,
            attempts: 0,
            skip_reason: None,
            last_error: None,
            response: StepResponse::default(),
        };
        assert!(step.is_due(started, Utc::now()));
        assert!(!step.is_due(Utc::now(), Utc::now() + Duration::days(3)));
    }
}
