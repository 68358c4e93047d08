//! Outreach event bus.
//!
//! Tokio broadcast pub/sub for schedule and delivery transitions. Publishing
//! with no subscribers is not an error; the bus exists for metrics sinks and
//! driver-side observers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use crate::compose::Channel;
use crate::schedule::types::{ResponseEvent, SkipReason};
use crate::schedule::SuppressionReason;

/// Channel capacity for broadcast
const CHANNEL_CAPACITY: usize = 256;

/// All outreach engine events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutreachEvent {
    /// A schedule was created for a prospect in a campaign
    ScheduleCreated {
        schedule_id: String,
        prospect_id: String,
        campaign_id: String,
        step_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A campaign's pending schedules were activated
    CampaignStarted {
        campaign_id: String,
        activated: usize,
        timestamp: DateTime<Utc>,
    },

    /// A campaign's active schedules were paused
    CampaignPaused {
        campaign_id: String,
        paused: usize,
        timestamp: DateTime<Utc>,
    },

    /// A due step was dispatched successfully
    StepSent {
        schedule_id: String,
        step_number: u32,
        channel: Channel,
        message_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A dispatch attempt failed at the transport
    StepFailed {
        schedule_id: String,
        step_number: u32,
        channel: Channel,
        error: String,
        will_retry: bool,
        timestamp: DateTime<Utc>,
    },

    /// A due step was skipped by a policy gate
    StepSkipped {
        schedule_id: String,
        step_number: u32,
        channel: Channel,
        reason: SkipReason,
        timestamp: DateTime<Utc>,
    },

    /// An inbound delivery event was recorded on a step
    ResponseRecorded {
        schedule_id: String,
        message_id: String,
        event: ResponseEvent,
        timestamp: DateTime<Utc>,
    },

    /// A schedule reached `completed`
    ScheduleCompleted {
        schedule_id: String,
        replied: bool,
        timestamp: DateTime<Utc>,
    },

    /// A schedule was paused by an unsubscribe
    SchedulePaused {
        schedule_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A domain or address entered the suppression set
    ProspectSuppressed {
        value: String,
        reason: SuppressionReason,
        timestamp: DateTime<Utc>,
    },
}

impl OutreachEvent {
    /// Short type tag for structured logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ScheduleCreated { .. } => "schedule_created",
            Self::CampaignStarted { .. } => "campaign_started",
            Self::CampaignPaused { .. } => "campaign_paused",
            Self::StepSent { .. } => "step_sent",
            Self::StepFailed { .. } => "step_failed",
            Self::StepSkipped { .. } => "step_skipped",
            Self::ResponseRecorded { .. } => "response_recorded",
            Self::ScheduleCompleted { .. } => "schedule_completed",
            Self::SchedulePaused { .. } => "schedule_paused",
            Self::ProspectSuppressed { .. } => "prospect_suppressed",
        }
    }
}

/// Shared reference to an event bus
pub type SharedEventBus = Arc<EventBus>;

/// Broadcast event bus
pub struct EventBus {
    sender: broadcast::Sender<OutreachEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Create a shared reference.
    pub fn shared(self) -> SharedEventBus {
        Arc::new(self)
    }

    /// Publish an event to all subscribers. No receivers is fine.
    pub fn publish(&self, event: OutreachEvent) {
        let event_type = event.event_type();
        match self.sender.send(event) {
            Ok(count) => debug!(event_type, receivers = count, "Event published"),
            Err(_) => debug!(event_type, "Event published (no receivers)"),
        }
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<OutreachEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_and_receive() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(OutreachEvent::CampaignStarted {
            campaign_id: "c-1".to_string(),
            activated: 3,
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "campaign_started");
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.publish(OutreachEvent::SchedulePaused {
            schedule_id: "s-1".to_string(),
            timestamp: Utc::now(),
        });
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = OutreachEvent::ResponseRecorded {
            schedule_id: "s-1".to_string(),
            message_id: "m-1".to_string(),
            event: ResponseEvent::Replied,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"response_recorded\""));
        assert!(json.contains("\"event\":\"replied\""));
    }
}
