//! Campaign statistics rollup.

use serde::{Deserialize, Serialize};

use crate::schedule::types::{ScheduleStatus, SendSchedule, StepStatus};

/// Aggregated campaign statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampaignStats {
    pub campaign_id: String,
    pub schedules: usize,
    pub active_schedules: usize,
    pub completed_schedules: usize,
    pub messages_sent: u64,
    pub delivered: u64,
    pub opened: u64,
    pub clicked: u64,
    pub replied: u64,
    pub unsubscribed: u64,
    /// Meetings booked, recorded explicitly via the scheduler
    pub meetings: u64,
    /// opened / messages_sent, 0 when nothing was sent
    pub open_rate: f64,
    /// replied / messages_sent, 0 when nothing was sent
    pub reply_rate: f64,
}

impl CampaignStats {
    /// Roll up stats from a campaign's schedules plus the meetings counter.
    pub fn from_schedules(campaign_id: &str, schedules: &[&SendSchedule], meetings: u64) -> Self {
        let mut stats = CampaignStats {
            campaign_id: campaign_id.to_string(),
            schedules: schedules.len(),
            meetings,
            ..Default::default()
        };

        for schedule in schedules {
            match schedule.status {
                ScheduleStatus::Active => stats.active_schedules += 1,
                ScheduleStatus::Completed => stats.completed_schedules += 1,
                _ => {}
            }
            for step in &schedule.steps {
                if step.status == StepStatus::Sent {
                    stats.messages_sent += 1;
                }
                let r = &step.response;
                stats.delivered += r.delivered_at.is_some() as u64;
                stats.opened += r.opened_at.is_some() as u64;
                stats.clicked += r.clicked_at.is_some() as u64;
                stats.replied += r.replied_at.is_some() as u64;
                stats.unsubscribed += r.unsubscribed_at.is_some() as u64;
            }
        }

        if stats.messages_sent > 0 {
            stats.open_rate = stats.opened as f64 / stats.messages_sent as f64;
            stats.reply_rate = stats.replied as f64 / stats.messages_sent as f64;
        }
        stats
    }
}
