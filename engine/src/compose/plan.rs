//! Plan stage — deterministic message scaffolding.
//!
//! Derives subject-line candidates, the fixed four-part outline, a
//! channel-appropriate call-to-action, and value propositions before any
//! drafting happens. All tables are fixed per hook type.

use serde::{Deserialize, Serialize};

use crate::compose::types::{Channel, GenerateOptions};
use crate::hooks::{Hook, HookType};

/// The fixed four-part outline every draft must follow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlineSection {
    /// Acknowledge the prospect's recent win
    Acknowledge,
    /// Tie the message to why now
    Timeliness,
    /// State the value proposition
    Value,
    /// Close with the call-to-action
    CallToAction,
}

/// Outline order is fixed: acknowledge, timeliness, value, call-to-action.
pub const OUTLINE: [OutlineSection; 4] = [
    OutlineSection::Acknowledge,
    OutlineSection::Timeliness,
    OutlineSection::Value,
    OutlineSection::CallToAction,
];

/// Deterministic scaffold for one draft
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePlan {
    /// Three subject-line candidates (first one is used for email)
    pub subjects: Vec<String>,
    /// The fixed outline
    pub outline: [OutlineSection; 4],
    /// Chosen call-to-action, channel-appropriate form
    pub call_to_action: String,
    /// Two to four value propositions for the draft to pick from
    pub value_props: Vec<String>,
}

/// Build the plan for one (hook, channel) pair.
pub fn build_plan(hook: &Hook, channel: Channel, opts: &GenerateOptions) -> MessagePlan {
    MessagePlan {
        subjects: subject_candidates(hook),
        outline: OUTLINE,
        call_to_action: call_to_action(hook.hook_type, channel).to_string(),
        value_props: value_props(hook.hook_type, opts.industry.as_deref()),
    }
}

fn subject_candidates(hook: &Hook) -> Vec<String> {
    vec![
        match hook.hook_type {
            HookType::ReviewWin => "That review deserves a wider audience".to_string(),
            HookType::Award => "Congratulations on the award".to_string(),
            HookType::ProductLaunch => "Saw the launch - quick thought".to_string(),
            HookType::PrFeature => "Saw the coverage - quick thought".to_string(),
            HookType::Milestone => "Congrats on the milestone".to_string(),
            HookType::CaseStudy => "Your case study caught my eye".to_string(),
            HookType::Funding => "Congrats on the round".to_string(),
            HookType::Partnership => "Great news on the partnership".to_string(),
            HookType::Expansion => "Congrats on the expansion".to_string(),
        },
        format!("Quick note about: {}", hook.headline),
        "An idea while the momentum is fresh".to_string(),
    ]
}

/// Fixed call-to-action table: one long form for email/linkedin, one short
/// form for sms/whatsapp, keyed by hook type.
fn call_to_action(hook_type: HookType, channel: Channel) -> &'static str {
    if channel.is_short_form() {
        match hook_type {
            HookType::ReviewWin | HookType::Award | HookType::Milestone => {
                "Worth a 10-minute call this week?"
            }
            HookType::Funding | HookType::Expansion => "Open to a quick intro call?",
            _ => "Can I send over a short example?",
        }
    } else {
        match hook_type {
            HookType::ReviewWin => {
                "Would you be open to a 15-minute call on turning reviews like this into more bookings?"
            }
            HookType::Award | HookType::Milestone => {
                "Would you be open to a short call on making the most of this moment?"
            }
            HookType::ProductLaunch | HookType::CaseStudy => {
                "Happy to share a concrete example - would a brief call next week work?"
            }
            HookType::Funding | HookType::Expansion => {
                "Would a 15-minute intro call fit your calendar in the next two weeks?"
            }
            HookType::PrFeature | HookType::Partnership => {
                "Could I show you what this has looked like for similar teams, in 15 minutes?"
            }
        }
    }
}

/// Fixed value-proposition table per hook type, optionally narrowed by the
/// prospect's industry. Always returns two to four entries.
fn value_props(hook_type: HookType, industry: Option<&str>) -> Vec<String> {
    let base: Vec<&str> = match hook_type {
        HookType::ReviewWin => vec![
            "amplify strong reviews into steady inbound demand",
            "turn one-off praise into a repeatable proof loop",
            "surface social proof where buyers actually look",
        ],
        HookType::Award | HookType::Milestone => vec![
            "convert recognition into pipeline while it is still news",
            "package the story for channels your buyers follow",
            "keep the momentum visible past the news cycle",
        ],
        HookType::ProductLaunch => vec![
            "put the launch in front of the accounts that matter",
            "shorten the path from announcement to booked demos",
            "capture launch attention before it decays",
        ],
        HookType::Funding | HookType::Expansion => vec![
            "scale outbound without scaling headcount",
            "land in new markets with locally relevant proof",
            "turn growth news into warm conversations",
        ],
        HookType::PrFeature | HookType::CaseStudy | HookType::Partnership => vec![
            "extend earned coverage into direct conversations",
            "reuse third-party proof across every channel",
            "reach lookalike accounts while the story is fresh",
        ],
    };

    let mut props: Vec<String> = base.into_iter().map(str::to_string).collect();
    if let Some(industry) = industry {
        props.insert(
            0,
            format!("proven playbook for {industry} teams in the same position"),
        );
        props.truncate(4);
    }
    props
}
