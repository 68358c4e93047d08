//! Escalation scheduling — multi-step, multi-channel send plans under
//! compliance and rate policy.

pub mod compliance;
pub mod cooldown;
pub mod scheduler;
pub mod transport;
pub mod types;

pub use compliance::{
    ComplianceGate, ComplianceViolation, SharedSuppressionSet, SuppressionEntry,
    SuppressionReason, SuppressionSet,
};
pub use cooldown::{DomainCooldown, SharedDomainCooldown};
pub use scheduler::{EscalationScheduler, PlannedSend, SweepReport};
pub use transport::{
    ChannelTransport, SendReceipt, SendRequest, TransportError, TransportRegistry,
};
pub use types::{
    Prospect, ResponseEvent, ScheduleStatus, SendCaps, SendSchedule, SendStep, SkipReason,
    StepResponse, StepStatus, DEFAULT_CADENCE,
};
