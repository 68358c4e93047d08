//! Engine configuration bundle.
//!
//! One struct carrying the tuning knobs of all three pipeline components,
//! with the production defaults. Drivers construct this once and hand the
//! pieces to the components they build.

use serde::{Deserialize, Serialize};

use crate::compose::ComposeConfig;
use crate::hooks::RankerConfig;
use crate::schedule::scheduler::SchedulerConfig;

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub ranker: RankerConfig,
    pub compose: ComposeConfig,
    pub scheduler: SchedulerConfig,
}
