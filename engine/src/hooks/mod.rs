//! Hook mining — turning raw evidence into scored conversation openers.

pub mod ranker;
pub mod types;

pub use ranker::{HookRanker, RankerConfig, ScoreWeights};
pub use types::{Hook, HookStatus, HookType};
