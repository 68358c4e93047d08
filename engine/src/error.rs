//! Engine-level error taxonomy.
//!
//! Nothing in this engine is process-fatal: the worst outcomes are "no hook
//! produced" or "schedule not created", both surfaced as ordinary `Err`
//! values to the caller.

use crate::schedule::compliance::ComplianceViolation;

/// Error type for engine operations
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Schedule creation refused by the compliance gate. Not retried.
    #[error(transparent)]
    Compliance(#[from] ComplianceViolation),

    /// A hook's evidence set is empty or unresolvable. Rejected before
    /// drafting begins.
    #[error("no resolvable evidence for hook {hook_id}")]
    NoEvidence { hook_id: String },

    /// Evidence store call failed outright (distinct from a single-item
    /// classification gap, which is skipped).
    #[error("evidence store error: {0}")]
    Evidence(String),

    /// No step owns the given message identifier.
    #[error("unknown message id: {0}")]
    UnknownMessage(String),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
