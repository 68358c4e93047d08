//! Compliance gate and the process-wide suppression set.
//!
//! The suppression set is shared, lock-guarded state injected into every
//! scheduler instance so compliance decisions stay consistent across
//! concurrent sweeps. An external key-value store can replace the in-process
//! map behind the same type.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::compose::Channel;
use crate::schedule::types::Prospect;

/// Why schedule creation was refused. Surfaced synchronously, never retried.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ComplianceViolation {
    #[error("prospect contact or domain is suppressed: {value}")]
    Suppressed { value: String },

    #[error("prospect {prospect_id} has no usable contact channel")]
    NoContactChannel { prospect_id: String },

    #[error("prospect language {language} is not supported")]
    UnsupportedLanguage { language: String },

    #[error("channel {channel} requires opt-in consent")]
    ConsentMissing { channel: Channel },
}

/// Why a contact was suppressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionReason {
    /// The prospect unsubscribed from a message
    Unsubscribed,
    /// A spam or abuse complaint came in
    Complaint,
    /// Manually added by an operator
    Manual,
}

impl std::fmt::Display for SuppressionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsubscribed => write!(f, "unsubscribed"),
            Self::Complaint => write!(f, "complaint"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// One suppressed domain or address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressionEntry {
    /// Suppressed value: a domain or a contact address
    pub value: String,
    pub reason: SuppressionReason,
    pub added_at: DateTime<Utc>,
}

/// Shared reference to a suppression set
pub type SharedSuppressionSet = Arc<SuppressionSet>;

/// Process-wide set of domains and addresses excluded from outreach.
#[derive(Default)]
pub struct SuppressionSet {
    entries: RwLock<HashMap<String, SuppressionEntry>>,
}

impl SuppressionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared reference.
    pub fn shared(self) -> SharedSuppressionSet {
        Arc::new(self)
    }

    /// Add a domain or address. Idempotent; the first reason wins.
    pub fn add(&self, value: &str, reason: SuppressionReason) {
        let normalized = value.trim().to_lowercase();
        if normalized.is_empty() {
            return;
        }
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.entry(normalized.clone()).or_insert_with(|| {
            info!(value = %normalized, %reason, "Suppressing contact");
            SuppressionEntry {
                value: normalized,
                reason,
                added_at: Utc::now(),
            }
        });
    }

    /// Whether a domain or address is suppressed.
    pub fn contains(&self, value: &str) -> bool {
        let normalized = value.trim().to_lowercase();
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.contains_key(&normalized)
    }

    /// Remove an entry, returning whether one existed.
    pub fn remove(&self, value: &str) -> bool {
        let normalized = value.trim().to_lowercase();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(&normalized).is_some()
    }

    /// Snapshot of all entries, newest first.
    pub fn list(&self) -> Vec<SuppressionEntry> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut all: Vec<SuppressionEntry> = entries.values().cloned().collect();
        all.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        all
    }
}

/// The compliance gate consulted at schedule creation and again at each
/// due-step evaluation.
#[derive(Clone)]
pub struct ComplianceGate {
    suppression: SharedSuppressionSet,
    supported_languages: Vec<String>,
}

impl ComplianceGate {
    pub fn new(suppression: SharedSuppressionSet, supported_languages: Vec<String>) -> Self {
        Self {
            suppression,
            supported_languages,
        }
    }

    /// Reject suppressed, uncontactable, or unsupported-language prospects.
    pub fn check_compliance(&self, prospect: &Prospect) -> Result<(), ComplianceViolation> {
        if self.suppression.contains(&prospect.domain) {
            return Err(ComplianceViolation::Suppressed {
                value: prospect.domain.clone(),
            });
        }
        if let Some(email) = &prospect.email {
            if self.suppression.contains(email) {
                return Err(ComplianceViolation::Suppressed {
                    value: email.clone(),
                });
            }
        }
        if !prospect.has_contact_channel() {
            return Err(ComplianceViolation::NoContactChannel {
                prospect_id: prospect.id.clone(),
            });
        }
        if !self
            .supported_languages
            .iter()
            .any(|l| l.eq_ignore_ascii_case(&prospect.language))
        {
            return Err(ComplianceViolation::UnsupportedLanguage {
                language: prospect.language.clone(),
            });
        }
        Ok(())
    }

    /// Channel-sensitive consent check.
    ///
    /// Outbound professional email and LinkedIn rely on legitimate-interest
    /// grounds and pass by default. Opt-in channels must consult a consent
    /// record.
    pub fn check_consent(&self, _prospect: &Prospect, channel: Channel) -> bool {
        if !channel.requires_opt_in() {
            return true;
        }
        // TODO: wire the consent ledger lookup for SMS/WhatsApp before
        // production use; passing unconditionally is a compliance gap.
        true
    }
}
