//! Domain cooldown tracking — global, cross-schedule shared state.
//!
//! One successful send to any prospect at a domain starts that domain's
//! cooldown clock; no schedule may send to the same domain again until the
//! configured gap has elapsed.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};

/// Shared reference to a cooldown tracker
pub type SharedDomainCooldown = Arc<DomainCooldown>;

/// Last-successful-send timestamps keyed by domain.
#[derive(Default)]
pub struct DomainCooldown {
    last_send: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl DomainCooldown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared reference.
    pub fn shared(self) -> SharedDomainCooldown {
        Arc::new(self)
    }

    /// Whether `domain` is still inside its cooldown window at `now`.
    pub fn in_cooldown(&self, domain: &str, min_gap_days: i64, now: DateTime<Utc>) -> bool {
        if min_gap_days <= 0 {
            return false;
        }
        let normalized = domain.trim().to_lowercase();
        let last_send = self.last_send.read().unwrap_or_else(|e| e.into_inner());
        match last_send.get(&normalized) {
            Some(last) => now < *last + Duration::days(min_gap_days),
            None => false,
        }
    }

    /// Refresh the cooldown clock after a successful send.
    pub fn mark_sent(&self, domain: &str, at: DateTime<Utc>) {
        let normalized = domain.trim().to_lowercase();
        let mut last_send = self.last_send.write().unwrap_or_else(|e| e.into_inner());
        last_send.insert(normalized, at);
    }

    /// Last successful send to a domain, if any.
    pub fn last_sent(&self, domain: &str) -> Option<DateTime<Utc>> {
        let normalized = domain.trim().to_lowercase();
        let last_send = self.last_send.read().unwrap_or_else(|e| e.into_inner());
        last_send.get(&normalized).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_domain_is_not_cooling() {
        let cooldown = DomainCooldown::new();
        assert!(!cooldown.in_cooldown("acme.com", 2, Utc::now()));
    }

    #[test]
    fn test_cooldown_window_elapses() {
        let cooldown = DomainCooldown::new();
        let now = Utc::now();
        cooldown.mark_sent("acme.com", now - Duration::days(1));

        assert!(cooldown.in_cooldown("acme.com", 2, now));
        assert!(!cooldown.in_cooldown("acme.com", 2, now + Duration::days(2)));
    }

    #[test]
    fn test_domains_are_case_normalized() {
        let cooldown = DomainCooldown::new();
        cooldown.mark_sent("ACME.com", Utc::now());
        assert!(cooldown.in_cooldown("acme.COM", 2, Utc::now()));
    }

    #[test]
    fn test_zero_gap_disables_cooldown() {
        let cooldown = DomainCooldown::new();
        cooldown.mark_sent("acme.com", Utc::now());
        assert!(!cooldown.in_cooldown("acme.com", 0, Utc::now()));
    }
}
