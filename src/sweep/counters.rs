//! Per-run tallies.

use crate::policy::Disposition;

/// Counts for one run. Every scanned user lands in exactly one disposition
/// bucket or in `invalid_created_at`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunCounters {
    pub scanned: u64,
    pub already_blocked: u64,
    pub invalid_created_at: u64,
    pub before_policy: u64,
    pub linked: u64,
    pub social: u64,
    pub within_threshold: u64,
    pub expired: u64,
    pub disabled: u64,
    pub failed: u64,
}

impl RunCounters {
    pub fn record(&mut self, disposition: &Disposition) {
        match disposition {
            Disposition::AlreadyBlocked => self.already_blocked += 1,
            Disposition::BeforePolicy => self.before_policy += 1,
            Disposition::LinkedAccount { .. } => self.linked += 1,
            Disposition::SocialConnection => self.social += 1,
            Disposition::WithinThreshold { .. } => self.within_threshold += 1,
            Disposition::Expired { .. } => self.expired += 1,
        }
    }

    /// Users that received a disposition.
    pub fn classified(&self) -> u64 {
        self.already_blocked
            + self.before_policy
            + self.linked
            + self.social
            + self.within_threshold
            + self.expired
    }
}
