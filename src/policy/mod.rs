//! Account lifecycle policy.
//!
//! Holds the immutable run policy and the classifier that maps one directory
//! user to exactly one [`Disposition`].

pub mod classifier;

use chrono::{DateTime, Utc};

pub use classifier::{classify, connection_type, CreatedAtError, Disposition};

/// Days-left window in which a still-valid account gets a near-expiry notice.
pub const NEAR_EXPIRY_DAYS: i64 = 7;

/// Policy parameters, loaded once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyConfig {
    /// Accounts older than this many whole days are expired.
    pub max_inactive_days: u32,

    /// Accounts created before this instant are out of scope.
    pub policy_start: DateTime<Utc>,

    /// Simulate only; no mutating calls are made.
    pub dry_run: bool,

    /// Email domain suffixes to scan (e.g. `@example.com`), OR-combined server-side.
    pub included_email_domains: Vec<String>,
}

impl PolicyConfig {
    /// Human-readable run mode for the start banner.
    pub fn mode_label(&self) -> &'static str {
        if self.dry_run {
            "DRY RUN (no changes)"
        } else {
            "LIVE (will disable)"
        }
    }
}
