//! Disables expired accounts against the remote directory.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::auth::BearerToken;
use crate::config::ExecutorConfig;
use crate::directory::{BlockRequest, DisableMetadata, UserDirectory};
use crate::report::AccountReportRow;

/// Result of one disable attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisableOutcome {
    /// The report row, marked disabled or failed.
    pub account: AccountReportRow,
    pub succeeded: bool,
    /// `HTTP {status} - {body}` or the network error, when the call failed.
    pub error_detail: Option<String>,
}

/// Issues disable calls. Only constructed for live runs.
pub struct Executor<'a, D: ?Sized> {
    directory: &'a D,
    token: &'a BearerToken,
    max_inactive_days: u32,
    labels: &'a ExecutorConfig,
}

impl<'a, D> Executor<'a, D>
where
    D: UserDirectory + ?Sized,
{
    pub fn new(
        directory: &'a D,
        token: &'a BearerToken,
        max_inactive_days: u32,
        labels: &'a ExecutorConfig,
    ) -> Self {
        Self {
            directory,
            token,
            max_inactive_days,
            labels,
        }
    }

    /// Block one account. Failures are returned in the outcome, never retried or raised.
    pub async fn disable(&self, mut account: AccountReportRow, now: DateTime<Utc>) -> DisableOutcome {
        let reason = disable_reason(
            &self.labels.reason_source,
            now,
            account.days_old,
            self.max_inactive_days,
        );

        let request = BlockRequest {
            blocked: true,
            app_metadata: DisableMetadata {
                disable_reason: reason.clone(),
                disabled_date: now.to_rfc3339(),
                disabled_by: self.labels.disabled_by.clone(),
            },
        };

        match self
            .directory
            .block_user(self.token, &account.user_id, &request)
            .await
        {
            Ok(()) => {
                info!("✓ Successfully disabled: {}", account.email);
                account.mark_disabled(reason);
                DisableOutcome {
                    account,
                    succeeded: true,
                    error_detail: None,
                }
            }
            Err(e) => {
                let detail = e.to_string();
                account.mark_failed(detail.clone());
                DisableOutcome {
                    account,
                    succeeded: false,
                    error_detail: Some(detail),
                }
            }
        }
    }
}

/// Human-readable reason stored on the disabled account.
pub fn disable_reason(source: &str, now: DateTime<Utc>, age_days: i64, max_days: u32) -> String {
    format!(
        "Disabled by {} on {}: Account inactive for {} days (threshold: {} days)",
        source,
        now.format("%Y-%m-%d"),
        age_days,
        max_days
    )
}
