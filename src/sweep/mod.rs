//! Run orchestration.
//!
//! Drives one evaluation pass: authenticate (live runs only), stream users,
//! classify each one, disable or simulate disabling expired accounts, then
//! summarise and write the report.

pub mod counters;
pub mod executor;

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::auth::TokenProvider;
use crate::config::{Config, ExecutorConfig};
use crate::directory::stream::SourceSettings;
use crate::directory::{domain_query, UserDirectory, UserRecord, UserStream};
use crate::error::AppError;
use crate::policy::{classify, connection_type, Disposition, PolicyConfig};
use crate::report::{AccountReportRow, Reporter};

pub use counters::RunCounters;
pub use executor::Executor;

const RULE: &str = "======================================================================";

/// Completion marker. Absent from the log of any aborted run.
pub const COMPLETION_MARKER: &str = "=== Script completed successfully ===";

/// Everything a run needs, built once at startup.
#[derive(Debug, Clone)]
pub struct RunContext<'a> {
    pub policy: &'a PolicyConfig,
    pub source: &'a SourceSettings,
    pub executor: &'a ExecutorConfig,
    pub report_dir: &'a Path,
    /// Run start. Used as "now" for classification and to stamp the report.
    pub started: DateTime<Utc>,
}

impl<'a> RunContext<'a> {
    pub fn from_config(config: &'a Config, started: DateTime<Utc>) -> Self {
        Self {
            policy: &config.policy,
            source: &config.source,
            executor: &config.executor,
            report_dir: &config.output.report_dir,
            started,
        }
    }
}

/// Run lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Init,
    Authenticating,
    Streaming,
    Finalizing,
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "initialising",
            Self::Authenticating => "authenticating",
            Self::Streaming => "streaming users",
            Self::Finalizing => "finalizing",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Outcome of a completed run.
#[derive(Debug)]
pub struct RunSummary {
    pub counters: RunCounters,
    pub report_path: Option<PathBuf>,
}

/// One evaluation pass over the directory.
pub struct Sweep<'a> {
    ctx: RunContext<'a>,
    phase: RunPhase,
    counters: RunCounters,
    reporter: Reporter,
}

impl<'a> Sweep<'a> {
    pub fn new(ctx: RunContext<'a>) -> Self {
        let reporter = Reporter::new(ctx.report_dir, ctx.policy.dry_run, ctx.started);
        Self {
            ctx,
            phase: RunPhase::Init,
            counters: RunCounters::default(),
            reporter,
        }
    }

    /// Run to completion. A fatal error is logged with the phase it interrupted.
    pub async fn run<D, T>(&mut self, directory: &D, tokens: &T) -> Result<RunSummary, AppError>
    where
        D: UserDirectory + ?Sized,
        T: TokenProvider + ?Sized,
    {
        match self.execute(directory, tokens).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                error!("Run aborted while {}", self.phase);
                Err(e)
            }
        }
    }

    async fn execute<D, T>(&mut self, directory: &D, tokens: &T) -> Result<RunSummary, AppError>
    where
        D: UserDirectory + ?Sized,
        T: TokenProvider + ?Sized,
    {
        self.log_banner();

        let live_token = if self.ctx.policy.dry_run {
            None
        } else {
            self.enter(RunPhase::Authenticating);
            Some(tokens.acquire_token().await?)
        };
        let policy = self.ctx.policy;
        let labels = self.ctx.executor;
        let executor = live_token
            .as_ref()
            .map(|token| Executor::new(directory, token, policy.max_inactive_days, labels));

        self.enter(RunPhase::Streaming);
        info!(
            "Fetching users (included domains: {})",
            policy.included_email_domains.join(", ")
        );
        let mut stream = UserStream::new(
            directory,
            tokens,
            live_token.clone(),
            domain_query(&policy.included_email_domains),
            self.ctx.source.clone(),
        );

        info!("Processing users...");
        while let Some(user) = stream.next_user().await? {
            self.process(&user, executor.as_ref()).await;
        }
        debug!("User stream exhausted after {} users", stream.total_fetched());
        debug_assert_eq!(
            self.counters.classified() + self.counters.invalid_created_at,
            self.counters.scanned
        );

        self.enter(RunPhase::Finalizing);
        self.log_summary();
        let report_path = self.reporter.finish()?;

        self.enter(RunPhase::Done);
        info!("{}", COMPLETION_MARKER);
        info!("{}", RULE);

        Ok(RunSummary {
            counters: self.counters.clone(),
            report_path,
        })
    }

    fn enter(&mut self, phase: RunPhase) {
        debug!("Run phase: {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    /// Classify one user and act on the result.
    async fn process<D>(&mut self, user: &UserRecord, executor: Option<&Executor<'_, D>>)
    where
        D: UserDirectory + ?Sized,
    {
        self.counters.scanned += 1;
        let email = user.email_or_default();

        let disposition = match classify(user, self.ctx.policy, self.ctx.started) {
            Ok(disposition) => disposition,
            Err(e) => {
                self.counters.invalid_created_at += 1;
                warn!(
                    "ANOMALY: {} ({}) skipped, {}",
                    email,
                    user.user_id_or_default(),
                    e
                );
                return;
            }
        };
        self.counters.record(&disposition);

        match disposition {
            Disposition::AlreadyBlocked => debug!("Skipped (already blocked): {}", email),
            Disposition::BeforePolicy => debug!("Skipped (before policy): {}", email),
            Disposition::LinkedAccount { identities } => {
                info!(" SKIPPED (Linked Account): {} - {} identities", email, identities)
            }
            Disposition::SocialConnection => debug!(
                "Skipped (social connection): {} - Connection: {}",
                email,
                connection_type(&user.identities)
            ),
            Disposition::WithinThreshold { days_left, .. } => {
                if disposition.is_near_expiry() {
                    info!("NOTICE: {} will be disabled in {} days", email, days_left);
                }
            }
            Disposition::Expired {
                created_at,
                age_days,
                days_over_threshold,
            } => {
                self.handle_expired(user, created_at, age_days, days_over_threshold, executor)
                    .await
            }
        }
    }

    async fn handle_expired<D>(
        &mut self,
        user: &UserRecord,
        created_at: DateTime<Utc>,
        age_days: i64,
        days_over_threshold: i64,
        executor: Option<&Executor<'_, D>>,
    ) where
        D: UserDirectory + ?Sized,
    {
        let connection = connection_type(&user.identities);
        let existing_reason = user.existing_disable_reason();

        info!(
            " EXPIRED: {} - {} days old (exceeds by {} days)",
            user.email_or_default(),
            age_days,
            days_over_threshold
        );
        info!("  Connection: {}", connection);
        info!("  Existing disable_reason: {}", existing_reason);

        let row = AccountReportRow::new(
            user.email_or_default(),
            user.user_id_or_default(),
            created_at,
            age_days,
            days_over_threshold,
            connection,
            existing_reason,
        );

        match executor {
            None => {
                info!("  [DRY RUN] Would disable this account");
                self.reporter.record(row);
            }
            Some(executor) => {
                let outcome = executor.disable(row, Utc::now()).await;
                if outcome.succeeded {
                    self.counters.disabled += 1;
                } else {
                    self.counters.failed += 1;
                    error!(
                        "✗ Failed to disable {}: {}",
                        outcome.account.email,
                        outcome.error_detail.as_deref().unwrap_or("unknown error")
                    );
                }
                self.reporter.record(outcome.account);
            }
        }
    }

    fn log_banner(&self) {
        let policy = self.ctx.policy;
        info!("{}", RULE);
        info!("=== Starting Daily_Disable_Accounts run ===");
        info!(
            "=== Execution Date: {} ===",
            self.ctx.started.format("%Y-%m-%d %H:%M:%S UTC")
        );
        info!("=== Mode: {} ===", policy.mode_label());
        info!(
            "=== Policy: Disable accounts created after {} that are older than {} days ===",
            policy.policy_start.format("%Y-%m-%d"),
            policy.max_inactive_days
        );
        info!("{}", RULE);
    }

    fn log_summary(&self) {
        let c = &self.counters;
        info!("{}", RULE);
        info!("___ EXECUTION SUMMARY ___");
        info!("{}", RULE);
        info!("Total users scanned: {}", c.scanned);
        info!("   ─ Already blocked: {}", c.already_blocked);
        info!("   ─ Missing/invalid created_at or malformed record: {}", c.invalid_created_at);
        info!("   ─ Created before policy start: {}", c.before_policy);
        info!("   ─ Linked accounts (protected): {}", c.linked);
        info!("   ─ Social connections (skipped): {}", c.social);
        info!(
            "   ─ Within threshold ({} days): {}",
            self.ctx.policy.max_inactive_days, c.within_threshold
        );
        info!("   ─ Expired accounts: {}", c.expired);

        if self.ctx.policy.dry_run {
            info!("[DRY RUN] Would have disabled: {} accounts", self.reporter.len());
        } else {
            info!("Successfully disabled: {}", c.disabled);
            if c.failed > 0 {
                info!("✗ Failed to disable: {}", c.failed);
            }
        }
        info!("{}", RULE);
    }
}
