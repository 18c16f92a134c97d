//! accountsweep - scheduled account lifecycle enforcement
//!
//! Lists directory users, disables accounts that outlived the inactivity
//! policy and writes a CSV audit report of every expired account.

#![deny(clippy::all)]

mod auth;
mod config;
mod directory;
mod error;
mod paths;
mod policy;
mod report;
mod sweep;

use anyhow::Context;
use chrono::{DateTime, Utc};
use std::fs::File;
use std::future::Future;
use std::sync::Mutex;
use tracing::{debug, error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use auth::ClientCredentialsProvider;
use config::{Config, REQUIRED_ENV};
use directory::ManagementClient;
use error::{AppError, EXIT_INTERRUPTED};
use sweep::{RunContext, RunSummary, Sweep};

fn main() {
    // Load .env file (if present) before anything else
    if let Err(e) = dotenvy::dotenv() {
        // .env file is optional - only warn if it's not a "file not found" error
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    let run_started = Utc::now();

    // Load configuration
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            let err = AppError::from(e);
            eprintln!("{}", err);
            eprintln!("\nPlease set the following environment variables:");
            for key in REQUIRED_ENV {
                eprintln!("  {}=<value>", key);
            }
            std::process::exit(err.exit_code());
        }
    };

    init_logging(&config, run_started);
    info!("Starting accountsweep v{}", env!("CARGO_PKG_VERSION"));

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create Tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    let code = runtime.block_on(run(&config, run_started, interrupted()));
    std::process::exit(code);
}

/// Run once, racing the sweep against `interrupt`. Returns the exit status.
async fn run(
    config: &Config,
    run_started: DateTime<Utc>,
    interrupt: impl Future<Output = ()>,
) -> i32 {
    tokio::select! {
        biased;

        _ = interrupt => {
            warn!("Script interrupted by user");
            EXIT_INTERRUPTED
        }
        result = sweep(config, run_started) => match result {
            Ok(summary) => {
                debug!(
                    "Scanned {} users, {} expired, report: {}",
                    summary.counters.scanned,
                    summary.counters.expired,
                    summary
                        .report_path
                        .as_deref()
                        .map_or_else(|| "none".to_string(), |path| path.display().to_string())
                );
                0
            }
            Err(e) => {
                error!("Fatal error: {}", e);
                e.exit_code()
            }
        },
    }
}

async fn sweep(config: &Config, run_started: DateTime<Utc>) -> Result<RunSummary, AppError> {
    let tokens = ClientCredentialsProvider::new(&config.auth0, &config.api)?;
    let directory = ManagementClient::new(&config.auth0, &config.api)?;

    let mut sweep = Sweep::new(RunContext::from_config(config, run_started));
    sweep.run(&directory, &tokens).await
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for interrupts: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Log to the console and to a per-run file. `RUST_LOG` overrides the configured level.
fn init_logging(config: &Config, run_started: DateTime<Utc>) {
    let log_dir = &config.output.log_dir;
    let file_layer = match paths::init_log_directory(log_dir).and_then(|()| {
        let path = paths::log_file_path(log_dir, run_started);
        File::create(&path)
            .with_context(|| format!("Could not create log file {}", path.display()))
    }) {
        Ok(file) => Some(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false),
        ),
        Err(e) => {
            eprintln!("Warning: Could not open log file, logging to console only: {:#}", e);
            None
        }
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with(fmt::layer().with_target(false).with_thread_ids(false))
        .with(file_layer)
        .init();
}
