//! Error types for the accountsweep application.
//!
//! Uses `thiserror` for library-style errors with automatic `Display` and `Error` implementations.
//! Fatal errors bubble up as [`AppError`]; [`ExecutionError`] is per-account and never aborts a run.

use thiserror::Error;

/// Exit status for a run stopped by the operator (128 + SIGINT).
pub const EXIT_INTERRUPTED: i32 = 130;

/// Top-level application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("User listing error: {0}")]
    Source(#[from] SourceError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

impl AppError {
    /// Process exit status for this fatal error.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Startup configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse embedded config.toml: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{key} is not set")]
    Missing { key: &'static str },

    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Credential exchange errors. Always fatal.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token request failed: {0}")]
    RequestFailed(String),

    #[error("Token endpoint returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("No access_token in token response")]
    MissingAccessToken,
}

/// User listing errors. Always fatal: a partial population cannot be audited.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Network error fetching page {page}: {message}")]
    Network { page: u32, message: String },

    #[error("Users endpoint returned HTTP {status} for page {page}: {body}")]
    Status { page: u32, status: u16, body: String },

    #[error("Invalid users response for page {page}: {message}")]
    InvalidResponse { page: u32, message: String },

    #[error("Could not authenticate user listing: {0}")]
    Auth(#[from] AuthError),
}

/// A failed disable call for one account. Recorded in the report, never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status} - {body}")]
    Rejected { status: u16, body: String },
}

/// Report persistence errors.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write report {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode report row: {0}")]
    Csv(#[from] csv::Error),
}
