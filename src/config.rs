//! Configuration loading and management.
//!
//! Loads configuration from embedded config.toml with environment variable overrides,
//! then validates it into typed settings. Any missing or malformed required value
//! fails the process before any remote call is made.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;
use zeroize::Zeroizing;

use crate::directory::stream::{SourceSettings, MIN_PAGE_DELAY};
use crate::error::ConfigError;
use crate::policy::PolicyConfig;

/// Embedded configuration file content.
const CONFIG_TOML: &str = include_str!("../config.toml");

/// Largest page the user search endpoint accepts.
const MAX_PAGE_SIZE: u32 = 100;

/// Environment variables an operator must provide.
pub const REQUIRED_ENV: &[&str] = &["AUTH0_DOMAIN", "CLIENT_ID", "CLIENT_SECRET", "POLICY_START"];

/// Validated application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub auth0: Auth0Config,
    pub policy: PolicyConfig,
    pub source: SourceSettings,
    pub api: ApiConfig,
    pub executor: ExecutorConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Identity provider tenant and client credentials.
#[derive(Clone)]
pub struct Auth0Config {
    pub domain: String,
    pub client_id: String,
    pub client_secret: Zeroizing<String>,
    /// Transport override for `https://{domain}`.
    pub base_url: Option<String>,
}

impl fmt::Debug for Auth0Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth0Config")
            .field("domain", &self.domain)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Auth0Config {
    /// Management API audience. Always derived from the tenant domain.
    pub fn audience(&self) -> String {
        format!("https://{}/api/v2/", self.domain)
    }

    fn api_base(&self) -> String {
        match &self.base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("https://{}", self.domain),
        }
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth/token", self.api_base())
    }

    pub fn users_url(&self) -> String {
        format!("{}/api/v2/users", self.api_base())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            connect_timeout_seconds: 10,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

/// Labels written into the metadata of disabled accounts.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorConfig {
    pub reason_source: String,
    pub disabled_by: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            reason_source: "Daily_Disable_Accounts".to_string(),
            disabled_by: "Daily_Disable_Accounts_Script".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub report_dir: PathBuf,
    pub log_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

// --- File Layout ---

#[derive(Debug, Deserialize)]
struct FileConfig {
    auth0: FileAuth0,
    policy: FilePolicy,
    source: FileSource,
    api: ApiConfig,
    executor: ExecutorConfig,
    output: OutputConfig,
    logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
struct FileAuth0 {
    #[serde(default)]
    domain: String,
    #[serde(default)]
    client_id: String,
    #[serde(default)]
    base_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FilePolicy {
    maximum_days: u32,
    #[serde(default)]
    policy_start: Option<String>,
    dry_run: bool,
    #[serde(default)]
    included_email_domains: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FileSource {
    page_size: u32,
    page_delay_ms: u64,
}

impl Config {
    /// Load configuration from embedded config.toml with environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_sources(CONFIG_TOML, |key| env::var(key).ok())
    }

    /// Build configuration from TOML text and a variable lookup.
    ///
    /// Blank variables are treated as unset.
    pub fn from_sources(
        toml_text: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(toml_text)?;
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        // Tenant and credentials
        let domain = var("AUTH0_DOMAIN").unwrap_or(file.auth0.domain);
        if domain.is_empty() {
            return Err(ConfigError::Missing { key: "AUTH0_DOMAIN" });
        }
        let client_id = var("CLIENT_ID").unwrap_or(file.auth0.client_id);
        if client_id.is_empty() {
            return Err(ConfigError::Missing { key: "CLIENT_ID" });
        }
        let client_secret = var("CLIENT_SECRET")
            .map(Zeroizing::new)
            .ok_or(ConfigError::Missing { key: "CLIENT_SECRET" })?;
        let base_url = var("AUTH0_BASE_URL").or(file.auth0.base_url);

        let auth0 = Auth0Config {
            domain,
            client_id,
            client_secret,
            base_url,
        };
        validate_base_url(&auth0)?;

        // Policy
        let max_inactive_days = match var("MAXIMUM_DAYS") {
            Some(value) => value.parse::<u32>().map_err(|_| ConfigError::Invalid {
                key: "MAXIMUM_DAYS",
                value: value.clone(),
                reason: "expected a whole number of days".to_string(),
            })?,
            None => file.policy.maximum_days,
        };

        let policy_start = var("POLICY_START")
            .or(file.policy.policy_start)
            .ok_or(ConfigError::Missing { key: "POLICY_START" })?;
        let policy_start = parse_policy_start(&policy_start)?;

        let dry_run = match var("DRY_RUN") {
            Some(value) => parse_bool("DRY_RUN", &value)?,
            None => file.policy.dry_run,
        };

        let included_email_domains = match var("INCLUDED_EMAIL_DOMAINS") {
            Some(value) => split_list(&value),
            None => file
                .policy
                .included_email_domains
                .iter()
                .map(|domain| domain.trim().to_string())
                .filter(|domain| !domain.is_empty())
                .collect(),
        };
        if included_email_domains.is_empty() {
            return Err(ConfigError::Missing {
                key: "INCLUDED_EMAIL_DOMAINS",
            });
        }

        // Pagination
        if file.source.page_size == 0 || file.source.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::Invalid {
                key: "source.page_size",
                value: file.source.page_size.to_string(),
                reason: format!("must be between 1 and {}", MAX_PAGE_SIZE),
            });
        }
        let page_delay = Duration::from_millis(file.source.page_delay_ms);
        if page_delay < MIN_PAGE_DELAY {
            return Err(ConfigError::Invalid {
                key: "source.page_delay_ms",
                value: file.source.page_delay_ms.to_string(),
                reason: format!("must be at least {} ms", MIN_PAGE_DELAY.as_millis()),
            });
        }

        let mut output = file.output;
        if let Some(dir) = var("REPORT_DIR") {
            output.report_dir = PathBuf::from(dir);
        }
        if let Some(dir) = var("LOG_DIR") {
            output.log_dir = PathBuf::from(dir);
        }

        let mut logging = file.logging;
        if let Some(level) = var("RUST_LOG") {
            logging.level = level;
        }

        Ok(Self {
            auth0,
            policy: PolicyConfig {
                max_inactive_days,
                policy_start,
                dry_run,
                included_email_domains,
            },
            source: SourceSettings {
                page_size: file.source.page_size,
                page_delay,
            },
            api: file.api,
            executor: file.executor,
            output,
            logging,
        })
    }
}

fn validate_base_url(auth0: &Auth0Config) -> Result<(), ConfigError> {
    let (key, value) = match &auth0.base_url {
        Some(base) => ("AUTH0_BASE_URL", base.clone()),
        None => ("AUTH0_DOMAIN", auth0.domain.clone()),
    };

    let url = Url::parse(&auth0.api_base()).map_err(|e| ConfigError::Invalid {
        key,
        value: value.clone(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::Invalid {
            key,
            value,
            reason: "expected an http(s) host".to_string(),
        });
    }
    Ok(())
}

/// Parse the policy start. A bare date means midnight UTC.
pub fn parse_policy_start(value: &str) -> Result<DateTime<Utc>, ConfigError> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }

    Err(ConfigError::Invalid {
        key: "POLICY_START",
        value: value.to_string(),
        reason: "expected an ISO-8601 date such as 2024-01-01".to_string(),
    })
}

/// Parse a boolean-like flag. Unrecognised values are rejected rather than read as false.
pub fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "expected true/false, 1/0, yes/no or on/off".to_string(),
        }),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
