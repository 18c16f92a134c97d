//! Data models for the remote user directory.
//!
//! Absent, `null` and empty values are kept distinct where the policy cares:
//! the accessors below document the fallback used for each field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::policy::CreatedAtError;

/// Disable reason reported when the account carries none of its own.
pub const DEFAULT_DISABLE_REASON: &str = "Expired Account";

/// One directory entry as returned by the user search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub user_id: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    /// Raw creation timestamp, any JSON type; validated by [`UserRecord::created_at`].
    #[serde(default)]
    pub created_at: Option<Value>,

    #[serde(default)]
    pub blocked: Option<bool>,

    /// Linked identities. `null` and absent both read as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub identities: Vec<Identity>,

    #[serde(default)]
    pub app_metadata: Option<Map<String, Value>>,

    /// Set when the record did not match the expected shape.
    #[serde(skip)]
    pub decode_error: Option<String>,
}

impl UserRecord {
    /// Decode one search result. A record of the wrong shape is kept, with
    /// whatever identifiers could be read and the decode failure attached.
    pub fn from_value(value: &Value) -> Self {
        match UserRecord::deserialize(value) {
            Ok(user) => user,
            Err(e) => Self {
                user_id: value.get("user_id").and_then(Value::as_str).map(String::from),
                email: value.get("email").and_then(Value::as_str).map(String::from),
                decode_error: Some(e.to_string()),
                ..Default::default()
            },
        }
    }

    /// Email for logs and reports.
    pub fn email_or_default(&self) -> &str {
        self.email.as_deref().unwrap_or("no-email")
    }

    /// User id for logs and reports.
    pub fn user_id_or_default(&self) -> &str {
        self.user_id.as_deref().unwrap_or("unknown")
    }

    /// Blocked flag; absent or `null` means not blocked.
    pub fn is_blocked(&self) -> bool {
        self.blocked.unwrap_or(false)
    }

    /// Parsed creation instant. Missing, `null` and empty strings are all
    /// [`CreatedAtError::Missing`]; any other non-string is unparseable.
    pub fn created_at(&self) -> Result<DateTime<Utc>, CreatedAtError> {
        let raw = match &self.created_at {
            None | Some(Value::Null) => return Err(CreatedAtError::Missing),
            Some(Value::String(raw)) if raw.trim().is_empty() => {
                return Err(CreatedAtError::Missing)
            }
            Some(Value::String(raw)) => raw.trim(),
            Some(other) => {
                return Err(CreatedAtError::Unparseable {
                    value: other.to_string(),
                })
            }
        };

        DateTime::parse_from_rfc3339(raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|_| CreatedAtError::Unparseable {
                value: raw.to_string(),
            })
    }

    /// `app_metadata.disable_reason` as it should appear in the audit report.
    ///
    /// Absent falls back to [`DEFAULT_DISABLE_REASON`], an explicit `null` is
    /// reported empty and non-string values are rendered as JSON.
    pub fn existing_disable_reason(&self) -> String {
        let reason = self
            .app_metadata
            .as_ref()
            .and_then(|metadata| metadata.get("disable_reason"));

        match reason {
            None => DEFAULT_DISABLE_REASON.to_string(),
            Some(Value::Null) => String::new(),
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// Identity sub-record. More than one per user signals account linkage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Identity {
    #[serde(default)]
    pub connection: Option<String>,

    #[serde(rename = "isSocial", default)]
    pub is_social: Option<bool>,
}

impl Identity {
    pub fn is_social(&self) -> bool {
        self.is_social.unwrap_or(false)
    }
}

/// Response body of the user search endpoint with `include_totals=true`.
///
/// Users stay raw here so one malformed record cannot fail the whole page.
#[derive(Debug, Deserialize)]
pub struct UserSearchResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub users: Vec<Value>,

    #[serde(default)]
    pub total: Option<u64>,
}

/// One page of search results.
#[derive(Debug, Default)]
pub struct UserPage {
    pub users: Vec<UserRecord>,

    /// Total matches reported by the server, when it reports one.
    pub total: Option<u64>,
}

/// Partial update that blocks an account and records why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockRequest {
    pub blocked: bool,
    pub app_metadata: DisableMetadata,
}

/// Machine and human readable fields stored in the account's metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisableMetadata {
    pub disable_reason: String,
    pub disabled_date: String,
    pub disabled_by: String,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
