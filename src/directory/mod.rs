//! Remote user directory.
//!
//! This module provides:
//! - Typed user records with explicit optional-field handling
//! - The management API client (search and block)
//! - A lazy, page-by-page user stream

pub mod client;
pub mod models;
pub mod stream;

use async_trait::async_trait;

use crate::auth::BearerToken;
use crate::error::{ExecutionError, SourceError};

pub use client::ManagementClient;
pub use models::{BlockRequest, DisableMetadata, UserPage, UserRecord};
pub use stream::UserStream;

/// Operations the sweep needs from the remote directory.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fetch one zero-based page of users matching `query`.
    async fn search_users(
        &self,
        token: &BearerToken,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> Result<UserPage, SourceError>;

    /// Block one user and attach the disable metadata. Exactly one remote mutation.
    async fn block_user(
        &self,
        token: &BearerToken,
        user_id: &str,
        request: &BlockRequest,
    ) -> Result<(), ExecutionError>;
}

/// Search expression matching any of the given email domains.
pub fn domain_query(domains: &[String]) -> String {
    let clauses: Vec<String> = domains
        .iter()
        .map(|domain| format!("email:*{}", domain))
        .collect();
    format!("({})", clauses.join(" OR "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_query() {
        assert_eq!(domain_query(&["@example.com".into()]), "(email:*@example.com)");
        assert_eq!(
            domain_query(&["@example.com".into(), "@example.org".into()]),
            "(email:*@example.com OR email:*@example.org)"
        );
    }
}
