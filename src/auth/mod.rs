//! Management API authentication.
//!
//! Exchanges the configured client credential pair for a short-lived bearer token.

pub mod client_credentials;

use async_trait::async_trait;
use std::fmt;
use zeroize::Zeroizing;

use crate::error::AuthError;

pub use client_credentials::ClientCredentialsProvider;

/// Short-lived bearer token for the management API. Cleared from memory on drop.
#[derive(Clone)]
pub struct BearerToken(Zeroizing<String>);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Zeroizing::new(token.into()))
    }

    pub fn secret(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

/// Source of management API tokens. No retries: a failure is fatal to the run.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn acquire_token(&self) -> Result<BearerToken, AuthError>;
}
