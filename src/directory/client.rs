//! Management API client for user search and account updates.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, warn};

use super::models::{BlockRequest, UserPage, UserRecord, UserSearchResponse};
use super::UserDirectory;
use crate::auth::BearerToken;
use crate::config::{ApiConfig, Auth0Config};
use crate::error::{ExecutionError, SourceError};

/// Fields requested from the search endpoint.
const USER_FIELDS: &str = "email,created_at,identities,user_id,last_login,blocked,app_metadata";

/// Search engine version for the `q` syntax used here.
const SEARCH_ENGINE: &str = "v3";

/// Management API client.
pub struct ManagementClient {
    users_url: String,
    http_client: Client,
}

impl ManagementClient {
    /// Create a new client from configuration.
    pub fn new(auth0: &Auth0Config, api: &ApiConfig) -> Result<Self, SourceError> {
        let http_client = Client::builder()
            .timeout(api.timeout())
            .connect_timeout(api.connect_timeout())
            .build()
            .map_err(|e| SourceError::Network {
                page: 0,
                message: e.to_string(),
            })?;

        Ok(Self {
            users_url: auth0.users_url(),
            http_client,
        })
    }

    /// URL of a single user, with the id encoded as one path segment.
    fn user_url(&self, user_id: &str) -> String {
        format!("{}/{}", self.users_url, urlencoding::encode(user_id))
    }
}

#[async_trait]
impl UserDirectory for ManagementClient {
    async fn search_users(
        &self,
        token: &BearerToken,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> Result<UserPage, SourceError> {
        debug!("Fetching users page {} ({} per page)", page, per_page);

        let page_param = page.to_string();
        let per_page_param = per_page.to_string();
        let params = [
            ("q", query),
            ("fields", USER_FIELDS),
            ("include_fields", "true"),
            ("search_engine", SEARCH_ENGINE),
            ("per_page", per_page_param.as_str()),
            ("page", page_param.as_str()),
            ("include_totals", "true"),
        ];

        let response = self
            .http_client
            .get(&self.users_url)
            .bearer_auth(token.secret())
            .query(&params)
            .send()
            .await
            .map_err(|e| SourceError::Network {
                page,
                message: e.to_string(),
            })?;

        let status = response.status();
        match status.as_u16() {
            200 => {
                let body: UserSearchResponse =
                    response
                        .json()
                        .await
                        .map_err(|e| SourceError::InvalidResponse {
                            page,
                            message: e.to_string(),
                        })?;

                let users: Vec<UserRecord> = body.users.iter().map(UserRecord::from_value).collect();
                for user in users.iter().filter(|user| user.decode_error.is_some()) {
                    warn!(
                        "Page {}: malformed user record {}",
                        page,
                        user.user_id_or_default()
                    );
                }

                Ok(UserPage {
                    users,
                    total: body.total,
                })
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                error!("Users endpoint returned HTTP {} - {}", status, body);
                Err(SourceError::Status {
                    page,
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    async fn block_user(
        &self,
        token: &BearerToken,
        user_id: &str,
        request: &BlockRequest,
    ) -> Result<(), ExecutionError> {
        let response = self
            .http_client
            .patch(self.user_url(user_id))
            .bearer_auth(token.secret())
            .json(request)
            .send()
            .await
            .map_err(|e| ExecutionError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ExecutionError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}
