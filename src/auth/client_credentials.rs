//! OAuth2 client credentials grant against the identity provider's token endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::{BearerToken, TokenProvider};
use crate::config::{ApiConfig, Auth0Config};
use crate::error::AuthError;

/// Client credentials token provider.
pub struct ClientCredentialsProvider {
    token_url: String,
    client_id: String,
    client_secret: zeroize::Zeroizing<String>,
    audience: String,
    http_client: reqwest::Client,
}

impl ClientCredentialsProvider {
    /// Create a new provider from configuration.
    pub fn new(auth0: &Auth0Config, api: &ApiConfig) -> Result<Self, AuthError> {
        let http_client = reqwest::Client::builder()
            .timeout(api.timeout())
            .connect_timeout(api.connect_timeout())
            .build()
            .map_err(|e| AuthError::RequestFailed(e.to_string()))?;

        Ok(Self {
            token_url: auth0.token_url(),
            client_id: auth0.client_id.clone(),
            client_secret: auth0.client_secret.clone(),
            audience: auth0.audience(),
            http_client,
        })
    }
}

#[async_trait]
impl TokenProvider for ClientCredentialsProvider {
    async fn acquire_token(&self) -> Result<BearerToken, AuthError> {
        info!("Authenticating with the identity provider...");

        let body = TokenRequest {
            client_id: &self.client_id,
            client_secret: self.client_secret.as_str(),
            audience: &self.audience,
            grant_type: "client_credentials",
        };

        let response = self
            .http_client
            .post(&self.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Token request failed: HTTP {} - {}", status, body);
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::RequestFailed(e.to_string()))?;

        match token_response.access_token {
            Some(token) if !token.is_empty() => {
                info!("Obtained management API token");
                Ok(BearerToken::new(token))
            }
            _ => {
                error!("No access_token in token response");
                Err(AuthError::MissingAccessToken)
            }
        }
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    audience: &'a str,
    grant_type: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> ClientCredentialsProvider {
        let auth0 = Auth0Config {
            domain: "tenant.eu.auth0.com".into(),
            client_id: "client-123".into(),
            client_secret: zeroize::Zeroizing::new("s3cret".into()),
            base_url: Some(server.uri()),
        };
        ClientCredentialsProvider::new(&auth0, &ApiConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_acquire_token_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_partial_json(json!({
                "client_id": "client-123",
                "client_secret": "s3cret",
                "audience": "https://tenant.eu.auth0.com/api/v2/",
                "grant_type": "client_credentials"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok-abc",
                "token_type": "Bearer",
                "expires_in": 86400
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = provider(&server).acquire_token().await.unwrap();
        assert_eq!(token.secret(), "tok-abc");
    }

    #[tokio::test]
    async fn test_acquire_token_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(401).set_body_string("access_denied"))
            .mount(&server)
            .await;

        let err = provider(&server).acquire_token().await.unwrap_err();
        match err {
            AuthError::Rejected { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "access_denied");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_acquire_token_missing_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token_type": "Bearer"})))
            .mount(&server)
            .await;

        let err = provider(&server).acquire_token().await.unwrap_err();
        assert!(matches!(err, AuthError::MissingAccessToken));
    }
}
