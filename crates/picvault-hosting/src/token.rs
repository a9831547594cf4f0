//! Bearer token acquisition.

use crate::{build_http_client, classify_send_error, HostingError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use picvault_core::models::Credential;
use picvault_core::Config;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Source of bearer credentials for the hosting provider.
#[async_trait]
pub trait TokenManager: Send + Sync {
    /// Obtain a credential valid for at least one subsequent request.
    async fn get_token(&self) -> Result<Credential, HostingError>;
}

/// Outcome of the most recent token request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchAttempt {
    pub at: DateTime<Utc>,
    pub succeeded: bool,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Refresh-token grant against an OAuth2 token endpoint.
///
/// Every call posts a fresh form request; nothing is cached between calls.
pub struct OAuthTokenManager {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    grant_type: String,
    timeout: Duration,
    last_attempt: Mutex<Option<FetchAttempt>>,
}

impl OAuthTokenManager {
    pub fn new(config: &Config) -> Result<Self, HostingError> {
        Ok(Self {
            http: build_http_client(config.hosting_timeout)?,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            refresh_token: config.refresh_token.clone(),
            grant_type: config.grant_type.clone(),
            timeout: config.hosting_timeout,
            last_attempt: Mutex::new(None),
        })
    }

    pub fn last_attempt(&self) -> Option<FetchAttempt> {
        self.last_attempt.lock().ok().and_then(|guard| guard.clone())
    }

    fn record_attempt(&self, succeeded: bool) {
        if let Ok(mut guard) = self.last_attempt.lock() {
            *guard = Some(FetchAttempt {
                at: Utc::now(),
                succeeded,
            });
        }
    }

    async fn request_token(&self) -> Result<Credential, HostingError> {
        let form = [
            ("refresh_token", self.refresh_token.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", self.grant_type.as_str()),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| classify_send_error(e, self.timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_send_error(e, self.timeout))?;

        if status.is_client_error() {
            return Err(HostingError::AuthRejected {
                status: status.as_u16(),
                body,
            });
        }
        if !status.is_success() {
            return Err(HostingError::TokenServer {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| HostingError::InvalidResponse {
                status: status.as_u16(),
                message: format!("Token response is not valid JSON: {}", e),
            })?;

        match parsed.access_token {
            Some(token) if !token.trim().is_empty() => Ok(Credential::new(token)),
            _ => Err(HostingError::InvalidResponse {
                status: status.as_u16(),
                message: "Token response is missing 'access_token'".to_string(),
            }),
        }
    }
}

#[async_trait]
impl TokenManager for OAuthTokenManager {
    #[tracing::instrument(skip(self), fields(token_url = %self.token_url))]
    async fn get_token(&self) -> Result<Credential, HostingError> {
        let start = Instant::now();
        let result = self.request_token().await;
        self.record_attempt(result.is_ok());

        match &result {
            Ok(_) => tracing::debug!(
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Obtained access token"
            ),
            Err(e) => tracing::warn!(
                error = %e,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Token request failed"
            ),
        }

        result
    }
}

/// Fixed credential, for deployments that provision a long-lived token.
pub struct StaticTokenManager {
    token: String,
}

impl StaticTokenManager {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenManager for StaticTokenManager {
    async fn get_token(&self) -> Result<Credential, HostingError> {
        Ok(Credential::new(self.token.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::path::PathBuf;

    fn manager_for(url: &str) -> OAuthTokenManager {
        let config = Config::for_endpoints(url, PathBuf::from("/tmp/unused"));
        OAuthTokenManager::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_refresh_posts_form_and_returns_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth2/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("refresh_token".into(), "test-refresh".into()),
                Matcher::UrlEncoded("client_id".into(), "test-client".into()),
                Matcher::UrlEncoded("client_secret".into(), "test-secret".into()),
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"fresh-token","expires_in":3600}"#)
            .create_async()
            .await;

        let manager = manager_for(&server.url());
        let credential = manager.get_token().await.unwrap();

        assert_eq!(credential.token, "fresh-token");
        assert_eq!(credential.bearer(), "Bearer fresh-token");
        assert!(manager.last_attempt().unwrap().succeeded);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_each_call_fetches_again() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth2/token")
            .with_status(200)
            .with_body(r#"{"access_token":"t"}"#)
            .expect(2)
            .create_async()
            .await;

        let manager = manager_for(&server.url());
        manager.get_token().await.unwrap();
        manager.get_token().await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_access_token_fails_closed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth2/token")
            .with_status(200)
            .with_body(r#"{"token_type":"bearer"}"#)
            .create_async()
            .await;

        let manager = manager_for(&server.url());
        let err = manager.get_token().await.unwrap_err();

        assert!(matches!(err, HostingError::InvalidResponse { .. }));
        assert!(!manager.last_attempt().unwrap().succeeded);
    }

    #[tokio::test]
    async fn test_client_error_is_auth_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth2/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant"}"#)
            .create_async()
            .await;

        let err = manager_for(&server.url()).get_token().await.unwrap_err();

        match err {
            HostingError::AuthRejected { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("invalid_grant"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_token_server() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth2/token")
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;

        let err = manager_for(&server.url()).get_token().await.unwrap_err();

        assert!(matches!(err, HostingError::TokenServer { status: 503, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let err = manager_for("http://127.0.0.1:1")
            .get_token()
            .await
            .unwrap_err();

        assert!(matches!(err, HostingError::Transport(_)));
    }
}
