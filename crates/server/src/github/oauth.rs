use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::GithubConfig;
use crate::error::RequestError;
use crate::github::{http_client, upstream_failure};
use crate::models::user::GithubIdentity;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Trades an OAuth authorization code for an access token.
    async fn exchange_code(&self, code: &str) -> Result<String, RequestError>;

    async fn lookup_user(&self, access_token: &str) -> Result<GithubIdentity, RequestError>;
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

pub struct GithubOAuth {
    client: reqwest::Client,
    config: GithubConfig,
}

impl GithubOAuth {
    pub fn new(config: &GithubConfig) -> Result<Self, RequestError> {
        Ok(Self {
            client: http_client(config)?,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl IdentityProvider for GithubOAuth {
    #[instrument(skip_all)]
    async fn exchange_code(&self, code: &str) -> Result<String, RequestError> {
        let response = self
            .client
            .post(&self.config.oauth_url)
            .query(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
            ])
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(upstream_failure(response.status(), "oauth token exchange"));
        }
        let body: AccessTokenResponse = response.json().await?;
        match body.access_token {
            Some(token) if !token.is_empty() => Ok(token),
            _ => {
                debug!(
                    "oauth code rejected: {} ({})",
                    body.error.as_deref().unwrap_or("unknown error"),
                    body.error_description.as_deref().unwrap_or("no description")
                );
                Err(RequestError::BadCredentials)
            }
        }
    }

    #[instrument(skip_all)]
    async fn lookup_user(&self, access_token: &str) -> Result<GithubIdentity, RequestError> {
        let response = self
            .client
            .get(format!("{}/user", self.config.api_url))
            .header(AUTHORIZATION, format!("token {access_token}"))
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(upstream_failure(response.status(), "user lookup"));
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::fake;

    #[tokio::test]
    async fn code_is_exchanged_and_user_resolved() {
        let config = fake::spawn().await;
        let oauth = GithubOAuth::new(&config).unwrap();

        let token = oauth.exchange_code(fake::CODE).await.unwrap();
        assert_eq!(token, fake::TOKEN);
        let identity = oauth.lookup_user(&token).await.unwrap();
        assert_eq!(
            identity,
            GithubIdentity {
                username: "octocat".to_string(),
                id: 583231
            }
        );
    }

    #[tokio::test]
    async fn rejected_code_and_token_are_bad_credentials() {
        let config = fake::spawn().await;
        let oauth = GithubOAuth::new(&config).unwrap();

        let err = oauth.exchange_code("stale-code").await.unwrap_err();
        assert!(matches!(err, RequestError::BadCredentials));
        let err = oauth.lookup_user("gho_revoked").await.unwrap_err();
        assert!(matches!(err, RequestError::BadCredentials));
    }

    #[tokio::test]
    async fn unreachable_provider_is_transient() {
        let config = GithubConfig {
            oauth_url: "http://127.0.0.1:9/login/oauth/access_token".to_string(),
            timeout_secs: 2,
            ..GithubConfig::default()
        };
        let oauth = GithubOAuth::new(&config).unwrap();
        let err = oauth.exchange_code(fake::CODE).await.unwrap_err();
        assert!(err.is_transient());
    }
}
