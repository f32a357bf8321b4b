use crate::config::ImportConfig;
use crate::core::{Token, TokenProvider};
use crate::utils::error::{ImportError, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Client-credentials grant against the Zuora OAuth endpoint.
pub struct OAuthTokenProvider {
    client: Client,
    auth_url: String,
    client_id: String,
    client_secret: String,
    attempts: u32,
    retry_delay: Duration,
}

impl OAuthTokenProvider {
    pub fn new(
        client: Client,
        auth_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            auth_url: auth_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            attempts: DEFAULT_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn from_config(client: Client, config: &ImportConfig) -> Self {
        Self::new(
            client,
            &config.auth_url,
            &config.client_id,
            &config.client_secret,
        )
        .with_retry(config.token_attempts, config.token_retry_delay())
    }

    pub fn with_retry(mut self, attempts: u32, retry_delay: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    async fn request_token(&self) -> Result<Token> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        let response = self
            .client
            .post(&self.auth_url)
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ImportError::HttpError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| ImportError::AuthError {
                message: format!("token response has no usable access_token: {}", e),
            })?;
        Ok(Token::new(parsed.access_token))
    }
}

#[async_trait]
impl TokenProvider for OAuthTokenProvider {
    async fn acquire(&self) -> Result<Token> {
        tracing::info!("Requesting access token from {}", self.auth_url);
        tracing::debug!("OAuth client id: {}", self.client_id);

        let mut attempt = 1;
        loop {
            match self.request_token().await {
                Ok(token) => return Ok(token),
                // A 2xx with a malformed body won't improve on retry.
                Err(e @ ImportError::AuthError { .. }) => return Err(e),
                Err(e) if attempt < self.attempts => {
                    tracing::error!("Attempt {} failed: {}", attempt, e);
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!("Attempt {} failed: {}", attempt, e);
                    return Err(ImportError::AuthError {
                        message: format!("no token after {} attempts: {}", attempt, e),
                    });
                }
            }
        }
    }
}
