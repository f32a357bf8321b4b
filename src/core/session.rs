use crate::core::run_log::RunLog;
use crate::core::{Token, TokenProvider};
use crate::utils::error::Result;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::sync::Arc;

/// Classification of a single authorized call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Ok(String),
    AuthExpired(String),
    Failed { status: u16, body: String },
}

impl CallOutcome {
    fn classify(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::OK => CallOutcome::Ok(body),
            StatusCode::UNAUTHORIZED => CallOutcome::AuthExpired(body),
            other => CallOutcome::Failed {
                status: other.as_u16(),
                body,
            },
        }
    }
}

/// Final answer to an authorized call, after any refresh-and-retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub refreshed: bool,
}

impl Reply {
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK.as_u16()
    }
}

/// Authorized connection to the Zuora REST API.
///
/// Owns the current bearer token. A 401 replaces the token through the
/// provider and the call is retried exactly once; a second 401 is returned
/// to the caller as an ordinary failure.
pub struct ZuoraSession {
    client: Client,
    api_base: String,
    provider: Arc<dyn TokenProvider>,
    token: Token,
    refreshes: usize,
}

impl ZuoraSession {
    /// Acquires the initial token. Failure here is fatal to the run.
    pub async fn start(
        client: Client,
        api_base: &str,
        provider: Arc<dyn TokenProvider>,
        log: &mut RunLog,
    ) -> Result<Self> {
        let token = provider.acquire().await?;
        log.info("Obtained access token");
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            provider,
            token,
            refreshes: 0,
        })
    }

    pub fn update_url(&self) -> String {
        update_url(&self.api_base)
    }

    pub fn create_url(&self, object: &str) -> String {
        create_url(&self.api_base, object)
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes
    }

    pub async fn post_json<T>(&mut self, url: &str, body: &T, log: &mut RunLog) -> Result<Reply>
    where
        T: Serialize + ?Sized + Sync,
    {
        match self.send(url, body).await? {
            CallOutcome::Ok(body) => Ok(Reply {
                status: StatusCode::OK.as_u16(),
                body,
                refreshed: false,
            }),
            CallOutcome::Failed { status, body } => Ok(Reply {
                status,
                body,
                refreshed: false,
            }),
            CallOutcome::AuthExpired(_) => {
                log.warn("Token expired, refreshing token...");
                self.refresh().await?;
                let (status, body) = match self.send(url, body).await? {
                    CallOutcome::Ok(body) => (StatusCode::OK.as_u16(), body),
                    CallOutcome::AuthExpired(body) => (StatusCode::UNAUTHORIZED.as_u16(), body),
                    CallOutcome::Failed { status, body } => (status, body),
                };
                Ok(Reply {
                    status,
                    body,
                    refreshed: true,
                })
            }
        }
    }

    async fn refresh(&mut self) -> Result<()> {
        self.token = self.provider.acquire().await?;
        self.refreshes += 1;
        tracing::debug!("Token refreshed ({} so far)", self.refreshes);
        Ok(())
    }

    async fn send<T>(&self, url: &str, body: &T) -> Result<CallOutcome>
    where
        T: Serialize + ?Sized + Sync,
    {
        tracing::debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, self.token.bearer())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        tracing::debug!("API response status: {}", status);
        Ok(CallOutcome::classify(status, text))
    }
}

pub fn update_url(api_base: &str) -> String {
    format!("{}/v1/action/update", api_base.trim_end_matches('/'))
}

pub fn create_url(api_base: &str, object: &str) -> String {
    format!("{}/v1/object/{}", api_base.trim_end_matches('/'), object)
}
