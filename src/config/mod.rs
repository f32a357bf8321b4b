pub mod cli;
pub mod toml_config;

use crate::core::batch_updater::MAX_BATCH_SIZE;
use crate::core::token::{DEFAULT_ATTEMPTS, DEFAULT_RETRY_DELAY};
use crate::core::Action;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_range, validate_url, Validate,
};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Connection parameters and tuning for one import run.
#[derive(Clone)]
pub struct ImportConfig {
    pub auth_url: String,
    pub api_url: String,
    pub object: String,
    pub action: Action,
    pub client_id: String,
    pub client_secret: String,
    /// Accepted for parity with the operator form; the client-credentials
    /// grant does not use them.
    pub username: Option<String>,
    pub password: Option<String>,
    pub batch_size: usize,
    pub request_timeout_secs: u64,
    pub token_attempts: u32,
    pub token_retry_delay_ms: u64,
    pub skip_rows: usize,
}

impl ImportConfig {
    pub fn new(
        auth_url: impl Into<String>,
        api_url: impl Into<String>,
        object: impl Into<String>,
        action: Action,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            auth_url: auth_url.into(),
            api_url: api_url.into(),
            object: object.into(),
            action,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            username: None,
            password: None,
            batch_size: MAX_BATCH_SIZE,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            token_attempts: DEFAULT_ATTEMPTS,
            token_retry_delay_ms: DEFAULT_RETRY_DELAY.as_millis() as u64,
            skip_rows: 0,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn token_retry_delay(&self) -> Duration {
        Duration::from_millis(self.token_retry_delay_ms)
    }
}

impl fmt::Debug for ImportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportConfig")
            .field("auth_url", &self.auth_url)
            .field("api_url", &self.api_url)
            .field("object", &self.object)
            .field("action", &self.action)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("batch_size", &self.batch_size)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("token_attempts", &self.token_attempts)
            .field("token_retry_delay_ms", &self.token_retry_delay_ms)
            .field("skip_rows", &self.skip_rows)
            .finish()
    }
}

impl Validate for ImportConfig {
    fn validate(&self) -> Result<()> {
        validate_url("auth_url", &self.auth_url)?;
        validate_url("api_url", &self.api_url)?;
        validate_non_empty_string("object", &self.object)?;
        validate_non_empty_string("client_id", &self.client_id)?;
        validate_non_empty_string("client_secret", &self.client_secret)?;
        validate_range("batch_size", self.batch_size, 1, MAX_BATCH_SIZE)?;
        validate_positive_number("request_timeout_secs", self.request_timeout_secs as usize, 1)?;
        validate_positive_number("token_attempts", self.token_attempts as usize, 1)?;
        Ok(())
    }
}
