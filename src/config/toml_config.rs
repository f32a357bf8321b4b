use crate::core::Action;
use crate::utils::error::{ImportError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Saved connection profile, so operators don't retype endpoints per run.
///
/// ```toml
/// [zuora]
/// auth_url = "https://rest.apisandbox.zuora.com/oauth/token"
/// api_url = "https://rest.apisandbox.zuora.com"
/// client_id = "${CLIENT_ID}"
/// client_secret = "${CLIENT_SECRET}"
///
/// [import]
/// object = "Account"
/// action = "update"
/// csv_path = "accounts.csv"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportProfile {
    #[serde(default)]
    pub zuora: ZuoraSection,
    #[serde(default)]
    pub import: ImportSection,
    #[serde(default)]
    pub http: HttpSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZuoraSection {
    pub auth_url: Option<String>,
    pub api_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSection {
    pub object: Option<String>,
    pub action: Option<Action>,
    pub csv_path: Option<PathBuf>,
    pub batch_size: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpSection {
    pub timeout_seconds: Option<u64>,
    pub token_attempts: Option<u32>,
    pub token_retry_delay_seconds: Option<u64>,
}

impl ImportProfile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ImportError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content)?;

        toml::from_str(&processed).map_err(|e| ImportError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown names are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ImportError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}
