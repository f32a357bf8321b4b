use crate::config::toml_config::ImportProfile;
use crate::config::{ImportConfig, DEFAULT_TIMEOUT_SECS};
use crate::core::batch_updater::MAX_BATCH_SIZE;
use crate::core::token::{DEFAULT_ATTEMPTS, DEFAULT_RETRY_DELAY};
use crate::core::Action;
use crate::utils::error::{ImportError, Result};
use crate::utils::validation::validate_path;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Command line surface. Every connection flag also reads the environment
/// variable the operator form used to export.
#[derive(Debug, Parser)]
#[command(name = "zuora-import")]
#[command(about = "Create or update Zuora objects from a CSV file")]
pub struct CliArgs {
    /// TOML profile with connection and import settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// CSV file to import
    #[arg(long, env = "CSV_FILE_PATH")]
    pub csv: Option<PathBuf>,

    #[arg(long, env = "ZUORA_AUTH_URL")]
    pub auth_url: Option<String>,

    /// API base URL, e.g. https://rest.zuora.com
    #[arg(long, env = "API_URL")]
    pub api_url: Option<String>,

    /// Zuora object name, e.g. Account
    #[arg(long, env = "ZUORA_OBJ")]
    pub object: Option<String>,

    /// create or update (case-insensitive)
    #[arg(long, env = "ACTION")]
    pub action: Option<Action>,

    #[arg(long, env = "CLIENT_ID")]
    pub client_id: Option<String>,

    #[arg(long, env = "CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    #[arg(long, env = "ZUORA_USER_NAME")]
    pub username: Option<String>,

    #[arg(long, env = "ZUORA_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Records per bulk update call (1-50)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Per-request HTTP timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Skip this many data rows, e.g. to resume after a watermark
    #[arg(long, default_value = "0")]
    pub skip: usize,

    /// Parse and plan without authenticating or sending anything
    #[arg(long)]
    pub dry_run: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

/// A fully resolved run: configuration plus where to read the CSV from.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub config: ImportConfig,
    pub csv_path: PathBuf,
    pub dry_run: bool,
}

impl CliArgs {
    /// Merges flags (and their env vars) over the profile, then defaults.
    pub fn resolve(self) -> Result<Invocation> {
        let profile = match &self.config {
            Some(path) => {
                tracing::info!("Loading profile from: {}", path.display());
                ImportProfile::from_file(path)?
            }
            None => ImportProfile::default(),
        };
        let ImportProfile { zuora, import, http } = profile;

        let csv_path = require("csv", self.csv.or(import.csv_path))?;
        validate_path("csv", &csv_path.to_string_lossy())?;

        let mut config = ImportConfig::new(
            require("auth_url", self.auth_url.or(zuora.auth_url))?,
            require("api_url", self.api_url.or(zuora.api_url))?,
            require("object", self.object.or(import.object))?,
            require("action", self.action.or(import.action))?,
            require("client_id", self.client_id.or(zuora.client_id))?,
            require("client_secret", self.client_secret.or(zuora.client_secret))?,
        );
        config.username = self.username.or(zuora.username);
        config.password = self.password.or(zuora.password);
        config.batch_size = self
            .batch_size
            .or(import.batch_size)
            .unwrap_or(MAX_BATCH_SIZE);
        config.request_timeout_secs = self
            .timeout_secs
            .or(http.timeout_seconds)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        config.token_attempts = http.token_attempts.unwrap_or(DEFAULT_ATTEMPTS);
        config.token_retry_delay_ms = http
            .token_retry_delay_seconds
            .map(|secs| secs * 1000)
            .unwrap_or(DEFAULT_RETRY_DELAY.as_millis() as u64);
        config.skip_rows = self.skip;

        Ok(Invocation {
            config,
            csv_path,
            dry_run: self.dry_run,
        })
    }
}

fn require<T>(field: &str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| ImportError::MissingConfigError {
        field: field.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["zuora-import"];
        argv.extend_from_slice(extra);
        CliArgs::try_parse_from(argv).unwrap()
    }

    /// Built directly so exported `API_URL`, `CLIENT_ID` and friends in the
    /// test environment cannot leak in through clap's env fallbacks.
    fn blank_args() -> CliArgs {
        CliArgs {
            config: None,
            csv: None,
            auth_url: None,
            api_url: None,
            object: None,
            action: None,
            client_id: None,
            client_secret: None,
            username: None,
            password: None,
            batch_size: None,
            timeout_secs: None,
            skip: 0,
            dry_run: false,
            verbose: false,
            log_format: LogFormat::Text,
        }
    }

    #[test]
    fn test_resolve_from_flags() {
        let invocation = args(&[
            "--csv",
            "accounts.csv",
            "--auth-url",
            "https://rest.zuora.com/oauth/token",
            "--api-url",
            "https://rest.zuora.com",
            "--object",
            "Account",
            "--action",
            "Update",
            "--client-id",
            "id",
            "--client-secret",
            "secret",
            "--batch-size",
            "10",
            "--skip",
            "100",
        ])
        .resolve()
        .unwrap();

        assert_eq!(invocation.csv_path, PathBuf::from("accounts.csv"));
        assert_eq!(invocation.config.action, Action::Update);
        assert_eq!(invocation.config.batch_size, 10);
        assert_eq!(invocation.config.skip_rows, 100);
        assert_eq!(invocation.config.request_timeout_secs, 60);
        assert!(!invocation.dry_run);
    }

    #[test]
    fn test_flags_override_profile() {
        let mut profile = NamedTempFile::new().unwrap();
        profile
            .write_all(
                br#"
[zuora]
auth_url = "https://rest.apisandbox.zuora.com/oauth/token"
api_url = "https://rest.apisandbox.zuora.com"
client_id = "profile-id"
client_secret = "profile-secret"

[import]
object = "Account"
action = "create"
csv_path = "from-profile.csv"

[http]
timeout_seconds = 15
token_retry_delay_seconds = 1
"#,
            )
            .unwrap();

        let invocation = CliArgs {
            config: Some(profile.path().to_path_buf()),
            object: Some("Contact".to_string()),
            dry_run: true,
            ..blank_args()
        }
        .resolve()
        .unwrap();

        assert_eq!(invocation.config.object, "Contact");
        assert_eq!(invocation.config.action, Action::Create);
        assert_eq!(invocation.config.client_id, "profile-id");
        assert_eq!(invocation.config.request_timeout_secs, 15);
        assert_eq!(invocation.config.token_retry_delay_ms, 1000);
        assert_eq!(invocation.csv_path, PathBuf::from("from-profile.csv"));
        assert!(invocation.dry_run);
    }

    #[test]
    fn test_missing_value_is_reported_by_name() {
        let err = CliArgs {
            csv: Some(PathBuf::from("a.csv")),
            auth_url: Some("https://a.example/token".to_string()),
            ..blank_args()
        }
        .resolve()
        .unwrap_err();
        match err {
            ImportError::MissingConfigError { field } => assert_eq!(field, "api_url"),
            other => panic!("expected MissingConfigError, got {:?}", other),
        }
    }

    #[test]
    fn test_action_flag_rejects_unknown_value() {
        assert!(CliArgs::try_parse_from(["zuora-import", "--action", "delete"]).is_err());
    }
}
