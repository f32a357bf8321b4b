use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Authentication failed: {message}")]
    AuthError { message: String },

    #[error("CSV format error: {message}")]
    FormatError { message: String },

    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    #[error("Record is missing required field '{field}'")]
    FieldError { field: String },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration value: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Authentication,
    Input,
    Network,
    Record,
}

impl ImportError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ImportError::ConfigError { .. }
            | ImportError::MissingConfigError { .. }
            | ImportError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            ImportError::AuthError { .. } => ErrorCategory::Authentication,
            ImportError::FormatError { .. } | ImportError::IoError(_) => ErrorCategory::Input,
            ImportError::HttpError { .. } | ImportError::ApiError(_) => ErrorCategory::Network,
            ImportError::FieldError { .. } => ErrorCategory::Record,
        }
    }

    /// Whether the error stops the whole run. Everything else is scoped to a
    /// single batch or record and ends up in the report instead.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Configuration | ErrorCategory::Authentication | ErrorCategory::Input
        )
    }

    /// Process exit code: 1-3 by fatal category, 4 for anything else that
    /// escaped the run.
    pub fn exit_code(&self) -> i32 {
        if !self.is_fatal() {
            return 4;
        }
        match self.category() {
            ErrorCategory::Configuration => 1,
            ErrorCategory::Authentication => 2,
            _ => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the command line flags, environment variables and profile file"
            }
            ErrorCategory::Authentication => {
                "Verify the auth URL, client id and client secret, then re-run"
            }
            ErrorCategory::Input => {
                "Make sure the file is a UTF-8 CSV with a header row and consistent columns"
            }
            ErrorCategory::Network => "Check connectivity to the Zuora API and retry",
            ErrorCategory::Record => "Fix the offending rows and re-run them with --skip",
        }
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;
