use crate::utils::error::ImportError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Key used for batch membership and outcome reporting on updates.
pub const ID_FIELD: &str = "Id";

/// Placeholder id when a record or response carries none.
pub const UNKNOWN_ID: &str = "Unknown";

/// One CSV row, keyed by header name in column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let fields = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), Value::String(v.into())))
            .collect();
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// The record's `Id`, if present and non-empty.
    pub fn id(&self) -> Option<&str> {
        self.get(ID_FIELD).filter(|id| !id.is_empty())
    }

    pub fn id_or_unknown(&self) -> String {
        self.id().unwrap_or(UNKNOWN_ID).to_string()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// Bearer token. Replaced after a 401, never mutated.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Action {
    Create,
    Update,
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Action::Create),
            "update" => Ok(Action::Update),
            other => Err(format!(
                "invalid action '{}', expected 'create' or 'update'",
                other
            )),
        }
    }
}

impl TryFrom<String> for Action {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.to_string()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Create => f.write_str("create"),
            Action::Update => f.write_str("update"),
        }
    }
}

/// Unit of work an outcome refers to. Indices are 0-based within the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Batch { index: usize },
    Record { index: usize },
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Batch { index } => write!(f, "batch {}", index + 1),
            Unit::Record { index } => write!(f, "record {}", index + 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    Http { status: u16, body: String },
    /// HTTP 200 whose body reports `Success != true`.
    Rejected { body: String },
    MissingField { field: String },
    TokenRefresh(String),
    Transport(String),
    InvalidResponse(String),
}

impl FailureReason {
    /// Short code printed in the per-record failure line.
    pub fn code(&self) -> String {
        match self {
            FailureReason::Http { status, .. } => status.to_string(),
            FailureReason::Rejected { .. } => "200".to_string(),
            FailureReason::MissingField { .. } => "FieldError".to_string(),
            FailureReason::TokenRefresh(_) => "AuthError".to_string(),
            FailureReason::Transport(_) | FailureReason::InvalidResponse(_) => {
                "Exception".to_string()
            }
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            FailureReason::Http { body, .. } | FailureReason::Rejected { body } => body,
            FailureReason::MissingField { field } => field,
            FailureReason::TokenRefresh(message)
            | FailureReason::Transport(message)
            | FailureReason::InvalidResponse(message) => message,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Http { status, body } => {
                write!(f, "Status Code: {}, Response: {}", status, body)
            }
            FailureReason::Rejected { body } => write!(f, "rejected by Zuora: {}", body),
            FailureReason::MissingField { field } => {
                write!(f, "a record is missing required field '{}'", field)
            }
            FailureReason::TokenRefresh(message) => write!(f, "token refresh failed: {}", message),
            FailureReason::Transport(message) => write!(f, "request failed: {}", message),
            FailureReason::InvalidResponse(message) => {
                write!(f, "unreadable response: {}", message)
            }
        }
    }
}

impl From<ImportError> for FailureReason {
    fn from(error: ImportError) -> Self {
        match error {
            ImportError::HttpError { status, body } => FailureReason::Http { status, body },
            ImportError::FieldError { field } => FailureReason::MissingField { field },
            ImportError::AuthError { message } => FailureReason::TokenRefresh(message),
            other => FailureReason::Transport(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Success {
    pub unit: Unit,
    pub ids: Vec<String>,
    /// Succeeded only on the retry after a token refresh.
    pub after_refresh: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub unit: Unit,
    pub ids: Vec<String>,
    pub reason: FailureReason,
}

pub type UnitResult = std::result::Result<Success, Failure>;

/// Everything a run produced: per-unit outcomes, the watermark and the log text.
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub action: Action,
    pub object: String,
    pub results: Vec<UnitResult>,
    pub last_successful_id: Option<String>,
    /// Number of source rows (including skipped ones) covered by the watermark.
    pub resume_offset: usize,
    pub token_refreshes: usize,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub log: String,
}

impl ImportReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &Success> {
        self.results.iter().filter_map(|r| r.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &Failure> {
        self.results.iter().filter_map(|r| r.as_ref().err())
    }

    pub fn failed_record_count(&self) -> usize {
        self.failed().map(|f| f.ids.len()).sum()
    }

    pub fn succeeded_record_count(&self) -> usize {
        self.succeeded().map(|s| s.ids.len()).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.failed().next().is_none()
    }
}
