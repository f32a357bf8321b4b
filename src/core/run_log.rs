use crate::core::{Action, Failure, ImportReport, Success, Unit, UnitResult};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => f.write_str("INFO"),
            LogLevel::Warn => f.write_str("WARNING"),
            LogLevel::Error => f.write_str("ERROR"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

/// Id of the last record confirmed processed, with the number of rows it covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Watermark {
    id: Option<String>,
    rows_done: usize,
}

impl Watermark {
    /// Moves forward to `rows_done`. Returns false (and keeps the current
    /// value) when that would not be an advance.
    pub fn advance(&mut self, rows_done: usize, id: &str) -> bool {
        if rows_done <= self.rows_done {
            return false;
        }
        self.rows_done = rows_done;
        self.id = Some(id.to_string());
        true
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn rows_done(&self) -> usize {
        self.rows_done
    }
}

/// Append-only audit trail of one run.
///
/// Every entry goes to `tracing` immediately and is also kept so the run can
/// be rendered as text at the end. Unit outcomes are collected alongside.
#[derive(Debug, Default)]
pub struct RunLog {
    entries: Vec<LogEntry>,
    results: Vec<UnitResult>,
    watermark: Watermark,
    row_offset: usize,
    first_failed_row: Option<usize>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows skipped before this run started; folded into the watermark offset.
    pub fn with_row_offset(row_offset: usize) -> Self {
        Self {
            row_offset,
            watermark: Watermark {
                id: None,
                rows_done: row_offset,
            },
            ..Self::default()
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Info, message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Warn, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Error, message.into());
    }

    fn push(&mut self, level: LogLevel, message: String) {
        match level {
            LogLevel::Info => tracing::info!("{}", message),
            LogLevel::Warn => tracing::warn!("{}", message),
            LogLevel::Error => tracing::error!("{}", message),
        }
        self.entries.push(LogEntry {
            at: Utc::now(),
            level,
            message,
        });
    }

    pub fn record_success(&mut self, success: Success) {
        let suffix = if success.after_refresh {
            " after refreshing token"
        } else {
            ""
        };
        match success.unit {
            Unit::Batch { .. } => self.info(format!(
                "Successfully updated {} with records: {:?}{}",
                success.unit, success.ids, suffix
            )),
            Unit::Record { .. } => self.info(format!(
                "Successfully created record with ID: {}{}",
                success.ids.join(", "),
                suffix
            )),
        }
        self.results.push(Ok(success));
    }

    /// `position` is the 0-based index, within this run, of the first record
    /// covered by the failed unit.
    pub fn record_failure(&mut self, failure: Failure, position: usize) {
        let row = self.row_offset + position;
        if self.first_failed_row.map_or(true, |first| row < first) {
            self.first_failed_row = Some(row);
        }
        match failure.unit {
            Unit::Batch { .. } => self.error(format!(
                "Failed to update {} with records: {:?}, {}",
                failure.unit, failure.ids, failure.reason
            )),
            Unit::Record { .. } => {
                self.error(format!("Failed to create {}: {}", failure.unit, failure.reason))
            }
        }
        for id in &failure.ids {
            self.error(format!(
                "Failed record ID: {}, Status Code: {}, Response: {}",
                id,
                failure.reason.code(),
                failure.reason.detail()
            ));
        }
        self.results.push(Err(failure));
    }

    /// `position` is the 0-based index of the record within this run.
    pub fn advance_watermark(&mut self, position: usize, id: &str) {
        let rows_done = self.row_offset + position + 1;
        if !self.watermark.advance(rows_done, id) {
            tracing::debug!(
                "Watermark stays at {} rows, ignoring {} at row {}",
                self.watermark.rows_done(),
                id,
                rows_done
            );
        }
    }

    /// Rows that can safely be skipped on the next run: everything up to the
    /// watermark, but never past a row that failed.
    pub fn resume_offset(&self) -> usize {
        match self.first_failed_row {
            Some(row) => row.min(self.watermark.rows_done()),
            None => self.watermark.rows_done(),
        }
    }

    pub fn log_watermark(&mut self) {
        let resume = self.resume_offset();
        let message = match self.watermark.id() {
            Some(id) if resume < self.watermark.rows_done() => format!(
                "Last successful record ID: {} (row {} failed earlier, resume with --skip {})",
                id,
                resume + 1,
                resume
            ),
            Some(id) => format!(
                "Last successful record ID: {} (resume with --skip {})",
                id, resume
            ),
            None => "Last successful record ID: None".to_string(),
        };
        self.info(message);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn results(&self) -> &[UnitResult] {
        &self.results
    }

    pub fn watermark(&self) -> &Watermark {
        &self.watermark
    }

    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|entry| {
                format!(
                    "{} - {} - {}",
                    entry.at.to_rfc3339_opts(SecondsFormat::Millis, true),
                    entry.level,
                    entry.message
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn finish(
        self,
        action: Action,
        object: &str,
        token_refreshes: usize,
        dry_run: bool,
        started_at: DateTime<Utc>,
    ) -> ImportReport {
        let log = self.render();
        let resume_offset = self.resume_offset();
        ImportReport {
            action,
            object: object.to_string(),
            last_successful_id: self.watermark.id().map(str::to_string),
            resume_offset,
            results: self.results,
            token_refreshes,
            dry_run,
            started_at,
            finished_at: Utc::now(),
            log,
        }
    }
}
