//! Call lifecycle logging
//!
//! Every call that reaches the wire-format stage is recorded in three steps:
//! a start entry written before the first network attempt, then exactly one
//! outcome update (success or error) against the same [`RecordId`].
//!
//! The pipeline always talks to a [`CallLogger`]; when logging is disabled it
//! is handed a [`NoopCallLogger`], which issues no record ids and therefore
//! receives no outcome updates.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::http::transport::Headers;

pub mod redaction;
pub mod schema;
pub mod sql;

pub use sql::{CallRecord, SqlCallLogger};

/// Identifier of a persisted call record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status stored in the `status` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Started,
    Completed,
    Error,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Started => "started",
            RecordStatus::Completed => "completed",
            RecordStatus::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "started" => Some(RecordStatus::Started),
            "completed" => Some(RecordStatus::Completed),
            "error" => Some(RecordStatus::Error),
            _ => None,
        }
    }
}

/// Failure of the call log itself, reported separately from the call outcome
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Call log database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Call log record {record_id} was not updated (missing or already finalized)")]
    RecordNotUpdated { record_id: RecordId },

    #[error("Call log insert did not return a record id")]
    MissingRecordId,

    #[error("Failed to serialize {field} for the call log: {source}")]
    Serialization {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Details captured before the first network attempt
#[derive(Debug, Clone, Copy)]
pub struct RequestEntry<'a> {
    pub endpoint: &'a str,
    pub method: &'a str,
    pub headers: &'a Headers,
    /// Body as logged, credentials masked when redaction is on
    pub body: &'a str,
    /// Bytes actually sent on the wire
    pub size: usize,
    /// Account username the call was made with
    pub client_identity: &'a str,
}

/// Details of a received, decodable response
#[derive(Debug, Clone, Copy)]
pub struct SuccessEntry<'a> {
    pub status_code: u16,
    pub headers: &'a Headers,
    pub body: &'a str,
    pub execution_time: Duration,
}

/// Details of a failed call
#[derive(Debug, Clone, Copy)]
pub struct ErrorEntry<'a> {
    /// Provider status, or 0 when no response was received
    pub status_code: u16,
    pub execution_time: Duration,
    pub message: &'a str,
    pub code: &'a str,
    /// Raw body, when response bytes were received
    pub response_body: Option<&'a str>,
}

/// Persists the lifecycle of each call
///
/// Implementations must be safe to share between concurrent calls.
#[async_trait]
pub trait CallLogger: Send + Sync {
    /// Record the start of a call; `None` means the call is not being logged
    async fn log_request_start(&self, entry: RequestEntry<'_>) -> Result<Option<RecordId>, LoggingError>;

    async fn log_outcome_success(&self, record_id: RecordId, entry: SuccessEntry<'_>) -> Result<(), LoggingError>;

    async fn log_outcome_error(&self, record_id: RecordId, entry: ErrorEntry<'_>) -> Result<(), LoggingError>;
}

/// Logger used when no call log store is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCallLogger;

#[async_trait]
impl CallLogger for NoopCallLogger {
    async fn log_request_start(&self, _entry: RequestEntry<'_>) -> Result<Option<RecordId>, LoggingError> {
        Ok(None)
    }

    async fn log_outcome_success(&self, _record_id: RecordId, _entry: SuccessEntry<'_>) -> Result<(), LoggingError> {
        Ok(())
    }

    async fn log_outcome_error(&self, _record_id: RecordId, _entry: ErrorEntry<'_>) -> Result<(), LoggingError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_logger_issues_no_record() {
        let headers = Headers::new();
        let entry = RequestEntry {
            endpoint: "/applicants/checkStatus",
            method: "POST",
            headers: &headers,
            body: "<Request/>",
            size: 10,
            client_identity: "UDSM",
        };
        assert_eq!(NoopCallLogger.log_request_start(entry).await.unwrap(), None);
    }

    #[test]
    fn test_record_status_names() {
        for status in [RecordStatus::Started, RecordStatus::Completed, RecordStatus::Error] {
            assert_eq!(RecordStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RecordStatus::parse("pending"), None);
    }

    #[test]
    fn test_record_id_display() {
        assert_eq!(RecordId(42).to_string(), "42");
        assert_eq!(serde_json::to_string(&RecordId(42)).unwrap(), "42");
    }
}
