//! Error types for the TCU client
//!
//! This module defines the error kinds raised by the request pipeline and the
//! resource layer, using thiserror for the definitions. A pipeline call that
//! fails returns a [`CallError`], which pairs the primary [`Error`] with any
//! call-log failures that happened along the way.

use std::fmt;
use thiserror::Error;

use crate::call_log::{LoggingError, RecordId};
use crate::resources::validation::ValidationErrors;
use crate::xml::NodeError;

/// Main error type for TCU client operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid settings detected while building the configuration
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The parameter structure could not be serialized to XML
    #[error("Encoding error: {message}")]
    Encoding { message: String },

    /// Connection-level failure that persisted across every attempt
    #[error("Network error after {attempts} attempt(s): {message}")]
    Network {
        attempts: u32,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The provider rejected the credentials (HTTP 401)
    #[error("Authentication failed (HTTP {status_code}): {message}")]
    Authentication { status_code: u16, message: String },

    /// The provider answered with any other error status
    #[error("Provider error (HTTP {status_code}): {message}")]
    Provider {
        status_code: u16,
        message: String,
        body: String,
    },

    /// Response bytes were received but are not well-formed XML
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String, body: String },

    /// The caller cancelled the call before it reached a terminal state
    #[error("Request cancelled")]
    Cancelled,

    /// Resource-level input validation failed before any network activity
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// A typed accessor could not find or interpret a response field
    #[error("Response field error: {0}")]
    Field(#[from] NodeError),
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Result of a pipeline call or a resource operation
pub type CallResult<T> = std::result::Result<T, CallError>;

impl Error {
    /// Create a configuration error without an underlying cause
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Create an encoding error
    pub fn encoding(message: impl Into<String>) -> Self {
        Error::Encoding {
            message: message.into(),
        }
    }

    /// Stable snake_case code, stored in the call log's `error_code` column
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Configuration { .. } => "configuration_error",
            Error::Encoding { .. } => "encoding_error",
            Error::Network { .. } => "network_error",
            Error::Authentication { .. } => "authentication_error",
            Error::Provider { .. } => "provider_error",
            Error::MalformedResponse { .. } => "malformed_response",
            Error::Cancelled => "cancelled",
            Error::Validation(_) => "validation_error",
            Error::Field(_) => "field_error",
        }
    }

    /// HTTP status reported by the provider, when a response was received
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Authentication { status_code, .. } | Error::Provider { status_code, .. } => {
                Some(*status_code)
            }
            _ => None,
        }
    }

    /// Whether this error was produced before anything was sent
    pub fn is_client_side(&self) -> bool {
        matches!(
            self,
            Error::Configuration { .. } | Error::Encoding { .. } | Error::Validation(_)
        )
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Error::Validation(errors)
    }
}

/// A failed call: the primary error plus everything the call logger could not record
///
/// Logging failures never replace the primary outcome; they ride along here so
/// the caller can still see them.
#[derive(Debug)]
pub struct CallError {
    error: Error,
    record_id: Option<RecordId>,
    logging_failures: Vec<LoggingError>,
}

impl CallError {
    pub(crate) fn new(
        error: Error,
        record_id: Option<RecordId>,
        logging_failures: Vec<LoggingError>,
    ) -> Self {
        Self {
            error,
            record_id,
            logging_failures,
        }
    }

    /// The primary error of the call
    pub fn error(&self) -> &Error {
        &self.error
    }

    /// Consume the wrapper, keeping only the primary error
    pub fn into_error(self) -> Error {
        self.error
    }

    /// Call log record created for this call, if logging was enabled
    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    /// Call log failures suppressed in favour of the primary error
    pub fn logging_failures(&self) -> &[LoggingError] {
        &self.logging_failures
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        if !self.logging_failures.is_empty() {
            write!(
                f,
                " ({} call log failure(s) suppressed)",
                self.logging_failures.len()
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for CallError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<Error> for CallError {
    fn from(error: Error) -> Self {
        Self::new(error, None, Vec::new())
    }
}

impl From<ValidationErrors> for CallError {
    fn from(errors: ValidationErrors) -> Self {
        Error::Validation(errors).into()
    }
}

impl From<NodeError> for CallError {
    fn from(error: NodeError) -> Self {
        Error::Field(error).into()
    }
}
