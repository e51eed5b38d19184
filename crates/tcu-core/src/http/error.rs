//! HTTP failure classification
//!
//! Separates what the transport may retry (connection-level failures before
//! any response byte arrived) from protocol-level outcomes, which are never
//! retried and are mapped onto [`crate::Error`] kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Error;
use crate::http::transport::RawResponse;
use crate::xml::{decode_response, Node};

/// Classification of call outcomes for retry and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClassification {
    /// Provider answered 401 - never retried
    AuthenticationError,
    /// Provider answered another 4xx status - never retried
    ClientError,
    /// Provider answered 5xx or a nonstandard status above it - never retried
    ServerError,
    /// No response was received - retried with backoff
    NetworkError,
    /// Anything else
    Unknown,
}

impl ErrorClassification {
    /// Check if this error type should be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorClassification::NetworkError)
    }

    /// Classify an HTTP status code
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            401 => Some(ErrorClassification::AuthenticationError),
            400..=499 => Some(ErrorClassification::ClientError),
            _ if status >= 500 => Some(ErrorClassification::ServerError),
            _ => None,
        }
    }
}

/// Where in the exchange a single attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePhase {
    /// DNS resolution or TCP/TLS connect
    Connect,
    /// The attempt timed out before a response arrived
    Timeout,
    /// The request could not be sent for another reason
    Request,
    /// Headers arrived but reading the body failed
    Body,
}

/// Failure of one transport attempt
#[derive(Debug)]
pub struct TransportFailure {
    pub phase: FailurePhase,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportFailure {
    pub fn new(phase: FailurePhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
            source: None,
        }
    }

    /// Classify a reqwest error raised before the response headers arrived
    pub fn from_request_error(error: reqwest::Error) -> Self {
        let phase = if error.is_timeout() {
            FailurePhase::Timeout
        } else if error.is_connect() {
            FailurePhase::Connect
        } else {
            FailurePhase::Request
        };
        Self {
            phase,
            message: error.to_string(),
            source: Some(Box::new(error)),
        }
    }

    /// Wrap a reqwest error raised while reading the response body
    pub fn from_body_error(error: reqwest::Error) -> Self {
        Self {
            phase: FailurePhase::Body,
            message: format!("failed to read response body: {}", error),
            source: Some(Box::new(error)),
        }
    }

    pub fn classification(&self) -> ErrorClassification {
        match self.phase {
            FailurePhase::Connect | FailurePhase::Timeout => ErrorClassification::NetworkError,
            FailurePhase::Request | FailurePhase::Body => ErrorClassification::Unknown,
        }
    }

    /// Only failures before any response byte was received are retried
    pub fn should_retry(&self) -> bool {
        self.classification().is_retryable()
    }

    /// Convert into the terminal network error after `attempts` attempts
    pub fn into_error(self, attempts: u32) -> Error {
        Error::Network {
            attempts,
            message: self.message,
            source: self.source,
        }
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} failure: {}", self.phase, self.message)
    }
}

impl std::error::Error for TransportFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Map an error status onto the matching error kind; `None` for 1xx-3xx
pub fn error_for_status(response: &RawResponse) -> Option<Error> {
    let classification = ErrorClassification::from_status(response.status)?;
    let message = provider_message(response);
    Some(match classification {
        ErrorClassification::AuthenticationError => Error::Authentication {
            status_code: response.status,
            message,
        },
        _ => Error::Provider {
            status_code: response.status,
            message,
            body: response.body_text().into_owned(),
        },
    })
}

const MESSAGE_FIELDS: [&str; 5] = ["StatusDescription", "Message", "message", "Error", "error"];
const MAX_MESSAGE_LEN: usize = 200;

/// Extract the provider's own error description from an error response
fn provider_message(response: &RawResponse) -> String {
    if let Ok(tree) = decode_response(&response.body) {
        if let Some(text) = find_message(&tree) {
            return text.to_string();
        }
    }

    let body = response.body_text();
    let body = body.trim();
    if body.is_empty() {
        return reqwest::StatusCode::from_u16(response.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("no response body")
            .to_string();
    }
    match body.char_indices().nth(MAX_MESSAGE_LEN) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

fn find_message(node: &Node) -> Option<&str> {
    match node {
        Node::Object(fields) => {
            for (name, child) in fields {
                if MESSAGE_FIELDS.contains(&name.as_str()) {
                    if let Node::Leaf(text) = child {
                        if !text.trim().is_empty() {
                            return Some(text);
                        }
                    }
                }
            }
            fields.iter().find_map(|(_, child)| find_message(child))
        }
        Node::List(items) => items.iter().find_map(find_message),
        Node::Leaf(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::transport::Headers;

    fn response(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status,
            headers: Headers::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_error_classification() {
        assert!(ErrorClassification::NetworkError.is_retryable());
        assert!(!ErrorClassification::ServerError.is_retryable());
        assert!(!ErrorClassification::ClientError.is_retryable());
        assert!(!ErrorClassification::AuthenticationError.is_retryable());
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(
            ErrorClassification::from_status(401),
            Some(ErrorClassification::AuthenticationError)
        );
        assert_eq!(
            ErrorClassification::from_status(403),
            Some(ErrorClassification::ClientError)
        );
        assert_eq!(
            ErrorClassification::from_status(503),
            Some(ErrorClassification::ServerError)
        );
        assert_eq!(
            ErrorClassification::from_status(600),
            Some(ErrorClassification::ServerError)
        );
        assert_eq!(ErrorClassification::from_status(200), None);
        assert_eq!(ErrorClassification::from_status(302), None);
    }

    #[test]
    fn test_nonstandard_status_is_provider_error() {
        let err = error_for_status(&response(600, "<Response><Status>OK</Status></Response>")).unwrap();
        assert!(matches!(err, Error::Provider { status_code: 600, .. }));

        let err = error_for_status(&response(999, "")).unwrap();
        assert!(matches!(err, Error::Provider { status_code: 999, .. }));
    }

    #[test]
    fn test_only_pre_response_failures_retry() {
        assert!(TransportFailure::new(FailurePhase::Connect, "refused").should_retry());
        assert!(TransportFailure::new(FailurePhase::Timeout, "slow").should_retry());
        assert!(!TransportFailure::new(FailurePhase::Body, "reset").should_retry());
        assert!(!TransportFailure::new(FailurePhase::Request, "builder").should_retry());
    }

    #[test]
    fn test_error_for_status() {
        assert!(error_for_status(&response(200, "<R/>")).is_none());

        let err = error_for_status(&response(401, "")).unwrap();
        assert!(matches!(err, Error::Authentication { status_code: 401, .. }));

        let err = error_for_status(&response(500, "oops")).unwrap();
        match err {
            Error::Provider { status_code, message, body } => {
                assert_eq!(status_code, 500);
                assert_eq!(message, "oops");
                assert_eq!(body, "oops");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_provider_message_from_xml_body() {
        let body = "<Response><ResponseParameters><StatusCode>422</StatusCode>\
                    <StatusDescription>Invalid programme code</StatusDescription>\
                    </ResponseParameters></Response>";
        let err = error_for_status(&response(422, body)).unwrap();
        assert!(err.to_string().contains("Invalid programme code"));
    }

    #[test]
    fn test_provider_message_falls_back_to_reason() {
        let err = error_for_status(&response(404, "  ")).unwrap();
        assert!(err.to_string().contains("Not Found"));
    }
}
