//! HTTP transport for TCU API communication
//!
//! This module provides:
//! - A single-attempt transport abstraction with a reqwest implementation
//! - Error classification separating retryable connection failures from
//!   protocol-level outcomes
//! - Retry logic with exponential backoff

pub mod error;
pub mod executor;
pub mod retry;
pub mod transport;

pub use error::{error_for_status, ErrorClassification, FailurePhase, TransportFailure};
pub use executor::TransportExecutor;
pub use retry::{RetryDecision, RetryHandler, RetryPolicy};
pub use transport::{
    default_headers, Headers, HttpTransport, RawResponse, ReqwestTransport, TransportConfig,
    WireRequest, USER_AGENT,
};

// Re-export commonly used types
pub use reqwest::{Method, StatusCode};
