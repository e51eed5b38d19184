//! Single-attempt HTTP transport
//!
//! [`HttpTransport`] performs exactly one attempt; retrying is the executor's
//! job. The reqwest implementation is configured per client from a
//! [`TransportConfig`], with no process-wide defaults.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client as ReqwestClient, Method};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

use crate::config::TcuConfig;
use crate::error::{Error, Result};
use crate::http::error::TransportFailure;

/// Header map as persisted by the call logger
pub type Headers = BTreeMap<String, String>;

/// Fixed `User-Agent` sent with every request
pub const USER_AGENT: &str = concat!("tcu-rs/", env!("CARGO_PKG_VERSION"));

/// Per-client transport settings
#[derive(Debug, Clone, PartialEq)]
pub struct TransportConfig {
    /// Timeout for one attempt, connect included
    pub timeout: Duration,
    /// Timeout for establishing the connection
    pub connect_timeout: Duration,
    /// Whether to validate TLS certificates
    pub validate_tls: bool,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            validate_tls: true,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl From<&TcuConfig> for TransportConfig {
    fn from(config: &TcuConfig) -> Self {
        Self {
            timeout: config.timeout(),
            connect_timeout: config.connect_timeout(),
            validate_tls: config.validate_tls(),
            user_agent: config.user_agent().to_string(),
        }
    }
}

/// A fully built request, reusable across attempts
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Headers,
    pub body: Vec<u8>,
}

/// A response that was received in full, whatever its status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Body as text, replacing invalid UTF-8
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Standard headers for an XML exchange
pub fn default_headers(user_agent: &str) -> Headers {
    Headers::from([
        ("Accept".to_string(), "application/xml".to_string()),
        ("Content-Type".to_string(), "application/xml".to_string()),
        ("User-Agent".to_string(), user_agent.to_string()),
    ])
}

/// One HTTP attempt
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send_once(&self, request: &WireRequest) -> std::result::Result<RawResponse, TransportFailure>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
}

impl ReqwestTransport {
    /// Create a new transport from per-client settings
    pub fn new(config: &TransportConfig) -> Result<Self> {
        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .danger_accept_invalid_certs(!config.validate_tls)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(e.into()),
            })?;
        Ok(Self { client })
    }

    fn header_map(headers: &Headers) -> std::result::Result<HeaderMap, TransportFailure> {
        let mut map = HeaderMap::with_capacity(headers.len());
        for (key, value) in headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                TransportFailure::new(
                    crate::http::error::FailurePhase::Request,
                    format!("invalid header name {:?}: {}", key, e),
                )
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                TransportFailure::new(
                    crate::http::error::FailurePhase::Request,
                    format!("invalid value for header {:?}: {}", key, e),
                )
            })?;
            map.insert(name, value);
        }
        Ok(map)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send_once(&self, request: &WireRequest) -> std::result::Result<RawResponse, TransportFailure> {
        let response = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(Self::header_map(&request.headers)?)
            .body(request.body.clone())
            .send()
            .await
            .map_err(TransportFailure::from_request_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(TransportFailure::from_body_error)?
            .to_vec();

        Ok(RawResponse { status, headers, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_headers() {
        let headers = default_headers(USER_AGENT);
        assert_eq!(headers["Content-Type"], "application/xml");
        assert_eq!(headers["Accept"], "application/xml");
        assert!(headers["User-Agent"].starts_with("tcu-rs/"));
        assert!(!headers.contains_key("Authorization"));
    }

    #[test]
    fn test_transport_config_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.validate_tls);
    }

    #[test]
    fn test_transport_creation() {
        assert!(ReqwestTransport::new(&TransportConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_header_is_a_request_failure() {
        let headers = Headers::from([("bad header".to_string(), "x".to_string())]);
        let failure = ReqwestTransport::header_map(&headers).unwrap_err();
        assert!(!failure.should_retry());
    }
}
