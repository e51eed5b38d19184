//! Per-call orchestration
//!
//! A call moves through `Building -> Sending -> (Retrying)* -> Completed | Failed`:
//! the parameters are encoded, the start of the call is logged, the request is
//! sent with bounded retries, the outcome is logged, and the response is
//! decoded or classified into an error.
//!
//! Encoding failures return before anything is logged. Failures of the call
//! log never replace the call's own outcome; they are collected and returned
//! alongside it.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, field, info, info_span, warn, Instrument, Span};

use crate::call_log::redaction::redact_session_token;
use crate::call_log::{CallLogger, ErrorEntry, LoggingError, RecordId, RequestEntry, SuccessEntry};
use crate::config::TcuConfig;
use crate::error::{CallError, CallResult, Error};
use crate::http::error::error_for_status;
use crate::http::executor::TransportExecutor;
use crate::http::transport::{default_headers, Headers, HttpTransport, RawResponse, WireRequest};
use crate::http::Method;
use crate::xml::{decode_response, encode_request, Node, ParamBlocks};

/// Message stored in the call log when the caller cancels a call
pub const CANCELLED_MESSAGE: &str = "request cancelled";

/// Lifecycle state of a call, reported on the `tcu_call` span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Building,
    Sending,
    Retrying,
    Completed,
    Failed,
}

impl CallState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallState::Building => "building",
            CallState::Sending => "sending",
            CallState::Retrying => "retrying",
            CallState::Completed => "completed",
            CallState::Failed => "failed",
        }
    }
}

/// A completed call
#[derive(Debug)]
pub struct Exchange {
    pub status: u16,
    pub headers: Headers,
    /// Decoded response body
    pub body: Node,
    pub record_id: Option<RecordId>,
    /// Wall-clock time from the first attempt to the final response
    pub elapsed: Duration,
    /// Call log failures that did not affect the outcome
    pub logging_failures: Vec<LoggingError>,
}

impl Exchange {
    pub fn into_body(self) -> Node {
        self.body
    }
}

/// A failed call, before its outcome is logged
struct Failure {
    error: Error,
    status_code: u16,
    body: Option<String>,
}

impl Failure {
    fn without_response(error: Error) -> Self {
        Self {
            error,
            status_code: 0,
            body: None,
        }
    }

    fn message(&self) -> String {
        match self.error {
            Error::Cancelled => CANCELLED_MESSAGE.to_string(),
            ref other => other.to_string(),
        }
    }
}

/// Runs calls against one configured endpoint with one call logger
#[derive(Clone)]
pub struct RequestPipeline {
    config: TcuConfig,
    executor: TransportExecutor,
    logger: Arc<dyn CallLogger>,
}

impl RequestPipeline {
    pub fn new(config: &TcuConfig, transport: Arc<dyn HttpTransport>, logger: Arc<dyn CallLogger>) -> Self {
        Self {
            config: config.clone(),
            executor: TransportExecutor::new(transport, config.retry_policy()),
            logger,
        }
    }

    pub fn config(&self) -> &TcuConfig {
        &self.config
    }

    /// Execute one call and decode its response
    pub async fn execute(&self, path: &str, params: &ParamBlocks, method: Method) -> CallResult<Exchange> {
        self.execute_with_cancel(path, params, method, std::future::pending()).await
    }

    /// Like [`execute`](Self::execute), abandoning the call once `cancel` resolves
    ///
    /// Cancellation drops the in-flight attempt and skips any remaining retries.
    /// The call is still logged, as an error with code `cancelled`.
    pub async fn execute_with_cancel<C>(
        &self,
        path: &str,
        params: &ParamBlocks,
        method: Method,
        cancel: C,
    ) -> CallResult<Exchange>
    where
        C: Future<Output = ()> + Send,
    {
        let span = info_span!(
            "tcu_call",
            endpoint = path,
            method = %method,
            record_id = field::Empty,
            state = CallState::Building.as_str(),
        );
        self.run(path, params, method, cancel).instrument(span).await
    }

    async fn run<C>(&self, path: &str, params: &ParamBlocks, method: Method, cancel: C) -> CallResult<Exchange>
    where
        C: Future<Output = ()> + Send,
    {
        let span = Span::current();

        let url = self.config.endpoint_url(path)?;
        let body = encode_request(params, self.config.username(), self.config.session_token())?;
        let body_text = String::from_utf8_lossy(&body).into_owned();
        debug!(bytes = body.len(), blocks = params.len(), "Request encoded");

        let request = WireRequest {
            method,
            url,
            headers: default_headers(self.config.user_agent()),
            body,
        };

        let mut logging_failures = Vec::new();
        let logged_body = if self.config.redact_credentials() {
            redact_session_token(&body_text)
        } else {
            Cow::Borrowed(body_text.as_str())
        };
        let record_id = match self
            .logger
            .log_request_start(RequestEntry {
                endpoint: path,
                method: request.method.as_str(),
                headers: &request.headers,
                body: &logged_body,
                size: request.body.len(),
                client_identity: self.config.username(),
            })
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!("Failed to log request start: {}", e);
                logging_failures.push(e);
                None
            }
        };
        if let Some(id) = record_id {
            span.record("record_id", id.0);
        }

        span.record("state", CallState::Sending.as_str());
        let started = Instant::now();

        let sent = {
            let send = self.executor.send_observed(&request, |_, _| {
                span.record("state", CallState::Retrying.as_str());
            });
            tokio::pin!(cancel);
            tokio::select! {
                biased;
                _ = &mut cancel => None,
                result = send => Some(result),
            }
        };
        let elapsed = started.elapsed();

        let outcome = match sent {
            None => {
                info!("Call cancelled after {:?}", elapsed);
                Err(Failure::without_response(Error::Cancelled))
            }
            Some(Err(error)) => Err(Failure::without_response(error)),
            Some(Ok(response)) => interpret(response),
        };

        match outcome {
            Ok((response, tree)) => {
                if let Some(id) = record_id {
                    let text = response.body_text();
                    let entry = SuccessEntry {
                        status_code: response.status,
                        headers: &response.headers,
                        body: &text,
                        execution_time: elapsed,
                    };
                    if let Err(e) = self.logger.log_outcome_success(id, entry).await {
                        warn!(record_id = id.0, "Failed to log call success: {}", e);
                        logging_failures.push(e);
                    }
                }

                span.record("state", CallState::Completed.as_str());
                info!(status = response.status, ?elapsed, "Call completed");
                Ok(Exchange {
                    status: response.status,
                    headers: response.headers,
                    body: tree,
                    record_id,
                    elapsed,
                    logging_failures,
                })
            }
            Err(failure) => {
                if let Some(id) = record_id {
                    let message = failure.message();
                    let entry = ErrorEntry {
                        status_code: failure.status_code,
                        execution_time: elapsed,
                        message: &message,
                        code: failure.error.error_code(),
                        response_body: failure.body.as_deref(),
                    };
                    if let Err(e) = self.logger.log_outcome_error(id, entry).await {
                        warn!(record_id = id.0, "Failed to log call error: {}", e);
                        logging_failures.push(e);
                    }
                }

                span.record("state", CallState::Failed.as_str());
                error!(code = failure.error.error_code(), ?elapsed, "Call failed: {}", failure.error);
                Err(CallError::new(failure.error, record_id, logging_failures))
            }
        }
    }
}

/// Classify a fully received response
fn interpret(response: RawResponse) -> Result<(RawResponse, Node), Failure> {
    if let Some(error) = error_for_status(&response) {
        return Err(Failure {
            error,
            status_code: response.status,
            body: Some(response.body_text().into_owned()),
        });
    }

    match decode_response(&response.body) {
        Ok(tree) => {
            debug!(bytes = response.body.len(), "Response decoded");
            Ok((response, tree))
        }
        Err(error) => Err(Failure {
            error,
            status_code: response.status,
            body: Some(response.body_text().into_owned()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call_log::NoopCallLogger;
    use crate::http::error::{FailurePhase, TransportFailure};
    use crate::xml::ParamBlock;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Start { body: String },
        Success { id: RecordId, status: u16 },
        Error { id: RecordId, status: u16, code: String, message: String },
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<Event>>,
        fail_start: bool,
    }

    impl Recorder {
        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CallLogger for Recorder {
        async fn log_request_start(&self, entry: RequestEntry<'_>) -> Result<Option<RecordId>, LoggingError> {
            if self.fail_start {
                return Err(LoggingError::MissingRecordId);
            }
            let mut events = self.events.lock().unwrap();
            events.push(Event::Start {
                body: entry.body.to_string(),
            });
            Ok(Some(RecordId(events.len() as i64)))
        }

        async fn log_outcome_success(&self, id: RecordId, entry: SuccessEntry<'_>) -> Result<(), LoggingError> {
            self.events.lock().unwrap().push(Event::Success {
                id,
                status: entry.status_code,
            });
            Ok(())
        }

        async fn log_outcome_error(&self, id: RecordId, entry: ErrorEntry<'_>) -> Result<(), LoggingError> {
            self.events.lock().unwrap().push(Event::Error {
                id,
                status: entry.status_code,
                code: entry.code.to_string(),
                message: entry.message.to_string(),
            });
            Ok(())
        }
    }

    struct Scripted(Mutex<VecDeque<Result<RawResponse, TransportFailure>>>);

    impl Scripted {
        fn new(script: Vec<Result<RawResponse, TransportFailure>>) -> Arc<Self> {
            Arc::new(Self(Mutex::new(script.into())))
        }
    }

    #[async_trait]
    impl HttpTransport for Scripted {
        async fn send_once(&self, _request: &WireRequest) -> Result<RawResponse, TransportFailure> {
            let next = self.0.lock().unwrap().pop_front();
            match next {
                Some(result) => result,
                None => std::future::pending().await,
            }
        }
    }

    fn response(status: u16, body: &str) -> Result<RawResponse, TransportFailure> {
        Ok(RawResponse {
            status,
            headers: Headers::new(),
            body: body.as_bytes().to_vec(),
        })
    }

    fn config() -> TcuConfig {
        TcuConfig::builder()
            .base_url("http://localhost")
            .username("UDSM")
            .session_token("tok-123")
            .max_attempts(2)
            .build()
            .unwrap()
    }

    fn params() -> ParamBlocks {
        ParamBlock::new().with("f4indexno", "S0123456789").into()
    }

    #[tokio::test]
    async fn test_success_logs_start_then_success() {
        let logger = Arc::new(Recorder::default());
        let transport = Scripted::new(vec![response(200, "<Response><Status>OK</Status></Response>")]);
        let pipeline = RequestPipeline::new(&config(), transport, logger.clone());

        let exchange = pipeline
            .execute("/applicants/checkStatus", &params(), Method::POST)
            .await
            .unwrap();

        assert_eq!(exchange.body.text("Status").unwrap(), "OK");
        assert_eq!(exchange.record_id, Some(RecordId(1)));
        let events = logger.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], Event::Success { id: RecordId(1), status: 200 });
    }

    #[tokio::test]
    async fn test_logged_body_is_redacted() {
        let logger = Arc::new(Recorder::default());
        let transport = Scripted::new(vec![response(200, "<Response/>")]);
        let pipeline = RequestPipeline::new(&config(), transport, logger.clone());

        pipeline.execute("/x", &params(), Method::POST).await.unwrap();

        match &logger.events()[0] {
            Event::Start { body } => {
                assert!(!body.contains("tok-123"));
                assert!(body.contains("S0123456789"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_encoding_error_logs_nothing() {
        let logger = Arc::new(Recorder::default());
        let pipeline = RequestPipeline::new(&config(), Scripted::new(vec![]), logger.clone());

        let err = pipeline
            .execute("/x", &ParamBlock::new().with("bad name", "v").into(), Method::POST)
            .await
            .unwrap_err();

        assert!(matches!(err.error(), Error::Encoding { .. }));
        assert!(err.record_id().is_none());
        assert!(logger.events().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_is_logged_as_error() {
        let logger = Arc::new(Recorder::default());
        let transport = Scripted::new(vec![response(200, "<Response><open>")]);
        let pipeline = RequestPipeline::new(&config(), transport, logger.clone());

        let err = pipeline.execute("/x", &params(), Method::GET).await.unwrap_err();

        assert!(matches!(err.error(), Error::MalformedResponse { .. }));
        match &logger.events()[1] {
            Event::Error { status, code, .. } => {
                assert_eq!(*status, 200);
                assert_eq!(code, "malformed_response");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failure_logged_with_status_zero() {
        let refused = || Err(TransportFailure::new(FailurePhase::Connect, "refused"));
        let logger = Arc::new(Recorder::default());
        let pipeline = RequestPipeline::new(&config(), Scripted::new(vec![refused(), refused()]), logger.clone());

        let err = pipeline.execute("/x", &params(), Method::POST).await.unwrap_err();

        assert!(matches!(err.error(), Error::Network { attempts: 2, .. }));
        match &logger.events()[1] {
            Event::Error { status, code, .. } => {
                assert_eq!(*status, 0);
                assert_eq!(code, "network_error");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancellation_is_logged() {
        let logger = Arc::new(Recorder::default());
        let pipeline = RequestPipeline::new(&config(), Scripted::new(vec![]), logger.clone());

        let err = pipeline
            .execute_with_cancel("/x", &params(), Method::POST, async {})
            .await
            .unwrap_err();

        assert!(matches!(err.error(), Error::Cancelled));
        assert_eq!(
            logger.events()[1],
            Event::Error {
                id: RecordId(1),
                status: 0,
                code: "cancelled".to_string(),
                message: CANCELLED_MESSAGE.to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_logging_failure_does_not_mask_outcome() {
        let logger = Arc::new(Recorder {
            fail_start: true,
            ..Default::default()
        });
        let transport = Scripted::new(vec![response(200, "<Response/>")]);
        let pipeline = RequestPipeline::new(&config(), transport, logger.clone());

        let exchange = pipeline.execute("/x", &params(), Method::POST).await.unwrap();

        assert_eq!(exchange.status, 200);
        assert_eq!(exchange.record_id, None);
        assert_eq!(exchange.logging_failures.len(), 1);
        assert!(logger.events().is_empty());
    }

    #[tokio::test]
    async fn test_noop_logger_leaves_no_record() {
        let transport = Scripted::new(vec![response(401, "")]);
        let pipeline = RequestPipeline::new(&config(), transport, Arc::new(NoopCallLogger));

        let err = pipeline.execute("/x", &params(), Method::POST).await.unwrap_err();

        assert!(matches!(err.error(), Error::Authentication { .. }));
        assert!(err.record_id().is_none());
        assert!(err.logging_failures().is_empty());
    }
}
