//! Client facade tying configuration, transport and call log together

use std::future::Future;
use std::sync::Arc;
use tracing::info;

use crate::call_log::{CallLogger, NoopCallLogger, SqlCallLogger};
use crate::config::TcuConfig;
use crate::error::{CallResult, Result};
use crate::http::transport::{HttpTransport, ReqwestTransport, TransportConfig};
use crate::http::Method;
use crate::pipeline::{Exchange, RequestPipeline};
use crate::resources::{Admissions, Applicants, Dashboard, Transfers, Verification};
use crate::xml::{Node, ParamBlocks};

/// Entry point for calling the TCU admissions API
///
/// ```no_run
/// use tcu_core::{TcuClient, TcuConfig};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = TcuConfig::builder()
///     .base_url("https://api.tcu.go.tz")
///     .username("UDSM")
///     .session_token("token")
///     .build()?;
/// let client = TcuClient::connect(config).await?;
/// let check = client.applicants().check_status(&["S0123456789"]).await?;
/// println!("{:?}", check.applicants);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TcuClient {
    pipeline: RequestPipeline,
    call_log: Option<SqlCallLogger>,
}

impl TcuClient {
    /// Build the reqwest transport and, when a database is configured, the SQL call logger
    pub async fn connect(config: TcuConfig) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(&TransportConfig::from(&config))?);

        let call_log = match config.database() {
            Some(database) => Some(SqlCallLogger::connect(database).await?),
            None => None,
        };
        let logger: Arc<dyn CallLogger> = match &call_log {
            Some(sql) => Arc::new(sql.clone()),
            None => Arc::new(NoopCallLogger),
        };

        info!(
            base_url = %config.base_url(),
            call_log = call_log.is_some(),
            "TCU client ready"
        );
        Ok(Self {
            pipeline: RequestPipeline::new(&config, transport, logger),
            call_log,
        })
    }

    /// Assemble a client from explicit collaborators
    pub fn with_parts(config: &TcuConfig, transport: Arc<dyn HttpTransport>, logger: Arc<dyn CallLogger>) -> Self {
        Self {
            pipeline: RequestPipeline::new(config, transport, logger),
            call_log: None,
        }
    }

    pub fn config(&self) -> &TcuConfig {
        self.pipeline.config()
    }

    pub fn pipeline(&self) -> &RequestPipeline {
        &self.pipeline
    }

    /// The SQL call logger, when one was configured
    pub fn call_log(&self) -> Option<&SqlCallLogger> {
        self.call_log.as_ref()
    }

    /// Execute a call and return the decoded response tree
    pub async fn execute(&self, path: &str, params: impl Into<ParamBlocks>, method: Method) -> CallResult<Node> {
        self.exchange(path, params, method).await.map(Exchange::into_body)
    }

    /// Execute a call and return the full exchange
    pub async fn exchange(&self, path: &str, params: impl Into<ParamBlocks>, method: Method) -> CallResult<Exchange> {
        self.pipeline.execute(path, &params.into(), method).await
    }

    /// Execute a call that is abandoned once `cancel` resolves
    pub async fn execute_with_cancel<C>(
        &self,
        path: &str,
        params: impl Into<ParamBlocks>,
        method: Method,
        cancel: C,
    ) -> CallResult<Node>
    where
        C: Future<Output = ()> + Send,
    {
        self.pipeline
            .execute_with_cancel(path, &params.into(), method, cancel)
            .await
            .map(Exchange::into_body)
    }

    pub fn applicants(&self) -> Applicants<'_> {
        Applicants::new(self)
    }

    pub fn admissions(&self) -> Admissions<'_> {
        Admissions::new(self)
    }

    pub fn dashboard(&self) -> Dashboard<'_> {
        Dashboard::new(self)
    }

    pub fn transfers(&self) -> Transfers<'_> {
        Transfers::new(self)
    }

    pub fn verification(&self) -> Verification<'_> {
        Verification::new(self)
    }
}
