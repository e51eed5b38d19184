//! TCU Core - client for the TCU undergraduate admissions API
//!
//! The provider speaks XML over HTTP: every request carries the account's
//! credentials and one or more parameter blocks, and every response is an XML
//! document with no schema fixed at the transport level.
//!
//! # Main Components
//!
//! - **XML codec**: Encode parameter blocks into the request envelope and
//!   decode responses into a generic [`Node`] tree
//! - **Transport**: Single HTTP attempts plus bounded retries with backoff
//! - **Call log**: Optional lifecycle logging of every call to MySQL,
//!   Postgres or SQLite
//! - **Pipeline**: Per-call orchestration of the above
//! - **Resources**: Validated operations for applicants, admissions,
//!   transfers, verification and the dashboard
//!
//! # Example
//!
//! ```no_run
//! use tcu_core::{Method, ParamBlock, TcuClient, TcuConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = TcuClient::connect(TcuConfig::from_env()?).await?;
//! let tree = client
//!     .execute(
//!         "/applicants/checkStatus",
//!         ParamBlock::new().with("f4indexno", "S0123/0001/2019"),
//!         Method::POST,
//!     )
//!     .await?;
//! println!("{}", tree.text("ResponseParameters.StatusCode")?);
//! # Ok(())
//! # }
//! ```

pub mod call_log;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod resources;
pub mod xml;

// Re-export main types for convenience
pub use call_log::{CallLogger, CallRecord, LoggingError, NoopCallLogger, RecordId, SqlCallLogger};
pub use client::TcuClient;
pub use config::{DatabaseConfig, DatabaseDriver, TcuConfig, TcuConfigBuilder};
pub use error::{CallError, CallResult, Error, Result};
pub use http::{Method, RetryPolicy};
pub use pipeline::{CallState, Exchange, RequestPipeline};
pub use resources::{ValidationErrors, Validator};
pub use xml::{decode_response, encode_request, Node, NodeError, ParamBlock, ParamBlocks, ParamValue};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
