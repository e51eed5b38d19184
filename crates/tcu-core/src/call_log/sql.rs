//! Relational call logger over a sqlx `Any` pool

use async_trait::async_trait;
use serde::Serialize;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};
use tracing::{debug, info};

use crate::call_log::schema::{self, Statements};
use crate::call_log::{
    CallLogger, ErrorEntry, LoggingError, RecordId, RecordStatus, RequestEntry, SuccessEntry,
};
use crate::config::{DatabaseConfig, DatabaseDriver};
use crate::error::{Error, Result};

/// A persisted call record, as read back from the log table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallRecord {
    pub id: RecordId,
    pub endpoint: String,
    pub method: String,
    pub request_body: Option<String>,
    /// Bytes sent, which differs from the logged body length when redacted
    pub request_size: Option<i64>,
    pub request_headers: Option<String>,
    pub client_identity: Option<String>,
    pub response_body: Option<String>,
    pub response_size: Option<i64>,
    pub status_code: Option<i64>,
    pub execution_time: Option<f64>,
    pub response_headers: Option<String>,
    pub error_message: Option<String>,
    pub error_code: Option<String>,
    pub status: String,
}

impl CallRecord {
    fn from_row(row: &AnyRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Self {
            id: RecordId(row.try_get("id")?),
            endpoint: row.try_get("endpoint")?,
            method: row.try_get("method")?,
            request_body: row.try_get("request_body")?,
            request_size: row.try_get("request_size")?,
            request_headers: row.try_get("request_headers")?,
            client_identity: row.try_get("client_identity")?,
            response_body: row.try_get("response_body")?,
            response_size: row.try_get("response_size")?,
            status_code: row.try_get("status_code")?,
            execution_time: row.try_get("execution_time")?,
            response_headers: row.try_get("response_headers")?,
            error_message: row.try_get("error_message")?,
            error_code: row.try_get("error_code")?,
            status: row.try_get("status")?,
        })
    }

    pub fn record_status(&self) -> Option<RecordStatus> {
        RecordStatus::parse(&self.status)
    }
}

/// Call logger backed by MySQL, Postgres or SQLite
///
/// The pool is the only state shared between calls; cloning the logger shares it.
#[derive(Debug, Clone)]
pub struct SqlCallLogger {
    pool: AnyPool,
    driver: DatabaseDriver,
    table: String,
    statements: Statements,
}

impl SqlCallLogger {
    /// Open a pool for the configured database
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        sqlx::any::install_default_drivers();

        let url = config.connection_url()?;
        let in_memory = config.driver == DatabaseDriver::Sqlite && url.contains(":memory:");
        let mut options = AnyPoolOptions::new().max_connections(config.max_connections);
        if in_memory {
            // every connection would otherwise see its own empty database
            options = options.max_connections(1).idle_timeout(None).max_lifetime(None);
        }

        let pool = options.connect(&url).await.map_err(|e| Error::Configuration {
            message: format!("Failed to connect to the {} call log database", config.driver),
            source: Some(e.into()),
        })?;
        info!(driver = %config.driver, table = %config.table_name(), "Call log database connected");

        Ok(Self::from_pool(pool, config.driver, config.table_name()))
    }

    /// Wrap an existing pool; `table` must already be a trusted identifier
    pub fn from_pool(pool: AnyPool, driver: DatabaseDriver, table: impl Into<String>) -> Self {
        let table = table.into();
        let statements = Statements::new(driver, &table);
        Self {
            pool,
            driver,
            table,
            statements,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn driver(&self) -> DatabaseDriver {
        self.driver
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Create the log table if it does not exist yet
    pub async fn ensure_schema(&self) -> std::result::Result<(), LoggingError> {
        sqlx::query(&schema::create_table(self.driver, &self.table))
            .execute(&self.pool)
            .await?;
        debug!(table = %self.table, "Call log table ready");
        Ok(())
    }

    /// Read a record back
    pub async fn fetch_record(&self, record_id: RecordId) -> std::result::Result<Option<CallRecord>, LoggingError> {
        let row = sqlx::query(&self.statements.select)
            .bind(record_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(CallRecord::from_row).transpose()?)
    }

    fn expect_one_row(record_id: RecordId, rows_affected: u64) -> std::result::Result<(), LoggingError> {
        if rows_affected == 0 {
            return Err(LoggingError::RecordNotUpdated { record_id });
        }
        Ok(())
    }
}

fn encode_headers(field: &'static str, headers: &crate::http::transport::Headers) -> std::result::Result<String, LoggingError> {
    serde_json::to_string(headers).map_err(|source| LoggingError::Serialization { field, source })
}

#[async_trait]
impl CallLogger for SqlCallLogger {
    async fn log_request_start(&self, entry: RequestEntry<'_>) -> std::result::Result<Option<RecordId>, LoggingError> {
        let headers = encode_headers("request headers", entry.headers)?;
        let query = sqlx::query(&self.statements.insert)
            .bind(entry.endpoint.to_string())
            .bind(entry.method.to_string())
            .bind(entry.body.to_string())
            .bind(entry.size as i64)
            .bind(headers)
            .bind(entry.client_identity.to_string())
            .bind(RecordStatus::Started.as_str());

        let id = match self.driver {
            DatabaseDriver::Mysql => query
                .execute(&self.pool)
                .await?
                .last_insert_id()
                .ok_or(LoggingError::MissingRecordId)?,
            DatabaseDriver::Postgres | DatabaseDriver::Sqlite => {
                query.fetch_one(&self.pool).await?.try_get::<i64, _>("id")?
            }
        };

        debug!(record_id = id, endpoint = entry.endpoint, "Call log record started");
        Ok(Some(RecordId(id)))
    }

    async fn log_outcome_success(&self, record_id: RecordId, entry: SuccessEntry<'_>) -> std::result::Result<(), LoggingError> {
        let headers = encode_headers("response headers", entry.headers)?;
        let result = sqlx::query(&self.statements.update_success)
            .bind(i64::from(entry.status_code))
            .bind(headers)
            .bind(entry.body.to_string())
            .bind(entry.body.len() as i64)
            .bind(entry.execution_time.as_secs_f64())
            .bind(RecordStatus::Completed.as_str())
            .bind(record_id.0)
            .bind(RecordStatus::Started.as_str())
            .execute(&self.pool)
            .await?;
        Self::expect_one_row(record_id, result.rows_affected())
    }

    async fn log_outcome_error(&self, record_id: RecordId, entry: ErrorEntry<'_>) -> std::result::Result<(), LoggingError> {
        let result = sqlx::query(&self.statements.update_error)
            .bind(i64::from(entry.status_code))
            .bind(entry.execution_time.as_secs_f64())
            .bind(entry.message.to_string())
            .bind(entry.code.to_string())
            .bind(entry.response_body.map(str::to_string))
            .bind(entry.response_body.map(|b| b.len() as i64))
            .bind(RecordStatus::Error.as_str())
            .bind(record_id.0)
            .bind(RecordStatus::Started.as_str())
            .execute(&self.pool)
            .await?;
        Self::expect_one_row(record_id, result.rows_affected())
    }
}
