//! Client configuration
//!
//! A [`TcuConfig`] is only obtainable through [`TcuConfigBuilder::build`] (or
//! [`TcuConfig::from_env`], which goes through the builder), so every value
//! handed to the pipeline has already been validated. Components copy what
//! they need at construction time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};
use crate::http::retry::RetryPolicy;
use crate::http::transport::USER_AGENT;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const MAX_ATTEMPTS_LIMIT: u32 = 10;
pub const LOG_TABLE_NAME: &str = "tcu_api_logs";

/// Relational backend used by the call logger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    Mysql,
    Postgres,
    Sqlite,
}

impl DatabaseDriver {
    /// URL scheme understood by sqlx
    pub fn scheme(&self) -> &'static str {
        match self {
            DatabaseDriver::Mysql => "mysql",
            DatabaseDriver::Postgres => "postgres",
            DatabaseDriver::Sqlite => "sqlite",
        }
    }

    pub fn default_port(&self) -> Option<u16> {
        match self {
            DatabaseDriver::Mysql => Some(3306),
            DatabaseDriver::Postgres => Some(5432),
            DatabaseDriver::Sqlite => None,
        }
    }
}

impl FromStr for DatabaseDriver {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(DatabaseDriver::Mysql),
            "pgsql" | "postgres" | "postgresql" => Ok(DatabaseDriver::Postgres),
            "sqlite" | "sqlite3" => Ok(DatabaseDriver::Sqlite),
            other => Err(Error::configuration(format!(
                "Unsupported database driver: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for DatabaseDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_max_connections() -> u32 {
    5
}

/// Connection settings for the call log store
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub driver: DatabaseDriver,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default)]
    pub port: Option<u16>,

    /// Database name, or the file path for SQLite (`:memory:` for in-memory)
    #[serde(default)]
    pub database: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Prefix prepended to the log table name
    #[serde(default)]
    pub table_prefix: String,

    /// Upper bound on pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Full connection URL; overrides host, port, credentials and database
    #[serde(default)]
    pub url: Option<String>,
}

impl DatabaseConfig {
    pub fn new(driver: DatabaseDriver, database: impl Into<String>) -> Self {
        Self {
            driver,
            host: default_host(),
            port: None,
            database: database.into(),
            username: String::new(),
            password: String::new(),
            table_prefix: String::new(),
            max_connections: default_max_connections(),
            url: None,
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>, port: Option<u16>) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    /// Name of the call log table, prefix included
    pub fn table_name(&self) -> String {
        format!("{}{}", self.table_prefix, LOG_TABLE_NAME)
    }

    /// Render the sqlx connection URL
    pub fn connection_url(&self) -> Result<String> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }

        if self.driver == DatabaseDriver::Sqlite {
            return Ok(if self.database == ":memory:" {
                "sqlite::memory:".to_string()
            } else {
                format!("sqlite://{}?mode=rwc", self.database)
            });
        }

        let invalid = |e: url::ParseError| Error::Configuration {
            message: format!("Invalid database host: {}", self.host),
            source: Some(e.into()),
        };
        let mut url = Url::parse(&format!("{}://{}", self.driver.scheme(), self.host)).map_err(invalid)?;
        let rejected = || Error::configuration(format!("Invalid database host: {}", self.host));
        url.set_port(self.port.or(self.driver.default_port()))
            .map_err(|_| rejected())?;
        if !self.username.is_empty() {
            url.set_username(&self.username).map_err(|_| rejected())?;
        }
        if !self.password.is_empty() {
            url.set_password(Some(&self.password)).map_err(|_| rejected())?;
        }
        url.set_path(&self.database);
        Ok(url.to_string())
    }

    fn validate(&self) -> Result<()> {
        if self.url.as_deref().map(str::is_empty).unwrap_or(false) {
            return Err(Error::configuration("Database URL cannot be empty"));
        }
        if self.url.is_none() {
            if self.database.trim().is_empty() {
                return Err(Error::configuration("Database name cannot be empty"));
            }
            if self.driver != DatabaseDriver::Sqlite && self.host.trim().is_empty() {
                return Err(Error::configuration("Database host cannot be empty"));
            }
        }
        if !self
            .table_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(Error::configuration(format!(
                "Invalid table prefix {:?}: only ASCII letters, digits and '_' are allowed",
                self.table_prefix
            )));
        }
        if self.max_connections == 0 {
            return Err(Error::configuration("Database pool needs at least one connection"));
        }
        self.connection_url().map(|_| ())
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .field("table_prefix", &self.table_prefix)
            .field("max_connections", &self.max_connections)
            .field("url", &self.url.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Validated, immutable client configuration
#[derive(Clone)]
pub struct TcuConfig {
    base_url: Url,
    username: String,
    session_token: String,
    timeout: Duration,
    connect_timeout: Duration,
    max_attempts: u32,
    user_agent: String,
    validate_tls: bool,
    redact_credentials: bool,
    database: Option<DatabaseConfig>,
}

impl TcuConfig {
    pub fn builder() -> TcuConfigBuilder {
        TcuConfigBuilder::new()
    }

    /// Load configuration from `TCU_*` environment variables, reading `.env` first
    pub fn from_env() -> Result<Self> {
        TcuConfigBuilder::from_env()?.build()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn validate_tls(&self) -> bool {
        self.validate_tls
    }

    /// Whether the session token is masked before requests are logged
    pub fn redact_credentials(&self) -> bool {
        self.redact_credentials
    }

    pub fn database(&self) -> Option<&DatabaseConfig> {
        self.database.as_ref()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts)
    }

    /// Full URL of an endpoint path such as `/applicants/checkStatus`
    pub fn endpoint_url(&self, path: &str) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let joined = if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        };
        Url::parse(&joined).map_err(|e| Error::encoding(format!("invalid endpoint path {:?}: {}", path, e)))
    }
}

impl fmt::Debug for TcuConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcuConfig")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.username)
            .field("session_token", &"***")
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("max_attempts", &self.max_attempts)
            .field("user_agent", &self.user_agent)
            .field("validate_tls", &self.validate_tls)
            .field("redact_credentials", &self.redact_credentials)
            .field("database", &self.database)
            .finish()
    }
}

/// Builder for creating configurations programmatically
#[derive(Debug, Clone, Default)]
pub struct TcuConfigBuilder {
    base_url: Option<String>,
    username: Option<String>,
    session_token: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    max_attempts: Option<u32>,
    user_agent: Option<String>,
    validate_tls: Option<bool>,
    redact_credentials: Option<bool>,
    database: Option<DatabaseConfig>,
}

impl TcuConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn validate_tls(mut self, validate: bool) -> Self {
        self.validate_tls = Some(validate);
        self
    }

    pub fn redact_credentials(mut self, redact: bool) -> Self {
        self.redact_credentials = Some(redact);
        self
    }

    pub fn database(mut self, database: DatabaseConfig) -> Self {
        self.database = Some(database);
        self
    }

    /// Populate a builder from the process environment, reading `.env` first
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_env_vars(|key| std::env::var(key).ok())
    }

    /// Overlay every value set in `other` onto this builder
    pub fn merge(self, other: TcuConfigBuilder) -> Self {
        Self {
            base_url: other.base_url.or(self.base_url),
            username: other.username.or(self.username),
            session_token: other.session_token.or(self.session_token),
            timeout: other.timeout.or(self.timeout),
            connect_timeout: other.connect_timeout.or(self.connect_timeout),
            max_attempts: other.max_attempts.or(self.max_attempts),
            user_agent: other.user_agent.or(self.user_agent),
            validate_tls: other.validate_tls.or(self.validate_tls),
            redact_credentials: other.redact_credentials.or(self.redact_credentials),
            database: other.database.or(self.database),
        }
    }

    /// Populate a builder from `TCU_*` variables provided by `lookup`
    pub fn from_env_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::new();
        builder.base_url = lookup("TCU_BASE_URL");
        builder.username = lookup("TCU_USERNAME");
        builder.session_token = lookup("TCU_SESSION_TOKEN");
        builder.user_agent = lookup("TCU_USER_AGENT");

        if let Some(secs) = lookup("TCU_TIMEOUT") {
            builder.timeout = Some(Duration::from_secs(parse_var("TCU_TIMEOUT", &secs)?));
        }
        if let Some(attempts) = lookup("TCU_MAX_ATTEMPTS") {
            builder.max_attempts = Some(parse_var("TCU_MAX_ATTEMPTS", &attempts)?);
        }

        if let Some(driver) = lookup("TCU_DB_DRIVER") {
            let mut database = DatabaseConfig::new(driver.parse()?, lookup("TCU_DB_DATABASE").unwrap_or_default());
            if let Some(host) = lookup("TCU_DB_HOST") {
                database.host = host;
            }
            if let Some(port) = lookup("TCU_DB_PORT") {
                database.port = Some(parse_var("TCU_DB_PORT", &port)?);
            }
            database.username = lookup("TCU_DB_USERNAME").unwrap_or_default();
            database.password = lookup("TCU_DB_PASSWORD").unwrap_or_default();
            database.table_prefix = lookup("TCU_DB_TABLE_PREFIX").unwrap_or_default();
            database.url = lookup("TCU_DB_URL");
            builder.database = Some(database);
        }

        Ok(builder)
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<TcuConfig> {
        let raw_url = self
            .base_url
            .ok_or_else(|| Error::configuration("Base URL is required"))?;
        let base_url = Url::parse(raw_url.trim()).map_err(|e| Error::Configuration {
            message: format!("Invalid base URL: {}", raw_url),
            source: Some(e.into()),
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(Error::configuration(format!(
                "Base URL must use http or https, got {}",
                base_url.scheme()
            )));
        }

        let username = required(self.username, "Username")?;
        let session_token = required(self.session_token, "Session token")?;

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(Error::configuration("Timeout cannot be zero"));
        }
        let connect_timeout = self
            .connect_timeout
            .unwrap_or_else(|| DEFAULT_CONNECT_TIMEOUT.min(timeout));
        if connect_timeout.is_zero() {
            return Err(Error::configuration("Connect timeout cannot be zero"));
        }
        if connect_timeout > timeout {
            return Err(Error::configuration("Connect timeout should be <= timeout"));
        }

        let max_attempts = self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS);
        if !(1..=MAX_ATTEMPTS_LIMIT).contains(&max_attempts) {
            return Err(Error::configuration(format!(
                "Max attempts must be between 1 and {}, got {}",
                MAX_ATTEMPTS_LIMIT, max_attempts
            )));
        }

        if let Some(database) = &self.database {
            database.validate()?;
        }

        Ok(TcuConfig {
            base_url,
            username,
            session_token,
            timeout,
            connect_timeout,
            max_attempts,
            user_agent: self.user_agent.unwrap_or_else(|| USER_AGENT.to_string()),
            validate_tls: self.validate_tls.unwrap_or(true),
            redact_credentials: self.redact_credentials.unwrap_or(true),
            database: self.database,
        })
    }
}

fn required(value: Option<String>, what: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::configuration(format!("{} is required", what))),
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| {
        Error::configuration(format!("Invalid value for {}: {} ({})", name, value, e))
    })
}
