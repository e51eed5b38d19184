//! Configuration management for the CLI
//!
//! Settings are layered, later sources winning:
//! - Configuration file (YAML, JSON or TOML)
//! - `TCU_*` environment variables (and a `.env` file)

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tcu_core::{DatabaseConfig, TcuConfig, TcuConfigBuilder};

/// File names looked up in the working directory
const LOCAL_CONFIG_FILES: &[&str] = &["tcu.yaml", "tcu.yml", "tcu.toml", "tcu.json"];

/// Configuration file contents; every field is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Provider base URL
    pub base_url: Option<String>,

    /// Institution account name
    pub username: Option<String>,

    /// Session token issued by the provider
    pub session_token: Option<String>,

    /// Whole-attempt timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Connect timeout in seconds
    pub connect_timeout_secs: Option<u64>,

    /// Attempts per call, first one included
    pub max_attempts: Option<u32>,

    pub user_agent: Option<String>,

    pub validate_tls: Option<bool>,

    /// Mask the session token in logged request bodies
    pub redact_credentials: Option<bool>,

    /// Call-log store
    pub database: Option<DatabaseConfig>,
}

impl ConfigFile {
    /// Load a configuration file, picking the parser from its extension
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        let config = match extension.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "toml" => toml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ => {
                return Err(Error::InvalidFormat {
                    path: path.to_path_buf(),
                    expected: "a .yaml, .yml, .toml or .json file".to_string(),
                })
            }
        };

        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    /// Load the explicit file, or the first default location that exists
    ///
    /// Returns the path actually read, if any.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::from_file(path)?, Some(path.to_path_buf())));
        }

        match default_config_paths().into_iter().find(|p| p.exists()) {
            Some(path) => Ok((Self::from_file(&path)?, Some(path))),
            None => Ok((Self::default(), None)),
        }
    }

    /// Builder seeded from the file's values
    pub fn to_builder(&self) -> TcuConfigBuilder {
        let mut builder = TcuConfigBuilder::new();
        if let Some(url) = &self.base_url {
            builder = builder.base_url(url);
        }
        if let Some(username) = &self.username {
            builder = builder.username(username);
        }
        if let Some(token) = &self.session_token {
            builder = builder.session_token(token);
        }
        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(attempts) = self.max_attempts {
            builder = builder.max_attempts(attempts);
        }
        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent);
        }
        if let Some(validate) = self.validate_tls {
            builder = builder.validate_tls(validate);
        }
        if let Some(redact) = self.redact_credentials {
            builder = builder.redact_credentials(redact);
        }
        if let Some(database) = &self.database {
            builder = builder.database(database.clone());
        }
        builder
    }

    /// Validated client configuration: file values overlaid by the environment
    pub fn resolve(&self) -> Result<TcuConfig> {
        let env = TcuConfigBuilder::from_env()?;
        Ok(self.to_builder().merge(env).build()?)
    }
}

/// Candidate configuration files, in lookup order
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = LOCAL_CONFIG_FILES.iter().map(PathBuf::from).collect();

    if let Some(dir) = dirs::config_dir() {
        let dir = dir.join("tcu");
        paths.extend(["config.yaml", "config.toml", "config.json"].iter().map(|f| dir.join(f)));
    }

    paths
}

/// Printable view of a resolved configuration with secrets masked
#[derive(Debug, Serialize)]
pub struct ConfigSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub base_url: String,
    pub username: String,
    pub session_token: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_attempts: u32,
    pub user_agent: String,
    pub validate_tls: bool,
    pub redact_credentials: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseSummary>,
}

#[derive(Debug, Serialize)]
pub struct DatabaseSummary {
    pub driver: String,
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub database: String,
    pub table: String,
}

impl ConfigSummary {
    pub fn new(config: &TcuConfig, source: Option<&Path>) -> Self {
        Self {
            source: source.map(|p| p.display().to_string()),
            base_url: config.base_url().to_string(),
            username: config.username().to_string(),
            session_token: "***".to_string(),
            timeout_secs: config.timeout().as_secs(),
            connect_timeout_secs: config.connect_timeout().as_secs(),
            max_attempts: config.max_attempts(),
            user_agent: config.user_agent().to_string(),
            validate_tls: config.validate_tls(),
            redact_credentials: config.redact_credentials(),
            database: config.database().map(|db| DatabaseSummary {
                driver: db.driver.to_string(),
                host: db.host.clone(),
                port: db.port,
                database: db.database.clone(),
                table: db.table_name(),
            }),
        }
    }
}
