//! Error types and handling for the CLI

use std::io;
use std::path::PathBuf;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for CLI operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error from tcu-core outside of a call (configuration, connecting)
    #[error("{0}")]
    Core(#[from] tcu_core::Error),

    /// A call to the provider failed
    #[error("{0}")]
    Call(#[from] tcu_core::CallError),

    /// The call-log store failed
    #[error("Call log error: {0}")]
    Logging(#[from] tcu_core::LoggingError),

    /// File not found
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Invalid file format
    #[error("Invalid file format for {}: expected {}", path.display(), expected)]
    InvalidFormat { path: PathBuf, expected: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid argument combination
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML rendering error
    #[error("TOML error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// Error with attached context
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an invalid arguments error
    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::InvalidArgs(message.into())
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io(_) => 1,
            Self::Core(e) => core_exit_code(e),
            Self::Call(e) => core_exit_code(e.error()),
            Self::FileNotFound { .. } => 3,
            Self::InvalidFormat { .. } => 4,
            Self::Config(_) => 5,
            Self::InvalidArgs(_) => 6,
            Self::Logging(_) => 11,
            Self::Json(_) => 12,
            Self::Yaml(_) => 13,
            Self::Toml(_) | Self::TomlSer(_) => 14,
            Self::Other(_) => 99,
        }
    }

    /// Check if this error should display usage help
    pub fn should_show_help(&self) -> bool {
        matches!(self, Self::InvalidArgs(_))
    }
}

fn core_exit_code(error: &tcu_core::Error) -> i32 {
    use tcu_core::Error as Core;
    match error {
        Core::Configuration { .. } => 5,
        Core::Validation(_) => 6,
        Core::Provider { .. } => 7,
        Core::MalformedResponse { .. } | Core::Field(_) => 8,
        Core::Authentication { .. } => 9,
        Core::Network { .. } => 10,
        Core::Cancelled => 130,
        _ => 2,
    }
}

/// Format an error for display to the user
pub fn format_error(error: &Error, use_color: bool) -> String {
    use colored::Colorize;

    let mut message = if use_color {
        format!("{} {}", "Error:".red().bold(), error)
    } else {
        format!("Error: {}", error)
    };

    if let Error::Call(call) = error {
        if let tcu_core::Error::Validation(errors) = call.error() {
            for field in errors.iter() {
                message.push_str(&format!("\n  • {}: {}", field.field, field.message));
            }
        }
        if let Some(id) = call.record_id() {
            message.push_str(&format!("\n  call log record: {}", id));
        }
        for failure in call.logging_failures() {
            let line = format!("call log write failed: {}", failure);
            if use_color {
                message.push_str(&format!("\n  {}", line.yellow()));
            } else {
                message.push_str(&format!("\n  WARNING: {}", line));
            }
        }
    }

    message
}
