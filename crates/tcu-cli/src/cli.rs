//! Command-line interface argument parsing and definitions
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand, ValueEnum};
use is_terminal::IsTerminal;
use std::path::PathBuf;

/// TCU CLI - talk to the TCU undergraduate admissions API
///
/// Sends XML calls on behalf of an institution account, prints the decoded
/// response tree, and manages the optional call-log table.
#[derive(Parser, Debug)]
#[command(
    name = "tcu",
    version,
    author,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Enable verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "TCU_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(short, long, value_enum, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a call to any endpoint and print the decoded response
    Call(CallArgs),

    /// Check the admission status of one or more applicants
    CheckStatus(CheckStatusArgs),

    /// Manage the call-log table
    LogTable(LogTableArgs),

    /// Inspect the effective configuration
    Config(ConfigArgs),
}

/// Arguments for the call command
#[derive(Parser, Debug)]
pub struct CallArgs {
    /// Endpoint path relative to the base URL (e.g. /applicants/checkStatus)
    #[arg(value_name = "PATH")]
    pub path: String,

    /// Request field; repeat a key to send it several times
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    /// HTTP method
    #[arg(short, long, value_enum, default_value = "post")]
    pub method: HttpMethod,

    /// JSON or YAML file holding an array of parameter blocks
    #[arg(long, value_name = "FILE", conflicts_with = "params")]
    pub batch: Option<PathBuf>,
}

/// Arguments for the check-status command
#[derive(Parser, Debug)]
pub struct CheckStatusArgs {
    /// Form four index numbers
    #[arg(value_name = "F4INDEXNO", required = true)]
    pub index_numbers: Vec<String>,
}

/// Arguments for the log-table command
#[derive(Parser, Debug)]
pub struct LogTableArgs {
    #[command(subcommand)]
    pub action: LogTableAction,
}

/// Call-log table actions
#[derive(Subcommand, Debug)]
pub enum LogTableAction {
    /// Create the log table if it does not exist
    Init,

    /// Show one logged call
    Show {
        /// Record id returned by a previous call
        id: i64,
    },
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration with secrets masked
    Show(ConfigShowArgs),

    /// Validate the effective configuration
    Validate,
}

/// Arguments for config show
#[derive(Parser, Debug)]
pub struct ConfigShowArgs {
    /// Show configuration in specified format
    #[arg(short, long, value_enum, default_value = "toml")]
    pub format: ConfigFormat,
}

/// Configuration file formats
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    /// TOML format
    Toml,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

/// Output format options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted output
    Human,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Pretty-printed JSON output
    JsonPretty,
}

/// HTTP methods accepted by the provider
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl From<HttpMethod> for tcu_core::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => tcu_core::Method::GET,
            HttpMethod::Post => tcu_core::Method::POST,
            HttpMethod::Put => tcu_core::Method::PUT,
        }
    }
}

/// Split `key=value`; the value may itself contain `=`
fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("missing key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective verbosity level (considering quiet flag)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Check if colored output should be used
    pub fn use_color(&self) -> bool {
        !self.no_color && std::io::stdout().is_terminal()
    }
}
