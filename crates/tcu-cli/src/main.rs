//! TCU CLI - command-line access to the TCU admissions API
//!
//! Sends raw or typed calls through `tcu-core`, prints the decoded response
//! tree, and manages the optional call-log table.

mod cli;
mod config;
mod error;
mod handlers;
mod logging;
mod output;

use cli::{Cli, Commands};
use colored::control;
use config::ConfigFile;
use error::Result;
use logging::LoggingConfig;
use output::OutputWriter;
use std::process;
use tracing::{info_span, Instrument};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    control::set_override(cli.use_color());

    if let Err(e) = init_logging(&cli) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let span = info_span!("tcu_cli", session_id = %logging::session_id());
    match run(cli).instrument(span).await {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("{}", error::format_error(&e, control::SHOULD_COLORIZE.should_colorize()));

            if e.should_show_help() {
                eprintln!("\nFor more information, try '--help'");
            }

            process::exit(e.exit_code());
        }
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<()> {
    let (file, source) = ConfigFile::load(cli.config.as_deref())?;
    let config = file.resolve()?;
    tracing::info!(
        source = ?source,
        base_url = %config.base_url(),
        call_log = config.database().is_some(),
        "Configuration loaded"
    );

    let mut output = OutputWriter::new(cli.output, cli.use_color(), cli.quiet, cli.verbosity_level());

    match cli.command {
        Commands::Call(args) => handlers::handle_call(args, &config, &mut output).await,
        Commands::CheckStatus(args) => handlers::handle_check_status(args, &config, &mut output).await,
        Commands::LogTable(args) => handlers::handle_log_table(args, &config, &mut output).await,
        Commands::Config(args) => handlers::handle_config(args, &config, source.as_deref(), &mut output).await,
    }
}

/// Initialize the logging system
fn init_logging(cli: &Cli) -> Result<()> {
    let mut logging_config = LoggingConfig::from_verbosity(cli.verbosity_level());
    logging_config.merge_with_env();

    if cli.quiet {
        logging_config.level = "error".to_string();
        logging_config.console = false;
    }

    logging::init_logging(logging_config)
}
