//! Command handlers for CLI subcommands

mod call;
mod check_status;
mod config;
mod log_table;

pub use call::handle_call;
pub use check_status::handle_check_status;
pub use config::handle_config;
pub use log_table::handle_log_table;

use crate::error::Result;
use crate::output::OutputWriter;
use tcu_core::{TcuClient, TcuConfig};

/// Connect a client, showing a spinner while the call-log pool comes up
async fn connect(config: &TcuConfig, output: &OutputWriter) -> Result<TcuClient> {
    let spinner = output.spinner("Connecting...");
    let client = TcuClient::connect(config.clone()).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    Ok(client?)
}

/// Resolve when the user presses Ctrl-C
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; never cancel
        std::future::pending::<()>().await;
    }
}
