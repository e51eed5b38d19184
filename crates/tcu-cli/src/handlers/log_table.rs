//! Call-log table command handlers

use crate::cli::{LogTableAction, LogTableArgs};
use crate::error::{Error, Result};
use crate::output::OutputWriter;
use tcu_core::{RecordId, SqlCallLogger, TcuConfig};

/// Handle the log-table command
pub async fn handle_log_table(args: LogTableArgs, config: &TcuConfig, output: &mut OutputWriter) -> Result<()> {
    let database = config.database().ok_or_else(|| {
        Error::config("no call-log database configured (set `database` in the config file or TCU_DB_DRIVER)")
    })?;
    let logger = SqlCallLogger::connect(database).await?;

    match args.action {
        LogTableAction::Init => {
            logger.ensure_schema().await?;
            output.success(&format!(
                "✓ Table {} is ready ({})",
                logger.table(),
                logger.driver()
            ))
        }
        LogTableAction::Show { id } => match logger.fetch_record(RecordId(id)).await? {
            Some(record) => output.data(&record),
            None => Err(Error::invalid_args(format!(
                "no record {} in {}",
                id,
                logger.table()
            ))),
        },
    }
}
