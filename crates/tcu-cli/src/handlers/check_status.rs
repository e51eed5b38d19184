//! Applicant status command handler

use super::connect;
use crate::cli::CheckStatusArgs;
use crate::error::Result;
use crate::output::OutputWriter;
use tcu_core::TcuConfig;

/// Handle the check-status command
pub async fn handle_check_status(args: CheckStatusArgs, config: &TcuConfig, output: &mut OutputWriter) -> Result<()> {
    let client = connect(config, output).await?;
    let index_numbers: Vec<&str> = args.index_numbers.iter().map(String::as_str).collect();

    output.info(&format!("Checking {} applicant(s)", index_numbers.len()))?;
    let check = client.applicants().check_status(&index_numbers).await?;

    let missing: Vec<&str> = index_numbers
        .iter()
        .copied()
        .filter(|index| check.get(index).is_none())
        .collect();
    if !missing.is_empty() {
        output.warning(&format!("No status returned for: {}", missing.join(", ")))?;
    }

    output.data(&check)
}
