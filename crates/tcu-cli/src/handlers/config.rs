//! Configuration command handlers

use crate::cli::{ConfigAction, ConfigArgs, ConfigFormat};
use crate::config::ConfigSummary;
use crate::error::Result;
use crate::output::OutputWriter;
use std::path::Path;
use tcu_core::TcuConfig;

/// Handle the config command
pub async fn handle_config(
    args: ConfigArgs,
    config: &TcuConfig,
    source: Option<&Path>,
    output: &mut OutputWriter,
) -> Result<()> {
    let summary = ConfigSummary::new(config, source);

    match args.action {
        ConfigAction::Show(show) => {
            let rendered = match show.format {
                ConfigFormat::Toml => toml::to_string_pretty(&summary)?,
                ConfigFormat::Json => serde_json::to_string_pretty(&summary)?,
                ConfigFormat::Yaml => serde_yaml::to_string(&summary)?,
            };
            output.raw(&rendered)
        }
        ConfigAction::Validate => {
            match source {
                Some(path) => output.info(&format!("Loaded {}", path.display()))?,
                None => output.info("No configuration file found; using environment only")?,
            }
            output.success("✓ Configuration is valid")
        }
    }
}
