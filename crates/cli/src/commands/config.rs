//! Configuration loading and display

use anyhow::Context;
use std::path::Path;
use stepguard::GuardConfig;

use crate::output::{self, OutputFormat};

/// Load the config file (defaults if absent) and apply environment overrides
pub fn load(path: &Path) -> anyhow::Result<GuardConfig> {
    let config = GuardConfig::load(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    Ok(config.with_env_overrides()?)
}

pub fn execute(config: &GuardConfig, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => output::print_json(config),
        OutputFormat::Table | OutputFormat::Plain => {
            print!("{}", toml::to_string_pretty(config).context("Failed to render configuration")?);
        }
    }
    Ok(())
}
