//! Markup validation of a local file

use anyhow::{bail, Context};
use clap::Args;
use std::path::PathBuf;
use stepguard::{GuardConfig, MarkupValidator};

use super::count_arg;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct ValidateArgs {
    /// Markup file to validate
    pub file: PathBuf,

    /// Errors and warnings must each stay below this count
    #[arg(long, conflicts_with_all = ["expect_errors", "expect_warnings"])]
    pub threshold: Option<usize>,

    /// Require exactly this many errors (`no` for none)
    #[arg(long, value_parser = count_arg)]
    pub expect_errors: Option<usize>,

    /// Require exactly this many warnings (`no` for none)
    #[arg(long, value_parser = count_arg)]
    pub expect_warnings: Option<usize>,
}

pub async fn execute(args: ValidateArgs, config: GuardConfig, format: OutputFormat) -> anyhow::Result<()> {
    let markup = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let validator = MarkupValidator::from_config(&config.validation)?;
    let result = validator.validate_markup(&markup).await?;

    match format {
        OutputFormat::Json => output::print_json(&result),
        _ => output::print_list(&output::findings(&result), format),
    }

    if args.expect_errors.is_some() || args.expect_warnings.is_some() {
        if let Some(expected) = args.expect_errors {
            result.expect_errors(expected)?;
        }
        if let Some(expected) = args.expect_warnings {
            result.expect_warnings(expected)?;
        }
        output::success("Finding counts match");
        return Ok(());
    }

    let threshold = args.threshold.unwrap_or(config.validation.error_threshold);
    if let Err(message) = result.judge(threshold) {
        bail!("{} failed validation:{}", args.file.display(), message);
    }
    output::success(&format!("{} is within threshold {}", args.file.display(), threshold));
    Ok(())
}
