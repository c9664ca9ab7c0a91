//! One-shot inspection of a live page

use anyhow::{bail, Context};
use clap::Args;
use serde::Serialize;
use stepguard::{GuardConfig, MarkupValidator, Session, SignatureScanner, StaticSession, ValidationResult};
use tracing::{info, warn};

use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct CheckArgs {
    /// Page to inspect; relative paths resolve against `base_url`
    pub url: String,

    /// Errors and warnings must each stay below this count
    #[arg(long)]
    pub threshold: Option<usize>,

    /// Only run the signature scan
    #[arg(long)]
    pub no_validate: bool,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    url: String,
    signature: Option<String>,
    validation: Option<ValidationResult>,
    markup_failure: Option<String>,
    threshold: usize,
    passed: bool,
}

pub async fn execute(args: CheckArgs, config: GuardConfig, format: OutputFormat) -> anyhow::Result<()> {
    let session = StaticSession::new(config.base_url.as_deref(), &config.validation)?;
    session
        .visit(&args.url)
        .await
        .with_context(|| format!("Failed to fetch {}", args.url))?;
    let url = session
        .current_url()
        .await?
        .context("Session has no URL after visiting")?;

    let Some(html) = session.page_html().await? else {
        warn!("{} did not return HTML, nothing to inspect", url);
        return Ok(());
    };

    let signature = SignatureScanner::new().scan(&html).err().map(|e| e.to_string());

    let threshold = args.threshold.unwrap_or(config.validation.error_threshold);
    let validation = if config.validation.enabled && !args.no_validate {
        let validator = MarkupValidator::from_config(&config.validation)?;
        info!("Validating {} against {}", url, config.validation.endpoint);
        Some(validator.validate_markup(&html).await?)
    } else {
        None
    };
    let markup_failure = validation.as_ref().and_then(|r| r.judge(threshold).err());

    let report = CheckReport {
        passed: signature.is_none() && markup_failure.is_none(),
        url,
        signature,
        validation,
        markup_failure,
        threshold,
    };
    print_report(&report, format);

    if !report.passed {
        bail!("{} failed inspection", report.url);
    }
    Ok(())
}

fn print_report(report: &CheckReport, format: OutputFormat) {
    if let OutputFormat::Json = format {
        output::print_json(report);
        return;
    }

    output::heading(&report.url);
    match &report.signature {
        Some(banner) => output::error(banner.trim()),
        None => output::success("No crash banners"),
    }

    if let Some(result) = &report.validation {
        output::print_list(&output::findings(result), format);
        match &report.markup_failure {
            Some(_) => output::error(&format!(
                "{} error(s), {} warning(s), threshold {}",
                result.errors.len(),
                result.warnings.len(),
                report.threshold
            )),
            None => output::success("Markup within threshold"),
        }
    }
}
