//! Failure artifacts: per-scenario log records and screenshots

use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::ArtifactConfig;
use crate::error::GuardResult;
use crate::pipeline::StepOutcome;
use crate::scope::{LogPath, ScenarioContext, StepScope};
use crate::session::Session;

const RECORD_DELIMITER: &str = "\n\n--------------------------------------------\n\n";

/// Writes diagnostics for failed steps
#[derive(Debug, Clone)]
pub struct FailureArtifactRecorder {
    screenshot_dir: PathBuf,
    name_limit: usize,
    /// Last runner argument, folded into screenshot names
    last_arg: String,
}

impl FailureArtifactRecorder {
    pub fn new(config: &ArtifactConfig, last_arg: Option<String>) -> Self {
        Self {
            screenshot_dir: config.screenshot_dir.clone(),
            name_limit: config.screenshot_name_limit,
            last_arg: last_arg.unwrap_or_default(),
        }
    }

    /// Append a record to the scenario log if the step did not pass or a
    /// check raised. Returns whether a record was written.
    pub fn log_failure(
        &self,
        scenario: &ScenarioContext,
        log_path: &LogPath,
        step: &StepScope,
        outcome: &StepOutcome,
        current_url: Option<&str>,
    ) -> GuardResult<bool> {
        if !needs_artifacts(step, outcome) {
            return Ok(false);
        }
        let message = match outcome.reason() {
            Some(reason) => reason,
            None => step
                .message
                .clone()
                .unwrap_or_else(|| format!("step '{}' {}", step.text, step.status)),
        };

        let record = format!(
            "{}recorded_at: {}\n{:#?}\n\n{:?}",
            RECORD_DELIMITER,
            chrono::Utc::now().to_rfc3339(),
            scenario,
            message,
        );
        append(log_path.path(), &record)?;

        info!("Error logged to {}", log_path.path().display());
        if let Some(url) = current_url {
            info!("(URL {})", url);
        }
        Ok(true)
    }

    /// Save a screenshot under the same condition as [`Self::log_failure`].
    ///
    /// Sessions without screenshot support are skipped.
    pub async fn capture_screenshot(
        &self,
        session: &dyn Session,
        step: &StepScope,
        outcome: &StepOutcome,
    ) -> GuardResult<Option<PathBuf>> {
        if !needs_artifacts(step, outcome) {
            return Ok(None);
        }
        if !session.capabilities().screenshots {
            debug!("Session cannot take screenshots, skipping");
            return Ok(None);
        }

        let url = session.current_url().await?.unwrap_or_default();
        let name = self.screenshot_name(&step.text, &url);
        let path = self.screenshot_dir.join(format!("stepguard_{}.png", name));

        let png = session.screenshot().await?;
        std::fs::create_dir_all(&self.screenshot_dir)?;
        std::fs::write(&path, png)?;

        info!("(Error screenshot saved to {})", path.display());
        Ok(Some(path))
    }

    /// `<last arg>:<step text>_<url>` with every non-alphanumeric replaced,
    /// cut to the configured length
    pub fn screenshot_name(&self, step_text: &str, url: &str) -> String {
        format!("{}:{}_{}", self.last_arg, step_text, url)
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .take(self.name_limit)
            .collect()
    }
}

/// Any step the host did not pass, or one a check failed
fn needs_artifacts(step: &StepScope, outcome: &StepOutcome) -> bool {
    !step.status.is_passed() || outcome.is_failed()
}

fn append(path: &Path, record: &str) -> GuardResult<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(record.as_bytes())?;
    Ok(())
}
