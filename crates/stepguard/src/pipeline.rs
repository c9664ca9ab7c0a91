//! Post-step inspection pipeline
//!
//! Runs the signature scan, script-error collection and markup validation
//! in that order, stops at the first check that raises, records artifacts
//! whatever happened, and hands the caught failure back so the host runner
//! marks the step failed. A step the host already failed is never turned
//! into a pass.

use tracing::{debug, error, warn};

use crate::config::{GuardConfig, ValidationSource};
use crate::error::{GuardError, GuardResult};
use crate::recorder::FailureArtifactRecorder;
use crate::scope::{LogPath, RunContext, ScenarioContext, StepScope};
use crate::script_errors::ScriptErrorCollector;
use crate::session::Session;
use crate::signature::SignatureScanner;
use crate::static_session::{fetch_static, static_client};
use crate::validation::MarkupValidator;

/// Verdict of the inspection checks for one step
#[derive(Debug)]
pub enum StepOutcome {
    Ok,
    Failed(GuardError),
}

impl StepOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, StepOutcome::Failed(_))
    }

    pub fn reason(&self) -> Option<String> {
        match self {
            StepOutcome::Ok => None,
            StepOutcome::Failed(e) => Some(e.to_string()),
        }
    }

    /// Attach a log-write error to a caught failure so the report survives
    /// in the re-raised message. A clean outcome stays clean.
    pub fn unrecorded(self, log_path: &LogPath, err: &GuardError) -> Self {
        match self {
            StepOutcome::Ok => StepOutcome::Ok,
            StepOutcome::Failed(failure) => StepOutcome::Failed(GuardError::Unrecorded {
                failure: Box::new(failure),
                path: log_path.path().display().to_string(),
                reason: err.to_string(),
            }),
        }
    }

    /// Re-raise the caught failure, if any
    pub fn into_result(self) -> GuardResult<()> {
        match self {
            StepOutcome::Ok => Ok(()),
            StepOutcome::Failed(e) => Err(e),
        }
    }
}

impl From<GuardResult<()>> for StepOutcome {
    fn from(result: GuardResult<()>) -> Self {
        match result {
            Ok(()) => StepOutcome::Ok,
            Err(e) => StepOutcome::Failed(e),
        }
    }
}

/// Owns the checks and the run-wide validation cache
#[derive(Debug)]
pub struct StepInspectionPipeline {
    scanner: SignatureScanner,
    collector: ScriptErrorCollector,
    validator: Option<MarkupValidator>,
    recorder: FailureArtifactRecorder,
    base_origin: Option<reqwest::Url>,
    source: ValidationSource,
    static_client: reqwest::Client,
}

impl StepInspectionPipeline {
    /// Build a pipeline validating against the configured HTTP endpoint
    pub fn new(config: &GuardConfig, run: &RunContext) -> GuardResult<Self> {
        let validator = if config.validation.enabled {
            Some(MarkupValidator::from_config(&config.validation)?)
        } else {
            None
        };
        Self::with_validator(config, run, validator)
    }

    /// Build a pipeline around an existing validator (None disables markup checks)
    pub fn with_validator(
        config: &GuardConfig,
        run: &RunContext,
        validator: Option<MarkupValidator>,
    ) -> GuardResult<Self> {
        let base_origin = match &config.base_url {
            Some(base) => Some(reqwest::Url::parse(base).map_err(|e| GuardError::InvalidUrl {
                url: base.clone(),
                reason: e.to_string(),
            })?),
            None => None,
        };

        Ok(Self {
            scanner: SignatureScanner::new(),
            collector: ScriptErrorCollector::new(),
            validator,
            recorder: FailureArtifactRecorder::new(&config.artifacts, run.last_arg.clone()),
            base_origin,
            source: config.validation.source,
            static_client: static_client(&config.validation)?,
        })
    }

    pub fn validator(&self) -> Option<&MarkupValidator> {
        self.validator.as_ref()
    }

    /// Whether `url` is on the configured origin
    pub fn in_scope(&self, url: Option<&str>) -> bool {
        let (Some(base), Some(url)) = (&self.base_origin, url) else {
            return true;
        };
        match reqwest::Url::parse(url) {
            Ok(parsed) => parsed.origin() == base.origin(),
            Err(_) => false,
        }
    }

    /// Run the checks in order; the first raising check wins.
    pub async fn inspect(
        &mut self,
        session: &dyn Session,
        scenario: &ScenarioContext,
        step: &StepScope,
    ) -> StepOutcome {
        if let Err(e) = self.scanner.inspect(session).await {
            return StepOutcome::Failed(e);
        }

        let location = format!("{}:{}", scenario.source_file.display(), step.line);
        if let Err(e) = self.collector.check(session, &location).await {
            return StepOutcome::Failed(e);
        }

        self.check_markup(session).await.into()
    }

    async fn check_markup(&mut self, session: &dyn Session) -> GuardResult<()> {
        let Some(validator) = self.validator.as_mut() else {
            return Ok(());
        };
        let Some(url) = session.current_url().await? else {
            return Ok(());
        };
        if !validator.needs_validation(&url) {
            return Ok(());
        }

        let markup = match self.source {
            ValidationSource::Rendered => session.page_html().await?,
            ValidationSource::Static => match fetch_static(&self.static_client, &url).await {
                Ok(body) => Some(body),
                Err(e) => {
                    validator.mark_checked(&url);
                    return Err(e);
                }
            },
        };
        let Some(markup) = markup else {
            debug!("No markup available for {}, validation deferred", url);
            return Ok(());
        };

        validator.check(&url, &markup).await
    }

    /// Inspect, record, then re-raise.
    ///
    /// Inspection is skipped without a session or off the base origin;
    /// recording still runs for steps the host failed.
    pub async fn after_step(
        &mut self,
        scenario: &ScenarioContext,
        log_path: &LogPath,
        step: &StepScope,
        session: Option<&dyn Session>,
    ) -> GuardResult<()> {
        let mut current_url = None;
        let outcome = match session {
            Some(session) => match session.current_url().await {
                Ok(url) if self.in_scope(url.as_deref()) => {
                    current_url = url;
                    self.inspect(session, scenario, step).await
                }
                Ok(url) => {
                    debug!("Skipping inspection of off-origin page {:?}", url);
                    current_url = url;
                    StepOutcome::Ok
                }
                Err(e) => {
                    warn!("Session unavailable, skipping inspection: {}", e);
                    StepOutcome::Ok
                }
            },
            None => StepOutcome::Ok,
        };

        let outcome = match self
            .recorder
            .log_failure(scenario, log_path, step, &outcome, current_url.as_deref())
        {
            Ok(_) => outcome,
            Err(e) => {
                error!("Could not write failure log {}: {}", log_path.path().display(), e);
                outcome.unrecorded(log_path, &e)
            }
        };

        if let Some(session) = session {
            if let Err(e) = self.recorder.capture_screenshot(session, step, &outcome).await {
                warn!("Could not capture screenshot: {}", e);
            }
        }

        outcome.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline(base_url: Option<&str>) -> StepInspectionPipeline {
        let config = GuardConfig {
            base_url: base_url.map(String::from),
            ..GuardConfig::default()
        };
        let run = RunContext::from_args(["runner"]);
        StepInspectionPipeline::with_validator(&config, &run, None).unwrap()
    }

    #[test]
    fn test_origin_guard() {
        let p = pipeline(Some("http://shop.test"));
        assert!(p.in_scope(Some("http://shop.test/cart")));
        assert!(p.in_scope(None));
        assert!(!p.in_scope(Some("https://shop.test/cart")));
        assert!(!p.in_scope(Some("http://payments.example/checkout")));
        assert!(!p.in_scope(Some("data:,")));
    }

    #[test]
    fn test_no_base_url_inspects_everything() {
        let p = pipeline(None);
        assert!(p.in_scope(Some("http://anything.example/")));
    }

    #[test]
    fn test_outcome_conversion() {
        assert!(!StepOutcome::from(Ok(())).is_failed());
        let failed = StepOutcome::from(Err(GuardError::UnparseableValidation));
        assert_eq!(failed.reason().as_deref(), Some("Could not parse validation output"));
        assert!(failed.into_result().is_err());
    }
}
