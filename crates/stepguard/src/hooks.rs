//! Lifecycle entry points for the host runner
//!
//! The host calls [`ScenarioHooks::before_scenario`], then
//! [`ScenarioHooks::after_step`] for every step, then
//! [`ScenarioHooks::after_scenario`]. One instance lives for the whole run
//! so the validation cache spans every scenario.

use std::path::PathBuf;
use tracing::debug;

use crate::config::GuardConfig;
use crate::error::{GuardError, GuardResult};
use crate::escalation::{RunControl, ScenarioEscalationController};
use crate::pipeline::StepInspectionPipeline;
use crate::scope::{LogPath, ResultStatus, RunContext, ScenarioContext, StepScope};
use crate::session::{ensure_debug_cookie, DebugCookie, Session};

#[derive(Debug)]
struct ActiveScenario {
    context: ScenarioContext,
    log_path: LogPath,
}

#[derive(Debug)]
pub struct ScenarioHooks {
    results_dir: PathBuf,
    run: RunContext,
    debug_cookie: Option<DebugCookie>,
    pipeline: StepInspectionPipeline,
    controller: ScenarioEscalationController,
    active: Option<ActiveScenario>,
}

impl ScenarioHooks {
    /// Hooks validating against the configured HTTP endpoint
    pub fn new(config: &GuardConfig, run: RunContext) -> GuardResult<Self> {
        let pipeline = StepInspectionPipeline::new(config, &run)?;
        Ok(Self::with_pipeline(config, run, pipeline))
    }

    pub fn with_pipeline(config: &GuardConfig, run: RunContext, pipeline: StepInspectionPipeline) -> Self {
        Self {
            results_dir: config.artifacts.results_dir.clone(),
            run,
            debug_cookie: config.debug_cookie.clone(),
            pipeline,
            controller: ScenarioEscalationController::new(&config.escalation),
            active: None,
        }
    }

    pub fn pipeline(&self) -> &StepInspectionPipeline {
        &self.pipeline
    }

    /// Log path of the running scenario
    pub fn log_path(&self) -> Option<&LogPath> {
        self.active.as_ref().map(|a| &a.log_path)
    }

    /// Derive and truncate the scenario log, then inject the debug cookie
    /// if one is configured.
    pub async fn before_scenario(
        &mut self,
        scenario: ScenarioContext,
        session: Option<&dyn Session>,
    ) -> GuardResult<LogPath> {
        let log_path = LogPath::derive(&self.results_dir, &scenario, &self.run);
        log_path.create()?;
        debug!("Scenario '{}' logging to {}", scenario.title, log_path.path().display());

        self.active = Some(ActiveScenario {
            context: scenario,
            log_path: log_path.clone(),
        });

        if let (Some(cookie), Some(session)) = (&self.debug_cookie, session) {
            ensure_debug_cookie(session, cookie).await?;
        }
        Ok(log_path)
    }

    /// Inspect the step; an Err must fail the step in the host runner
    pub async fn after_step(&mut self, step: &StepScope, session: Option<&dyn Session>) -> GuardResult<()> {
        let active = self.active.as_ref().ok_or(GuardError::NoActiveScenario)?;
        self.pipeline
            .after_step(&active.context, &active.log_path, step, session)
            .await
    }

    pub fn after_scenario(&mut self, result: ResultStatus) -> GuardResult<RunControl> {
        let active = self.active.take().ok_or(GuardError::NoActiveScenario)?;
        self.controller
            .after_scenario(&active.context, &active.log_path, result)
    }
}
