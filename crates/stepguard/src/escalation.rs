//! End-of-scenario escalation and log cleanup

use tracing::{debug, error, info};

use crate::config::{EscalationConfig, DIE_ON_FAILURE_ENV};
use crate::error::GuardResult;
use crate::scope::{LogPath, ResultStatus, ScenarioContext};

/// What the run orchestrator should do after a scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunControl {
    Continue,
    /// Stop scheduling further scenarios
    Halt { reason: String },
}

impl RunControl {
    pub fn is_halt(&self) -> bool {
        matches!(self, RunControl::Halt { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScenarioEscalationController {
    halt_on_pending: bool,
}

impl ScenarioEscalationController {
    pub fn new(config: &EscalationConfig) -> Self {
        Self {
            halt_on_pending: config.halt_on_pending,
        }
    }

    /// Decide whether the run continues, and drop the log of a passed
    /// scenario. Logs of anything else stay on disk.
    pub fn after_scenario(
        &self,
        scenario: &ScenarioContext,
        log_path: &LogPath,
        result: ResultStatus,
    ) -> GuardResult<RunControl> {
        let control = self.escalate(scenario, result);

        if result.is_passed() {
            match std::fs::remove_file(log_path.path()) {
                Ok(()) => debug!("Removed log of passed scenario {}", log_path.path().display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(control)
    }

    fn escalate(&self, scenario: &ScenarioContext, result: ResultStatus) -> RunControl {
        if result != ResultStatus::Pending {
            return RunControl::Continue;
        }

        if self.halt_on_pending {
            let reason = format!(
                "{} is defined, halting the run after '{}' ({}:{})",
                DIE_ON_FAILURE_ENV,
                scenario.title,
                scenario.source_file.display(),
                scenario.line
            );
            error!("{}", reason);
            RunControl::Halt { reason }
        } else {
            info!(
                "To halt the run on failure, please run:\nexport {}=true;",
                DIE_ON_FAILURE_ENV
            );
            RunControl::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::RunContext;

    fn setup(dir: &std::path::Path) -> (ScenarioContext, LogPath) {
        let scenario = ScenarioContext::new("home.feature", 2, "Home page loads");
        let run = RunContext::from_args(["runner"]).with_hostname("h");
        let log = LogPath::derive(dir, &scenario, &run);
        log.create().unwrap();
        (scenario, log)
    }

    #[test]
    fn test_passed_scenario_removes_log() {
        let dir = tempfile::tempdir().unwrap();
        let (scenario, log) = setup(dir.path());
        let control = ScenarioEscalationController::default()
            .after_scenario(&scenario, &log, ResultStatus::Passed)
            .unwrap();
        assert_eq!(control, RunControl::Continue);
        assert!(!log.path().exists());
    }

    #[test]
    fn test_failed_scenario_keeps_log() {
        let dir = tempfile::tempdir().unwrap();
        let (scenario, log) = setup(dir.path());
        ScenarioEscalationController::default()
            .after_scenario(&scenario, &log, ResultStatus::Failed)
            .unwrap();
        assert!(log.path().exists());
    }

    #[test]
    fn test_pending_halts_only_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let (scenario, log) = setup(dir.path());

        let quiet = ScenarioEscalationController::default();
        assert_eq!(
            quiet.after_scenario(&scenario, &log, ResultStatus::Pending).unwrap(),
            RunControl::Continue
        );

        let strict = ScenarioEscalationController::new(&EscalationConfig { halt_on_pending: true });
        let control = strict.after_scenario(&scenario, &log, ResultStatus::Pending).unwrap();
        assert!(control.is_halt());
        assert!(log.path().exists());

        assert_eq!(
            strict.after_scenario(&scenario, &log, ResultStatus::Failed).unwrap(),
            RunControl::Continue
        );
    }

    #[test]
    fn test_missing_log_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (scenario, log) = setup(dir.path());
        std::fs::remove_file(log.path()).unwrap();
        assert!(ScenarioEscalationController::default()
            .after_scenario(&scenario, &log, ResultStatus::Passed)
            .is_ok());
    }
}
