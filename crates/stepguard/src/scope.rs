//! Scenario and step descriptors, run identity and log-path derivation

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::GuardResult;

/// Result reported by the host runner for a step or a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Passed,
    Failed,
    /// The step is undefined or pending implementation
    Pending,
    Skipped,
}

impl ResultStatus {
    pub fn is_passed(&self) -> bool {
        matches!(self, ResultStatus::Passed)
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResultStatus::Passed => "passed",
            ResultStatus::Failed => "failed",
            ResultStatus::Pending => "pending",
            ResultStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Identity of the scenario currently executing.
///
/// Built once at scenario start and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioContext {
    pub source_file: PathBuf,
    pub line: u32,
    pub title: String,
    pub tags: BTreeSet<String>,
}

impl ScenarioContext {
    pub fn new(source_file: impl Into<PathBuf>, line: u32, title: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            line,
            title: title.into(),
            tags: BTreeSet::new(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Tags rendered as a JSON array, e.g. `["checkout","smoke"]`
    pub fn tags_json(&self) -> String {
        serde_json::to_string(&self.tags).unwrap_or_else(|_| "[]".to_string())
    }
}

/// A step as reported by the host runner once it has executed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepScope {
    pub text: String,
    pub line: u32,
    pub status: ResultStatus,
    /// Message of the exception the step itself raised, if any
    pub message: Option<String>,
}

impl StepScope {
    pub fn new(text: impl Into<String>, line: u32, status: ResultStatus) -> Self {
        Self {
            text: text.into(),
            line,
            status,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Values recovered from the runner's invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// Value of `--tags=<filter>`, if given
    pub tag_filter: Option<String>,
    /// Last invocation argument, used to name screenshots
    pub last_arg: Option<String>,
    pub hostname: String,
}

impl RunContext {
    /// Build from the runner's argv (first element is the program name).
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let tag_filter = args
            .iter()
            .find_map(|a| a.find("--tags=").map(|idx| a[idx + "--tags=".len()..].to_string()));
        let last_arg = args.last().cloned();

        Self {
            tag_filter,
            last_arg,
            hostname: local_hostname(),
        }
    }

    /// Tag segment of the results tree
    pub fn tag_segment(&self) -> &str {
        self.tag_filter.as_deref().unwrap_or("no-tag")
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }
}

fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Per-scenario failure log location.
///
/// `<results_dir>/<tag>/<hostname>/_<feature>_failures_<title><tags>.txt`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPath {
    path: PathBuf,
}

impl LogPath {
    /// Derive the log path for a scenario without touching the filesystem
    pub fn derive(results_dir: &Path, scenario: &ScenarioContext, run: &RunContext) -> Self {
        let basename = scenario
            .source_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = format!(
            "_{}_{}{}.txt",
            basename.replace(".feature", "_failures"),
            sanitize_title(&scenario.title),
            scenario.tags_json(),
        );
        let path = results_dir
            .join(run.tag_segment())
            .join(&run.hostname)
            .join(file);
        Self { path }
    }

    /// Create the directory tree and truncate the log file to empty
    pub fn create(&self) -> GuardResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, "")?;
        debug!("Created scenario log {}", self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Replace everything but ASCII letters with `_`
fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_ascii_alphabetic() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run() -> RunContext {
        RunContext::from_args(["behat", "--tags=@smoke", "features/home.feature"]).with_hostname("ci-7")
    }

    #[test]
    fn test_run_context_from_args() {
        let run = run();
        assert_eq!(run.tag_filter.as_deref(), Some("@smoke"));
        assert_eq!(run.last_arg.as_deref(), Some("features/home.feature"));
        assert_eq!(run.tag_segment(), "@smoke");

        let bare = RunContext::from_args(["behat"]);
        assert_eq!(bare.tag_segment(), "no-tag");
    }

    #[test]
    fn test_log_path_derivation() {
        let scenario = ScenarioContext::new("features/home.feature", 12, "Home page loads!")
            .with_tags(["smoke", "home"]);
        let path = LogPath::derive(Path::new("results"), &scenario, &run());
        assert_eq!(
            path.path(),
            Path::new("results/@smoke/ci-7/_home_failures_Home_page_loads_[\"home\",\"smoke\"].txt")
        );
    }

    #[test]
    fn test_log_path_separates_hosts() {
        let scenario = ScenarioContext::new("a.feature", 1, "A");
        let one = LogPath::derive(Path::new("r"), &scenario, &run());
        let two = LogPath::derive(Path::new("r"), &scenario, &run().with_hostname("ci-8"));
        assert_ne!(one, two);
    }

    #[test]
    fn test_create_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let scenario = ScenarioContext::new("a.feature", 1, "A");
        let log = LogPath::derive(dir.path(), &scenario, &run());
        log.create().unwrap();
        std::fs::write(log.path(), "stale").unwrap();
        log.create().unwrap();
        assert_eq!(std::fs::read_to_string(log.path()).unwrap(), "");
    }

    #[test]
    fn test_status_predicates() {
        assert!(ResultStatus::Passed.is_passed());
        assert!(!ResultStatus::Pending.is_passed());
        assert!(!ResultStatus::Skipped.is_passed());
    }
}
