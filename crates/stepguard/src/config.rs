//! Run-scoped configuration
//!
//! Loaded once at run start and passed explicitly into the pipeline and the
//! escalation controller; nothing in the crate reads process-global state
//! after that.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{GuardError, GuardResult};
use crate::session::DebugCookie;

/// Environment variable overriding [`ValidationConfig::error_threshold`].
pub const ERROR_THRESHOLD_ENV: &str = "STEPGUARD_ERROR_THRESHOLD";

/// Environment variable enabling [`EscalationConfig::halt_on_pending`].
pub const DIE_ON_FAILURE_ENV: &str = "STEPGUARD_DIE_ON_FAILURE";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Only pages on this origin are inspected (None = inspect everything)
    pub base_url: Option<String>,

    /// Markup validation settings
    pub validation: ValidationConfig,

    /// Where failure artifacts go
    pub artifacts: ArtifactConfig,

    /// Run escalation settings
    pub escalation: EscalationConfig,

    /// Cookie injected into the session before each scenario
    pub debug_cookie: Option<DebugCookie>,
}

/// Where the validator takes its markup from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationSource {
    /// The session's rendered page content
    #[default]
    Rendered,
    /// A fresh HTTP fetch of the current URL
    Static,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub enabled: bool,

    /// Validator endpoint, must request JSON output
    pub endpoint: String,

    /// Errors and warnings must each stay below this count
    pub error_threshold: usize,

    pub source: ValidationSource,

    /// Skip TLS verification when fetching static source
    pub accept_invalid_certs: bool,

    pub user_agent: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://validator.w3.org/nu/?out=json".to_string(),
            error_threshold: 0,
            source: ValidationSource::Rendered,
            accept_invalid_certs: true,
            user_agent: format!("stepguard/{}", crate::VERSION),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Root of the per-run log tree (`<root>/<tag>/<host>/...`)
    pub results_dir: PathBuf,

    /// Screenshot destination
    pub screenshot_dir: PathBuf,

    /// Maximum length of a sanitized screenshot name
    pub screenshot_name_limit: usize,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("scenario_results"),
            screenshot_dir: std::env::temp_dir(),
            screenshot_name_limit: 100,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Stop the run when a scenario ends with a pending/undefined step
    pub halt_on_pending: bool,
}

impl GuardConfig {
    /// Load configuration from file, falling back to defaults if absent
    pub fn load(path: &Path) -> GuardResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply `STEPGUARD_*` environment overrides
    pub fn with_env_overrides(self) -> GuardResult<Self> {
        let threshold = std::env::var(ERROR_THRESHOLD_ENV).ok();
        let die_on_failure = std::env::var_os(DIE_ON_FAILURE_ENV).is_some();
        self.with_overrides(threshold.as_deref(), die_on_failure)
    }

    fn with_overrides(mut self, threshold: Option<&str>, die_on_failure: bool) -> GuardResult<Self> {
        if let Some(raw) = threshold {
            self.validation.error_threshold = raw.trim().parse().map_err(|_| {
                GuardError::InvalidConfig(format!("{ERROR_THRESHOLD_ENV} must be an integer, got '{raw}'"))
            })?;
        }
        if die_on_failure {
            self.escalation.halt_on_pending = true;
        }
        Ok(self)
    }

    fn validate(&self) -> GuardResult<()> {
        if let Some(base) = &self.base_url {
            reqwest::Url::parse(base).map_err(|e| GuardError::InvalidUrl {
                url: base.clone(),
                reason: e.to_string(),
            })?;
        }
        if self.artifacts.screenshot_name_limit == 0 {
            return Err(GuardError::InvalidConfig(
                "artifacts.screenshot_name_limit must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = GuardConfig::default();
        assert_eq!(config.validation.error_threshold, 0);
        assert_eq!(config.validation.source, ValidationSource::Rendered);
        assert!(!config.escalation.halt_on_pending);
        assert_eq!(config.artifacts.screenshot_name_limit, 100);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = GuardConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert!(config.base_url.is_none());
    }

    #[test]
    fn test_load_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stepguard.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
base_url = "http://shop.test"

[validation]
error_threshold = 3
source = "static"

[debug_cookie]
name = "XDEBUG_SESSION"
value = "PHPSTORM"
"#
        )
        .unwrap();

        let config = GuardConfig::load(&path).unwrap();
        assert_eq!(config.base_url.as_deref(), Some("http://shop.test"));
        assert_eq!(config.validation.error_threshold, 3);
        assert_eq!(config.validation.source, ValidationSource::Static);
        assert!(config.validation.enabled);
        assert_eq!(config.debug_cookie.unwrap().value, "PHPSTORM");
    }

    #[test]
    fn test_load_rejects_bad_base_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stepguard.toml");
        std::fs::write(&path, "base_url = \"not a url\"\n").unwrap();
        assert!(matches!(
            GuardConfig::load(&path),
            Err(GuardError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_overrides() {
        let config = GuardConfig::default().with_overrides(Some(" 2 "), true).unwrap();
        assert_eq!(config.validation.error_threshold, 2);
        assert!(config.escalation.halt_on_pending);

        let err = GuardConfig::default().with_overrides(Some("many"), false);
        assert!(matches!(err, Err(GuardError::InvalidConfig(_))));
    }
}
