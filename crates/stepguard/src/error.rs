//! Error types for step inspection

use thiserror::Error;

/// How a failure should be treated by the host runner.
///
/// Advisory conditions never become errors; they are only logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// A check found a problem on the page under test.
    Detection,
    /// The checking mechanism itself is broken.
    Infrastructure,
}

#[derive(Error, Debug)]
pub enum GuardError {
    #[error("{0}")]
    SignatureDetected(String),

    #[error("Found {count} script error(s)\n{details}")]
    ScriptErrors { count: usize, details: String },

    #[error("Markup validation failed for {url}:{message}")]
    MarkupInvalid { url: String, message: String },

    #[error("Expected {kind}: {expected}. Actual found {kind}: {actual}.{details}")]
    CountMismatch {
        kind: &'static str,
        expected: usize,
        actual: usize,
        details: String,
    },

    #[error("Could not parse validation output")]
    UnparseableValidation,

    #[error("Script evaluation failed: {0}")]
    ScriptEvaluation(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A caught failure whose log record could not be written
    #[error("{failure}\n(failure log {path} could not be written: {reason})")]
    Unrecorded {
        failure: Box<GuardError>,
        path: String,
        reason: String,
    },

    #[error("No scenario is active")]
    NoActiveScenario,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl GuardError {
    /// Classify this error for the host runner.
    pub fn class(&self) -> FailureClass {
        match self {
            GuardError::SignatureDetected(_)
            | GuardError::ScriptErrors { .. }
            | GuardError::MarkupInvalid { .. }
            | GuardError::CountMismatch { .. } => FailureClass::Detection,
            GuardError::Unrecorded { failure, .. } => failure.class(),
            _ => FailureClass::Infrastructure,
        }
    }

    pub fn is_detection(&self) -> bool {
        self.class() == FailureClass::Detection
    }
}

pub type GuardResult<T> = Result<T, GuardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_and_infrastructure_are_distinguished() {
        assert!(GuardError::SignatureDetected("boom".into()).is_detection());
        assert!(GuardError::ScriptErrors { count: 1, details: String::new() }.is_detection());
        assert_eq!(
            GuardError::UnparseableValidation.class(),
            FailureClass::Infrastructure
        );
        assert_eq!(
            GuardError::ScriptEvaluation("no driver".into()).class(),
            FailureClass::Infrastructure
        );
    }

    #[test]
    fn unrecorded_failure_keeps_class_and_message() {
        let err = GuardError::Unrecorded {
            failure: Box::new(GuardError::SignatureDetected("Division by zero".into())),
            path: "results/a.txt".into(),
            reason: "Is a directory".into(),
        };
        assert!(err.is_detection());
        let message = err.to_string();
        assert!(message.starts_with("Division by zero\n"));
        assert!(message.contains("results/a.txt could not be written: Is a directory"));
    }

    #[test]
    fn unparseable_validation_message() {
        assert_eq!(
            GuardError::UnparseableValidation.to_string(),
            "Could not parse validation output"
        );
    }
}
