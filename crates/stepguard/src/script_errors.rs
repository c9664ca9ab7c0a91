//! Client-side script error collection
//!
//! Pages under test are expected to install a global `onerror` hook that
//! accumulates messages in `window.jsErrors`. Without it detection cannot
//! work, which is reported as an advisory, never as a failure.

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::{GuardError, GuardResult};
use crate::session::Session;

/// Marker whose presence in the page shows the hook is installed
pub const INSTRUMENTATION_MARKER: &str = "window.jsErrors";

/// Expression returning the accumulated errors
pub const COLLECT_SCRIPT: &str = "return window.jsErrors";

/// Snippet the page must include for detection to work
pub const INSTRUMENTATION_SNIPPET: &str = r#"<script>
    window.jsErrors = [];
    window.onerror = function (errorMessage) {
        window.jsErrors[window.jsErrors.length] = errorMessage;
    };
</script>"#;

#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptErrorCollector;

impl ScriptErrorCollector {
    pub fn new() -> Self {
        Self
    }

    /// Read the accumulated errors from the session.
    ///
    /// Returns an empty list for sessions without script evaluation, for
    /// pages without the instrumentation or with unavailable content, and
    /// before the first navigation.
    /// A failing evaluation is propagated.
    pub async fn collect(&self, session: &dyn Session) -> GuardResult<Vec<String>> {
        if !session.capabilities().script_evaluation {
            return Ok(Vec::new());
        }
        if session.current_url().await?.is_none() {
            return Ok(Vec::new());
        }

        match page_hook(session.page_html().await?.as_deref()) {
            PageHook::Unavailable => {
                debug!("Page content unavailable, skipping script error collection");
                return Ok(Vec::new());
            }
            PageHook::Missing => {
                warn!(
                    "Script error detection won't work without this in place:\n\n{}\n",
                    INSTRUMENTATION_SNIPPET
                );
                return Ok(Vec::new());
            }
            PageHook::Installed => {}
        }

        let value = session.evaluate_script(COLLECT_SCRIPT).await?;
        Ok(errors_from_value(value))
    }

    /// Collect and turn any errors into a detection failure.
    ///
    /// `location` identifies the step (`<file>:<line>`) in the log output.
    pub async fn check(&self, session: &dyn Session, location: &str) -> GuardResult<()> {
        let errors = self.collect(session).await?;
        if errors.is_empty() {
            return Ok(());
        }

        let details = errors
            .iter()
            .enumerate()
            .map(|(index, text)| format!("   #{}: {}", index, text))
            .collect::<Vec<_>>()
            .join("\n");
        let err = GuardError::ScriptErrors {
            count: errors.len(),
            details,
        };
        error!("{}\n{}", location, err);
        Err(err)
    }
}

/// Whether the rendered page carries the error hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageHook {
    /// Content could not be read right now
    Unavailable,
    Missing,
    Installed,
}

fn page_hook(html: Option<&str>) -> PageHook {
    match html {
        None => PageHook::Unavailable,
        Some(html) if html.contains(INSTRUMENTATION_MARKER) => PageHook::Installed,
        Some(_) => PageHook::Missing,
    }
}

fn errors_from_value(value: Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Value::String(s) => vec![s],
        other => vec![other.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_errors_from_value() {
        assert!(errors_from_value(Value::Null).is_empty());
        assert!(errors_from_value(json!([])).is_empty());
        assert_eq!(
            errors_from_value(json!(["Uncaught TypeError: x is undefined", 42])),
            vec!["Uncaught TypeError: x is undefined".to_string(), "42".to_string()]
        );
    }

    #[test]
    fn test_page_hook() {
        assert_eq!(page_hook(None), PageHook::Unavailable);
        assert_eq!(page_hook(Some("")), PageHook::Missing);
        assert_eq!(page_hook(Some("<p>plain</p>")), PageHook::Missing);
        assert_eq!(page_hook(Some(INSTRUMENTATION_SNIPPET)), PageHook::Installed);
    }

    #[test]
    fn test_snippet_contains_marker() {
        assert!(INSTRUMENTATION_SNIPPET.contains(INSTRUMENTATION_MARKER));
    }
}
