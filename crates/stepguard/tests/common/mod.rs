//! Shared fakes for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use stepguard::{
    Capabilities, GuardConfig, GuardError, GuardResult, MarkupValidator, RunContext,
    ScenarioHooks, Session, StepInspectionPipeline, ValidationBackend,
};

pub const CLEAN_REPLY: &str = r#"{"messages": []}"#;

pub const ONE_ERROR_REPLY: &str = r#"{"messages": [
    {"type": "error", "message": "Element div not allowed as child of element ul", "lastLine": 12, "lastColumn": 8, "extract": "<ul><div>"}
]}"#;

/// Page with the script-error hook installed
pub fn instrumented(body: &str) -> String {
    format!(
        "<html><head><script>window.jsErrors = []; window.onerror = function (m) {{ window.jsErrors.push(m); }};</script></head><body>{body}</body></html>"
    )
}

#[derive(Debug, Clone)]
pub enum Content {
    Html(String),
    /// Element went stale mid-read
    Stale,
    /// Driver returned an error
    Broken,
}

#[derive(Debug)]
pub struct FakeSession {
    pub caps: Capabilities,
    pub url: Mutex<Option<String>>,
    pub content: Mutex<Content>,
    pub script_result: Mutex<Result<Value, String>>,
    pub visits: Mutex<Vec<String>>,
    pub cookies: Mutex<Vec<(String, String)>>,
}

impl FakeSession {
    pub fn browser(url: &str, html: &str) -> Self {
        Self::with_caps(Capabilities::browser(), url, html)
    }

    pub fn static_html(url: &str, html: &str) -> Self {
        Self::with_caps(
            Capabilities {
                script_evaluation: false,
                screenshots: false,
                cookies: true,
            },
            url,
            html,
        )
    }

    fn with_caps(caps: Capabilities, url: &str, html: &str) -> Self {
        Self {
            caps,
            url: Mutex::new(Some(url.to_string())),
            content: Mutex::new(Content::Html(html.to_string())),
            script_result: Mutex::new(Ok(Value::Array(vec![]))),
            visits: Mutex::new(Vec::new()),
            cookies: Mutex::new(Vec::new()),
        }
    }

    pub fn set_content(&self, content: Content) {
        *self.content.lock().unwrap() = content;
    }

    pub fn set_script_result(&self, result: Result<Value, String>) {
        *self.script_result.lock().unwrap() = result;
    }
}

#[async_trait]
impl Session for FakeSession {
    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    async fn current_url(&self) -> GuardResult<Option<String>> {
        Ok(self.url.lock().unwrap().clone())
    }

    async fn page_html(&self) -> GuardResult<Option<String>> {
        match &*self.content.lock().unwrap() {
            Content::Html(html) => Ok(Some(html.clone())),
            Content::Stale => Ok(None),
            Content::Broken => Err(GuardError::Session("driver connection reset".to_string())),
        }
    }

    async fn evaluate_script(&self, _script: &str) -> GuardResult<Value> {
        self.script_result
            .lock()
            .unwrap()
            .clone()
            .map_err(GuardError::ScriptEvaluation)
    }

    async fn screenshot(&self) -> GuardResult<Vec<u8>> {
        Ok(b"\x89PNG fake".to_vec())
    }

    async fn visit(&self, url: &str) -> GuardResult<()> {
        self.visits.lock().unwrap().push(url.to_string());
        *self.url.lock().unwrap() = Some(format!("http://shop.test{url}"));
        Ok(())
    }

    async fn set_cookie(&self, name: &str, value: &str) -> GuardResult<()> {
        self.cookies
            .lock()
            .unwrap()
            .push((name.to_string(), value.to_string()));
        Ok(())
    }
}

/// Validator backend returning a canned reply and counting submissions
#[derive(Debug, Clone)]
pub struct FakeBackend {
    pub reply: String,
    pub calls: Arc<AtomicUsize>,
}

impl FakeBackend {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ValidationBackend for FakeBackend {
    async fn submit(&self, _markup: &str) -> GuardResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

pub fn config(dir: &Path) -> GuardConfig {
    let mut config = GuardConfig {
        base_url: Some("http://shop.test".to_string()),
        ..GuardConfig::default()
    };
    config.artifacts.results_dir = dir.join("results");
    config.artifacts.screenshot_dir = dir.join("screenshots");
    config
}

pub fn run() -> RunContext {
    RunContext::from_args(["runner", "--tags=@smoke", "features/shop.feature"]).with_hostname("ci-host")
}

/// Hooks whose validator uses `backend` with the given threshold
pub fn hooks(config: &GuardConfig, backend: &FakeBackend, threshold: usize) -> ScenarioHooks {
    let validator = MarkupValidator::new(Box::new(backend.clone()), threshold);
    let pipeline = StepInspectionPipeline::with_validator(config, &run(), Some(validator)).unwrap();
    ScenarioHooks::with_pipeline(config, run(), pipeline)
}
