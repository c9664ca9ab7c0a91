//! Markup validation against an external conformance service
//!
//! Markup is whitespace-compressed, POSTed to the validator, and the JSON
//! reply is split into errors and warnings. Each (host, path) is validated
//! at most once per run, whatever the outcome.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};

use crate::config::ValidationConfig;
use crate::error::{GuardError, GuardResult};

const DETAIL_SEPARATOR: &str = "\n---------------------------------------------------------\n";

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Which list a retained message belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Error,
    Warning,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Error => "error",
            MessageKind::Warning => "warning",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validator message retained as an error or warning
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationMessage {
    pub kind: MessageKind,
    pub text: String,
    pub line: Option<u64>,
    pub column: Option<u64>,
    pub extract: String,
}

impl fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = self.line.map(|l| l.to_string()).unwrap_or_default();
        let column = self.column.map(|c| c.to_string()).unwrap_or_default();
        write!(
            f,
            "\ntype: {}\nmessage: {}\nline: {}\ncolumn: {}\nextract: {}\n",
            self.kind, self.text, line, column, self.extract
        )
    }
}

/// Errors and warnings from one validation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub warnings: Vec<ValidationMessage>,
    pub errors: Vec<ValidationMessage>,
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(default)]
    messages: Vec<RawMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessage {
    #[serde(rename = "type", default)]
    kind: String,
    sub_type: Option<String>,
    #[serde(default)]
    message: String,
    last_line: Option<u64>,
    last_column: Option<u64>,
    #[serde(default)]
    extract: String,
}

impl ValidationMessage {
    fn from_raw(kind: MessageKind, raw: RawMessage) -> Self {
        Self {
            kind,
            text: raw.message,
            line: raw.last_line,
            column: raw.last_column,
            extract: raw.extract,
        }
    }
}

impl ValidationResult {
    /// Parse the validator's JSON reply.
    ///
    /// Anything that is not a JSON object is an infrastructure failure.
    pub fn parse(body: &str) -> GuardResult<Self> {
        let value: serde_json::Value =
            serde_json::from_str(body).map_err(|_| GuardError::UnparseableValidation)?;
        if !value.is_object() {
            return Err(GuardError::UnparseableValidation);
        }
        let raw: RawResponse =
            serde_json::from_value(value).map_err(|_| GuardError::UnparseableValidation)?;

        let mut result = Self::default();
        for message in raw.messages {
            match message.kind.as_str() {
                "error" => result
                    .errors
                    .push(ValidationMessage::from_raw(MessageKind::Error, message)),
                "info" if message.sub_type.as_deref() == Some("warning") => result
                    .warnings
                    .push(ValidationMessage::from_raw(MessageKind::Warning, message)),
                _ => {}
            }
        }
        Ok(result)
    }

    /// Pass iff errors and warnings each stay strictly below `threshold`.
    ///
    /// An empty list always passes, so a threshold of 0 tolerates nothing.
    /// Both lists are always reported.
    pub fn judge(&self, threshold: usize) -> Result<(), String> {
        let mut msg = String::new();

        if let Some(detail) = over_threshold("errors", &self.errors, threshold) {
            msg.push_str("\n\nErrors:\n\n");
            msg.push_str(&detail);
        }
        if let Some(detail) = over_threshold("warnings", &self.warnings, threshold) {
            msg.push_str("\n\nWarnings:\n\n");
            msg.push_str(&detail);
        }

        if msg.is_empty() {
            Ok(())
        } else {
            Err(msg)
        }
    }

    /// Exact-count assertion on errors
    pub fn expect_errors(&self, expected: usize) -> GuardResult<()> {
        expect_count("errors", &self.errors, expected)
    }

    /// Exact-count assertion on warnings
    pub fn expect_warnings(&self, expected: usize) -> GuardResult<()> {
        expect_count("warnings", &self.warnings, expected)
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

fn over_threshold(kind: &str, messages: &[ValidationMessage], threshold: usize) -> Option<String> {
    let actual = messages.len();
    if actual == 0 || actual < threshold {
        return None;
    }
    Some(format!(
        "Expected {kind} below: {threshold}. Actual found {kind}: {actual}. Detailed list of {kind}: \n{}",
        join_details(messages)
    ))
}

fn expect_count(kind: &'static str, messages: &[ValidationMessage], expected: usize) -> GuardResult<()> {
    let actual = messages.len();
    if actual == expected {
        return Ok(());
    }
    let details = if actual > 0 {
        format!(" Detailed list of {kind}: \n{}", join_details(messages))
    } else {
        String::new()
    };
    Err(GuardError::CountMismatch {
        kind,
        expected,
        actual,
        details,
    })
}

fn join_details(messages: &[ValidationMessage]) -> String {
    messages
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(DETAIL_SEPARATOR)
}

/// Parse a count written in a step, accepting `"no"` for zero
pub fn parse_count(s: &str) -> usize {
    match s.trim() {
        "no" => 0,
        other => other
            .chars()
            .take_while(char::is_ascii_digit)
            .collect::<String>()
            .parse()
            .unwrap_or(0),
    }
}

/// Collapse every whitespace run, line breaks and tabs included, to one space
pub fn compress_markup(markup: &str) -> String {
    WHITESPACE_RE.replace_all(markup, " ").into_owned()
}

/// Transport to the validation service
#[async_trait]
pub trait ValidationBackend: Send + Sync {
    /// Submit markup and return the raw response body
    async fn submit(&self, markup: &str) -> GuardResult<String>;
}

/// Validator reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpValidationBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpValidationBackend {
    pub fn new(config: &ValidationConfig) -> GuardResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl ValidationBackend for HttpValidationBackend {
    async fn submit(&self, markup: &str) -> GuardResult<String> {
        debug!("Submitting {} bytes to {}", markup.len(), self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/html; charset=utf-8")
            .body(markup.to_string())
            .send()
            .await?;
        Ok(response.text().await?)
    }
}

/// Set of (host, path) keys already validated this run
#[derive(Debug, Clone, Default)]
pub struct ValidationCache {
    checked: HashSet<String>,
}

impl ValidationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key for a URL; None when the URL has no host
    pub fn key_for(url: &str) -> Option<String> {
        let parsed = reqwest::Url::parse(url).ok()?;
        let host = parsed.host_str()?;
        Some(format!("{}{}", host, parsed.path()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.checked.contains(key)
    }

    /// Returns false if the key was already present
    pub fn mark_checked(&mut self, key: String) -> bool {
        self.checked.insert(key)
    }

    pub fn len(&self) -> usize {
        self.checked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checked.is_empty()
    }
}

/// Validates markup once per URL and judges it against the threshold
pub struct MarkupValidator {
    backend: Box<dyn ValidationBackend>,
    cache: ValidationCache,
    threshold: usize,
}

impl fmt::Debug for MarkupValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkupValidator")
            .field("cache", &self.cache)
            .field("threshold", &self.threshold)
            .finish()
    }
}

impl MarkupValidator {
    pub fn new(backend: Box<dyn ValidationBackend>, threshold: usize) -> Self {
        Self {
            backend,
            cache: ValidationCache::new(),
            threshold,
        }
    }

    /// Build a validator talking to the configured HTTP endpoint
    pub fn from_config(config: &ValidationConfig) -> GuardResult<Self> {
        let backend = HttpValidationBackend::new(config)?;
        Ok(Self::new(Box::new(backend), config.error_threshold))
    }

    pub fn cache(&self) -> &ValidationCache {
        &self.cache
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// False when the URL has no host or was already checked this run
    pub fn needs_validation(&self, url: &str) -> bool {
        ValidationCache::key_for(url).is_some_and(|key| !self.cache.contains(&key))
    }

    /// Record a URL as checked without validating it
    pub fn mark_checked(&mut self, url: &str) {
        if let Some(key) = ValidationCache::key_for(url) {
            self.cache.mark_checked(key);
        }
    }

    /// Validate markup without consulting the cache
    pub async fn validate_markup(&self, markup: &str) -> GuardResult<ValidationResult> {
        let compressed = compress_markup(markup);
        let body = self.backend.submit(&compressed).await?;
        ValidationResult::parse(&body)
    }

    /// Validate `markup` served at `url`.
    ///
    /// Returns Ok(None) when the URL was already checked this run (or has no
    /// host). The key is recorded whether or not validation succeeds.
    pub async fn validate(&mut self, url: &str, markup: &str) -> GuardResult<Option<ValidationResult>> {
        let Some(key) = ValidationCache::key_for(url) else {
            debug!("No host in {}, skipping validation", url);
            return Ok(None);
        };
        if self.cache.contains(&key) {
            debug!("Already validated {}", key);
            return Ok(None);
        }

        let result = self.validate_markup(markup).await;
        self.cache.mark_checked(key.clone());

        match &result {
            Ok(r) if r.is_clean() => info!("Valid markup for URL: {}", key),
            Ok(r) => info!(
                "Markup for URL {}: {} error(s), {} warning(s)",
                key,
                r.errors.len(),
                r.warnings.len()
            ),
            Err(e) => warn!("Exception when validating URL {}: {}", key, e),
        }
        result.map(Some)
    }

    /// Judge a result against this validator's threshold
    pub fn judge(&self, url: &str, result: &ValidationResult) -> GuardResult<()> {
        result
            .judge(self.threshold)
            .map_err(|message| GuardError::MarkupInvalid {
                url: url.to_string(),
                message,
            })
    }

    /// Validate then judge; already-checked URLs pass
    pub async fn check(&mut self, url: &str, markup: &str) -> GuardResult<()> {
        match self.validate(url, markup).await? {
            Some(result) => self.judge(url, &result),
            None => Ok(()),
        }
    }
}
