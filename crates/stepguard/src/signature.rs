//! Crash-banner detection in rendered pages

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::{GuardError, GuardResult};
use crate::session::Session;

/// A known server-side crash marker
struct Signature {
    trigger: &'static str,
    pattern: &'static Lazy<Regex>,
    /// Capture group holding the human-readable detail (0 = whole match)
    group: usize,
    banner: &'static str,
}

static EXCEPTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<h1>EXCEPTION:(.+?)</h1>").unwrap());
static FATAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)Fatal error:.+?on line.*?[0-9]+").unwrap());
static PARSE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)Parse error:.+?on line.*?[0-9]+").unwrap());

static SIGNATURES: [Signature; 3] = [
    Signature {
        trigger: "<h1>EXCEPTION: ",
        pattern: &EXCEPTION_RE,
        group: 1,
        banner: "** Exception Detected **",
    },
    Signature {
        trigger: "Fatal error: ",
        pattern: &FATAL_RE,
        group: 0,
        banner: "## Fatal Error Detected ##",
    },
    Signature {
        trigger: "Parse error: ",
        pattern: &PARSE_RE,
        group: 0,
        banner: "++ Parse error Detected ++",
    },
];

/// Scans rendered output for exception, fatal-error and parse-error banners.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureScanner;

impl SignatureScanner {
    pub fn new() -> Self {
        Self
    }

    /// Every matched signature is reported in one combined message.
    pub fn scan(&self, rendered: &str) -> GuardResult<()> {
        let mut message = String::new();

        for sig in &SIGNATURES {
            if !rendered.contains(sig.trigger) {
                continue;
            }
            let detail = sig
                .pattern
                .captures(rendered)
                .and_then(|caps| caps.get(sig.group))
                .map(|m| m.as_str())
                .unwrap_or(sig.trigger);
            message.push_str(&format!("\n\n  {}\n\n {}\n\n", sig.banner, detail));
        }

        if message.is_empty() {
            Ok(())
        } else {
            Err(GuardError::SignatureDetected(message))
        }
    }

    /// Scan the session's current page.
    ///
    /// Unavailable content passes silently; any other retrieval failure is
    /// logged and also passes.
    pub async fn inspect(&self, session: &dyn Session) -> GuardResult<()> {
        match session.page_html().await {
            Ok(Some(html)) => self.scan(&html),
            Ok(None) => {
                debug!("Page content unavailable, skipping signature scan");
                Ok(())
            }
            Err(e) => {
                warn!("Could not read page for signature scan: {}", e);
                Ok(())
            }
        }
    }
}
