//! Browser session capability
//!
//! The remote browser driver is not part of this crate. Anything that can
//! report its URL and page content implements [`Session`]; richer drivers
//! advertise script evaluation and screenshots through [`Capabilities`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::error::{GuardError, GuardResult};

/// URL a freshly started real browser sits on before its first visit
pub const BLANK_PAGE_URL: &str = "data:,";

/// What a session driver is able to do
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub script_evaluation: bool,
    pub screenshots: bool,
    pub cookies: bool,
}

impl Capabilities {
    /// A full browser driver
    pub fn browser() -> Self {
        Self {
            script_evaluation: true,
            screenshots: true,
            cookies: true,
        }
    }
}

#[async_trait]
pub trait Session: Send + Sync {
    fn capabilities(&self) -> Capabilities;

    /// Current URL, or None before the first navigation
    async fn current_url(&self) -> GuardResult<Option<String>>;

    /// Rendered page markup.
    ///
    /// `Ok(None)` means the content is momentarily unavailable (stale
    /// element, closed dialog, non-HTML response).
    async fn page_html(&self) -> GuardResult<Option<String>>;

    /// Evaluate a script and return its JSON result
    async fn evaluate_script(&self, _script: &str) -> GuardResult<serde_json::Value> {
        Err(GuardError::ScriptEvaluation(
            "session does not support script evaluation".to_string(),
        ))
    }

    /// PNG bytes of the current viewport
    async fn screenshot(&self) -> GuardResult<Vec<u8>> {
        Err(GuardError::Session("session does not support screenshots".to_string()))
    }

    async fn visit(&self, url: &str) -> GuardResult<()>;

    async fn set_cookie(&self, _name: &str, _value: &str) -> GuardResult<()> {
        Err(GuardError::Session("session does not support cookies".to_string()))
    }
}

impl fmt::Debug for dyn Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

/// Cookie that switches on server-side debugging for the site under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugCookie {
    pub name: String,
    pub value: String,
}

impl Default for DebugCookie {
    fn default() -> Self {
        Self {
            name: "XDEBUG_SESSION".to_string(),
            value: "PHPSTORM".to_string(),
        }
    }
}

/// Inject `cookie` into the session.
///
/// A real browser cannot hold cookies while still on its blank start page,
/// so it is sent to `/` first.
pub async fn ensure_debug_cookie(session: &dyn Session, cookie: &DebugCookie) -> GuardResult<()> {
    let caps = session.capabilities();
    if !caps.cookies {
        debug!("Session cannot hold cookies, skipping {}", cookie.name);
        return Ok(());
    }

    if caps.script_evaluation
        && session.current_url().await?.as_deref() == Some(BLANK_PAGE_URL)
    {
        session.visit("/").await?;
    }

    session.set_cookie(&cookie.name, &cookie.value).await?;
    info!("Set debug cookie {}={}", cookie.name, cookie.value);
    Ok(())
}
