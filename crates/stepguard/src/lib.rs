//! StepGuard - out-of-band failure detection for browser acceptance tests
//!
//! After every executed test step this crate inspects the live browser
//! session for trouble the step's own assertions never look at:
//! - Server-side crash banners embedded in the rendered page
//! - Client-side script errors collected by an in-page `onerror` hook
//! - Markup conformance regressions reported by an external validator
//!
//! Any finding fails the step, leaves a record in a per-scenario log file
//! and (for capable sessions) a screenshot on disk.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ScenarioHooks                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  before_scenario(ctx)   -> LogPath (truncated log file)      │
//! │  after_step(step, sess) -> StepInspectionPipeline            │
//! │    ├── SignatureScanner      (crash banners)                 │
//! │    ├── ScriptErrorCollector  (window.jsErrors)               │
//! │    ├── MarkupValidator       (+ ValidationCache, judge)      │
//! │    └── FailureArtifactRecorder (log record, screenshot)      │
//! │  after_scenario(result) -> ScenarioEscalationController      │
//! │    ├── delete log on pass                                    │
//! │    └── RunControl::Halt on pending steps (opt-in)            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The browser driver, the HTTP transport to the validator and the host
//! test runner are consumed through traits ([`Session`],
//! [`ValidationBackend`]) so every check runs against fakes in tests.

pub mod config;
pub mod error;
pub mod escalation;
pub mod hooks;
pub mod pipeline;
pub mod recorder;
pub mod scope;
pub mod script_errors;
pub mod session;
pub mod signature;
pub mod static_session;
pub mod validation;

pub use config::{ArtifactConfig, EscalationConfig, GuardConfig, ValidationConfig, ValidationSource};
pub use error::{FailureClass, GuardError, GuardResult};
pub use escalation::{RunControl, ScenarioEscalationController};
pub use hooks::ScenarioHooks;
pub use pipeline::{StepInspectionPipeline, StepOutcome};
pub use recorder::FailureArtifactRecorder;
pub use scope::{LogPath, ResultStatus, RunContext, ScenarioContext, StepScope};
pub use session::{Capabilities, DebugCookie, Session};
pub use signature::SignatureScanner;
pub use static_session::StaticSession;
pub use validation::{
    HttpValidationBackend, MarkupValidator, MessageKind, ValidationBackend, ValidationCache,
    ValidationMessage, ValidationResult,
};

/// StepGuard version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
