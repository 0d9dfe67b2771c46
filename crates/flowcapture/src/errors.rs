//! Error types for plan compilation and execution

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for flowcapture operations
pub type Result<T> = std::result::Result<T, FlowError>;

/// Errors that stop a planning or execution stage.
///
/// Step-level problems during a run are never raised through this type; they
/// are folded into [`crate::interpreter::StepOutcome`] so the run continues.
#[derive(Debug, Error)]
pub enum FlowError {
    /// The plan file is absent at interpretation time. Fatal for the run.
    #[error("plan file not found: {0}")]
    PlanMissing(PathBuf),

    /// The plan file exists but is not a sequence of step records
    #[error("plan file {path} is malformed: {reason}")]
    PlanInvalid { path: PathBuf, reason: String },

    /// An action plan must contain at least one step
    #[error("action plan must contain at least one step")]
    EmptyPlan,

    /// No known app was recognised and the configured policy is to abort
    #[error("no known application found in prompt {0:?}")]
    UnresolvedApp(String),

    /// Configuration file could not be understood
    #[error("configuration error: {0}")]
    Config(String),

    /// Error from the browser session backend
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by a [`crate::session::BrowserSession`] implementation
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("timed out after {timeout:?} waiting for {what}")]
    Timeout { what: String, timeout: Duration },

    #[error("browser protocol error: {0}")]
    Protocol(String),

    #[error("browser connection error: {0}")]
    Connection(String),

    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("page script failed: {0}")]
    Script(String),

    #[error("no element matched {0}")]
    NotFound(String),
}

impl SessionError {
    pub fn timeout(what: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            timeout,
        }
    }
}
