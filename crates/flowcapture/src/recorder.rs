//! Per-step state capture
//!
//! After every step, successful or not, the recorder saves a full-page
//! screenshot to `states/NN_<action>.png`, reads the page URL and hashes the
//! body markup. Each capture is best-effort: a failure nulls that field and
//! the run goes on. The collected log is written once as `states.json`.

use crate::errors::Result;
use crate::interpreter::StepOutcome;
use crate::plan::PlanEntry;
use crate::session::{BrowserSession, SessionResult};
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const STATES_DIR: &str = "states";
pub const STATE_LOG_FILE: &str = "states.json";

/// Snapshot taken after one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// 1-based position in the plan
    pub index: usize,
    pub action: String,
    pub state_label: Option<String>,
    /// The plan record as executed
    pub step: serde_json::Value,
    pub resolved_url: Option<String>,
    /// BLAKE3 hex digest of the body markup
    pub content_fingerprint: Option<String>,
    /// Screenshot file name inside `states/`
    pub screenshot: Option<String>,
    pub outcome: StepOutcome,
}

impl StepResult {
    /// Name of the strategy that found the element, if any
    pub fn strategy(&self) -> Option<&str> {
        match &self.outcome {
            StepOutcome::Applied { strategy } => Some(strategy),
            _ => None,
        }
    }
}

/// Screenshot file name for a step
pub fn screenshot_name(index: usize, action: &str) -> String {
    let clean: String = action
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{index:02}_{clean}.png")
}

pub fn fingerprint(markup: &str) -> String {
    blake3::hash(markup.as_bytes()).to_hex().to_string()
}

/// Run one capture call. Errors and panics both come back as `None`.
async fn guarded<T>(
    what: &str,
    index: usize,
    call: impl Future<Output = SessionResult<T>>,
) -> Option<T> {
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            warn!("[recorder] {what} failed for step {index}: {e}");
            None
        }
        Err(_) => {
            warn!("[recorder] {what} panicked for step {index}");
            None
        }
    }
}

/// Append-only state log for one run
pub struct StateRecorder {
    states_dir: PathBuf,
    results: Vec<StepResult>,
}

impl StateRecorder {
    /// Create `<run_dir>/states/`
    pub fn new(run_dir: &Path) -> Result<Self> {
        let states_dir = run_dir.join(STATES_DIR);
        std::fs::create_dir_all(&states_dir)?;
        Ok(Self {
            states_dir,
            results: Vec::new(),
        })
    }

    /// Snapshot the session after step `index` and append the result
    pub async fn capture(
        &mut self,
        session: &dyn BrowserSession,
        index: usize,
        entry: &PlanEntry,
        outcome: StepOutcome,
    ) -> &StepResult {
        let action = entry.action_tag().to_string();
        let name = screenshot_name(index, &action);

        let screenshot = match guarded("screenshot", index, session.screenshot()).await {
            Some(png) => match tokio::fs::write(self.states_dir.join(&name), &png).await {
                Ok(()) => {
                    debug!("[recorder] Saved {name} ({} bytes)", png.len());
                    Some(name)
                }
                Err(e) => {
                    warn!("[recorder] Failed to write {name}: {e}");
                    None
                }
            },
            None => None,
        };
        let resolved_url = guarded("URL read", index, session.current_url()).await;
        let content_fingerprint = guarded("body read", index, session.body_html())
            .await
            .map(|html| fingerprint(&html));

        self.results.push(StepResult {
            index,
            action,
            state_label: entry.state_label().map(str::to_string),
            step: entry.record(),
            resolved_url,
            content_fingerprint,
            screenshot,
            outcome,
        });
        &self.results[self.results.len() - 1]
    }

    pub fn results(&self) -> &[StepResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Write `states.json` next to `states/` and hand back the log
    pub fn finish(self) -> Result<Vec<StepResult>> {
        let run_dir = self
            .states_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let path = run_dir.join(STATE_LOG_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(&self.results)?)?;
        info!(
            "[recorder] Wrote {} state entries to {}",
            self.results.len(),
            path.display()
        );
        Ok(self.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screenshot_name() {
        assert_eq!(screenshot_name(1, "open"), "01_open.png");
        assert_eq!(screenshot_name(12, "assert"), "12_assert.png");
        assert_eq!(screenshot_name(3, "../x y"), "03____x_y.png");
    }

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let a = fingerprint("<div>hello</div>");
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(a, fingerprint("<div>hello</div>"));
        assert_ne!(a, fingerprint("<div>hello!</div>"));
    }
}
