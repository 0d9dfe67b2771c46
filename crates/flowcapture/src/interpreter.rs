//! Step interpreter: dispatches each plan entry to its handler
//!
//! Handlers never abort the run. Whatever happens inside one, including a
//! panic, comes back as a [`StepOutcome`] and the next step runs.

use crate::config::RuntimeSettings;
use crate::locator::{dismiss_popups, Cascade, Resolution};
use crate::plan::{Action, LoadedPlan, PlanEntry};
use crate::recorder::StateRecorder;
use crate::session::{BrowserSession, SessionResult};
use crate::types::AppName;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use tracing::{info, instrument, warn};

/// What happened when a step ran
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    /// An element was found and mutated
    Applied { strategy: String },
    /// The session was pointed at a new URL
    Navigated { url: String },
    AssertPassed { token: String },
    AssertFailed { token: String },
    /// Every locator strategy came up empty; nothing was mutated
    NotFound { attempts: usize },
    /// The handler failed or panicked
    HandlerError { reason: String },
    /// Not executed: unknown action or unusable record
    Skipped { reason: String },
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Applied { .. } | Self::Navigated { .. } | Self::AssertPassed { .. }
        )
    }
}

impl From<Resolution> for StepOutcome {
    fn from(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Applied { strategy } => Self::Applied { strategy },
            Resolution::Exhausted { attempts } => Self::NotFound { attempts },
        }
    }
}

pub const BLANK_PAGE: &str = "about:blank";

pub struct Interpreter<'a> {
    session: &'a dyn BrowserSession,
    settings: &'a RuntimeSettings,
}

impl<'a> Interpreter<'a> {
    pub fn new(session: &'a dyn BrowserSession, settings: &'a RuntimeSettings) -> Self {
        Self { session, settings }
    }

    /// Run every entry in order, snapshotting after each one
    pub async fn run(&self, plan: &LoadedPlan, recorder: &mut StateRecorder) {
        for (i, entry) in plan.entries.iter().enumerate() {
            let index = i + 1;
            info!("[step {index}] {}", entry.record());
            let outcome = self.run_step(entry).await;
            if !outcome.is_success() {
                warn!("[step {index}] {outcome:?}");
            }
            recorder.capture(self.session, index, entry, outcome).await;
        }
    }

    /// Execute one entry. Never fails.
    pub async fn run_step(&self, entry: &PlanEntry) -> StepOutcome {
        let step = match entry {
            PlanEntry::Step(step) => step,
            PlanEntry::Unrecognized { action, .. } => {
                warn!("Unknown action: {action}");
                return StepOutcome::Skipped {
                    reason: format!("unknown action {action:?}"),
                };
            }
        };

        match AssertUnwindSafe(self.dispatch(&step.action))
            .catch_unwind()
            .await
        {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!("Error executing step {}: {e}", step.action);
                StepOutcome::HandlerError {
                    reason: e.to_string(),
                }
            }
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "handler panicked".to_string());
                warn!("Handler for {} panicked: {reason}", step.action);
                StepOutcome::HandlerError { reason }
            }
        }
    }

    async fn dispatch(&self, action: &Action) -> SessionResult<StepOutcome> {
        match action {
            Action::Open { app } => self.open(app).await,
            Action::Navigate { section } => {
                self.resolve_nonempty("goto", section, || Cascade::goto(section))
                    .await
            }
            Action::Click { text } => {
                self.resolve_nonempty("click", text, || {
                    Cascade::click(text, &self.settings.click_synonyms)
                })
                .await
            }
            Action::Fill { field, value } => {
                info!("[fill] Filling field≈{field:?} with value={value:?}");
                self.resolve_nonempty("fill", field, || Cascade::fill(field, value))
                    .await
            }
            Action::Select { field, option } => {
                self.resolve_nonempty("select", field, || Cascade::select(field, option))
                    .await
            }
            Action::Submit => {
                info!("[submit] Trying to submit");
                Ok(Cascade::submit(&self.settings.submit_labels)
                    .resolve(self.session)
                    .await
                    .into())
            }
            Action::Assert { token } => self.assert_text(token).await,
        }
    }

    async fn resolve_nonempty(
        &self,
        action: &str,
        target: &str,
        cascade: impl FnOnce() -> Cascade,
    ) -> SessionResult<StepOutcome> {
        if target.trim().is_empty() {
            warn!("[{action}] Missing target in step");
            return Ok(StepOutcome::Skipped {
                reason: format!("{action} step has an empty target"),
            });
        }
        Ok(cascade().resolve(self.session).await.into())
    }

    #[instrument(level = "debug", skip(self))]
    async fn open(&self, app: &AppName) -> SessionResult<StepOutcome> {
        let url = match self
            .settings
            .app_profile(app)
            .and_then(|p| p.url.as_deref())
        {
            Some(url) if !app.is_unknown() => {
                info!("[open] Opening app={app} at {url}");
                url.to_string()
            }
            _ => {
                warn!("[open] Unknown app={app:?}, opening {BLANK_PAGE}");
                BLANK_PAGE.to_string()
            }
        };

        self.session.goto(&url).await?;
        if let Err(e) = self.session.wait_for_load(self.settings.load_timeout()).await {
            warn!("[open] Page did not settle: {e}");
        }

        if self.settings.dismiss_popups {
            let closed = dismiss_popups(self.session, &self.settings.popup_labels).await;
            if closed > 0 {
                info!("[open] Dismissed {closed} popup(s)");
            }
        }

        Ok(StepOutcome::Navigated { url })
    }

    async fn assert_text(&self, token: &str) -> SessionResult<StepOutcome> {
        info!("[assert] Checking if token={token:?} appears in page text");
        let body = self.session.text_content().await?;
        if body.to_lowercase().contains(&token.to_lowercase()) {
            info!("[assert] PASSED: found token={token:?}");
            Ok(StepOutcome::AssertPassed {
                token: token.to_string(),
            })
        } else {
            warn!("[assert] FAILED: token={token:?} not found");
            Ok(StepOutcome::AssertFailed {
                token: token.to_string(),
            })
        }
    }
}
