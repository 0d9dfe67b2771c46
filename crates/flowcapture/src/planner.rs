//! Prompt → resolved request → action plan

use crate::compiler::compile;
use crate::config::{Settings, UnresolvedAppPolicy};
use crate::errors::{FlowError, Result};
use crate::extract::{extract_filter_criteria, extract_possible_name};
use crate::matcher::{FuzzyMatcher, VocabularyMatcher};
use crate::normalize::normalize_prompt;
use crate::plan::{ActionPlan, PLAN_FILE};
use crate::types::{AppName, IntentKind, ResolvedRequest};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Compiled plan together with what was resolved from the prompt
#[derive(Debug, Clone)]
pub struct PlannedRun {
    pub request: ResolvedRequest,
    pub plan: ActionPlan,
}

pub struct Planner {
    settings: Arc<Settings>,
}

impl Planner {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    fn matcher(&self) -> VocabularyMatcher<'_> {
        VocabularyMatcher::new(
            &self.settings.vocabulary,
            FuzzyMatcher::new(self.settings.runtime.similarity_cutoff),
        )
    }

    /// Resolve app, intent, object and free-text arguments from a raw prompt
    pub fn resolve(&self, prompt: &str) -> ResolvedRequest {
        let normalized = normalize_prompt(prompt);
        let matcher = self.matcher();

        let app = matcher.detect_app(&normalized);
        let (intent, object) = matcher.detect_intent_object(&normalized);

        // Extraction runs with the substituted values the compiler will use
        let app_for_name = app.clone().unwrap_or_else(AppName::unknown);
        let name = extract_possible_name(
            prompt,
            &object.clone().unwrap_or_default(),
            Some(&app_for_name),
        );
        let filter_criteria = match intent {
            Some(IntentKind::Filter) => extract_filter_criteria(prompt),
            _ => None,
        };

        ResolvedRequest {
            app,
            intent,
            object,
            name,
            filter_criteria,
        }
    }

    /// Resolve and compile. Fails only when the app is unresolved and the
    /// configured policy is [`UnresolvedAppPolicy::Abort`].
    #[instrument(skip(self))]
    pub fn plan(&self, prompt: &str) -> Result<PlannedRun> {
        let request = self.resolve(prompt);
        info!("[planner] Parsed: {request}");

        if request.app.is_none() {
            match self.settings.runtime.unresolved_app {
                UnresolvedAppPolicy::Abort => {
                    return Err(FlowError::UnresolvedApp(prompt.to_string()));
                }
                UnresolvedAppPolicy::Sentinel => {
                    warn!("[planner] No known app in prompt; using {}", AppName::unknown());
                }
            }
        }
        if request.intent.is_none() {
            warn!("[planner] No intent recognised; emitting a minimal open plan");
        }

        let plan = compile(&request);
        Ok(PlannedRun { request, plan })
    }

    /// Plan and write `steps.yaml` into `run_dir`, returning the file path
    pub fn plan_into(&self, prompt: &str, run_dir: &Path) -> Result<(PlannedRun, PathBuf)> {
        let planned = self.plan(prompt)?;
        std::fs::create_dir_all(run_dir)?;
        let path = run_dir.join(PLAN_FILE);
        planned.plan.save(&path)?;
        info!(
            "[planner] Planner wrote {} steps -> {}",
            planned.plan.len(),
            path.display()
        );
        Ok((planned, path))
    }
}
