//! Run orchestration: plan file in, state log out

use crate::cdp::CdpSession;
use crate::config::Settings;
use crate::errors::Result;
use crate::interpreter::Interpreter;
use crate::plan::{LoadedPlan, PLAN_FILE};
use crate::recorder::{StateRecorder, StepResult};
use crate::session::{BrowserSession, StorageState};
use std::path::Path;
use tracing::{info, instrument, warn};

/// Execute `<run_dir>/steps.yaml` in a freshly launched browser.
///
/// The plan is loaded before the browser starts, so a missing plan fails the
/// run without side effects.
#[instrument(skip(settings), fields(run_dir = %run_dir.display()))]
pub async fn execute_plan(run_dir: &Path, settings: &Settings) -> Result<Vec<StepResult>> {
    let plan = LoadedPlan::load(&run_dir.join(PLAN_FILE))?;

    let storage = load_storage(&plan, settings);
    let session = CdpSession::launch(&settings.runtime.browser, storage.as_ref()).await?;
    run_with_session(run_dir, settings, &plan, &session).await
}

/// Session snapshot for the first app the plan opens.
///
/// A missing or unreadable snapshot only costs the login: the run goes on
/// with an empty context.
fn load_storage(plan: &LoadedPlan, settings: &Settings) -> Option<StorageState> {
    let app = plan.first_app()?;
    let path = settings.runtime.state_file_for(app)?;
    match StorageState::load(&path) {
        Ok(Some(state)) => {
            info!("[execute_plan] Using storage_state={} for app={app}", path.display());
            Some(state)
        }
        Ok(None) => {
            info!("[execute_plan] No storage_state for app={app}; using empty context");
            None
        }
        Err(e) => {
            warn!("[execute_plan] Ignoring storage_state for app={app}: {e}; using empty context");
            None
        }
    }
}

/// Execute `<run_dir>/steps.yaml` against an existing session
pub async fn execute_with_session(
    run_dir: &Path,
    settings: &Settings,
    session: &dyn BrowserSession,
) -> Result<Vec<StepResult>> {
    let plan = LoadedPlan::load(&run_dir.join(PLAN_FILE))?;
    run_with_session(run_dir, settings, &plan, session).await
}

async fn run_with_session(
    run_dir: &Path,
    settings: &Settings,
    plan: &LoadedPlan,
    session: &dyn BrowserSession,
) -> Result<Vec<StepResult>> {
    let mut recorder = StateRecorder::new(run_dir)?;
    info!("[execute_plan] Running {} steps", plan.len());

    Interpreter::new(session, &settings.runtime)
        .run(plan, &mut recorder)
        .await;

    // in-app autosave
    let grace = settings.runtime.autosave_grace();
    if !grace.is_zero() {
        tokio::time::sleep(grace).await;
    }

    if let Err(e) = session.close().await {
        warn!("[execute_plan] Failed to close session: {e}");
    }

    let results = recorder.finish()?;
    let applied = results.iter().filter(|r| r.outcome.is_success()).count();
    info!(
        "[execute_plan] Done: {applied}/{} steps succeeded",
        results.len()
    );
    Ok(results)
}
