//! Prompt to state log, end to end against the fake page

use super::fake_session::{FakeSession, FAKE_PNG};
use super::{init_tracing, test_settings};
use crate::errors::FlowError;
use crate::executor::execute_with_session;
use crate::interpreter::StepOutcome;
use crate::plan::{Action, PLAN_FILE};
use crate::planner::Planner;
use crate::recorder::{StepResult, STATES_DIR, STATE_LOG_FILE};
use crate::selector::ElementQuery;
use crate::types::{AppName, IntentKind, ObjectClass, UNKNOWN_APP};
use std::sync::Arc;

fn planner() -> Planner {
    Planner::new(Arc::new(test_settings()))
}

/// A Linear workspace where the project creation flow is reachable
fn linear_projects_page() -> FakeSession {
    FakeSession::new()
        .with_element(ElementQuery::text("Projects"))
        .with_element(ElementQuery::role("button", "new project"))
        .with_element(ElementQuery::label("Name"))
        .with_element(ElementQuery::role("button", "Create project"))
        .with_text("Projects\nApollo\nProject created")
}

#[tokio::test]
async fn test_create_project_in_linear_end_to_end() {
    init_tracing();
    let run_dir = tempfile::tempdir().unwrap();
    let settings = test_settings();

    let (planned, plan_path) = planner()
        .plan_into("Create a project named Apollo in Linear", run_dir.path())
        .unwrap();
    assert_eq!(plan_path, run_dir.path().join(PLAN_FILE));

    let request = &planned.request;
    assert_eq!(request.app, Some(AppName::new("Linear")));
    assert_eq!(request.intent, Some(IntentKind::Create));
    assert_eq!(request.object, Some(ObjectClass::new("project")));
    assert_eq!(request.name.as_deref(), Some("apollo"));

    let actions: Vec<&str> = planned.plan.steps().iter().map(|s| s.action.tag()).collect();
    assert_eq!(actions, vec!["open", "goto", "click", "fill", "submit", "assert"]);
    assert_eq!(
        planned.plan.steps()[3].action,
        Action::Fill {
            field: "Name".into(),
            value: "apollo".into()
        }
    );

    let session = linear_projects_page();
    let results = execute_with_session(run_dir.path(), &settings, &session)
        .await
        .unwrap();

    assert_eq!(results.len(), 6);
    assert_eq!(results[0].resolved_url.as_deref(), Some("https://linear.app/"));
    assert!(
        results.iter().all(|r| r.outcome.is_success()),
        "{results:#?}"
    );
    assert_eq!(results[3].strategy(), Some("label"));
    assert_eq!(results[4].strategy(), Some("role=button:Create project"));
    assert_eq!(
        results[5].outcome,
        StepOutcome::AssertPassed {
            token: "Project".into()
        }
    );
    assert_eq!(results[1].state_label.as_deref(), Some("projects_list"));
    assert!(session.is_closed());
    assert!(session
        .calls()
        .contains(&"fill label:Name = apollo".to_string()));

    // artifacts
    let shot = run_dir.path().join(STATES_DIR).join("01_open.png");
    assert_eq!(std::fs::read(shot).unwrap(), FAKE_PNG);
    let log: Vec<StepResult> = serde_json::from_str(
        &std::fs::read_to_string(run_dir.path().join(STATE_LOG_FILE)).unwrap(),
    )
    .unwrap();
    assert_eq!(log, results);
    assert_eq!(log[5].screenshot.as_deref(), Some("06_assert.png"));
}

#[tokio::test]
async fn test_unknown_app_still_logs_every_step() {
    let run_dir = tempfile::tempdir().unwrap();
    let (planned, _) = planner()
        .plan_into("create a widget called zed", run_dir.path())
        .unwrap();

    assert_eq!(
        planned.plan.steps()[0].action,
        Action::Open {
            app: AppName::new(UNKNOWN_APP)
        }
    );

    let session = FakeSession::new();
    let results = execute_with_session(run_dir.path(), &test_settings(), &session)
        .await
        .unwrap();

    assert_eq!(results.len(), planned.plan.len());
    assert_eq!(
        results[0].outcome,
        StepOutcome::Navigated {
            url: "about:blank".into()
        }
    );
    assert!(results[1..]
        .iter()
        .all(|r| matches!(r.outcome, StepOutcome::NotFound { .. } | StepOutcome::AssertFailed { .. })));
    assert!(results.iter().all(|r| r.content_fingerprint.is_some()));
}

#[tokio::test]
async fn test_log_length_matches_plan_when_everything_fails() {
    let run_dir = tempfile::tempdir().unwrap();
    let (planned, _) = planner()
        .plan_into("delete the task called cleanup in asana", run_dir.path())
        .unwrap();

    let session = FakeSession::broken();
    let results = execute_with_session(run_dir.path(), &test_settings(), &session)
        .await
        .unwrap();

    assert_eq!(results.len(), planned.plan.len());
    for result in &results {
        assert!(!result.outcome.is_success(), "{result:?}");
        assert!(result.resolved_url.is_none());
        assert!(result.content_fingerprint.is_none());
        assert!(result.screenshot.is_none());
    }
    assert!(matches!(
        results[0].outcome,
        StepOutcome::HandlerError { .. }
    ));
    assert!(run_dir.path().join(STATE_LOG_FILE).exists());
}

#[tokio::test]
async fn test_missing_plan_is_fatal() {
    let run_dir = tempfile::tempdir().unwrap();
    let session = FakeSession::new();

    let err = execute_with_session(run_dir.path(), &test_settings(), &session)
        .await
        .unwrap_err();

    assert!(matches!(err, FlowError::PlanMissing(_)));
    assert!(session.calls().is_empty());
    assert!(!run_dir.path().join(STATE_LOG_FILE).exists());
}

#[test]
fn test_fuzzy_app_resolution() {
    let planner = planner();
    assert_eq!(
        planner.resolve("open my projects in liner").app,
        Some(AppName::new("Linear"))
    );
    assert_eq!(planner.resolve("xyz123").app, None);
}

#[test]
fn test_value_extraction_through_planner() {
    let planner = planner();
    assert_eq!(
        planner.resolve("create project called Test Rocket").name.as_deref(),
        Some("test rocket")
    );
    assert_eq!(
        planner
            .resolve("filter issues by priority high")
            .filter_criteria
            .as_deref(),
        Some("priority high")
    );
}

#[test]
fn test_planning_is_deterministic() {
    let planner = planner();
    let prompt = "make an issue titled crash on login in linear";
    let a = planner.plan(prompt).unwrap();
    let b = planner.plan(prompt).unwrap();
    assert_eq!(a.request, b.request);
    assert_eq!(a.plan.to_yaml().unwrap(), b.plan.to_yaml().unwrap());
}
