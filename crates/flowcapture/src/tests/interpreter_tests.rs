//! Handler and cascade behaviour against the fake page

use super::fake_session::FakeSession;
use super::test_settings;
use crate::executor::execute_with_session;
use crate::interpreter::{Interpreter, StepOutcome};
use crate::plan::{Action, PlanEntry, Step, PLAN_FILE};
use crate::recorder::STATES_DIR;
use crate::selector::ElementQuery;
use crate::types::AppName;

async fn run_one(session: &FakeSession, action: Action) -> StepOutcome {
    let settings = test_settings();
    Interpreter::new(session, &settings.runtime)
        .run_step(&PlanEntry::Step(Step::new(action)))
        .await
}

#[tokio::test]
async fn test_click_falls_back_to_synonym_label() {
    let session = FakeSession::new()
        .with_element(ElementQuery::role("button", "Blank project"))
        .with_element(ElementQuery::text("New project"));

    let outcome = run_one(
        &session,
        Action::Click {
            text: "New project".into(),
        },
    )
    .await;

    assert_eq!(
        outcome,
        StepOutcome::Applied {
            strategy: "synonym:Blank project".into()
        }
    );
    assert_eq!(
        session.calls(),
        vec!["click role:button && name:Blank project".to_string()]
    );
}

#[tokio::test]
async fn test_click_failure_moves_to_next_strategy() {
    let session = FakeSession::new()
        .with_failing_click(ElementQuery::role("button", "archive"))
        .with_element(ElementQuery::text("Archive"));

    let outcome = run_one(
        &session,
        Action::Click {
            text: "Archive".into(),
        },
    )
    .await;

    assert_eq!(
        outcome,
        StepOutcome::Applied {
            strategy: "text".into()
        }
    );
}

#[tokio::test]
async fn test_fill_last_resort_types_into_clicked_text() {
    let session = FakeSession::new().with_element(ElementQuery::text("Untitled"));

    let outcome = run_one(
        &session,
        Action::Fill {
            field: "Untitled".into(),
            value: "roadmap".into(),
        },
    )
    .await;

    assert_eq!(
        outcome,
        StepOutcome::Applied {
            strategy: "text-click-type".into()
        }
    );
    assert_eq!(
        session.calls(),
        vec!["click text:Untitled".to_string(), "type roadmap".to_string()]
    );
}

#[tokio::test]
async fn test_fill_prefers_attribute_over_generic_inputs() {
    let session = FakeSession::new()
        .with_element(ElementQuery::Attribute {
            tags: vec!["input".into(), "textarea".into()],
            attributes: vec!["aria-label".into(), "name".into()],
            contains: "Title".into(),
        })
        .with_element(ElementQuery::css("input, textarea"));

    let outcome = run_one(
        &session,
        Action::Fill {
            field: "Title".into(),
            value: "crash on login".into(),
        },
    )
    .await;

    assert_eq!(
        outcome,
        StepOutcome::Applied {
            strategy: "aria-label/name".into()
        }
    );
}

#[tokio::test]
async fn test_select_uses_first_select_as_fallback() {
    let session = FakeSession::new().with_element(ElementQuery::css("select"));

    let outcome = run_one(
        &session,
        Action::Select {
            field: "Priority".into(),
            option: "High".into(),
        },
    )
    .await;

    assert_eq!(
        outcome,
        StepOutcome::Applied {
            strategy: "select".into()
        }
    );
    assert_eq!(session.calls(), vec!["select css:select = High".to_string()]);
}

#[tokio::test]
async fn test_submit_exhausted_is_not_found() {
    let session = FakeSession::new();
    let outcome = run_one(&session, Action::Submit).await;
    assert_eq!(outcome, StepOutcome::NotFound { attempts: 8 });
    assert!(session.calls().is_empty());
}

#[tokio::test]
async fn test_assert_is_case_insensitive() {
    let session = FakeSession::new().with_text("Issue CRASH ON LOGIN created");
    assert_eq!(
        run_one(
            &session,
            Action::Assert {
                token: "crash on login".into()
            }
        )
        .await,
        StepOutcome::AssertPassed {
            token: "crash on login".into()
        }
    );
    assert_eq!(
        run_one(
            &session,
            Action::Assert {
                token: "deleted".into()
            }
        )
        .await,
        StepOutcome::AssertFailed {
            token: "deleted".into()
        }
    );
}

#[tokio::test]
async fn test_handler_panic_is_contained() {
    let session = FakeSession::new().panicking_on(ElementQuery::text("Projects"));

    let outcome = run_one(
        &session,
        Action::Navigate {
            section: "Projects".into(),
        },
    )
    .await;

    match outcome {
        StepOutcome::HandlerError { reason } => assert!(reason.contains("exploded"), "{reason}"),
        other => panic!("expected HandlerError, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_target_is_skipped() {
    let session = FakeSession::new();
    let outcome = run_one(&session, Action::Click { text: "  ".into() }).await;
    assert!(matches!(outcome, StepOutcome::Skipped { .. }));
}

#[tokio::test]
async fn test_open_dismisses_popups_when_enabled() {
    let session = FakeSession::new()
        .with_element(ElementQuery::role("button", "Got it"))
        .with_element(ElementQuery::css(r#"[aria-label="Close"], [aria-label="Dismiss"]"#));
    let mut settings = test_settings();
    settings.runtime.dismiss_popups = true;

    let outcome = Interpreter::new(&session, &settings.runtime)
        .run_step(&PlanEntry::Step(Step::new(Action::Open {
            app: AppName::new("Notion"),
        })))
        .await;

    assert_eq!(
        outcome,
        StepOutcome::Navigated {
            url: "https://www.notion.so/".into()
        }
    );
    assert_eq!(
        session.calls(),
        vec![
            "goto https://www.notion.so/".to_string(),
            "click role:button && name:Got it".to_string(),
            r#"click css:[aria-label="Close"], [aria-label="Dismiss"]"#.to_string(),
        ]
    );
}

#[tokio::test]
async fn test_unrecognized_records_are_skipped_but_logged() {
    let run_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        run_dir.path().join(PLAN_FILE),
        "- action: open\n  app: Linear\n- action: hover\n  text: menu\n- action: fill\n  field: Name\n- action: assert\n  token: linear\n",
    )
    .unwrap();

    let session = FakeSession::new().with_text("Linear home");
    let results = execute_with_session(run_dir.path(), &test_settings(), &session)
        .await
        .unwrap();

    assert_eq!(results.len(), 4);
    assert_eq!(results[1].action, "hover");
    assert!(matches!(results[1].outcome, StepOutcome::Skipped { .. }));
    // known tag with a missing field is kept as an unrecognized record
    assert_eq!(results[2].action, "fill");
    assert!(matches!(results[2].outcome, StepOutcome::Skipped { .. }));
    assert_eq!(
        results[3].outcome,
        StepOutcome::AssertPassed {
            token: "linear".into()
        }
    );
    assert!(run_dir
        .path()
        .join(STATES_DIR)
        .join("02_hover.png")
        .exists());
}

#[tokio::test]
async fn test_capture_failures_null_the_fields_only() {
    let run_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        run_dir.path().join(PLAN_FILE),
        "- action: open\n  app: Asana\n",
    )
    .unwrap();

    let session = FakeSession::new().failing_captures();
    let results = execute_with_session(run_dir.path(), &test_settings(), &session)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert!(results[0].outcome.is_success());
    assert_eq!(results[0].screenshot, None);
    assert_eq!(results[0].resolved_url, None);
    assert_eq!(results[0].content_fingerprint, None);
}

#[tokio::test]
async fn test_capture_panics_null_the_fields_only() {
    let run_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        run_dir.path().join(PLAN_FILE),
        "- action: open\n  app: Asana\n- action: submit\n",
    )
    .unwrap();

    let session = FakeSession::new().panicking_captures();
    let results = execute_with_session(run_dir.path(), &test_settings(), &session)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results[0].outcome.is_success());
    assert_eq!(results[1].outcome, StepOutcome::NotFound { attempts: 8 });
    for result in &results {
        assert_eq!(result.screenshot, None);
        assert_eq!(result.resolved_url, None);
        assert_eq!(result.content_fingerprint, None);
    }
    assert!(session.is_closed());
}
