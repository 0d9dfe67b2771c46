//! Plan compiler: resolved request in, action plan out
//!
//! A decision table keyed by `(intent, app, object)`. Hand-written templates
//! for known app flows come first; anything else falls through to the generic
//! template for the intent. Compilation is pure and total: unresolved pieces
//! are substituted, never rejected.

use crate::normalize::alphabetic_tokens;
use crate::plan::{Action, ActionPlan, Step};
use crate::types::{AppName, IntentKind, ObjectClass, ResolvedRequest};

/// Placeholder for a create template when the prompt named nothing
pub const AUTO_NAME: &str = "<AUTO_NAME>";
/// Placeholder value typed by the update template
pub const NEW_VALUE: &str = "<NEW_VALUE>";

const FILTER_CONTROL: &str = "Filter";

/// Compile a request into a plan
pub fn compile(request: &ResolvedRequest) -> ActionPlan {
    let app = request.app.clone().unwrap_or_else(AppName::unknown);
    let object = request.object.clone().unwrap_or_default();
    let name = request.name.as_deref();

    match request.intent {
        Some(IntentKind::Create) => create(&app, &object, name),
        Some(IntentKind::Filter) => filter(&app, &object, request.filter_criteria.as_deref()),
        Some(IntentKind::Update) => update(&app, &object, name),
        Some(IntentKind::Delete) => delete(&app, &object, name),
        Some(IntentKind::Open) => open_section(&app, &object),
        None => ActionPlan::from_parts(open(&app), [assert("opened")]),
    }
}

fn open(app: &AppName) -> Step {
    Action::Open { app: app.clone() }.into()
}

fn goto(section: impl Into<String>) -> Step {
    Action::Navigate {
        section: section.into(),
    }
    .into()
}

fn click(text: impl Into<String>) -> Step {
    Action::Click { text: text.into() }.into()
}

fn fill(field: impl Into<String>, value: impl Into<String>) -> Step {
    Action::Fill {
        field: field.into(),
        value: value.into(),
    }
    .into()
}

fn assert(token: impl Into<String>) -> Step {
    Action::Assert {
        token: token.into(),
    }
    .into()
}

fn submit() -> Step {
    Action::Submit.into()
}

fn label(mut step: Step, state: &str) -> Step {
    step.state_label = Some(state.to_string());
    step
}

fn section_for(object: &ObjectClass) -> String {
    format!("{object}s")
}

fn create(app: &AppName, object: &ObjectClass, name: Option<&str>) -> ActionPlan {
    let title = name.unwrap_or(AUTO_NAME);

    match (app.as_str(), object.as_str()) {
        ("Linear" | "Asana", "project") => ActionPlan::from_parts(
            label(open(app), "linear_home"),
            [
                label(goto("Projects"), "projects_list"),
                label(click("New project"), "create_project_modal_open"),
                label(fill("Name", title), "project_form_filled"),
                label(submit(), "project_submit_clicked"),
                label(assert("Project"), "project_created"),
            ],
        ),
        ("Linear", "issue") => ActionPlan::from_parts(
            label(open(app), "linear_home"),
            [
                label(goto("Issues"), "issues_list"),
                label(click("New issue"), "new_issue_modal_open"),
                label(fill("Title", title), "issue_title_filled"),
                label(click("Create issue"), "issue_created_button_clicked"),
                label(assert(title), "issue_created"),
            ],
        ),
        ("Notion", "page") => ActionPlan::from_parts(
            open(app),
            [click("New page"), fill("Untitled", title), assert(title)],
        ),
        _ => ActionPlan::from_parts(
            open(app),
            [
                goto(section_for(object)),
                click(format!("new {object}")),
                fill("name", title),
                submit(),
                assert("created"),
            ],
        ),
    }
}

fn filter(app: &AppName, object: &ObjectClass, criteria: Option<&str>) -> ActionPlan {
    let keywords = criteria.map(alphabetic_tokens).unwrap_or_default();

    let mut rest = vec![goto(section_for(object)), click(FILTER_CONTROL)];
    rest.extend(keywords.into_iter().map(click));
    rest.push(assert(FILTER_CONTROL));
    ActionPlan::from_parts(open(app), rest)
}

fn target(object: &ObjectClass, name: Option<&str>) -> String {
    name.map(str::to_string)
        .unwrap_or_else(|| format!("target {object}"))
}

fn update(app: &AppName, object: &ObjectClass, name: Option<&str>) -> ActionPlan {
    ActionPlan::from_parts(
        open(app),
        [
            goto(section_for(object)),
            click(target(object, name)),
            fill("value", NEW_VALUE),
            submit(),
            assert("updated"),
        ],
    )
}

fn delete(app: &AppName, object: &ObjectClass, name: Option<&str>) -> ActionPlan {
    ActionPlan::from_parts(
        open(app),
        [
            goto(section_for(object)),
            click(target(object, name)),
            click("delete"),
            submit(),
            assert("deleted"),
        ],
    )
}

fn open_section(app: &AppName, object: &ObjectClass) -> ActionPlan {
    ActionPlan::from_parts(
        open(app),
        [goto(section_for(object)), assert(object.as_str())],
    )
}
