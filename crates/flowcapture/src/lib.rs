//! Natural-language task capture for web apps
//!
//! A short prompt such as "create a project named Apollo in Linear" is
//! compiled into an ordered action plan (`steps.yaml`). The plan is then
//! replayed against a live browser page, each step resolving its target
//! through a cascade of locator strategies, and the page state is captured
//! after every step (`states/`, `states.json`).

pub mod cdp;
pub mod compiler;
pub mod config;
pub mod errors;
pub mod executor;
pub mod extract;
pub mod interpreter;
pub mod locator;
pub mod matcher;
pub mod normalize;
pub mod plan;
pub mod planner;
pub mod recorder;
pub mod selector;
pub mod session;
#[cfg(test)]
mod tests;
pub mod types;

pub use cdp::CdpSession;
pub use compiler::compile;
pub use config::{RuntimeSettings, Settings, UnresolvedAppPolicy, VocabularyTables};
pub use errors::{FlowError, Result, SessionError};
pub use executor::{execute_plan, execute_with_session};
pub use interpreter::{Interpreter, StepOutcome};
pub use locator::{Cascade, Mutation, Resolution, Strategy};
pub use matcher::{FuzzyMatcher, VocabularyMatcher};
pub use normalize::normalize_prompt;
pub use plan::{Action, ActionPlan, LoadedPlan, PlanEntry, Step, PLAN_FILE};
pub use planner::{PlannedRun, Planner};
pub use recorder::{StateRecorder, StepResult, STATE_LOG_FILE};
pub use selector::ElementQuery;
pub use session::{BrowserSession, StorageState};
pub use types::{AppName, IntentKind, ObjectClass, ResolvedRequest, UNKNOWN_APP};
