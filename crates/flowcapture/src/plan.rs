//! Action plan model and its on-disk form (`steps.yaml`)

use crate::errors::{FlowError, Result};
use crate::types::AppName;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// File name of the plan inside a run folder
pub const PLAN_FILE: &str = "steps.yaml";

/// One UI instruction from the closed action set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Action {
    Open {
        app: AppName,
    },
    #[serde(rename = "goto", alias = "navigate")]
    Navigate {
        section: String,
    },
    Click {
        text: String,
    },
    Fill {
        field: String,
        #[serde(alias = "val")]
        value: String,
    },
    Select {
        field: String,
        #[serde(alias = "opt")]
        option: String,
    },
    Submit,
    Assert {
        token: String,
    },
}

impl Action {
    /// Tag as written in the plan file
    pub fn tag(&self) -> &'static str {
        match self {
            Action::Open { .. } => "open",
            Action::Navigate { .. } => "goto",
            Action::Click { .. } => "click",
            Action::Fill { .. } => "fill",
            Action::Select { .. } => "select",
            Action::Submit => "submit",
            Action::Assert { .. } => "assert",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Open { app } => write!(f, "open({app})"),
            Action::Navigate { section } => write!(f, "goto({section:?})"),
            Action::Click { text } => write!(f, "click({text:?})"),
            Action::Fill { field, value } => write!(f, "fill({field:?}, {value:?})"),
            Action::Select { field, option } => write!(f, "select({field:?}, {option:?})"),
            Action::Submit => f.write_str("submit()"),
            Action::Assert { token } => write!(f, "assert({token:?})"),
        }
    }
}

/// An action plus its diagnostic state label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_label: Option<String>,
}

impl Step {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            state_label: None,
        }
    }

    pub fn labeled(action: Action, label: impl Into<String>) -> Self {
        Self {
            action,
            state_label: Some(label.into()),
        }
    }
}

impl From<Action> for Step {
    fn from(action: Action) -> Self {
        Step::new(action)
    }
}

/// Ordered, non-empty sequence of steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Step>", into = "Vec<Step>")]
pub struct ActionPlan(Vec<Step>);

impl ActionPlan {
    pub fn new(steps: Vec<Step>) -> Result<Self> {
        if steps.is_empty() {
            return Err(FlowError::EmptyPlan);
        }
        Ok(Self(steps))
    }

    /// Non-empty by construction
    pub fn from_parts(first: Step, rest: impl IntoIterator<Item = Step>) -> Self {
        let mut steps = vec![first];
        steps.extend(rest);
        Self(steps)
    }

    pub fn steps(&self) -> &[Step] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_steps(self) -> Vec<Step> {
        self.0
    }

    /// App named by the first `open` step
    pub fn first_app(&self) -> Option<&AppName> {
        first_open_app(self.0.iter())
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Write the plan to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_yaml()?)?;
        info!("[plan] Wrote {} steps to {}", self.len(), path.display());
        Ok(())
    }
}

impl TryFrom<Vec<Step>> for ActionPlan {
    type Error = FlowError;

    fn try_from(steps: Vec<Step>) -> Result<Self> {
        ActionPlan::new(steps)
    }
}

impl From<ActionPlan> for Vec<Step> {
    fn from(plan: ActionPlan) -> Self {
        plan.0
    }
}

fn first_open_app<'a>(mut steps: impl Iterator<Item = &'a Step>) -> Option<&'a AppName> {
    steps.find_map(|s| match &s.action {
        Action::Open { app } => Some(app),
        _ => None,
    })
}

/// One record of a plan file as read back by the interpreter
#[derive(Debug, Clone, PartialEq)]
pub enum PlanEntry {
    Step(Step),
    /// Record with an unknown tag or missing fields, kept so the state log
    /// stays aligned with the file
    Unrecognized {
        action: String,
        record: serde_json::Value,
    },
}

impl PlanEntry {
    pub fn action_tag(&self) -> &str {
        match self {
            PlanEntry::Step(step) => step.action.tag(),
            PlanEntry::Unrecognized { action, .. } => action,
        }
    }

    pub fn state_label(&self) -> Option<&str> {
        match self {
            PlanEntry::Step(step) => step.state_label.as_deref(),
            PlanEntry::Unrecognized { record, .. } => {
                record.get("state_label").and_then(|v| v.as_str())
            }
        }
    }

    /// The entry as a plain JSON record
    pub fn record(&self) -> serde_json::Value {
        match self {
            PlanEntry::Step(step) => serde_json::to_value(step).unwrap_or_default(),
            PlanEntry::Unrecognized { record, .. } => record.clone(),
        }
    }

    fn from_record(record: serde_json::Value) -> Self {
        match serde_json::from_value::<Step>(record.clone()) {
            Ok(step) => PlanEntry::Step(step),
            Err(e) => {
                let action = record
                    .get("action")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown")
                    .to_string();
                warn!("[plan] Unrecognized step record {record}: {e}");
                PlanEntry::Unrecognized { action, record }
            }
        }
    }
}

/// A plan file as loaded for interpretation
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedPlan {
    pub entries: Vec<PlanEntry>,
}

impl LoadedPlan {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first_app(&self) -> Option<&AppName> {
        first_open_app(self.entries.iter().filter_map(|e| match e {
            PlanEntry::Step(step) => Some(step),
            PlanEntry::Unrecognized { .. } => None,
        }))
    }

    /// Read a plan file. A missing file is [`FlowError::PlanMissing`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FlowError::PlanMissing(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let records = parse_plan_content(&content).map_err(|reason| FlowError::PlanInvalid {
            path: path.to_path_buf(),
            reason,
        })?;
        if records.is_empty() {
            return Err(FlowError::EmptyPlan);
        }
        debug!("[plan] Loaded {} records from {}", records.len(), path.display());
        Ok(Self {
            entries: records.into_iter().map(PlanEntry::from_record).collect(),
        })
    }
}

impl From<ActionPlan> for LoadedPlan {
    fn from(plan: ActionPlan) -> Self {
        Self {
            entries: plan.into_steps().into_iter().map(PlanEntry::Step).collect(),
        }
    }
}

/// Parse plan text into raw step records.
///
/// Accepts a JSON or YAML sequence, or a mapping carrying a `steps` sequence.
/// An empty document parses to no records.
fn parse_plan_content(content: &str) -> std::result::Result<Vec<serde_json::Value>, String> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value = match serde_json::from_str::<serde_json::Value>(content) {
        Ok(v) => v,
        Err(_) => serde_yaml::from_str::<serde_json::Value>(content)
            .map_err(|e| format!("not valid JSON or YAML: {e}"))?,
    };

    let value = match value {
        serde_json::Value::Object(mut map) if map.contains_key("steps") => {
            map.remove("steps").unwrap_or_default()
        }
        other => other,
    };

    match value {
        serde_json::Value::Null => Ok(Vec::new()),
        serde_json::Value::Array(records) => Ok(records),
        other => Err(format!(
            "expected a sequence of step records, found {}",
            json_kind(&other)
        )),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a sequence",
        serde_json::Value::Object(_) => "a mapping",
    }
}
