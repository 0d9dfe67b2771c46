//! Common types shared by the planner and the interpreter

use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker threaded through a plan when no known application was recognised
pub const UNKNOWN_APP: &str = "<UNKNOWN_APP>";

/// Object class used when the prompt names no known object
pub const DEFAULT_OBJECT: &str = "item";

/// Canonical application name, exactly as listed in the app vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppName(String);

impl AppName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The sentinel used when app resolution failed
    pub fn unknown() -> Self {
        Self(UNKNOWN_APP.to_string())
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_APP
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalized noun-level target of a prompt, e.g. `project` or `issue`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectClass(String);

impl ObjectClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ObjectClass {
    fn default() -> Self {
        Self(DEFAULT_OBJECT.to_string())
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Verb-level goal of a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentKind {
    Create,
    Filter,
    Update,
    Delete,
    Open,
}

impl IntentKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "create" => Some(Self::Create),
            "filter" => Some(Self::Filter),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            "open" => Some(Self::Open),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Filter => "filter",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Open => "open",
        }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the planner learned from one prompt. `None` means unresolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRequest {
    pub app: Option<AppName>,
    pub intent: Option<IntentKind>,
    pub object: Option<ObjectClass>,
    pub name: Option<String>,
    pub filter_criteria: Option<String>,
}

impl fmt::Display for ResolvedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn show<T: fmt::Display>(v: &Option<T>) -> String {
            v.as_ref()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string())
        }
        write!(
            f,
            "intent={} object={} app={} name={} criteria={}",
            show(&self.intent),
            show(&self.object),
            show(&self.app),
            show(&self.name),
            show(&self.filter_criteria),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_parse() {
        assert_eq!(IntentKind::parse("Create"), Some(IntentKind::Create));
        assert_eq!(IntentKind::parse(" filter "), Some(IntentKind::Filter));
        assert_eq!(IntentKind::parse("archive"), None);
    }

    #[test]
    fn test_unknown_app_sentinel() {
        let app = AppName::unknown();
        assert!(app.is_unknown());
        assert_eq!(app.as_str(), "<UNKNOWN_APP>");
        assert!(!AppName::new("Linear").is_unknown());
    }

    #[test]
    fn test_resolved_request_display() {
        let req = ResolvedRequest {
            app: Some(AppName::new("Linear")),
            intent: Some(IntentKind::Create),
            object: Some(ObjectClass::new("project")),
            name: None,
            filter_criteria: None,
        };
        assert_eq!(
            req.to_string(),
            "intent=create object=project app=Linear name=- criteria=-"
        );
    }
}
