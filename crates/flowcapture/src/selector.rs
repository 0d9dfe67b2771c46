use serde::{Deserialize, Serialize};

/// Ways to find an element on the current page.
///
/// Matching is case-insensitive unless stated otherwise, and only visible
/// elements count.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ElementQuery {
    /// Select by ARIA role (explicit or implicit) and optional accessible name substring
    Role { role: String, name: Option<String> },
    /// Form control whose `<label>` or `aria-label` contains the text
    Label { text: String },
    /// Form control whose placeholder contains the text
    Placeholder { text: String },
    /// Element whose own visible text contains (or equals, when `exact`) the text
    Text { text: String, exact: bool },
    /// Element of one of `tags` with any of `attributes` containing the value
    Attribute {
        tags: Vec<String>,
        attributes: Vec<String>,
        contains: String,
    },
    /// Raw CSS selector
    Css { selector: String },
}

impl ElementQuery {
    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Role {
            role: role.into(),
            name: Some(name.into()),
        }
    }

    pub fn label(text: impl Into<String>) -> Self {
        Self::Label { text: text.into() }
    }

    pub fn placeholder(text: impl Into<String>) -> Self {
        Self::Placeholder { text: text.into() }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            exact: false,
        }
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css {
            selector: selector.into(),
        }
    }
}

impl std::fmt::Display for ElementQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Role { role, name: None } => write!(f, "role:{role}"),
            Self::Role {
                role,
                name: Some(name),
            } => write!(f, "role:{role} && name:{name}"),
            Self::Label { text } => write!(f, "label:{text}"),
            Self::Placeholder { text } => write!(f, "placeholder:{text}"),
            Self::Text { text, exact: false } => write!(f, "text:{text}"),
            Self::Text { text, exact: true } => write!(f, "text:={text}"),
            Self::Attribute {
                tags,
                attributes,
                contains,
            } => write!(
                f,
                "{}[{}*={contains:?}]",
                tags.join("|"),
                attributes.join("|")
            ),
            Self::Css { selector } => write!(f, "css:{selector}"),
        }
    }
}
