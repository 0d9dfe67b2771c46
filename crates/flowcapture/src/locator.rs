//! Locator cascades: ordered strategies per step, first one that finds and mutates an element wins

use tracing::{debug, info, instrument, warn};

use crate::config::SynonymRule;
use crate::selector::ElementQuery;
use crate::session::{BrowserSession, SessionResult};

/// What a strategy does to the first element it finds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Click,
    Fill(String),
    Select(String),
    /// Click the element, then type into whatever took focus
    ClickThenType(String),
}

/// One way of finding the target of a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strategy {
    pub label: String,
    pub query: ElementQuery,
    pub mutation: Mutation,
}

impl Strategy {
    pub fn new(label: impl Into<String>, query: ElementQuery, mutation: Mutation) -> Self {
        Self {
            label: label.into(),
            query,
            mutation,
        }
    }

    async fn apply(&self, session: &dyn BrowserSession) -> SessionResult<()> {
        match &self.mutation {
            Mutation::Click => session.click(&self.query).await,
            Mutation::Fill(value) => session.fill(&self.query, value).await,
            Mutation::Select(option) => session.select_option(&self.query, option).await,
            Mutation::ClickThenType(text) => {
                session.click(&self.query).await?;
                session.type_text(text).await
            }
        }
    }
}

/// Outcome of running a cascade
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A strategy found its element and the mutation went through
    Applied { strategy: String },
    /// Every strategy came up empty or failed
    Exhausted { attempts: usize },
}

/// Ordered strategies for one step. The first strategy that finds at least
/// one element and mutates it successfully ends the cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cascade {
    action: &'static str,
    target: String,
    strategies: Vec<Strategy>,
}

impl Cascade {
    pub fn new(action: &'static str, target: impl Into<String>, strategies: Vec<Strategy>) -> Self {
        Self {
            action,
            target: target.into(),
            strategies,
        }
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// Section navigation: visible text, then link, then button
    pub fn goto(section: &str) -> Self {
        Self::new(
            "goto",
            section,
            vec![
                Strategy::new("text", ElementQuery::text(section), Mutation::Click),
                Strategy::new("role=link", ElementQuery::role("link", section), Mutation::Click),
                Strategy::new(
                    "role=button",
                    ElementQuery::role("button", section),
                    Mutation::Click,
                ),
            ],
        )
    }

    /// Button by name, then synonym labels for known phrases, then any text
    pub fn click(text: &str, synonyms: &[SynonymRule]) -> Self {
        let lowered = text.trim().to_lowercase();
        let mut strategies = vec![Strategy::new(
            "role=button",
            ElementQuery::role("button", lowered.clone()),
            Mutation::Click,
        )];

        for rule in synonyms {
            if !lowered.contains(&rule.key.to_lowercase()) {
                continue;
            }
            strategies.extend(rule.labels.iter().map(|label| {
                Strategy::new(
                    format!("synonym:{label}"),
                    ElementQuery::role("button", label.clone()),
                    Mutation::Click,
                )
            }));
        }

        strategies.push(Strategy::new("text", ElementQuery::text(text), Mutation::Click));
        Self::new("click", text, strategies)
    }

    pub fn fill(field: &str, value: &str) -> Self {
        let fill = || Mutation::Fill(value.to_string());
        Self::new(
            "fill",
            field,
            vec![
                Strategy::new("label", ElementQuery::label(field), fill()),
                Strategy::new("placeholder", ElementQuery::placeholder(field), fill()),
                Strategy::new(
                    "aria-label/name",
                    ElementQuery::Attribute {
                        tags: vec!["input".into(), "textarea".into()],
                        attributes: vec!["aria-label".into(), "name".into()],
                        contains: field.to_string(),
                    },
                    fill(),
                ),
                Strategy::new(
                    "role=textbox",
                    ElementQuery::Role {
                        role: "textbox".into(),
                        name: None,
                    },
                    fill(),
                ),
                Strategy::new("input/textarea", ElementQuery::css("input, textarea"), fill()),
                Strategy::new(
                    "text-click-type",
                    ElementQuery::text(field),
                    Mutation::ClickThenType(value.to_string()),
                ),
            ],
        )
    }

    pub fn select(field: &str, option: &str) -> Self {
        let select = || Mutation::Select(option.to_string());
        Self::new(
            "select",
            field,
            vec![
                Strategy::new("label", ElementQuery::label(field), select()),
                Strategy::new("placeholder", ElementQuery::placeholder(field), select()),
                Strategy::new("select", ElementQuery::css("select"), select()),
            ],
        )
    }

    /// Confirmation buttons, in the configured order
    pub fn submit(labels: &[String]) -> Self {
        Self::new(
            "submit",
            "confirmation button",
            labels
                .iter()
                .map(|label| {
                    Strategy::new(
                        format!("role=button:{label}"),
                        ElementQuery::role("button", label.clone()),
                        Mutation::Click,
                    )
                })
                .collect(),
        )
    }

    /// Try each strategy in order until one applies
    #[instrument(level = "debug", skip(self, session), fields(action = self.action, target = %self.target))]
    pub async fn resolve(&self, session: &dyn BrowserSession) -> Resolution {
        for strategy in &self.strategies {
            match session.count(&strategy.query).await {
                Ok(0) => {
                    debug!("[{}] {} found nothing for {}", self.action, strategy.label, strategy.query);
                    continue;
                }
                Ok(n) => debug!("[{}] {} matched {n} element(s)", self.action, strategy.label),
                Err(e) => {
                    info!("[{}] {} lookup failed: {e}, trying next", self.action, strategy.label);
                    continue;
                }
            }

            match strategy.apply(session).await {
                Ok(()) => {
                    info!(
                        "[{}] Using {} for {:?} ({})",
                        self.action, strategy.label, self.target, strategy.query
                    );
                    return Resolution::Applied {
                        strategy: strategy.label.clone(),
                    };
                }
                Err(e) => {
                    info!("[{}] {} failed: {e}, trying next", self.action, strategy.label);
                }
            }
        }

        warn!(
            "[{}] Could not find UI element for {:?} after {} strategies",
            self.action,
            self.target,
            self.strategies.len()
        );
        Resolution::Exhausted {
            attempts: self.strategies.len(),
        }
    }
}

/// Close first-load dialogs and tours. Every label that matches is clicked,
/// then a generic close icon. Returns how many clicks went through.
pub async fn dismiss_popups(session: &dyn BrowserSession, labels: &[String]) -> usize {
    let mut queries: Vec<ElementQuery> = labels
        .iter()
        .map(|label| ElementQuery::role("button", label.clone()))
        .collect();
    queries.push(ElementQuery::css(
        r#"[aria-label="Close"], [aria-label="Dismiss"]"#,
    ));

    let mut dismissed = 0;
    for query in &queries {
        if !matches!(session.count(query).await, Ok(n) if n > 0) {
            continue;
        }
        match session.click(query).await {
            Ok(()) => {
                info!("[popups] Dismissing popup via {query}");
                dismissed += 1;
            }
            Err(e) => debug!("[popups] {query} click failed: {e}"),
        }
    }
    dismissed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(cascade: &Cascade) -> Vec<&str> {
        cascade.strategies().iter().map(|s| s.label.as_str()).collect()
    }

    #[test]
    fn test_click_cascade_expands_synonyms() {
        let rules = vec![
            SynonymRule {
                key: "new project".into(),
                labels: vec!["Blank project".into(), "Create".into()],
            },
            SynonymRule {
                key: "create project".into(),
                labels: vec!["Project".into()],
            },
        ];
        let cascade = Cascade::click("New Project", &rules);
        assert_eq!(
            labels(&cascade),
            vec!["role=button", "synonym:Blank project", "synonym:Create", "text"]
        );
        assert_eq!(
            cascade.strategies()[0].query,
            ElementQuery::role("button", "new project")
        );
        assert_eq!(cascade.strategies()[3].query, ElementQuery::text("New Project"));
    }

    #[test]
    fn test_fill_cascade_order() {
        let cascade = Cascade::fill("Name", "apollo");
        assert_eq!(
            labels(&cascade),
            vec![
                "label",
                "placeholder",
                "aria-label/name",
                "role=textbox",
                "input/textarea",
                "text-click-type"
            ]
        );
        assert_eq!(
            cascade.strategies()[5].mutation,
            Mutation::ClickThenType("apollo".into())
        );
    }

    #[test]
    fn test_submit_cascade_uses_labels_in_order() {
        let cascade = Cascade::submit(&["Save".to_string(), "OK".to_string()]);
        assert_eq!(labels(&cascade), vec!["role=button:Save", "role=button:OK"]);
    }

    #[test]
    fn test_goto_and_select_cascades() {
        assert_eq!(labels(&Cascade::goto("Projects")), vec!["text", "role=link", "role=button"]);
        assert_eq!(
            labels(&Cascade::select("Status", "Done")),
            vec!["label", "placeholder", "select"]
        );
    }
}
