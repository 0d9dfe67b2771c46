//! Free-text argument extraction from the raw prompt
//!
//! Both extractors work on the lower-cased prompt split on whitespace, not on
//! the normalized text, so quoted or punctuated names survive as typed.

use crate::types::{AppName, ObjectClass};

const NAME_MARKERS: &[&str] = &["name", "named", "called", "title"];
const LEADING_FILLERS: &[&str] = &["in", "on", "at", "the", "a", "an", "called"];
const APP_PREPOSITIONS: &[&str] = &["in", "on", "at", "for"];

/// Slice the words following the object noun into a candidate name.
///
/// `create project called Test Rocket` with object `project` gives
/// `test rocket`. Returns `None` when the noun is absent or nothing is left
/// after stripping.
pub fn extract_possible_name(
    prompt: &str,
    object: &ObjectClass,
    app: Option<&AppName>,
) -> Option<String> {
    let lowered = prompt.to_lowercase();
    let tokens: Vec<&str> = lowered.split_whitespace().collect();
    let app_lower = app.map(|a| a.as_str().to_lowercase());

    let idx = tokens.iter().position(|t| *t == object.as_str())?;
    let mut name = &tokens[idx + 1..];

    // trailing "<preposition> <app>"
    if let Some(app_l) = app_lower.as_deref() {
        if let [head @ .., prep, last] = name {
            if *last == app_l && APP_PREPOSITIONS.contains(prep) {
                name = head;
            }
        }
    }

    // keep only what follows a marker, if the marker is not the last word
    if let Some(j) = name.iter().position(|t| NAME_MARKERS.contains(t)) {
        if j + 1 < name.len() {
            name = &name[j + 1..];
        }
    }

    while let [first, rest @ ..] = name {
        if !LEADING_FILLERS.contains(first) {
            break;
        }
        name = rest;
    }

    if let Some(app_l) = app_lower.as_deref() {
        while let [first, rest @ ..] = name {
            if *first != app_l {
                break;
            }
            name = rest;
        }
    }

    if name.is_empty() {
        None
    } else {
        Some(name.join(" "))
    }
}

/// Text after the first ` by ` (checked first) or ` with `, trimmed
pub fn extract_filter_criteria(prompt: &str) -> Option<String> {
    let lowered = prompt.to_lowercase();
    [" by ", " with "]
        .iter()
        .find_map(|kw| lowered.split_once(*kw).map(|(_, rest)| rest.trim()))
        .filter(|rest| !rest.is_empty())
        .map(str::to_string)
}
