//! Configurable row filters
//!
//! The transform stage only knows about a [`Predicate`]. [`FilterRule`]s are
//! one way to build one from configuration; callers can pass any closure.

use super::fields::{lookup_path, render_value, DEFAULT_LIST_SEPARATOR};
use crate::domain::ResolvedEntity;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Decides whether a resolved entity becomes a row
pub type Predicate = Arc<dyn Fn(&ResolvedEntity) -> bool + Send + Sync>;

/// Predicate that keeps every entity
pub fn accept_all() -> Predicate {
    Arc::new(|_| true)
}

/// One condition on a document path
///
/// Exactly one of `equals`, `not_equals` or `present` must be set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_equals: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub present: Option<bool>,
}

impl FilterRule {
    pub fn equals(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            equals: Some(value.into()),
            not_equals: None,
            present: None,
        }
    }

    pub fn not_equals(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            equals: None,
            not_equals: Some(value.into()),
            present: None,
        }
    }

    pub fn present(path: impl Into<String>, present: bool) -> Self {
        Self {
            path: path.into(),
            equals: None,
            not_equals: None,
            present: Some(present),
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.path.trim().is_empty() {
            return Err("transform.filters path cannot be empty".to_string());
        }
        let conditions = [
            self.equals.is_some(),
            self.not_equals.is_some(),
            self.present.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();
        if conditions != 1 {
            return Err(format!(
                "transform.filters '{}' must set exactly one of equals, not_equals, present",
                self.path
            ));
        }
        Ok(())
    }

    /// Whether `document` satisfies this rule
    pub fn matches(&self, document: &Value) -> bool {
        let found = lookup_path(document, &self.path);
        if let Some(expected) = self.present {
            return found.is_some() == expected;
        }
        let rendered = found.map(|v| render_value(v, DEFAULT_LIST_SEPARATOR));
        if let Some(expected) = &self.equals {
            return rendered.as_deref() == Some(expected.as_str());
        }
        if let Some(unexpected) = &self.not_equals {
            return rendered.as_deref() != Some(unexpected.as_str());
        }
        true
    }
}

/// Build a predicate that keeps entities matching every rule
pub fn predicate_from_rules(rules: Vec<FilterRule>) -> Predicate {
    if rules.is_empty() {
        return accept_all();
    }
    Arc::new(move |entity: &ResolvedEntity| rules.iter().all(|rule| rule.matches(&entity.data)))
}
