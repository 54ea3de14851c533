//! Tagged per-item results
//!
//! Resolve and transform return a [`Step`] instead of a plain `Result`, so the
//! chunk runner can tell a skippable item failure from a job-level one by
//! matching on the tag.

use super::errors::ShelfportError;
use super::records::IdentifierRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of one pipeline stage for one item
#[derive(Debug)]
pub enum Step<T> {
    /// The stage produced a value
    Ok(T),
    /// The item should be dropped and recorded as skipped
    Skip(SkipReason),
    /// The job must stop
    Fatal(ShelfportError),
}

impl<T> Step<T> {
    /// Map the success value, keeping skip and fatal tags
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Step<U> {
        match self {
            Step::Ok(value) => Step::Ok(f(value)),
            Step::Skip(reason) => Step::Skip(reason),
            Step::Fatal(err) => Step::Fatal(err),
        }
    }

    /// Whether this step produced a value
    pub fn is_ok(&self) -> bool {
        matches!(self, Step::Ok(_))
    }
}

impl<T> From<ShelfportError> for Step<T> {
    /// Classify an error: skippable errors become `Skip`, everything else `Fatal`
    fn from(err: ShelfportError) -> Self {
        match err {
            ShelfportError::NotFound(message) => Step::Skip(SkipReason::not_found(message)),
            ShelfportError::Transform(message) => Step::Skip(SkipReason::transform(message)),
            other => Step::Fatal(other),
        }
    }
}

/// Category of a skipped item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipKind {
    /// No entity matched the identifier
    NotFound,
    /// More than one entity matched where only one is allowed
    Duplicate,
    /// A declared field could not be extracted
    Transform,
}

impl fmt::Display for SkipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotFound => "not_found",
            Self::Duplicate => "duplicate",
            Self::Transform => "transform",
        };
        f.write_str(name)
    }
}

/// Why an item was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipReason {
    pub kind: SkipKind,
    pub message: String,
}

impl SkipReason {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: SkipKind::NotFound,
            message: message.into(),
        }
    }

    pub fn duplicate(message: impl Into<String>) -> Self {
        Self {
            kind: SkipKind::Duplicate,
            message: message.into(),
        }
    }

    pub fn transform(message: impl Into<String>) -> Self {
        Self {
            kind: SkipKind::Transform,
            message: message.into(),
        }
    }
}

/// A skipped identifier, accumulated across the job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SkipRecord {
    /// Identifier value as uploaded
    pub identifier: String,

    /// Line the identifier was read from
    pub line: u64,

    /// Category of the failure
    pub kind: SkipKind,

    /// Human-readable reason
    pub reason: String,
}

impl SkipRecord {
    /// Build a skip record from the identifier and the reason it was skipped
    pub fn new(identifier: &IdentifierRecord, reason: SkipReason) -> Self {
        Self {
            identifier: identifier.value.clone(),
            line: identifier.line,
            kind: reason.kind,
            reason: reason.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification_into_step() {
        let step: Step<()> = ShelfportError::NotFound("B".to_string()).into();
        assert!(matches!(step, Step::Skip(ref r) if r.kind == SkipKind::NotFound));

        let step: Step<()> = ShelfportError::Transform("no barcode".to_string()).into();
        assert!(matches!(step, Step::Skip(ref r) if r.kind == SkipKind::Transform));

        let step: Step<()> = ShelfportError::Upstream {
            message: "connection refused".to_string(),
            retryable: false,
        }
        .into();
        assert!(matches!(step, Step::Fatal(ShelfportError::Upstream { .. })));
    }

    #[test]
    fn test_step_map_keeps_tags() {
        let ok: Step<i32> = Step::Ok(2);
        assert!(matches!(ok.map(|v| v * 2), Step::Ok(4)));

        let skip: Step<i32> = Step::Skip(SkipReason::duplicate("two users"));
        assert!(matches!(skip.map(|v| v * 2), Step::Skip(_)));
    }

    #[test]
    fn test_skip_record_from_identifier() {
        let record = IdentifierRecord::new("B", 2);
        let skip = SkipRecord::new(&record, SkipReason::not_found("no item with barcode B"));
        assert_eq!(skip.identifier, "B");
        assert_eq!(skip.line, 2);
        assert_eq!(skip.kind, SkipKind::NotFound);
        assert_eq!(skip.kind.to_string(), "not_found");
    }
}
