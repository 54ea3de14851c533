//! Records that flow through the pipeline
//!
//! An [`IdentifierRecord`] is read from the uploaded file, resolved into one or
//! more [`ResolvedEntity`] values, and each entity becomes at most one
//! [`ExportRow`].

use super::ids::EntityKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One raw input token and the line it came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentifierRecord {
    /// Identifier value, trimmed
    pub value: String,

    /// 1-based line number in the uploaded file
    pub line: u64,
}

impl IdentifierRecord {
    /// Create a new identifier record
    pub fn new(value: impl Into<String>, line: u64) -> Self {
        Self {
            value: value.into(),
            line,
        }
    }
}

/// A domain entity fetched for an identifier
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEntity {
    /// Identifier that produced this entity
    pub identifier: IdentifierRecord,

    /// Kind of entity
    pub kind: EntityKind,

    /// Entity record as returned by the lookup collaborator
    pub data: Value,
}

impl ResolvedEntity {
    /// Create a new resolved entity
    pub fn new(identifier: IdentifierRecord, kind: EntityKind, data: Value) -> Self {
        Self {
            identifier,
            kind,
            data,
        }
    }
}

/// Export-ready row derived from one entity
///
/// `values` follows the declared column order, one value per column. `document`
/// carries the full entity for structured encodings. Every output format renders
/// the same row, which keeps formats in row-order lockstep.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    /// Identifier that produced the row
    pub source: IdentifierRecord,

    /// Column values in header order
    pub values: Vec<String>,

    /// Full entity document
    pub document: Value,
}
