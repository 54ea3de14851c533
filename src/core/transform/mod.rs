//! Transform stage
//!
//! Projects a [`ResolvedEntity`] onto the declared columns. The stage is a pure
//! function of its inputs: a fixed list of [`FieldSpec`]s and a [`Predicate`].

pub mod fields;
pub mod filter;
pub mod format;

pub use fields::{FieldProcessor, FieldSpec};
pub use filter::{accept_all, predicate_from_rules, FilterRule, Predicate};
pub use format::OutputFormat;

use crate::domain::{ExportRow, ResolvedEntity, Step};

/// Entity-to-row projection
#[derive(Clone)]
pub struct TransformStage {
    fields: Vec<FieldSpec>,
    predicate: Predicate,
}

impl TransformStage {
    pub fn new(fields: Vec<FieldSpec>, predicate: Predicate) -> Self {
        Self { fields, predicate }
    }

    /// Column headers, in output order
    pub fn headers(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.header.clone()).collect()
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Transform one entity
    ///
    /// `Ok(None)` means the predicate rejected the entity; it is filtered, not
    /// skipped. A missing required field yields `Skip(Transform)`.
    pub fn transform(&self, entity: &ResolvedEntity) -> Step<Option<ExportRow>> {
        if !(self.predicate)(entity) {
            return Step::Ok(None);
        }

        let mut values = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            match field.extract(&entity.data) {
                Ok(value) => values.push(value),
                Err(e) => return Step::from(e),
            }
        }

        Step::Ok(Some(ExportRow {
            source: entity.identifier.clone(),
            values,
            document: entity.data.clone(),
        }))
    }
}

impl std::fmt::Debug for TransformStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformStage")
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}
