//! Record lookup collaborator
//!
//! The resolver never talks to a backend directly. It goes through the
//! [`LookupClient`] trait, which answers "which entities in this collection have
//! this field equal to this value". Two implementations are provided:
//!
//! - [`HttpLookupClient`] - FOLIO-style REST module queried with CQL
//! - [`MemoryLookupClient`] - JSON fixtures held in memory (offline runs, tests)

pub mod http;
pub mod memory;

pub use http::HttpLookupClient;
pub use memory::MemoryLookupClient;

use crate::domain::LookupError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Where entities of one kind live on the lookup service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTarget {
    /// Path relative to the service base URL (e.g. `users`, `item-storage/items`)
    pub endpoint: String,

    /// Key of the result array in a collection response (e.g. `users`)
    pub collection: String,
}

impl LookupTarget {
    pub fn new(endpoint: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            collection: collection.into(),
        }
    }
}

/// Query-by-identifier capability
///
/// Implementations must be safe for concurrent read-only use; several jobs may
/// share one client.
#[async_trait]
pub trait LookupClient: Send + Sync {
    /// Find every entity in `target` whose `field` equals `value`
    ///
    /// An empty vector means nothing matched; it is not an error.
    async fn find(
        &self,
        target: &LookupTarget,
        field: &str,
        value: &str,
    ) -> Result<Vec<Value>, LookupError>;

    /// Find entities for several values at once, grouped by value
    ///
    /// Values with no match may be absent from the map.
    async fn find_batch(
        &self,
        target: &LookupTarget,
        field: &str,
        values: &[String],
    ) -> Result<HashMap<String, Vec<Value>>, LookupError> {
        let mut found = HashMap::with_capacity(values.len());
        for value in values {
            let entities = self.find(target, field, value).await?;
            found.insert(value.clone(), entities);
        }
        Ok(found)
    }
}

/// Whether `entity` has `value` at the dot path `field`
///
/// Array-valued fields (e.g. `formerIds`) match when any element matches.
pub fn field_matches(entity: &Value, field: &str, value: &str) -> bool {
    let mut current = entity;
    for segment in field.split('.') {
        current = match current.get(segment) {
            Some(next) => next,
            None => return false,
        };
    }

    match current {
        Value::String(s) => s == value,
        Value::Number(n) => n.to_string() == value,
        Value::Array(items) => items.iter().any(|item| match item {
            Value::String(s) => s == value,
            Value::Number(n) => n.to_string() == value,
            _ => false,
        }),
        _ => false,
    }
}

/// Group batch results by the value each entity matched
pub(crate) fn group_by_value(
    entities: Vec<Value>,
    field: &str,
    values: &[String],
) -> HashMap<String, Vec<Value>> {
    let mut grouped: HashMap<String, Vec<Value>> = HashMap::with_capacity(values.len());
    for entity in entities {
        for value in values {
            if field_matches(&entity, field, value) {
                grouped
                    .entry(value.clone())
                    .or_default()
                    .push(entity.clone());
            }
        }
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_matches_scalar_and_nested() {
        let entity = json!({"barcode": "111", "personal": {"email": "a@b.org"}, "copy": 2});
        assert!(field_matches(&entity, "barcode", "111"));
        assert!(field_matches(&entity, "personal.email", "a@b.org"));
        assert!(field_matches(&entity, "copy", "2"));
        assert!(!field_matches(&entity, "barcode", "112"));
        assert!(!field_matches(&entity, "missing", "111"));
    }

    #[test]
    fn test_field_matches_array() {
        let entity = json!({"formerIds": ["old-1", "old-2"]});
        assert!(field_matches(&entity, "formerIds", "old-2"));
        assert!(!field_matches(&entity, "formerIds", "old-3"));
    }

    #[test]
    fn test_group_by_value() {
        let entities = vec![
            json!({"barcode": "1"}),
            json!({"barcode": "2"}),
            json!({"barcode": "2"}),
        ];
        let values = vec!["1".to_string(), "2".to_string(), "3".to_string()];
        let grouped = group_by_value(entities, "barcode", &values);
        assert_eq!(grouped["1"].len(), 1);
        assert_eq!(grouped["2"].len(), 2);
        assert!(!grouped.contains_key("3"));
    }
}
