//! Field extraction specs
//!
//! A [`FieldSpec`] names one output column: its header, where the value lives
//! in the entity document, and how the raw value is turned into a cell.

use crate::domain::{Result, ShelfportError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Separator used when an array is rendered without an explicit `Join`
pub const DEFAULT_LIST_SEPARATOR: &str = ";";

/// Post-processing applied to an extracted value
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldProcessor {
    /// Render the value as-is
    #[default]
    Identity,

    /// Keep at most `max_chars` characters
    Truncate { max_chars: usize },

    /// Map raw codes to display labels
    EnumLabel {
        labels: BTreeMap<String, String>,
        #[serde(default)]
        fallback: Option<String>,
    },

    /// Join array elements with `separator`
    Join { separator: String },
}

impl FieldProcessor {
    fn apply(&self, value: &Value) -> std::result::Result<String, String> {
        match self {
            FieldProcessor::Identity => Ok(render_value(value, DEFAULT_LIST_SEPARATOR)),
            FieldProcessor::Truncate { max_chars } => Ok(render_value(
                value,
                DEFAULT_LIST_SEPARATOR,
            )
            .chars()
            .take(*max_chars)
            .collect()),
            FieldProcessor::EnumLabel { labels, fallback } => {
                let raw = render_value(value, DEFAULT_LIST_SEPARATOR);
                match labels.get(&raw).or(fallback.as_ref()) {
                    Some(label) => Ok(label.clone()),
                    None => Err(format!("no label for value '{raw}'")),
                }
            }
            FieldProcessor::Join { separator } => Ok(render_value(value, separator)),
        }
    }
}

/// One output column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Column header
    pub header: String,

    /// Dot path into the entity document; numeric segments index arrays
    pub path: String,

    #[serde(default)]
    pub processor: FieldProcessor,

    /// Render a missing value as an empty cell instead of failing the item
    #[serde(default)]
    pub optional: bool,
}

impl FieldSpec {
    pub fn new(header: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            path: path.into(),
            processor: FieldProcessor::Identity,
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_processor(mut self, processor: FieldProcessor) -> Self {
        self.processor = processor;
        self
    }

    /// Extract and render this field from an entity document
    ///
    /// # Errors
    ///
    /// Returns `ShelfportError::Transform` when a required value is missing or
    /// the processor cannot render it.
    pub fn extract(&self, document: &Value) -> Result<String> {
        match lookup_path(document, &self.path) {
            Some(value) => self.processor.apply(value).map_err(|reason| {
                ShelfportError::Transform(format!("field '{}': {reason}", self.header))
            }),
            None if self.optional => Ok(String::new()),
            None => Err(ShelfportError::Transform(format!(
                "missing required field '{}' at '{}'",
                self.header, self.path
            ))),
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.header.trim().is_empty() {
            return Err("transform.fields header cannot be empty".to_string());
        }
        if self.path.trim().is_empty() || self.path.split('.').any(str::is_empty) {
            return Err(format!(
                "transform.fields '{}' has an invalid path '{}'",
                self.header, self.path
            ));
        }
        if let FieldProcessor::Truncate { max_chars: 0 } = self.processor {
            return Err(format!(
                "transform.fields '{}' truncates to zero characters",
                self.header
            ));
        }
        Ok(())
    }
}

/// Resolve a dot path; `null` counts as missing
pub fn lookup_path<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = document;
    for segment in path.split('.') {
        current = match current {
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            Value::Object(map) => map.get(segment)?,
            _ => return None,
        };
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// Render a JSON value as a single cell
pub fn render_value(value: &Value, separator: &str) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(|item| render_value(item, separator))
            .collect::<Vec<_>>()
            .join(separator),
        Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn item() -> Value {
        json!({
            "barcode": "111",
            "status": {"name": "Available"},
            "notes": [{"note": "first"}, {"note": "second"}],
            "formerIds": ["a", "b"],
            "copyNumber": 3,
            "discoverySuppress": false,
            "missing": null
        })
    }

    #[test_case("barcode", "111"; "top level")]
    #[test_case("status.name", "Available"; "nested")]
    #[test_case("notes.1.note", "second"; "array index")]
    #[test_case("formerIds", "a;b"; "array default separator")]
    #[test_case("copyNumber", "3"; "number")]
    #[test_case("discoverySuppress", "false"; "boolean")]
    fn test_identity_extraction(path: &str, expected: &str) {
        let spec = FieldSpec::new("col", path);
        assert_eq!(spec.extract(&item()).unwrap(), expected);
    }

    #[test]
    fn test_missing_required_field_is_transform_error() {
        let spec = FieldSpec::new("Effective location", "effectiveLocation.name");
        let err = spec.extract(&item()).unwrap_err();
        assert!(matches!(err, ShelfportError::Transform(_)));
        assert!(err.is_skippable());

        // null is treated as missing
        assert!(FieldSpec::new("m", "missing").extract(&item()).is_err());
    }

    #[test]
    fn test_optional_field_renders_empty() {
        let spec = FieldSpec::new("Effective location", "effectiveLocation.name").optional();
        assert_eq!(spec.extract(&item()).unwrap(), "");
    }

    #[test]
    fn test_processors() {
        let truncate = FieldSpec::new("b", "barcode")
            .with_processor(FieldProcessor::Truncate { max_chars: 2 });
        assert_eq!(truncate.extract(&item()).unwrap(), "11");

        let join = FieldSpec::new("f", "formerIds").with_processor(FieldProcessor::Join {
            separator: " | ".to_string(),
        });
        assert_eq!(join.extract(&item()).unwrap(), "a | b");

        let mut labels = BTreeMap::new();
        labels.insert("Available".to_string(), "On shelf".to_string());
        let label = FieldSpec::new("s", "status.name").with_processor(FieldProcessor::EnumLabel {
            labels: labels.clone(),
            fallback: None,
        });
        assert_eq!(label.extract(&item()).unwrap(), "On shelf");

        let unknown = FieldSpec::new("b", "barcode").with_processor(FieldProcessor::EnumLabel {
            labels: labels.clone(),
            fallback: None,
        });
        assert!(unknown.extract(&item()).is_err());

        let fallback = FieldSpec::new("b", "barcode").with_processor(FieldProcessor::EnumLabel {
            labels,
            fallback: Some("Other".to_string()),
        });
        assert_eq!(fallback.extract(&item()).unwrap(), "Other");
    }

    #[test]
    fn test_field_spec_from_toml() {
        let spec: FieldSpec = toml::from_str(
            r#"
header = "Status"
path = "status.name"
optional = true
processor = { type = "truncate", max_chars = 4 }
"#,
        )
        .unwrap();
        assert!(spec.optional);
        assert_eq!(spec.processor, FieldProcessor::Truncate { max_chars: 4 });
        assert_eq!(spec.extract(&item()).unwrap(), "Avai");
    }

    #[test]
    fn test_validate() {
        assert!(FieldSpec::new("Barcode", "barcode").validate().is_ok());
        assert!(FieldSpec::new("", "barcode").validate().is_err());
        assert!(FieldSpec::new("Bad", "status..name").validate().is_err());
    }
}
