//! Output encodings
//!
//! Every format renders the same [`ExportRow`], so row *i* of the CSV file and
//! line *i* of the JSON file always describe the same entity.

use crate::domain::{ExportRow, Result, ShelfportError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target encoding of a staged output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum OutputFormat {
    /// Delimited rows with a header line
    Csv,
    /// Newline-delimited JSON, one entity document per line
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "text/csv",
            OutputFormat::Json => "application/x-ndjson",
        }
    }

    /// Bytes written once at the top of a staged file, if any
    pub fn header(&self, headers: &[String]) -> Result<Option<Vec<u8>>> {
        match self {
            OutputFormat::Csv => csv_line(headers).map(Some),
            OutputFormat::Json => Ok(None),
        }
    }

    /// Render one row, including its trailing newline
    pub fn render(&self, row: &ExportRow) -> Result<Vec<u8>> {
        match self {
            OutputFormat::Csv => csv_line(&row.values),
            OutputFormat::Json => {
                let mut line = serde_json::to_vec(&row.document)?;
                line.push(b'\n');
                Ok(line)
            }
        }
    }

    /// Render a batch of rows into one buffer
    ///
    /// Nothing is returned unless every row rendered.
    pub fn render_rows(&self, rows: &[ExportRow]) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        for row in rows {
            buffer.extend(self.render(row)?);
        }
        Ok(buffer)
    }
}

fn csv_line(values: &[String]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(values)?;
    writer
        .into_inner()
        .map_err(|e| ShelfportError::Serialization(format!("CSV error: {e}")))
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" | "ndjson" => Ok(OutputFormat::Json),
            "edifact" | "edi" => Err(
                "EDIFACT purchase-order export is not supported; export orders as csv or json"
                    .to_string(),
            ),
            other => Err(format!("Unknown output format '{other}'. Must be one of: csv, json")),
        }
    }
}

impl TryFrom<String> for OutputFormat {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IdentifierRecord;
    use serde_json::json;

    fn row(values: &[&str]) -> ExportRow {
        ExportRow {
            source: IdentifierRecord::new("A", 1),
            values: values.iter().map(|v| v.to_string()).collect(),
            document: json!({"id": "1", "barcode": "A"}),
        }
    }

    #[test]
    fn test_csv_header_and_quoting() {
        let header = OutputFormat::Csv
            .header(&["Barcode".to_string(), "Title".to_string()])
            .unwrap()
            .unwrap();
        assert_eq!(header, b"Barcode,Title\n");

        let line = OutputFormat::Csv.render(&row(&["A", "Moby, Dick"])).unwrap();
        assert_eq!(String::from_utf8(line).unwrap(), "A,\"Moby, Dick\"\n");
    }

    #[test]
    fn test_json_renders_document_line() {
        assert!(OutputFormat::Json.header(&["Barcode".to_string()]).unwrap().is_none());
        let line = OutputFormat::Json.render(&row(&["A"])).unwrap();
        let text = String::from_utf8(line).unwrap();
        assert!(text.ends_with('\n'));
        let parsed: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(parsed["barcode"], "A");
    }

    #[test]
    fn test_render_rows_keeps_order() {
        let rows = vec![row(&["1"]), row(&["2"]), row(&["3"])];
        let bytes = OutputFormat::Csv.render_rows(&rows).unwrap();
        assert_eq!(bytes, b"1\n2\n3\n");
    }

    #[test]
    fn test_from_str() {
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert_eq!("ndjson".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("xml".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_edifact_is_refused_by_name() {
        let err = "EDIFACT".parse::<OutputFormat>().unwrap_err();
        assert!(err.contains("EDIFACT purchase-order export is not supported"));

        let err = serde_json::from_str::<OutputFormat>("\"edifact\"").unwrap_err();
        assert!(err.to_string().contains("not supported"));
        assert_eq!(
            serde_json::from_str::<OutputFormat>("\"csv\"").unwrap(),
            OutputFormat::Csv
        );
    }
}
