//! Identifier source
//!
//! Parses an uploaded delimited file into a lazy sequence of
//! [`IdentifierRecord`]s. The column layout is declared up front by an
//! [`InputSchema`]; any line that does not match it is reported as
//! [`ShelfportError::MalformedInput`] together with its line number.

use crate::domain::{IdentifierRecord, Result, ShelfportError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Column/delimiter layout of an identifiers file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSchema {
    /// Field delimiter
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Whether the first non-blank line is a header
    #[serde(default)]
    pub has_header: bool,

    /// Declared column names, in file order
    #[serde(default = "default_columns")]
    pub columns: Vec<String>,

    /// Column holding the identifier
    #[serde(default = "default_identifier_column")]
    pub identifier_column: String,
}

impl InputSchema {
    /// One identifier per line, comma delimited, no header
    pub fn single_column() -> Self {
        Self {
            delimiter: default_delimiter(),
            has_header: false,
            columns: default_columns(),
            identifier_column: default_identifier_column(),
        }
    }

    /// Validates the schema
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.delimiter.is_ascii() {
            return Err(format!(
                "input.delimiter must be a single ASCII character, got '{}'",
                self.delimiter
            ));
        }
        if self.columns.is_empty() {
            return Err("input.columns cannot be empty".to_string());
        }
        self.identifier_index()?;
        Ok(())
    }

    fn identifier_index(&self) -> std::result::Result<usize, String> {
        self.columns
            .iter()
            .position(|c| c == &self.identifier_column)
            .ok_or_else(|| {
                format!(
                    "input.identifier_column '{}' is not one of the declared columns {:?}",
                    self.identifier_column, self.columns
                )
            })
    }
}

impl Default for InputSchema {
    fn default() -> Self {
        Self::single_column()
    }
}

fn default_delimiter() -> char {
    ','
}

fn default_columns() -> Vec<String> {
    vec![default_identifier_column()]
}

fn default_identifier_column() -> String {
    "identifier".to_string()
}

/// Lazy, finite sequence of identifiers read from a delimited stream
///
/// Construction fails when the stream holds no data rows, so a job is never
/// started on an empty upload.
pub struct IdentifierSource<R: Read> {
    records: csv::StringRecordsIntoIter<R>,
    identifier_index: usize,
    expected_fields: usize,
    pending: Option<IdentifierRecord>,
    remaining: Option<u64>,
    done: bool,
}

impl IdentifierSource<File> {
    /// Open an identifiers file on disk
    pub fn from_path(path: impl AsRef<Path>, schema: &InputSchema) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ShelfportError::MalformedInput {
            line: 0,
            reason: format!("cannot open {}: {e}", path.display()),
        })?;
        Self::from_reader(file, schema)
    }
}

impl<R: Read> IdentifierSource<R> {
    /// Wrap a byte stream
    ///
    /// # Errors
    ///
    /// Returns `MalformedInput` if the schema is invalid, the stream has no
    /// data rows, or its first data row does not match the schema.
    pub fn from_reader(reader: R, schema: &InputSchema) -> Result<Self> {
        schema.validate().map_err(ShelfportError::Configuration)?;
        let identifier_index = schema
            .identifier_index()
            .map_err(ShelfportError::Configuration)?;

        let records = csv::ReaderBuilder::new()
            .delimiter(schema.delimiter as u8)
            .has_headers(schema.has_header)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader)
            .into_records();

        let mut source = Self {
            records,
            identifier_index,
            expected_fields: schema.columns.len(),
            pending: None,
            remaining: None,
            done: false,
        };

        match source.read_next() {
            Some(Ok(first)) => source.pending = Some(first),
            Some(Err(e)) => return Err(e),
            None => {
                return Err(ShelfportError::MalformedInput {
                    line: 0,
                    reason: "input contains no identifiers".to_string(),
                })
            }
        }

        Ok(source)
    }

    /// Discard the first `count` data records
    ///
    /// Used to restart a source at an offset.
    pub fn skip_records(&mut self, count: u64) -> Result<()> {
        for _ in 0..count {
            match self.next() {
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e),
                None => break,
            }
        }
        Ok(())
    }

    /// Yield at most `count` more records
    pub fn take_records(mut self, count: u64) -> Self {
        self.remaining = Some(count);
        self
    }

    fn read_next(&mut self) -> Option<Result<IdentifierRecord>> {
        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(e) => {
                    let line = e.position().map(|p| p.line()).unwrap_or(0);
                    return Some(Err(ShelfportError::MalformedInput {
                        line,
                        reason: e.to_string(),
                    }));
                }
            };

            let line = record.position().map(|p| p.line()).unwrap_or(0);

            // Whitespace-only lines carry no identifier
            if record.iter().all(|field| field.is_empty()) {
                continue;
            }

            if record.len() != self.expected_fields {
                return Some(Err(ShelfportError::MalformedInput {
                    line,
                    reason: format!(
                        "expected {} field(s), found {}",
                        self.expected_fields,
                        record.len()
                    ),
                }));
            }

            let value = record.get(self.identifier_index).unwrap_or_default();
            if value.is_empty() {
                return Some(Err(ShelfportError::MalformedInput {
                    line,
                    reason: "identifier is empty".to_string(),
                }));
            }

            return Some(Ok(IdentifierRecord::new(value, line)));
        }
    }
}

impl<R: Read> Iterator for IdentifierSource<R> {
    type Item = Result<IdentifierRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.remaining == Some(0) {
            return None;
        }

        let item = match self.pending.take() {
            Some(record) => Some(Ok(record)),
            None => self.read_next(),
        };

        match &item {
            Some(Ok(_)) => {
                if let Some(remaining) = self.remaining.as_mut() {
                    *remaining -= 1;
                }
            }
            Some(Err(_)) | None => self.done = true,
        }

        item
    }
}

/// Count the data records in an identifiers file, validating every line
pub fn count_records(path: impl AsRef<Path>, schema: &InputSchema) -> Result<u64> {
    let mut count = 0;
    for record in IdentifierSource::from_path(path, schema)? {
        record?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn read_all(input: &str, schema: &InputSchema) -> Result<Vec<IdentifierRecord>> {
        IdentifierSource::from_reader(input.as_bytes(), schema)?.collect()
    }

    #[test]
    fn test_single_column_input() {
        let records = read_all("A\nB\nC\n", &InputSchema::single_column()).unwrap();
        let values: Vec<_> = records.iter().map(|r| r.value.as_str()).collect();
        assert_eq!(values, vec!["A", "B", "C"]);
        assert_eq!(records[0].line, 1);
        assert_eq!(records[2].line, 3);
    }

    #[test]
    fn test_blank_lines_are_ignored_and_lines_preserved() {
        let records = read_all("A\n\n   \nB\n", &InputSchema::single_column()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1], IdentifierRecord::new("B", 4));
    }

    #[test]
    fn test_header_and_identifier_column() {
        let schema = InputSchema {
            delimiter: ';',
            has_header: true,
            columns: vec!["note".to_string(), "barcode".to_string()],
            identifier_column: "barcode".to_string(),
        };
        let records = read_all("note;barcode\nfirst;111\nsecond; 222 \n", &schema).unwrap();
        assert_eq!(records[0], IdentifierRecord::new("111", 2));
        assert_eq!(records[1], IdentifierRecord::new("222", 3));
    }

    #[test]
    fn test_empty_input_is_refused() {
        let result = IdentifierSource::from_reader("".as_bytes(), &InputSchema::single_column());
        assert!(matches!(
            result,
            Err(ShelfportError::MalformedInput { line: 0, .. })
        ));

        let schema = InputSchema {
            has_header: true,
            ..InputSchema::single_column()
        };
        let result = IdentifierSource::from_reader("identifier\n".as_bytes(), &schema);
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_field_count_reports_line() {
        let schema = InputSchema::single_column();
        let mut source =
            IdentifierSource::from_reader("A\nB,extra\nC\n".as_bytes(), &schema).unwrap();
        assert_eq!(source.next().unwrap().unwrap().value, "A");
        match source.next() {
            Some(Err(ShelfportError::MalformedInput { line, .. })) => assert_eq!(line, 2),
            other => panic!("expected malformed input, got {other:?}"),
        }
        // The source stops after a malformed line
        assert!(source.next().is_none());
    }

    #[test]
    fn test_quoted_identifier() {
        let records = read_all("\"a,b\"\n", &InputSchema::single_column()).unwrap();
        assert_eq!(records[0].value, "a,b");
    }

    #[test]
    fn test_skip_and_take_records() {
        let mut source = IdentifierSource::from_reader(
            "A\nB\nC\nD\nE\n".as_bytes(),
            &InputSchema::single_column(),
        )
        .unwrap();
        source.skip_records(1).unwrap();
        let values: Vec<String> = source
            .take_records(2)
            .map(|r| r.unwrap().value)
            .collect();
        assert_eq!(values, vec!["B", "C"]);
    }

    #[test]
    fn test_identifier_column_must_be_declared() {
        let schema = InputSchema {
            identifier_column: "barcode".to_string(),
            ..InputSchema::single_column()
        };
        assert!(schema.validate().is_err());
        assert!(IdentifierSource::from_reader("A\n".as_bytes(), &schema).is_err());
    }

    #[test]
    fn test_count_records_from_path() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"A\nB\n\nC\n").unwrap();
        file.flush().unwrap();
        assert_eq!(count_records(file.path(), &InputSchema::single_column()).unwrap(), 3);
    }
}
