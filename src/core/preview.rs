//! Preview of published CSV output

use crate::adapters::storage::ObjectStorage;
use crate::domain::{Result, ShelfportError};
use serde::Serialize;

/// Header and first rows of a published CSV object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Read the header and up to `limit` data rows of the CSV object at `key`
///
/// # Errors
///
/// Fails if the object does not exist or is not valid CSV.
pub async fn preview(storage: &dyn ObjectStorage, key: &str, limit: usize) -> Result<Preview> {
    let bytes = storage.get(key).await?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes.as_slice());

    let headers = reader
        .headers()
        .map_err(|e| ShelfportError::Serialization(format!("{key}: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::with_capacity(limit.min(1024));
    for record in reader.records().take(limit) {
        let record = record.map_err(|e| ShelfportError::Serialization(format!("{key}: {e}")))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Preview { headers, rows })
}
