//! In-memory lookup client
//!
//! Serves entities from JSON fixtures. The fixture file is an object whose keys
//! are collection names and whose values are arrays of entities:
//!
//! ```json
//! { "items": [ { "id": "1", "barcode": "111" } ] }
//! ```

use super::{field_matches, LookupClient, LookupTarget};
use crate::domain::{LookupError, Result, ShelfportError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Lookup client backed by in-memory collections
#[derive(Debug, Default)]
pub struct MemoryLookupClient {
    collections: HashMap<String, Vec<Value>>,
    failures: Mutex<HashMap<String, FailurePlan>>,
    calls: AtomicUsize,
    batch_calls: AtomicUsize,
}

#[derive(Debug, Clone)]
struct FailurePlan {
    error: LookupError,
    /// `None` fails forever
    remaining: Option<usize>,
}

impl MemoryLookupClient {
    /// Create an empty client
    pub fn new() -> Self {
        Self::default()
    }

    /// Load collections from a JSON fixture file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ShelfportError::Configuration(format!(
                "Failed to read lookup fixtures {}: {e}",
                path.display()
            ))
        })?;
        let collections: HashMap<String, Vec<Value>> = serde_json::from_str(&contents)?;
        Ok(Self {
            collections,
            ..Self::default()
        })
    }

    /// Add entities to a collection
    pub fn with_entities(mut self, collection: &str, entities: Vec<Value>) -> Self {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .extend(entities);
        self
    }

    /// Make every lookup of `value` fail with `error`
    pub fn fail_on(self, value: &str, error: LookupError) -> Self {
        self.lock_failures().insert(
            value.to_string(),
            FailurePlan {
                error,
                remaining: None,
            },
        );
        self
    }

    /// Make the next `times` lookups of `value` fail with `error`
    pub fn fail_times(self, value: &str, error: LookupError, times: usize) -> Self {
        self.lock_failures().insert(
            value.to_string(),
            FailurePlan {
                error,
                remaining: Some(times),
            },
        );
        self
    }

    /// Number of single-value lookups served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of batch lookups served so far
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    fn lock_failures(&self) -> std::sync::MutexGuard<'_, HashMap<String, FailurePlan>> {
        // A poisoned lock only means a test thread panicked mid-update
        self.failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn planned_failure(&self, value: &str) -> Option<LookupError> {
        let mut failures = self.lock_failures();
        let plan = failures.get_mut(value)?;
        match plan.remaining {
            None => Some(plan.error.clone()),
            Some(0) => None,
            Some(ref mut n) => {
                *n -= 1;
                Some(plan.error.clone())
            }
        }
    }

    fn matching(&self, target: &LookupTarget, field: &str, value: &str) -> Vec<Value> {
        self.collections
            .get(&target.collection)
            .map(|entities| {
                entities
                    .iter()
                    .filter(|entity| field_matches(entity, field, value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl LookupClient for MemoryLookupClient {
    async fn find(
        &self,
        target: &LookupTarget,
        field: &str,
        value: &str,
    ) -> std::result::Result<Vec<Value>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.planned_failure(value) {
            return Err(error);
        }
        Ok(self.matching(target, field, value))
    }

    async fn find_batch(
        &self,
        target: &LookupTarget,
        field: &str,
        values: &[String],
    ) -> std::result::Result<HashMap<String, Vec<Value>>, LookupError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        for value in values {
            if let Some(error) = self.planned_failure(value) {
                return Err(error);
            }
        }
        Ok(values
            .iter()
            .map(|value| (value.clone(), self.matching(target, field, value)))
            .collect())
    }
}
