//! Record resolver
//!
//! Turns an [`IdentifierRecord`] into the entities it names by querying a
//! [`LookupClient`]. The resolver never writes to the lookup service.
//!
//! Outcomes are tagged with [`Step`]:
//! - no match: `Skip(NotFound)`
//! - several matches where the profile allows one: `Skip(Duplicate)`
//! - any lookup failure (after retries): `Fatal(Upstream)`

pub mod profiles;

pub use profiles::{
    profile_for, EntityProfile, HoldingsProfile, ItemProfile, PurchaseOrderProfile, UserProfile,
};

use crate::adapters::lookup::{LookupClient, LookupTarget};
use crate::domain::{
    IdentifierRecord, IdentifierType, LookupError, ResolvedEntity, Result, ShelfportError,
    SkipReason, Step,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Identifier-to-entity resolution
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Warm up before a chunk is resolved item by item
    async fn prefetch(&self, _records: &[IdentifierRecord]) {}

    /// Resolve one identifier
    async fn resolve(&self, record: &IdentifierRecord) -> Step<Vec<ResolvedEntity>>;
}

/// Which upstream failures are re-attempted, and how
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum re-attempts after the first failure
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Fixed delay between attempts
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    #[serde(default)]
    pub retry_timeouts: bool,

    #[serde(default)]
    pub retry_unavailable: bool,
}

impl RetryPolicy {
    /// Never retry
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            delay_ms: 0,
            retry_timeouts: false,
            retry_unavailable: false,
        }
    }

    /// Whether this failure may be re-attempted
    pub fn is_retryable(&self, error: &LookupError) -> bool {
        match error {
            LookupError::Timeout(_) => self.retry_timeouts,
            LookupError::Unavailable(_) => self.retry_unavailable,
            LookupError::Rejected { .. } | LookupError::InvalidResponse(_) => false,
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.max_retries > 10 {
            return Err(format!(
                "lookup.retry.max_retries must be <= 10, got {}",
                self.max_retries
            ));
        }
        if self.delay_ms > 60_000 {
            return Err(format!(
                "lookup.retry.delay_ms must be <= 60000, got {}",
                self.delay_ms
            ));
        }
        Ok(())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            delay_ms: default_delay_ms(),
            retry_timeouts: false,
            retry_unavailable: false,
        }
    }
}

fn default_max_retries() -> usize {
    3
}

fn default_delay_ms() -> u64 {
    1000
}

/// Resolver for one entity kind and identifier type
pub struct EntityResolver {
    client: Arc<dyn LookupClient>,
    profile: Box<dyn EntityProfile>,
    identifier_type: IdentifierType,
    field: &'static str,
    target: LookupTarget,
    retry: RetryPolicy,
    // Results of the last prefetch, valid for the chunk being resolved
    cache: Mutex<HashMap<String, Vec<Value>>>,
}

impl EntityResolver {
    /// Create a resolver
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the profile cannot be queried by
    /// `identifier_type`.
    pub fn new(
        client: Arc<dyn LookupClient>,
        profile: Box<dyn EntityProfile>,
        identifier_type: IdentifierType,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let field = profile.query_field(identifier_type).ok_or_else(|| {
            let supported: Vec<&str> = profile
                .supported_identifiers()
                .iter()
                .map(IdentifierType::as_str)
                .collect();
            ShelfportError::Configuration(format!(
                "{} records cannot be looked up by {identifier_type}; supported: {}",
                profile.kind(),
                supported.join(", ")
            ))
        })?;
        let target = profile.target();

        Ok(Self {
            client,
            profile,
            identifier_type,
            field,
            target,
            retry,
            cache: Mutex::new(HashMap::new()),
        })
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<Value>>> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn find_with_retry(&self, value: &str) -> std::result::Result<Vec<Value>, LookupError> {
        let mut attempt = 0;
        loop {
            match self.client.find(&self.target, self.field, value).await {
                Ok(found) => return Ok(found),
                Err(e) if self.retry.is_retryable(&e) && attempt < self.retry.max_retries => {
                    attempt += 1;
                    crate::log_retry_attempt!(attempt, self.retry.max_retries, e);
                    tokio::time::sleep(Duration::from_millis(self.retry.delay_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn classify(
        &self,
        record: &IdentifierRecord,
        matches: Vec<Value>,
    ) -> Step<Vec<ResolvedEntity>> {
        let kind = self.profile.kind();
        if matches.is_empty() {
            return Step::Skip(SkipReason::not_found(format!(
                "no {kind} found by {} '{}'",
                self.identifier_type, record.value
            )));
        }
        if matches.len() > 1 && !self.profile.allows_multiple(self.identifier_type) {
            return Step::Skip(SkipReason::duplicate(format!(
                "{} {kind} records match {} '{}'",
                matches.len(),
                self.identifier_type,
                record.value
            )));
        }
        Step::Ok(
            matches
                .into_iter()
                .map(|data| ResolvedEntity::new(record.clone(), kind, data))
                .collect(),
        )
    }
}

#[async_trait]
impl Resolver for EntityResolver {
    async fn prefetch(&self, records: &[IdentifierRecord]) {
        self.cache().clear();
        if records.is_empty() {
            return;
        }

        let mut values: Vec<String> = records.iter().map(|r| r.value.clone()).collect();
        values.sort();
        values.dedup();

        match self
            .client
            .find_batch(&self.target, self.field, &values)
            .await
        {
            Ok(mut found) => {
                let mut cache = self.cache();
                for value in values {
                    let entities = found.remove(&value).unwrap_or_default();
                    cache.insert(value, entities);
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    identifiers = values.len(),
                    "Batch lookup failed, falling back to per-identifier lookups"
                );
            }
        }
    }

    async fn resolve(&self, record: &IdentifierRecord) -> Step<Vec<ResolvedEntity>> {
        let cached = self.cache().get(&record.value).cloned();
        let matches = match cached {
            Some(matches) => matches,
            None => match self.find_with_retry(&record.value).await {
                Ok(matches) => matches,
                Err(e) => {
                    return Step::Fatal(ShelfportError::Upstream {
                        message: format!(
                            "lookup of {} '{}' (line {}) failed: {e}",
                            self.identifier_type, record.value, record.line
                        ),
                        retryable: self.retry.is_retryable(&e),
                    })
                }
            },
        };
        self.classify(record, matches)
    }
}

impl std::fmt::Debug for EntityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityResolver")
            .field("profile", &self.profile)
            .field("identifier_type", &self.identifier_type)
            .field("target", &self.target)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
