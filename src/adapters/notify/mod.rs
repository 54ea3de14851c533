//! Job outcome notifiers
//!
//! A finished job hands its [`JobOutcome`] to an [`OutcomeNotifier`]. The
//! outcome is already final at that point: a notifier that cannot deliver logs
//! the failure and the job result stays as it was.
//!
//! - [`LogNotifier`] - structured log event
//! - [`StorageNotifier`] - `outcome.json` next to the published objects
//! - [`WebhookNotifier`] - JSON POST to a status store
//! - [`CompositeNotifier`] - fans out to several notifiers

pub mod webhook;

pub use webhook::WebhookNotifier;

use crate::adapters::storage::ObjectStorage;
use crate::core::outcome::JobOutcome;
use crate::core::writer::ObjectNaming;
use crate::domain::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Destination for job outcomes
#[async_trait]
pub trait OutcomeNotifier: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Deliver one outcome
    async fn notify(&self, outcome: &JobOutcome) -> Result<()>;
}

/// Logs the outcome summary
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl OutcomeNotifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn notify(&self, outcome: &JobOutcome) -> Result<()> {
        outcome.log_summary();
        Ok(())
    }
}

/// Writes the outcome as pretty JSON to `{prefix}/{job_id}/outcome.json`
pub struct StorageNotifier {
    storage: Arc<dyn ObjectStorage>,
    naming: ObjectNaming,
}

impl StorageNotifier {
    pub fn new(storage: Arc<dyn ObjectStorage>, naming: ObjectNaming) -> Self {
        Self { storage, naming }
    }
}

#[async_trait]
impl OutcomeNotifier for StorageNotifier {
    fn name(&self) -> &'static str {
        "storage"
    }

    async fn notify(&self, outcome: &JobOutcome) -> Result<()> {
        let key = self.naming.outcome_key(&outcome.job_id);
        let body = serde_json::to_vec_pretty(outcome)?;
        self.storage
            .put_bytes(&key, body, "application/json")
            .await?;
        tracing::debug!(job_id = %outcome.job_id, key = %key, "Stored job outcome");
        Ok(())
    }
}

/// Delivers to every inner notifier in order
#[derive(Default)]
pub struct CompositeNotifier {
    notifiers: Vec<Box<dyn OutcomeNotifier>>,
}

impl CompositeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, notifier: Box<dyn OutcomeNotifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    /// Deliver to all notifiers; failures are logged and never propagated
    pub async fn notify_all(&self, outcome: &JobOutcome) {
        for notifier in &self.notifiers {
            if let Err(e) = notifier.notify(outcome).await {
                tracing::warn!(
                    job_id = %outcome.job_id,
                    notifier = notifier.name(),
                    error = %e,
                    "Failed to deliver job outcome"
                );
            }
        }
    }
}

#[async_trait]
impl OutcomeNotifier for CompositeNotifier {
    fn name(&self) -> &'static str {
        "composite"
    }

    async fn notify(&self, outcome: &JobOutcome) -> Result<()> {
        self.notify_all(outcome).await;
        Ok(())
    }
}
