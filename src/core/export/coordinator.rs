//! Export coordinator - wires the pipeline from configuration and runs jobs
//!
//! The coordinator owns the shared collaborators (lookup client, object
//! storage, notifiers). Everything per job (resolver, transform stage, writer,
//! runner) is built fresh for each run.

use super::segments::{merge_outcomes, plan_segments};
use crate::adapters::lookup::{HttpLookupClient, LookupClient, MemoryLookupClient};
use crate::adapters::notify::{CompositeNotifier, LogNotifier, StorageNotifier, WebhookNotifier};
use crate::adapters::storage::{LocalObjectStorage, ObjectStorage};
use crate::config::{LookupBackend, LookupConfig, ShelfportConfig, StorageBackend, StorageConfig};
use crate::core::outcome::JobOutcome;
use crate::core::resolve::{profile_for, EntityResolver, Resolver};
use crate::core::runner::{ChunkRunner, SkipBudget};
use crate::core::source::{count_records, IdentifierSource};
use crate::core::transform::{predicate_from_rules, OutputFormat, TransformStage};
use crate::core::writer::{
    compose_error_reports, compose_segments, ObjectNaming, StreamingWriter, WriterConfig,
};
use crate::domain::{JobId, Result, ShelfportError};
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;

/// Export coordinator
pub struct ExportCoordinator {
    config: ShelfportConfig,
    lookup: Arc<dyn LookupClient>,
    storage: Arc<dyn ObjectStorage>,
    notifier: CompositeNotifier,
    shutdown: watch::Receiver<bool>,
}

impl ExportCoordinator {
    /// Build the lookup client, storage and notifiers described by `config`
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unusable section, or the
    /// collaborator's error if it cannot be initialized.
    pub async fn new(config: ShelfportConfig, shutdown: watch::Receiver<bool>) -> Result<Self> {
        let lookup = build_lookup(&config.lookup)?;
        let storage = build_storage(&config.storage).await?;
        Self::with_components(config, lookup, storage, shutdown)
    }

    /// Use explicit collaborators instead of building them from configuration
    pub fn with_components(
        config: ShelfportConfig,
        lookup: Arc<dyn LookupClient>,
        storage: Arc<dyn ObjectStorage>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self> {
        let notifier = build_notifier(&config, storage.clone())?;
        tracing::debug!(notifiers = notifier.len(), "Export coordinator ready");
        Ok(Self {
            config,
            lookup,
            storage,
            notifier,
            shutdown,
        })
    }

    pub fn config(&self) -> &ShelfportConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn ObjectStorage> {
        &self.storage
    }

    fn naming(&self) -> ObjectNaming {
        ObjectNaming::new(self.config.storage.prefix.clone())
    }

    fn formats(&self) -> Vec<OutputFormat> {
        let mut formats = self.config.job.formats.clone();
        formats.sort();
        formats.dedup();
        formats
    }

    fn writer_config(&self, job_id: &JobId) -> WriterConfig {
        WriterConfig {
            job_id: job_id.clone(),
            formats: self.formats(),
            staging_dir: PathBuf::from(&self.config.storage.staging_dir),
            naming: self.naming(),
        }
    }

    fn resolver(&self) -> Result<Arc<dyn Resolver>> {
        let resolver = EntityResolver::new(
            self.lookup.clone(),
            profile_for(self.config.job.entity_kind),
            self.config.job.identifier_type,
            self.config.lookup.retry.clone(),
        )?;
        Ok(Arc::new(resolver))
    }

    fn transform_stage(&self) -> TransformStage {
        TransformStage::new(
            self.config.transform.fields_for(self.config.job.entity_kind),
            predicate_from_rules(self.config.transform.filters.clone()),
        )
    }

    fn runner(
        &self,
        job_id: &JobId,
        transform: TransformStage,
        writer_config: WriterConfig,
    ) -> Result<ChunkRunner> {
        let writer =
            StreamingWriter::new(writer_config, &transform.headers(), self.storage.clone())?;
        Ok(ChunkRunner::new(
            job_id.clone(),
            self.config.job.chunk_config(),
            self.resolver()?,
            transform,
            Box::new(writer),
        )
        .with_cancellation(self.shutdown.clone()))
    }

    /// Run a job with the configured number of segments
    pub async fn execute(&self, job_id: JobId, input: &Path) -> Result<JobOutcome> {
        let segments = self.config.job.segments;
        if segments > 1 {
            self.run_segmented(job_id, input, segments).await
        } else {
            self.run(job_id, input).await
        }
    }

    /// Run one job over the whole input
    ///
    /// # Errors
    ///
    /// Returns `MalformedInput` when the input is empty or unreadable; the job
    /// never starts and nothing is published. Once started, the job always
    /// ends in an outcome.
    pub async fn run(&self, job_id: JobId, input: &Path) -> Result<JobOutcome> {
        let source = IdentifierSource::from_path(input, &self.config.input)?;
        let runner = self.runner(&job_id, self.transform_stage(), self.writer_config(&job_id))?;

        tracing::info!(
            job_id = %job_id,
            input = %input.display(),
            entity_kind = %self.config.job.entity_kind,
            identifier_type = self.config.job.identifier_type.as_str(),
            "Starting export job"
        );

        let outcome = runner.run(source).await;
        self.notifier.notify_all(&outcome).await;
        Ok(outcome)
    }

    /// Run one job as `segments` concurrent runners over disjoint ranges
    ///
    /// The whole input is validated before any segment starts. Each segment
    /// publishes parts; the parts are then composed per format into the same
    /// objects a single runner would publish.
    ///
    /// All segments draw on one [`SkipBudget`]. When a chunk of segment `k`
    /// exceeds it, segments after `k` stop and their parts are left out, so
    /// the composed output never holds rows from past the failing chunk.
    pub async fn run_segmented(
        &self,
        job_id: JobId,
        input: &Path,
        segments: usize,
    ) -> Result<JobOutcome> {
        if segments <= 1 {
            return self.run(job_id, input).await;
        }

        let total = count_records(input, &self.config.input)?;
        let ranges = plan_segments(total, segments);
        let transform = self.transform_stage();
        let headers = transform.headers();
        let base = self.writer_config(&job_id);
        let budget = SkipBudget::new(self.config.job.skip_limit);

        tracing::info!(
            job_id = %job_id,
            input = %input.display(),
            total,
            segments = ranges.len(),
            "Starting segmented export job"
        );

        let mut runs = Vec::with_capacity(ranges.len());
        for range in &ranges {
            let mut source = IdentifierSource::from_path(input, &self.config.input)?;
            source.skip_records(range.offset)?;
            let source = source.take_records(range.len);
            let runner = self
                .runner(&job_id, transform.clone(), base.segment(range.index))?
                .with_skip_budget(budget.clone(), range.index);
            runs.push(runner.run(source));
        }
        let mut outcomes = join_all(runs).await;

        let kept = match budget.exceeded_in() {
            Some(segment) => segment + 1,
            None => ranges.len(),
        };
        if kept < outcomes.len() {
            tracing::warn!(
                job_id = %job_id,
                exceeded_in = kept - 1,
                discarded = outcomes.len() - kept,
                "Skip limit exceeded, leaving out later segments"
            );
            outcomes.truncate(kept);
        }

        let naming = self.naming();
        let mut published = Vec::new();
        let mut errors = Vec::new();
        for format in self.formats() {
            match compose_segments(
                self.storage.as_ref(),
                &naming,
                &job_id,
                format,
                kept,
                &headers,
            )
            .await
            {
                Ok(Some(object)) => published.push(object),
                Ok(None) => {}
                Err(e) => errors.push(format!("composing {format} output failed: {e}")),
            }
        }
        if outcomes.iter().any(|o| o.skipped > 0) {
            match compose_error_reports(self.storage.as_ref(), &naming, &job_id, kept).await {
                Ok(Some(object)) => published.push(object),
                Ok(None) => {}
                Err(e) => errors.push(format!("composing skip report failed: {e}")),
            }
        }

        let outcome = merge_outcomes(
            &job_id,
            outcomes,
            published,
            errors,
            self.config.job.skip_limit,
        );
        self.notifier.notify_all(&outcome).await;
        Ok(outcome)
    }
}

/// Build the configured lookup client
pub fn build_lookup(config: &LookupConfig) -> Result<Arc<dyn LookupClient>> {
    match config.backend {
        LookupBackend::Http => {
            let client = HttpLookupClient::new(config)?;
            tracing::info!(base_url = %client.base_url(), "Using HTTP lookup service");
            Ok(Arc::new(client))
        }
        LookupBackend::Memory => {
            let path = config.fixtures_path.as_deref().ok_or_else(|| {
                ShelfportError::Configuration(
                    "lookup.fixtures_path is required for the memory backend".to_string(),
                )
            })?;
            tracing::info!(fixtures = %path, "Using in-memory lookup fixtures");
            Ok(Arc::new(MemoryLookupClient::from_file(path)?))
        }
    }
}

/// Build the configured object storage
pub async fn build_storage(config: &StorageConfig) -> Result<Arc<dyn ObjectStorage>> {
    match config.backend {
        StorageBackend::Local => {
            let storage = LocalObjectStorage::new(&config.root)?;
            tracing::info!(root = %config.root, "Using local object storage");
            Ok(Arc::new(storage))
        }
        #[cfg(feature = "s3")]
        StorageBackend::S3 => Ok(Arc::new(
            crate::adapters::storage::S3ObjectStorage::new(config).await?,
        )),
        #[cfg(not(feature = "s3"))]
        StorageBackend::S3 => Err(ShelfportError::Configuration(
            "storage.backend = \"s3\" requires building with the `s3` feature".to_string(),
        )),
    }
}

fn build_notifier(
    config: &ShelfportConfig,
    storage: Arc<dyn ObjectStorage>,
) -> Result<CompositeNotifier> {
    let settings = &config.notification;
    let mut notifier = CompositeNotifier::new();
    if settings.log {
        notifier = notifier.with(Box::new(LogNotifier));
    }
    if settings.storage {
        notifier = notifier.with(Box::new(StorageNotifier::new(
            storage,
            ObjectNaming::new(config.storage.prefix.clone()),
        )));
    }
    if let Some(url) = &settings.webhook_url {
        notifier = notifier.with(Box::new(WebhookNotifier::new(
            url.clone(),
            settings.webhook_timeout_seconds,
        )?));
    }
    Ok(notifier)
}
