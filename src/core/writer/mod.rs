//! Multi-format streaming writer
//!
//! Rows are staged in one local file per output format and promoted to object
//! storage once the job is over. A chunk is appended to every format or to
//! none: if any format fails, all staged files are cut back to the length they
//! had after the previous chunk.
//!
//! Object keys:
//! - `{prefix}/{job_id}/{job_id}.{ext}` for a whole job
//! - `{prefix}/{job_id}/parts/{index:05}.{ext}` for one segment of a job
//! - `{prefix}/{job_id}/{job_id}-errors.csv` for skipped identifiers

pub mod staged;

pub use staged::StagedOutput;

use crate::adapters::storage::{
    join_key, sha256_bytes, sha256_file, ObjectStorage, PublishedObject,
};
use crate::core::transform::OutputFormat;
use crate::domain::{ExportRow, JobId, Result, ShelfportError, SkipRecord};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// Name used for the skip report in [`PublishedObject::format`]
pub const ERRORS_FORMAT: &str = "errors";

/// Where a committed chunk goes
///
/// [`StreamingWriter`] is the production implementation; the runner only
/// depends on this trait.
#[async_trait]
pub trait ChunkSink: Send {
    /// Append every row of a chunk to every format, or nothing at all
    async fn append_chunk(&mut self, rows: &[ExportRow]) -> Result<()>;

    /// Close staged outputs and publish them; may only succeed once
    async fn finalize(&mut self) -> Result<Vec<PublishedObject>>;

    /// Publish the skip report
    async fn publish_errors(&mut self, skips: &[SkipRecord]) -> Result<Option<PublishedObject>>;
}

/// Object key layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectNaming {
    pub prefix: String,
    /// Segment index when the job is split into parts
    pub segment: Option<usize>,
}

impl ObjectNaming {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            segment: None,
        }
    }

    /// The same layout, addressing segment `index`
    pub fn segment(&self, index: usize) -> Self {
        Self {
            prefix: self.prefix.clone(),
            segment: Some(index),
        }
    }

    /// Key of this writer's output for `format`
    pub fn output_key(&self, job_id: &JobId, format: OutputFormat) -> String {
        match self.segment {
            Some(index) => self.segment_key(job_id, format, index),
            None => self.final_key(job_id, format),
        }
    }

    /// Key of the job-level output for `format`
    pub fn final_key(&self, job_id: &JobId, format: OutputFormat) -> String {
        join_key(&[
            &self.prefix,
            job_id.as_str(),
            &format!("{job_id}.{}", format.extension()),
        ])
    }

    pub fn segment_key(&self, job_id: &JobId, format: OutputFormat, index: usize) -> String {
        join_key(&[
            &self.prefix,
            job_id.as_str(),
            "parts",
            &format!("{index:05}.{}", format.extension()),
        ])
    }

    pub fn errors_key(&self, job_id: &JobId) -> String {
        match self.segment {
            Some(index) => join_key(&[
                &self.prefix,
                job_id.as_str(),
                "parts",
                &format!("{index:05}-errors.csv"),
            ]),
            None => join_key(&[&self.prefix, job_id.as_str(), &format!("{job_id}-errors.csv")]),
        }
    }

    pub fn outcome_key(&self, job_id: &JobId) -> String {
        join_key(&[&self.prefix, job_id.as_str(), "outcome.json"])
    }
}

/// Writer settings for one job or one segment of a job
#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub job_id: JobId,
    pub formats: Vec<OutputFormat>,
    pub staging_dir: PathBuf,
    pub naming: ObjectNaming,
}

impl WriterConfig {
    /// Settings for segment `index` of this job
    pub fn segment(&self, index: usize) -> Self {
        Self {
            naming: self.naming.segment(index),
            ..self.clone()
        }
    }

    fn staged_path(&self, format: OutputFormat) -> PathBuf {
        let job_dir = self.staging_dir.join(self.job_id.as_str());
        match self.naming.segment {
            Some(index) => job_dir
                .join("parts")
                .join(format!("{index:05}.{}", format.extension())),
            None => job_dir.join(format!("{}.{}", self.job_id, format.extension())),
        }
    }

    fn writes_header(&self) -> bool {
        matches!(self.naming.segment, None | Some(0))
    }
}

/// Stages rows per format and publishes them on finalize
pub struct StreamingWriter {
    config: WriterConfig,
    outputs: Vec<StagedOutput>,
    storage: Arc<dyn ObjectStorage>,
    finalized: bool,
}

impl StreamingWriter {
    /// Create a writer; no file is touched until the first non-empty append
    pub fn new(
        config: WriterConfig,
        headers: &[String],
        storage: Arc<dyn ObjectStorage>,
    ) -> Result<Self> {
        let mut formats = config.formats.clone();
        formats.sort();
        formats.dedup();
        if formats.is_empty() {
            return Err(ShelfportError::Configuration(
                "at least one output format is required".to_string(),
            ));
        }

        let mut outputs = Vec::with_capacity(formats.len());
        for format in formats {
            let header = if config.writes_header() {
                format.header(headers)?
            } else {
                None
            };
            outputs.push(StagedOutput::new(format, config.staged_path(format), header));
        }

        Ok(Self {
            config,
            outputs,
            storage,
            finalized: false,
        })
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    pub fn outputs(&self) -> &[StagedOutput] {
        &self.outputs
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finalized {
            return Err(ShelfportError::Write("already finalized".to_string()));
        }
        Ok(())
    }

    /// Append rows to the writer's only format
    ///
    /// A writer staging several formats keeps them in lockstep, so it refuses
    /// single-format appends; use [`ChunkSink::append_chunk`] instead.
    pub async fn append(&mut self, format: OutputFormat, rows: &[ExportRow]) -> Result<()> {
        self.ensure_open()?;
        match self.outputs.as_slice() {
            [only] if only.format() == format => {}
            [_] => {
                return Err(ShelfportError::Write(format!(
                    "format {format} is not configured for this job"
                )))
            }
            _ => {
                return Err(ShelfportError::Write(format!(
                    "cannot append to {format} alone while {} formats are staged",
                    self.outputs.len()
                )))
            }
        }
        self.append_chunk(rows).await
    }

    async fn rollback_all(&mut self) {
        for output in &mut self.outputs {
            if let Err(e) = output.rollback().await {
                tracing::error!(
                    job_id = %self.config.job_id,
                    format = %output.format(),
                    error = %e,
                    "Failed to roll back staged output"
                );
            }
        }
    }
}

#[async_trait]
impl ChunkSink for StreamingWriter {
    async fn append_chunk(&mut self, rows: &[ExportRow]) -> Result<()> {
        self.ensure_open()?;
        if rows.is_empty() {
            return Ok(());
        }

        // Render everything before touching any file
        let mut rendered = Vec::with_capacity(self.outputs.len());
        for output in &self.outputs {
            rendered.push(output.format().render_rows(rows)?);
        }

        let count = rows.len() as u64;
        let mut failure = None;
        for (output, bytes) in self.outputs.iter_mut().zip(rendered.iter()) {
            if let Err(e) = output.append(bytes, count).await {
                failure = Some(e);
                break;
            }
        }
        if let Some(e) = failure {
            self.rollback_all().await;
            return Err(e);
        }

        for output in &mut self.outputs {
            output.commit();
        }
        Ok(())
    }

    async fn finalize(&mut self) -> Result<Vec<PublishedObject>> {
        self.ensure_open()?;
        self.finalized = true;

        let mut ready = Vec::new();
        for output in &mut self.outputs {
            if output.close().await? {
                ready.push((output.format(), output.path().to_path_buf()));
            }
        }

        let mut published = Vec::with_capacity(ready.len());
        for (format, path) in &ready {
            let key = self.config.naming.output_key(&self.config.job_id, *format);
            let hashed = path.clone();
            let (size, sha256) = tokio::task::spawn_blocking(move || sha256_file(&hashed))
                .await
                .map_err(|e| ShelfportError::Io(format!("hashing task failed: {e}")))??;
            self.storage
                .put_file(&key, path, format.content_type())
                .await
                .map_err(|e| {
                    ShelfportError::Write(format!(
                        "failed to publish {}: {e}; staged file kept at {}",
                        key,
                        path.display()
                    ))
                })?;
            tracing::info!(
                job_id = %self.config.job_id,
                key = %key,
                size,
                sha256 = %sha256,
                "Published output"
            );
            published.push(PublishedObject {
                key,
                format: format.extension().to_string(),
                size,
                sha256,
            });
        }

        for (_, path) in &ready {
            if let Err(e) = tokio::fs::remove_file(path).await {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove staged file");
            }
        }

        Ok(published)
    }

    async fn publish_errors(&mut self, skips: &[SkipRecord]) -> Result<Option<PublishedObject>> {
        if skips.is_empty() {
            return Ok(None);
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        for skip in skips {
            writer.write_record([skip.identifier.as_str(), skip.reason.as_str()])?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| ShelfportError::Serialization(format!("CSV error: {e}")))?;

        let key = self.config.naming.errors_key(&self.config.job_id);
        let size = bytes.len() as u64;
        let sha256 = sha256_bytes(&bytes);
        self.storage
            .put_bytes(&key, bytes, OutputFormat::Csv.content_type())
            .await
            .map_err(|e| ShelfportError::Write(format!("failed to publish {key}: {e}")))?;

        tracing::info!(
            job_id = %self.config.job_id,
            key = %key,
            skipped = skips.len(),
            "Published skip report"
        );
        Ok(Some(PublishedObject {
            key,
            format: ERRORS_FORMAT.to_string(),
            size,
            sha256,
        }))
    }
}

/// Compose segment outputs of one format into the job-level object
///
/// Segments that published nothing are left out. When the first segment has
/// no rows, the header is uploaded as its own part so the composed file still
/// starts with it. Returns `None` if no segment produced rows.
pub async fn compose_segments(
    storage: &dyn ObjectStorage,
    naming: &ObjectNaming,
    job_id: &JobId,
    format: OutputFormat,
    segments: usize,
    headers: &[String],
) -> Result<Option<PublishedObject>> {
    let mut sources = Vec::with_capacity(segments + 1);
    for index in 0..segments {
        let key = naming.segment_key(job_id, format, index);
        if storage.exists(&key).await? {
            sources.push(key);
        }
    }
    if sources.is_empty() {
        return Ok(None);
    }

    let first = naming.segment_key(job_id, format, 0);
    if sources[0] != first {
        if let Some(header) = format.header(headers)? {
            let header_key = join_key(&[
                &naming.prefix,
                job_id.as_str(),
                "parts",
                &format!("header.{}", format.extension()),
            ]);
            storage
                .put_bytes(&header_key, header, format.content_type())
                .await?;
            sources.insert(0, header_key);
        }
    }

    let destination = naming.final_key(job_id, format);
    storage
        .compose(&destination, &sources, format.content_type())
        .await?;
    let bytes = storage.get(&destination).await?;

    tracing::info!(
        job_id = %job_id,
        key = %destination,
        parts = sources.len(),
        "Composed segment outputs"
    );
    Ok(Some(PublishedObject {
        key: destination,
        format: format.extension().to_string(),
        size: bytes.len() as u64,
        sha256: sha256_bytes(&bytes),
    }))
}

/// Compose per-segment skip reports into the job-level errors object
pub async fn compose_error_reports(
    storage: &dyn ObjectStorage,
    naming: &ObjectNaming,
    job_id: &JobId,
    segments: usize,
) -> Result<Option<PublishedObject>> {
    let mut sources = Vec::new();
    for index in 0..segments {
        let key = naming.segment(index).errors_key(job_id);
        if storage.exists(&key).await? {
            sources.push(key);
        }
    }
    if sources.is_empty() {
        return Ok(None);
    }

    let destination = ObjectNaming::new(naming.prefix.clone()).errors_key(job_id);
    storage
        .compose(&destination, &sources, OutputFormat::Csv.content_type())
        .await?;
    let bytes = storage.get(&destination).await?;
    Ok(Some(PublishedObject {
        key: destination,
        format: ERRORS_FORMAT.to_string(),
        size: bytes.len() as u64,
        sha256: sha256_bytes(&bytes),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::LocalObjectStorage;
    use crate::domain::{IdentifierRecord, SkipReason};
    use serde_json::json;
    use tempfile::TempDir;

    fn job() -> JobId {
        JobId::new("job-1").unwrap()
    }

    fn headers() -> Vec<String> {
        vec!["Barcode".to_string()]
    }

    fn rows(values: &[&str]) -> Vec<ExportRow> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| ExportRow {
                source: IdentifierRecord::new(*v, i as u64 + 1),
                values: vec![v.to_string()],
                document: json!({ "barcode": v }),
            })
            .collect()
    }

    fn setup(dir: &TempDir) -> (WriterConfig, Arc<LocalObjectStorage>) {
        let storage = Arc::new(LocalObjectStorage::new(dir.path().join("store")).unwrap());
        let config = WriterConfig {
            job_id: job(),
            formats: vec![OutputFormat::Json, OutputFormat::Csv],
            staging_dir: dir.path().join("staging"),
            naming: ObjectNaming::new("exports"),
        };
        (config, storage)
    }

    #[test]
    fn test_naming() {
        let naming = ObjectNaming::new("exports");
        assert_eq!(naming.final_key(&job(), OutputFormat::Csv), "exports/job-1/job-1.csv");
        assert_eq!(
            naming.segment(3).output_key(&job(), OutputFormat::Json),
            "exports/job-1/parts/00003.json"
        );
        assert_eq!(naming.errors_key(&job()), "exports/job-1/job-1-errors.csv");
        assert_eq!(naming.outcome_key(&job()), "exports/job-1/outcome.json");
    }

    #[tokio::test]
    async fn test_append_and_finalize_publishes_each_format() {
        let dir = TempDir::new().unwrap();
        let (config, storage) = setup(&dir);
        let mut writer = StreamingWriter::new(config, &headers(), storage.clone()).unwrap();

        writer.append_chunk(&rows(&["A", "B"])).await.unwrap();
        writer.append_chunk(&rows(&["C"])).await.unwrap();
        let published = writer.finalize().await.unwrap();

        assert_eq!(published.len(), 2);
        assert_eq!(published[0].key, "exports/job-1/job-1.csv");
        assert_eq!(published[1].key, "exports/job-1/job-1.json");

        let csv = storage.get("exports/job-1/job-1.csv").await.unwrap();
        assert_eq!(csv, b"Barcode\nA\nB\nC\n");
        assert_eq!(published[0].size, csv.len() as u64);
        assert_eq!(published[0].sha256, sha256_bytes(&csv));

        let json =
            String::from_utf8(storage.get("exports/job-1/job-1.json").await.unwrap()).unwrap();
        assert_eq!(json.lines().count(), 3);
    }

    #[tokio::test]
    async fn test_finalize_twice_fails() {
        let dir = TempDir::new().unwrap();
        let (config, storage) = setup(&dir);
        let mut writer = StreamingWriter::new(config, &headers(), storage).unwrap();
        writer.append_chunk(&rows(&["A"])).await.unwrap();
        writer.finalize().await.unwrap();

        let err = writer.finalize().await.unwrap_err();
        assert!(matches!(err, ShelfportError::Write(ref m) if m == "already finalized"));
        assert!(writer.append_chunk(&rows(&["B"])).await.is_err());
    }

    #[tokio::test]
    async fn test_no_rows_publishes_nothing() {
        let dir = TempDir::new().unwrap();
        let (config, storage) = setup(&dir);
        let mut writer = StreamingWriter::new(config, &headers(), storage.clone()).unwrap();
        writer.append_chunk(&[]).await.unwrap();
        assert!(writer.finalize().await.unwrap().is_empty());
        assert!(!storage.exists("exports/job-1/job-1.csv").await.unwrap());
    }

    #[tokio::test]
    async fn test_single_format_append() {
        let dir = TempDir::new().unwrap();
        let (mut config, storage) = setup(&dir);
        config.formats = vec![OutputFormat::Csv];
        let mut writer = StreamingWriter::new(config, &headers(), storage.clone()).unwrap();

        writer.append(OutputFormat::Csv, &rows(&["A"])).await.unwrap();
        writer.append(OutputFormat::Csv, &rows(&["B"])).await.unwrap();
        let err = writer
            .append(OutputFormat::Json, &rows(&["C"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not configured"));

        writer.finalize().await.unwrap();
        let csv = storage.get("exports/job-1/job-1.csv").await.unwrap();
        assert_eq!(csv, b"Barcode\nA\nB\n");
    }

    #[tokio::test]
    async fn test_single_format_append_refused_when_formats_are_in_lockstep() {
        let dir = TempDir::new().unwrap();
        let (config, storage) = setup(&dir);
        let mut writer = StreamingWriter::new(config, &headers(), storage.clone()).unwrap();

        let err = writer
            .append(OutputFormat::Csv, &rows(&["A"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ShelfportError::Write(_)));
        assert!(writer.outputs().iter().all(|o| o.rows() == 0));

        writer.append_chunk(&rows(&["A"])).await.unwrap();
        let published = writer.finalize().await.unwrap();
        assert_eq!(published.len(), 2);
        assert_eq!(
            storage.get("exports/job-1/job-1.csv").await.unwrap(),
            b"Barcode\nA\n"
        );
    }

    #[tokio::test]
    async fn test_failed_format_rolls_back_whole_chunk() {
        let dir = TempDir::new().unwrap();
        let (config, storage) = setup(&dir);
        let json_path = config.staged_path(OutputFormat::Json);
        let csv_path = config.staged_path(OutputFormat::Csv);
        let mut writer = StreamingWriter::new(config, &headers(), storage).unwrap();

        // A directory where the JSON file should go makes the JSON append fail
        std::fs::create_dir_all(&json_path).unwrap();
        let err = writer.append_chunk(&rows(&["A"])).await.unwrap_err();
        assert!(matches!(err, ShelfportError::Write(_)));
        assert_eq!(std::fs::metadata(&csv_path).unwrap().len(), 0);
        assert!(writer.outputs().iter().all(|o| o.rows() == 0));
    }

    #[tokio::test]
    async fn test_publish_errors() {
        let dir = TempDir::new().unwrap();
        let (config, storage) = setup(&dir);
        let mut writer = StreamingWriter::new(config, &headers(), storage.clone()).unwrap();

        assert!(writer.publish_errors(&[]).await.unwrap().is_none());

        let skip = SkipRecord::new(
            &IdentifierRecord::new("B", 2),
            SkipReason::not_found("no item, barcode B"),
        );
        let published = writer.publish_errors(&[skip]).await.unwrap().unwrap();
        assert_eq!(published.key, "exports/job-1/job-1-errors.csv");
        assert_eq!(
            storage.get(&published.key).await.unwrap(),
            b"B,\"no item, barcode B\"\n"
        );
    }

    #[tokio::test]
    async fn test_compose_segments_keeps_single_header() {
        let dir = TempDir::new().unwrap();
        let (config, storage) = setup(&dir);

        for (index, values) in [(0, vec!["A", "B"]), (1, vec!["C"])] {
            let mut writer =
                StreamingWriter::new(config.segment(index), &headers(), storage.clone()).unwrap();
            writer.append_chunk(&rows(&values)).await.unwrap();
            writer.finalize().await.unwrap();
        }

        let published = compose_segments(
            storage.as_ref(),
            &config.naming,
            &job(),
            OutputFormat::Csv,
            2,
            &headers(),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(published.key, "exports/job-1/job-1.csv");
        assert_eq!(
            storage.get(&published.key).await.unwrap(),
            b"Barcode\nA\nB\nC\n"
        );
    }

    #[tokio::test]
    async fn test_compose_segments_adds_header_when_first_part_is_empty() {
        let dir = TempDir::new().unwrap();
        let (config, storage) = setup(&dir);

        let mut writer =
            StreamingWriter::new(config.segment(1), &headers(), storage.clone()).unwrap();
        writer.append_chunk(&rows(&["C"])).await.unwrap();
        writer.finalize().await.unwrap();

        let published = compose_segments(
            storage.as_ref(),
            &config.naming,
            &job(),
            OutputFormat::Csv,
            2,
            &headers(),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(storage.get(&published.key).await.unwrap(), b"Barcode\nC\n");
    }
}
