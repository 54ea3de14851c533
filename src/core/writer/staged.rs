//! Append-only local staging files

use crate::core::transform::OutputFormat;
use crate::domain::{Result, ShelfportError};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

/// One format's staged output for one job
///
/// The file is created on the first non-empty append. Bytes past
/// `committed_len` belong to a chunk still in flight and are discarded by
/// [`StagedOutput::rollback`], and by [`StagedOutput::close`] before the file
/// is handed over for publishing.
#[derive(Debug)]
pub struct StagedOutput {
    format: OutputFormat,
    path: PathBuf,
    header: Option<Vec<u8>>,
    file: Option<File>,
    len: u64,
    committed_len: u64,
    rows: u64,
    pending_rows: u64,
    closed: bool,
    /// Set when uncommitted bytes could not be cut off
    poisoned: bool,
}

impl StagedOutput {
    pub fn new(format: OutputFormat, path: PathBuf, header: Option<Vec<u8>>) -> Self {
        Self {
            format,
            path,
            header,
            file: None,
            len: 0,
            committed_len: 0,
            rows: 0,
            pending_rows: 0,
            closed: false,
            poisoned: false,
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows covered by committed chunks
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn committed_len(&self) -> u64 {
        self.committed_len
    }

    fn write_error(&self, action: &str, e: std::io::Error) -> ShelfportError {
        ShelfportError::Write(format!(
            "failed to {action} staged {} output {}: {e}",
            self.format,
            self.path.display()
        ))
    }

    async fn open(&mut self) -> Result<&mut File> {
        if self.file.is_none() {
            if let Some(parent) = self.path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.write_error("create", e))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.path)
                .await
                .map_err(|e| self.write_error("create", e))?;
            self.file = Some(file);
        }
        match self.file.as_mut() {
            Some(file) => Ok(file),
            None => Err(ShelfportError::Write(format!(
                "staged {} output is not open",
                self.format
            ))),
        }
    }

    /// Append pre-rendered rows, writing the header first on an empty file
    ///
    /// On error an unknown number of bytes may have reached the file; the
    /// caller must [`rollback`](Self::rollback) before appending again.
    pub async fn append(&mut self, rendered: &[u8], rows: u64) -> Result<()> {
        if self.closed {
            return Err(ShelfportError::Write(format!(
                "staged {} output is already closed",
                self.format
            )));
        }
        if rows == 0 {
            return Ok(());
        }

        let header = if self.len == 0 { self.header.clone() } else { None };
        let file = self.open().await?;
        let mut written = Ok(());
        if let Some(header) = header.as_deref() {
            written = file.write_all(header).await;
        }
        if written.is_ok() {
            written = file.write_all(rendered).await;
        }
        if written.is_ok() {
            written = file.flush().await;
        }
        if let Err(e) = written {
            return Err(self.write_error("append to", e));
        }

        self.len += header.map(|h| h.len() as u64).unwrap_or(0) + rendered.len() as u64;
        self.pending_rows += rows;
        Ok(())
    }

    /// Make everything appended so far part of the committed output
    pub fn commit(&mut self) {
        self.committed_len = self.len;
        self.rows += self.pending_rows;
        self.pending_rows = 0;
    }

    /// Discard bytes appended since the last commit
    ///
    /// The file is always cut back to `committed_len`, whatever `append`
    /// managed to record before failing.
    pub async fn rollback(&mut self) -> Result<()> {
        self.pending_rows = 0;
        let committed_len = self.committed_len;
        if let Some(file) = self.file.as_mut() {
            let truncated = async {
                file.flush().await.ok();
                file.set_len(committed_len).await?;
                file.seek(SeekFrom::Start(committed_len)).await.map(|_| ())
            }
            .await;
            if let Err(e) = truncated {
                self.poisoned = true;
                return Err(self.write_error("truncate", e));
            }
        }
        self.len = committed_len;
        Ok(())
    }

    /// Drop uncommitted bytes, fsync and close the file
    ///
    /// Returns `false` when nothing was ever committed; the empty staging file,
    /// if any, is removed.
    pub async fn close(&mut self) -> Result<bool> {
        if self.poisoned {
            self.closed = true;
            return Err(ShelfportError::Write(format!(
                "staged {} output {} holds uncommitted bytes that could not be removed",
                self.format,
                self.path.display()
            )));
        }
        if !self.closed {
            self.rollback().await?;
        }
        self.closed = true;

        let Some(file) = self.file.take() else {
            return Ok(false);
        };
        if self.rows == 0 {
            drop(file);
            let _ = tokio::fs::remove_file(&self.path).await;
            return Ok(false);
        }
        file.sync_all()
            .await
            .map_err(|e| self.write_error("sync", e))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn csv_output(path: &Path) -> StagedOutput {
        StagedOutput::new(OutputFormat::Csv, path.to_path_buf(), Some(b"h\n".to_vec()))
    }

    /// Bytes that reached the file from a write that then failed
    fn write_stray_bytes(path: &Path, bytes: &[u8]) {
        let mut file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(bytes).unwrap();
    }

    #[tokio::test]
    async fn test_lazy_creation_and_header_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job/job.csv");
        let mut output = csv_output(&path);

        output.append(b"", 0).await.unwrap();
        assert!(!path.exists());

        output.append(b"1\n", 1).await.unwrap();
        output.commit();
        output.append(b"2\n", 1).await.unwrap();
        output.commit();

        assert_eq!(std::fs::read(&path).unwrap(), b"h\n1\n2\n");
        assert_eq!(output.rows(), 2);
        assert!(output.close().await.unwrap());
    }

    #[tokio::test]
    async fn test_rollback_truncates_to_committed_length() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.csv");
        let mut output = csv_output(&path);

        output.append(b"1\n", 1).await.unwrap();
        output.commit();
        output.append(b"2\n3\n", 2).await.unwrap();
        output.rollback().await.unwrap();
        output.append(b"4\n", 1).await.unwrap();
        output.commit();

        assert_eq!(std::fs::read(&path).unwrap(), b"h\n1\n4\n");
        assert_eq!(output.rows(), 2);
    }

    #[tokio::test]
    async fn test_rollback_removes_bytes_of_a_failed_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.csv");
        let mut output = csv_output(&path);

        output.append(b"1\n", 1).await.unwrap();
        output.commit();
        assert_eq!(output.committed_len(), 4);

        // A partial write leaves bytes behind that `append` never accounted for
        write_stray_bytes(&path, &[b'x'; 2048]);
        output.rollback().await.unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 4);

        output.append(b"2\n", 1).await.unwrap();
        output.commit();
        assert_eq!(std::fs::read(&path).unwrap(), b"h\n1\n2\n");
    }

    #[tokio::test]
    async fn test_close_never_keeps_uncommitted_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.csv");
        let mut output = csv_output(&path);

        output.append(b"1\n", 1).await.unwrap();
        output.commit();
        output.append(b"2\n", 1).await.unwrap();
        write_stray_bytes(&path, b"3,partial");

        assert!(output.close().await.unwrap());
        assert_eq!(std::fs::read(&path).unwrap(), b"h\n1\n");
        assert_eq!(output.rows(), 1);
    }

    #[tokio::test]
    async fn test_rollback_of_first_chunk_rewrites_header_later() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.csv");
        let mut output = csv_output(&path);

        output.append(b"1\n", 1).await.unwrap();
        output.rollback().await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"");

        output.append(b"2\n", 1).await.unwrap();
        output.commit();
        assert_eq!(std::fs::read(&path).unwrap(), b"h\n2\n");
    }

    #[tokio::test]
    async fn test_close_without_rows_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.json");
        let mut output = StagedOutput::new(OutputFormat::Json, path.clone(), None);
        output.append(b"{}\n", 1).await.unwrap();
        output.rollback().await.unwrap();
        assert!(!output.close().await.unwrap());
        assert!(!path.exists());
        assert!(output.append(b"{}\n", 1).await.is_err());
    }
}
