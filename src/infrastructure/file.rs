use crate::domain::payment::PaymentPayload;
use crate::domain::ports::PendingStore;
use crate::domain::submission::{PendingSubmission, SubmissionId, sort_by_creation};
use crate::error::{QueueError, Result};
use async_trait::async_trait;
use fs2::FileExt;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

type Document = BTreeMap<SubmissionId, PendingSubmission>;

/// A durable store keeping all pending submissions in one JSON document.
///
/// Every write replaces the file atomically through a temporary file in the same
/// directory, so a crash mid-write leaves the previous document intact. A missing
/// file is treated as an empty queue.
///
/// Each operation holds an `fs2` lock on a sibling `<file>.lock` for its whole
/// load/persist cycle, so several stores (or processes) may share one path.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

/// Held flock on the queue's lock file; released on drop.
struct QueueFileLock(File);

impl Drop for QueueFileLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.0);
    }
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut lock_path = path.clone().into_os_string();
        lock_path.push(".lock");
        Self {
            path,
            lock_path: PathBuf::from(lock_path),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    fn lock(&self, exclusive: bool) -> Result<QueueFileLock> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)
            .map_err(|e| self.storage_error("open lock for", e))?;
        let locked = if exclusive {
            FileExt::lock_exclusive(&file)
        } else {
            FileExt::lock_shared(&file)
        };
        locked.map_err(|e| self.storage_error("lock", e))?;
        Ok(QueueFileLock(file))
    }

    fn load(&self) -> Result<Document> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Document::new()),
            Err(e) => return Err(self.storage_error("open", e)),
        };
        serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            QueueError::StorageError(format!(
                "corrupted queue file {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn persist(&self, document: &Document) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let temp = NamedTempFile::new_in(dir).map_err(|e| self.storage_error("create", e))?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, document)?;
            writer.flush().map_err(|e| self.storage_error("write", e))?;
        }
        temp.as_file()
            .sync_all()
            .map_err(|e| self.storage_error("sync", e))?;
        temp.persist(&self.path)
            .map_err(|e| self.storage_error("replace", e.error))?;
        Ok(())
    }

    fn add_blocking(&self, payload: PaymentPayload) -> Result<SubmissionId> {
        let _lock = self.lock(true)?;
        let mut document = self.load()?;
        let mut submission = PendingSubmission::new(payload);
        while document.contains_key(&submission.id) {
            submission.regenerate_id();
        }
        let id = submission.id.clone();
        document.insert(id.clone(), submission);
        self.persist(&document)?;
        Ok(id)
    }

    fn list_blocking(&self) -> Result<Vec<PendingSubmission>> {
        let _lock = self.lock(false)?;
        let mut pending: Vec<_> = self
            .load()?
            .into_values()
            .filter(|s| !s.synced)
            .collect();
        sort_by_creation(&mut pending);
        Ok(pending)
    }

    fn remove_blocking(&self, id: &SubmissionId) -> Result<()> {
        let _lock = self.lock(true)?;
        let mut document = self.load()?;
        if document.remove(id).is_some() {
            self.persist(&document)?;
        }
        Ok(())
    }

    /// Runs file work on the blocking pool; flock waits must not stall async workers.
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(JsonFileStore) -> Result<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || f(store))
            .await
            .map_err(|e| QueueError::InternalError(Box::new(e)))?
    }

    fn storage_error(&self, action: &str, e: std::io::Error) -> QueueError {
        QueueError::StorageError(format!(
            "failed to {} queue file {}: {}",
            action,
            self.path.display(),
            e
        ))
    }
}

#[async_trait]
impl PendingStore for JsonFileStore {
    async fn add(&self, payload: PaymentPayload) -> Result<SubmissionId> {
        self.blocking(move |store| store.add_blocking(payload)).await
    }

    async fn list_pending(&self) -> Result<Vec<PendingSubmission>> {
        self.blocking(|store| store.list_blocking()).await
    }

    async fn remove(&self, id: &SubmissionId) -> Result<()> {
        let id = id.clone();
        self.blocking(move |store| store.remove_blocking(&id)).await
    }
}
