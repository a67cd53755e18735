use crate::domain::payment::PaymentPayload;
use crate::domain::ports::PendingStore;
use crate::domain::submission::{PendingSubmission, SubmissionId, sort_by_creation};
use crate::error::{QueueError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family holding pending submissions keyed by their local id.
pub const CF_PENDING: &str = "pending-transactions";

/// A persistent store implementation using RocksDB.
///
/// Submissions are stored as JSON under their id in a dedicated column family.
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the `pending-transactions` column family exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_pending = ColumnFamilyDescriptor::new(CF_PENDING, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_pending])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn pending_cf(&self) -> Result<&ColumnFamily> {
        self.db.cf_handle(CF_PENDING).ok_or_else(|| {
            QueueError::StorageError("Pending column family not found".to_string())
        })
    }
}

#[async_trait]
impl PendingStore for RocksDBStore {
    async fn add(&self, payload: PaymentPayload) -> Result<SubmissionId> {
        let cf = self.pending_cf()?;

        let mut submission = PendingSubmission::new(payload);
        while self
            .db
            .get_pinned_cf(cf, submission.id.as_str())?
            .is_some()
        {
            submission.regenerate_id();
        }

        let value = serde_json::to_vec(&submission)?;
        self.db.put_cf(cf, submission.id.as_str(), value)?;

        Ok(submission.id)
    }

    async fn list_pending(&self) -> Result<Vec<PendingSubmission>> {
        let cf = self.pending_cf()?;

        let mut pending = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let submission: PendingSubmission = serde_json::from_slice(&value).map_err(|e| {
                QueueError::StorageError(format!("Failed to deserialize submission: {}", e))
            })?;
            if !submission.synced {
                pending.push(submission);
            }
        }

        sort_by_creation(&mut pending);
        Ok(pending)
    }

    async fn remove(&self, id: &SubmissionId) -> Result<()> {
        let cf = self.pending_cf()?;
        self.db.delete_cf(cf, id.as_str())?;
        Ok(())
    }
}
