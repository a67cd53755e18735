use crate::domain::payment::PaymentPayload;
use crate::domain::ports::PendingStore;
use crate::domain::submission::{PendingSubmission, SubmissionId, sort_by_creation};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for pending submissions.
///
/// Uses `Arc<RwLock<HashMap<SubmissionId, PendingSubmission>>>` to allow shared
/// concurrent access. Contents are lost with the process, so this is meant for
/// tests and embedding rather than for real offline use.
#[derive(Default, Clone)]
pub struct InMemoryPendingStore {
    submissions: Arc<RwLock<HashMap<SubmissionId, PendingSubmission>>>,
}

impl InMemoryPendingStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.submissions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.submissions.read().await.is_empty()
    }
}

#[async_trait]
impl PendingStore for InMemoryPendingStore {
    async fn add(&self, payload: PaymentPayload) -> Result<SubmissionId> {
        let mut submissions = self.submissions.write().await;
        let mut submission = PendingSubmission::new(payload);
        while submissions.contains_key(&submission.id) {
            submission.regenerate_id();
        }
        let id = submission.id.clone();
        submissions.insert(id.clone(), submission);
        Ok(id)
    }

    async fn list_pending(&self) -> Result<Vec<PendingSubmission>> {
        let submissions = self.submissions.read().await;
        let mut pending: Vec<_> = submissions.values().filter(|s| !s.synced).cloned().collect();
        sort_by_creation(&mut pending);
        Ok(pending)
    }

    async fn remove(&self, id: &SubmissionId) -> Result<()> {
        self.submissions.write().await.remove(id);
        Ok(())
    }
}
