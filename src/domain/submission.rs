use super::payment::PaymentPayload;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

const ID_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Locally generated identifier of a queued submission: `local-<millis>-<base36>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(String);

impl SubmissionId {
    pub fn generate(created_at: DateTime<Utc>) -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..ID_SUFFIX_LEN)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        Self(format!("local-{}-{}", created_at.timestamp_millis(), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SubmissionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SubmissionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A payment report waiting in the local store for delivery.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PendingSubmission {
    pub id: SubmissionId,
    pub payload: PaymentPayload,
    pub created_at: DateTime<Utc>,
    pub synced: bool,
}

impl PendingSubmission {
    pub fn new(payload: PaymentPayload) -> Self {
        let created_at = Utc::now();
        Self {
            id: SubmissionId::generate(created_at),
            payload,
            created_at,
            synced: false,
        }
    }

    /// Picks a fresh id, keeping the creation time. Used by stores on key collision.
    pub fn regenerate_id(&mut self) {
        self.id = SubmissionId::generate(self.created_at);
    }
}

/// Sorts pending records oldest first so replay order is deterministic.
pub(crate) fn sort_by_creation(pending: &mut [PendingSubmission]) {
    pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}
