use super::payment::PaymentPayload;
use super::submission::{PendingSubmission, SubmissionId};
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;

/// Durable local storage for submissions that could not be delivered yet.
#[async_trait]
pub trait PendingStore: Send + Sync {
    /// Stores `payload` as a new unsynced record and returns its generated id.
    async fn add(&self, payload: PaymentPayload) -> Result<SubmissionId>;
    /// Returns every record not yet synced, oldest first.
    async fn list_pending(&self) -> Result<Vec<PendingSubmission>>;
    /// Deletes a record. Removing an unknown id is not an error.
    async fn remove(&self, id: &SubmissionId) -> Result<()>;
}

/// Why the remote side did not accept a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    Network(String),
    Status(u16),
    Timeout,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Network(msg) => write!(f, "network error: {msg}"),
            RejectReason::Status(code) => write!(f, "server responded with status {code}"),
            RejectReason::Timeout => f.write_str("delivery timed out"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Accepted,
    Rejected(RejectReason),
}

/// The remote transaction API.
///
/// Ordinary transport or HTTP failures are reported as [`Delivery::Rejected`];
/// `Err` is reserved for failures that retrying cannot fix.
#[async_trait]
pub trait SubmissionGateway: Send + Sync {
    async fn submit(&self, payload: &PaymentPayload) -> Result<Delivery>;
}

/// A best-effort network reachability signal.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

pub type PendingStoreBox = Box<dyn PendingStore>;
pub type GatewayBox = Box<dyn SubmissionGateway>;
pub type ProbeBox = Box<dyn ReachabilityProbe>;
