use crate::application::connectivity::{ConnectivityTracker, Subscription};
use crate::config::QueueConfig;
use crate::domain::payment::PaymentPayload;
use crate::domain::ports::{Delivery, GatewayBox, PendingStoreBox, RejectReason};
use crate::domain::submission::{PendingSubmission, SubmissionId};
use crate::error::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

const REPORT_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Idle,
    Syncing,
}

/// What happened to a payment handed to [`OfflineQueue::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The remote API accepted it; nothing was stored locally.
    Delivered,
    /// Stored locally for a later sync pass.
    Queued(SubmissionId),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub success_count: usize,
    pub failure_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed(SyncReport),
    /// Nothing attempted because the tracker reports offline.
    Offline,
    /// Another pass was already in flight.
    AlreadySyncing,
}

impl SyncOutcome {
    pub fn report(&self) -> SyncReport {
        match self {
            SyncOutcome::Completed(report) => *report,
            SyncOutcome::Offline | SyncOutcome::AlreadySyncing => SyncReport::default(),
        }
    }
}

/// Resets the syncing flag when a pass ends, including on early `?` returns.
struct SyncGuard<'a>(&'a AtomicBool);

impl<'a> SyncGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Queue of payment submissions that survives network outages.
///
/// `OfflineQueue` delivers payments straight to the remote API when it can and
/// keeps them in a [`crate::domain::ports::PendingStore`] otherwise. Sync passes
/// replay the stored records one at a time; at most one pass runs at any moment.
pub struct OfflineQueue {
    store: PendingStoreBox,
    gateway: GatewayBox,
    connectivity: ConnectivityTracker,
    config: QueueConfig,
    syncing: AtomicBool,
    reports: broadcast::Sender<SyncReport>,
}

impl OfflineQueue {
    /// Creates a new `OfflineQueue`.
    ///
    /// # Arguments
    ///
    /// * `store` - Local storage for submissions awaiting delivery.
    /// * `gateway` - The remote transaction API.
    /// * `connectivity` - Live online/offline signal consulted at each decision point.
    /// * `config` - Timeout policy.
    pub fn new(
        store: PendingStoreBox,
        gateway: GatewayBox,
        connectivity: ConnectivityTracker,
        config: QueueConfig,
    ) -> Self {
        let (reports, _) = broadcast::channel(REPORT_CHANNEL_CAPACITY);
        Self {
            store,
            gateway,
            connectivity,
            config,
            syncing: AtomicBool::new(false),
            reports,
        }
    }

    pub fn connectivity(&self) -> &ConnectivityTracker {
        &self.connectivity
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    pub fn state(&self) -> QueueState {
        if self.is_syncing() {
            QueueState::Syncing
        } else {
            QueueState::Idle
        }
    }

    /// Delivers `payload` now if online, otherwise (or on failure) stores it locally.
    ///
    /// The payload is not validated here; it is forwarded as given.
    pub async fn save(&self, payload: PaymentPayload) -> Result<SaveOutcome> {
        if self.connectivity.is_online() {
            match self.deliver(&payload).await {
                Ok(Delivery::Accepted) => {
                    tracing::info!(student_id = %payload.student_id, "payment delivered");
                    return Ok(SaveOutcome::Delivered);
                }
                Ok(Delivery::Rejected(reason)) => {
                    tracing::warn!(
                        student_id = %payload.student_id,
                        %reason,
                        "delivery failed, storing payment locally"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        student_id = %payload.student_id,
                        error = %e,
                        "gateway error, storing payment locally"
                    );
                }
            }
        }

        let id = self.store.add(payload).await?;
        tracing::info!(%id, "payment queued locally");
        Ok(SaveOutcome::Queued(id))
    }

    /// Runs one sync pass over the records pending at the time of the call.
    pub async fn sync_now(&self) -> Result<SyncOutcome> {
        if !self.connectivity.is_online() {
            tracing::debug!("sync skipped: offline");
            return Ok(SyncOutcome::Offline);
        }

        let Some(_guard) = SyncGuard::acquire(&self.syncing) else {
            tracing::debug!("sync skipped: a pass is already running");
            return Ok(SyncOutcome::AlreadySyncing);
        };

        let pending = self.store.list_pending().await?;
        tracing::info!(pending = pending.len(), "sync pass started");

        let mut report = SyncReport::default();
        for submission in pending {
            if self.sync_one(&submission).await {
                report.success_count += 1;
            } else {
                report.failure_count += 1;
            }
        }

        tracing::info!(
            succeeded = report.success_count,
            failed = report.failure_count,
            "sync pass finished"
        );
        // No receivers is fine.
        let _ = self.reports.send(report);
        Ok(SyncOutcome::Completed(report))
    }

    /// Returns whether the record was delivered and dropped from the store.
    async fn sync_one(&self, submission: &PendingSubmission) -> bool {
        match self.deliver(&submission.payload).await {
            Ok(Delivery::Accepted) => match self.store.remove(&submission.id).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(id = %submission.id, error = %e, "delivered but could not remove local record");
                    false
                }
            },
            Ok(Delivery::Rejected(reason)) => {
                tracing::warn!(id = %submission.id, %reason, "sync failed, keeping record");
                false
            }
            Err(e) => {
                tracing::error!(id = %submission.id, error = %e, "gateway error, keeping record");
                false
            }
        }
    }

    async fn deliver(&self, payload: &PaymentPayload) -> Result<Delivery> {
        match tokio::time::timeout(self.config.delivery_timeout, self.gateway.submit(payload)).await
        {
            Ok(result) => result,
            Err(_) => Ok(Delivery::Rejected(RejectReason::Timeout)),
        }
    }

    pub async fn list_pending(&self) -> Result<Vec<PendingSubmission>> {
        self.store.list_pending().await
    }

    pub async fn pending_count(&self) -> Result<usize> {
        Ok(self.store.list_pending().await?.len())
    }

    /// Drops a queued submission without delivering it.
    pub async fn remove(&self, id: &SubmissionId) -> Result<()> {
        self.store.remove(id).await
    }

    /// Reports of every completed sync pass, for surfacing to users.
    pub fn subscribe_reports(&self) -> broadcast::Receiver<SyncReport> {
        self.reports.subscribe()
    }

    /// Starts a sync pass on every offline-to-online transition.
    ///
    /// The returned handle keeps the trigger alive; dropping it unsubscribes from
    /// the tracker and stops the background task.
    pub fn spawn_auto_sync(self: &Arc<Self>) -> AutoSync {
        let (trigger, mut triggered) = mpsc::unbounded_channel::<()>();
        let subscription = self.connectivity.subscribe(
            move || {
                tracing::info!("connection restored, syncing pending payments");
                let _ = trigger.send(());
            },
            || tracing::warn!("offline mode, payments will be stored locally"),
        );

        let queue = Arc::clone(self);
        let task = tokio::spawn(async move {
            while triggered.recv().await.is_some() {
                match queue.sync_now().await {
                    Ok(SyncOutcome::Completed(_)) => {}
                    Ok(outcome) => tracing::debug!(?outcome, "automatic sync did not run"),
                    Err(e) => tracing::error!(error = %e, "automatic sync failed"),
                }
            }
        });

        AutoSync {
            _subscription: subscription,
            task,
        }
    }
}

/// Keeps the reconnect trigger installed by [`OfflineQueue::spawn_auto_sync`] alive.
pub struct AutoSync {
    _subscription: Subscription,
    task: JoinHandle<()>,
}

impl Drop for AutoSync {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::Amount;
    use crate::domain::ports::SubmissionGateway;
    use crate::infrastructure::in_memory::InMemoryPendingStore;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::atomic::AtomicUsize;

    struct CountingGateway {
        calls: Arc<AtomicUsize>,
        accept: bool,
    }

    #[async_trait]
    impl SubmissionGateway for CountingGateway {
        async fn submit(&self, _payload: &PaymentPayload) -> Result<Delivery> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.accept {
                Ok(Delivery::Accepted)
            } else {
                Ok(Delivery::Rejected(RejectReason::Status(500)))
            }
        }
    }

    fn queue(online: bool, accept: bool) -> (OfflineQueue, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let gateway = CountingGateway {
            calls: Arc::clone(&calls),
            accept,
        };
        let queue = OfflineQueue::new(
            Box::new(InMemoryPendingStore::new()),
            Box::new(gateway),
            ConnectivityTracker::new(online),
            QueueConfig::default(),
        );
        (queue, calls)
    }

    fn payment() -> PaymentPayload {
        PaymentPayload::new("STU-001", Amount::new(dec!(15000)).unwrap(), "scolarite")
    }

    #[test]
    fn test_guard_resets_state() {
        let flag = AtomicBool::new(false);
        {
            let guard = SyncGuard::acquire(&flag);
            assert!(guard.is_some());
            assert!(SyncGuard::acquire(&flag).is_none());
        }
        assert!(!flag.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_save_offline_then_sync_after_reconnect() {
        let (queue, calls) = queue(false, true);

        let outcome = queue.save(payment()).await.unwrap();
        assert!(matches!(outcome, SaveOutcome::Queued(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(queue.pending_count().await.unwrap(), 1);

        queue.connectivity().set_online(true);
        let outcome = queue.sync_now().await.unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::Completed(SyncReport {
                success_count: 1,
                failure_count: 0
            })
        );
        assert_eq!(queue.pending_count().await.unwrap(), 0);
        assert_eq!(queue.state(), QueueState::Idle);
    }

    #[tokio::test]
    async fn test_rejected_records_stay_queued() {
        let (queue, calls) = queue(true, false);

        queue.save(payment()).await.unwrap();
        let outcome = queue.sync_now().await.unwrap();

        assert_eq!(outcome.report().failure_count, 1);
        assert_eq!(queue.pending_count().await.unwrap(), 1);
        // One attempt from save, one from the pass.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_report_is_broadcast() {
        let (queue, _) = queue(true, true);
        let mut reports = queue.subscribe_reports();

        queue.sync_now().await.unwrap();

        assert_eq!(reports.recv().await.unwrap(), SyncReport::default());
    }
}
