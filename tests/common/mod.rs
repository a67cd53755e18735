#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use scolpay_offline::application::connectivity::ConnectivityTracker;
use scolpay_offline::application::queue::OfflineQueue;
use scolpay_offline::config::QueueConfig;
use scolpay_offline::domain::payment::{Amount, PaymentPayload};
use scolpay_offline::domain::ports::{
    Delivery, PendingStore, PendingStoreBox, RejectReason, SubmissionGateway,
};
use scolpay_offline::domain::submission::{PendingSubmission, SubmissionId};
use scolpay_offline::error::{QueueError, Result};
use scolpay_offline::infrastructure::in_memory::InMemoryPendingStore;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, Semaphore};

pub fn payment(student_id: &str, amount: Decimal) -> PaymentPayload {
    PaymentPayload::new(student_id, Amount::new(amount).unwrap(), "scolarite")
}

#[derive(Default)]
struct GatewayState {
    calls: Mutex<Vec<PaymentPayload>>,
    rejected_students: Mutex<HashSet<String>>,
    broken_students: Mutex<HashSet<String>>,
    hang: bool,
    gate: Option<Gate>,
}

struct Gate {
    entered: Arc<Notify>,
    release: Arc<Semaphore>,
}

/// Gateway double that records every call and rejects chosen students.
/// Students marked with [`ScriptedGateway::break_on`] make `submit` return `Err`.
#[derive(Clone, Default)]
pub struct ScriptedGateway {
    state: Arc<GatewayState>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Never answers; every call runs into the queue's delivery timeout.
    pub fn hanging() -> Self {
        Self {
            state: Arc::new(GatewayState {
                hang: true,
                ..Default::default()
            }),
        }
    }

    /// Blocks each call until a permit is added to the returned semaphore.
    /// The notify fires whenever a call has started.
    pub fn gated() -> (Self, Arc<Notify>, Arc<Semaphore>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Semaphore::new(0));
        let gateway = Self {
            state: Arc::new(GatewayState {
                gate: Some(Gate {
                    entered: Arc::clone(&entered),
                    release: Arc::clone(&release),
                }),
                ..Default::default()
            }),
        };
        (gateway, entered, release)
    }

    pub fn reject(&self, student_id: &str) {
        self.state
            .rejected_students
            .lock()
            .unwrap()
            .insert(student_id.to_string());
    }

    pub fn accept(&self, student_id: &str) {
        self.state.rejected_students.lock().unwrap().remove(student_id);
    }

    pub fn break_on(&self, student_id: &str) {
        self.state
            .broken_students
            .lock()
            .unwrap()
            .insert(student_id.to_string());
    }

    pub fn calls(&self) -> Vec<PaymentPayload> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SubmissionGateway for ScriptedGateway {
    async fn submit(&self, payload: &PaymentPayload) -> Result<Delivery> {
        self.state.calls.lock().unwrap().push(payload.clone());

        if self.state.hang {
            std::future::pending::<()>().await;
        }
        if let Some(gate) = &self.state.gate {
            gate.entered.notify_one();
            gate.release.acquire().await.unwrap().forget();
        }

        if self
            .state
            .broken_students
            .lock()
            .unwrap()
            .contains(&payload.student_id)
        {
            return Err(QueueError::InternalError(
                format!("gateway crashed on {}", payload.student_id).into(),
            ));
        }

        let rejected = self
            .state
            .rejected_students
            .lock()
            .unwrap()
            .contains(&payload.student_id);
        if rejected {
            Ok(Delivery::Rejected(RejectReason::Status(500)))
        } else {
            Ok(Delivery::Accepted)
        }
    }
}

/// In-memory store whose operations can be made to fail.
#[derive(Clone, Default)]
pub struct FlakyStore {
    inner: InMemoryPendingStore,
    fail_add: Arc<Mutex<bool>>,
    fail_list: Arc<Mutex<bool>>,
    fail_remove: Arc<Mutex<HashSet<SubmissionId>>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_add(&self, fail: bool) {
        *self.fail_add.lock().unwrap() = fail;
    }

    pub fn fail_list(&self, fail: bool) {
        *self.fail_list.lock().unwrap() = fail;
    }

    pub fn fail_remove_of(&self, id: &SubmissionId) {
        self.fail_remove.lock().unwrap().insert(id.clone());
    }
}

fn quota_exceeded() -> QueueError {
    QueueError::StorageError("quota exceeded".to_string())
}

#[async_trait]
impl PendingStore for FlakyStore {
    async fn add(&self, payload: PaymentPayload) -> Result<SubmissionId> {
        if *self.fail_add.lock().unwrap() {
            return Err(quota_exceeded());
        }
        self.inner.add(payload).await
    }

    async fn list_pending(&self) -> Result<Vec<PendingSubmission>> {
        if *self.fail_list.lock().unwrap() {
            return Err(quota_exceeded());
        }
        self.inner.list_pending().await
    }

    async fn remove(&self, id: &SubmissionId) -> Result<()> {
        if self.fail_remove.lock().unwrap().contains(id) {
            return Err(quota_exceeded());
        }
        self.inner.remove(id).await
    }
}

pub struct Harness {
    pub queue: Arc<OfflineQueue>,
    pub gateway: ScriptedGateway,
    pub store: FlakyStore,
    pub connectivity: ConnectivityTracker,
}

impl Harness {
    pub fn new(online: bool) -> Self {
        Self::with_gateway(online, ScriptedGateway::new(), QueueConfig::default())
    }

    pub fn with_gateway(online: bool, gateway: ScriptedGateway, config: QueueConfig) -> Self {
        let store = FlakyStore::new();
        let connectivity = ConnectivityTracker::new(online);
        let boxed_store: PendingStoreBox = Box::new(store.clone());
        let queue = Arc::new(OfflineQueue::new(
            boxed_store,
            Box::new(gateway.clone()),
            connectivity.clone(),
            config,
        ));
        Self {
            queue,
            gateway,
            store,
            connectivity,
        }
    }

    pub async fn pending(&self) -> Vec<PendingSubmission> {
        self.store.list_pending().await.unwrap()
    }

    /// Puts one pending record per student straight into the store.
    pub async fn seed(&self, students: &[&str]) -> Vec<SubmissionId> {
        let mut ids = Vec::new();
        for student in students {
            let id = self
                .store
                .add(payment(student, Decimal::from(1000)))
                .await
                .unwrap();
            ids.push(id);
        }
        ids
    }
}
