use crate::domain::ports::ProbeBox;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

type Listener = Arc<dyn Fn() + Send + Sync>;

struct Registration {
    id: u64,
    on_online: Listener,
    on_offline: Listener,
}

struct Inner {
    online: AtomicBool,
    next_id: AtomicU64,
    registrations: Mutex<Vec<Registration>>,
}

impl Inner {
    fn registrations(&self) -> MutexGuard<'_, Vec<Registration>> {
        // Listeners run outside the lock, so a poisoned guard still holds a consistent list.
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Tracks whether the network is currently usable and notifies listeners on change.
///
/// Cloning is cheap and all clones share state. Listeners fire exactly once per
/// transition; feeding the same state twice is ignored.
#[derive(Clone)]
pub struct ConnectivityTracker {
    inner: Arc<Inner>,
}

impl ConnectivityTracker {
    pub fn new(online: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                online: AtomicBool::new(online),
                next_id: AtomicU64::new(0),
                registrations: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::Acquire)
    }

    /// Feeds the latest platform signal into the tracker.
    pub fn set_online(&self, online: bool) {
        let previous = self.inner.online.swap(online, Ordering::AcqRel);
        if previous == online {
            return;
        }

        tracing::debug!(online, "connectivity changed");
        let listeners: Vec<Listener> = self
            .inner
            .registrations()
            .iter()
            .map(|r| {
                if online {
                    Arc::clone(&r.on_online)
                } else {
                    Arc::clone(&r.on_offline)
                }
            })
            .collect();

        for listener in listeners {
            listener();
        }
    }

    /// Registers a pair of transition listeners.
    ///
    /// Both are released together when the returned [`Subscription`] is dropped or
    /// explicitly unsubscribed.
    pub fn subscribe<F, G>(&self, on_online: F, on_offline: G) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
        G: Fn() + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.registrations().push(Registration {
            id,
            on_online: Arc::new(on_online),
            on_offline: Arc::new(on_offline),
        });

        Subscription {
            id,
            tracker: Arc::downgrade(&self.inner),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.registrations().len()
    }
}

/// Handle for one `subscribe` call.
#[must_use = "dropping a Subscription unsubscribes its listeners"]
pub struct Subscription {
    id: u64,
    tracker: Weak<Inner>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.tracker.upgrade() {
            inner.registrations().retain(|r| r.id != self.id);
        }
    }
}

/// Polls `probe` every `interval` and feeds the result into `tracker`.
pub fn spawn_monitor(
    tracker: ConnectivityTracker,
    probe: ProbeBox,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let reachable = probe.is_reachable().await;
            tracker.set_online(reachable);
        }
    })
}
