//! # Subscription Manager
//!
//! Long-lived watches on single logs. At most one subscription exists per
//! address; repeat opens share it through a reference count. Each
//! subscription may carry an idle timer (`channel:<address>` in the
//! [`TimerRegistry`]) that closes it after a quiet period.
//!
//! An entry is registered before connecting. Openers that arrive while the
//! connection is pending wait on its readiness signal and share its outcome.

use super::timers::TimerRegistry;
use crate::domain::{Address, LedgerError, Record};
use crate::ports::{LedgerNetwork, RawRecordStream};
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::AbortHandle;
use tracing::{debug, warn};

/// Failure channel capacity.
const FAILURE_CAPACITY: usize = 64;

/// Called for every delivered non-placeholder record.
pub type RecordCallback = Arc<dyn Fn(Record) + Send + Sync>;

/// Called on delivery errors instead of closing the subscription.
pub type ErrorCallback = Arc<dyn Fn(LedgerError) + Send + Sync>;

/// Handle to an open subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscriptionHandle {
    address: Address,
    id: u64,
}

impl SubscriptionHandle {
    /// Watched log.
    pub fn address(&self) -> Address {
        self.address
    }
}

/// An escalated delivery error from a subscription without an error callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscriptionFailure {
    /// Log whose subscription failed.
    pub address: Address,
    /// Delivery error.
    pub error: LedgerError,
}

#[derive(Clone, Debug)]
enum Readiness {
    Connecting,
    Open,
    Failed(LedgerError),
}

struct Entry {
    id: u64,
    refs: usize,
    task: Option<AbortHandle>,
    ready: watch::Sender<Readiness>,
}

struct Manager {
    network: Arc<dyn LedgerNetwork>,
    timers: TimerRegistry,
    entries: Mutex<HashMap<Address, Entry>>,
    failures: broadcast::Sender<SubscriptionFailure>,
    ids: AtomicU64,
}

/// Registry of live subscriptions. Clones share state.
#[derive(Clone)]
pub struct SubscriptionManager {
    inner: Arc<Manager>,
}

fn timer_key(address: &Address) -> String {
    format!("channel:{address}")
}

impl SubscriptionManager {
    /// Manager over `network`, arming idle timers in `timers`.
    pub fn new(network: Arc<dyn LedgerNetwork>, timers: TimerRegistry) -> Self {
        let (failures, _) = broadcast::channel(FAILURE_CAPACITY);
        Self {
            inner: Arc::new(Manager {
                network,
                timers,
                entries: Mutex::new(HashMap::new()),
                failures,
                ids: AtomicU64::new(1),
            }),
        }
    }

    /// Watch `address` for new records.
    ///
    /// An already open subscription is shared: its reference count goes up
    /// and the existing handle is returned, keeping the original callbacks.
    /// A zero `idle_lifetime` keeps the subscription open until closed.
    ///
    /// A repeat open during the first one's connect resolves with the same
    /// outcome: the shared handle, the connect error, or `Cancelled` when
    /// the subscription was closed in between.
    pub async fn open_subscription(
        &self,
        address: Address,
        on_record: RecordCallback,
        on_error: Option<ErrorCallback>,
        idle_lifetime: Duration,
    ) -> Result<SubscriptionHandle, LedgerError> {
        let id = match {
            let mut entries = self.inner.entries.lock();
            if let Some(entry) = entries.get_mut(&address) {
                entry.refs += 1;
                debug!(%address, refs = entry.refs, "Reusing subscription");
                let handle = SubscriptionHandle { address, id: entry.id };
                let ready = entry.ready.subscribe();
                drop(entries);
                Err((handle, ready))
            } else {
                let id = self.inner.ids.fetch_add(1, Ordering::Relaxed);
                let (ready, _) = watch::channel(Readiness::Connecting);
                entries.insert(
                    address,
                    Entry {
                        id,
                        refs: 1,
                        task: None,
                        ready,
                    },
                );
                Ok(id)
            }
        } {
            Ok(id) => id,
            Err((handle, ready)) => return wait_ready(handle, ready).await,
        };

        let stream = match self.connect(&address).await {
            Ok(stream) => stream,
            Err(e) => {
                self.fail_if_current(address, id, &e);
                return Err(e);
            }
        };

        // Timer and pump are only set up for the entry this call registered.
        let mut entries = self.inner.entries.lock();
        let Some(entry) = entries.get_mut(&address).filter(|entry| entry.id == id) else {
            debug!(%address, "Subscription closed while connecting");
            return Err(LedgerError::Cancelled);
        };

        let idle_timer = !idle_lifetime.is_zero();
        if idle_timer {
            let manager = Arc::downgrade(&self.inner);
            self.inner.timers.start(timer_key(&address), idle_lifetime, move || {
                if let Some(inner) = manager.upgrade() {
                    debug!(%address, "Subscription idle, closing");
                    SubscriptionManager { inner }.close_if_current(address, id);
                }
            });
        }

        let task = tokio::spawn(pump(
            Arc::downgrade(&self.inner),
            address,
            id,
            stream,
            on_record,
            on_error,
            idle_timer,
        ));
        entry.task = Some(task.abort_handle());
        entry.ready.send_replace(Readiness::Open);
        debug!(%address, "Subscription opened");
        Ok(SubscriptionHandle { address, id })
    }

    async fn connect(&self, address: &Address) -> Result<RawRecordStream, LedgerError> {
        self.inner.network.open_connection(address).await?;
        self.inner.network.subscribe_new(address).await
    }

    /// Close the subscription on `address`, whatever its reference count.
    pub fn close_subscription(&self, address: &Address) {
        let removed = self.inner.entries.lock().remove(address);
        if let Some(entry) = removed {
            self.teardown(address, entry);
        }
    }

    /// Drop one reference; closes at zero. Returns the references left.
    pub fn release_subscription(&self, address: &Address) -> usize {
        let removed = {
            let mut entries = self.inner.entries.lock();
            match entries.get_mut(address) {
                None => return 0,
                Some(entry) if entry.refs > 1 => {
                    entry.refs -= 1;
                    return entry.refs;
                }
                Some(_) => entries.remove(address),
            }
        };
        if let Some(entry) = removed {
            self.teardown(address, entry);
        }
        0
    }

    /// Close every subscription.
    pub fn close_all(&self) {
        let drained: Vec<(Address, Entry)> = self.inner.entries.lock().drain().collect();
        for (address, entry) in drained {
            self.teardown(&address, entry);
        }
    }

    /// Whether `address` is watched.
    pub fn is_open(&self, address: &Address) -> bool {
        self.inner.entries.lock().contains_key(address)
    }

    /// References held on `address`.
    pub fn ref_count(&self, address: &Address) -> usize {
        self.inner.entries.lock().get(address).map_or(0, |e| e.refs)
    }

    /// Number of open subscriptions.
    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    /// True when nothing is watched.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Escalated failures of subscriptions opened without an error callback.
    pub fn failures(&self) -> broadcast::Receiver<SubscriptionFailure> {
        self.inner.failures.subscribe()
    }

    fn fail_if_current(&self, address: Address, id: u64, error: &LedgerError) {
        let removed = {
            let mut entries = self.inner.entries.lock();
            match entries.get(&address) {
                Some(entry) if entry.id == id => entries.remove(&address),
                _ => None,
            }
        };
        if let Some(entry) = removed {
            entry.ready.send_replace(Readiness::Failed(error.clone()));
            self.teardown(&address, entry);
        }
    }

    fn close_if_current(&self, address: Address, id: u64) {
        let removed = {
            let mut entries = self.inner.entries.lock();
            match entries.get(&address) {
                Some(entry) if entry.id == id => entries.remove(&address),
                _ => None,
            }
        };
        if let Some(entry) = removed {
            self.teardown(&address, entry);
        }
    }

    fn teardown(&self, address: &Address, entry: Entry) {
        self.inner.timers.stop(&timer_key(address));
        if let Some(task) = entry.task {
            task.abort();
        }
        debug!(%address, "Subscription closed");
    }
}

/// Waits out a pending connect started by another opener.
async fn wait_ready(
    handle: SubscriptionHandle,
    mut ready: watch::Receiver<Readiness>,
) -> Result<SubscriptionHandle, LedgerError> {
    loop {
        let state = ready.borrow_and_update().clone();
        match state {
            Readiness::Open => return Ok(handle),
            Readiness::Failed(error) => return Err(error),
            Readiness::Connecting => {}
        }
        // Sender dropped: closed before the connect finished.
        if ready.changed().await.is_err() {
            return Err(LedgerError::Cancelled);
        }
    }
}

async fn pump(
    manager: Weak<Manager>,
    address: Address,
    id: u64,
    mut stream: RawRecordStream,
    on_record: RecordCallback,
    on_error: Option<ErrorCallback>,
    idle_timer: bool,
) {
    while let Some(item) = stream.next().await {
        let Some(inner) = manager.upgrade() else {
            return;
        };
        let manager_handle = SubscriptionManager { inner };
        match item.and_then(|raw| Record::decode(&raw)) {
            Ok(record) => {
                if idle_timer {
                    manager_handle.inner.timers.reset(&timer_key(&address));
                }
                if !record.is_placeholder() {
                    on_record(record);
                }
            }
            Err(error) => match &on_error {
                Some(callback) => callback(error),
                None => {
                    warn!(%address, %error, "Subscription failed, closing");
                    manager_handle.close_if_current(address, id);
                    let _ = manager_handle
                        .inner
                        .failures
                        .send(SubscriptionFailure { address, error });
                    return;
                }
            },
        }
    }
    if let Some(inner) = manager.upgrade() {
        debug!(%address, "Subscription stream ended");
        SubscriptionManager { inner }.close_if_current(address, id);
    }
}
