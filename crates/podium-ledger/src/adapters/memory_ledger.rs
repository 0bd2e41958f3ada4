//! # In-Memory Ledger
//!
//! A single-process stand-in for the ledger network. Logs are vectors of
//! raw records plus a broadcast channel for live delivery. Like the real
//! network it never tells a subscriber that history is complete.
//!
//! Test hooks: out-of-order backlog delivery, injected records with chosen
//! timestamps, transient connection failures, stream errors and an offline
//! switch for submissions.

use crate::domain::{encode_payload, now_millis, Address, Document, Identity, LedgerError, RawRecord};
use crate::ports::{LedgerNetwork, RawRecordStream};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

/// Live delivery buffer per log.
const LIVE_CAPACITY: usize = 1024;

type LiveItem = Result<RawRecord, LedgerError>;

struct LogState {
    records: Vec<RawRecord>,
    live: broadcast::Sender<LiveItem>,
}

impl LogState {
    fn new() -> Self {
        let (live, _) = broadcast::channel(LIVE_CAPACITY);
        Self {
            records: Vec::new(),
            live,
        }
    }

    fn append(&mut self, record: RawRecord) {
        self.records.push(record.clone());
        // No live subscribers is fine.
        let _ = self.live.send(Ok(record));
    }
}

/// In-memory ledger network.
pub struct InMemoryLedger {
    logs: Mutex<HashMap<Address, LogState>>,
    last_timestamp: AtomicU64,
    reverse_backlog: AtomicBool,
    offline: AtomicBool,
    failing_opens: AtomicU32,
    submissions: AtomicUsize,
    opens: AtomicUsize,
    full_subscriptions: AtomicUsize,
    live_subscriptions: AtomicUsize,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self {
            logs: Mutex::new(HashMap::new()),
            last_timestamp: AtomicU64::new(0),
            reverse_backlog: AtomicBool::new(false),
            offline: AtomicBool::new(false),
            failing_opens: AtomicU32::new(0),
            submissions: AtomicUsize::new(0),
            opens: AtomicUsize::new(0),
            full_subscriptions: AtomicUsize::new(0),
            live_subscriptions: AtomicUsize::new(0),
        }
    }

    /// Deliver stored history newest-first, the opposite of ledger order.
    pub fn with_reversed_backlog(self) -> Self {
        self.reverse_backlog.store(true, Ordering::SeqCst);
        self
    }

    /// Append a record with an explicit ledger timestamp, bypassing signing.
    pub fn inject(&self, address: Address, payload: &Document, created_at: u64) -> Result<(), LedgerError> {
        let record = RawRecord {
            payload: encode_payload(payload)?,
            created_at,
        };
        self.logs
            .lock()
            .entry(address)
            .or_insert_with(LogState::new)
            .append(record);
        Ok(())
    }

    /// Push an error to every live subscriber of `address`.
    pub fn fail_stream(&self, address: Address, error: LedgerError) {
        if let Some(log) = self.logs.lock().get(&address) {
            let _ = log.live.send(Err(error));
        }
    }

    /// Make the next `count` connection attempts fail.
    pub fn fail_next_opens(&self, count: u32) {
        self.failing_opens.store(count, Ordering::SeqCst);
    }

    /// Reject submissions while offline.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Records stored at `address`.
    pub fn record_count(&self, address: &Address) -> usize {
        self.logs.lock().get(address).map_or(0, |log| log.records.len())
    }

    /// Accepted submissions.
    pub fn submission_count(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    /// Connection attempts, including failed ones.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// `subscribe_all` calls.
    pub fn full_subscription_count(&self) -> usize {
        self.full_subscriptions.load(Ordering::SeqCst)
    }

    /// `subscribe_new` calls.
    pub fn live_subscription_count(&self) -> usize {
        self.live_subscriptions.load(Ordering::SeqCst)
    }

    fn next_timestamp(&self) -> u64 {
        let now = now_millis();
        let previous = self
            .last_timestamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_default();
        now.max(previous + 1)
    }
}

fn live_stream(address: Address, receiver: broadcast::Receiver<LiveItem>) -> RawRecordStream {
    BroadcastStream::new(receiver)
        .filter_map(move |item| {
            futures::future::ready(match item {
                Ok(item) => Some(item),
                Err(BroadcastStreamRecvError::Lagged(count)) => {
                    warn!(address = %address, lagged = count, "Live subscriber lagged, records dropped");
                    None
                }
            })
        })
        .boxed()
}

#[async_trait]
impl LedgerNetwork for InMemoryLedger {
    async fn submit(
        &self,
        targets: &[Address],
        network_id: &str,
        payload: Vec<u8>,
        identity: &Identity,
    ) -> Result<(), LedgerError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(LedgerError::Network("ledger offline".into()));
        }

        let signature = identity.sign(&payload);
        identity.public_key().verify(&payload, &signature)?;

        let record = RawRecord {
            payload,
            created_at: self.next_timestamp(),
        };
        {
            let mut logs = self.logs.lock();
            for target in targets {
                logs.entry(*target)
                    .or_insert_with(LogState::new)
                    .append(record.clone());
            }
        }
        self.submissions.fetch_add(1, Ordering::SeqCst);

        debug!(
            network = network_id,
            targets = targets.len(),
            created_at = record.created_at,
            signer = %identity.address(),
            "Atom accepted"
        );
        Ok(())
    }

    async fn open_connection(&self, address: &Address) -> Result<(), LedgerError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .failing_opens
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(LedgerError::Network(format!("node connection for {address} refused")));
        }
        Ok(())
    }

    async fn subscribe_all(&self, address: &Address) -> Result<RawRecordStream, LedgerError> {
        self.full_subscriptions.fetch_add(1, Ordering::SeqCst);
        // Snapshot and subscribe under one lock so nothing falls in between.
        let (mut backlog, receiver) = {
            let mut logs = self.logs.lock();
            let log = logs.entry(*address).or_insert_with(LogState::new);
            (log.records.clone(), log.live.subscribe())
        };
        if self.reverse_backlog.load(Ordering::SeqCst) {
            backlog.reverse();
        }
        let backlog = stream::iter(backlog.into_iter().map(Ok));
        Ok(backlog.chain(live_stream(*address, receiver)).boxed())
    }

    async fn subscribe_new(&self, address: &Address) -> Result<RawRecordStream, LedgerError> {
        self.live_subscriptions.fetch_add(1, Ordering::SeqCst);
        let receiver = self
            .logs
            .lock()
            .entry(*address)
            .or_insert_with(LogState::new)
            .live
            .subscribe();
        Ok(live_stream(*address, receiver))
    }
}
