//! # History Reconstruction
//!
//! The ledger never says "that's everything", so completeness is inferred:
//! once records stop arriving for [`HISTORY_IDLE_WINDOW`] the history is
//! taken to be complete. A hard timeout bounds the wait for the first
//! record.
//!
//! ```text
//! open ──► subscribe_all ──► record ──► (re)arm idle ─┐
//!   ▲ retry                    ▲                     │
//!   └── push deadline          └─────────────────────┘
//!                    idle elapsed   ──► Ok(sorted)
//!                    hard deadline  ──► Ok(partial) | HistoryTimeout
//!                    stream ended   ──► Ok(sorted)  | Disconnected
//! ```

use crate::algorithms::order_by_creation;
use crate::config::LedgerConfig;
use crate::domain::{Address, LedgerError, Record};
use crate::ports::LedgerNetwork;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, warn};

/// Quiet period after which a history is considered complete.
pub const HISTORY_IDLE_WINDOW: Duration = Duration::from_secs(1);

/// Reads whole logs with completion inference.
#[derive(Clone)]
pub struct History {
    network: Arc<dyn LedgerNetwork>,
    open_retries: u32,
    open_retry_delay: Duration,
}

impl History {
    /// Reader using the retry settings of `config`.
    pub fn new(network: Arc<dyn LedgerNetwork>, config: &LedgerConfig) -> Self {
        Self {
            network,
            open_retries: config.open_retries.max(1),
            open_retry_delay: config.open_retry_delay(),
        }
    }

    /// Every non-placeholder record at `address`, oldest first.
    ///
    /// `hard_timeout` of `None` or zero waits indefinitely for the first record.
    pub async fn fetch_history(
        &self,
        address: Address,
        hard_timeout: Option<Duration>,
    ) -> Result<Vec<Record>, LedgerError> {
        self.run(address, hard_timeout, None).await
    }

    /// [`fetch_history`](Self::fetch_history), aborted with
    /// [`LedgerError::Cancelled`] once `cancel` turns `true`.
    pub async fn fetch_history_with_cancel(
        &self,
        address: Address,
        hard_timeout: Option<Duration>,
        cancel: watch::Receiver<bool>,
    ) -> Result<Vec<Record>, LedgerError> {
        self.run(address, hard_timeout, Some(cancel)).await
    }

    /// Most recent record at `address`.
    pub async fn fetch_latest(
        &self,
        address: Address,
        hard_timeout: Option<Duration>,
    ) -> Result<Record, LedgerError> {
        self.fetch_history(address, hard_timeout)
            .await?
            .into_iter()
            .max_by_key(|r| r.created_at)
            .ok_or(LedgerError::NoData { address })
    }

    async fn open(&self, address: &Address) -> Result<(), LedgerError> {
        let mut attempt = 1;
        loop {
            match self.network.open_connection(address).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.open_retries => {
                    warn!(%address, attempt, error = %e, "Node connection failed, retrying");
                    attempt += 1;
                    sleep(self.open_retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn run(
        &self,
        address: Address,
        hard_timeout: Option<Duration>,
        mut cancel: Option<watch::Receiver<bool>>,
    ) -> Result<Vec<Record>, LedgerError> {
        let hard_timeout = hard_timeout.filter(|t| !t.is_zero());
        debug!(%address, timeout_ms = ?hard_timeout.map(|t| t.as_millis()), "Fetching history");

        self.open(&address).await?;
        // Restarted after a successful open so retries never eat into it.
        let deadline = hard_timeout.map(|t| Instant::now() + t);
        let mut stream = self.network.subscribe_all(&address).await?;

        let mut records = Vec::new();
        let mut received = false;
        let idle = sleep(HISTORY_IDLE_WINDOW);
        let hard = sleep_until(deadline.unwrap_or_else(Instant::now));
        tokio::pin!(idle, hard);

        loop {
            tokio::select! {
                item = stream.next() => match item {
                    Some(Ok(raw)) => {
                        let record = Record::decode(&raw)?;
                        received = true;
                        if !record.is_placeholder() {
                            records.push(record);
                        }
                        idle.as_mut().reset(Instant::now() + HISTORY_IDLE_WINDOW);
                    }
                    Some(Err(e)) => {
                        warn!(%address, error = %e, "History stream failed");
                        return Err(e);
                    }
                    None if received => {
                        debug!(%address, records = records.len(), "History stream ended");
                        break;
                    }
                    None => return Err(LedgerError::Disconnected { address }),
                },
                () = &mut idle, if received => {
                    debug!(%address, records = records.len(), "History idle, resolving");
                    break;
                }
                () = &mut hard, if deadline.is_some() => {
                    if received {
                        debug!(%address, records = records.len(), "Hard timeout, resolving partial history");
                        break;
                    }
                    debug!(%address, "Hard timeout, no records");
                    return Err(LedgerError::HistoryTimeout { address });
                }
                () = cancelled(&mut cancel) => {
                    debug!(%address, "History fetch cancelled");
                    return Err(LedgerError::Cancelled);
                }
            }
        }

        order_by_creation(&mut records);
        Ok(records)
    }
}

/// Resolves once the signal reads `true`; never for `None` or a dropped sender.
async fn cancelled(signal: &mut Option<watch::Receiver<bool>>) {
    let Some(rx) = signal.as_mut() else {
        return std::future::pending().await;
    };
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}
