//! # Write Path
//!
//! Appends facts to logs. A single write is one atomic multi-target
//! submission; a batch is several independent writes issued concurrently.

use crate::domain::{encode_payload, Address, Document, Identity, LedgerError};
use crate::ports::LedgerNetwork;
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::debug;

/// Ordered `(targets, payload)` pairs.
#[derive(Clone, Debug, Default)]
pub struct WriteBatch {
    writes: Vec<(Vec<Address>, Document)>,
}

impl WriteBatch {
    /// Empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a write.
    pub fn with(mut self, targets: Vec<Address>, payload: Document) -> Self {
        self.push(targets, payload);
        self
    }

    /// Append a write in place.
    pub fn push(&mut self, targets: Vec<Address>, payload: Document) {
        self.writes.push((targets, payload));
    }

    /// Number of writes.
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// True with no writes.
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Signs and submits records for one network.
#[derive(Clone)]
pub struct Writer {
    network: Arc<dyn LedgerNetwork>,
    network_id: String,
}

impl Writer {
    /// Writer bound to `network_id`.
    pub fn new(network: Arc<dyn LedgerNetwork>, network_id: impl Into<String>) -> Self {
        Self {
            network,
            network_id: network_id.into(),
        }
    }

    /// Append `payload` to every log in `targets` in one submission.
    pub async fn write(
        &self,
        identity: &Identity,
        targets: &[Address],
        payload: &Document,
    ) -> Result<(), LedgerError> {
        if targets.is_empty() {
            return Err(LedgerError::EmptyTargets);
        }
        let bytes = encode_payload(payload)?;
        debug!(
            targets = targets.len(),
            bytes = bytes.len(),
            signer = %identity.address(),
            "Writing record"
        );
        self.network
            .submit(targets, &self.network_id, bytes, identity)
            .await
    }

    /// Issue every write of `batch` concurrently.
    ///
    /// Fails on the first error. Writes already accepted stay on the ledger.
    pub async fn write_batch(&self, identity: &Identity, batch: WriteBatch) -> Result<(), LedgerError> {
        debug!(writes = batch.len(), "Writing batch");
        try_join_all(
            batch
                .writes
                .iter()
                .map(|(targets, payload)| self.write(identity, targets, payload)),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryLedger;
    use crate::domain::document;
    use serde_json::json;

    fn addr(n: u8) -> Address {
        Address::from_bytes([n; 32])
    }

    fn setup() -> (Arc<InMemoryLedger>, Writer, Identity) {
        let ledger = Arc::new(InMemoryLedger::new());
        let writer = Writer::new(ledger.clone(), "podium|test|0");
        (ledger, writer, Identity::generate())
    }

    #[tokio::test]
    async fn test_write_lands_in_every_target() {
        let (ledger, writer, identity) = setup();
        let payload = document(json!({"record": "test"}));
        writer
            .write(&identity, &[addr(1), addr(2)], &payload)
            .await
            .unwrap();
        assert_eq!(ledger.record_count(&addr(1)), 1);
        assert_eq!(ledger.record_count(&addr(2)), 1);
        assert_eq!(ledger.submission_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_targets_rejected_before_network() {
        let (ledger, writer, identity) = setup();
        let err = writer
            .write(&identity, &[], &Document::new())
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::EmptyTargets);
        assert_eq!(ledger.submission_count(), 0);
    }

    #[tokio::test]
    async fn test_batch_issues_one_submission_per_pair() {
        let (ledger, writer, identity) = setup();
        let batch = WriteBatch::new()
            .with(vec![addr(1)], document(json!({"n": 1})))
            .with(vec![addr(2), addr(3)], document(json!({"n": 2})));
        writer.write_batch(&identity, batch).await.unwrap();
        assert_eq!(ledger.submission_count(), 2);
        assert_eq!(ledger.record_count(&addr(3)), 1);
    }

    #[tokio::test]
    async fn test_batch_fails_when_network_rejects() {
        let (ledger, writer, identity) = setup();
        ledger.set_offline(true);
        let batch = WriteBatch::new().with(vec![addr(1)], document(json!({"n": 1})));
        let err = writer.write_batch(&identity, batch).await.unwrap_err();
        assert!(matches!(err, LedgerError::Network(_)));
    }
}
