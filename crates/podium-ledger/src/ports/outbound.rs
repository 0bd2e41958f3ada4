//! # Outbound Ports
//!
//! The ledger network, the object store and the username search cache.
//! Only the interface is specified here; in-memory implementations live in
//! `crate::adapters`.

use crate::domain::{Address, Document, Identity, LedgerError, RawRecord, UserSummary};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Record stream for one log address.
pub type RawRecordStream = BoxStream<'static, Result<RawRecord, LedgerError>>;

/// Distributed ledger network - outbound port.
#[async_trait]
pub trait LedgerNetwork: Send + Sync {
    /// Atomically append `payload` to every log in `targets`, signed by `identity`.
    async fn submit(
        &self,
        targets: &[Address],
        network_id: &str,
        payload: Vec<u8>,
        identity: &Identity,
    ) -> Result<(), LedgerError>;

    /// Open a node connection for `address`. Idempotent and retryable.
    async fn open_connection(&self, address: &Address) -> Result<(), LedgerError>;

    /// Every record ever written to `address`, then live ones. Never signals
    /// "caught up".
    async fn subscribe_all(&self, address: &Address) -> Result<RawRecordStream, LedgerError>;

    /// Only records written after the call (no backfill).
    async fn subscribe_new(&self, address: &Address) -> Result<RawRecordStream, LedgerError>;
}

/// Config/media object store - outbound port.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch a document, `None` when the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Document>, LedgerError>;

    /// Store a document, replacing any previous value.
    async fn put(&self, key: &str, document: Document) -> Result<(), LedgerError>;
}

/// Local username search cache - outbound port.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Record a newly created user.
    async fn add_user(&self, id: &str, address: Address) -> Result<(), LedgerError>;

    /// Users whose id contains `pattern` (case-insensitive).
    async fn find_users_matching(&self, pattern: &str) -> Result<Vec<UserSummary>, LedgerError>;

    /// Address of the user with exactly this id.
    async fn lookup(&self, id: &str) -> Result<Option<Address>, LedgerError>;
}
