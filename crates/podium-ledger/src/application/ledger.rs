//! # Ledger Service
//!
//! Entry point for domain operations. Owns the ports, the write path, the
//! history reader, the timer registry and the subscription manager, and
//! hands out [`User`], [`ActiveUser`] and [`Post`] views bound to itself.

use super::history::History;
use super::post::Post;
use super::subscriptions::{RecordCallback, SubscriptionHandle, SubscriptionManager};
use super::timers::TimerRegistry;
use super::user::{ActiveUser, User};
use super::writer::{WriteBatch, Writer};
use crate::adapters::{InMemoryLedger, InMemoryObjectStore, InMemoryUserDirectory};
use crate::algorithms::{address_for, address_of, keystore_address, reduce_profile, LogKind};
use crate::config::LedgerConfig;
use crate::domain::{
    document, placeholder_payload, Address, Document, Identity, LedgerError, Record, UserSummary,
};
use crate::ports::{LedgerNetwork, ObjectStore, UserDirectory};
use podium_crypto::{decrypt_key, encrypt_key, EncryptedKey};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Attempts for views that must exist (profiles, balances, posts) before a
/// timeout is reported.
pub const VIEW_RETRIES: u32 = 3;

/// Integrity score of a new account.
const INITIAL_INTEGRITY: f64 = 0.5;

struct LedgerInner {
    config: LedgerConfig,
    store: Arc<dyn ObjectStore>,
    directory: Arc<dyn UserDirectory>,
    writer: Writer,
    history: History,
    timers: TimerRegistry,
    subscriptions: SubscriptionManager,
}

/// Shared handle to the access layer. Clones are cheap.
#[derive(Clone)]
pub struct Ledger {
    inner: Arc<LedgerInner>,
}

impl Ledger {
    /// Ledger over the given ports.
    pub fn new(
        config: LedgerConfig,
        network: Arc<dyn LedgerNetwork>,
        store: Arc<dyn ObjectStore>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        let timers = TimerRegistry::new();
        let writer = Writer::new(Arc::clone(&network), config.network_id.clone());
        let history = History::new(Arc::clone(&network), &config);
        let subscriptions = SubscriptionManager::new(network, timers.clone());
        Self {
            inner: Arc::new(LedgerInner {
                config,
                store,
                directory,
                writer,
                history,
                timers,
                subscriptions,
            }),
        }
    }

    /// Ledger backed entirely by in-memory adapters.
    pub fn in_memory(config: LedgerConfig) -> Self {
        Self::new(
            config,
            Arc::new(InMemoryLedger::new()),
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(InMemoryUserDirectory::new()),
        )
    }

    /// Active configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.inner.config
    }

    /// Write path.
    pub fn writer(&self) -> &Writer {
        &self.inner.writer
    }

    /// History reader.
    pub fn history(&self) -> &History {
        &self.inner.history
    }

    /// Subscription manager.
    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.inner.subscriptions
    }

    /// Timer registry shared with the subscription manager.
    pub fn timers(&self) -> &TimerRegistry {
        &self.inner.timers
    }

    /// Object store.
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.inner.store
    }

    /// Username search cache.
    pub fn directory(&self) -> &Arc<dyn UserDirectory> {
        &self.inner.directory
    }

    pub(crate) async fn records(&self, address: Address) -> Result<Vec<Record>, LedgerError> {
        self.inner
            .history
            .fetch_history(address, self.inner.config.timeout())
            .await
    }

    /// History of a log that may legitimately be empty; a timeout is no records.
    pub(crate) async fn records_or_empty(&self, address: Address) -> Result<Vec<Record>, LedgerError> {
        match self.records(address).await {
            Err(e) if e.is_timeout() => Ok(Vec::new()),
            other => other,
        }
    }

    /// History of a log that should exist; timeouts are retried.
    pub(crate) async fn records_retrying(&self, address: Address) -> Result<Vec<Record>, LedgerError> {
        let mut attempt = 1;
        loop {
            match self.records(address).await {
                Err(e) if e.is_timeout() && attempt < VIEW_RETRIES => {
                    debug!(%address, attempt, "History timed out, retrying");
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    pub(crate) async fn latest(&self, address: Address) -> Result<Record, LedgerError> {
        self.inner
            .history
            .fetch_latest(address, self.inner.config.timeout())
            .await
    }

    /// Watch a log with the configured idle lifetime.
    pub(crate) async fn watch(
        &self,
        address: Address,
        on_record: RecordCallback,
    ) -> Result<SubscriptionHandle, LedgerError> {
        self.inner
            .subscriptions
            .open_subscription(address, on_record, None, self.inner.config.connection_lifetime())
            .await
    }

    /// Account address owning `id`, if any.
    pub async fn is_user(&self, id: &str) -> Result<Option<Address>, LedgerError> {
        debug!(id, "Checking if user exists");
        match self.latest(address_for(LogKind::OwnershipOfId, id)).await {
            Ok(record) => Ok(record.get_address("owner")),
            Err(LedgerError::NoData { .. }) => Ok(None),
            Err(e) if e.is_timeout() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Register `id` with a fresh key pair protected by `passphrase`.
    pub async fn create_user(&self, id: &str, passphrase: &str) -> Result<ActiveUser, LedgerError> {
        if id.trim().is_empty() {
            return Err(LedgerError::InvalidArgument("user id must not be empty".into()));
        }
        if passphrase.is_empty() {
            return Err(LedgerError::InvalidArgument("passphrase must not be empty".into()));
        }
        if self.is_user(id).await?.is_some() {
            return Err(LedgerError::DuplicateUser(id.to_string()));
        }

        let identity = Identity::generate();
        let address = identity.address();
        let encrypted = encrypt_key(identity.keypair(), passphrase)?;
        info!(id, %address, "Creating user");

        let mut keystore = document(json!({"record": "keystore", "type": "keypair"}));
        if let Value::Object(fields) = serde_json::to_value(&encrypted)? {
            keystore.extend(fields);
        }

        let batch = WriteBatch::new()
            .with(vec![keystore_address(id, passphrase)], keystore)
            .with(
                vec![address],
                document(json!({
                    "record": "profile",
                    "type": "id",
                    "id": id,
                    "address": address.to_hex(),
                })),
            )
            .with(
                vec![address_of(LogKind::PodTransactionsOf, &address)],
                document(json!({
                    "record": "transaction",
                    "type": "POD",
                    "to": address.to_hex(),
                    "value": self.inner.config.initial_grant,
                    "from": "creation",
                })),
            )
            .with(
                vec![address_of(LogKind::IntegrityOf, &address)],
                document(json!({
                    "record": "integrity",
                    "type": "change",
                    "owner": address.to_hex(),
                    "i": INITIAL_INTEGRITY,
                    "from": "",
                })),
            )
            .with(
                vec![address_for(LogKind::OwnershipOfId, id)],
                document(json!({
                    "record": "ownership",
                    "type": "username",
                    "id": id,
                    "owner": address.to_hex(),
                })),
            )
            .with(
                vec![
                    address_of(LogKind::PostsBy, &address),
                    address_of(LogKind::UsersFollowing, &address),
                    address_of(LogKind::UsersFollowedBy, &address),
                ],
                placeholder_payload(),
            );
        self.inner.writer.write_batch(&identity, batch).await?;
        self.inner.directory.add_user(id, address).await?;

        Ok(ActiveUser::new(self.clone(), identity, encrypted))
    }

    /// Decrypt the keystore entry for (`id`, `passphrase`).
    pub async fn sign_in(&self, id: &str, passphrase: &str) -> Result<ActiveUser, LedgerError> {
        debug!(id, "Signing in");
        let record = match self.latest(keystore_address(id, passphrase)).await {
            Ok(record) => record,
            Err(LedgerError::NoData { .. }) => return Err(LedgerError::InvalidCredentials),
            Err(e) if e.is_timeout() => return Err(LedgerError::InvalidCredentials),
            Err(e) => return Err(e),
        };
        let encrypted: EncryptedKey = serde_json::from_value(Value::Object(record.payload))?;
        self.key_in(encrypted, passphrase)
    }

    /// Unlock an encrypted key held by the client.
    pub fn key_in(&self, encrypted: EncryptedKey, passphrase: &str) -> Result<ActiveUser, LedgerError> {
        let keypair = decrypt_key(&encrypted, passphrase).map_err(|_| LedgerError::InvalidCredentials)?;
        let identity = Identity::from_keypair(keypair);
        debug!(address = %identity.address(), "Keyed in");
        Ok(ActiveUser::new(self.clone(), identity, encrypted))
    }

    /// Read-only view of an account.
    pub fn user(&self, address: Address) -> User {
        User::new(self.clone(), address)
    }

    /// Read-only view of the account owning `id`.
    pub async fn user_by_id(&self, id: &str) -> Result<Option<User>, LedgerError> {
        let cached = self.inner.directory.lookup(id).await?;
        let address = match cached {
            Some(address) => Some(address),
            None => self.is_user(id).await?,
        };
        Ok(address.map(|a| self.user(a)))
    }

    /// Read-only view of a post.
    pub fn post(&self, address: Address) -> Post {
        Post::new(self.clone(), address)
    }

    /// Users whose id contains `pattern`.
    pub async fn search_users(&self, pattern: &str) -> Result<Vec<UserSummary>, LedgerError> {
        self.inner.directory.find_users_matching(pattern).await
    }

    /// Topic definition by id, `None` when never created.
    pub async fn topic(&self, id: &str) -> Result<Option<Document>, LedgerError> {
        let records = self.records_or_empty(address_for(LogKind::TopicWithId, id)).await?;
        Ok((!records.is_empty()).then(|| reduce_profile(&records)))
    }

    /// Stored media object at `address`.
    pub async fn media(&self, address: &Address) -> Result<Option<Document>, LedgerError> {
        self.inner.store.get(&media_key(address)).await
    }

    /// Stop every timer and close every subscription.
    pub fn clean_up(&self) {
        self.inner.subscriptions.close_all();
        self.inner.timers.stop_all();
        info!("Ledger cleaned up");
    }
}

/// Object store key of a media object.
pub(crate) fn media_key(address: &Address) -> String {
    format!("media/{address}")
}
