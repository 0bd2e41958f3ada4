//! # Network Bootstrap
//!
//! Resolves which network this server runs, prepares its root account and
//! hands back a running node.
//!
//! The object store holds a `live` pointer (`{"ID": <network id>}`) and one
//! `networks/<id>` record per network iteration. A clean launch starts the
//! next iteration of the live network; otherwise the live network resumes.

use crate::config::NodeConfig;
use podium_ledger::domain::{document, now_millis, Document};
use podium_ledger::{
    ActiveUser, Address, InMemoryLedger, InMemoryObjectStore, InMemoryUserDirectory, Ledger,
    LedgerError, LedgerNetwork, ObjectStore, RpcDispatcher, UserDirectory,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Object store key of the live network pointer.
pub const LIVE_KEY: &str = "live";

/// Object store key of the reserved account list.
pub const ACCOUNTS_KEY: &str = "accounts";

/// Object store key of a network record.
pub fn network_key(id: &str) -> String {
    format!("networks/{id}")
}

/// Bootstrap errors.
#[derive(Debug, Error)]
pub enum NodeError {
    /// The live pointer names a network with no stored record.
    #[error("Network `{0}` not found")]
    NetworkNotFound(String),

    /// A network id without a numeric iteration suffix.
    #[error("Malformed network id `{0}`")]
    MalformedNetworkId(String),

    /// Ledger access failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Persisted description of one network iteration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRecord {
    /// `<name>|<version>|<n>`
    #[serde(rename = "ID")]
    pub id: String,

    /// Passphrase of the root account.
    #[serde(rename = "Key")]
    pub key: String,

    /// Creation time (ms since epoch).
    #[serde(rename = "Created")]
    pub created: u64,

    /// Set once the root account has been fully set up.
    #[serde(rename = "Launched")]
    pub launched: bool,
}

impl NetworkRecord {
    fn to_document(&self) -> Result<Document, LedgerError> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(LedgerError::Codec(format!("network record encoded as {other}"))),
        }
    }

    fn from_document(doc: Document) -> Result<Self, LedgerError> {
        Ok(serde_json::from_value(Value::Object(doc))?)
    }

    /// Iteration number, the last segment of the id.
    pub fn subversion(&self) -> Result<u64, NodeError> {
        self.id
            .rsplit('|')
            .next()
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| NodeError::MalformedNetworkId(self.id.clone()))
    }
}

/// An account seeded on first launch. Each one follows the root account.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReservedAccount {
    /// User id.
    pub identity: String,
    /// Passphrase.
    pub passphrase: String,
    /// Profile fields.
    #[serde(default)]
    pub profile: Document,
    /// Optional first post.
    #[serde(default)]
    pub post: Option<String>,
}

#[derive(Deserialize)]
struct ReservedAccounts {
    accounts: Vec<ReservedAccount>,
}

/// Unlaunched node: configuration plus the ports it runs over.
pub struct Node {
    config: NodeConfig,
    network: Arc<dyn LedgerNetwork>,
    store: Arc<dyn ObjectStore>,
    directory: Arc<dyn UserDirectory>,
}

impl Node {
    /// Node over the given ports.
    pub fn new(
        config: NodeConfig,
        network: Arc<dyn LedgerNetwork>,
        store: Arc<dyn ObjectStore>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            config,
            network,
            store,
            directory,
        }
    }

    /// Node backed entirely by in-memory adapters.
    pub fn in_memory(config: NodeConfig) -> Self {
        Self::new(
            config,
            Arc::new(InMemoryLedger::new()),
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(InMemoryUserDirectory::new()),
        )
    }

    /// Node configuration.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Resolve the network to run: the next iteration when `clean`, the
    /// live one otherwise, or a brand new one when nothing is live.
    pub async fn load_network(&self, clean: bool) -> Result<NetworkRecord, NodeError> {
        let live = self
            .store
            .get(LIVE_KEY)
            .await?
            .and_then(|doc| doc.get("ID").and_then(Value::as_str).map(str::to_owned));

        match live {
            Some(id) if clean => {
                let previous = self.resume_network(&id).await?;
                let subversion = previous.subversion()? + 1;
                info!(from = %id, subversion, "Creating network iteration");
                self.new_network(subversion).await
            }
            Some(id) => {
                info!(%id, "Resuming network");
                self.resume_network(&id).await
            }
            None => {
                info!("Creating new network");
                self.new_network(0).await
            }
        }
    }

    async fn new_network(&self, subversion: u64) -> Result<NetworkRecord, NodeError> {
        let network = NetworkRecord {
            id: self.config.network_id(subversion),
            key: Uuid::new_v4().to_string(),
            created: now_millis(),
            launched: false,
        };
        info!(id = %network.id, "New network");

        tokio::try_join!(
            self.store.put(LIVE_KEY, document(json!({"ID": network.id}))),
            self.store_network(&network),
        )?;
        Ok(network)
    }

    async fn resume_network(&self, id: &str) -> Result<NetworkRecord, NodeError> {
        let doc = self
            .store
            .get(&network_key(id))
            .await?
            .ok_or_else(|| NodeError::NetworkNotFound(id.to_string()))?;
        Ok(NetworkRecord::from_document(doc)?)
    }

    async fn store_network(&self, network: &NetworkRecord) -> Result<(), LedgerError> {
        self.store
            .put(&network_key(&network.id), network.to_document()?)
            .await
    }

    /// Launch the node.
    ///
    /// A network that has not been launched yet gets its root account set
    /// up and is then marked launched; a launched one signs the root in.
    pub async fn launch(&self, clean: bool) -> Result<RunningNode, NodeError> {
        info!("===========================================");
        info!("  Podium Node v{}", crate::VERSION);
        info!("===========================================");

        let mut network = self.load_network(clean).await?;

        let mut ledger_config = self.config.ledger.clone();
        ledger_config.network_id = network.id.clone();
        let ledger = Ledger::new(
            ledger_config,
            Arc::clone(&self.network),
            Arc::clone(&self.store),
            Arc::clone(&self.directory),
        );

        let root = if network.launched {
            let root = ledger.sign_in(&self.config.root.id, &network.key).await?;
            info!(address = %root.address(), "Root user signed in");
            root
        } else {
            let root = self.new_nation(&ledger, &network).await?;
            network.launched = true;
            self.store_network(&network).await?;
            info!(id = %network.id, "Network marked launched");
            root
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        info!(network = %network.id, root = %root.address(), "Podium node online");
        Ok(RunningNode {
            dispatcher: RpcDispatcher::new(ledger.clone()),
            network,
            ledger,
            root,
            shutdown_tx,
            shutdown_rx,
        })
    }

    async fn new_nation(
        &self,
        ledger: &Ledger,
        network: &NetworkRecord,
    ) -> Result<ActiveUser, NodeError> {
        let settings = &self.config.root;

        let root = match ledger.create_user(&settings.id, &network.key).await {
            Ok(root) => {
                info!(address = %root.address(), "Created root user");
                root
            }
            Err(LedgerError::DuplicateUser(_)) => {
                let root = ledger.sign_in(&settings.id, &network.key).await?;
                ledger.directory().add_user(&settings.id, root.address()).await?;
                info!(address = %root.address(), "Root user already exists, signed in");
                root
            }
            Err(e) => return Err(e.into()),
        };

        root.mint(self.config.initial_mint).await?;
        info!(value = self.config.initial_mint, "Minted initial POD");

        let profile = document(json!({"name": settings.name, "bio": settings.bio}));
        tokio::try_join!(
            root.update_profile(profile),
            root.create_post(&settings.first_post, &[], None),
        )?;
        info!("Created root profile and first post");

        let seeded = self.seed_accounts(ledger, root.address()).await?;
        if seeded > 0 {
            info!(seeded, "Created reserved accounts");
        }
        Ok(root)
    }

    /// Create the reserved accounts listed in the object store. A failing
    /// account is logged and skipped.
    async fn seed_accounts(&self, ledger: &Ledger, root: Address) -> Result<usize, LedgerError> {
        let Some(doc) = self.store.get(ACCOUNTS_KEY).await? else {
            return Ok(0);
        };
        let list: ReservedAccounts = serde_json::from_value(Value::Object(doc))?;

        let mut seeded = 0;
        for account in list.accounts {
            match seed_account(ledger, root, &account).await {
                Ok(()) => {
                    info!(id = %account.identity, "Created reserved account");
                    seeded += 1;
                }
                Err(e) => warn!(id = %account.identity, error = %e, "Skipping reserved account"),
            }
        }
        Ok(seeded)
    }
}

async fn seed_account(
    ledger: &Ledger,
    root: Address,
    account: &ReservedAccount,
) -> Result<(), LedgerError> {
    let user = ledger.create_user(&account.identity, &account.passphrase).await?;
    user.follow(root).await?;
    if let Some(post) = account.post.as_deref().filter(|p| !p.is_empty()) {
        user.create_post(post, &[], None).await?;
    }
    if !account.profile.is_empty() {
        user.update_profile(account.profile.clone()).await?;
    }
    Ok(())
}

/// A launched node.
pub struct RunningNode {
    network: NetworkRecord,
    ledger: Ledger,
    root: ActiveUser,
    dispatcher: RpcDispatcher,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl std::fmt::Debug for RunningNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningNode")
            .field("network", &self.network)
            .finish_non_exhaustive()
    }
}

impl RunningNode {
    /// Network this node runs.
    pub fn network(&self) -> &NetworkRecord {
        &self.network
    }

    /// Ledger for the network.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Signed-in root account.
    pub fn root(&self) -> &ActiveUser {
        &self.root
    }

    /// RPC entry point for client sessions.
    pub fn dispatcher(&self) -> &RpcDispatcher {
        &self.dispatcher
    }

    /// Receiver that flips to `true` on shutdown.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// True once shutdown has begun.
    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Signal shutdown, then close every subscription and timer.
    pub fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
        self.ledger.clean_up();
        info!("Shutdown complete");
    }
}
