//! # Accounts
//!
//! [`User`] reads an account's logs. [`ActiveUser`] additionally holds the
//! account's [`Identity`] and is the only way to write on its behalf.

use super::ledger::{media_key, Ledger};
use super::post::Post;
use super::subscriptions::{RecordCallback, SubscriptionHandle};
use super::writer::WriteBatch;
use crate::algorithms::{
    address_for, address_of, chunk_text, media_address, new_post_address, post_cost, reduce_balance,
    reduce_follow_set, reduce_profile, reduce_reference_set, LogKind,
};
use crate::domain::{
    document, placeholder_payload, Address, Credentials, Document, Identity, LedgerError, Record,
};
use indexmap::IndexSet;
use podium_crypto::EncryptedKey;
use serde_json::{json, Value};
use std::ops::Deref;
use std::sync::Arc;
use tracing::{debug, info};

/// POD debited for promoting a post.
pub const PROMOTION_COST: i64 = 25;

/// Read-only view of an account.
#[derive(Clone)]
pub struct User {
    ledger: Ledger,
    address: Address,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User").field("address", &self.address).finish()
    }
}

impl User {
    pub(crate) fn new(ledger: Ledger, address: Address) -> Self {
        Self { ledger, address }
    }

    /// Account address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Ledger this view reads from.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    fn log(&self, kind: LogKind) -> Address {
        address_of(kind, &self.address)
    }

    /// Profile document.
    pub async fn profile(&self) -> Result<Document, LedgerError> {
        debug!(address = %self.address, "Fetching profile");
        let records = self.ledger.records_retrying(self.address).await?;
        Ok(reduce_profile(&records))
    }

    /// POD transaction records, oldest first.
    pub async fn transactions(&self) -> Result<Vec<Record>, LedgerError> {
        self.ledger
            .records_retrying(self.log(LogKind::PodTransactionsOf))
            .await
    }

    /// POD balance.
    pub async fn balance(&self) -> Result<i64, LedgerError> {
        Ok(reduce_balance(&self.transactions().await?))
    }

    /// Current integrity score, 0 for an account without one.
    pub async fn integrity(&self) -> Result<f64, LedgerError> {
        let records = self.ledger.records_or_empty(self.log(LogKind::IntegrityOf)).await?;
        Ok(records
            .last()
            .and_then(|r| r.payload.get("i"))
            .and_then(Value::as_f64)
            .unwrap_or(0.0))
    }

    /// Posts and promotions by this account, newest first.
    pub async fn post_index(&self) -> Result<IndexSet<Address>, LedgerError> {
        let mut records = self.ledger.records_or_empty(self.log(LogKind::PostsBy)).await?;
        records.reverse();
        Ok(reduce_reference_set(&records))
    }

    /// Accounts following this one.
    pub async fn followers(&self) -> Result<IndexSet<Address>, LedgerError> {
        let records = self
            .ledger
            .records_or_empty(self.log(LogKind::UsersFollowing))
            .await?;
        Ok(reduce_follow_set(&records))
    }

    /// Accounts this one follows.
    pub async fn following(&self) -> Result<IndexSet<Address>, LedgerError> {
        let records = self
            .ledger
            .records_or_empty(self.log(LogKind::UsersFollowedBy))
            .await?;
        Ok(reduce_follow_set(&records))
    }

    /// Whether this account follows `other`.
    pub async fn is_following(&self, other: &Address) -> Result<bool, LedgerError> {
        Ok(self.following().await?.contains(other))
    }

    /// Whether `other` follows this account.
    pub async fn is_followed_by(&self, other: &Address) -> Result<bool, LedgerError> {
        Ok(self.followers().await?.contains(other))
    }

    /// Media registered by this account.
    pub async fn media_index(&self) -> Result<IndexSet<Address>, LedgerError> {
        let records = self.ledger.records_or_empty(self.log(LogKind::MediaFrom)).await?;
        Ok(reduce_reference_set(&records))
    }

    /// Alerts addressed to this account, newest first.
    pub async fn alerts(&self) -> Result<Vec<Record>, LedgerError> {
        let mut records = self.ledger.records_or_empty(self.log(LogKind::AlertsTo)).await?;
        records.reverse();
        Ok(records)
    }

    /// Called with every new POD transaction.
    pub async fn on_transaction<F>(&self, callback: F) -> Result<SubscriptionHandle, LedgerError>
    where
        F: Fn(Record) + Send + Sync + 'static,
    {
        self.ledger
            .watch(self.log(LogKind::PodTransactionsOf), Arc::new(callback))
            .await
    }

    /// Called with the address of every new post or promotion.
    pub async fn on_post<F>(&self, callback: F) -> Result<SubscriptionHandle, LedgerError>
    where
        F: Fn(Address) + Send + Sync + 'static,
    {
        self.ledger
            .watch(self.log(LogKind::PostsBy), address_callback(callback))
            .await
    }

    /// Called with every account this one starts or stops following.
    pub async fn on_follow<F>(&self, callback: F) -> Result<SubscriptionHandle, LedgerError>
    where
        F: Fn(Address) + Send + Sync + 'static,
    {
        self.ledger
            .watch(self.log(LogKind::UsersFollowedBy), address_callback(callback))
            .await
    }

    /// Called with every account that starts or stops following this one.
    pub async fn on_followed<F>(&self, callback: F) -> Result<SubscriptionHandle, LedgerError>
    where
        F: Fn(Address) + Send + Sync + 'static,
    {
        self.ledger
            .watch(self.log(LogKind::UsersFollowing), address_callback(callback))
            .await
    }
}

/// Adapt an address callback to a record callback over `address` fields.
pub(crate) fn address_callback<F>(callback: F) -> RecordCallback
where
    F: Fn(Address) + Send + Sync + 'static,
{
    Arc::new(move |record: Record| {
        if let Some(address) = record.get_address("address") {
            callback(address);
        }
    })
}

/// A signed-in account: a [`User`] plus the identity to write as it.
#[derive(Clone)]
pub struct ActiveUser {
    user: User,
    identity: Identity,
    encrypted_key: EncryptedKey,
}

impl std::fmt::Debug for ActiveUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveUser")
            .field("address", &self.user.address)
            .finish_non_exhaustive()
    }
}

impl Deref for ActiveUser {
    type Target = User;

    fn deref(&self) -> &User {
        &self.user
    }
}

impl ActiveUser {
    pub(crate) fn new(ledger: Ledger, identity: Identity, encrypted_key: EncryptedKey) -> Self {
        Self {
            user: User::new(ledger, identity.address()),
            identity,
            encrypted_key,
        }
    }

    /// Read-only view of this account.
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Signing identity.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Address plus encrypted key, for clients to keep.
    pub fn credentials(&self) -> Credentials {
        Credentials {
            address: self.address(),
            encrypted_key: self.encrypted_key.clone(),
        }
    }

    async fn write(&self, targets: Vec<Address>, payload: Document) -> Result<(), LedgerError> {
        self.ledger()
            .writer()
            .write(&self.identity, &targets, &payload)
            .await
    }

    async fn write_batch(&self, batch: WriteBatch) -> Result<(), LedgerError> {
        self.ledger().writer().write_batch(&self.identity, batch).await
    }

    async fn require_balance(&self, required: i64) -> Result<(), LedgerError> {
        let balance = self.balance().await?;
        if required > balance {
            return Err(LedgerError::InsufficientBalance { balance, required });
        }
        Ok(())
    }

    /// Merge `fields` into the profile.
    pub async fn update_profile(&self, fields: Document) -> Result<(), LedgerError> {
        if fields.is_empty() {
            return Err(LedgerError::InvalidArgument("profile update is empty".into()));
        }
        debug!(address = %self.address(), fields = fields.len(), "Updating profile");
        let mut payload = document(json!({"record": "profile", "type": "update"}));
        payload.extend(fields);
        self.write(vec![self.address()], payload).await
    }

    /// Store media bytes and register them on the ledger.
    pub async fn register_media(&self, content: &[u8], ext: &str) -> Result<Address, LedgerError> {
        if content.is_empty() {
            return Err(LedgerError::InvalidArgument("media is empty".into()));
        }
        let address = media_address(content);
        debug!(owner = %self.address(), media = %address, "Registering media");

        self.ledger()
            .store()
            .put(
                &media_key(&address),
                document(json!({
                    "address": address.to_hex(),
                    "ext": ext,
                    "owner": self.address().to_hex(),
                    "data": hex::encode(content),
                })),
            )
            .await?;

        let record = document(json!({
            "record": "media",
            "type": "image",
            "address": address.to_hex(),
            "ext": ext,
            "owner": self.address().to_hex(),
        }));
        let batch = WriteBatch::new()
            .with(vec![address], record)
            .with(
                vec![self.log(LogKind::MediaFrom)],
                document(json!({"record": "media", "type": "index", "address": address.to_hex()})),
            );
        self.write_batch(batch).await?;
        Ok(address)
    }

    /// Create a topic owned by this account.
    pub async fn create_topic(
        &self,
        id: &str,
        name: &str,
        description: &str,
    ) -> Result<Document, LedgerError> {
        if id.trim().is_empty() {
            return Err(LedgerError::InvalidArgument("topic id must not be empty".into()));
        }
        let address = address_for(LogKind::TopicWithId, id);
        info!(id, %address, "Creating topic");
        let record = document(json!({
            "record": "topic",
            "type": "topic",
            "id": id,
            "name": name,
            "description": description,
            "owner": self.address().to_hex(),
            "address": address.to_hex(),
        }));
        self.write(vec![address], record.clone()).await?;
        Ok(record)
    }

    /// Credit `value` POD to this account out of thin air.
    pub async fn mint(&self, value: i64) -> Result<(), LedgerError> {
        if value < 0 {
            return Err(LedgerError::NegativeTransactionValue(value));
        }
        info!(address = %self.address(), value, "Minting POD");
        self.write(
            vec![self.log(LogKind::PodTransactionsOf)],
            document(json!({
                "record": "transaction",
                "type": "POD",
                "to": self.address().to_hex(),
                "value": value,
                "from": "mint",
            })),
        )
        .await
    }

    /// Send `value` POD to `to`. Returns the sender's record.
    pub async fn create_transaction(&self, to: Address, value: i64) -> Result<Document, LedgerError> {
        if value < 0 {
            return Err(LedgerError::NegativeTransactionValue(value));
        }
        self.require_balance(value).await?;
        debug!(from = %self.address(), %to, value, "Sending POD");

        let sender = document(json!({
            "record": "transaction",
            "type": "POD",
            "value": -value,
            "to": to.to_hex(),
        }));
        let receiver = document(json!({
            "record": "transaction",
            "type": "POD",
            "value": value,
            "from": self.address().to_hex(),
        }));
        let batch = WriteBatch::new()
            .with(vec![self.log(LogKind::PodTransactionsOf)], sender.clone())
            .with(vec![address_of(LogKind::PodTransactionsOf, &to)], receiver);
        self.write_batch(batch).await?;
        Ok(sender)
    }

    /// Publish a post, optionally as a reply to `parent`.
    ///
    /// The first chunk, the cost debit, the author index entry and the
    /// reply-log placeholder are written together; the remaining chunks and
    /// the parent's reply index follow concurrently.
    pub async fn create_post(
        &self,
        text: &str,
        mentions: &[Address],
        parent: Option<Address>,
    ) -> Result<Post, LedgerError> {
        if text.is_empty() {
            return Err(LedgerError::EmptyPostBody);
        }
        let parent_content = match parent {
            Some(parent) => {
                let content = match self.ledger().post(parent).content().await {
                    Ok(content) => content,
                    Err(e) if e.is_timeout() => return Err(LedgerError::UnknownParentPost(parent)),
                    Err(e) => return Err(e),
                };
                if content.author().is_none() {
                    return Err(LedgerError::UnknownParentPost(parent));
                }
                Some((parent, content))
            }
            None => None,
        };

        let cost = post_cost(text);
        self.require_balance(cost).await?;

        let address = new_post_address(text);
        let chunks = chunk_text(text, self.ledger().config().chunk_size);
        let entries = chunks.len();
        let (parent_hex, origin, depth) = match &parent_content {
            Some((parent, content)) => (
                Value::String(parent.to_hex()),
                content.origin().unwrap_or(*parent),
                content.depth() + 1,
            ),
            None => (Value::Null, address, 0),
        };
        info!(author = %self.address(), post = %address, entries, cost, "Creating post");

        let first = document(json!({
            "record": "post",
            "type": "post",
            "text": chunks[0],
            "cost": cost,
            "entry": 0,
            "entries": entries,
            "address": address.to_hex(),
            "author": self.address().to_hex(),
            "parent": parent_hex,
            "origin": origin.to_hex(),
            "depth": depth,
            "mentions": mentions.iter().map(Address::to_hex).collect::<Vec<_>>(),
        }));
        let index = document(json!({"record": "post", "type": "post", "address": address.to_hex()}));

        let main = WriteBatch::new()
            .with(
                vec![self.log(LogKind::PodTransactionsOf)],
                document(json!({
                    "record": "transaction",
                    "type": "POD",
                    "to": address.to_hex(),
                    "for": "post",
                    "value": -cost,
                })),
            )
            .with(vec![address], first)
            .with(vec![self.log(LogKind::PostsBy)], index.clone())
            .with(vec![address_of(LogKind::RepliesToPost, &address)], placeholder_payload());
        self.write_batch(main).await?;

        let mut rest = WriteBatch::new();
        for (entry, chunk) in chunks.iter().enumerate().skip(1) {
            rest.push(
                vec![address],
                document(json!({"record": "post", "type": "chunk", "entry": entry, "entries": entries, "text": chunk})),
            );
        }
        if let Some((parent, content)) = &parent_content {
            rest.push(vec![address_of(LogKind::RepliesToPost, parent)], index);
            if let Some(author) = content.author().filter(|a| *a != self.address()) {
                rest.push(
                    vec![address_of(LogKind::AlertsTo, &author)],
                    alert("reply", self.address(), Some(address)),
                );
            }
        }
        if !rest.is_empty() {
            self.write_batch(rest).await?;
        }

        Ok(self.ledger().post(address))
    }

    /// Promote `post` on this account's feed.
    pub async fn promote_post(&self, post: Address) -> Result<(), LedgerError> {
        self.require_balance(PROMOTION_COST).await?;
        debug!(by = %self.address(), %post, "Promoting post");
        let batch = WriteBatch::new()
            .with(
                vec![self.log(LogKind::PostsBy)],
                document(json!({"record": "post", "type": "promotion", "address": post.to_hex()})),
            )
            .with(
                vec![address_of(LogKind::PromotionsOfPost, &post)],
                document(json!({
                    "record": "post",
                    "type": "promotion",
                    "address": post.to_hex(),
                    "by": self.address().to_hex(),
                })),
            )
            .with(
                vec![self.log(LogKind::PodTransactionsOf)],
                document(json!({
                    "record": "transaction",
                    "type": "POD",
                    "to": post.to_hex(),
                    "for": "promotion",
                    "value": -PROMOTION_COST,
                })),
            );
        self.write_batch(batch).await
    }

    /// Report `post` with a free-text reason.
    pub async fn report_post(&self, post: Address, reason: &str) -> Result<(), LedgerError> {
        debug!(by = %self.address(), %post, "Reporting post");
        self.write(
            vec![address_of(LogKind::ReportsOfPost, &post)],
            document(json!({
                "record": "report",
                "type": "post",
                "address": post.to_hex(),
                "by": self.address().to_hex(),
                "reason": reason,
            })),
        )
        .await
    }

    /// Follow `target`. A no-op when already following.
    pub async fn follow(&self, target: Address) -> Result<(), LedgerError> {
        if target == self.address() {
            return Err(LedgerError::InvalidArgument("cannot follow yourself".into()));
        }
        if self.is_following(&target).await? {
            debug!(user = %self.address(), %target, "Already following");
            return Ok(());
        }
        let mut batch = self.follow_batch(target, true);
        batch.push(
            vec![address_of(LogKind::AlertsTo, &target)],
            alert("follow", self.address(), None),
        );
        self.write_batch(batch).await
    }

    /// Stop following `target`. A no-op when not following.
    pub async fn unfollow(&self, target: Address) -> Result<(), LedgerError> {
        if !self.is_following(&target).await? {
            debug!(user = %self.address(), %target, "Not following");
            return Ok(());
        }
        self.write_batch(self.follow_batch(target, false)).await
    }

    fn follow_batch(&self, target: Address, status: bool) -> WriteBatch {
        WriteBatch::new()
            .with(
                vec![address_of(LogKind::UsersFollowing, &target)],
                document(json!({
                    "record": "follower",
                    "type": "index",
                    "address": self.address().to_hex(),
                    "status": status,
                })),
            )
            .with(
                vec![self.log(LogKind::UsersFollowedBy)],
                document(json!({
                    "record": "following",
                    "type": "index",
                    "address": target.to_hex(),
                    "status": status,
                })),
            )
    }
}

fn alert(kind: &str, from: Address, about: Option<Address>) -> Document {
    document(json!({
        "record": "alert",
        "type": kind,
        "from": from.to_hex(),
        "about": about.map(|a| a.to_hex()),
    }))
}
