//! # RPC Dispatcher
//!
//! Resolves a method name, enforces its access requirement, unpacks the
//! JSON arguments and calls into the domain layer. Methods flagged
//! retryable are re-run on `HistoryTimeout` up to [`RETRY_BUDGET`] times.

use super::error::ErrorDocument;
use super::methods::{get_method_info, Method};
use super::session::Session;
use crate::algorithms::{address_of, LogKind};
use crate::application::Ledger;
use crate::domain::{Address, Document, LedgerError, Record};
use indexmap::IndexSet;
use podium_crypto::EncryptedKey;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Extra attempts for retryable methods.
pub const RETRY_BUDGET: u32 = 3;

/// Feed channel capacity.
const FEED_CAPACITY: usize = 256;

/// A new post or promotion by a watched author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEvent {
    /// Author being watched.
    pub author: Address,
    /// The post.
    pub post: Address,
}

/// Dispatches named methods against one ledger.
#[derive(Clone)]
pub struct RpcDispatcher {
    ledger: Ledger,
    feed: broadcast::Sender<FeedEvent>,
}

impl RpcDispatcher {
    /// Dispatcher over `ledger`.
    pub fn new(ledger: Ledger) -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self { ledger, feed }
    }

    /// Underlying ledger.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Feed events for every watched author. Sessions filter by
    /// [`Session::feed`].
    pub fn feed_events(&self) -> broadcast::Receiver<FeedEvent> {
        self.feed.subscribe()
    }

    /// Run `method` with `args` for `session`.
    pub async fn dispatch(
        &self,
        method: &str,
        args: Value,
        session: &mut Session,
    ) -> Result<Value, ErrorDocument> {
        let info = get_method_info(method)
            .ok_or_else(|| LedgerError::UnknownMethod(method.to_string()))?;
        if info.requires_auth && !session.is_signed_in() {
            return Err(LedgerError::Unauthenticated.into());
        }
        debug!(session = %session.id(), method, "Dispatching");

        let mut attempts = 0;
        loop {
            match self.invoke(info.method, &args, session).await {
                Err(e) if e.is_timeout() && info.retryable && attempts < RETRY_BUDGET => {
                    attempts += 1;
                    warn!(method, attempts, budget = RETRY_BUDGET, "Timed out, retrying");
                }
                Err(e) => {
                    info!(session = %session.id(), method, code = e.code(), error = %e, "Method failed");
                    return Err(e.into());
                }
                Ok(value) => return Ok(value),
            }
        }
    }

    async fn invoke(&self, method: Method, args: &Value, session: &mut Session) -> Result<Value, LedgerError> {
        let ledger = &self.ledger;
        match method {
            Method::CheckUser => {
                let address = ledger.is_user(arg_str(args, "target")?).await?;
                Ok(json!({"address": address}))
            }
            Method::Search => {
                let results = ledger.search_users(arg_str(args, "target")?).await?;
                Ok(json!({"results": results}))
            }
            Method::CreateUser => {
                let user = ledger
                    .create_user(arg_str(args, "identity")?, arg_str(args, "passphrase")?)
                    .await?;
                Ok(serde_json::to_value(user.credentials())?)
            }
            Method::KeyIn => {
                let encrypted: EncryptedKey = serde_json::from_value(arg(args, "keyPair")?.clone())
                    .map_err(|e| LedgerError::InvalidArgument(format!("keyPair: {e}")))?;
                let user = ledger.key_in(encrypted, arg_str(args, "passphrase")?)?;
                let credentials = user.credentials();
                session.sign_in(user);
                Ok(serde_json::to_value(credentials)?)
            }
            Method::SignIn => {
                let user = ledger
                    .sign_in(arg_str(args, "identity")?, arg_str(args, "passphrase")?)
                    .await?;
                let credentials = user.credentials();
                session.sign_in(user);
                Ok(serde_json::to_value(credentials)?)
            }
            Method::SignOut => {
                self.close_feed(session);
                Ok(Value::Bool(session.sign_out()))
            }
            Method::LoadProfile => {
                let profile = ledger.user(arg_address(args, "address")?).profile().await?;
                Ok(json!({"profile": profile}))
            }
            Method::UpdateProfile => {
                let mut fields = arg_object(args)?;
                if let Some(picture) = fields.remove("picture") {
                    let data = picture
                        .as_str()
                        .and_then(|s| hex::decode(s).ok())
                        .ok_or_else(|| LedgerError::InvalidArgument("picture must be hex".into()))?;
                    let ext = fields
                        .remove("pictureExtn")
                        .and_then(|v| v.as_str().map(str::to_string))
                        .unwrap_or_else(|| "png".to_string());
                    let media = session.require_user()?.register_media(&data, &ext).await?;
                    fields.insert("picture".into(), Value::String(media.to_hex()));
                }
                session.require_user()?.update_profile(fields).await?;
                Ok(Value::Bool(true))
            }
            Method::RegisterMedia => {
                let data = hex::decode(arg_str(args, "data")?)
                    .map_err(|e| LedgerError::InvalidArgument(format!("data: {e}")))?;
                let media = session
                    .require_user()?
                    .register_media(&data, arg_str(args, "ext")?)
                    .await?;
                Ok(json!({"address": media}))
            }
            Method::Follow => {
                session.require_user()?.follow(arg_address(args, "address")?).await?;
                Ok(Value::Bool(true))
            }
            Method::Unfollow => {
                session.require_user()?.unfollow(arg_address(args, "address")?).await?;
                Ok(Value::Bool(true))
            }
            Method::IndexFollowers => {
                let index = ledger.user(arg_address(args, "address")?).followers().await?;
                Ok(addresses(&index))
            }
            Method::IndexFollowing => {
                let index = ledger.user(arg_address(args, "address")?).following().await?;
                Ok(addresses(&index))
            }
            Method::OpenFeed => self.open_feed(session).await,
            Method::CloseFeed => Ok(json!({"closed": self.close_feed(session)})),
            Method::CreatePost => {
                let mentions = match args.get("mentions") {
                    Some(Value::Array(items)) => items
                        .iter()
                        .map(|v| parse_address(v, "mentions"))
                        .collect::<Result<Vec<_>, _>>()?,
                    _ => Vec::new(),
                };
                let parent = match args.get("parent") {
                    None | Some(Value::Null) => None,
                    Some(v) => Some(parse_address(v, "parent")?),
                };
                let post = session
                    .require_user()?
                    .create_post(arg_str(args, "text")?, &mentions, parent)
                    .await?;
                Ok(json!({"address": post.address()}))
            }
            Method::IndexPosts => {
                let index = ledger.user(arg_address(args, "address")?).post_index().await?;
                Ok(addresses(&index))
            }
            Method::LoadPost => {
                let content = ledger.post(arg_address(args, "address")?).content().await?;
                Ok(json!({"content": content.to_document()}))
            }
            Method::IndexReplies => {
                let index = ledger.post(arg_address(args, "address")?).reply_index().await?;
                Ok(addresses(&index))
            }
            Method::PromotePost => {
                session.require_user()?.promote_post(arg_address(args, "address")?).await?;
                Ok(Value::Bool(true))
            }
            Method::CreateReport => {
                let reason = args.get("reason").and_then(Value::as_str).unwrap_or_default();
                session
                    .require_user()?
                    .report_post(arg_address(args, "address")?, reason)
                    .await?;
                Ok(Value::Bool(true))
            }
            Method::IndexReports => {
                let index = ledger.post(arg_address(args, "address")?).report_index().await?;
                Ok(addresses(&index))
            }
            Method::CreateTopic => {
                let description = args.get("description").and_then(Value::as_str).unwrap_or_default();
                let topic = session
                    .require_user()?
                    .create_topic(arg_str(args, "id")?, arg_str(args, "name")?, description)
                    .await?;
                Ok(Value::Object(topic))
            }
            Method::LoadTopic => {
                let topic = ledger.topic(arg_str(args, "id")?).await?;
                Ok(json!({"topic": topic}))
            }
            Method::LoadIntegrity => {
                let integrity = ledger.user(arg_address(args, "address")?).integrity().await?;
                Ok(json!({"integrity": integrity}))
            }
            Method::LoadBalance => {
                let balance = ledger.user(arg_address(args, "address")?).balance().await?;
                Ok(json!({"balance": balance}))
            }
            Method::IndexTransactions => {
                let records = ledger.user(arg_address(args, "address")?).transactions().await?;
                Ok(documents(&records))
            }
            Method::CreateTransaction => {
                let value = args
                    .get("value")
                    .and_then(Value::as_i64)
                    .ok_or_else(|| LedgerError::InvalidArgument("value must be an integer".into()))?;
                let record = session
                    .require_user()?
                    .create_transaction(arg_address(args, "to")?, value)
                    .await?;
                Ok(Value::Object(record))
            }
            Method::IndexNotifications => {
                let alerts = session.require_user()?.alerts().await?;
                Ok(documents(&alerts))
            }
        }
    }

    /// Stream posts by the session's account and everyone it follows.
    async fn open_feed(&self, session: &mut Session) -> Result<Value, LedgerError> {
        let user = session.require_user()?.clone();
        let mut authors = vec![user.address()];
        authors.extend(user.following().await?);

        for author in authors {
            // Watched authors whose subscription idled out are subscribed again.
            let posts = address_of(LogKind::PostsBy, &author);
            if session.feed().contains(&author) && self.ledger.subscriptions().is_open(&posts) {
                continue;
            }
            let feed = self.feed.clone();
            self.ledger
                .user(author)
                .on_post(move |post| {
                    let _ = feed.send(FeedEvent { author, post });
                })
                .await?;
            session.feed_mut().insert(author);
        }
        debug!(session = %session.id(), authors = session.feed().len(), "Feed open");
        Ok(addresses(session.feed()))
    }

    fn close_feed(&self, session: &mut Session) -> usize {
        let authors: Vec<Address> = session.feed_mut().drain(..).collect();
        for author in &authors {
            self.ledger
                .subscriptions()
                .release_subscription(&address_of(LogKind::PostsBy, author));
        }
        authors.len()
    }
}

fn arg<'a>(args: &'a Value, key: &str) -> Result<&'a Value, LedgerError> {
    args.get(key)
        .ok_or_else(|| LedgerError::InvalidArgument(format!("missing `{key}`")))
}

fn arg_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, LedgerError> {
    arg(args, key)?
        .as_str()
        .ok_or_else(|| LedgerError::InvalidArgument(format!("`{key}` must be a string")))
}

fn arg_address(args: &Value, key: &str) -> Result<Address, LedgerError> {
    parse_address(arg(args, key)?, key)
}

fn arg_object(args: &Value) -> Result<Document, LedgerError> {
    args.as_object()
        .cloned()
        .ok_or_else(|| LedgerError::InvalidArgument("arguments must be an object".into()))
}

fn parse_address(value: &Value, key: &str) -> Result<Address, LedgerError> {
    value
        .as_str()
        .ok_or_else(|| LedgerError::InvalidArgument(format!("`{key}` must be an address")))?
        .parse()
}

fn addresses(index: &IndexSet<Address>) -> Value {
    Value::Array(index.iter().map(|a| Value::String(a.to_hex())).collect())
}

fn documents(records: &[Record]) -> Value {
    Value::Array(records.iter().map(|r| Value::Object(r.to_document())).collect())
}
