//! # Log Addressing
//!
//! Maps semantic keys to log addresses. A seed `"<namespace>-<key>"` is
//! hashed into an Ed25519 secret and the public half becomes the address.
//! Keys are lowercased first, so `Alice` and `alice` share one log.
//!
//! Profile logs are the exception: a user's profile lives at their own
//! account address and needs no derivation.

use crate::domain::Address;
use podium_crypto::{content_digest, passphrase_digest, KeyPair};

/// Every kind of derived log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LogKind {
    /// Which address owns a username.
    OwnershipOfId,
    /// Encrypted key pair for a (username, passphrase).
    Keystore,
    /// Integrity score changes of a user.
    IntegrityOf,
    /// POD token transactions of a user.
    PodTransactionsOf,
    /// AUD token transactions of a user.
    AudTransactionsOf,
    /// Topic definition by id.
    TopicWithId,
    /// Index of posts about a topic.
    PostsAboutTopic,
    /// Index of posts (and promotions) by a user.
    PostsBy,
    /// Body of a freshly created post.
    NewPost,
    /// Index of replies to a post.
    RepliesToPost,
    /// Index of promotions of a post.
    PromotionsOfPost,
    /// Index of reports against a post.
    ReportsOfPost,
    /// Media registration by content.
    Media,
    /// Index of media uploaded by a user.
    MediaFrom,
    /// Users following a user (their followers).
    UsersFollowing,
    /// Users a user follows.
    UsersFollowedBy,
    /// Alerts addressed to a user.
    AlertsTo,
}

impl LogKind {
    /// Seed namespace.
    pub const fn namespace(self) -> &'static str {
        match self {
            Self::OwnershipOfId => "podium-ownership-of-id",
            Self::Keystore => "podium-keystore-for",
            Self::IntegrityOf => "podium-integrity-score-of",
            Self::PodTransactionsOf => "podium-token-transactions-of",
            Self::AudTransactionsOf => "audium-token-transactions-of",
            Self::TopicWithId => "podium-topic-with-id",
            Self::PostsAboutTopic => "podium-posts-about-topic",
            Self::PostsBy => "podium-posts-by-user",
            Self::NewPost => "podium-post-with-content",
            Self::RepliesToPost => "podium-replies-to-post",
            Self::PromotionsOfPost => "podium-promotions-of-post",
            Self::ReportsOfPost => "podium-reports-of-post",
            Self::Media => "podium-media",
            Self::MediaFrom => "podium-media-uploaded-by",
            Self::UsersFollowing => "podium-user-followers",
            Self::UsersFollowedBy => "podium-user-following",
            Self::AlertsTo => "podium-user-alerts",
        }
    }
}

/// Seed string for a (kind, key) pair.
pub fn seed_for(kind: LogKind, key: &str) -> String {
    format!("{}-{}", kind.namespace(), key.to_lowercase())
}

/// Deterministic address of the `kind` log for `key`.
pub fn address_for(kind: LogKind, key: &str) -> Address {
    let keypair = KeyPair::derive(&seed_for(kind, key));
    Address::from_public_key(&keypair.public_key())
}

/// Deterministic address of the `kind` log belonging to another log/account.
pub fn address_of(kind: LogKind, owner: &Address) -> Address {
    address_for(kind, &owner.to_hex())
}

/// Keystore log for a username and passphrase.
///
/// Only a digest of the passphrase enters the seed, which keeps the
/// passphrase case-sensitive despite key lowercasing.
pub fn keystore_address(id: &str, passphrase: &str) -> Address {
    address_for(
        LogKind::Keystore,
        &format!("{}-{}", id, passphrase_digest(passphrase)),
    )
}

/// Address of a media object, derived from its bytes.
pub fn media_address(content: &[u8]) -> Address {
    address_for(LogKind::Media, &content_digest(content))
}

/// Address for a new post.
///
/// Mixes a random 128-bit nonce into the seed, so two identical posts get
/// distinct logs and no shared post counter is needed.
pub fn new_post_address(content: &str) -> Address {
    let nonce: u128 = rand::random();
    address_for(
        LogKind::NewPost,
        &format!("{}-{:032x}", content_digest(content.as_bytes()), nonce),
    )
}
