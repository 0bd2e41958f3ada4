//! # Derived Views
//!
//! Views reconstructed from log replays. None of these are ever written
//! back; each fetch rebuilds them from the records.

use super::value_objects::{Address, Document};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A reassembled post.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PostContent {
    /// Full body, present only once every chunk has arrived.
    pub text: Option<String>,
    /// True while the network is still missing chunks.
    pub incomplete: bool,
    /// Expected chunk count.
    pub entries: usize,
    /// Earliest ledger timestamp across the post's records.
    pub created: Option<u64>,
    /// Latest ledger timestamp across the post's records.
    pub latest: Option<u64>,
    /// Every other field, deep-merged across records.
    pub fields: Document,
}

impl PostContent {
    /// Post's own address, as recorded in its first chunk.
    pub fn address(&self) -> Option<Address> {
        self.address_field("address")
    }

    /// Author address.
    pub fn author(&self) -> Option<Address> {
        self.address_field("author")
    }

    /// Root of the reply thread (the post itself for top-level posts).
    pub fn origin(&self) -> Option<Address> {
        self.address_field("origin")
    }

    /// Reply depth (0 for top-level posts).
    pub fn depth(&self) -> u64 {
        self.fields.get("depth").and_then(Value::as_u64).unwrap_or(0)
    }

    fn address_field(&self, key: &str) -> Option<Address> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }

    /// Flatten into a plain document for RPC results.
    pub fn to_document(&self) -> Document {
        let mut doc = self.fields.clone();
        if let Some(text) = &self.text {
            doc.insert("text".into(), Value::String(text.clone()));
        }
        doc.insert("incomplete".into(), Value::Bool(self.incomplete));
        doc.insert("entries".into(), Value::from(self.entries));
        if let Some(created) = self.created {
            doc.insert("created".into(), Value::from(created));
        }
        if let Some(latest) = self.latest {
            doc.insert("latest".into(), Value::from(latest));
        }
        doc
    }
}

/// Search cache row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    /// Account address.
    pub address: Address,
    /// Username.
    pub id: String,
}

/// What a client keeps after creating or signing in to an account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account address (also the profile log address).
    pub address: Address,
    /// Encrypted key, as written to the keystore log.
    pub encrypted_key: podium_crypto::EncryptedKey,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document;
    use serde_json::json;

    #[test]
    fn test_post_accessors() {
        let author = Address::from_bytes([9; 32]);
        let post = PostContent {
            text: Some("hello".into()),
            entries: 1,
            fields: document(json!({"author": author.to_hex(), "depth": 2})),
            ..Default::default()
        };
        assert_eq!(post.author(), Some(author));
        assert_eq!(post.depth(), 2);
        assert_eq!(post.origin(), None);
    }

    #[test]
    fn test_incomplete_post_document_has_no_text() {
        let post = PostContent {
            incomplete: true,
            entries: 2,
            ..Default::default()
        };
        let doc = post.to_document();
        assert!(!doc.contains_key("text"));
        assert_eq!(doc["incomplete"], json!(true));
    }
}
