//! # Value Objects
//!
//! Addresses, documents and records as they cross the ledger boundary.

use super::errors::LedgerError;
use podium_crypto::PublicKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Flat key/value document carried by every record.
pub type Document = serde_json::Map<String, Value>;

/// Payload key marking a placeholder record.
pub const PLACEHOLDER_KEY: &str = "placeholder";

/// Log address: the 32-byte public key of the log's key pair.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 32]);

impl Address {
    /// Wrap raw public key bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Address owned by a public key.
    pub fn from_public_key(key: &PublicKey) -> Self {
        Self(*key.as_bytes())
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex form, as written into record payloads.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", &self.to_hex()[..12])
    }
}

impl FromStr for Address {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim())
            .map_err(|_| LedgerError::InvalidArgument(format!("address `{s}` is not hex")))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| LedgerError::InvalidArgument(format!("address `{s}` is not 32 bytes")))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A record as delivered by the ledger: encoded payload plus ledger timestamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawRecord {
    /// Serialized document.
    pub payload: Vec<u8>,
    /// Ledger-assigned creation time (ms).
    pub created_at: u64,
}

/// A decoded, immutable log entry.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    /// Payload document.
    pub payload: Document,
    /// Ledger-assigned creation time (ms).
    pub created_at: u64,
    /// Local observation time (ms).
    pub received_at: u64,
}

impl Record {
    /// Decode a raw ledger record, stamping the local receive time.
    pub fn decode(raw: &RawRecord) -> Result<Self, LedgerError> {
        let payload: Document = serde_json::from_slice(&raw.payload)?;
        Ok(Self {
            payload,
            created_at: raw.created_at,
            received_at: now_millis(),
        })
    }

    /// Build a record directly (tests and adapters).
    pub fn new(payload: Document, created_at: u64) -> Self {
        Self {
            payload,
            created_at,
            received_at: created_at,
        }
    }

    /// "Log exists but has no content yet" marker.
    pub fn is_placeholder(&self) -> bool {
        self.get_bool(PLACEHOLDER_KEY).unwrap_or(false)
    }

    /// String field.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    /// Integer field.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.payload.get(key).and_then(Value::as_i64)
    }

    /// Boolean field.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.payload.get(key).and_then(Value::as_bool)
    }

    /// Address field (hex string).
    pub fn get_address(&self, key: &str) -> Option<Address> {
        self.get_str(key).and_then(|s| s.parse().ok())
    }

    /// Payload plus `created`/`received` metadata, for RPC results.
    pub fn to_document(&self) -> Document {
        let mut doc = self.payload.clone();
        doc.insert("created".into(), Value::from(self.created_at));
        doc.insert("received".into(), Value::from(self.received_at));
        doc
    }
}

/// Payload of a placeholder record.
pub fn placeholder_payload() -> Document {
    let mut doc = Document::new();
    doc.insert(PLACEHOLDER_KEY.into(), Value::Bool(true));
    doc
}

/// Encode a document into ledger payload bytes.
pub fn encode_payload(payload: &Document) -> Result<Vec<u8>, LedgerError> {
    Ok(serde_json::to_vec(payload)?)
}

/// Wall clock in milliseconds since the epoch.
pub fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}

/// Build a `Document` from a `json!` object literal.
///
/// Non-object values yield an empty document.
pub fn document(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_address_hex_roundtrip() {
        let addr = Address::from_bytes([0xAB; 32]);
        let parsed: Address = addr.to_hex().parse().unwrap();
        assert_eq!(parsed, addr);
        assert_eq!(addr.to_string().len(), 64);
    }

    #[test]
    fn test_address_rejects_short_hex() {
        assert!(matches!(
            "abcd".parse::<Address>(),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!("not hex".parse::<Address>().is_err());
    }

    #[test]
    fn test_address_serde_as_string() {
        let addr = Address::from_bytes([3; 32]);
        let value = serde_json::to_value(addr).unwrap();
        assert_eq!(value, Value::String(addr.to_hex()));
        let back: Address = serde_json::from_value(value).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_record_decode_and_placeholder() {
        let raw = RawRecord {
            payload: encode_payload(&placeholder_payload()).unwrap(),
            created_at: 42,
        };
        let record = Record::decode(&raw).unwrap();
        assert!(record.is_placeholder());
        assert_eq!(record.created_at, 42);

        let plain = Record::new(document(json!({"name": "A"})), 1);
        assert!(!plain.is_placeholder());
        assert_eq!(plain.get_str("name"), Some("A"));
    }

    #[test]
    fn test_record_decode_rejects_garbage() {
        let raw = RawRecord {
            payload: b"not json".to_vec(),
            created_at: 0,
        };
        assert!(matches!(Record::decode(&raw), Err(LedgerError::Codec(_))));
    }

    #[test]
    fn test_to_document_adds_metadata() {
        let record = Record::new(document(json!({"bio": "hi"})), 7);
        let doc = record.to_document();
        assert_eq!(doc["created"], json!(7));
        assert_eq!(doc["bio"], json!("hi"));
    }
}
