//! # Seed & Passphrase Hashing
//!
//! SHA-256 turns address seeds into secret key material; BLAKE3's key
//! derivation mode turns passphrases into keystore encryption keys.

use sha2::{Digest, Sha256};

/// Context string for passphrase key derivation.
const KEYSTORE_CONTEXT: &str = "podium-ledger 2024 keystore encryption";

/// Hash an address seed into 32 bytes of secret key material.
pub fn seed_hash(seed: &str) -> [u8; 32] {
    Sha256::digest(seed.as_bytes()).into()
}

/// Lowercase hex SHA-256 digest of a passphrase.
///
/// Used where a passphrase must contribute to an address seed without the
/// seed itself revealing it.
pub fn passphrase_digest(passphrase: &str) -> String {
    hex::encode(Sha256::digest(passphrase.as_bytes()))
}

/// Lowercase hex SHA-256 digest of arbitrary content (media bodies).
pub fn content_digest(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Derive a 256-bit encryption key from a passphrase and salt.
pub fn derive_passphrase_key(passphrase: &str, salt: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(KEYSTORE_CONTEXT);
    hasher.update(salt);
    hasher.update(passphrase.as_bytes());
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_hash_deterministic() {
        assert_eq!(seed_hash("podium-user-followers-x"), seed_hash("podium-user-followers-x"));
        assert_ne!(seed_hash("a"), seed_hash("b"));
    }

    #[test]
    fn test_passphrase_digest_is_lowercase_hex() {
        let digest = passphrase_digest("Correct Horse");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, digest.to_lowercase());
        assert_ne!(digest, passphrase_digest("correct horse"));
    }

    #[test]
    fn test_content_digest_matches_passphrase_digest_for_text() {
        assert_eq!(content_digest(b"abc"), passphrase_digest("abc"));
    }

    #[test]
    fn test_salt_changes_key() {
        let k1 = derive_passphrase_key("pw", b"salt-one");
        let k2 = derive_passphrase_key("pw", b"salt-two");
        assert_ne!(k1, k2);
        assert_eq!(k1, derive_passphrase_key("pw", b"salt-one"));
    }
}
