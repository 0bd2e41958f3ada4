//! # Podium Crypto
//!
//! Cryptographic building blocks for ledger identities and log addresses.
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | SHA-256, BLAKE3 | Seed hashing, passphrase key derivation |
//! | `keys` | Ed25519 | Identities, deterministic log addresses |
//! | `keystore` | XChaCha20-Poly1305 | Passphrase-encrypted identity keys |
//!
//! A log address is the public key of a key pair. Deterministic logs hash a
//! seed string into the secret half, so anyone can recompute the address
//! from the seed without ever holding a network connection.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod keys;
pub mod keystore;

// Re-exports
pub use errors::CryptoError;
pub use hashing::{content_digest, derive_passphrase_key, passphrase_digest, seed_hash};
pub use keys::{KeyPair, PublicKey, Signature};
pub use keystore::{decrypt_key, encrypt_key, EncryptedKey};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
