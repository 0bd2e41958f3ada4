//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed (wrong passphrase or tampered blob)
    #[error("Decryption failed")]
    DecryptionFailed,

    /// Invalid public key bytes
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Secret key material had the wrong shape
    #[error("Invalid secret key length: expected 32, got {0}")]
    InvalidSecretKey(usize),

    /// Signature did not verify
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// A hex field in an encrypted blob could not be decoded
    #[error("Malformed encrypted key field `{field}`")]
    MalformedBlob {
        /// Name of the offending field
        field: &'static str,
    },
}
