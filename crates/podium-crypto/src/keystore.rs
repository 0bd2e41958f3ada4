//! # Keystore Encryption
//!
//! Identities are only ever written to the ledger in encrypted form:
//! XChaCha20-Poly1305 under a key derived from the owner's passphrase.

use crate::hashing::derive_passphrase_key;
use crate::keys::KeyPair;
use crate::CryptoError;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Salt length for passphrase key derivation.
const SALT_LEN: usize = 16;

/// XChaCha20 nonce length.
const NONCE_LEN: usize = 24;

/// Passphrase-encrypted key pair, as stored in a keystore log record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedKey {
    /// Hex ciphertext of the 32-byte secret seed (plus AEAD tag).
    pub ciphertext: String,
    /// Hex 24-byte nonce.
    pub nonce: String,
    /// Hex salt mixed into the passphrase key.
    pub salt: String,
}

/// Encrypt a key pair under `passphrase`.
pub fn encrypt_key(keypair: &KeyPair, passphrase: &str) -> Result<EncryptedKey, CryptoError> {
    let mut rng = rand::thread_rng();
    let mut salt = [0u8; SALT_LEN];
    rng.fill_bytes(&mut salt);
    let mut nonce = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce);

    let mut key = derive_passphrase_key(passphrase, &salt);
    let cipher = XChaCha20Poly1305::new((&key).into());
    key.zeroize();

    let mut seed = keypair.to_seed();
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), seed.as_slice())
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()));
    seed.zeroize();

    Ok(EncryptedKey {
        ciphertext: hex::encode(ciphertext?),
        nonce: hex::encode(nonce),
        salt: hex::encode(salt),
    })
}

/// Decrypt a key pair with `passphrase`.
///
/// # Errors
///
/// `DecryptionFailed` for a wrong passphrase or tampered blob,
/// `MalformedBlob` when a field is not valid hex of the right length.
pub fn decrypt_key(encrypted: &EncryptedKey, passphrase: &str) -> Result<KeyPair, CryptoError> {
    let salt = decode_field(&encrypted.salt, "salt")?;
    let nonce = decode_field(&encrypted.nonce, "nonce")?;
    if nonce.len() != NONCE_LEN {
        return Err(CryptoError::MalformedBlob { field: "nonce" });
    }
    let ciphertext = decode_field(&encrypted.ciphertext, "ciphertext")?;

    let mut key = derive_passphrase_key(passphrase, &salt);
    let cipher = XChaCha20Poly1305::new((&key).into());
    key.zeroize();

    let mut seed = cipher
        .decrypt(XNonce::from_slice(&nonce), ciphertext.as_slice())
        .map_err(|_| CryptoError::DecryptionFailed)?;
    let keypair = KeyPair::from_seed_slice(&seed);
    seed.zeroize();
    keypair
}

fn decode_field(value: &str, field: &'static str) -> Result<Vec<u8>, CryptoError> {
    hex::decode(value).map_err(|_| CryptoError::MalformedBlob { field })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let keypair = KeyPair::generate();
        let blob = encrypt_key(&keypair, "hunter2").unwrap();
        let restored = decrypt_key(&blob, "hunter2").unwrap();
        assert_eq!(keypair.public_key(), restored.public_key());
    }

    #[test]
    fn test_wrong_passphrase_fails() {
        let blob = encrypt_key(&KeyPair::generate(), "hunter2").unwrap();
        assert_eq!(
            decrypt_key(&blob, "hunter3").unwrap_err(),
            CryptoError::DecryptionFailed
        );
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let mut blob = encrypt_key(&KeyPair::generate(), "pw").unwrap();
        let mut bytes = hex::decode(&blob.ciphertext).unwrap();
        bytes[0] ^= 0xFF;
        blob.ciphertext = hex::encode(bytes);
        assert!(decrypt_key(&blob, "pw").is_err());
    }

    #[test]
    fn test_malformed_nonce_rejected() {
        let mut blob = encrypt_key(&KeyPair::generate(), "pw").unwrap();
        blob.nonce = "zz".to_string();
        assert_eq!(
            decrypt_key(&blob, "pw").unwrap_err(),
            CryptoError::MalformedBlob { field: "nonce" }
        );
    }

    #[test]
    fn test_blob_serializes_as_flat_document() {
        let blob = encrypt_key(&KeyPair::generate(), "pw").unwrap();
        let value = serde_json::to_value(&blob).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 3);
        assert!(object.contains_key("ciphertext"));
    }
}
