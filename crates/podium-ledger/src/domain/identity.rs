//! # Identity
//!
//! A signing key pair. Its public key is the address of the owner's
//! profile log, so the account address and the log address coincide.

use super::value_objects::Address;
use podium_crypto::{KeyPair, PublicKey, Signature};

/// Key pair authorising appends, plus its cached account address.
#[derive(Clone, Debug)]
pub struct Identity {
    keypair: KeyPair,
    address: Address,
}

impl Identity {
    /// Fresh random identity.
    pub fn generate() -> Self {
        Self::from_keypair(KeyPair::generate())
    }

    /// Wrap an existing key pair (e.g. one decrypted from a keystore).
    pub fn from_keypair(keypair: KeyPair) -> Self {
        let address = Address::from_public_key(&keypair.public_key());
        Self { keypair, address }
    }

    /// Account address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Public key.
    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    /// Underlying key pair.
    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    /// Sign submission bytes.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.keypair.sign(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_matches_public_key() {
        let identity = Identity::generate();
        assert_eq!(
            identity.address(),
            Address::from_public_key(&identity.public_key())
        );
    }

    #[test]
    fn test_signature_verifies_against_address_key() {
        let identity = Identity::generate();
        let sig = identity.sign(b"record");
        assert!(identity.public_key().verify(b"record", &sig).is_ok());
    }
}
