//! The identity capability the session controller depends on.
//!
//! Session code only ever sees this trait, so tests and alternative
//! backends can swap the primitives without touching protocol logic.

use crate::{error::CryptoError, keys::KeyPair, sealed};

pub trait IdentityProvider: Send + Sync {
    /// Generate a fresh long-term keypair.
    fn generate_keypair(&self) -> Result<KeyPair, CryptoError>;

    /// Encrypt `plaintext` so only the holder of `recipient_public_key` can read it.
    fn encrypt(&self, plaintext: &str, recipient_public_key: &str) -> Result<String, CryptoError>;

    /// Decrypt a payload addressed to the owner of `own_private_key`.
    fn decrypt(&self, ciphertext: &str, own_private_key: &str) -> Result<String, CryptoError>;
}

/// X25519 + XChaCha20-Poly1305 sealed boxes (see [`crate::sealed`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct SealedBoxProvider;

impl IdentityProvider for SealedBoxProvider {
    fn generate_keypair(&self) -> Result<KeyPair, CryptoError> {
        Ok(KeyPair::generate())
    }

    fn encrypt(&self, plaintext: &str, recipient_public_key: &str) -> Result<String, CryptoError> {
        sealed::encrypt_message(plaintext, recipient_public_key)
    }

    fn decrypt(&self, ciphertext: &str, own_private_key: &str) -> Result<String, CryptoError> {
        sealed::decrypt_message(ciphertext, own_private_key)
    }
}
