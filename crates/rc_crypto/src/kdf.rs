//! Key derivation functions
//!
//! `hkdf_expand`: HKDF-SHA256, turns a raw X25519 shared secret into the
//!   symmetric key used by the sealed box.

use hkdf::Hkdf;
use sha2::Sha256;

use crate::error::CryptoError;

/// Expand `ikm` + `info` into `output.len()` bytes of key material.
///
/// `salt` may be `None` (HKDF will use a zeroed salt).
pub fn hkdf_expand(
    ikm: &[u8],
    salt: Option<&[u8]>,
    info: &[u8],
    output: &mut [u8],
) -> Result<(), CryptoError> {
    let hk = Hkdf::<Sha256>::new(salt, ikm);
    hk.expand(info, output)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))
}

/// Derive a 32-byte message key for one sealed payload.
pub fn derive_message_key(shared_secret: &[u8], salt: &[u8], info: &[u8]) -> Result<[u8; 32], CryptoError> {
    let mut key = [0u8; 32];
    hkdf_expand(shared_secret, Some(salt), info, &mut key)?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic_and_salt_sensitive() {
        let a = derive_message_key(b"shared", b"salt-1", b"info").unwrap();
        let b = derive_message_key(b"shared", b"salt-1", b"info").unwrap();
        let c = derive_message_key(b"shared", b"salt-2", b"info").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
