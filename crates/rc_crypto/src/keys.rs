//! Identity keys
//!
//! Every participant owns one long-term X25519 keypair. The public half,
//! hex-encoded, is both the encryption key other peers seal messages to and
//! the identity the relay routes by. There is no separate user id.

use std::fmt;

use rand::rngs::OsRng;
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::CryptoError;

pub const KEY_LEN: usize = 32;

/// Hex-encoded X25519 keypair. The private half is zeroized on drop.
#[derive(Clone, ZeroizeOnDrop)]
pub struct KeyPair {
    #[zeroize(skip)]
    pub public_key: String,
    pub private_key: String,
}

impl KeyPair {
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = X25519Public::from(&secret);
        let secret_bytes = Zeroizing::new(secret.to_bytes());
        Self {
            public_key: hex::encode(public.as_bytes()),
            private_key: hex::encode(&*secret_bytes),
        }
    }

    /// Rebuild a keypair from a stored private key, recomputing the public half.
    pub fn from_private_key(private_key_hex: &str) -> Result<Self, CryptoError> {
        let secret = parse_private_key(private_key_hex)?;
        let public = X25519Public::from(&secret);
        Ok(Self {
            public_key: hex::encode(public.as_bytes()),
            private_key: private_key_hex.to_ascii_lowercase(),
        })
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

fn decode_32(hex_str: &str, what: &str) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
    let mut bytes = hex::decode(hex_str.trim())?;
    if bytes.len() != KEY_LEN {
        let len = bytes.len();
        bytes.zeroize();
        return Err(CryptoError::InvalidKey(format!(
            "{what} must be {KEY_LEN} bytes, got {len}"
        )));
    }
    let mut out = Zeroizing::new([0u8; KEY_LEN]);
    out.copy_from_slice(&bytes);
    bytes.zeroize();
    Ok(out)
}

pub fn parse_public_key(public_key_hex: &str) -> Result<X25519Public, CryptoError> {
    let bytes = decode_32(public_key_hex, "public key")?;
    Ok(X25519Public::from(*bytes))
}

pub fn parse_private_key(private_key_hex: &str) -> Result<StaticSecret, CryptoError> {
    let bytes = decode_32(private_key_hex, "private key")?;
    Ok(StaticSecret::from(*bytes))
}

/// True if `candidate` decodes to a 32-byte X25519 public key.
pub fn is_valid_public_key(candidate: &str) -> bool {
    parse_public_key(candidate).is_ok()
}

/// Short human-readable fingerprint: BLAKE3 of the raw public key, first
/// 8 bytes, hex in groups of 4.
///
/// Example: "a1b2 c3d4 e5f6 7890"
pub fn fingerprint(public_key_hex: &str) -> Result<String, CryptoError> {
    let public = parse_public_key(public_key_hex)?;
    let hash = blake3::hash(public.as_bytes());
    let hex = hex::encode(&hash.as_bytes()[..8]);
    Ok(hex
        .as_bytes()
        .chunks(4)
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect::<Vec<_>>()
        .join(" "))
}
