//! Sealed box: encrypt to a recipient's public key, anonymously.
//!
//! Protocol:
//!   Sender generates ONE ephemeral X25519 keypair EK per call.
//!     SS  = DH(EK, PK_R)
//!     key = HKDF(salt = EK_pub || PK_R, ikm = SS, info = "rc-sealed-v1")
//!     ct  = XChaCha20-Poly1305(key, plaintext, aad = EK_pub)
//!
//! Wire format (hex-encoded on the relay):
//!   [ EK_pub (32) | nonce (24) | ciphertext + tag ]
//!
//! A fresh ephemeral key and nonce per call means two seals of the same
//! plaintext for the same (or different) recipients never share ciphertext.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    Key, XChaCha20Poly1305, XNonce,
};
use rand::{rngs::OsRng, RngCore};
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::Zeroizing;

use crate::{
    error::CryptoError,
    kdf,
    keys::{parse_private_key, parse_public_key, KEY_LEN},
};

const SEALED_INFO: &[u8] = b"rc-sealed-v1";

const NONCE_LEN: usize = 24;
const TAG_LEN: usize = 16;

/// Minimum decodable sealed payload: ephemeral key, nonce, empty body tag.
pub const MIN_SEALED_LEN: usize = KEY_LEN + NONCE_LEN + TAG_LEN;

fn message_key(
    shared: &x25519_dalek::SharedSecret,
    ephemeral_pub: &X25519Public,
    recipient_pub: &X25519Public,
) -> Result<[u8; 32], CryptoError> {
    if !shared.was_contributory() {
        return Err(CryptoError::InvalidKey("low-order public key".into()));
    }
    let mut salt = [0u8; KEY_LEN * 2];
    salt[..KEY_LEN].copy_from_slice(ephemeral_pub.as_bytes());
    salt[KEY_LEN..].copy_from_slice(recipient_pub.as_bytes());
    kdf::derive_message_key(shared.as_bytes(), &salt, SEALED_INFO)
}

/// Seal raw bytes to `recipient`.
pub fn seal(plaintext: &[u8], recipient: &X25519Public) -> Result<Vec<u8>, CryptoError> {
    let ephemeral = StaticSecret::random_from_rng(OsRng);
    let ephemeral_pub = X25519Public::from(&ephemeral);
    let shared = ephemeral.diffie_hellman(recipient);
    let key = Zeroizing::new(message_key(&shared, &ephemeral_pub, recipient)?);

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    let body = XChaCha20Poly1305::new(Key::from_slice(&key[..]))
        .encrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: ephemeral_pub.as_bytes(),
            },
        )
        .map_err(|_| CryptoError::AeadEncrypt)?;

    let mut out = Vec::with_capacity(KEY_LEN + NONCE_LEN + body.len());
    out.extend_from_slice(ephemeral_pub.as_bytes());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Open a sealed payload with the recipient's private key.
pub fn open(sealed: &[u8], recipient_secret: &StaticSecret) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if sealed.len() < MIN_SEALED_LEN {
        return Err(CryptoError::CiphertextTooShort {
            len: sealed.len(),
            min: MIN_SEALED_LEN,
        });
    }
    let (ek_bytes, rest) = sealed.split_at(KEY_LEN);
    let (nonce, body) = rest.split_at(NONCE_LEN);
    let mut ek = [0u8; KEY_LEN];
    ek.copy_from_slice(ek_bytes);
    let ephemeral_pub = X25519Public::from(ek);
    let recipient_pub = X25519Public::from(recipient_secret);

    let shared = recipient_secret.diffie_hellman(&ephemeral_pub);
    let key = Zeroizing::new(message_key(&shared, &ephemeral_pub, &recipient_pub)?);

    // EK_pub is the associated data.
    XChaCha20Poly1305::new(Key::from_slice(&key[..]))
        .decrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: body,
                aad: ephemeral_pub.as_bytes(),
            },
        )
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::AeadDecrypt)
}

/// Encrypt UTF-8 text to a hex public key, returning hex ciphertext.
pub fn encrypt_message(message: &str, recipient_public_key_hex: &str) -> Result<String, CryptoError> {
    let recipient = parse_public_key(recipient_public_key_hex)?;
    Ok(hex::encode(seal(message.as_bytes(), &recipient)?))
}

/// Decrypt hex ciphertext with a hex private key, returning UTF-8 text.
pub fn decrypt_message(encrypted_hex: &str, private_key_hex: &str) -> Result<String, CryptoError> {
    let secret = parse_private_key(private_key_hex)?;
    let sealed = hex::decode(encrypted_hex.trim())?;
    let plaintext = open(&sealed, &secret)?;
    Ok(String::from_utf8(plaintext.to_vec())?)
}
