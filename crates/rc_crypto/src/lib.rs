//! rc_crypto: Relaychat identity keys and per-recipient encryption
//!
//! # Design principles
//! - NO custom crypto; all primitives come from audited Rust crates.
//! - Zeroize all secret material on drop.
//! - Keys travel as lowercase hex strings: the public key doubles as the
//!   routable peer identity on the relay.
//!
//! # Module layout
//! - `keys`: X25519 keypair generation, key parsing, fingerprints
//! - `sealed`: sealed-box encrypt-to-public-key / decrypt-with-private-key,
//!   including the XChaCha20-Poly1305 body
//! - `kdf`: HKDF-SHA256 key derivation
//! - `provider`: the `IdentityProvider` capability consumed by the session
//! - `error`: unified error type

pub mod error;
pub mod kdf;
pub mod keys;
pub mod provider;
pub mod sealed;

pub use error::CryptoError;
pub use keys::KeyPair;
pub use provider::{IdentityProvider, SealedBoxProvider};
