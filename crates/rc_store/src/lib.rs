//! rc_store: Local persistence for Relaychat
//!
//! # Message log
//! A single SQLite table partitioned by conversation id. Each partition holds
//! at most `max_messages_per_conversation` entries; appending past the cap
//! evicts the oldest entry in the same transaction as the insert, so a reader
//! never observes an over-full partition.
//!
//! Plaintext is stored as-is: the store only ever holds messages that were
//! successfully decrypted (or composed locally).
//!
//! # Profile slot
//! The local identity lives outside the database in a single JSON file,
//! replaced atomically on every save.
//!
//! # Migration
//! SQLx migrations in `migrations/` are run on open.

pub mod db;
pub mod error;
pub mod messages;
pub mod models;
pub mod profile;

pub use db::{Store, StoreConfig, MAX_MESSAGES_PER_CONVERSATION};
pub use error::StoreError;
pub use models::{NewMessage, StoredMessage};
pub use profile::{Profile, ProfileStore, DEFAULT_DISPLAY_NAME};
