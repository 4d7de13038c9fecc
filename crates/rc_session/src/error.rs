use thiserror::Error;

use rc_crypto::CryptoError;
use rc_store::StoreError;

use crate::state::SessionState;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid session state: expected {expected}, session is {actual}")]
    InvalidState {
        expected: SessionState,
        actual: SessionState,
    },

    /// The user's own message could not be persisted. Nothing was sent and
    /// the composed text is handed back.
    #[error("Message not sent: {source}")]
    Unsent {
        text: String,
        #[source]
        source: StoreError,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Invalid display name: {0}")]
    InvalidDisplayName(String),

    #[error("Message is empty")]
    EmptyMessage,

    #[error("Transport is closed")]
    TransportClosed,

    #[error("No local profile")]
    NoProfile,
}

impl SessionError {
    /// Recover the composed text from a failed send.
    pub fn into_unsent_text(self) -> Option<String> {
        match self {
            Self::Unsent { text, .. } => Some(text),
            _ => None,
        }
    }
}
