//! Message models: rows as stored, and the typed view handed to callers.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use rc_proto::ConversationId;

/// A message about to be appended. The store assigns id, timestamp and
/// read state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    /// Display name of the author.
    pub sender: String,
    /// Plaintext body.
    pub payload: String,
    pub conversation: ConversationId,
}

impl NewMessage {
    pub fn new(sender: impl Into<String>, payload: impl Into<String>, conversation: ConversationId) -> Self {
        Self {
            sender: sender.into(),
            payload: payload.into(),
            conversation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: i64,
    pub sender: String,
    pub payload: String,
    pub conversation: ConversationId,
    /// Milliseconds since the Unix epoch, strictly increasing per store.
    pub timestamp: i64,
    pub unread: bool,
}

impl StoredMessage {
    pub fn sent_at(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.timestamp)
            .single()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct MessageRow {
    pub id: i64,
    pub sender: String,
    pub payload: String,
    pub conversation_id: String,
    pub timestamp: i64,
    pub is_unread: bool,
}

impl From<MessageRow> for StoredMessage {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            sender: row.sender,
            payload: row.payload,
            conversation: ConversationId::from_storage_key(&row.conversation_id),
            timestamp: row.timestamp,
            unread: row.is_unread,
        }
    }
}
