//! Conversation addressing.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Storage key of the shared group conversation. Contains characters that
/// never appear in a hex-encoded public key, so it cannot collide with a peer.
pub const GROUP_STORAGE_KEY: &str = "__NULL_GROUP__";

/// Either the shared group channel or a one-to-one channel keyed by the
/// peer's public key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConversationId {
    Group,
    Peer(String),
}

impl ConversationId {
    pub fn peer(identity: impl Into<String>) -> Self {
        let identity = identity.into();
        if identity == GROUP_STORAGE_KEY {
            Self::Group
        } else {
            Self::Peer(identity)
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group)
    }

    /// The peer identity for one-to-one conversations.
    pub fn peer_identity(&self) -> Option<&str> {
        match self {
            Self::Group => None,
            Self::Peer(id) => Some(id),
        }
    }

    /// Partition key used by the message store.
    pub fn storage_key(&self) -> &str {
        match self {
            Self::Group => GROUP_STORAGE_KEY,
            Self::Peer(id) => id,
        }
    }

    pub fn from_storage_key(key: &str) -> Self {
        Self::peer(key)
    }

    /// Decide which conversation a relayed message belongs to.
    ///
    /// A message is group-addressed when `group_id` is present and names
    /// either the sender (the marker a client puts on its own group fan-out)
    /// or the local identity. Anything else is a one-to-one message from
    /// `sender`.
    pub fn for_relayed(sender: &str, group_id: Option<&str>, local_public_key: &str) -> Self {
        match group_id {
            Some(marker) if marker == sender || marker == local_public_key => Self::Group,
            _ => Self::peer(sender),
        }
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Group => f.write_str("group"),
            Self::Peer(id) => f.write_str(id),
        }
    }
}

impl From<String> for ConversationId {
    fn from(key: String) -> Self {
        Self::peer(key)
    }
}

impl From<ConversationId> for String {
    fn from(id: ConversationId) -> Self {
        id.storage_key().to_string()
    }
}
