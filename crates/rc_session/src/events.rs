//! What the session tells the presentation layer.

use serde::Serialize;

use rc_proto::ConversationId;
use rc_store::StoredMessage;

/// One entry of the conversation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationSummary {
    pub conversation: ConversationId,
    /// Peer display name when the peer is in the roster.
    pub display_name: Option<String>,
    /// Whether the peer is currently present. Always true for the group.
    pub online: bool,
    pub has_unread: bool,
}

impl ConversationSummary {
    pub fn label(&self) -> String {
        match (&self.conversation, &self.display_name) {
            (ConversationId::Group, _) => "group".to_string(),
            (_, Some(name)) => name.clone(),
            (other, None) => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Join and leave notices.
    SystemNotice(String),
    /// A message landed in the active conversation.
    MessageAppended(StoredMessage),
    /// A conversation other than the active one changed.
    ConversationUpdated {
        conversation: ConversationId,
        has_unread: bool,
    },
    /// Full history of the conversation that just became active.
    ConversationLoaded {
        conversation: ConversationId,
        messages: Vec<StoredMessage>,
    },
    ConversationsRefreshed(Vec<ConversationSummary>),
    Error(String),
    Disconnected,
}
