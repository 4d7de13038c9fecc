//! Relay frames.
//!
//! Outbound (client → relay):
//!   - `first`: announce our public key and display name, once per connection
//!   - `send_message`: one sealed payload for one recipient
//!
//! Inbound (relay → client):
//!   - `new_user`: a peer is present (sent for every existing peer on join too)
//!   - `relay_message`: a sealed payload addressed to us
//!   - `user_left`: a peer disconnected
//!
//! Decoding is strict: an unknown `kind` or a missing field is a
//! [`FrameError::Malformed`], never a partially-filled frame.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboundFrame {
    First {
        public_key: String,
        name: String,
    },
    SendMessage {
        recipient: String,
        /// Per-recipient ciphertext.
        payload: String,
        /// Present (and equal to the sender's public key) on group fan-out.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        group_id: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboundFrame {
    NewUser {
        user: RemoteUser,
    },
    RelayMessage {
        sender: String,
        payload: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        group_id: Option<String>,
    },
    UserLeft {
        user_id: String,
    },
}

/// A peer as announced by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUser {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub public_key: Option<String>,
}

impl RemoteUser {
    /// The key to encrypt to. The relay uses the public key as the id, so
    /// fall back to `id` when the explicit field is absent.
    pub fn public_key(&self) -> &str {
        self.public_key.as_deref().unwrap_or(&self.id)
    }
}

impl OutboundFrame {
    pub fn encode(&self) -> Result<String, FrameError> {
        serde_json::to_string(self).map_err(FrameError::Malformed)
    }
}

impl InboundFrame {
    pub fn decode(text: &str) -> Result<Self, FrameError> {
        if text.trim().is_empty() {
            return Err(FrameError::Empty);
        }
        serde_json::from_str(text).map_err(FrameError::Malformed)
    }

    /// Frame kind for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NewUser { .. } => "new_user",
            Self::RelayMessage { .. } => "relay_message",
            Self::UserLeft { .. } => "user_left",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("Empty frame")]
    Empty,
    #[error("Malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_frame_shape() {
        let frame = OutboundFrame::First {
            public_key: "abc".into(),
            name: "Alice".into(),
        };
        let value: serde_json::Value = serde_json::from_str(&frame.encode().unwrap()).unwrap();
        assert_eq!(value, json!({"kind": "first", "public_key": "abc", "name": "Alice"}));
    }

    #[test]
    fn send_message_omits_absent_group_id() {
        let frame = OutboundFrame::SendMessage {
            recipient: "bob".into(),
            payload: "00ff".into(),
            group_id: None,
        };
        let value: serde_json::Value = serde_json::from_str(&frame.encode().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"kind": "send_message", "recipient": "bob", "payload": "00ff"})
        );
    }

    #[test]
    fn decodes_new_user_from_relay() {
        let frame = InboundFrame::decode(
            r#"{"kind":"new_user","user":{"id":"k1","name":"Bob","public_key":"k1"}}"#,
        )
        .unwrap();
        match frame {
            InboundFrame::NewUser { user } => {
                assert_eq!(user.name, "Bob");
                assert_eq!(user.public_key(), "k1");
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn new_user_with_null_public_key_falls_back_to_id() {
        let frame = InboundFrame::decode(
            r#"{"kind":"new_user","user":{"id":"k2","name":"Carol","public_key":null}}"#,
        )
        .unwrap();
        let InboundFrame::NewUser { user } = frame else {
            panic!("expected new_user");
        };
        assert_eq!(user.public_key(), "k2");
    }

    #[test]
    fn decodes_relay_message_with_and_without_group() {
        let plain = InboundFrame::decode(r#"{"kind":"relay_message","sender":"k1","payload":"aa"}"#)
            .unwrap();
        assert_eq!(
            plain,
            InboundFrame::RelayMessage {
                sender: "k1".into(),
                payload: "aa".into(),
                group_id: None
            }
        );
        let group = InboundFrame::decode(
            r#"{"kind":"relay_message","sender":"k1","payload":"aa","group_id":"k1"}"#,
        )
        .unwrap();
        assert_eq!(group.kind(), "relay_message");
    }

    #[test]
    fn rejects_unknown_kind_and_garbage() {
        assert!(matches!(
            InboundFrame::decode(r#"{"kind":"reboot"}"#),
            Err(FrameError::Malformed(_))
        ));
        assert!(matches!(
            InboundFrame::decode("{not json"),
            Err(FrameError::Malformed(_))
        ));
        assert!(matches!(InboundFrame::decode("  "), Err(FrameError::Empty)));
        assert!(matches!(
            InboundFrame::decode(r#"{"kind":"user_left"}"#),
            Err(FrameError::Malformed(_))
        ));
    }
}
