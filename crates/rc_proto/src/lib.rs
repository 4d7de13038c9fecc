//! rc_proto: Wire frames and conversation addressing for Relaychat
//!
//! All frames are JSON text messages over the relay WebSocket, tagged by a
//! `kind` field. The relay never decrypts `payload`.
//!
//! # Modules
//! - `frame`: Closed outbound/inbound frame enums, decoded once at the boundary
//! - `conversation`: `ConversationId` (group sentinel or peer key) and relay routing

pub mod conversation;
pub mod frame;

pub use conversation::{ConversationId, GROUP_STORAGE_KEY};
pub use frame::{FrameError, InboundFrame, OutboundFrame, RemoteUser};
