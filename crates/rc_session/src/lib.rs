//! rc_session: Relaychat session controller
//!
//! A [`Session`] owns everything that used to be ambient client state: the
//! local profile, the roster of present peers, the active conversation and
//! the handles to the message store and identity provider. Every transport
//! frame and every local action goes through it.
//!
//! The session never touches a socket. Frames to send come out of
//! [`SessionIo::outbound`]; everything the presentation layer should show
//! comes out of [`SessionIo::events`].
//!
//! # Module layout
//! - `roster`: in-memory map of present peers
//! - `state`: session lifecycle states
//! - `events`: presentation events and conversation summaries
//! - `session`: the controller itself
//! - `error`: unified error type

pub mod error;
pub mod events;
pub mod roster;
pub mod session;
pub mod state;

pub use error::SessionError;
pub use events::{ConversationSummary, SessionEvent};
pub use roster::{Peer, Roster};
pub use session::{SendReport, Session, SessionDeps, SessionIo};
pub use state::SessionState;
