//! The session controller.
//!
//! Handlers run one at a time on `&mut self`; the only suspension points are
//! store calls. Transport and presentation are reached through unbounded
//! channels so a handler never blocks on either.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::mpsc;

use rc_crypto::{keys::is_valid_public_key, IdentityProvider};
use rc_proto::{ConversationId, InboundFrame, OutboundFrame, RemoteUser};
use rc_store::{NewMessage, Profile, ProfileStore, Store, StoredMessage, DEFAULT_DISPLAY_NAME};

use crate::{
    error::SessionError,
    events::{ConversationSummary, SessionEvent},
    roster::{Peer, Roster},
    state::SessionState,
};

/// Longest accepted display name, in characters.
const MAX_DISPLAY_NAME_CHARS: usize = 64;

/// Collaborators a session is built from.
pub struct SessionDeps {
    pub store: Store,
    pub profiles: ProfileStore,
    pub identity: Arc<dyn IdentityProvider>,
}

/// Receiving ends handed to the transport and presentation layers.
pub struct SessionIo {
    /// Frames to write to the relay, in order.
    pub outbound: mpsc::UnboundedReceiver<OutboundFrame>,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
}

/// Outcome of [`Session::send_message`].
#[derive(Debug, Clone)]
pub struct SendReport {
    /// The locally persisted copy.
    pub message: StoredMessage,
    /// Identities a ciphertext was queued for.
    pub recipients: Vec<String>,
    /// Identities that could not be encrypted for.
    pub failed: Vec<String>,
}

pub struct Session {
    state: SessionState,
    profile: Option<Profile>,
    roster: Roster,
    active: ConversationId,
    store: Store,
    profiles: ProfileStore,
    identity: Arc<dyn IdentityProvider>,
    outbound: mpsc::UnboundedSender<OutboundFrame>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl Session {
    /// Build a session. Starts in `Connecting` when a profile is already
    /// persisted, `Unprovisioned` otherwise.
    pub fn start(deps: SessionDeps) -> Result<(Self, SessionIo), SessionError> {
        let profile = deps.profiles.load()?;
        let state = if profile.is_some() {
            SessionState::Connecting
        } else {
            SessionState::Unprovisioned
        };

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        tracing::info!(
            target: "rc_session",
            event = "session_started",
            state = %state,
            public_key = profile.as_ref().map(|p| p.public_key.as_str()).unwrap_or("-")
        );

        let session = Self {
            state,
            profile,
            roster: Roster::new(),
            active: ConversationId::Group,
            store: deps.store,
            profiles: deps.profiles,
            identity: deps.identity,
            outbound: outbound_tx,
            events: events_tx,
        };
        let io = SessionIo {
            outbound: outbound_rx,
            events: events_rx,
        };
        Ok((session, io))
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn active_conversation(&self) -> &ConversationId {
        &self.active
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    // ── Local actions ────────────────────────────────────────────────────────

    /// Generate a fresh identity with the default display name. Nothing is
    /// persisted until a name is submitted.
    pub fn request_identity(&mut self) -> Result<&Profile, SessionError> {
        self.expect_state(SessionState::Unprovisioned)?;
        let keys = self.identity.generate_keypair()?;
        let profile = Profile::from_keypair(&keys, DEFAULT_DISPLAY_NAME);

        tracing::info!(
            target: "rc_session",
            event = "identity_generated",
            public_key = %profile.public_key
        );

        self.state = SessionState::AwaitingDisplayName;
        Ok(self.profile.insert(profile))
    }

    pub fn submit_display_name(&mut self, name: &str) -> Result<(), SessionError> {
        self.expect_state(SessionState::AwaitingDisplayName)?;
        let name = validate_display_name(name)?;

        let profile = self.profile.as_mut().ok_or(SessionError::NoProfile)?;
        profile.set_name(name);
        self.profiles.save(profile)?;

        tracing::info!(
            target: "rc_session",
            event = "display_name_set",
            public_key = %profile.public_key,
            name = %profile.name
        );

        let notice = format!("{} joined the chat.", profile.name);
        self.state = SessionState::Connecting;
        self.emit(SessionEvent::SystemNotice(notice));
        Ok(())
    }

    /// Announce ourselves and open the group conversation.
    pub async fn transport_opened(&mut self) -> Result<(), SessionError> {
        self.expect_state(SessionState::Connecting)?;
        let profile = self.profile.as_ref().ok_or(SessionError::NoProfile)?;

        let first = OutboundFrame::First {
            public_key: profile.public_key.clone(),
            name: profile.name.clone(),
        };
        self.queue(first)?;

        self.state = SessionState::Active;
        tracing::info!(target: "rc_session", event = "session_active");

        self.open_conversation(ConversationId::Group).await
    }

    /// Persist the user's message under the active conversation, then queue
    /// one independently encrypted frame per recipient.
    ///
    /// If persisting fails nothing is sent and the text comes back inside
    /// [`SessionError::Unsent`].
    pub async fn send_message(&mut self, text: &str) -> Result<SendReport, SessionError> {
        self.expect_state(SessionState::Active)?;
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        if self.outbound.is_closed() {
            self.transport_closed();
            return Err(SessionError::TransportClosed);
        }
        let profile = self.profile.as_ref().ok_or(SessionError::NoProfile)?;
        let own_name = profile.name.clone();
        let own_key = profile.public_key.clone();
        let conversation = self.active.clone();

        let message = match self
            .store
            .append_stored(NewMessage::new(own_name, text, conversation.clone()), false)
            .await
        {
            Ok(message) => message,
            Err(source) => {
                tracing::error!(
                    target: "rc_session",
                    event = "send_persist_failed",
                    conversation = %conversation,
                    error = %source
                );
                self.emit(SessionEvent::Error(format!("Message not sent: {source}")));
                return Err(SessionError::Unsent {
                    text: text.to_string(),
                    source,
                });
            }
        };
        self.emit(SessionEvent::MessageAppended(message.clone()));

        let (targets, group_id): (Vec<Peer>, Option<String>) = match &conversation {
            ConversationId::Group => (self.roster.all().cloned().collect(), Some(own_key)),
            ConversationId::Peer(identity) => (self.roster.get(identity).cloned().into_iter().collect(), None),
        };

        let mut recipients = Vec::with_capacity(targets.len());
        let mut failed = Vec::new();
        for peer in targets {
            let payload = match self.identity.encrypt(text, &peer.public_key) {
                Ok(ct) => ct,
                Err(e) => {
                    tracing::warn!(
                        target: "rc_session",
                        event = "encrypt_failed",
                        recipient = %peer.identity,
                        error = %e
                    );
                    failed.push(peer.identity.clone());
                    continue;
                }
            };
            let frame = OutboundFrame::SendMessage {
                recipient: peer.identity.clone(),
                payload,
                group_id: group_id.clone(),
            };
            self.queue(frame)?;
            recipients.push(peer.identity);
        }

        tracing::info!(
            target: "rc_session",
            event = "message_sent",
            conversation = %conversation,
            len = text.len(),
            recipients = recipients.len(),
            failed = failed.len()
        );

        Ok(SendReport {
            message,
            recipients,
            failed,
        })
    }

    /// Make `conversation` the active one, show its history and clear its
    /// unread flags.
    pub async fn select_conversation(&mut self, conversation: ConversationId) -> Result<(), SessionError> {
        self.expect_state(SessionState::Active)?;
        self.open_conversation(conversation).await
    }

    /// Conversation list: the group first, then every peer that is present
    /// or has stored history, in identity order.
    pub async fn conversations(&self) -> Result<Vec<ConversationSummary>, SessionError> {
        let mut peers: BTreeSet<String> = self.roster.all().map(|p| p.identity.clone()).collect();
        for id in self.store.conversation_ids().await? {
            if let ConversationId::Peer(identity) = id {
                peers.insert(identity);
            }
        }

        let mut out = Vec::with_capacity(peers.len() + 1);
        out.push(ConversationSummary {
            conversation: ConversationId::Group,
            display_name: None,
            online: true,
            has_unread: self.store.has_unread(&ConversationId::Group).await?,
        });
        for identity in peers {
            let conversation = ConversationId::peer(identity);
            let peer = conversation.peer_identity().and_then(|id| self.roster.get(id));
            let display_name = peer.map(|p| p.display_name.clone());
            let online = peer.is_some();
            let has_unread = self.store.has_unread(&conversation).await?;
            out.push(ConversationSummary {
                conversation,
                display_name,
                online,
                has_unread,
            });
        }
        Ok(out)
    }

    pub async fn clear_conversation(&mut self, conversation: &ConversationId) -> Result<(), SessionError> {
        self.store.clear_conversation(conversation).await?;
        tracing::info!(target: "rc_session", event = "conversation_cleared", conversation = %conversation);
        if *conversation == self.active {
            self.emit(SessionEvent::ConversationLoaded {
                conversation: conversation.clone(),
                messages: Vec::new(),
            });
        }
        self.refresh_conversations().await
    }

    pub async fn clear_history(&mut self) -> Result<(), SessionError> {
        self.store.clear_all().await?;
        tracing::info!(target: "rc_session", event = "history_cleared");
        self.emit(SessionEvent::ConversationLoaded {
            conversation: self.active.clone(),
            messages: Vec::new(),
        });
        self.refresh_conversations().await
    }

    /// The relay connection is gone. Terminal.
    pub fn transport_closed(&mut self) {
        if self.state == SessionState::Disconnected {
            return;
        }
        tracing::info!(
            target: "rc_session",
            event = "transport_closed",
            previous = %self.state,
            peers = self.roster.len()
        );
        self.state = SessionState::Disconnected;
        self.roster.clear();
        self.emit(SessionEvent::Disconnected);
    }

    // ── Relay frames ─────────────────────────────────────────────────────────

    /// Decode and dispatch one text frame from the relay. Frames that do not
    /// parse are dropped.
    pub async fn handle_frame(&mut self, text: &str) -> Result<(), SessionError> {
        match InboundFrame::decode(text) {
            Ok(frame) => self.handle_inbound(frame).await,
            Err(e) => {
                tracing::debug!(target: "rc_session", event = "frame_dropped", reason = %e, len = text.len());
                Ok(())
            }
        }
    }

    pub async fn handle_inbound(&mut self, frame: InboundFrame) -> Result<(), SessionError> {
        if self.state != SessionState::Active {
            tracing::debug!(
                target: "rc_session",
                event = "frame_ignored",
                kind = frame.kind(),
                state = %self.state
            );
            return Ok(());
        }

        match frame {
            InboundFrame::NewUser { user } => self.on_peer_joined(user).await,
            InboundFrame::UserLeft { user_id } => self.on_peer_left(&user_id).await,
            InboundFrame::RelayMessage {
                sender,
                payload,
                group_id,
            } => self.on_relayed(&sender, &payload, group_id.as_deref()).await,
        }
    }

    async fn on_peer_joined(&mut self, user: RemoteUser) -> Result<(), SessionError> {
        if self.is_self(&user.id) || self.is_self(user.public_key()) {
            return Ok(());
        }
        // The group partition key is not valid hex, so this also keeps a peer
        // from claiming it.
        if !is_valid_public_key(&user.id) || !is_valid_public_key(user.public_key()) {
            tracing::warn!(target: "rc_session", event = "malformed_peer", identity = %user.id);
            return Ok(());
        }
        let peer = Peer::from(user);
        tracing::info!(target: "rc_session", event = "peer_joined", identity = %peer.identity);

        let notice = format!("{} joined the chat.", peer.display_name);
        self.roster.add(peer);
        self.emit(SessionEvent::SystemNotice(notice));
        self.refresh_conversations().await
    }

    async fn on_peer_left(&mut self, identity: &str) -> Result<(), SessionError> {
        let Some(peer) = self.roster.remove(identity) else {
            tracing::debug!(target: "rc_session", event = "unknown_peer_left", identity);
            return Ok(());
        };
        tracing::info!(target: "rc_session", event = "peer_left", identity);
        self.emit(SessionEvent::SystemNotice(format!("{} left the chat.", peer.display_name)));
        self.refresh_conversations().await
    }

    async fn on_relayed(&mut self, sender: &str, payload: &str, group_id: Option<&str>) -> Result<(), SessionError> {
        let Some(peer) = self.roster.get(sender) else {
            tracing::debug!(target: "rc_session", event = "unknown_sender", sender);
            return Ok(());
        };
        let sender_name = peer.display_name.clone();
        let profile = self.profile.as_ref().ok_or(SessionError::NoProfile)?;

        let plaintext = match self.identity.decrypt(payload, &profile.private_key) {
            Ok(pt) => pt,
            Err(e) => {
                tracing::warn!(target: "rc_session", event = "decrypt_failed", sender, error = %e);
                return Ok(());
            }
        };

        let conversation = ConversationId::for_relayed(sender, group_id, &profile.public_key);
        let unread = conversation != self.active;

        let message = match self
            .store
            .append_stored(NewMessage::new(sender_name, plaintext, conversation.clone()), unread)
            .await
        {
            Ok(m) => m,
            Err(e) => {
                tracing::error!(
                    target: "rc_session",
                    event = "inbound_persist_failed",
                    conversation = %conversation,
                    error = %e
                );
                self.emit(SessionEvent::Error(format!("Could not store message from {sender}: {e}")));
                return Err(e.into());
            }
        };

        tracing::debug!(
            target: "rc_session",
            event = "message_received",
            conversation = %conversation,
            sender,
            unread
        );

        if unread {
            self.emit(SessionEvent::ConversationUpdated {
                conversation,
                has_unread: true,
            });
        } else {
            self.emit(SessionEvent::MessageAppended(message));
        }
        Ok(())
    }

    // ── Helpers ──────────────────────────────────────────────────────────────

    async fn open_conversation(&mut self, conversation: ConversationId) -> Result<(), SessionError> {
        self.active = conversation.clone();
        let messages = self.store.list_by_conversation(&conversation).await?;
        self.emit(SessionEvent::ConversationLoaded {
            conversation: conversation.clone(),
            messages,
        });

        self.store.mark_read(&conversation).await?;
        self.emit(SessionEvent::ConversationUpdated {
            conversation,
            has_unread: false,
        });
        self.refresh_conversations().await
    }

    /// Hand a frame to the transport. A closed sink means the link is gone,
    /// which ends the session.
    fn queue(&mut self, frame: OutboundFrame) -> Result<(), SessionError> {
        if self.outbound.send(frame).is_err() {
            self.transport_closed();
            return Err(SessionError::TransportClosed);
        }
        Ok(())
    }

    async fn refresh_conversations(&self) -> Result<(), SessionError> {
        let list = self.conversations().await?;
        self.emit(SessionEvent::ConversationsRefreshed(list));
        Ok(())
    }

    fn is_self(&self, identity: &str) -> bool {
        self.profile.as_ref().is_some_and(|p| p.public_key == identity)
    }

    fn expect_state(&self, expected: SessionState) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                expected,
                actual: self.state,
            })
        }
    }

    /// A dropped presentation receiver is not an error for the session.
    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

fn validate_display_name(name: &str) -> Result<&str, SessionError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SessionError::InvalidDisplayName("name is empty".into()));
    }
    if name.chars().count() > MAX_DISPLAY_NAME_CHARS {
        return Err(SessionError::InvalidDisplayName(format!(
            "name is longer than {MAX_DISPLAY_NAME_CHARS} characters"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(SessionError::InvalidDisplayName("name contains control characters".into()));
    }
    Ok(name)
}
