//! Roster of peers currently present on the relay. Memory only: a restart
//! forgets everyone until they announce themselves again.

use std::collections::BTreeMap;

use serde::Serialize;

use rc_proto::RemoteUser;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Peer {
    /// Routable identity. Same value as `public_key` for every relay peer.
    pub identity: String,
    pub display_name: String,
    pub public_key: String,
}

impl Peer {
    pub fn new(identity: impl Into<String>, display_name: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            display_name: display_name.into(),
            public_key: public_key.into(),
        }
    }
}

impl From<RemoteUser> for Peer {
    fn from(user: RemoteUser) -> Self {
        let public_key = user.public_key().to_string();
        Self {
            identity: user.id,
            display_name: user.name,
            public_key,
        }
    }
}

/// Peers keyed by identity, iterated in identity order.
#[derive(Debug, Default, Clone)]
pub struct Roster {
    peers: BTreeMap<String, Peer>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `peer.identity`.
    pub fn add(&mut self, peer: Peer) -> Option<Peer> {
        self.peers.insert(peer.identity.clone(), peer)
    }

    /// Remove and return the entry. Unknown identities are a no-op.
    pub fn remove(&mut self, identity: &str) -> Option<Peer> {
        self.peers.remove(identity)
    }

    pub fn get(&self, identity: &str) -> Option<&Peer> {
        self.peers.get(identity)
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.peers.contains_key(identity)
    }

    pub fn all(&self) -> impl Iterator<Item = &Peer> {
        self.peers.values()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn clear(&mut self) {
        self.peers.clear();
    }
}
