use std::fmt;

use serde::Serialize;

/// Session lifecycle. Moves strictly forward; `Disconnected` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No local identity yet.
    Unprovisioned,
    /// Identity generated, waiting for the user to pick a name.
    AwaitingDisplayName,
    /// Profile persisted, transport being opened.
    Connecting,
    Active,
    Disconnected,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unprovisioned => "unprovisioned",
            Self::AwaitingDisplayName => "awaiting_display_name",
            Self::Connecting => "connecting",
            Self::Active => "active",
            Self::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
