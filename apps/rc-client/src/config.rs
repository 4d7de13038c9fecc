//! Client configuration: `config.json` in the data directory, then
//! `RC_RELAY_URL`, then command-line flags.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use rc_store::StoreConfig;

pub const DEFAULT_RELAY_URL: &str = "ws://127.0.0.1:3333/ws";
pub const RELAY_URL_ENV: &str = "RC_RELAY_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub relay_url: String,
    pub store: StoreConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: DEFAULT_RELAY_URL.to_string(),
            store: StoreConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Read `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        match std::fs::read(path) {
            Ok(raw) => serde_json::from_slice(&raw).with_context(|| format!("invalid config at {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("cannot read {}", path.display())),
        }
    }

    /// Apply the environment override, then the command-line one.
    pub fn with_overrides(mut self, env_relay_url: Option<String>, cli_relay_url: Option<String>) -> Self {
        if let Some(url) = env_relay_url.filter(|u| !u.trim().is_empty()) {
            self.relay_url = url;
        }
        if let Some(url) = cli_relay_url {
            self.relay_url = url;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let cfg = ClientConfig::load(&dir.path().join("config.json")).unwrap();
        assert_eq!(cfg, ClientConfig::default());
        assert_eq!(cfg.store.max_messages_per_conversation, 100);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, br#"{"store":{"max_messages_per_conversation":20}}"#).unwrap();
        let cfg = ClientConfig::load(&path).unwrap();
        assert_eq!(cfg.relay_url, DEFAULT_RELAY_URL);
        assert_eq!(cfg.store.max_messages_per_conversation, 20);
    }

    #[test]
    fn cli_beats_env_beats_file() {
        let cfg = ClientConfig::default();
        let env_only = cfg.clone().with_overrides(Some("ws://env/ws".into()), None);
        assert_eq!(env_only.relay_url, "ws://env/ws");
        let both = cfg.with_overrides(Some("ws://env/ws".into()), Some("ws://cli/ws".into()));
        assert_eq!(both.relay_url, "ws://cli/ws");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, b"[").unwrap();
        assert!(ClientConfig::load(&path).is_err());
    }
}
