//! Self profile slot: the local identity, persisted as one JSON document.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use zeroize::{Zeroize, ZeroizeOnDrop};

use rc_crypto::{keys::is_valid_public_key, KeyPair};

use crate::error::StoreError;

/// Name given to a freshly generated identity until the user picks one.
pub const DEFAULT_DISPLAY_NAME: &str = "John Doe";

/// The local user's identity. `id` and `public_key` hold the same hex key:
/// the public key is the identity on the relay.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Profile {
    #[zeroize(skip)]
    pub id: String,
    #[zeroize(skip)]
    pub name: String,
    #[zeroize(skip)]
    pub public_key: String,
    pub private_key: String,
}

impl Profile {
    pub fn from_keypair(keys: &KeyPair, name: impl Into<String>) -> Self {
        Self {
            id: keys.public_key.clone(),
            name: name.into(),
            public_key: keys.public_key.clone(),
            private_key: keys.private_key.clone(),
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    fn validate(&self) -> Result<(), StoreError> {
        if !is_valid_public_key(&self.public_key) {
            return Err(StoreError::InvalidProfile("public_key is not a 32-byte hex key".into()));
        }
        if self.id != self.public_key {
            return Err(StoreError::InvalidProfile("id must equal public_key".into()));
        }
        if self.private_key.trim().is_empty() {
            return Err(StoreError::InvalidProfile("private_key is empty".into()));
        }
        let derived = KeyPair::from_private_key(&self.private_key)
            .map_err(|e| StoreError::InvalidProfile(format!("private_key: {e}")))?;
        if !derived.public_key.eq_ignore_ascii_case(&self.public_key) {
            return Err(StoreError::InvalidProfile("private_key does not match public_key".into()));
        }
        Ok(())
    }
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profile")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Durable single-slot storage for [`Profile`].
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when no profile has been saved yet.
    pub fn load(&self) -> Result<Option<Profile>, StoreError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let profile: Profile = serde_json::from_slice(&raw)?;
        profile.validate()?;
        Ok(Some(profile))
    }

    /// Replace the slot. A crash mid-write leaves the previous profile intact.
    pub fn save(&self, profile: &Profile) -> Result<(), StoreError> {
        profile.validate()?;
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut json = serde_json::to_vec_pretty(profile)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        let written = tmp.write_all(&json).and_then(|_| tmp.as_file().sync_all());
        json.zeroize();
        written?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        tracing::info!(
            target: "rc_store",
            event = "profile_saved",
            path = %self.path.display(),
            public_key = %profile.public_key
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_missing_is_none() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("profile.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("nested").join("profile.json"));
        let keys = KeyPair::generate();
        let mut profile = Profile::from_keypair(&keys, DEFAULT_DISPLAY_NAME);
        profile.set_name("Alice");
        store.save(&profile).unwrap();

        let loaded = store.load().unwrap().expect("profile present");
        assert_eq!(loaded, profile);
        assert_eq!(loaded.id, keys.public_key);
        assert_eq!(loaded.name, "Alice");
    }

    #[test]
    fn save_replaces_previous() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("profile.json"));
        let mut profile = Profile::from_keypair(&KeyPair::generate(), "one");
        store.save(&profile).unwrap();
        profile.set_name("two");
        store.save(&profile).unwrap();
        assert_eq!(store.load().unwrap().unwrap().name, "two");
    }

    #[test]
    fn file_uses_flat_json_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("profile.json");
        let profile = Profile::from_keypair(&KeyPair::generate(), "Bob");
        ProfileStore::new(&path).save(&profile).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        for field in ["id", "name", "public_key", "private_key"] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("profile.json");
        std::fs::write(&path, b"{not json").unwrap();
        assert!(matches!(ProfileStore::new(&path).load(), Err(StoreError::Serialisation(_))));
    }

    #[test]
    fn invalid_key_is_rejected() {
        let dir = tempdir().unwrap();
        let mut profile = Profile::from_keypair(&KeyPair::generate(), "x");
        profile.public_key = "zz".into();
        let err = ProfileStore::new(dir.path().join("p.json")).save(&profile);
        assert!(matches!(err, Err(StoreError::InvalidProfile(_))));
    }

    #[test]
    fn mismatched_private_key_is_rejected_on_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("profile.json");
        let mut profile = Profile::from_keypair(&KeyPair::generate(), "x");
        profile.private_key = KeyPair::generate().private_key.clone();

        let store = ProfileStore::new(&path);
        assert!(matches!(store.save(&profile), Err(StoreError::InvalidProfile(_))));
        assert!(!path.exists());

        std::fs::write(&path, serde_json::to_vec(&profile).unwrap()).unwrap();
        assert!(matches!(store.load(), Err(StoreError::InvalidProfile(_))));
    }

    #[test]
    fn debug_hides_private_key() {
        let keys = KeyPair::generate();
        let profile = Profile::from_keypair(&keys, "x");
        assert!(!format!("{profile:?}").contains(&keys.private_key));
    }
}
