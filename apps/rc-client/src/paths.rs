use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub const APP_QUALIFIER: &str = "net";
pub const APP_ORG: &str = "relaychat";
pub const APP_NAME: &str = "relaychat";

pub fn default_data_dir() -> anyhow::Result<PathBuf> {
    let dirs = ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .ok_or_else(|| anyhow::anyhow!("cannot determine data directory"))?;
    Ok(dirs.data_dir().to_path_buf())
}

/// Files the client keeps under one data directory.
#[derive(Debug, Clone)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    /// Use `override_dir` when given, the platform data directory otherwise.
    pub fn resolve(override_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let root = match override_dir {
            Some(dir) => dir,
            None => default_data_dir()?,
        };
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn database(&self) -> PathBuf {
        self.root.join("messages.db")
    }

    pub fn profile(&self) -> PathBuf {
        self.root.join("profile.json")
    }

    pub fn config(&self) -> PathBuf {
        self.root.join("config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_dir_is_used_for_every_file() {
        let paths = DataPaths::resolve(Some(PathBuf::from("/tmp/rc"))).unwrap();
        assert_eq!(paths.database(), PathBuf::from("/tmp/rc/messages.db"));
        assert_eq!(paths.profile(), PathBuf::from("/tmp/rc/profile.json"));
        assert_eq!(paths.config(), PathBuf::from("/tmp/rc/config.json"));
    }
}
