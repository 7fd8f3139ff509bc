//! On-disk cache of the signed-in user, backed by `~/.vikki/session.toml`.

use std::path::{Path, PathBuf};

use proto::UserProfile;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// Token and profile restored on the next start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedSession {
    pub token: String,
    pub user: UserProfile,
}

/// TOML file holding at most one [`CachedSession`]
#[derive(Debug, Clone)]
pub struct ProfileCache {
    path: PathBuf,
}

impl ProfileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.vikki/session.toml`
    pub fn default_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".vikki").join("session.toml")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `None` when the file is missing or unreadable.
    pub fn load(&self) -> Option<CachedSession> {
        trace!(path = %self.path.display(), exists = %self.path.exists(), "Loading cached session");
        let raw = std::fs::read_to_string(&self.path).ok()?;
        match toml::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring corrupt session cache");
                None
            }
        }
    }

    /// Writes the session, creating parent directories as needed.
    pub fn save(&self, session: &CachedSession) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string(session).map_err(std::io::Error::other)?;
        std::fs::write(&self.path, content)?;
        debug!(path = %self.path.display(), user_id = %session.user.id, "Session cached");
        Ok(())
    }

    /// Deletes the cache file. Missing files are not an error.
    pub fn clear(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Session cache cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
