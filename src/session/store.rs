//! Process-wide holder of the cached user profile.
//!
//! Optionally writes through to a JSON file so the profile survives
//! restarts. The file is a display cache, not a security boundary: cache I/O
//! failures are logged and never fail `set` or `clear`.
//!
//! Cache writes are plain `std::fs` calls made inline on the calling task.
//! The profile is a few hundred bytes, and writing inline keeps `set` and
//! `clear` synchronous and applied in call order, which the coordinator's
//! teardown relies on. Do not point the cache at slow or network storage.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::models::Session;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// On-disk copy of the cached profile
#[derive(Debug, Clone)]
pub struct ProfileCache {
    path: PathBuf,
}

impl ProfileCache {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Session>, CacheError> {
        match std::fs::read(&self.path) {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write via a temp file + rename so readers never see a partial profile
    pub fn save(&self, session: &Session) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let data = serde_json::to_vec_pretty(session)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn remove(&self) -> Result<(), CacheError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Single owner of the current [`Session`].
///
/// Mutations are synchronous; subscribers are notified through a watch
/// channel.
#[derive(Debug)]
pub struct SessionStore {
    cache: Option<ProfileCache>,
    current: watch::Sender<Option<Session>>,
}

impl SessionStore {
    pub fn in_memory() -> Self {
        Self {
            cache: None,
            current: watch::Sender::new(None),
        }
    }

    /// Open a store backed by `cache`, loading any profile it holds.
    pub fn open(cache: ProfileCache) -> Self {
        let initial = match cache.load() {
            Ok(session) => session,
            Err(e) => {
                warn!(path = %cache.path().display(), error = %e, "Discarding unreadable profile cache");
                if let Err(e) = cache.remove() {
                    warn!(error = %e, "Failed to remove unreadable profile cache");
                }
                None
            }
        };

        debug!(
            path = %cache.path().display(),
            cached = initial.is_some(),
            "Opened session store"
        );

        Self {
            cache: Some(cache),
            current: watch::Sender::new(initial),
        }
    }

    pub fn set(&self, session: Session) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.save(&session) {
                warn!(error = %e, "Failed to persist profile cache");
            }
        }
        debug!(user_id = %session.user_id, "Session stored");
        self.current.send_replace(Some(session));
    }

    pub fn get(&self) -> Option<Session> {
        self.current.borrow().clone()
    }

    /// Drop the session. A no-op when already empty.
    pub fn clear(&self) {
        let cleared = self.current.send_if_modified(|current| current.take().is_some());
        if !cleared {
            return;
        }

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.remove() {
                warn!(error = %e, "Failed to remove profile cache");
            }
        }
        debug!("Session cleared");
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.current.subscribe()
    }
}
