use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::AuthError;

const LOCK_FILE: &str = "ssoctx.lock";

/// Locks older than this are treated as left behind by a crashed run.
pub const LOCK_FRESHNESS: TimeDelta = TimeDelta::minutes(1);

#[derive(Debug, Serialize, Deserialize)]
struct LockFile {
    #[serde(rename = "Time")]
    time: DateTime<Utc>,
}

/// Advisory, time-boxed lock that keeps concurrent invocations from starting
/// a second device authorization. Callers check [`ProcessLock::is_locked`]
/// before acquiring.
pub struct ProcessLock {
    lock_path: PathBuf,
    freshness: TimeDelta,
}

impl ProcessLock {
    pub fn new(lock_path: impl Into<PathBuf>) -> Self {
        Self {
            lock_path: lock_path.into(),
            freshness: LOCK_FRESHNESS,
        }
    }

    pub fn with_freshness(mut self, freshness: TimeDelta) -> Self {
        self.freshness = freshness;
        self
    }

    pub fn default_path() -> PathBuf {
        std::env::temp_dir().join(LOCK_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.lock_path
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> Result<bool, AuthError> {
        let json = match fs::read_to_string(&self.lock_path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(self.io_error(e)),
        };

        let lock: LockFile = serde_json::from_str(&json).map_err(|source| {
            AuthError::LockCorrupted {
                path: self.lock_path.clone(),
                source,
            }
        })?;

        let locked = now < lock.time + self.freshness;
        if !locked {
            tracing::debug!(acquired_at = %lock.time, "Ignoring stale lock file");
        }
        Ok(locked)
    }

    pub fn acquire(&self, now: DateTime<Utc>) -> Result<LockGuard<'_>, AuthError> {
        let json = serde_json::to_string(&LockFile { time: now })?;
        fs::write(&self.lock_path, json).map_err(|e| self.io_error(e))?;
        tracing::debug!(path = %self.lock_path.display(), "Lock acquired");

        Ok(LockGuard {
            lock: self,
            released: false,
        })
    }

    /// Removes the lock file regardless of its age.
    pub fn clear(&self) -> Result<(), AuthError> {
        self.remove()
    }

    fn remove(&self) -> Result<(), AuthError> {
        match fs::remove_file(&self.lock_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn io_error(&self, source: std::io::Error) -> AuthError {
        AuthError::LockIo {
            path: self.lock_path.clone(),
            source,
        }
    }
}

/// Held for the duration of a handshake.
///
/// Call [`LockGuard::release`] to surface removal failures. A guard dropped
/// without release (unwinding) still removes the file, logging any failure.
pub struct LockGuard<'a> {
    lock: &'a ProcessLock,
    released: bool,
}

impl LockGuard<'_> {
    pub fn release(mut self) -> Result<(), AuthError> {
        self.released = true;
        self.lock.remove()?;
        tracing::debug!(path = %self.lock.lock_path.display(), "Lock released");
        Ok(())
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.lock.remove() {
            tracing::warn!("Failed to remove lock file: {}", e);
        }
    }
}
