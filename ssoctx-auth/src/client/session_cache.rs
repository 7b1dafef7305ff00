use crate::common::Session;
use crate::error::AuthError;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const CACHE_FILE: &str = "access-token.json";

/// Single-file cache of the last authorization session on this host.
pub struct SessionCache {
    session_path: PathBuf,
}

impl SessionCache {
    pub fn new(session_path: impl Into<PathBuf>) -> Self {
        Self {
            session_path: session_path.into(),
        }
    }

    /// `~/.cache/ssoctx/access-token.json` or the platform equivalent
    pub fn default_path() -> Result<PathBuf, AuthError> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| AuthError::Configuration("Could not find cache directory".to_string()))?
            .join("ssoctx");
        Ok(cache_dir.join(CACHE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.session_path
    }

    /// Returns `Ok(None)` when no session has been cached yet. A file that
    /// exists but does not parse is an error, never a cache miss.
    pub fn load(&self) -> Result<Option<Session>, AuthError> {
        let json = match fs::read_to_string(&self.session_path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        let session: Session =
            serde_json::from_str(&json).map_err(|source| AuthError::CacheCorrupted {
                path: self.session_path.clone(),
                source,
            })?;
        Ok(Some(session))
    }

    /// Replaces the cached session. The document is written next to the
    /// cache file and renamed over it.
    pub fn save(&self, session: &Session) -> Result<(), AuthError> {
        if let Some(cache_dir) = self.session_path.parent() {
            fs::create_dir_all(cache_dir).map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_string_pretty(session)?;
        let staging_path = self.session_path.with_extension("json.tmp");
        let mut staging = open_staging(&staging_path).map_err(|e| self.io_error(e))?;
        staging
            .write_all(json.as_bytes())
            .and_then(|_| staging.sync_all())
            .map_err(|e| self.io_error(e))?;
        drop(staging);

        fs::rename(&staging_path, &self.session_path).map_err(|e| self.io_error(e))?;
        tracing::debug!(path = %self.session_path.display(), "Session saved");
        Ok(())
    }

    pub fn clear(&self) -> Result<(), AuthError> {
        match fs::remove_file(&self.session_path) {
            Ok(()) => {
                tracing::debug!(path = %self.session_path.display(), "Session removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn io_error(&self, source: std::io::Error) -> AuthError {
        AuthError::CacheIo {
            path: self.session_path.clone(),
            source,
        }
    }
}

/// Creates the staging file readable by the owner only (0600 on unix),
/// replacing any leftover from an interrupted save.
fn open_staging(path: &Path) -> std::io::Result<File> {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn sample_session() -> Session {
        Session {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            client_secret_expires_at: 1_900_000_000,
            device_code: "device".to_string(),
            verification_uri: "https://device.example/verify".to_string(),
            origin_url: "https://example.awsapps.com/start".to_string(),
            access_token: Some("token".to_string()),
            access_token_expires_at: Some(Utc::now() + Duration::hours(8)),
        }
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SessionCache::new(dir.path().join("access-token.json"));
        assert!(cache.load().unwrap().is_none());
    }

    #[test]
    fn save_creates_parent_dirs_and_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SessionCache::new(dir.path().join("nested/ssoctx/access-token.json"));
        let session = sample_session();

        cache.save(&session).unwrap();

        assert_eq!(cache.load().unwrap(), Some(session));
        assert!(!cache.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn save_overwrites_previous_session() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SessionCache::new(dir.path().join("access-token.json"));
        let mut session = sample_session();
        cache.save(&session).unwrap();

        session.origin_url = "https://other.awsapps.com/start".to_string();
        cache.save(&session).unwrap();

        let loaded = cache.load().unwrap().unwrap();
        assert_eq!(loaded.origin_url, "https://other.awsapps.com/start");
    }

    #[test]
    fn malformed_json_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access-token.json");
        fs::write(&path, "{not json").unwrap();

        let err = SessionCache::new(&path).load().unwrap_err();
        assert!(matches!(err, AuthError::CacheCorrupted { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let cache = SessionCache::new(dir.path().join("access-token.json"));
        cache.save(&sample_session()).unwrap();

        let mode = fs::metadata(cache.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn staging_file_is_created_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("access-token.json.tmp");
        fs::write(&staging, "leftover").unwrap();
        fs::set_permissions(&staging, fs::Permissions::from_mode(0o644)).unwrap();

        let file = open_staging(&staging).unwrap();

        let mode = file.metadata().unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(file.metadata().unwrap().len(), 0);
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SessionCache::new(dir.path().join("access-token.json"));
        cache.save(&sample_session()).unwrap();

        cache.clear().unwrap();
        cache.clear().unwrap();
        assert!(cache.load().unwrap().is_none());
    }
}
