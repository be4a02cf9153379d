//! File-backed session persistence.
//!
//! The session (tokens plus user) is stored as JSON in the user's config
//! directory. Tokens are secrets; on Unix the file is chmod 0600.

use std::fs;
use std::path::PathBuf;

use sprig_core::auth::{AuthError, AuthResult, AuthSession, SessionPersistence};

use crate::error::CliError;

const SESSION_FILE: &str = "session.json";

pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store under the platform config directory (`~/.config/sprig` on
    /// Linux).
    pub fn default_location() -> Result<Self, CliError> {
        let base = dirs::config_dir().ok_or_else(|| {
            CliError::Config("could not determine a config directory".to_string())
        })?;
        Ok(Self::new(base.join("sprig").join(SESSION_FILE)))
    }
}

impl SessionPersistence for FileSessionStore {
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(AuthError::Storage(error.to_string())),
        };
        let session = serde_json::from_str(&raw)
            .map_err(|error| AuthError::Storage(format!("corrupt session file: {error}")))?;
        Ok(Some(session))
    }

    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|error| AuthError::Storage(error.to_string()))?;
        }
        let raw = serde_json::to_string(session)
            .map_err(|error| AuthError::Storage(error.to_string()))?;
        fs::write(&self.path, raw).map_err(|error| AuthError::Storage(error.to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))
                .map_err(|error| AuthError::Storage(error.to_string()))?;
        }

        Ok(())
    }

    fn clear_session(&self) -> AuthResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(AuthError::Storage(error.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use sprig_core::auth::AuthUser;
    use tempfile::tempdir;

    use super::*;

    fn session() -> AuthSession {
        AuthSession {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: i64::MAX,
            user: AuthUser {
                id: "user-1".to_string(),
                email: Some("a@example.com".to_string()),
            },
        }
    }

    #[test]
    fn test_round_trip() {
        let tmp = tempdir().unwrap();
        let store = FileSessionStore::new(tmp.path().join("nested").join("session.json"));

        assert!(store.load_session().unwrap().is_none());
        store.save_session(&session()).unwrap();
        let loaded = store.load_session().unwrap().unwrap();
        assert_eq!(loaded.user.id, "user-1");
    }

    #[test]
    fn test_clear_is_idempotent() {
        let tmp = tempdir().unwrap();
        let store = FileSessionStore::new(tmp.path().join("session.json"));

        store.clear_session().unwrap();
        store.save_session(&session()).unwrap();
        store.clear_session().unwrap();
        assert!(store.load_session().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileSessionStore::new(path);
        assert!(store.load_session().is_err());
    }
}
