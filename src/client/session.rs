use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::User;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("session file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no hay sesión activa; inicia sesión primero")]
    NotLoggedIn,
}

/// The signed-in user as remembered between dashboard runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub usuario: User,
    pub logged_in_at: DateTime<Utc>,
}

impl Session {
    pub fn new(usuario: User) -> Self {
        Self {
            usuario,
            logged_in_at: Utc::now(),
        }
    }
}

/// JSON file holding at most one session.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.helpdesk/session.json`, or `./.helpdesk/session.json` without a home directory.
    pub fn default_path() -> PathBuf {
        let home = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        home.join(".helpdesk").join("session.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Session>, SessionError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(self.io_error(source)),
        };
        let session = serde_json::from_str(&text).map_err(|source| SessionError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(session))
    }

    /// Loads the session or fails with `NotLoggedIn`.
    pub fn require(&self) -> Result<Session, SessionError> {
        self.load()?.ok_or(SessionError::NotLoggedIn)
    }

    pub fn save(&self, session: &Session) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        let json = serde_json::to_string_pretty(session).map_err(|source| SessionError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, json).map_err(|source| self.io_error(source))?;
        debug!("Saved session for {} to {}", session.usuario.email, self.path.display());
        Ok(())
    }

    /// Removes the session file. Returns whether one existed.
    pub fn clear(&self) -> Result<bool, SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn io_error(&self, source: io::Error) -> SessionError {
        SessionError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            nombre: "Ana".to_string(),
            email: "ana@municipio.gob.mx".to_string(),
            rol: "admin".to_string(),
        }
    }

    #[test]
    fn test_session_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join("session.json"));

        assert_eq!(store.load().unwrap(), None);
        assert!(matches!(store.require(), Err(SessionError::NotLoggedIn)));

        let session = Session::new(user());
        store.save(&session).unwrap();
        assert_eq!(store.load().unwrap(), Some(session.clone()));
        assert_eq!(store.require().unwrap().usuario, user());

        assert!(store.clear().unwrap());
        assert!(!store.clear().unwrap());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_corrupt_session_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            SessionStore::new(&path).load(),
            Err(SessionError::Corrupt { .. })
        ));
    }
}
