use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::types::Session;

/// Consumer-provided token persistence.
///
/// The store is the single source of truth for the bearer token: the
/// session manager writes through it before every state transition, and
/// the API client reads from it on every outgoing request. A session the
/// store never accepted is a session the client never uses.
///
/// # Example
///
/// ```rust,ignore
/// struct KeychainStore {
///     keychain: Keychain,
/// }
///
/// impl TokenStore for KeychainStore {
///     fn load(&self) -> Result<Option<Session>, Box<dyn std::error::Error + Send + Sync>> {
///         let raw = self.keychain.get("portal-session")?;
///         Ok(raw.map(|r| serde_json::from_str(&r)).transpose()?)
///     }
///     // save / clear likewise
/// }
/// ```
pub trait TokenStore: Send + Sync + 'static {
    /// Read the persisted session, if any.
    fn load(&self) -> Result<Option<Session>, Box<dyn std::error::Error + Send + Sync>>;

    /// Persist a session, replacing any previous one.
    fn save(&self, session: &Session)
        -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Remove the persisted session.
    fn clear(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// The serialized record written by [`FileTokenStore`].
///
/// The session nests under a `currentSession` key, so files written by
/// other portal clients sharing the shape interoperate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub current_session: Session,
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: RwLock<Option<Session>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<Session>, Box<dyn std::error::Error + Send + Sync>> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.clone())
    }

    fn save(
        &self,
        session: &Session,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = None;
        Ok(())
    }
}

/// File-backed store holding one JSON [`PersistedSession`] record.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<Session>, Box<dyn std::error::Error + Send + Sync>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<PersistedSession>(&raw) {
            Ok(record) => Ok(Some(record.current_session)),
            Err(e) => {
                // A record we cannot parse is as good as no record. Drop it
                // so the next save starts clean.
                tracing::warn!(
                    error = %e,
                    path = %self.path.display(),
                    "discarding unreadable session record"
                );
                let _ = fs::remove_file(&self.path);
                Ok(None)
            }
        }
    }

    fn save(
        &self,
        session: &Session,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let record = PersistedSession {
            current_session: session.clone(),
        };
        fs::write(&self.path, serde_json::to_vec(&record)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
