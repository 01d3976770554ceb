//! Durable client storage for the session and the one-shot startup hydration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::AppError;
use super::principal::Principal;
use super::session::{RestoredSession, SessionStore};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("session file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session file {} is not a valid session record: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("encode session record: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        let code = match &err {
            StorageError::Io { .. } => "session_io",
            StorageError::Corrupt { .. } => "session_corrupt",
            StorageError::Encode(_) => "session_encode",
        };
        AppError::Storage { code: code.into(), message: err.to_string() }
    }
}

/// What survives a restart: the credential, the canonical role computed at login
/// and the backend's user record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedSession {
    pub token: String,
    pub role: String,
    #[serde(default)]
    pub user: Value,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

impl PersistedSession {
    pub fn new(token: impl Into<String>, role: impl Into<String>, user: Value) -> Self {
        Self { token: token.into(), role: role.into(), user, saved_at: Some(Utc::now()) }
    }

    /// A record without a token restores nothing.
    pub fn into_restored(self) -> Option<RestoredSession> {
        if self.token.trim().is_empty() {
            return None;
        }
        let principal = Principal::from_user_record(&self.user, self.role);
        Some(RestoredSession { token: self.token, principal })
    }
}

pub trait SessionStorage: Send + Sync {
    fn load(&self) -> Result<Option<PersistedSession>, StorageError>;
    fn save(&self, session: &PersistedSession) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

/// JSON file on local disk.
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

    pub fn path(&self) -> &Path { &self.path }

    fn io_err(&self, source: std::io::Error) -> StorageError {
        StorageError::Io { path: self.path.clone(), source }
    }
}

impl SessionStorage for FileSessionStorage {
    fn load(&self) -> Result<Option<PersistedSession>, StorageError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_err(e)),
        };
        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| StorageError::Corrupt { path: self.path.clone(), source })
    }

    fn save(&self, session: &PersistedSession) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| self.io_err(e))?;
        }
        let body = serde_json::to_vec_pretty(session)?;
        // write-then-rename so a crash never leaves a half-written record
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, body).map_err(|e| self.io_err(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))
    }

    fn clear(&self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_err(e)),
        }
    }
}

/// In-process storage, for tests and ephemeral runs.
#[derive(Default)]
pub struct MemorySessionStorage {
    slot: Mutex<Option<PersistedSession>>,
}

impl MemorySessionStorage {
    pub fn with(session: PersistedSession) -> Self {
        Self { slot: Mutex::new(Some(session)) }
    }

    pub fn current(&self) -> Option<PersistedSession> { self.slot.lock().clone() }
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self) -> Result<Option<PersistedSession>, StorageError> { Ok(self.slot.lock().clone()) }

    fn save(&self, session: &PersistedSession) -> Result<(), StorageError> {
        *self.slot.lock() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.slot.lock() = None;
        Ok(())
    }
}

/// Read storage and commit the result to the store. Unreadable or corrupt records
/// hydrate as anonymous; hydration itself never fails.
pub fn hydrate_from(store: &SessionStore, storage: &dyn SessionStorage) -> bool {
    store.hydrate(restore(storage.load()))
}

/// Run hydration as a background task; blocking reads stay off the executor.
pub fn spawn_hydration(
    store: Arc<SessionStore>,
    storage: Arc<dyn SessionStorage>,
) -> tokio::task::JoinHandle<bool> {
    tokio::spawn(async move {
        let reader = storage.clone();
        let restored = match tokio::task::spawn_blocking(move || reader.load()).await {
            Ok(loaded) => restore(loaded),
            Err(e) => {
                warn!(target: "coursegate::session", error = %e, "session read task failed; hydrating anonymous");
                None
            }
        };
        store.hydrate(restored)
    })
}

fn restore(loaded: Result<Option<PersistedSession>, StorageError>) -> Option<RestoredSession> {
    match loaded {
        Ok(Some(p)) => {
            let r = p.into_restored();
            info!(target: "coursegate::session", restored = r.is_some(), "session record loaded");
            r
        }
        Ok(None) => None,
        Err(e) => {
            warn!(target: "coursegate::session", error = %e, "discarding unreadable session record");
            None
        }
    }
}
