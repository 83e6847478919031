//! Session registry: the authoritative directory of active sessions.
//!
//! The backing map lives behind a single readers-writer lock. Mutating
//! operations (`create`/`remove`) rewrite the persisted registry file while
//! still holding the write guard, so observers never see in-memory state
//! ahead of disk.

use super::types::{Session, SessionRecord};
use crate::config::socket_path_for;
use chrono::Utc;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Error type for registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("binary not found: {0}")]
    BinaryNotFound(PathBuf),
    #[error("not a file: {0}")]
    NotAFile(PathBuf),
    #[error("failed to persist session registry: {0}")]
    Persist(#[from] std::io::Error),
}

/// Concurrent directory of sessions with JSON-lines persistence.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    state_path: PathBuf,
    socket_dir: PathBuf,
}

impl SessionRegistry {
    pub fn new(state_path: impl Into<PathBuf>, socket_dir: impl Into<PathBuf>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            state_path: state_path.into(),
            socket_dir: socket_dir.into(),
        }
    }

    /// Allocate a new session for `binary_path` and persist it before
    /// returning, so a crash after `create` cannot lose the record.
    pub async fn create(&self, binary_path: &Path) -> Result<Arc<Session>, RegistryError> {
        if !binary_path.exists() {
            return Err(RegistryError::BinaryNotFound(binary_path.to_path_buf()));
        }
        if !binary_path.is_file() {
            return Err(RegistryError::NotAFile(binary_path.to_path_buf()));
        }

        let id = Uuid::new_v4().to_string();
        let session = Arc::new(Session::new(
            id.clone(),
            binary_path.to_path_buf(),
            socket_path_for(&self.socket_dir, &id),
            Utc::now(),
        ));

        let mut sessions = self.sessions.write().await;
        sessions.insert(id.clone(), session.clone());
        self.persist_locked(&sessions)?;

        info!(session_id = %id, binary_path = %binary_path.display(), "Created session");
        Ok(session)
    }

    /// O(1) lookup. Does not bump `last_touched`; callers touch explicitly
    /// so read-only audits can inspect without deferring expiry.
    pub async fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Remove a session from the directory and the persisted file.
    /// Removing an unknown ID is a no-op (sweeper and explicit close may
    /// race).
    pub async fn remove(&self, id: &str) {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(id).is_some() {
            if let Err(e) = self.persist_locked(&sessions) {
                warn!(session_id = %id, error = %e, "Failed to persist registry after remove");
            }
            info!(session_id = %id, "Removed session");
        }
    }

    /// Snapshot of all sessions, in no particular order.
    pub async fn list(&self) -> Vec<Arc<Session>> {
        self.sessions.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Collect every session idle for at least `max_idle`. Teardown is left
    /// to the caller; doing supervisor work here would order the registry
    /// lock under the supervisor's.
    pub async fn sweep(&self, max_idle: Duration) -> Vec<Arc<Session>> {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.idle_for() >= max_idle)
            .cloned()
            .collect()
    }

    /// Rebuild the directory from the persisted file. Corrupt lines are
    /// skipped with a warning; records whose binary no longer exists are
    /// discarded. Never fails startup: an unreadable file yields an empty
    /// registry.
    pub async fn restore_from_disk(&self) -> Vec<Arc<Session>> {
        let content = match std::fs::read_to_string(&self.state_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.state_path.display(), error = %e, "Failed to read session registry");
                return Vec::new();
            }
        };

        let mut restored = Vec::new();
        let mut sessions = self.sessions.write().await;
        for (lineno, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: SessionRecord = match serde_json::from_str(line) {
                Ok(record) => record,
                Err(e) => {
                    warn!(line = lineno + 1, error = %e, "Skipping corrupt registry line");
                    continue;
                }
            };
            if !record.binary_exists() {
                info!(
                    session_id = %record.id,
                    binary_path = %record.binary_path.display(),
                    "Discarding session: binary no longer exists"
                );
                continue;
            }
            let session = Arc::new(Session::from_record(record));
            debug!(session_id = %session.id, "Restored session");
            sessions.insert(session.id.clone(), session.clone());
            restored.push(session);
        }

        // Drop discarded records from disk as well.
        if let Err(e) = self.persist_locked(&sessions) {
            warn!(error = %e, "Failed to rewrite registry after restore");
        }

        info!(count = restored.len(), "Restored sessions from disk");
        restored
    }

    /// Rewrite the registry file from the given map snapshot. Called with
    /// the write guard held; writes to a temp file then renames so readers
    /// of the file never observe a partial snapshot.
    fn persist_locked(
        &self,
        sessions: &HashMap<String, Arc<Session>>,
    ) -> Result<(), std::io::Error> {
        if let Some(parent) = self.state_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = self.state_path.with_extension("jsonl.tmp");
        let mut file = std::fs::File::create(&tmp_path)?;
        for session in sessions.values() {
            let line = serde_json::to_string(&session.record())
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            writeln!(file, "{line}")?;
        }
        file.flush()?;
        std::fs::rename(&tmp_path, &self.state_path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry_in(dir: &TempDir) -> SessionRegistry {
        SessionRegistry::new(dir.path().join("sessions.jsonl"), dir.path())
    }

    #[tokio::test]
    async fn create_then_get_returns_same_record() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);

        let session = registry.create(Path::new("/bin/ls")).await.unwrap();
        let found = registry.get(&session.id).await.unwrap();
        assert_eq!(found.record(), session.record());
        assert!(found
            .socket_path
            .to_string_lossy()
            .contains(&format!("ida-worker-{}", session.id)));
    }

    #[tokio::test]
    async fn create_rejects_missing_binary() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);

        let err = registry
            .create(Path::new("/no/such/binary"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::BinaryNotFound(_)));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);

        let session = registry.create(Path::new("/bin/ls")).await.unwrap();
        registry.remove(&session.id).await;
        registry.remove(&session.id).await;
        assert!(registry.get(&session.id).await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn restore_recovers_persisted_sessions() {
        let dir = TempDir::new().unwrap();
        let state_path = dir.path().join("sessions.jsonl");

        let (id, created_at) = {
            let registry = SessionRegistry::new(&state_path, dir.path());
            let session = registry.create(Path::new("/bin/ls")).await.unwrap();
            (session.id.clone(), session.created_at)
        };

        // Fresh registry over the same file simulates a restart.
        let registry = SessionRegistry::new(&state_path, dir.path());
        let restored = registry.restore_from_disk().await;
        assert_eq!(restored.len(), 1);

        let session = registry.get(&id).await.unwrap();
        assert_eq!(session.id, id);
        assert_eq!(session.binary_path, PathBuf::from("/bin/ls"));
        assert_eq!(session.created_at, created_at);
    }

    #[tokio::test]
    async fn restore_skips_corrupt_lines_and_missing_binaries() {
        let dir = TempDir::new().unwrap();
        let state_path = dir.path().join("sessions.jsonl");

        let good = SessionRecord {
            id: "good".into(),
            binary_path: PathBuf::from("/bin/ls"),
            socket_path: PathBuf::from("/tmp/ida-worker-good.sock"),
            worker_pid: 0,
            created_at: Utc::now(),
        };
        let gone = SessionRecord {
            id: "gone".into(),
            binary_path: PathBuf::from("/no/such/binary"),
            socket_path: PathBuf::from("/tmp/ida-worker-gone.sock"),
            worker_pid: 0,
            created_at: Utc::now(),
        };
        let content = format!(
            "{}\nnot json at all{{\n{}\n",
            serde_json::to_string(&good).unwrap(),
            serde_json::to_string(&gone).unwrap(),
        );
        std::fs::write(&state_path, content).unwrap();

        let registry = SessionRegistry::new(&state_path, dir.path());
        let restored = registry.restore_from_disk().await;
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].id, "good");
        assert!(registry.get("gone").await.is_none());
    }

    #[tokio::test]
    async fn sweep_returns_only_idle_sessions() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);

        let idle = registry.create(Path::new("/bin/ls")).await.unwrap();
        let fresh = registry.create(Path::new("/bin/ls")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        fresh.touch();

        let expired = registry.sweep(Duration::from_millis(25)).await;
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, idle.id);
    }
}
