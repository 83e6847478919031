//! Session types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A one-to-one binding between an opened binary and an analysis worker.
///
/// The identity fields (`id`, `binary_path`, `socket_path`, `created_at`)
/// are immutable after creation. `worker_pid` and `last_touched` are
/// mutable behind interior locks so sessions can be shared as `Arc<Session>`
/// across dispatcher tasks, the sweeper, and the supervisor.
pub struct Session {
    /// Unique session identifier.
    pub id: String,
    /// Absolute path of the binary being analyzed.
    pub binary_path: PathBuf,
    /// Path of the worker's listening Unix socket, derived from the ID.
    pub socket_path: PathBuf,
    /// PID of the bound worker process; zero when no worker is bound.
    worker_pid: AtomicU32,
    /// Liveness timestamp bumped on every dispatched tool call.
    last_touched: Mutex<Instant>,
    /// Set when the session was rebuilt from disk and has not yet had a
    /// worker spawned for it. Consumed once: restored sessions get a worker
    /// on their first tool call, but a worker that later dies is not
    /// transparently respawned.
    restore_pending: AtomicBool,
    /// Wall-clock creation time, persisted.
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(
        id: String,
        binary_path: PathBuf,
        socket_path: PathBuf,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            binary_path,
            socket_path,
            worker_pid: AtomicU32::new(0),
            last_touched: Mutex::new(Instant::now()),
            restore_pending: AtomicBool::new(false),
            created_at,
        }
    }

    /// Update the liveness timestamp to defer idle expiry.
    pub fn touch(&self) {
        let mut touched = self.last_touched.lock().unwrap_or_else(|e| e.into_inner());
        *touched = Instant::now();
    }

    /// Time elapsed since the last touch.
    pub fn idle_for(&self) -> Duration {
        let touched = self.last_touched.lock().unwrap_or_else(|e| e.into_inner());
        touched.elapsed()
    }

    pub fn worker_pid(&self) -> u32 {
        self.worker_pid.load(Ordering::Acquire)
    }

    pub fn set_worker_pid(&self, pid: u32) {
        self.worker_pid.store(pid, Ordering::Release);
    }

    /// Snapshot the persistable fields.
    pub fn record(&self) -> SessionRecord {
        SessionRecord {
            id: self.id.clone(),
            binary_path: self.binary_path.clone(),
            socket_path: self.socket_path.clone(),
            worker_pid: self.worker_pid(),
            created_at: self.created_at,
        }
    }

    /// Rebuild a session from its persisted record. The idle clock restarts
    /// at restore time so recovered sessions are not immediately swept.
    pub fn from_record(record: SessionRecord) -> Self {
        let session = Self::new(
            record.id,
            record.binary_path,
            record.socket_path,
            record.created_at,
        );
        session.set_worker_pid(record.worker_pid);
        session.restore_pending.store(true, Ordering::Release);
        session
    }

    /// Consume the restore marker. Returns true exactly once for a session
    /// rebuilt from disk, entitling the caller to spawn its worker lazily.
    pub fn take_restore_pending(&self) -> bool {
        self.restore_pending.swap(false, Ordering::AcqRel)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("binary_path", &self.binary_path)
            .field("socket_path", &self.socket_path)
            .field("worker_pid", &self.worker_pid())
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Persisted form of a session, one JSON object per registry-file line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub binary_path: PathBuf,
    pub socket_path: PathBuf,
    pub worker_pid: u32,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Whether the analyzed binary still exists on disk.
    pub fn binary_exists(&self) -> bool {
        Path::new(&self.binary_path).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_round_trips_through_json() {
        let session = Session::new(
            "s1".into(),
            PathBuf::from("/bin/ls"),
            PathBuf::from("/tmp/ida-worker-s1.sock"),
            Utc::now(),
        );
        session.set_worker_pid(4242);

        let line = serde_json::to_string(&session.record()).unwrap();
        let parsed: SessionRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, session.record());
        assert_eq!(parsed.worker_pid, 4242);
    }

    #[test]
    fn touch_resets_idle_clock() {
        let session = Session::new(
            "s1".into(),
            PathBuf::from("/bin/ls"),
            PathBuf::from("/tmp/ida-worker-s1.sock"),
            Utc::now(),
        );
        std::thread::sleep(Duration::from_millis(20));
        assert!(session.idle_for() >= Duration::from_millis(20));
        session.touch();
        assert!(session.idle_for() < Duration::from_millis(20));
    }
}
