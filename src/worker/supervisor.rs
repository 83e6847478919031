//! Worker supervisor: per-session subprocess lifecycle.
//!
//! The supervisor spawns one worker process per session, gates readiness on
//! the worker's Unix socket accepting a probe connection, monitors each
//! process from a dedicated task, and reclaims orphaned sockets and
//! processes left behind by a previous gateway instance.
//!
//! The `Child` handle is owned exclusively by the monitor task; `stop`
//! coordinates through a cancellation token and a reap signal instead of
//! waiting on the process directly, so a process is only ever reaped once.

use super::client::{AnalysisClient, HealthcheckClient, SessionControlClient, UnixRpcTransport};
use crate::config::{SupervisorConfig, WorkerStdio, READY_POLL_INTERVAL, SOCKET_PREFIX, SOCKET_SUFFIX};
use crate::session::Session;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UnixStream;
use tokio::process::{Child, Command};
use tokio::sync::{watch, RwLock};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Error type for supervisor operations.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("worker already running for session {0}")]
    AlreadyRunning(String),
    #[error("failed to start worker: {0}")]
    SpawnFailed(std::io::Error),
    #[error("worker socket not ready after {0:?}")]
    NotReady(Duration),
    #[error("no worker for session {0}")]
    NoWorker(String),
}

/// Live worker bound to a session. Published read-only; replacement means
/// removal and re-insertion under the supervisor's write lock.
///
/// Holds the session ID rather than the session itself so ownership flows
/// one way: the supervisor owns handles, the registry owns sessions.
pub struct WorkerHandle {
    pub session_id: String,
    pub pid: u32,
    pub socket_path: PathBuf,
    pub session_ctrl: SessionControlClient,
    pub analysis: AnalysisClient,
    pub health: HealthcheckClient,
    cancel: CancellationToken,
    reaped: watch::Receiver<bool>,
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("session_id", &self.session_id)
            .field("pid", &self.pid)
            .field("socket_path", &self.socket_path)
            .finish()
    }
}

type WorkerMap = Arc<RwLock<HashMap<String, Arc<WorkerHandle>>>>;

/// Supervisor for per-session worker subprocesses.
pub struct WorkerSupervisor {
    config: SupervisorConfig,
    workers: WorkerMap,
}

impl WorkerSupervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Self {
            config,
            workers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Spawn a worker for `session` and return its handle once the worker's
    /// socket accepts a probe connection.
    ///
    /// Run this on a task detached from the inbound request: workers must
    /// outlive the request that caused them to start.
    pub async fn start(
        &self,
        session: &Arc<Session>,
    ) -> Result<Arc<WorkerHandle>, SupervisorError> {
        if self.workers.read().await.contains_key(&session.id) {
            return Err(SupervisorError::AlreadyRunning(session.id.clone()));
        }

        // A stale socket from a crashed predecessor would satisfy the stat
        // half of the readiness probe.
        match std::fs::remove_file(&session.socket_path) {
            Ok(()) => debug!(socket = %session.socket_path.display(), "Removed stale socket"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(socket = %session.socket_path.display(), error = %e, "Failed to remove stale socket")
            }
        }

        let mut command = Command::new(&self.config.worker_program);
        command
            .args(&self.config.worker_args)
            .arg("--socket")
            .arg(&session.socket_path)
            .arg("--binary")
            .arg(&session.binary_path)
            .arg("--session-id")
            .arg(&session.id)
            .stdin(Stdio::null());
        match self.config.stdio {
            WorkerStdio::Inherit => {
                command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            }
            WorkerStdio::Discard => {
                command.stdout(Stdio::null()).stderr(Stdio::null());
            }
        }

        let mut child = command.spawn().map_err(SupervisorError::SpawnFailed)?;
        let pid = child.id().unwrap_or_default();
        session.set_worker_pid(pid);
        info!(session_id = %session.id, pid, "Started worker");

        if !self.wait_for_socket(&session.socket_path).await {
            warn!(
                session_id = %session.id,
                pid,
                socket = %session.socket_path.display(),
                "Worker socket not ready; killing"
            );
            kill_and_reap(&mut child).await;
            let _ = std::fs::remove_file(&session.socket_path);
            return Err(SupervisorError::NotReady(self.config.ready_timeout));
        }

        let transport = Arc::new(UnixRpcTransport::new(&session.socket_path));
        // The token scopes the subprocess itself and is deliberately not
        // derived from any request context.
        let cancel = CancellationToken::new();
        let (reaped_tx, reaped_rx) = watch::channel(false);

        let handle = Arc::new(WorkerHandle {
            session_id: session.id.clone(),
            pid,
            socket_path: session.socket_path.clone(),
            session_ctrl: SessionControlClient::new(transport.clone()),
            analysis: AnalysisClient::new(transport.clone()),
            health: HealthcheckClient::new(transport),
            cancel: cancel.clone(),
            reaped: reaped_rx,
        });

        {
            let mut workers = self.workers.write().await;
            if workers.contains_key(&session.id) {
                // Lost a concurrent start race; tear down our spawn.
                drop(workers);
                kill_and_reap(&mut child).await;
                return Err(SupervisorError::AlreadyRunning(session.id.clone()));
            }
            workers.insert(session.id.clone(), handle.clone());
        }

        tokio::spawn(monitor_worker(
            self.workers.clone(),
            session.clone(),
            child,
            cancel,
            reaped_tx,
        ));

        Ok(handle)
    }

    /// Stop the worker for `session_id`: graceful close RPC under the stop
    /// deadline, then cancel the subprocess scope (the monitor kills and
    /// reaps), returning after the process has been reaped. Safe to call
    /// when the process has already exited.
    pub async fn stop(&self, session_id: &str) -> Result<(), SupervisorError> {
        let handle = {
            let workers = self.workers.read().await;
            workers
                .get(session_id)
                .cloned()
                .ok_or_else(|| SupervisorError::NoWorker(session_id.to_string()))?
        };

        info!(session_id, pid = handle.pid, "Stopping worker");

        if let Ok(Err(e)) = tokio::time::timeout(
            self.config.stop_timeout,
            handle.session_ctrl.close_session(true),
        )
        .await
        {
            debug!(session_id, error = %e, "Graceful close failed; escalating");
        }

        handle.cancel.cancel();

        let mut reaped = handle.reaped.clone();
        // An Err here means the monitor dropped the sender, which also only
        // happens after the reap.
        let _ = reaped.wait_for(|done| *done).await;
        Ok(())
    }

    /// Return the live worker handle for a session.
    pub async fn get_client(&self, session_id: &str) -> Result<Arc<WorkerHandle>, SupervisorError> {
        self.workers
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| SupervisorError::NoWorker(session_id.to_string()))
    }

    /// Stop every worker. Used at shutdown.
    pub async fn shutdown_all(&self) {
        let ids: Vec<String> = self.workers.read().await.keys().cloned().collect();
        for id in ids {
            if let Err(e) = self.stop(&id).await {
                warn!(session_id = %id, error = %e, "Failed to stop worker during shutdown");
            }
        }
    }

    /// Remove stale `ida-worker-*.sock` files left under the socket
    /// directory by prior crashes. Must run before sessions are restored so
    /// fresh workers get fresh sockets.
    pub fn cleanup_orphan_sockets(&self) -> usize {
        let entries = match std::fs::read_dir(&self.config.socket_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.config.socket_dir.display(), error = %e, "Failed to scan for orphan sockets");
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.starts_with(SOCKET_PREFIX) || !name.ends_with(SOCKET_SUFFIX) {
                continue;
            }
            match std::fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => {
                    warn!(socket = %entry.path().display(), error = %e, "Failed to remove orphan socket")
                }
            }
        }
        if removed > 0 {
            info!(count = removed, "Cleaned up orphan sockets");
        }
        removed
    }

    /// SIGTERM worker processes surviving from a previous gateway instance.
    /// Identifies them by a command line containing the worker program and
    /// the `--socket` flag; never targets the gateway's own process.
    ///
    /// Reads the Linux process table; a no-op on other platforms.
    #[cfg(target_os = "linux")]
    pub fn cleanup_orphan_processes(&self) -> usize {
        let entries = match std::fs::read_dir("/proc") {
            Ok(entries) => entries,
            Err(_) => return 0,
        };

        let program = self.config.worker_program.to_string_lossy().into_owned();
        let own_pid = std::process::id();
        let mut killed = 0;

        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(pid) = name.to_str().and_then(|n| n.parse::<u32>().ok()) else {
                continue;
            };
            if pid == own_pid {
                continue;
            }
            let Ok(cmdline) = std::fs::read(entry.path().join("cmdline")) else {
                continue;
            };
            // Arguments are NUL-separated in /proc/<pid>/cmdline.
            let cmdline = String::from_utf8_lossy(&cmdline).replace('\0', " ");
            if !cmdline.contains(&program) && !cmdline.contains(SOCKET_PREFIX) {
                continue;
            }
            if !cmdline.contains("--socket") {
                continue;
            }

            info!(pid, "Killing orphan worker process");
            if unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) } == 0 {
                killed += 1;
            } else {
                // The process may have exited between the scan and the signal.
                debug!(pid, "Failed to SIGTERM orphan worker");
            }
        }
        if killed > 0 {
            info!(count = killed, "Killed orphan worker processes");
        }
        killed
    }

    /// Process enumeration is unavailable here; nothing to reclaim.
    #[cfg(not(target_os = "linux"))]
    pub fn cleanup_orphan_processes(&self) -> usize {
        0
    }

    /// Poll until the socket file exists and accepts a connection, or the
    /// readiness deadline passes.
    async fn wait_for_socket(&self, socket_path: &Path) -> bool {
        let deadline = Instant::now() + self.config.ready_timeout;
        while Instant::now() < deadline {
            if socket_path.exists() {
                if let Ok(stream) = UnixStream::connect(socket_path).await {
                    drop(stream);
                    return true;
                }
            }
            sleep(READY_POLL_INTERVAL).await;
        }
        false
    }
}

/// One monitor task per live worker. Owns the `Child`: it alone reaps the
/// process, then clears the session's PID, removes the handle from the
/// supervisor map, and publishes the reap signal `stop` blocks on.
async fn monitor_worker(
    workers: WorkerMap,
    session: Arc<Session>,
    mut child: Child,
    cancel: CancellationToken,
    reaped_tx: watch::Sender<bool>,
) {
    let exited = tokio::select! {
        status = child.wait() => Some(status),
        _ = cancel.cancelled() => None,
    };
    match exited {
        Some(Ok(status)) if cancel.is_cancelled() => {
            info!(session_id = %session.id, %status, "Worker exited");
        }
        Some(Ok(status)) => {
            warn!(session_id = %session.id, %status, "Worker exited unexpectedly");
        }
        Some(Err(e)) => {
            warn!(session_id = %session.id, error = %e, "Failed to wait for worker");
        }
        None => {
            if let Err(e) = child.start_kill() {
                debug!(session_id = %session.id, error = %e, "Kill failed; worker likely already gone");
            }
            match child.wait().await {
                Ok(status) => info!(session_id = %session.id, %status, "Worker reaped after kill"),
                Err(e) => warn!(session_id = %session.id, error = %e, "Failed to reap worker"),
            }
        }
    }

    session.set_worker_pid(0);
    workers.write().await.remove(&session.id);
    let _ = reaped_tx.send(true);
}

async fn kill_and_reap(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        warn!(error = %e, "Failed to kill worker");
    }
    if let Err(e) = child.wait().await {
        warn!(error = %e, "Failed to reap worker");
    }
}
