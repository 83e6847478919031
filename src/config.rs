//! Gateway configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default readiness deadline for a freshly spawned worker socket.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);
/// Interval between readiness probes.
pub const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Deadline for the graceful close RPC before escalating to SIGKILL.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);
/// Default idle threshold before a session is swept.
pub const DEFAULT_MAX_IDLE: Duration = Duration::from_secs(30 * 60);
/// Default sweeper cadence.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Where worker stdout/stderr go. Explicit configuration, supplied at
/// supervisor construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStdio {
    /// Inherit the gateway's stdio (production).
    Inherit,
    /// Discard all worker output (tests, quiet deployments).
    Discard,
}

/// Configuration for the worker supervisor.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Program used to launch a worker (binary or interpreter).
    pub worker_program: PathBuf,
    /// Arguments placed before the `--socket/--binary/--session-id` flags
    /// (e.g. the worker script path when `worker_program` is an interpreter).
    pub worker_args: Vec<String>,
    /// Directory holding per-session Unix sockets.
    pub socket_dir: PathBuf,
    /// How long to wait for a new worker's socket to accept connections.
    pub ready_timeout: Duration,
    /// Graceful close deadline inside `stop`.
    pub stop_timeout: Duration,
    /// Worker stdio disposition.
    pub stdio: WorkerStdio,
}

impl SupervisorConfig {
    pub fn new(worker_program: impl Into<PathBuf>, socket_dir: impl Into<PathBuf>) -> Self {
        Self {
            worker_program: worker_program.into(),
            worker_args: Vec::new(),
            socket_dir: socket_dir.into(),
            ready_timeout: DEFAULT_READY_TIMEOUT,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            stdio: WorkerStdio::Inherit,
        }
    }
}

/// Top-level gateway configuration assembled by the CLI.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub supervisor: SupervisorConfig,
    /// Path of the persisted session registry file.
    pub registry_path: PathBuf,
    /// Idle threshold for the sweeper.
    pub max_idle: Duration,
    /// Sweeper cadence.
    pub sweep_interval: Duration,
}

/// Filename prefix for per-session worker sockets. Shared by socket path
/// derivation and orphan cleanup.
pub const SOCKET_PREFIX: &str = "ida-worker-";
/// Filename suffix for per-session worker sockets.
pub const SOCKET_SUFFIX: &str = ".sock";

/// Derive the socket path for a session ID under the given directory.
pub fn socket_path_for(socket_dir: &std::path::Path, session_id: &str) -> PathBuf {
    socket_dir.join(format!("{SOCKET_PREFIX}{session_id}{SOCKET_SUFFIX}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_path_uses_prefix_and_suffix() {
        let path = socket_path_for(std::path::Path::new("/tmp"), "abc");
        assert_eq!(path, PathBuf::from("/tmp/ida-worker-abc.sock"));
    }
}
