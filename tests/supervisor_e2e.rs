//! Worker supervisor lifecycle tests.
//!
//! The worker command is `sh -c 'exec sleep 30'`: a real subprocess that
//! never creates its socket, so tests control readiness by binding (or not
//! binding) a fake worker at the session's socket path.

#![cfg(unix)]

mod common;

use common::{process_alive, FakeWorker};
use ida_gateway::config::{SupervisorConfig, WorkerStdio};
use ida_gateway::worker::SupervisorError;
use ida_gateway::{SessionRegistry, WorkerSupervisor};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn test_config(dir: &TempDir) -> SupervisorConfig {
    let mut config = SupervisorConfig::new("/bin/sh", dir.path());
    // The extra flags land in $0/$1... of the shell and are ignored.
    config.worker_args = vec!["-c".into(), "exec sleep 30".into(), "ida-worker".into()];
    config.ready_timeout = Duration::from_secs(2);
    config.stop_timeout = Duration::from_millis(200);
    config.stdio = WorkerStdio::Discard;
    config
}

async fn new_session(dir: &TempDir) -> Arc<ida_gateway::Session> {
    let registry = SessionRegistry::new(dir.path().join("sessions.jsonl"), dir.path());
    registry.create(Path::new("/bin/ls")).await.unwrap()
}

#[tokio::test]
async fn readiness_timeout_leaves_no_subprocess_behind() {
    let dir = TempDir::new().unwrap();
    let supervisor = WorkerSupervisor::new(test_config(&dir));
    let session = new_session(&dir).await;

    let started_at = Instant::now();
    let err = supervisor.start(&session).await.unwrap_err();
    let elapsed = started_at.elapsed();

    assert!(matches!(err, SupervisorError::NotReady(_)));
    // Within the deadline plus a poll interval or two.
    assert!(elapsed >= Duration::from_millis(1900));
    assert!(elapsed < Duration::from_secs(4));

    let pid = session.worker_pid();
    assert_ne!(pid, 0);
    assert!(!process_alive(pid), "worker must be killed and reaped");
    assert!(!session.socket_path.exists(), "socket must be removed");
    assert!(supervisor.get_client(&session.id).await.is_err());
}

#[tokio::test]
async fn start_becomes_ready_and_stop_reaps() {
    let dir = TempDir::new().unwrap();
    let supervisor = Arc::new(WorkerSupervisor::new(test_config(&dir)));
    let session = new_session(&dir).await;

    let start = {
        let supervisor = supervisor.clone();
        let session = session.clone();
        tokio::spawn(async move { supervisor.start(&session).await })
    };
    // Let start() spawn the subprocess and begin probing, then satisfy the
    // probe from the fake worker.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let _worker = FakeWorker::serve(&session.socket_path).await.unwrap();

    let handle = start.await.unwrap().expect("worker should become ready");
    assert_ne!(handle.pid, 0);
    assert_eq!(session.worker_pid(), handle.pid);
    assert!(process_alive(handle.pid));
    assert!(supervisor.get_client(&session.id).await.is_ok());

    supervisor.stop(&session.id).await.unwrap();
    assert!(!process_alive(handle.pid), "stop must reap the subprocess");
    assert!(supervisor.get_client(&session.id).await.is_err());
    assert_eq!(session.worker_pid(), 0);
}

#[tokio::test]
async fn second_start_for_same_session_is_rejected() {
    let dir = TempDir::new().unwrap();
    let supervisor = Arc::new(WorkerSupervisor::new(test_config(&dir)));
    let session = new_session(&dir).await;

    let start = {
        let supervisor = supervisor.clone();
        let session = session.clone();
        tokio::spawn(async move { supervisor.start(&session).await })
    };
    tokio::time::sleep(Duration::from_millis(300)).await;
    let _worker = FakeWorker::serve(&session.socket_path).await.unwrap();
    let handle = start.await.unwrap().unwrap();

    let err = supervisor.start(&session).await.unwrap_err();
    assert!(matches!(err, SupervisorError::AlreadyRunning(_)));

    supervisor.stop(&session.id).await.unwrap();
    assert!(!process_alive(handle.pid));
}

#[tokio::test]
async fn stop_unknown_session_reports_no_worker() {
    let dir = TempDir::new().unwrap();
    let supervisor = WorkerSupervisor::new(test_config(&dir));
    let err = supervisor.stop("nope").await.unwrap_err();
    assert!(matches!(err, SupervisorError::NoWorker(_)));
}

#[tokio::test]
async fn orphan_socket_cleanup_removes_only_worker_sockets() {
    let dir = TempDir::new().unwrap();
    let supervisor = WorkerSupervisor::new(test_config(&dir));

    let stale = dir.path().join("ida-worker-dead-session.sock");
    let unrelated = dir.path().join("keep.txt");
    std::fs::write(&stale, b"").unwrap();
    std::fs::write(&unrelated, b"data").unwrap();

    assert_eq!(supervisor.cleanup_orphan_sockets(), 1);
    assert!(!stale.exists());
    assert!(unrelated.exists());
}

#[tokio::test]
async fn shutdown_all_stops_every_worker() {
    let dir = TempDir::new().unwrap();
    let supervisor = Arc::new(WorkerSupervisor::new(test_config(&dir)));

    let mut pids = Vec::new();
    let mut workers = Vec::new();
    for _ in 0..2 {
        let session = new_session(&dir).await;
        let start = {
            let supervisor = supervisor.clone();
            let session = session.clone();
            tokio::spawn(async move { supervisor.start(&session).await })
        };
        tokio::time::sleep(Duration::from_millis(300)).await;
        workers.push(FakeWorker::serve(&session.socket_path).await.unwrap());
        pids.push(start.await.unwrap().unwrap().pid);
    }

    supervisor.shutdown_all().await;
    for pid in pids {
        assert!(!process_alive(pid));
    }
}
