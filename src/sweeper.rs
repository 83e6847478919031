//! Idle session sweeper.
//!
//! A fixed-cadence task that snapshots idle sessions from the registry and
//! tears each one down: stop the worker, remove the record, drop the cache.
//! Explicit closes may race the sweep; both remove paths are no-ops on an
//! already-removed session.

use crate::cache::CacheRegistry;
use crate::session::SessionRegistry;
use crate::worker::WorkerSupervisor;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Run one sweep pass. Returns the number of sessions expired.
pub async fn sweep_once(
    registry: &SessionRegistry,
    workers: &WorkerSupervisor,
    caches: &CacheRegistry,
    max_idle: Duration,
) -> usize {
    let expired = registry.sweep(max_idle).await;
    let count = expired.len();
    for session in expired {
        info!(
            session_id = %session.id,
            idle_secs = session.idle_for().as_secs(),
            "Expiring idle session"
        );
        if let Err(e) = workers.stop(&session.id).await {
            debug!(session_id = %session.id, error = %e, "No worker to stop for idle session");
        }
        registry.remove(&session.id).await;
        caches.invalidate(&session.id);
    }
    count
}

/// Spawn the background sweeper. Runs until `shutdown` is cancelled.
pub fn spawn_sweeper(
    registry: Arc<SessionRegistry>,
    workers: Arc<WorkerSupervisor>,
    caches: Arc<CacheRegistry>,
    max_idle: Duration,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            sweep_once(&registry, &workers, &caches, max_idle).await;
        }
        debug!("Sweeper stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SupervisorConfig;
    use std::path::Path;
    use tempfile::TempDir;

    #[tokio::test]
    async fn sweep_removes_idle_sessions_and_keeps_fresh_ones() {
        let dir = TempDir::new().unwrap();
        let registry = SessionRegistry::new(dir.path().join("sessions.jsonl"), dir.path());
        let workers = WorkerSupervisor::new(SupervisorConfig::new("/bin/true", dir.path()));
        let caches = CacheRegistry::new();

        let idle = registry.create(Path::new("/bin/ls")).await.unwrap();
        let fresh = registry.create(Path::new("/bin/ls")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        fresh.touch();

        let expired = sweep_once(&registry, &workers, &caches, Duration::from_millis(25)).await;
        assert_eq!(expired, 1);
        assert!(registry.get(&idle.id).await.is_none());
        assert!(registry.get(&fresh.id).await.is_some());
    }

    #[tokio::test]
    async fn sweep_tolerates_concurrent_explicit_close() {
        let dir = TempDir::new().unwrap();
        let registry = SessionRegistry::new(dir.path().join("sessions.jsonl"), dir.path());
        let workers = WorkerSupervisor::new(SupervisorConfig::new("/bin/true", dir.path()));
        let caches = CacheRegistry::new();

        let session = registry.create(Path::new("/bin/ls")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Explicit close wins the race; the sweep pass must not mind.
        registry.remove(&session.id).await;
        let expired = sweep_once(&registry, &workers, &caches, Duration::from_millis(5)).await;
        assert_eq!(expired, 0);
        assert!(registry.is_empty().await);
    }
}
