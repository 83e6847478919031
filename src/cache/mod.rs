//! Per-session result cache with single-flight loading.
//!
//! The four expensive enumerations (functions, imports, exports, strings)
//! are fetched from the worker once per binary and filtered/paginated
//! in-memory by the dispatcher. Concurrent misses for the same key collapse
//! into one underlying fetch whose result is delivered to every waiter.
//!
//! Invalidation is deliberately coarse: any mutation that could change an
//! enumeration drops the session's entire cache. In-flight fetches complete
//! into the detached cache object and are never observed by later reads.

use crate::worker::rpc::{ExportEntry, FunctionEntry, ImportEntry, StringEntry};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::debug;

/// Cloneable failure carried to every waiter of a failed fetch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct FetchError(pub String);

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    fn interrupted() -> Self {
        Self::new("enumeration fetch was interrupted")
    }
}

type Published<T> = Option<Result<Arc<Vec<T>>, FetchError>>;

enum Slot<T> {
    /// No payload and no fetch in flight.
    Empty,
    /// A fetch is in flight; waiters block on the channel.
    Pending(watch::Receiver<Published<T>>),
    /// Immutable payload until invalidated.
    Filled(Arc<Vec<T>>),
}

/// Single-flight cell for one enumeration kind.
///
/// The mutex is never held across the fetch: acquire, install the pending
/// marker, release, fetch, reacquire, publish.
pub struct Flight<T> {
    slot: Mutex<Slot<T>>,
}

impl<T> Default for Flight<T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(Slot::Empty),
        }
    }
}

/// Resets an installed pending marker if the fetch future is dropped before
/// publishing, so waiters fail fast and the next call retries.
struct PendingGuard<'a, T> {
    slot: &'a Mutex<Slot<T>>,
    rx: watch::Receiver<Published<T>>,
    armed: bool,
}

impl<T> Drop for PendingGuard<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if matches!(&*slot, Slot::Pending(rx) if rx.same_channel(&self.rx)) {
            *slot = Slot::Empty;
        }
    }
}

impl<T> Flight<T> {
    /// Load the payload, fetching at most once regardless of concurrency.
    ///
    /// Returns the payload plus `was_hit`: `false` for the caller whose
    /// `fetch` populated the entry, `true` for everyone served from the
    /// filled entry or from a fetch they waited on. A failed fetch clears
    /// the pending marker before waiters are released, so a later call
    /// retries; the error reaches every current waiter.
    pub async fn load<F, Fut>(&self, fetch: F) -> Result<(Arc<Vec<T>>, bool), FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>, FetchError>>,
    {
        enum Role<T> {
            Fetch(watch::Sender<Published<T>>, watch::Receiver<Published<T>>),
            Wait(watch::Receiver<Published<T>>),
        }

        let role = {
            let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
            match &*slot {
                Slot::Filled(data) => return Ok((data.clone(), true)),
                Slot::Pending(rx) => Role::Wait(rx.clone()),
                Slot::Empty => {
                    let (tx, rx) = watch::channel(None);
                    *slot = Slot::Pending(rx.clone());
                    Role::Fetch(tx, rx)
                }
            }
        };

        match role {
            Role::Wait(mut rx) => match rx.wait_for(|published| published.is_some()).await {
                Ok(published) => match published.clone() {
                    Some(result) => result.map(|data| (data, true)),
                    None => Err(FetchError::interrupted()),
                },
                // The fetcher was dropped before publishing; its guard has
                // already cleared the marker.
                Err(_) => Err(FetchError::interrupted()),
            },
            Role::Fetch(tx, rx) => {
                let mut guard = PendingGuard {
                    slot: &self.slot,
                    rx,
                    armed: true,
                };
                let result = fetch().await;
                let published = {
                    let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
                    guard.armed = false;
                    match result {
                        Ok(items) => {
                            let data = Arc::new(items);
                            *slot = Slot::Filled(data.clone());
                            Ok(data)
                        }
                        Err(e) => {
                            *slot = Slot::Empty;
                            Err(e)
                        }
                    }
                };
                let _ = tx.send(Some(published.clone()));
                published.map(|data| (data, false))
            }
        }
    }
}

/// The cached enumerations of one session.
#[derive(Default)]
pub struct SessionCache {
    pub functions: Flight<FunctionEntry>,
    pub imports: Flight<ImportEntry>,
    pub exports: Flight<ExportEntry>,
    pub strings: Flight<StringEntry>,
}

/// Directory of per-session caches keyed by session ID.
#[derive(Default)]
pub struct CacheRegistry {
    inner: Mutex<HashMap<String, Arc<SessionCache>>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the cache for a session.
    pub fn for_session(&self, session_id: &str) -> Arc<SessionCache> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    /// Drop all cached enumerations for a session. Called after successful
    /// mutations and on session destruction; the next read misses and
    /// fetches fresh data.
    pub fn invalidate(&self, session_id: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.remove(session_id).is_some() {
            debug!(session_id, "Invalidated session cache");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn entry(name: &str) -> FunctionEntry {
        FunctionEntry {
            address: 0x401000,
            name: name.to_string(),
            size: 16,
        }
    }

    #[tokio::test]
    async fn concurrent_misses_share_one_fetch() {
        let flight = Arc::new(Flight::<FunctionEntry>::default());
        let fetches = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let flight = flight.clone();
            let fetches = fetches.clone();
            tasks.push(tokio::spawn(async move {
                flight
                    .load(|| async move {
                        fetches.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(vec![entry("main")])
                    })
                    .await
            }));
        }

        let mut hits = 0;
        let mut misses = 0;
        let mut payloads = Vec::new();
        for task in tasks {
            let (data, was_hit) = task.await.unwrap().unwrap();
            if was_hit {
                hits += 1;
            } else {
                misses += 1;
            }
            payloads.push(data);
        }

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(misses, 1);
        assert_eq!(hits, 3);
        for pair in payloads.windows(2) {
            assert!(Arc::ptr_eq(&pair[0], &pair[1]));
        }
    }

    #[tokio::test]
    async fn filled_entry_skips_fetch() {
        let flight = Flight::<FunctionEntry>::default();
        let (_, hit) = flight
            .load(|| async { Ok(vec![entry("main")]) })
            .await
            .unwrap();
        assert!(!hit);

        let (data, hit) = flight
            .load(|| async { panic!("fetch must not run on a filled entry") })
            .await
            .unwrap();
        assert!(hit);
        assert_eq!(data[0].name, "main");
    }

    #[tokio::test]
    async fn failed_fetch_reaches_waiters_and_allows_retry() {
        let flight = Arc::new(Flight::<FunctionEntry>::default());
        let fetches = Arc::new(AtomicUsize::new(0));

        let fetcher = {
            let flight = flight.clone();
            let fetches = fetches.clone();
            tokio::spawn(async move {
                flight
                    .load(|| async move {
                        fetches.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Err::<Vec<FunctionEntry>, _>(FetchError::new("worker exploded"))
                    })
                    .await
            })
        };
        // Give the fetcher time to install the pending marker.
        tokio::time::sleep(Duration::from_millis(10)).await;
        let waiter = {
            let flight = flight.clone();
            tokio::spawn(async move { flight.load(|| async { Ok(vec![]) }).await })
        };

        assert_eq!(
            fetcher.await.unwrap().unwrap_err(),
            FetchError::new("worker exploded")
        );
        assert_eq!(
            waiter.await.unwrap().unwrap_err(),
            FetchError::new("worker exploded")
        );

        // The marker was cleared, so the next call retries.
        let (data, hit) = flight
            .load(|| async {
                fetches.fetch_add(1, Ordering::SeqCst);
                Ok(vec![entry("main")])
            })
            .await
            .unwrap();
        assert!(!hit);
        assert_eq!(data.len(), 1);
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn dropped_fetch_clears_pending_marker() {
        let flight = Arc::new(Flight::<FunctionEntry>::default());

        let fetcher = {
            let flight = flight.clone();
            tokio::spawn(async move {
                flight
                    .load(|| async {
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                        Ok(vec![])
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        fetcher.abort();
        let _ = fetcher.await;

        let (data, hit) = flight
            .load(|| async { Ok(vec![entry("main")]) })
            .await
            .unwrap();
        assert!(!hit);
        assert_eq!(data[0].name, "main");
    }

    #[tokio::test]
    async fn invalidate_forces_refetch_through_fresh_cache() {
        let registry = CacheRegistry::new();
        let fetches = Arc::new(AtomicUsize::new(0));

        let cache = registry.for_session("s1");
        let fetch_count = fetches.clone();
        cache
            .functions
            .load(|| async move {
                fetch_count.fetch_add(1, Ordering::SeqCst);
                Ok(vec![entry("main")])
            })
            .await
            .unwrap();

        registry.invalidate("s1");

        let cache = registry.for_session("s1");
        let fetch_count = fetches.clone();
        let (_, hit) = cache
            .functions
            .load(|| async move {
                fetch_count.fetch_add(1, Ordering::SeqCst);
                Ok(vec![entry("main"), entry("init")])
            })
            .await
            .unwrap();

        assert!(!hit);
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn caches_are_isolated_per_session() {
        let registry = CacheRegistry::new();
        let a = registry.for_session("a");
        let b = registry.for_session("b");
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &registry.for_session("a")));
    }
}
