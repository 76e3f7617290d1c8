//! Time-based cache in front of the upstream refresh.
//!
//! The gate holds the last committed value and when it was fetched. A value is
//! FRESH while younger than the window and STALE otherwise; a zero window is
//! always STALE. The refresh runs with the lock held, so concurrent requests
//! during a refresh wait for its result instead of calling upstream again,
//! whether or not that result was committed.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// What a refresh produced.
pub enum Refresh<T> {
    /// Successful cycle: store it and mark the cache FRESH
    Commit(T),
    /// Failed cycle: handed to this caller and to requests queued behind it,
    /// cache stays STALE
    Uncached(T),
}

struct CacheState<T> {
    last_fetch: Option<Instant>,
    cached: Option<Arc<T>>,
    /// Result of the most recent refresh, committed or not
    latest: Option<Arc<T>>,
}

pub struct CacheGate<T> {
    window: Duration,
    /// Bumped under the lock each time a refresh finishes
    refreshes: AtomicU64,
    state: Mutex<CacheState<T>>,
}

/// STALE iff the window is zero, nothing was fetched yet, or the window elapsed.
pub fn is_stale(now: Instant, last_fetch: Option<Instant>, window: Duration) -> bool {
    if window.is_zero() {
        return true;
    }
    match last_fetch {
        Some(last) => now.saturating_duration_since(last) > window,
        None => true,
    }
}

impl<T> CacheGate<T> {
    pub fn new(window: Duration) -> Self {
        CacheGate {
            window,
            refreshes: AtomicU64::new(0),
            state: Mutex::new(CacheState {
                last_fetch: None,
                cached: None,
                latest: None,
            }),
        }
    }

    /// Return the cached value if FRESH, otherwise run `refresh` once and
    /// answer with its result.
    ///
    /// A caller that had to wait for the lock while another refresh ran gets
    /// that refresh's result. Callers arriving after it finished retry.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Arc<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Refresh<T>>,
    {
        let seen = self.refreshes.load(Ordering::Acquire);
        let mut state = self.state.lock().await;

        if self.refreshes.load(Ordering::Acquire) != seen {
            if let Some(latest) = &state.latest {
                debug!("Reusing refresh that finished while waiting");
                return Arc::clone(latest);
            }
        }

        let now = Instant::now();
        if !is_stale(now, state.last_fetch, self.window) {
            if let (Some(cached), Some(last)) = (&state.cached, state.last_fetch) {
                let remaining = self.window.saturating_sub(now.saturating_duration_since(last));
                info!(remaining_secs = remaining.as_secs(), "Cache hit");
                return Arc::clone(cached);
            }
        }

        info!("Cache miss");
        let value = match refresh().await {
            Refresh::Commit(value) => {
                let value = Arc::new(value);
                state.last_fetch = Some(Instant::now());
                state.cached = Some(Arc::clone(&value));
                value
            }
            Refresh::Uncached(value) => {
                warn!("Refresh failed; response will not be cached");
                Arc::new(value)
            }
        };
        state.latest = Some(Arc::clone(&value));
        self.refreshes.fetch_add(1, Ordering::Release);
        value
    }
}
