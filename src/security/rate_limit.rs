//! Fixed-window rate limiting keyed by client identifier.
//!
//! # Window Semantics
//! ```text
//! first request ──▶ entry { count: 0, window_reset_at: now + window }
//!                     │
//!    count < limit ───┼──▶ count += 1, allowed
//!    count >= limit ──┼──▶ denied (count untouched)
//!                     │
//!    window_reset_at <= now ──▶ entry replaced on next check (or by sweep)
//! ```
//!
//! A request arriving at exactly `window_reset_at` belongs to the new window.
//! The sweep uses the same comparison.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::observability::metrics;

/// Errors returned by [`FixedWindowLimiter::check`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

/// Source of the current time in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Per-identifier counter for the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    /// Requests approved in the current window.
    pub count: u32,
    /// Absolute end of the current window (ms since epoch).
    pub window_reset_at: u64,
}

impl RateLimitEntry {
    fn fresh(now_ms: u64, window_ms: u64) -> Self {
        Self {
            count: 0,
            window_reset_at: now_ms.saturating_add(window_ms),
        }
    }

    /// Whether the window has ended at `now_ms`.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.window_reset_at <= now_ms
    }
}

/// Storage for rate limit entries.
///
/// `update` must give the closure exclusive access to the identifier's slot
/// for the whole read-modify-write.
pub trait RateLimitStore: Send + Sync {
    /// Run `f` on the current entry (if any) and store the entry it returns.
    fn update<R>(
        &self,
        identifier: &str,
        f: impl FnOnce(Option<RateLimitEntry>) -> (RateLimitEntry, R),
    ) -> R;

    /// Look up an entry without modifying it.
    fn get(&self, identifier: &str) -> Option<RateLimitEntry>;

    /// Remove every entry whose window has ended. Returns how many were removed.
    fn purge_expired(&self, now_ms: u64) -> usize;

    /// Number of tracked identifiers.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process store backed by a sharded concurrent map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, RateLimitEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimitStore for MemoryStore {
    fn update<R>(
        &self,
        identifier: &str,
        f: impl FnOnce(Option<RateLimitEntry>) -> (RateLimitEntry, R),
    ) -> R {
        match self.entries.entry(identifier.to_string()) {
            Entry::Occupied(mut occupied) => {
                let (next, out) = f(Some(*occupied.get()));
                *occupied.get_mut() = next;
                out
            }
            Entry::Vacant(vacant) => {
                let (next, out) = f(None);
                vacant.insert(next);
                out
            }
        }
    }

    fn get(&self, identifier: &str) -> Option<RateLimitEntry> {
        self.entries.get(identifier).map(|e| *e.value())
    }

    fn purge_expired(&self, now_ms: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now_ms));
        before.saturating_sub(self.entries.len())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Outcome of a rate limit check. A denial is a normal value, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// End of the window this decision was made in (ms since epoch).
    pub reset_at: u64,
}

impl Decision {
    /// Time until the window resets, rounded up to whole seconds.
    pub fn retry_after(&self, now_ms: u64) -> Duration {
        let wait_ms = self.reset_at.saturating_sub(now_ms);
        Duration::from_secs(wait_ms.div_ceil(1000))
    }
}

/// Fixed-window rate limiter.
pub struct FixedWindowLimiter<S = MemoryStore, C = SystemClock> {
    store: S,
    clock: C,
}

impl FixedWindowLimiter {
    pub fn new() -> Self {
        Self::with_parts(MemoryStore::new(), SystemClock)
    }
}

impl Default for FixedWindowLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: RateLimitStore, C: Clock> FixedWindowLimiter<S, C> {
    pub fn with_parts(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    /// Count a request from `identifier` against `limit` requests per `window`.
    ///
    /// Returns `InvalidArgument` for a zero limit or a window under one
    /// millisecond; the store is left untouched in that case.
    pub fn check(
        &self,
        identifier: &str,
        limit: u32,
        window: Duration,
    ) -> Result<Decision, RateLimitError> {
        if limit == 0 {
            return Err(RateLimitError::InvalidArgument("limit must be positive"));
        }
        let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        if window_ms == 0 {
            return Err(RateLimitError::InvalidArgument(
                "window must be at least one millisecond",
            ));
        }

        let now = self.clock.now_ms();
        let decision = self.store.update(identifier, |current| {
            let mut entry = match current {
                Some(entry) if !entry.is_expired(now) => entry,
                _ => RateLimitEntry::fresh(now, window_ms),
            };

            if entry.count >= limit {
                let denied = Decision {
                    allowed: false,
                    limit,
                    remaining: 0,
                    reset_at: entry.window_reset_at,
                };
                return (entry, denied);
            }

            entry.count += 1;
            let allowed = Decision {
                allowed: true,
                limit,
                remaining: limit - entry.count,
                reset_at: entry.window_reset_at,
            };
            (entry, allowed)
        });

        Ok(decision)
    }

    /// Drop entries whose window has ended.
    pub fn purge_expired(&self) -> usize {
        self.store.purge_expired(self.clock.now_ms())
    }

    /// Number of identifiers currently tracked (expired ones included until swept).
    pub fn tracked(&self) -> usize {
        self.store.len()
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

/// Periodically purge expired entries until shutdown.
///
/// An interval of zero disables the sweeper and returns `None`.
pub fn spawn_sweeper<S, C>(
    limiter: Arc<FixedWindowLimiter<S, C>>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> Option<tokio::task::JoinHandle<()>>
where
    S: RateLimitStore + 'static,
    C: Clock + 'static,
{
    if interval.is_zero() {
        tracing::info!("Rate limit sweeper disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let purged = limiter.purge_expired();
                    let tracked = limiter.tracked();
                    metrics::record_rate_limit_entries(tracked);
                    if purged > 0 {
                        tracing::debug!(purged, tracked, "Swept expired rate limit entries");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Rate limit sweeper stopping");
                    break;
                }
            }
        }
    }))
}
