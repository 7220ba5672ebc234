//! Time-to-live cache for normalized feed tables.
//!
//! Each key owns a slot guarded by an async mutex, so concurrent callers for
//! the same feed wait on a single in-flight load and then share its result.
//! Refreshes replace the whole entry; callers still holding the previous
//! `Arc` keep a valid table.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

use crate::detection::FireTable;
use crate::error::Result;
use crate::fetch::{HttpClient, load_feed};

/// Default lifetime of a cached feed.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

struct Entry<V> {
    value: Arc<V>,
    expires_at: Instant,
}

type Slot<V> = Arc<AsyncMutex<Option<Entry<V>>>>;

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub ttl_secs: u64,
}

pub struct TtlCache<V> {
    ttl: Duration,
    slots: Mutex<HashMap<String, Slot<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

pub type FeedCache = TtlCache<FireTable>;

impl<V> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        info!(ttl_secs = ttl.as_secs(), "Initializing feed cache");
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn slot(&self, key: &str) -> Slot<V> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(key.to_string()).or_default().clone()
    }

    /// Returns the cached value for `key`, running `loader` if it is missing or expired.
    ///
    /// A failed load caches nothing, so the next call tries again.
    pub async fn get_or_load<F, Fut, E>(&self, key: &str, loader: F) -> std::result::Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
    {
        let slot = self.slot(key);
        let mut guard = slot.lock().await;

        if let Some(entry) = guard.as_ref() {
            if entry.expires_at > Instant::now() {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key, "Feed cache hit");
                return Ok(entry.value.clone());
            }
            debug!(key, "Feed cache entry expired");
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        *guard = None;

        let value = Arc::new(loader().await?);
        *guard = Some(Entry {
            value: value.clone(),
            expires_at: Instant::now() + self.ttl,
        });
        debug!(key, "Feed cached");

        Ok(value)
    }

    /// Returns the cached value without loading, if present and fresh.
    pub async fn get(&self, key: &str) -> Option<Arc<V>> {
        let slot = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()?;
        let guard = slot.lock().await;
        guard
            .as_ref()
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.value.clone())
    }

    /// Drops the cached value for `key`.
    ///
    /// The slot stays in place, so a load already in flight keeps serving its
    /// waiters and the next caller queues behind it instead of fetching again.
    pub fn invalidate(&self, key: &str) {
        let slot = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned();
        if let Some(slot) = slot {
            reset(&slot);
        }
    }

    pub fn clear(&self) {
        let slots: Vec<Slot<V>> = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        slots.iter().for_each(reset);
        debug!("Feed cache cleared");
    }

    /// Counts only fresh cached values; slots emptied by a failed load or a
    /// clear, and slots with a load in flight, are not entries.
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| {
                slot.try_lock()
                    .map(|entry| entry.as_ref().is_some_and(|e| e.expires_at > now))
                    .unwrap_or(false)
            })
            .count();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries,
            ttl_secs: self.ttl.as_secs(),
        }
    }
}

/// Empties an idle slot. A locked slot is mid-load and about to be refilled
/// with freshly fetched data, so it is left alone.
fn reset<V>(slot: &Slot<V>) {
    if let Ok(mut entry) = slot.try_lock() {
        *entry = None;
    }
}

/// Returns the normalized table for `location`, fetching only when the cache has no fresh copy.
pub async fn load_cached<C: HttpClient + ?Sized>(
    cache: &FeedCache,
    client: &C,
    location: &str,
) -> Result<Arc<FireTable>> {
    cache
        .get_or_load(location, || load_feed(client, location))
        .await
}
