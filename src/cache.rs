//! Thread-safe in-memory cache with per-entry TTL
//!
//! Values are type-erased; `get::<T>()` restores the concrete type at the
//! call site. A background task sweeps expired entries every minute and
//! counts them as evictions. Expired entries read as absent before the
//! sweeper reaches them.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;

/// How often the sweeper scans for expired entries
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    expires_at: Instant,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    evictions: AtomicU64,
    size: AtomicUsize,
}

/// Cache statistics snapshot
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub evictions: u64,
    pub current_size: usize,
    pub hit_rate: f64,
}

pub struct TtlCache {
    items: Arc<RwLock<HashMap<String, Entry>>>,
    counters: Arc<Counters>,
    shutdown: watch::Sender<bool>,
}

impl TtlCache {
    /// Create a cache and start its sweeper. Must be called from within a
    /// tokio runtime.
    pub fn new() -> Self {
        let items: Arc<RwLock<HashMap<String, Entry>>> = Arc::new(RwLock::new(HashMap::new()));
        let counters = Arc::new(Counters::default());
        let (shutdown, rx) = watch::channel(false);

        spawn_sweeper(items.clone(), counters.clone(), rx);

        Self {
            items,
            counters,
            shutdown,
        }
    }

    /// Retrieve a value if present, unexpired, and of the expected type.
    /// Anything else counts as a miss.
    pub fn get<T: Clone + Send + Sync + 'static>(&self, key: &str) -> Option<T> {
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        let found = items.get(key).and_then(|entry| {
            if Instant::now() < entry.expires_at {
                entry.value.downcast_ref::<T>().cloned()
            } else {
                None
            }
        });

        match found {
            Some(value) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a value, overwriting any prior entry under the key.
    pub fn set<T: Send + Sync + 'static>(&self, key: impl Into<String>, value: T, ttl: Duration) {
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        items.insert(
            key.into(),
            Entry {
                value: Arc::new(value),
                expires_at: Instant::now() + ttl,
            },
        );
        self.counters.sets.fetch_add(1, Ordering::Relaxed);
        self.counters.size.store(items.len(), Ordering::Relaxed);
    }

    /// Remove a single entry if present.
    pub fn delete(&self, key: &str) {
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        if items.remove(key).is_some() {
            self.counters.size.store(items.len(), Ordering::Relaxed);
        }
    }

    /// Remove all entries.
    pub fn clear(&self) {
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        items.clear();
        self.counters.size.store(0, Ordering::Relaxed);
    }

    /// Atomic snapshot of the statistics counters.
    pub fn stats(&self) -> CacheStats {
        let hits = self.counters.hits.load(Ordering::Relaxed);
        let misses = self.counters.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            hits as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        CacheStats {
            hits,
            misses,
            sets: self.counters.sets.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            current_size: self.counters.size.load(Ordering::Relaxed),
            hit_rate,
        }
    }

    /// Stop the sweeper. Safe to call more than once; the cache itself
    /// remains usable afterwards.
    pub fn close(&self) {
        let _ = self.shutdown.send(true);
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TtlCache {
    fn drop(&mut self) {
        self.close();
    }
}

fn spawn_sweeper(
    items: Arc<RwLock<HashMap<String, Entry>>>,
    counters: Arc<Counters>,
    mut shutdown: watch::Receiver<bool>,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; consume it so sweeps start one
        // interval from now.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    sweep(&items, &counters);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return;
                    }
                }
            }
        }
    });
}

fn sweep(items: &RwLock<HashMap<String, Entry>>, counters: &Counters) {
    let now = Instant::now();
    let mut items = items.write().unwrap_or_else(|e| e.into_inner());
    let before = items.len();
    items.retain(|_, entry| now < entry.expires_at);
    let evicted = before - items.len();
    if evicted > 0 {
        counters.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
        counters.size.store(items.len(), Ordering::Relaxed);
    }
}
