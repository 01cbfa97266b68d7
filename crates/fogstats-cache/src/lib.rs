//! TTL cache for player dataset payloads.
//!
//! ## Design
//!
//! - **Cache key**: (player identity, slot), where a slot is one of the
//!   three dataset kinds or the resolved identity itself
//! - **Concurrent access**: DashMap, so reads and writes lock at most one
//!   shard; a read racing a write observes the old or the new entry, never
//!   a torn one. Only the administrative clear touches the whole structure.
//! - **TTL**: checked lazily on read; an expired entry is treated as absent
//!   and removed. A probabilistic sweep on insert keeps dead entries from
//!   piling up without a background task.
//! - **Administrative eviction**: clearing the whole cache requires the
//!   configured capability token; rejection reveals nothing about contents.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use time::OffsetDateTime;

use fogstats_core::{
    DatasetKind, MappedAchievements, PlayerAchievement, PlayerIdentity, PlayerStats,
};

/// Probability (1/N) of running a stale sweep on insert
const SWEEP_PROBABILITY: u32 = 100; // 1% chance

/// What a cache key addresses: one of the three player datasets, or the
/// resolved identity that precedes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheSlot {
    Identity,
    Dataset(DatasetKind),
}

impl std::fmt::Display for CacheSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Identity => f.write_str("identity"),
            Self::Dataset(kind) => f.write_str(kind.as_str()),
        }
    }
}

/// Cache key: one slot of one player.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub player_id: String,
    pub slot: CacheSlot,
}

impl CacheKey {
    pub fn dataset(player_id: impl Into<String>, dataset: DatasetKind) -> Self {
        Self {
            player_id: player_id.into(),
            slot: CacheSlot::Dataset(dataset),
        }
    }

    pub fn identity(player_id: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            slot: CacheSlot::Identity,
        }
    }
}

/// A cached payload.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedPayload {
    Identity(PlayerIdentity),
    Stats(PlayerStats),
    Achievements(Vec<PlayerAchievement>),
    MappedStats(MappedAchievements),
}

/// A cache entry. Owned exclusively by the cache; created on a successful
/// upstream fetch, destroyed on expiry or eviction.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub payload: CachedPayload,
    /// Wall-clock store time, surfaced as cache-sourced provenance.
    pub stored_at: OffsetDateTime,
    /// Monotonic expiry; strictly later than the store instant.
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Errors from cache operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// Uniform rejection for administrative operations; deliberately
    /// carries no cache state.
    #[error("administrative eviction rejected")]
    Unauthorized,
}

/// Cache statistics counters.
#[derive(Debug, Default)]
struct CacheStatistics {
    hits: AtomicU64,
    misses: AtomicU64,
    insertions: AtomicU64,
    evictions: AtomicU64,
    size: AtomicUsize,
}

/// A point-in-time snapshot of cache statistics.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub evictions: u64,
    pub size: usize,
    pub hit_ratio: f64,
}

/// Thread-safe TTL cache for dataset payloads.
pub struct ProfileCache {
    entries: DashMap<CacheKey, CacheEntry>,
    /// Capability token required for whole-cache eviction. `None` means the
    /// operation is always rejected.
    admin_token: Option<String>,
    stats: Arc<CacheStatistics>,
}

impl std::fmt::Debug for ProfileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileCache")
            .field("size", &self.entries.len())
            .field("stats", &self.stats())
            .finish()
    }
}

impl ProfileCache {
    /// Creates a cache whose whole-structure eviction is gated by `token`.
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            entries: DashMap::new(),
            admin_token: (!token.is_empty()).then_some(token),
            stats: Arc::new(CacheStatistics::default()),
        }
    }

    /// Creates a cache with administrative eviction permanently rejected.
    pub fn without_admin_token() -> Self {
        Self {
            entries: DashMap::new(),
            admin_token: None,
            stats: Arc::new(CacheStatistics::default()),
        }
    }

    /// Looks up a live entry.
    ///
    /// An entry at or past its expiry is removed and reported as a miss,
    /// so callers never observe stale payloads.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        if let Some(entry) = self.entries.get(key) {
            if entry.is_expired(Instant::now()) {
                drop(entry); // Release the shard lock before removing
                self.entries.remove(key);
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                self.stats.size.store(self.entries.len(), Ordering::Relaxed);
                return None;
            }

            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Some(entry.clone());
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Stores a payload under `key` for `ttl`.
    ///
    /// A zero TTL would violate the `expires_at > stored_at` invariant, so
    /// such entries are not stored at all.
    pub fn put(&self, key: CacheKey, payload: CachedPayload, ttl: Duration) {
        if ttl.is_zero() {
            tracing::warn!(player_id = %key.player_id, slot = %key.slot, "refusing zero-TTL cache entry");
            return;
        }

        // Amortized stale sweep, 1% chance per insert
        if fastrand::u32(0..SWEEP_PROBABILITY) == 0 {
            self.sweep_expired();
        }

        let entry = CacheEntry {
            payload,
            stored_at: OffsetDateTime::now_utc(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.insert(key, entry);
        self.stats.insertions.fetch_add(1, Ordering::Relaxed);
        self.stats.size.store(self.entries.len(), Ordering::Relaxed);
    }

    /// Evicts a single key. Returns whether an entry was present.
    pub fn evict(&self, key: &CacheKey) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            self.stats.size.store(self.entries.len(), Ordering::Relaxed);
        }
        removed
    }

    /// Evicts every entry. Requires the configured capability token.
    pub fn evict_all(&self, token: &str) -> Result<(), CacheError> {
        match &self.admin_token {
            Some(expected) if expected == token => {
                let evicted = self.entries.len() as u64;
                self.entries.clear();
                self.stats.evictions.fetch_add(evicted, Ordering::Relaxed);
                self.stats.size.store(0, Ordering::Relaxed);
                tracing::info!("cache cleared by administrative eviction");
                Ok(())
            }
            _ => Err(CacheError::Unauthorized),
        }
    }

    /// Removes entries that have already expired.
    pub fn sweep_expired(&self) {
        let now = Instant::now();
        let stale: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|entry| entry.value().is_expired(now))
            .map(|entry| entry.key().clone())
            .collect();

        for key in stale {
            if self.entries.remove(&key).is_some() {
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }

        self.stats.size.store(self.entries.len(), Ordering::Relaxed);
    }

    /// Current statistics snapshot.
    pub fn stats(&self) -> CacheStatsSnapshot {
        let hits = self.stats.hits.load(Ordering::Relaxed);
        let misses = self.stats.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStatsSnapshot {
            hits,
            misses,
            insertions: self.stats.insertions.load(Ordering::Relaxed),
            evictions: self.stats.evictions.load(Ordering::Relaxed),
            size: self.stats.size.load(Ordering::Relaxed),
            hit_ratio: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
