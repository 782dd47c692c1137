//! Sequence-aware cache of toll costs.
//!
//! Closed toll systems charge by entry and exit, so the cost of a toll run
//! depends on the order the stations are crossed. The cache keys on the
//! ordered identifiers together with the vehicle class. Entries expire after
//! an adaptive TTL and the least recently accessed entry is evicted once the
//! cache is full.
//!
//! The cache is an owned value: create one per process (or per test) and
//! share it behind an [`Arc`](std::sync::Arc).

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{Cost, TollCandidate, TollId, VehicleClass};

/// Default maximum number of cached sequences.
pub const DEFAULT_CACHE_CAPACITY: usize = 500;
/// Default TTL for sequences of open tolls only.
pub const DEFAULT_SHORT_TTL: Duration = Duration::from_secs(60 * 60);
/// Default TTL for sequences containing a closed toll or more than
/// [`LONG_SEQUENCE_THRESHOLD`] tolls.
pub const DEFAULT_LONG_TTL: Duration = Duration::from_secs(4 * 60 * 60);
/// Sequences longer than this always use the long TTL.
pub const LONG_SEQUENCE_THRESHOLD: usize = 5;

/// Sizing and expiry settings for [`SequenceCostCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries; `0` disables caching.
    pub capacity: usize,
    /// TTL for short, open-only sequences.
    pub short_ttl: Duration,
    /// TTL for closed or long sequences.
    pub long_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            short_ttl: DEFAULT_SHORT_TTL,
            long_ttl: DEFAULT_LONG_TTL,
        }
    }
}

impl CacheConfig {
    /// Set the capacity.
    #[must_use]
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set both TTLs.
    #[must_use]
    pub const fn with_ttls(mut self, short_ttl: Duration, long_ttl: Duration) -> Self {
        self.short_ttl = short_ttl;
        self.long_ttl = long_ttl;
        self
    }
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that missed or found an expired entry.
    pub misses: u64,
    /// Entries dropped to make room.
    pub evictions: u64,
    /// Live entries.
    pub entries: usize,
}

impl CacheStats {
    /// Share of lookups that hit, in `[0, 1]`.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        clippy::cast_precision_loss,
        reason = "ratio for reporting only"
    )]
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits.saturating_add(self.misses);
        if lookups == 0 {
            return 0.0;
        }
        self.hits as f64 / lookups as f64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SequenceKey {
    ids: Vec<TollId>,
    class: VehicleClass,
}

impl SequenceKey {
    fn new(tolls: &[TollCandidate], class: VehicleClass) -> Self {
        Self {
            ids: tolls.iter().map(|toll| toll.id.clone()).collect(),
            class,
        }
    }
}

#[derive(Debug)]
struct Entry {
    cost: Cost,
    expires_at: Instant,
    last_access: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<SequenceKey, Entry>,
    recency: BTreeMap<u64, SequenceKey>,
    tick: u64,
}

impl Inner {
    fn next_tick(&mut self) -> u64 {
        self.tick = self.tick.saturating_add(1);
        self.tick
    }

    fn remove(&mut self, key: &SequenceKey) {
        if let Some(entry) = self.entries.remove(key) {
            self.recency.remove(&entry.last_access);
        }
    }

    fn evict_least_recent(&mut self) -> bool {
        let Some((_, key)) = self.recency.pop_first() else {
            return false;
        };
        self.entries.remove(&key);
        true
    }
}

/// Thread-safe LRU cache of toll sequence costs with adaptive TTL.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use tollgate_core::{Cost, SequenceCostCache, TollCandidate, TollSystem, VehicleClass};
///
/// let cache = SequenceCostCache::default();
/// let run = vec![
///     TollCandidate::new("A", Coord { x: 0.0, y: 0.0 }, "op", TollSystem::Closed),
///     TollCandidate::new("B", Coord { x: 1.0, y: 0.0 }, "op", TollSystem::Closed),
/// ];
/// assert_eq!(cache.get(&run, VehicleClass::C1), None);
/// cache.put(&run, VehicleClass::C1, Cost::from_cents(870));
/// assert_eq!(cache.get(&run, VehicleClass::C1), Some(Cost::from_cents(870)));
/// ```
#[derive(Debug)]
pub struct SequenceCostCache {
    config: CacheConfig,
    inner: Mutex<Inner>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl Default for SequenceCostCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl SequenceCostCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Settings the cache was created with.
    #[must_use]
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// TTL applied to `tolls` on insertion.
    #[must_use]
    pub fn ttl_for(&self, tolls: &[TollCandidate]) -> Duration {
        if tolls.len() > LONG_SEQUENCE_THRESHOLD || tolls.iter().any(TollCandidate::is_closed) {
            self.config.long_ttl
        } else {
            self.config.short_ttl
        }
    }

    /// Cost of `tolls` crossed in order by `class`, if cached and fresh.
    #[must_use]
    pub fn get(&self, tolls: &[TollCandidate], class: VehicleClass) -> Option<Cost> {
        self.get_at(tolls, class, Instant::now())
    }

    /// [`get`](Self::get) evaluated at an explicit instant.
    #[must_use]
    pub fn get_at(&self, tolls: &[TollCandidate], class: VehicleClass, now: Instant) -> Option<Cost> {
        let key = SequenceKey::new(tolls, class);
        let mut inner = self.inner.lock();
        let lookup = inner
            .entries
            .get(&key)
            .map(|entry| (entry.cost, entry.last_access, entry.expires_at > now));
        let Some((cost, previous, true)) = lookup else {
            if lookup.is_some() {
                inner.remove(&key);
            }
            drop(inner);
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };
        let tick = inner.next_tick();
        inner.recency.remove(&previous);
        inner.recency.insert(tick, key.clone());
        if let Some(entry) = inner.entries.get_mut(&key) {
            entry.last_access = tick;
        }
        drop(inner);
        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(cost)
    }

    /// Store the cost of `tolls` crossed in order by `class`.
    pub fn put(&self, tolls: &[TollCandidate], class: VehicleClass, cost: Cost) {
        self.put_at(tolls, class, cost, Instant::now());
    }

    /// [`put`](Self::put) evaluated at an explicit instant.
    pub fn put_at(&self, tolls: &[TollCandidate], class: VehicleClass, cost: Cost, now: Instant) {
        if self.config.capacity == 0 {
            return;
        }
        let key = SequenceKey::new(tolls, class);
        let expires_at = now.checked_add(self.ttl_for(tolls)).unwrap_or(now);
        let mut inner = self.inner.lock();
        inner.remove(&key);
        let mut evicted = 0_u64;
        while inner.entries.len() >= self.config.capacity && inner.evict_least_recent() {
            evicted = evicted.saturating_add(1);
        }
        let tick = inner.next_tick();
        inner.recency.insert(tick, key.clone());
        inner.entries.insert(
            key,
            Entry {
                cost,
                expires_at,
                last_access: tick,
            },
        );
        drop(inner);
        if evicted > 0 {
            self.evictions.fetch_add(evicted, Ordering::Relaxed);
        }
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.recency.clear();
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let entries = self.inner.lock().entries.len();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TollSystem;
    use geo::Coord;
    use rstest::{fixture, rstest};
    use std::sync::Arc;
    use std::thread;

    fn toll(id: &str, system: TollSystem) -> TollCandidate {
        TollCandidate::new(id, Coord { x: 0.0, y: 0.0 }, "op", system)
    }

    fn open(id: &str) -> Vec<TollCandidate> {
        vec![toll(id, TollSystem::Open)]
    }

    #[fixture]
    fn small_cache() -> SequenceCostCache {
        SequenceCostCache::new(CacheConfig::default().with_capacity(2))
    }

    #[rstest]
    fn order_matters() {
        let cache = SequenceCostCache::default();
        let forward = vec![toll("A", TollSystem::Closed), toll("B", TollSystem::Closed)];
        let backward = vec![toll("B", TollSystem::Closed), toll("A", TollSystem::Closed)];
        cache.put(&forward, VehicleClass::C1, Cost::from_cents(100));
        assert_eq!(cache.get(&backward, VehicleClass::C1), None);
        assert_eq!(
            cache.get(&forward, VehicleClass::C1),
            Some(Cost::from_cents(100))
        );
    }

    #[rstest]
    fn vehicle_class_is_part_of_the_key() {
        let cache = SequenceCostCache::default();
        cache.put(&open("A"), VehicleClass::C1, Cost::from_cents(100));
        assert_eq!(cache.get(&open("A"), VehicleClass::C2), None);
    }

    #[rstest]
    fn evicts_least_recently_accessed(small_cache: SequenceCostCache) {
        small_cache.put(&open("A"), VehicleClass::C1, Cost::from_cents(1));
        small_cache.put(&open("B"), VehicleClass::C1, Cost::from_cents(2));
        // Touch A so that B becomes the eviction candidate.
        assert!(small_cache.get(&open("A"), VehicleClass::C1).is_some());
        small_cache.put(&open("C"), VehicleClass::C1, Cost::from_cents(3));

        assert!(small_cache.get(&open("A"), VehicleClass::C1).is_some());
        assert!(small_cache.get(&open("B"), VehicleClass::C1).is_none());
        assert!(small_cache.get(&open("C"), VehicleClass::C1).is_some());
        assert_eq!(small_cache.stats().evictions, 1);
    }

    #[rstest]
    fn open_sequences_expire_after_short_ttl() {
        let cache = SequenceCostCache::default();
        let start = Instant::now();
        cache.put_at(&open("A"), VehicleClass::C1, Cost::from_cents(1), start);

        let before = start + DEFAULT_SHORT_TTL - Duration::from_secs(1);
        assert!(cache.get_at(&open("A"), VehicleClass::C1, before).is_some());
        let after = start + DEFAULT_SHORT_TTL;
        assert!(cache.get_at(&open("A"), VehicleClass::C1, after).is_none());
        assert_eq!(cache.stats().entries, 0);
    }

    #[rstest]
    fn closed_sequences_use_long_ttl() {
        let cache = SequenceCostCache::default();
        let run = vec![toll("A", TollSystem::Closed)];
        let start = Instant::now();
        cache.put_at(&run, VehicleClass::C1, Cost::from_cents(1), start);
        let later = start + DEFAULT_SHORT_TTL + Duration::from_secs(1);
        assert!(cache.get_at(&run, VehicleClass::C1, later).is_some());
    }

    #[rstest]
    fn long_open_sequences_use_long_ttl() {
        let cache = SequenceCostCache::default();
        let run: Vec<_> = ["A", "B", "C", "D", "E", "F"]
            .into_iter()
            .map(|id| toll(id, TollSystem::Open))
            .collect();
        assert_eq!(cache.ttl_for(&run), DEFAULT_LONG_TTL);
        assert_eq!(cache.ttl_for(&open("A")), DEFAULT_SHORT_TTL);
    }

    #[rstest]
    #[expect(clippy::float_arithmetic, reason = "test compares the hit rate")]
    fn counts_hits_and_misses() {
        let cache = SequenceCostCache::default();
        assert!(cache.get(&open("A"), VehicleClass::C1).is_none());
        cache.put(&open("A"), VehicleClass::C1, Cost::from_cents(1));
        assert!(cache.get(&open("A"), VehicleClass::C1).is_some());
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[rstest]
    fn zero_capacity_disables_storage() {
        let cache = SequenceCostCache::new(CacheConfig::default().with_capacity(0));
        cache.put(&open("A"), VehicleClass::C1, Cost::from_cents(1));
        assert_eq!(cache.stats().entries, 0);
    }

    #[rstest]
    fn clear_empties_the_cache() {
        let cache = SequenceCostCache::default();
        cache.put(&open("A"), VehicleClass::C1, Cost::from_cents(1));
        cache.clear();
        assert!(cache.get(&open("A"), VehicleClass::C1).is_none());
    }

    #[rstest]
    fn tolerates_concurrent_writers() {
        let cache = Arc::new(SequenceCostCache::new(
            CacheConfig::default().with_capacity(16),
        ));
        let handles: Vec<_> = (0..8_u64)
            .map(|worker| {
                let shared = Arc::clone(&cache);
                thread::spawn(move || {
                    for n in 0..50_u64 {
                        let id = format!("T{}", (worker * 50 + n).rem_euclid(32));
                        shared.put(&open(&id), VehicleClass::C1, Cost::from_cents(n));
                        let seen = shared.get(&open(&id), VehicleClass::C1);
                        assert!(seen.is_none_or(|cost| cost.cents() < 50));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker thread");
        }
        assert!(cache.stats().entries <= 16);
    }
}
