//! Sequence-score cache.
//!
//! Long-lived, shared across requests, keyed by (variant identity,
//! engine, window). Single-flight: a per-key async mutex is held for
//! the duration of a computation, so N concurrent requests for the
//! same key produce exactly one external call — late arrivals wait on
//! the lock and then find the value already present.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use crate::scorer::SequenceScore;

pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// Degraded placeholder scores expire much sooner than real results,
/// so a transient backend outage does not suppress retries for the
/// full TTL.
pub const DEGRADED_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub variant: String,
    pub engine: String,
    pub window: u32,
}

impl CacheKey {
    pub fn new(variant: impl Into<String>, engine: impl Into<String>, window: u32) -> Self {
        Self { variant: variant.into(), engine: engine.into(), window }
    }
}

struct Entry {
    score: SequenceScore,
    inserted_at: Instant,
}

/// Hit/miss/in-flight-join counters, surfaced for provenance and
/// operational visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Calls that attached to an in-flight computation instead of
    /// issuing their own.
    pub inflight_joins: u64,
}

pub struct ScoreCache {
    ttl: Duration,
    degraded_ttl: Duration,
    slots: Mutex<HashMap<CacheKey, Arc<Mutex<Option<Entry>>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    inflight_joins: AtomicU64,
}

impl ScoreCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            degraded_ttl: ttl.min(DEGRADED_TTL),
            slots: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            inflight_joins: AtomicU64::new(0),
        }
    }

    pub fn with_degraded_ttl(mut self, ttl: Duration) -> Self {
        self.degraded_ttl = ttl;
        self
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::SeqCst),
            misses: self.misses.load(Ordering::SeqCst),
            inflight_joins: self.inflight_joins.load(Ordering::SeqCst),
        }
    }

    /// Look up `key`; on a miss run `compute` while holding the
    /// per-key lock. Returns the score and whether it was served from
    /// cache.
    pub async fn get_or_compute<F, Fut>(&self, key: CacheKey, compute: F) -> (SequenceScore, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SequenceScore> + Send,
    {
        let slot = {
            let mut slots = self.slots.lock().await;
            slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(None)))
                .clone()
        };

        // A failed try_lock means another task is computing this key
        // right now; we attach to it by waiting for the lock.
        let mut guard = match slot.try_lock() {
            Ok(g) => g,
            Err(_) => {
                self.inflight_joins.fetch_add(1, Ordering::SeqCst);
                slot.lock().await
            }
        };

        if let Some(entry) = guard.as_ref() {
            if entry.inserted_at.elapsed() < self.entry_ttl(entry) {
                self.hits.fetch_add(1, Ordering::SeqCst);
                debug!(variant = %key.variant, engine = %key.engine, "sequence score cache hit");
                return (entry.score.clone(), true);
            }
        }

        self.misses.fetch_add(1, Ordering::SeqCst);
        let score = compute().await;
        *guard = Some(Entry { score: score.clone(), inserted_at: Instant::now() });
        (score, false)
    }

    fn entry_ttl(&self, entry: &Entry) -> Duration {
        if entry.score.degraded { self.degraded_ttl } else { self.ttl }
    }

    /// Drop entries past their TTL. Callers invoke this periodically;
    /// stale entries are also replaced lazily on access.
    pub async fn purge_expired(&self) {
        let mut slots = self.slots.lock().await;
        let mut stale = Vec::new();
        for (key, slot) in slots.iter() {
            if let Ok(guard) = slot.try_lock() {
                if let Some(entry) = guard.as_ref() {
                    if entry.inserted_at.elapsed() >= self.entry_ttl(entry) {
                        stale.push(key.clone());
                    }
                }
            }
        }
        for key in stale {
            slots.remove(&key);
        }
    }
}

impl Default for ScoreCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn dummy_score(disruption: f64) -> SequenceScore {
        SequenceScore {
            variant: "BRCA1:p.Gln1756fs".into(),
            disruption,
            normalized: disruption.clamp(0.0, 1.0),
            percentile: 0.5,
            engine: "mock".into(),
            window: 2048,
            degraded: false,
            cache_hit: false,
        }
    }

    #[tokio::test]
    async fn test_second_lookup_is_a_hit() {
        let cache = ScoreCache::default();
        let key = CacheKey::new("BRCA1:p.Gln1756fs", "mock", 2048);
        let computed = AtomicUsize::new(0);

        let (_, hit) = cache
            .get_or_compute(key.clone(), || async {
                computed.fetch_add(1, Ordering::SeqCst);
                dummy_score(1.0)
            })
            .await;
        assert!(!hit);

        let (score, hit) = cache
            .get_or_compute(key, || async {
                computed.fetch_add(1, Ordering::SeqCst);
                dummy_score(2.0)
            })
            .await;
        assert!(hit);
        assert_eq!(computed.load(Ordering::SeqCst), 1);
        assert_eq!(score.disruption, 1.0);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_concurrent_lookups_single_flight() {
        let cache = Arc::new(ScoreCache::default());
        let computed = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::new("KRAS:p.G12D", "mock", 2048);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let computed = computed.clone();
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute(key, || async move {
                        computed.fetch_add(1, Ordering::SeqCst);
                        // Hold the in-flight slot long enough for the
                        // other tasks to pile up behind it.
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        dummy_score(1.0)
                    })
                    .await
            }));
        }

        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(computed.load(Ordering::SeqCst), 1, "exactly one external call");
        assert_eq!(cache.stats().misses, 1);
        assert_eq!(cache.stats().hits, 7);
    }

    #[tokio::test]
    async fn test_expired_entry_recomputes() {
        let cache = ScoreCache::new(Duration::from_millis(10));
        let key = CacheKey::new("TP53:p.R175H", "mock", 2048);
        let computed = AtomicUsize::new(0);

        cache
            .get_or_compute(key.clone(), || async {
                computed.fetch_add(1, Ordering::SeqCst);
                dummy_score(1.0)
            })
            .await;
        tokio::time::sleep(Duration::from_millis(25)).await;
        let (_, hit) = cache
            .get_or_compute(key, || async {
                computed.fetch_add(1, Ordering::SeqCst);
                dummy_score(2.0)
            })
            .await;
        assert!(!hit);
        assert_eq!(computed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_degraded_entry_expires_early() {
        // Long TTL for real scores, short one for degraded zeros.
        let cache = ScoreCache::new(Duration::from_secs(600))
            .with_degraded_ttl(Duration::from_millis(10));
        let key = CacheKey::new("ATM:p.R337C", "mock", 2048);
        let computed = AtomicUsize::new(0);

        let degraded = SequenceScore { degraded: true, ..dummy_score(0.0) };
        cache
            .get_or_compute(key.clone(), || async {
                computed.fetch_add(1, Ordering::SeqCst);
                degraded.clone()
            })
            .await;
        tokio::time::sleep(Duration::from_millis(25)).await;

        let (score, hit) = cache
            .get_or_compute(key.clone(), || async {
                computed.fetch_add(1, Ordering::SeqCst);
                dummy_score(1.0)
            })
            .await;
        assert!(!hit, "degraded placeholder must not outlive its short TTL");
        assert!(!score.degraded);
        assert_eq!(computed.load(Ordering::SeqCst), 2);

        // The recovered real score now sticks for the normal TTL.
        let (_, hit) = cache
            .get_or_compute(key, || async { dummy_score(2.0) })
            .await;
        assert!(hit);
    }

    #[tokio::test]
    async fn test_purge_removes_stale_entries() {
        let cache = ScoreCache::new(Duration::from_millis(5));
        let key = CacheKey::new("EGFR:p.L858R", "mock", 2048);
        cache.get_or_compute(key, || async { dummy_score(1.0) }).await;
        tokio::time::sleep(Duration::from_millis(15)).await;
        cache.purge_expired().await;
        assert!(cache.slots.lock().await.is_empty());
    }
}
