//! Thumbnail existence memoization with pinned and reclaimable tiers.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::ports::{ProbeResult, ThumbnailProbePort};
use crate::infrastructure::config::ThumbnailConfig;

use super::recency::RecencyCache;

/// Memoizes thumbnail existence probes.
///
/// Each known path carries a memoized "does the thumbnail file exist"
/// answer in one of two tiers: a pinned tier for currently visible
/// items, which is never evicted, and a bounded reclaimable tier for
/// everything else, evicted in least-recently-used order. A path lives
/// in at most one tier at a time.
///
/// Thread-safe; a single mutex guards both tiers.
pub struct ThumbnailCacheService {
    probe: Arc<dyn ThumbnailProbePort>,
    state: Mutex<CacheState>,
    hits: AtomicU64,
    misses: AtomicU64,
}

struct CacheState {
    pinned: HashMap<PathBuf, bool>,
    recent: RecencyCache<PathBuf, bool>,
    /// Paths pinned before their first load; applied when the probe
    /// result arrives.
    pin_on_load: HashSet<PathBuf>,
}

impl ThumbnailCacheService {
    /// Creates a service with the given probe and reclaimable-tier capacity.
    ///
    /// # Panics
    /// Panics if `cache_max_size` is zero.
    #[must_use]
    pub fn new(probe: Arc<dyn ThumbnailProbePort>, cache_max_size: usize) -> Self {
        Self {
            probe,
            state: Mutex::new(CacheState {
                pinned: HashMap::new(),
                recent: RecencyCache::new(cache_max_size),
                pin_on_load: HashSet::new(),
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Creates a service sized from the given configuration.
    ///
    /// # Panics
    /// Panics if the configured cache size is zero.
    #[must_use]
    pub fn with_config(probe: Arc<dyn ThumbnailProbePort>, config: &ThumbnailConfig) -> Self {
        Self::new(probe, config.cache_max_size)
    }

    /// Resolves the thumbnail for `path`.
    ///
    /// Returns the path when a thumbnail file exists and `None` when it
    /// does not. The filesystem probe runs at most once per path; later
    /// calls answer from the memoized record. A failed probe is not
    /// memoized, so the next call probes again.
    ///
    /// # Errors
    /// Returns the probe error when the existence check itself fails.
    pub async fn load(&self, path: &Path) -> ProbeResult<Option<PathBuf>> {
        if let Some(exists) = self.lookup(path) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(path = %path.display(), "Thumbnail cache hit");
            return Ok(exists.then(|| path.to_path_buf()));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        trace!(path = %path.display(), "Thumbnail cache miss");
        let exists = self.probe.exists(path).await?;
        self.store(path, exists);

        Ok(exists.then(|| path.to_path_buf()))
    }

    /// Pins `path` so its record survives cache pressure.
    ///
    /// A path that has no record yet is remembered and pinned when its
    /// first load completes. Pinning an already pinned path is a no-op.
    pub fn pin(&self, path: &Path) {
        let mut state = self.state.lock();
        if state.pinned.contains_key(path) {
            return;
        }
        if let Some(exists) = state.recent.remove(path) {
            state.pinned.insert(path.to_path_buf(), exists);
            trace!(path = %path.display(), "Pinned thumbnail record");
        } else {
            state.pin_on_load.insert(path.to_path_buf());
            trace!(path = %path.display(), "Pin recorded for unseen path");
        }
    }

    /// Unpins `path`, making its record reclaimable again.
    ///
    /// The record moves to the most-recently-used position of the
    /// reclaimable tier. Unpinning an unknown path is a no-op.
    pub fn unpin(&self, path: &Path) {
        let mut state = self.state.lock();
        if let Some(exists) = state.pinned.remove(path) {
            state.recent.put(path.to_path_buf(), exists);
            trace!(path = %path.display(), "Unpinned thumbnail record");
        } else if state.pin_on_load.remove(path) {
            trace!(path = %path.display(), "Retracted pending pin");
        }
    }

    /// Replaces the pinned set wholesale with `paths`.
    ///
    /// Records for newly visible paths move to the pinned tier; records
    /// pinned before the call but absent from `paths` are demoted to the
    /// reclaimable tier. Visible paths with no record yet are pinned
    /// when their first load completes.
    pub fn update_visible(&self, paths: &[PathBuf]) {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let mut pinned = HashMap::with_capacity(paths.len());
        let mut pin_on_load = HashSet::new();

        for path in paths {
            if let Some(exists) = state.pinned.remove(path) {
                pinned.insert(path.clone(), exists);
            } else if let Some(exists) = state.recent.remove(path) {
                pinned.insert(path.clone(), exists);
            } else {
                pin_on_load.insert(path.clone());
            }
        }

        // Whatever stayed behind in the old pinned tier is off-screen now.
        for (path, exists) in state.pinned.drain() {
            state.recent.put(path, exists);
        }

        state.pinned = pinned;
        state.pin_on_load = pin_on_load;
        debug!(visible = paths.len(), "Replaced pinned thumbnail set");
    }

    /// Drops every record from both tiers and resets the counters.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.pinned.clear();
        state.recent.clear();
        state.pin_on_load.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        debug!("Cleared thumbnail cache");
    }

    /// Returns the number of memoized records across both tiers.
    #[must_use]
    pub fn cache_count(&self) -> usize {
        let state = self.state.lock();
        state.pinned.len() + state.recent.len()
    }

    /// Returns how many loads were answered from memoized records.
    #[must_use]
    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Returns how many loads invoked the filesystem probe.
    #[must_use]
    pub fn miss_count(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Returns the reclaimable-tier capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.state.lock().recent.capacity()
    }

    /// Returns cache statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        CacheStats {
            hits,
            misses,
            hit_rate,
            size: self.cache_count(),
        }
    }

    fn lookup(&self, path: &Path) -> Option<bool> {
        let mut state = self.state.lock();
        if let Some(&exists) = state.pinned.get(path) {
            return Some(exists);
        }
        state.recent.get(path).copied()
    }

    fn store(&self, path: &Path, exists: bool) {
        let mut state = self.state.lock();
        if state.pin_on_load.remove(path) {
            debug!(path = %path.display(), exists, "Memoized probe result as pinned");
            state.pinned.insert(path.to_path_buf(), exists);
        } else {
            debug!(path = %path.display(), exists, "Memoized probe result");
            state.recent.put(path.to_path_buf(), exists);
        }
    }
}

impl fmt::Debug for ThumbnailCacheService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThumbnailCacheService")
            .field("entries", &self.cache_count())
            .finish_non_exhaustive()
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of memoized records.
    pub size: usize,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cache: {} records, {:.1}% hit rate ({} hits, {} misses)",
            self.size, self.hit_rate, self.hits, self.misses
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::mocks::{MockThumbnailProbe, MockThumbnailProbePort};

    fn service_with_probe(capacity: usize) -> (Arc<MockThumbnailProbe>, ThumbnailCacheService) {
        let probe = Arc::new(MockThumbnailProbe::new());
        let service = ThumbnailCacheService::new(probe.clone(), capacity);
        (probe, service)
    }

    #[tokio::test]
    async fn test_load_probes_once_per_path() {
        let mut probe = MockThumbnailProbePort::new();
        probe
            .expect_exists()
            .times(1)
            .returning(|_| Ok(true));
        let service = ThumbnailCacheService::new(Arc::new(probe), 8);
        let path = Path::new("/thumbs/1.jpg");

        let first = service.load(path).await.unwrap();
        let second = service.load(path).await.unwrap();

        assert_eq!(first, Some(PathBuf::from("/thumbs/1.jpg")));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_load_resolves_none_for_missing_thumbnail() {
        let (probe, service) = service_with_probe(8);
        probe.add_existing("/thumbs/here.jpg");

        assert_eq!(
            service.load(Path::new("/thumbs/here.jpg")).await.unwrap(),
            Some(PathBuf::from("/thumbs/here.jpg"))
        );
        assert_eq!(service.load(Path::new("/thumbs/gone.jpg")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_thumbnail_answer_is_memoized_too() {
        let (probe, service) = service_with_probe(8);
        let path = Path::new("/thumbs/gone.jpg");

        assert_eq!(service.load(path).await.unwrap(), None);
        assert_eq!(service.load(path).await.unwrap(), None);

        assert_eq!(probe.call_count(path), 1);
        assert_eq!(service.hit_count(), 1);
    }

    #[tokio::test]
    async fn test_hit_and_miss_counters() {
        let (probe, service) = service_with_probe(8);
        probe.add_existing("/thumbs/a.jpg");

        let _ = service.load(Path::new("/thumbs/a.jpg")).await.unwrap();
        let _ = service.load(Path::new("/thumbs/a.jpg")).await.unwrap();
        let _ = service.load(Path::new("/thumbs/b.jpg")).await.unwrap();

        assert_eq!(service.hit_count(), 1);
        assert_eq!(service.miss_count(), 2);
        assert_eq!(service.cache_count(), 2);
    }

    #[tokio::test]
    async fn test_probe_error_is_not_memoized() {
        let (probe, service) = service_with_probe(8);
        let path = Path::new("/thumbs/flaky.jpg");
        probe.add_failing(path.to_path_buf());
        probe.add_existing(path.to_path_buf());

        assert!(service.load(path).await.is_err());
        assert_eq!(service.cache_count(), 0);

        probe.clear_failing(path);
        assert_eq!(
            service.load(path).await.unwrap(),
            Some(path.to_path_buf())
        );
        assert_eq!(probe.call_count(path), 2);
        assert_eq!(service.miss_count(), 2);
        assert_eq!(service.hit_count(), 0);
    }

    #[tokio::test]
    async fn test_eviction_causes_fresh_probe() {
        let (probe, service) = service_with_probe(2);
        let a = Path::new("/thumbs/a.jpg");
        probe.add_existing(a.to_path_buf());

        let _ = service.load(a).await.unwrap();
        let _ = service.load(Path::new("/thumbs/b.jpg")).await.unwrap();
        let _ = service.load(Path::new("/thumbs/c.jpg")).await.unwrap();

        // "a" was evicted, so this load probes the filesystem again.
        let _ = service.load(a).await.unwrap();
        assert_eq!(probe.call_count(a), 2);
    }

    #[tokio::test]
    async fn test_pinned_record_survives_cache_pressure() {
        let (probe, service) = service_with_probe(2);
        let a = Path::new("/thumbs/a.jpg");
        probe.add_existing(a.to_path_buf());

        let _ = service.load(a).await.unwrap();
        service.pin(a);

        for i in 0..10 {
            let _ = service
                .load(Path::new(&format!("/thumbs/filler-{i}.jpg")))
                .await
                .unwrap();
        }

        assert_eq!(service.load(a).await.unwrap(), Some(a.to_path_buf()));
        assert_eq!(probe.call_count(a), 1);
    }

    #[tokio::test]
    async fn test_pin_before_first_load_lands_pinned() {
        let (probe, service) = service_with_probe(2);
        let a = Path::new("/thumbs/a.jpg");
        probe.add_existing(a.to_path_buf());

        service.pin(a);
        let _ = service.load(a).await.unwrap();

        for i in 0..10 {
            let _ = service
                .load(Path::new(&format!("/thumbs/filler-{i}.jpg")))
                .await
                .unwrap();
        }

        let _ = service.load(a).await.unwrap();
        assert_eq!(probe.call_count(a), 1);
    }

    #[tokio::test]
    async fn test_unpin_makes_record_reclaimable() {
        let (probe, service) = service_with_probe(2);
        let a = Path::new("/thumbs/a.jpg");
        probe.add_existing(a.to_path_buf());

        let _ = service.load(a).await.unwrap();
        service.pin(a);
        service.unpin(a);

        for i in 0..10 {
            let _ = service
                .load(Path::new(&format!("/thumbs/filler-{i}.jpg")))
                .await
                .unwrap();
        }

        let _ = service.load(a).await.unwrap();
        assert_eq!(probe.call_count(a), 2);
    }

    #[tokio::test]
    async fn test_update_visible_replaces_pin_set() {
        let (probe, service) = service_with_probe(2);
        let a = PathBuf::from("/thumbs/a.jpg");
        let b = PathBuf::from("/thumbs/b.jpg");
        let c = PathBuf::from("/thumbs/c.jpg");
        probe.add_existing(a.clone());
        probe.add_existing(b.clone());
        probe.add_existing(c.clone());

        let _ = service.load(&a).await.unwrap();
        let _ = service.load(&b).await.unwrap();
        service.update_visible(&[a.clone(), b.clone()]);

        // "a" scrolls out of view, "c" scrolls in before its first load.
        service.update_visible(&[b.clone(), c.clone()]);
        let _ = service.load(&c).await.unwrap();

        for i in 0..10 {
            let _ = service
                .load(Path::new(&format!("/thumbs/filler-{i}.jpg")))
                .await
                .unwrap();
        }

        // Demoted "a" was evicted; pinned "b" and "c" were not.
        let _ = service.load(&a).await.unwrap();
        let _ = service.load(&b).await.unwrap();
        let _ = service.load(&c).await.unwrap();
        assert_eq!(probe.call_count(&a), 2);
        assert_eq!(probe.call_count(&b), 1);
        assert_eq!(probe.call_count(&c), 1);
    }

    #[tokio::test]
    async fn test_update_visible_retracts_pending_pins() {
        let (probe, service) = service_with_probe(2);
        let a = Path::new("/thumbs/a.jpg");
        probe.add_existing(a.to_path_buf());

        // Pin before any load, then scroll somewhere else entirely.
        service.pin(a);
        service.update_visible(&[PathBuf::from("/thumbs/other.jpg")]);

        let _ = service.load(a).await.unwrap();
        for i in 0..10 {
            let _ = service
                .load(Path::new(&format!("/thumbs/filler-{i}.jpg")))
                .await
                .unwrap();
        }

        // The retracted pin left "a" reclaimable, so it was evicted.
        let _ = service.load(a).await.unwrap();
        assert_eq!(probe.call_count(a), 2);
    }

    #[tokio::test]
    async fn test_clear_resets_records_and_counters() {
        let (probe, service) = service_with_probe(4);
        probe.add_existing("/thumbs/a.jpg");

        let _ = service.load(Path::new("/thumbs/a.jpg")).await.unwrap();
        service.pin(Path::new("/thumbs/a.jpg"));
        let _ = service.load(Path::new("/thumbs/a.jpg")).await.unwrap();

        service.clear();

        assert_eq!(service.cache_count(), 0);
        assert_eq!(service.hit_count(), 0);
        assert_eq!(service.miss_count(), 0);

        // The next load is a fresh miss.
        let _ = service.load(Path::new("/thumbs/a.jpg")).await.unwrap();
        assert_eq!(service.miss_count(), 1);
        assert_eq!(probe.call_count(Path::new("/thumbs/a.jpg")), 2);
    }

    #[tokio::test]
    async fn test_cache_count_spans_both_tiers() {
        let (probe, service) = service_with_probe(4);
        probe.add_existing("/thumbs/a.jpg");

        let _ = service.load(Path::new("/thumbs/a.jpg")).await.unwrap();
        service.pin(Path::new("/thumbs/a.jpg"));
        let _ = service.load(Path::new("/thumbs/b.jpg")).await.unwrap();

        assert_eq!(service.cache_count(), 2);
    }

    #[tokio::test]
    async fn test_stats_reports_rates() {
        let (probe, service) = service_with_probe(4);
        probe.add_existing("/thumbs/a.jpg");

        let _ = service.load(Path::new("/thumbs/a.jpg")).await.unwrap();
        let _ = service.load(Path::new("/thumbs/a.jpg")).await.unwrap();

        let stats = service.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
        assert!((stats.hit_rate - 50.0).abs() < f64::EPSILON);
        assert!(stats.to_string().contains("50.0% hit rate"));
    }

    #[tokio::test]
    async fn test_with_config_uses_configured_capacity() {
        let probe = Arc::new(MockThumbnailProbe::new());
        let config = ThumbnailConfig { cache_max_size: 3 };
        let service = ThumbnailCacheService::with_config(probe, &config);

        assert_eq!(service.capacity(), 3);
    }
}
