use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, error};

use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::timer::{Timer, TimerQueue};

type EvictFn<V> = Box<dyn Fn(&str, V) + Send + Sync>;

struct Slot<V> {
    value: V,
    deadline: Instant,
    /// Identifies the countdown that owns this slot.
    generation: u64,
}

impl<V> Slot<V> {
    fn is_due(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

struct CacheInner<V> {
    entries: DashMap<String, Slot<V>>,
    timers: TimerQueue,
    /// Serializes `put` against eviction.
    exclusion: Mutex<()>,
    generation: AtomicU64,
    on_evict: EvictFn<V>,
    max_ttl: Duration,
}

impl<V> CacheInner<V> {
    /// Caller must hold `exclusion`.
    fn insert(&self, key: String, value: V, ttl: Duration) {
        let deadline = Instant::now() + ttl.min(self.max_ttl);
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        self.entries.insert(
            key.clone(),
            Slot {
                value,
                deadline,
                generation,
            },
        );
        self.timers.schedule(Timer {
            deadline,
            generation,
            key,
        });
    }

    fn lookup(&self, key: &str) -> Result<V, CacheError>
    where
        V: Clone,
    {
        let slot = self.entries.get(key).ok_or(CacheError::NotFound)?;
        if slot.is_due(Instant::now()) {
            return Err(CacheError::Expired);
        }
        Ok(slot.value.clone())
    }

    fn is_live(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|slot| !slot.is_due(Instant::now()))
    }

    /// Reclaim every entry whose countdown is due at `now`.
    ///
    /// Runs under `exclusion`; the callback is invoked with the lock held
    /// and must not call back into the cache's write path.
    fn evict_due(&self, now: Instant) -> usize {
        let _guard = self.exclusion.lock();
        let mut evicted = 0;
        while let Some(timer) = self.timers.pop_due(now) {
            let removed = self
                .entries
                .remove_if(&timer.key, |_, slot| slot.generation == timer.generation);
            match removed {
                Some((key, slot)) => {
                    debug!(key = %key, "evicting expired entry");
                    (self.on_evict)(&key, slot.value);
                    evicted += 1;
                }
                None => debug!(key = %timer.key, "superseded countdown ignored"),
            }
        }
        evicted
    }
}

/// In-memory map from key to value where every entry expires on its own.
///
/// Cloning values out on lookup keeps reads independent of writers: a
/// lookup only touches the concurrent map, never the exclusion lock.
pub struct ExpiringCache<V> {
    inner: Arc<CacheInner<V>>,
    shutdown_tx: watch::Sender<bool>,
}

impl<V> ExpiringCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache and spawn its timer task on the current Tokio runtime.
    ///
    /// `on_evict` is called exactly once for every entry whose countdown
    /// elapses without being superseded.
    pub fn new<F>(config: CacheConfig, on_evict: F) -> Result<Self, CacheError>
    where
        F: Fn(&str, V) + Send + Sync + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| CacheError::NoRuntime)?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let inner = Arc::new(CacheInner {
            entries: DashMap::new(),
            timers: TimerQueue::default(),
            exclusion: Mutex::new(()),
            generation: AtomicU64::new(0),
            on_evict: Box::new(on_evict),
            max_ttl: config.max_ttl,
        });

        runtime.spawn(run_timer(Arc::clone(&inner), shutdown_rx));
        Ok(Self { inner, shutdown_tx })
    }

    /// Insert or replace `key`, (re)starting its countdown at `ttl`.
    ///
    /// Any countdown pending for a previous value of `key` is superseded.
    pub fn put(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.exclusive().put(key, value, ttl);
    }

    /// Take the exclusion shared with the eviction path.
    ///
    /// While the guard is alive no eviction callback can run, so a caller
    /// can make a durable write and the matching `put` appear atomic to it.
    pub fn exclusive(&self) -> Exclusive<'_, V> {
        Exclusive {
            inner: &self.inner,
            _guard: self.inner.exclusion.lock(),
        }
    }

    /// Look up a live entry.
    pub fn get(&self, key: &str) -> Result<V, CacheError> {
        self.inner.lookup(key)
    }

    /// Time left before `key` expires, if it is live.
    pub fn remaining(&self, key: &str) -> Option<Duration> {
        let slot = self.inner.entries.get(key)?;
        slot.deadline.checked_duration_since(Instant::now())
            .filter(|left| !left.is_zero())
    }

    /// Number of entries held, including due entries not yet reclaimed.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Run every due eviction now, on the calling thread.
    ///
    /// Returns the number of entries evicted. The timer task does the same
    /// thing in the background.
    pub fn evict_expired(&self) -> usize {
        self.inner.evict_due(Instant::now())
    }

    /// Stop the timer task. Entries stay readable but are no longer
    /// reclaimed except through [`evict_expired`](Self::evict_expired).
    pub fn close(&self) {
        self.shutdown_tx.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.shutdown_tx.borrow()
    }
}

impl<V> Drop for ExpiringCache<V> {
    fn drop(&mut self) {
        self.shutdown_tx.send_replace(true);
    }
}

impl<V> std::fmt::Debug for ExpiringCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiringCache")
            .field("entries", &self.inner.entries.len())
            .field("timers", &self.inner.timers.len())
            .field("max_ttl", &self.inner.max_ttl)
            .finish()
    }
}

/// Guard holding the cache's exclusion domain.
pub struct Exclusive<'a, V> {
    inner: &'a CacheInner<V>,
    _guard: MutexGuard<'a, ()>,
}

impl<V: Clone> Exclusive<'_, V> {
    /// Insert or replace `key`; see [`ExpiringCache::put`].
    pub fn put(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.inner.insert(key.into(), value, ttl);
    }

    /// Whether `key` is present and its countdown has not elapsed.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.is_live(key)
    }
}

async fn run_timer<V>(inner: Arc<CacheInner<V>>, mut shutdown_rx: watch::Receiver<bool>)
where
    V: Send + Sync + 'static,
{
    while inner.timers.wait_due(&mut shutdown_rx).await {
        let worker = Arc::clone(&inner);
        let result = tokio::task::spawn_blocking(move || worker.evict_due(Instant::now())).await;
        if let Err(e) = result {
            error!(error = %e, "eviction worker failed");
        }
    }
    debug!("expiry timer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    type Evicted = Arc<Mutex<Vec<(String, String)>>>;

    fn recording_cache(config: CacheConfig) -> (Arc<ExpiringCache<String>>, Evicted) {
        let evicted: Evicted = Arc::default();
        let sink = Arc::clone(&evicted);
        let cache = ExpiringCache::new(config, move |key: &str, value: String| {
            sink.lock().push((key.to_string(), value));
        })
        .unwrap();
        (Arc::new(cache), evicted)
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn put_then_get() {
        let (cache, _) = recording_cache(CacheConfig::default());
        cache.put("abcde", "https://a.example".to_string(), Duration::from_secs(60));

        assert_eq!(cache.get("abcde"), Ok("https://a.example".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let (cache, _) = recording_cache(CacheConfig::default());
        assert_eq!(cache.get("nope"), Err(CacheError::NotFound));
    }

    #[tokio::test]
    async fn due_entry_is_hidden_before_eviction() {
        let (cache, evicted) = recording_cache(CacheConfig::default());
        cache.close();
        cache.put("k", "v".to_string(), Duration::from_millis(20));
        sleep_ms(40).await;

        assert_eq!(cache.get("k"), Err(CacheError::Expired));
        assert_eq!(cache.len(), 1);
        assert!(evicted.lock().is_empty());
        assert_eq!(cache.remaining("k"), None);
    }

    #[tokio::test]
    async fn ttl_is_clamped_to_max() {
        let config = CacheConfig::default().with_max_ttl(Duration::from_secs(1));
        let (cache, _) = recording_cache(config);
        cache.put("k", "v".to_string(), Duration::from_secs(3600));

        let left = cache.remaining("k").unwrap();
        assert!(left <= Duration::from_secs(1));
    }

    #[test]
    fn requires_runtime() {
        let result = ExpiringCache::new(CacheConfig::default(), |_: &str, _: String| {});
        assert!(matches!(result, Err(CacheError::NoRuntime)));
    }

    // -----------------------------------------------------------------------
    // Eviction
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn timer_evicts_and_calls_back_once() {
        let (cache, evicted) = recording_cache(CacheConfig::default());
        cache.put("k", "v".to_string(), Duration::from_millis(20));
        sleep_ms(200).await;

        assert_eq!(cache.get("k"), Err(CacheError::NotFound));
        assert_eq!(*evicted.lock(), vec![("k".to_string(), "v".to_string())]);
        assert_eq!(cache.evict_expired(), 0);
        assert_eq!(evicted.lock().len(), 1);
    }

    #[tokio::test]
    async fn entries_expire_independently() {
        let (cache, evicted) = recording_cache(CacheConfig::default());
        cache.put("short", "1".to_string(), Duration::from_millis(20));
        cache.put("long", "2".to_string(), Duration::from_secs(60));
        sleep_ms(200).await;

        assert_eq!(cache.get("short"), Err(CacheError::NotFound));
        assert_eq!(cache.get("long"), Ok("2".to_string()));
        assert_eq!(evicted.lock().len(), 1);
    }

    #[tokio::test]
    async fn replacing_supersedes_pending_countdown() {
        let (cache, evicted) = recording_cache(CacheConfig::default());
        cache.put("k", "old".to_string(), Duration::from_millis(40));
        sleep_ms(10).await;
        cache.put("k", "new".to_string(), Duration::from_secs(60));
        sleep_ms(200).await;

        assert_eq!(cache.get("k"), Ok("new".to_string()));
        assert!(evicted.lock().is_empty());
    }

    #[tokio::test]
    async fn manual_eviction_after_close() {
        let (cache, evicted) = recording_cache(CacheConfig::default());
        cache.close();
        assert!(cache.is_closed());
        cache.put("a", "1".to_string(), Duration::from_millis(10));
        cache.put("b", "2".to_string(), Duration::from_millis(10));
        cache.put("c", "3".to_string(), Duration::from_secs(60));
        sleep_ms(30).await;

        assert_eq!(cache.evict_expired(), 2);
        assert_eq!(cache.evict_expired(), 0);
        assert_eq!(cache.len(), 1);
        assert_eq!(evicted.lock().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn put_under_exclusion_beats_due_eviction() {
        let (cache, evicted) = recording_cache(CacheConfig::default());
        cache.close();
        cache.put("k", "old".to_string(), Duration::from_millis(10));
        sleep_ms(30).await;

        let guard = cache.exclusive();
        let evictor = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.evict_expired())
        };
        thread::sleep(Duration::from_millis(50));
        assert!(evicted.lock().is_empty(), "eviction ran while exclusion was held");

        guard.put("k", "new".to_string(), Duration::from_secs(60));
        drop(guard);

        assert_eq!(evictor.join().unwrap(), 0);
        assert!(evicted.lock().is_empty());
        assert_eq!(cache.get("k"), Ok("new".to_string()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn callback_runs_inside_exclusion() {
        let observed: Arc<Mutex<Vec<bool>>> = Arc::default();
        let cache: Arc<Mutex<Option<Arc<ExpiringCache<String>>>>> = Arc::default();

        let probe_observed = Arc::clone(&observed);
        let probe_cache = Arc::clone(&cache);
        let built = ExpiringCache::new(CacheConfig::default(), move |_: &str, _: String| {
            if let Some(cache) = probe_cache.lock().as_ref() {
                probe_observed.lock().push(cache.inner.exclusion.is_locked());
            }
        })
        .unwrap();
        let built = Arc::new(built);
        *cache.lock() = Some(Arc::clone(&built));

        built.put("k", "v".to_string(), Duration::from_millis(10));
        sleep_ms(200).await;

        assert_eq!(*observed.lock(), vec![true]);
        cache.lock().take();
    }

    #[tokio::test]
    async fn exclusive_guard_reports_liveness() {
        let (cache, _) = recording_cache(CacheConfig::default());
        cache.close();
        let guard = cache.exclusive();
        guard.put("live", "1".to_string(), Duration::from_secs(60));
        guard.put("due", "2".to_string(), Duration::ZERO);

        assert!(guard.contains("live"));
        assert!(!guard.contains("due"));
        assert!(!guard.contains("absent"));
        drop(guard);
        assert_eq!(cache.get("due"), Err(CacheError::Expired));
    }
}
