//! Keyed in-memory query cache.
//!
//! Each key holds the last value fetched for it, when it was stored, and a
//! generation counter. Three rules keep it honest:
//!
//! - **Single flight**: fetches for one key are serialized behind a per-key
//!   async gate. A caller that waited on the gate re-checks the cache first,
//!   so concurrent requests for the same key cost one backend call.
//! - **Staleness**: values older than `stale_after`, or explicitly
//!   invalidated, are not served by [`QueryCache::get_or_fetch`] but stay
//!   available through [`QueryCache::peek`] as last-known-good data.
//! - **Generations**: [`invalidate`](QueryCache::invalidate),
//!   [`patch`](QueryCache::patch) and [`remove`](QueryCache::remove) stamp the
//!   key with a new generation from one cache-wide counter. A fetch that
//!   started under an older generation still answers its caller but never
//!   overwrites the newer state.
//!
//! A key with no value and nobody on its gate holds no slot, so keys that
//! are removed, cleared or failed to fetch don't accumulate.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::Result;

struct Entry<V> {
    value: V,
    stored_at: Instant,
    invalidated: bool,
}

struct Slot<V> {
    entry: Option<Entry<V>>,
    generation: u64,
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl<V> Slot<V> {
    fn new(generation: u64) -> Self {
        Self {
            entry: None,
            generation,
            gate: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Nobody besides the slot itself holds the gate
    fn is_idle(&self) -> bool {
        Arc::strong_count(&self.gate) == 1
    }
}

struct Slots<K, V> {
    map: HashMap<K, Slot<V>>,
    next_generation: u64,
}

impl<K: Eq + Hash, V> Slots<K, V> {
    fn bump(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    fn slot_mut(&mut self, key: K) -> &mut Slot<V> {
        let generation = self.next_generation;
        self.map.entry(key).or_insert_with(|| Slot::new(generation))
    }
}

pub struct QueryCache<K, V> {
    slots: Mutex<Slots<K, V>>,
    stale_after: Duration,
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    pub fn new(stale_after: Duration) -> Self {
        Self {
            slots: Mutex::new(Slots {
                map: HashMap::new(),
                next_generation: 0,
            }),
            stale_after,
        }
    }

    pub fn stale_after(&self) -> Duration {
        self.stale_after
    }

    /// Serve a fresh value or run `fetch`, at most one fetch per key at a time
    pub async fn get_or_fetch<F, Fut>(&self, key: &K, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(value) = self.fresh(key) {
            debug!("Cache hit for {:?}", key);
            return Ok(value);
        }

        let gate = self.gate(key);
        let permit = gate.lock().await;

        // Whoever held the gate before us may have just filled the entry
        if let Some(value) = self.fresh(key) {
            debug!("Cache hit for {:?} after waiting on in-flight fetch", key);
            return Ok(value);
        }

        let generation = self.generation(key);
        debug!("Cache miss for {:?}, fetching", key);
        let result = fetch().await;

        if let Ok(value) = &result {
            if !self.store_if_current(key, generation, value.clone()) {
                debug!("Discarding result for {:?}: key changed while in flight", key);
            }
        }

        drop(permit);
        drop(gate);
        self.prune(key);
        result
    }

    /// Value if present and not stale
    pub fn fresh(&self, key: &K) -> Option<V> {
        let slots = self.lock();
        let entry = slots.map.get(key)?.entry.as_ref()?;
        if entry.invalidated || entry.stored_at.elapsed() >= self.stale_after {
            return None;
        }
        Some(entry.value.clone())
    }

    /// Whatever is stored, stale or not
    pub fn peek(&self, key: &K) -> Option<V> {
        let slots = self.lock();
        slots
            .map
            .get(key)
            .and_then(|slot| slot.entry.as_ref())
            .map(|entry| entry.value.clone())
    }

    /// Overwrite the value with a known-good one, e.g. a mutation response
    pub fn patch(&self, key: K, value: V) {
        let mut slots = self.lock();
        let generation = slots.bump();
        let slot = slots.slot_mut(key);
        slot.generation = generation;
        slot.entry = Some(Entry {
            value,
            stored_at: Instant::now(),
            invalidated: false,
        });
    }

    /// Mark stale; the value stays around for [`peek`](Self::peek)
    pub fn invalidate(&self, key: &K) -> bool {
        let mut slots = self.lock();
        let generation = slots.bump();
        match slots.map.get_mut(key) {
            Some(slot) => {
                slot.generation = generation;
                if let Some(entry) = slot.entry.as_mut() {
                    entry.invalidated = true;
                }
                true
            }
            None => false,
        }
    }

    /// Invalidate every key matching `predicate`, returns how many
    pub fn invalidate_where<P: Fn(&K) -> bool>(&self, predicate: P) -> usize {
        let mut slots = self.lock();
        let generation = slots.bump();
        let mut count = 0;
        for (key, slot) in slots.map.iter_mut() {
            if predicate(key) {
                slot.generation = generation;
                if let Some(entry) = slot.entry.as_mut() {
                    entry.invalidated = true;
                }
                count += 1;
            }
        }
        count
    }

    pub fn invalidate_all(&self) -> usize {
        self.invalidate_where(|_| true)
    }

    /// Forget the value entirely; the next read must fetch
    pub fn remove(&self, key: &K) -> Option<V> {
        let mut slots = self.lock();
        let generation = slots.bump();
        let slot = slots.map.get_mut(key)?;
        slot.generation = generation;
        let value = slot.entry.take().map(|entry| entry.value);
        if slot.is_idle() {
            slots.map.remove(key);
        }
        value
    }

    /// Drop all values; only slots with a fetch in flight survive
    pub fn clear(&self) {
        let mut slots = self.lock();
        let generation = slots.bump();
        slots.map.retain(|_, slot| {
            slot.generation = generation;
            slot.entry = None;
            !slot.is_idle()
        });
    }

    /// Number of keys holding a value
    pub fn len(&self) -> usize {
        self.lock().map.values().filter(|slot| slot.entry.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn gate(&self, key: &K) -> Arc<tokio::sync::Mutex<()>> {
        let mut slots = self.lock();
        Arc::clone(&slots.slot_mut(key.clone()).gate)
    }

    fn generation(&self, key: &K) -> Option<u64> {
        self.lock().map.get(key).map(|slot| slot.generation)
    }

    fn store_if_current(&self, key: &K, generation: Option<u64>, value: V) -> bool {
        let mut slots = self.lock();
        match slots.map.get_mut(key) {
            Some(slot) if Some(slot.generation) == generation => {
                slot.entry = Some(Entry {
                    value,
                    stored_at: Instant::now(),
                    invalidated: false,
                });
                true
            }
            _ => false,
        }
    }

    /// Drop the slot for `key` if it holds nothing and nobody waits on it
    fn prune(&self, key: &K) {
        let mut slots = self.lock();
        if slots
            .map
            .get(key)
            .map_or(false, |slot| slot.entry.is_none() && slot.is_idle())
        {
            slots.map.remove(key);
        }
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.lock().map.len()
    }

    fn lock(&self) -> MutexGuard<'_, Slots<K, V>> {
        // Poisoning only means another thread panicked mid-update of plain data
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::sleep;

    fn cache() -> QueryCache<&'static str, u32> {
        QueryCache::new(Duration::from_secs(30))
    }

    #[tokio::test]
    async fn test_fresh_values_skip_the_fetch() {
        let cache = cache();
        let calls = AtomicU32::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_fetch(&"a", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_fetch() {
        let cache = cache();
        let calls = AtomicU32::new(0);

        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            sleep(Duration::from_millis(50)).await;
            Ok(42)
        };

        let (a, b) = tokio::join!(cache.get_or_fetch(&"k", fetch), cache.get_or_fetch(&"k", fetch));
        assert_eq!(a.unwrap(), 42);
        assert_eq!(b.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_keys_fetch_independently() {
        let cache = cache();
        let calls = AtomicU32::new(0);
        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(1)
        };

        let (a, b) = tokio::join!(cache.get_or_fetch(&"x", fetch), cache.get_or_fetch(&"y", fetch));
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stale_entries_are_refetched_but_peekable() {
        let cache: QueryCache<&str, u32> = QueryCache::new(Duration::from_millis(20));
        cache.patch("k", 1);
        assert_eq!(cache.fresh(&"k"), Some(1));

        sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.fresh(&"k"), None);
        assert_eq!(cache.peek(&"k"), Some(1));

        let value = cache.get_or_fetch(&"k", || async { Ok(2) }).await.unwrap();
        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn test_invalidation_during_flight_discards_the_result() {
        let cache = cache();

        let slow = cache.get_or_fetch(&"k", || async {
            sleep(Duration::from_millis(50)).await;
            Ok(1)
        });
        let invalidate = async {
            sleep(Duration::from_millis(10)).await;
            cache.invalidate(&"k");
        };

        let (value, _) = tokio::join!(slow, invalidate);
        // The caller still gets its answer...
        assert_eq!(value.unwrap(), 1);
        // ...but it was not stored as current
        assert_eq!(cache.peek(&"k"), None);
    }

    #[tokio::test]
    async fn test_patch_wins_over_older_in_flight_fetch() {
        let cache = cache();

        let slow = cache.get_or_fetch(&"k", || async {
            sleep(Duration::from_millis(50)).await;
            Ok(1)
        });
        let patch = async {
            sleep(Duration::from_millis(10)).await;
            cache.patch("k", 99);
        };

        tokio::join!(slow, patch).0.unwrap();
        assert_eq!(cache.fresh(&"k"), Some(99));
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = cache();
        let result = cache
            .get_or_fetch(&"k", || async { Err(Error::Unknown("boom".into())) })
            .await;
        assert!(result.is_err());
        assert!(cache.is_empty());

        let value = cache.get_or_fetch(&"k", || async { Ok(3) }).await.unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test]
    async fn test_removed_and_cleared_keys_release_their_slots() {
        let cache: QueryCache<u32, u32> = QueryCache::new(Duration::from_secs(30));
        for key in 0..1000 {
            cache.get_or_fetch(&key, || async move { Ok(key) }).await.unwrap();
        }
        assert_eq!(cache.slot_count(), 1000);

        for key in 0..500 {
            assert_eq!(cache.remove(&key), Some(key));
        }
        assert_eq!(cache.slot_count(), 500);

        cache.clear();
        assert_eq!(cache.slot_count(), 0);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_no_slot() {
        let cache = cache();
        let result = cache
            .get_or_fetch(&"k", || async { Err(Error::Unknown("boom".into())) })
            .await;
        assert!(result.is_err());
        assert_eq!(cache.slot_count(), 0);
    }

    #[tokio::test]
    async fn test_clear_during_flight_keeps_gate_and_drops_result() {
        let cache = cache();

        let slow = cache.get_or_fetch(&"k", || async {
            sleep(Duration::from_millis(50)).await;
            Ok(1)
        });
        let clear = async {
            sleep(Duration::from_millis(10)).await;
            cache.clear();
            // The in-flight fetch still owns its gate
            assert_eq!(cache.slot_count(), 1);
        };

        let (value, _) = tokio::join!(slow, clear);
        assert_eq!(value.unwrap(), 1);
        assert_eq!(cache.peek(&"k"), None);
        assert_eq!(cache.slot_count(), 0);
    }

    #[test]
    fn test_invalidate_where_and_remove() {
        let cache: QueryCache<String, u32> = QueryCache::new(Duration::from_secs(30));
        cache.patch("list:1".to_string(), 1);
        cache.patch("list:2".to_string(), 2);
        cache.patch("record:9".to_string(), 9);

        assert_eq!(cache.invalidate_where(|k| k.starts_with("list:")), 2);
        assert_eq!(cache.fresh(&"list:1".to_string()), None);
        assert_eq!(cache.fresh(&"record:9".to_string()), Some(9));

        assert_eq!(cache.remove(&"record:9".to_string()), Some(9));
        assert_eq!(cache.peek(&"record:9".to_string()), None);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.invalidate(&"missing".to_string()));
    }
}
