//! # TTL Cache Module
//!
//! A single-slot, time-bounded cache for upstream API responses. The weather
//! module wraps every data.gov.sg call in one of these so that a burst of
//! button presses results in one HTTP request per minute.

use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

struct Entry<K, V> {
    key: K,
    stored_at: Instant,
    value: V,
}

/// Single-slot cache keyed by `K`
///
/// A lookup hits when the stored key equals the requested key and the entry
/// is younger than the TTL. Any miss replaces the slot.
///
/// # Examples
///
/// ```rust
/// use hookbot::cache::TtlCache;
/// use std::time::Duration;
///
/// # tokio_test_block(async {
/// let cache: TtlCache<(), u32> = TtlCache::new(Duration::from_secs(60));
/// let value = cache.get_or_try_insert((), || async { Ok::<_, ()>(42) }).await;
/// assert_eq!(value, Ok(42));
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
pub struct TtlCache<K, V> {
    ttl: Duration,
    slot: Mutex<Option<Entry<K, V>>>,
}

impl<K: PartialEq, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Return the cached value for `key`, or run `fetch` and cache its result
    ///
    /// Errors are returned as-is and never cached. The slot lock is held
    /// during `fetch`, so concurrent callers wait for one fetch.
    pub async fn get_or_try_insert<F, Fut, E>(&self, key: K, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let mut slot = self.slot.lock().await;

        if let Some(entry) = slot.as_ref() {
            if entry.key == key && entry.stored_at.elapsed() < self.ttl {
                return Ok(entry.value.clone());
            }
        }

        let value = fetch().await?;
        *slot = Some(Entry {
            key,
            stored_at: Instant::now(),
            value: value.clone(),
        });
        Ok(value)
    }
}
