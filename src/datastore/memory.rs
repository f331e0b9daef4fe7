//! In-memory datastore with an LRU read cache.

use crate::error::BoxError;
use crate::types::{ChangedData, Value};
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::{ChangeListener, Datastore};

/// Default number of cached values.
const DEFAULT_CACHE_SIZE: usize = 10_000;

type SharedListener = Arc<dyn Fn(&ChangedData) -> std::result::Result<(), BoxError> + Send + Sync>;

/// In-memory [`Datastore`].
///
/// Writes go through [`send`](MemoryDatastore::send), which applies one
/// batch and notifies every change listener with it.
pub struct MemoryDatastore {
    /// Current values.
    data: RwLock<HashMap<String, Value>>,

    /// Read cache. Holds `None` for keys known to be missing.
    cache: Mutex<LruCache<String, Option<Value>>>,

    /// Registered change listeners.
    listeners: RwLock<Vec<SharedListener>>,

    /// Reads that missed the cache.
    store_reads: AtomicU64,

    /// Number of `reset_cache` calls.
    cache_resets: AtomicU64,
}

impl MemoryDatastore {
    /// Create an empty datastore with the default cache size.
    pub fn new() -> Self {
        Self::with_cache_size(DEFAULT_CACHE_SIZE)
    }

    /// Create an empty datastore caching at most `cache_size` values.
    pub fn with_cache_size(cache_size: usize) -> Self {
        let cache_size = NonZeroUsize::new(cache_size.max(1)).unwrap_or(NonZeroUsize::MIN);

        Self {
            data: RwLock::new(HashMap::new()),
            cache: Mutex::new(LruCache::new(cache_size)),
            listeners: RwLock::new(Vec::new()),
            store_reads: AtomicU64::new(0),
            cache_resets: AtomicU64::new(0),
        }
    }

    /// Create a datastore holding `data`. No listener is notified.
    pub fn with_data<I, K>(data: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let store = Self::new();
        store
            .data
            .write()
            .extend(data.into_iter().map(|(k, v)| (k.into(), v)));
        store
    }

    /// Apply one write batch and notify the change listeners.
    ///
    /// A `None` value deletes the key. Every listener is called even if an
    /// earlier one fails; the first error is returned.
    pub fn send(&self, changes: ChangedData) -> std::result::Result<(), BoxError> {
        {
            let mut data = self.data.write();
            for (key, value) in &changes {
                match value {
                    Some(value) => {
                        data.insert(key.clone(), value.clone());
                    }
                    None => {
                        data.remove(key);
                    }
                }
            }
        }

        {
            let mut cache = self.cache.lock();
            for key in changes.keys() {
                cache.pop(key);
            }
        }

        let listeners: Vec<SharedListener> = self.listeners.read().clone();
        let mut first_error = None;
        for listener in listeners {
            if let Err(err) = listener(&changes) {
                tracing::warn!(error = %err, "change listener failed");
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Reads that were not served from the cache.
    pub fn store_reads(&self) -> u64 {
        self.store_reads.load(Ordering::SeqCst)
    }

    /// Number of cache resets so far.
    pub fn cache_resets(&self) -> u64 {
        self.cache_resets.load(Ordering::SeqCst)
    }

    /// Number of cached values.
    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Number of registered change listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

impl Default for MemoryDatastore {
    fn default() -> Self {
        Self::new()
    }
}

impl Datastore for MemoryDatastore {
    fn get(&self, keys: &[String]) -> std::result::Result<Vec<Option<Value>>, BoxError> {
        // The cache lock is held for the whole read so a concurrent `send`
        // cannot invalidate between our store read and our cache insert.
        let mut cache = self.cache.lock();
        let data = self.data.read();

        let values = keys
            .iter()
            .map(|key| {
                if let Some(cached) = cache.get(key) {
                    return cached.clone();
                }
                self.store_reads.fetch_add(1, Ordering::SeqCst);
                let value = data.get(key).cloned();
                cache.put(key.clone(), value.clone());
                value
            })
            .collect();

        Ok(values)
    }

    fn register_change_listener(&self, listener: ChangeListener) {
        self.listeners.write().push(Arc::from(listener));
    }

    fn reset_cache(&self) {
        self.cache.lock().clear();
        self.cache_resets.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("datastore cache reset");
    }
}
