use parking_lot::RwLock;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::StoreConfig;
use crate::entries::Entries;
use crate::entry::Entry;
use crate::error::StoreError;
use crate::sweeper::Sweeper;
use crate::time::TimeSource;

/// Internal shared state for the store
struct StoreInner<K, V> {
    table: RwLock<HashMap<K, Entry<V>>>,
    time: Arc<dyn TimeSource>,
    stopped: AtomicBool,
}

impl<K, V> StoreInner<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Two-phase sweep shared between manual and background removal.
    fn remove_expired(&self) -> usize {
        let expired = self.collect_expired();
        if expired.is_empty() {
            return 0;
        }
        self.remove_if_expired(&expired)
    }

    /// Read phase: keys of entries that are expired now.
    fn collect_expired(&self) -> Vec<K> {
        let table = self.table.read();
        let now = self.time.now();
        table
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Write phase: removes those of `keys` that are still expired.
    ///
    /// An entry replaced by a live one after the read phase is kept.
    fn remove_if_expired(&self, keys: &[K]) -> usize {
        let mut removed = Vec::with_capacity(keys.len());
        let mut table = self.table.write();
        let now = self.time.now();
        for key in keys {
            let still_expired = table.get(key).is_some_and(|entry| entry.is_expired(now));
            if still_expired {
                removed.extend(table.remove(key));
            }
        }
        drop(table);

        removed.len()
    }
}

/// Thread-safe generic key/value store with per-entry expiration
///
/// All entries live in one table guarded by a single reader/writer lock.
/// Reads (`get`, `get_with_expiration`, `len`, iteration) run concurrently
/// with each other; writes (`set`, `update`, `delete`, `clear`, sweeps,
/// `stop`) are exclusive.
///
/// Expired entries are invisible to reads and updates as soon as their
/// expiry instant has passed, but stay in the table until a sweep removes
/// them. Each store spawns a background sweeper that calls
/// [`remove_expired`](Self::remove_expired) on every tick of its
/// [`TimeSource`]. The sweeper exits when [`stop`](Self::stop) is called or
/// when the last handle to the store is dropped.
///
/// `Store` is a handle: cloning it is cheap and every clone shares the same
/// table.
///
/// # Example
///
/// ```rust,no_run
/// use ttlmap_core::{Store, StoreConfig};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let config = StoreConfig::default()
///         .with_sweep_interval(Duration::from_secs(30));
///     let store: Store<String, u64> = Store::with_config(config);
///
///     store.set("visits".to_string(), 1, Duration::from_secs(300));
///     store.update("visits", 2);
///
///     assert_eq!(store.get("visits"), Some(2));
///     store.stop();
/// }
/// ```
pub struct Store<K, V> {
    inner: Arc<StoreInner<K, V>>,
    sweeper: Arc<Sweeper>,
}

impl<K, V> Clone for Store<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            sweeper: Arc::clone(&self.sweeper),
        }
    }
}

impl<K, V> Store<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a new store with default configuration
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context. The store requires
    /// a runtime to spawn its background sweeper.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Creates a new store with custom configuration
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context. Use
    /// [`try_with_config`](Self::try_with_config) to get an error instead.
    /// Also panics under the same conditions as `try_with_config`.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use ttlmap_core::{Store, StoreConfig};
    /// use std::time::Duration;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let config = StoreConfig::default()
    ///         .with_sweep_interval(Duration::from_secs(30))
    ///         .with_initial_capacity(10_000);
    ///     let store: Store<u32, String> = Store::with_config(config);
    /// }
    /// ```
    pub fn with_config(config: StoreConfig) -> Self {
        match Self::try_with_config(config) {
            Ok(store) => store,
            Err(err) => panic!("{err}"),
        }
    }

    /// Creates a new store, failing if no Tokio runtime is available
    ///
    /// # Panics
    ///
    /// With the default [`SystemTime`](crate::SystemTime) source, panics if the
    /// current runtime was built without its time driver (see
    /// `tokio::runtime::Builder::enable_time`). `#[tokio::main]` and
    /// `#[tokio::test]` always enable it.
    pub fn try_with_config(config: StoreConfig) -> Result<Self, StoreError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| StoreError::NoRuntime)?;

        let interval = config.effective_sweep_interval();
        let inner = Arc::new(StoreInner {
            table: RwLock::new(HashMap::with_capacity(config.initial_capacity)),
            time: config.time_source,
            stopped: AtomicBool::new(false),
        });

        // The sweeper only holds a weak reference so dropping every handle frees the table.
        let ticker = inner.time.new_ticker(interval);
        let weak: Weak<StoreInner<K, V>> = Arc::downgrade(&inner);
        let sweeper = Sweeper::spawn(&runtime, ticker, move || {
            weak.upgrade().map(|inner| inner.remove_expired())
        });

        tracing::debug!(?interval, "store created");

        Ok(Self {
            inner,
            sweeper: Arc::new(sweeper),
        })
    }
}

impl<K, V> Default for Store<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Store<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates or replaces the entry for `key`
    ///
    /// A `ttl` of zero means the entry never expires. Otherwise the entry
    /// expires `ttl` after now; if that instant is not representable the
    /// entry never expires either. Replacing a key always resets its expiry.
    ///
    /// Does nothing once the store is stopped.
    pub fn set(&self, key: K, value: V, ttl: Duration) {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            self.inner.time.now().checked_add(ttl)
        };

        let mut table = self.inner.table.write();
        if self.stopped() {
            return;
        }
        let replaced = table.insert(key, Entry::new(value, expires_at));
        // Drop the old value outside the lock.
        drop(table);
        drop(replaced);
    }

    /// Changes the value of a live key while preserving its expiry
    ///
    /// Returns `false` and leaves the store untouched if the key is absent
    /// or expired.
    pub fn update<Q>(&self, key: &Q, value: V) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let _old = {
            let mut table = self.inner.table.write();
            let now = self.inner.time.now();
            let Some(entry) = table.get_mut(key).filter(|entry| !entry.is_expired(now)) else {
                return false;
            };
            entry.replace_value(value)
        };
        true
    }

    /// Retrieves the value for `key`
    ///
    /// Returns `None` if the key doesn't exist or has expired. Expired entries
    /// are left in place for the next sweep.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let table = self.inner.table.read();
        let now = self.inner.time.now();
        table
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value().clone())
    }

    /// Retrieves the value for `key` along with its expiry instant
    ///
    /// The expiry is `None` for keys that never expire. Returns `None`
    /// if the key doesn't exist or has expired.
    pub fn get_with_expiration<Q>(&self, key: &Q) -> Option<(V, Option<Instant>)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let table = self.inner.table.read();
        let now = self.inner.time.now();
        table
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| (entry.value().clone(), entry.expires_at()))
    }

    /// Checks if a key exists and is not expired
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let table = self.inner.table.read();
        let now = self.inner.time.now();
        table.get(key).is_some_and(|entry| !entry.is_expired(now))
    }

    /// Removes `key`, whether it is live, expired, or absent
    pub fn delete<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let _removed = self.inner.table.write().remove(key);
    }

    /// Removes every entry
    pub fn clear(&self) {
        let _removed = std::mem::take(&mut *self.inner.table.write());
    }

    /// Returns the number of entries in the table, including expired ones
    /// that have not been swept yet
    ///
    /// Call [`remove_expired`](Self::remove_expired) first for a live count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.table.read().len()
    }

    /// Returns `true` if the table holds no entries, expired or not
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.table.read().is_empty()
    }

    /// Removes all entries that are expired now
    ///
    /// Returns the number of entries removed.
    ///
    /// Note: This is also done automatically by the background sweeper.
    pub fn remove_expired(&self) -> usize {
        self.inner.remove_expired()
    }

    /// Iterates over live entries, holding the read lock until `cancel` fires
    ///
    /// The lock is released when the iterator is exhausted, when it observes
    /// `cancel` as cancelled, or when it is dropped. See [`Entries`] for the
    /// caller's obligations.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use tokio_util::sync::CancellationToken;
    /// use ttlmap_core::Store;
    ///
    /// # async fn example(store: Store<String, u32>) {
    /// let cancel = CancellationToken::new();
    /// for (key, value) in store.entries(&cancel) {
    ///     if value > 100 {
    ///         println!("found {key}");
    ///         cancel.cancel();
    ///     }
    /// }
    /// # }
    /// ```
    pub fn entries(&self, cancel: &CancellationToken) -> Entries<'_, K, V> {
        Entries::new(self.inner.table.read(), self.inner.time.as_ref(), cancel.clone())
    }

    /// Iterates over live entries with no external cancellation
    ///
    /// The lock is held until the iterator is exhausted or dropped.
    pub fn iter(&self) -> Entries<'_, K, V> {
        self.entries(&CancellationToken::new())
    }
}

impl<K, V> Store<K, V> {
    /// Stops the background sweeper and clears the store
    ///
    /// Safe to call any number of times, from any number of threads; only
    /// the first call has an effect. A stopped store stays empty: `set` is
    /// ignored and `update` returns `false`. Build a new store instead of
    /// reusing a stopped one.
    pub fn stop(&self) {
        if self
            .inner
            .stopped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        self.sweeper.shutdown();
        let cleared = std::mem::take(&mut *self.inner.table.write());
        tracing::debug!(cleared = cleared.len(), "store stopped");
    }

    /// Reports whether [`stop`](Self::stop) has been called
    ///
    /// Expired keys are not removed automatically in a stopped store.
    pub fn stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    /// Reports whether the background sweeper is running
    pub fn sweep_active(&self) -> bool {
        self.sweeper.is_active()
    }

    #[cfg(test)]
    pub(crate) fn table_locked(&self) -> bool {
        self.inner.table.is_locked()
    }
}
