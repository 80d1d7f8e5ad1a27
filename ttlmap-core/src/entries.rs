//! Cancellable, lock-holding traversal over the live entries of a store.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::iter::FusedIterator;

use parking_lot::RwLockReadGuard;
use tokio_util::sync::CancellationToken;

use crate::entry::Entry;
use crate::time::TimeSource;

/// Iterator over the live `(key, value)` pairs of a [`Store`](crate::Store).
///
/// Created by [`Store::entries`](crate::Store::entries) and
/// [`Store::iter`](crate::Store::iter). The store's read lock is taken when
/// the iterator is created and held until one of the following happens:
///
/// - the iterator is exhausted,
/// - the cancellation token is observed as cancelled on a call to `next`,
/// - the iterator is dropped.
///
/// Writers (`set`, `update`, `delete`, `clear`, sweeps, `stop`) block while
/// the lock is held. A caller that stops consuming early must either cancel
/// the token or drop the iterator; calling a writer on the same thread while
/// an unreleased iterator is alive deadlocks.
///
/// Expiry is evaluated as each entry is reached, so an entry that expires
/// mid-traversal is skipped. Iteration order is unspecified.
pub struct Entries<'a, K, V> {
    table: Option<RwLockReadGuard<'a, HashMap<K, Entry<V>>>>,
    keys: std::vec::IntoIter<K>,
    time: &'a dyn TimeSource,
    cancel: CancellationToken,
}

impl<'a, K, V> Entries<'a, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub(crate) fn new(
        table: RwLockReadGuard<'a, HashMap<K, Entry<V>>>,
        time: &'a dyn TimeSource,
        cancel: CancellationToken,
    ) -> Self {
        let keys: Vec<K> = table.keys().cloned().collect();
        Self {
            table: Some(table),
            keys: keys.into_iter(),
            time,
            cancel,
        }
    }
}

impl<K, V> Entries<'_, K, V> {
    /// Whether the read lock has been released.
    ///
    /// Once released the iterator yields nothing more.
    pub fn is_released(&self) -> bool {
        self.table.is_none()
    }

    fn release(&mut self) {
        self.table = None;
        self.keys = Vec::new().into_iter();
    }
}

impl<K, V> Iterator for Entries<'_, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.table.is_none() {
                return None;
            }
            if self.cancel.is_cancelled() {
                self.release();
                return None;
            }
            let Some(key) = self.keys.next() else {
                self.release();
                return None;
            };

            let table = self.table.as_ref()?;
            let now = self.time.now();
            // Keys come from this same guarded table, so a miss is impossible.
            if let Some(entry) = table.get(&key) {
                if !entry.is_expired(now) {
                    return Some((key, entry.value().clone()));
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.keys.len()))
    }
}

impl<K, V> FusedIterator for Entries<'_, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
}

impl<K, V> fmt::Debug for Entries<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entries")
            .field("released", &self.is_released())
            .field("remaining", &self.keys.len())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
