use std::time::Instant;

/// A stored value with its optional expiration instant
///
/// `expires_at` of `None` means the entry never expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Entry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    /// Creates a new entry with the given value and expiration instant
    pub(crate) fn new(value: V, expires_at: Option<Instant>) -> Self {
        Self { value, expires_at }
    }

    /// Returns a reference to the stored value
    pub(crate) fn value(&self) -> &V {
        &self.value
    }

    /// Replaces the value, keeping the expiration instant
    pub(crate) fn replace_value(&mut self, value: V) -> V {
        std::mem::replace(&mut self.value, value)
    }

    /// Returns the expiration instant, `None` if the entry never expires
    pub(crate) fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// Checks if this entry has expired as of `now`
    ///
    /// An entry expiring exactly at `now` is still alive.
    pub(crate) fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| now > expires_at)
    }
}
